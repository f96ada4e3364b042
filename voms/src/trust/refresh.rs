// Copyright (c) 2023 The MobileCoin Foundation

//! Periodic reloading of a trust store

use super::store::{DefaultTrustStore, TrustSnapshot, VomsTrustStore};
use crate::config::TrustStoreConfig;
use crate::{Error, Result};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Longest refresh period that is not reported as suspicious
const MAX_EXPECTED_FREQUENCY: Duration = Duration::from_secs(7 * 24 * 60 * 60);

const REFRESH_THREAD_NAME: &str = "voms-trust-refresh";

/// Something refreshed on a fixed period until cancelled
pub trait Updateable {
    /// Period between updates
    fn update_frequency(&self) -> Duration;

    /// Refresh now
    fn update(&self) -> Result<()>;

    /// Stop periodic refreshes. Calling this more than once has no effect.
    fn cancel(&self);
}

/// A [`DefaultTrustStore`] reloaded from disk by a background thread
#[derive(Debug)]
pub struct RefreshingTrustStore {
    store: Arc<DefaultTrustStore>,
    update_frequency: Duration,
    cancel: Mutex<Option<Sender<()>>>,
}

impl RefreshingTrustStore {
    /// Load `trust_dirs` and reload them every `update_frequency`
    pub fn new(trust_dirs: Vec<std::path::PathBuf>, update_frequency: Duration) -> Result<Self> {
        if update_frequency.is_zero() {
            return Err(Error::InvalidUpdateFrequency);
        }
        if update_frequency > MAX_EXPECTED_FREQUENCY {
            warn!(
                seconds = update_frequency.as_secs(),
                "VOMS trust store refresh period exceeds one week"
            );
        }

        let store = Arc::new(DefaultTrustStore::new(trust_dirs)?);
        let (sender, receiver) = mpsc::channel::<()>();
        let worker = Arc::clone(&store);
        thread::Builder::new()
            .name(REFRESH_THREAD_NAME.to_string())
            .spawn(move || loop {
                match receiver.recv_timeout(update_frequency) {
                    Err(RecvTimeoutError::Timeout) => {
                        debug!("Refreshing VOMS trust information");
                        // Failures are logged by the store
                        let _ = worker.load_trust_information();
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => {
                        info!("VOMS trust store refresh stopped");
                        break;
                    }
                }
            })?;

        Ok(Self {
            store,
            update_frequency,
            cancel: Mutex::new(Some(sender)),
        })
    }

    /// Create a store from a [`TrustStoreConfig`]
    pub fn from_config(config: &TrustStoreConfig) -> Result<Self> {
        Self::new(config.trust_dirs.clone(), config.update_frequency)
    }

    /// The store being refreshed
    pub fn trust_store(&self) -> &DefaultTrustStore {
        &self.store
    }

    /// Whether the refresh thread has been told to stop
    pub fn is_cancelled(&self) -> bool {
        self.cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_none()
    }
}

impl Updateable for RefreshingTrustStore {
    fn update_frequency(&self) -> Duration {
        self.update_frequency
    }

    fn update(&self) -> Result<()> {
        self.store.load_trust_information()
    }

    fn cancel(&self) {
        let sender = self
            .cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(sender) = sender {
            // The thread may already be gone, dropping the sender is enough then
            let _ = sender.send(());
        }
    }
}

impl VomsTrustStore for RefreshingTrustStore {
    fn snapshot(&self) -> Arc<TrustSnapshot> {
        self.store.snapshot()
    }
}

impl Drop for RefreshingTrustStore {
    fn drop(&mut self) {
        self.cancel();
    }
}
