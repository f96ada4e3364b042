// Copyright (c) 2023 The MobileCoin Foundation

//! VOMS trust stores and the snapshots they hand out

use super::loader::{load_trust_directories, MissingDirectory};
use super::lsc::{LscFile, LscInfo};
use crate::config::TrustStoreConfig;
use crate::x509::DistinguishedName;
use crate::Result;
use arc_swap::ArcSwap;
use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::error;
use x509_cert::name::Name;
use x509_cert::Certificate;

/// An immutable view of the trust information at one point in time.
///
/// A validation works against a single snapshot, so a concurrent refresh is
/// never observed half applied.
#[derive(Debug, Default)]
pub struct TrustSnapshot {
    certificates: Vec<Certificate>,
    lsc_files: HashMap<String, HashMap<String, Arc<LscFile>>>,
    skipped_files: Vec<PathBuf>,
}

impl TrustSnapshot {
    pub(crate) fn new(
        certificates: Vec<Certificate>,
        lsc_files: HashMap<String, HashMap<String, Arc<LscFile>>>,
        skipped_files: Vec<PathBuf>,
    ) -> Self {
        Self {
            certificates,
            lsc_files,
            skipped_files,
        }
    }

    /// The directly trusted AA certificates, without duplicates
    pub fn local_aa_certificates(&self) -> &[Certificate] {
        &self.certificates
    }

    /// The local AA certificates whose subject is `subject`
    pub fn aa_certificates_by_subject<'a>(
        &'a self,
        subject: &'a Name,
    ) -> impl Iterator<Item = &'a Certificate> + 'a {
        let subject = DistinguishedName::from(subject);
        self.certificates.iter().filter(move |certificate| {
            DistinguishedName::from(&certificate.tbs_certificate.subject) == subject
        })
    }

    /// The LSC file of `hostname` in `vo`
    pub fn lsc(&self, vo: &str, hostname: &str) -> Option<Arc<LscFile>> {
        self.lsc_files.get(vo)?.get(hostname).cloned()
    }

    /// LSC information keyed by VO, hosts in name order
    pub fn all_lsc_info(&self) -> BTreeMap<String, Vec<Arc<LscFile>>> {
        self.lsc_files
            .iter()
            .map(|(vo, hosts)| {
                let mut files = hosts.values().cloned().collect::<Vec<_>>();
                files.sort_by(|a, b| a.hostname().cmp(b.hostname()));
                (vo.clone(), files)
            })
            .collect()
    }

    pub(crate) fn lsc_count(&self) -> usize {
        self.lsc_files.values().map(HashMap::len).sum()
    }

    /// Files that were found but could not be used
    pub fn skipped_files(&self) -> &[PathBuf] {
        &self.skipped_files
    }

    /// Whether the snapshot holds no trust information at all
    pub fn is_empty(&self) -> bool {
        self.certificates.is_empty() && self.lsc_files.values().all(HashMap::is_empty)
    }
}

/// Source of the trust information used to validate VOMS attribute
/// certificates
pub trait VomsTrustStore: core::fmt::Debug + Send + Sync {
    /// The current trust information
    fn snapshot(&self) -> Arc<TrustSnapshot>;

    /// The directly trusted AA certificates
    fn local_aa_certificates(&self) -> Vec<Certificate> {
        self.snapshot().local_aa_certificates().to_vec()
    }

    /// A directly trusted AA certificate with the subject `subject`
    fn aa_certificate_by_subject(&self, subject: &Name) -> Option<Certificate> {
        self.snapshot()
            .aa_certificates_by_subject(subject)
            .next()
            .cloned()
    }

    /// The LSC file of `hostname` in `vo`
    fn lsc(&self, vo: &str, hostname: &str) -> Option<Arc<LscFile>> {
        self.snapshot().lsc(vo, hostname)
    }

    /// LSC information keyed by VO
    fn all_lsc_info(&self) -> BTreeMap<String, Vec<Arc<LscFile>>> {
        self.snapshot().all_lsc_info()
    }
}

/// Trust store backed by one or more VOMS trust directories
#[derive(Debug)]
pub struct DefaultTrustStore {
    trust_dirs: Vec<PathBuf>,
    snapshot: ArcSwap<TrustSnapshot>,
}

impl DefaultTrustStore {
    /// Load the trust directories, failing when they hold nothing usable
    pub fn new(trust_dirs: Vec<PathBuf>) -> Result<Self> {
        let snapshot = load_trust_directories(&trust_dirs, MissingDirectory::Fail)?;
        Ok(Self {
            trust_dirs,
            snapshot: ArcSwap::from_pointee(snapshot),
        })
    }

    /// Create a store from a [`TrustStoreConfig`]
    pub fn from_config(config: &TrustStoreConfig) -> Result<Self> {
        Self::new(config.trust_dirs.clone())
    }

    /// The configured trust directories
    pub fn trust_directories(&self) -> &[PathBuf] {
        &self.trust_dirs
    }

    /// Reload the trust directories.
    ///
    /// A directory which no longer exists is recorded as skipped. On failure
    /// the previous snapshot stays in place.
    pub fn load_trust_information(&self) -> Result<()> {
        match load_trust_directories(&self.trust_dirs, MissingDirectory::Skip) {
            Ok(snapshot) => {
                self.snapshot.store(Arc::new(snapshot));
                Ok(())
            }
            Err(err) => {
                error!(
                    directories = ?self.trust_dirs.iter().map(|dir| dir.display()).collect::<Vec<_>>(),
                    error = %err,
                    "Failed to reload VOMS trust information, keeping the previous one"
                );
                Err(err)
            }
        }
    }
}

impl VomsTrustStore for DefaultTrustStore {
    fn snapshot(&self) -> Arc<TrustSnapshot> {
        self.snapshot.load_full()
    }
}
