// Copyright (c) 2023 The MobileCoin Foundation

//! Configuration of the trust store and the validator
//!
//! Both are JSON loadable, durations are given in whole seconds:
//!
//! ```json
//! {
//!     "trust_dirs": ["/etc/grid-security/vomsdir"],
//!     "update_frequency_secs": 43200
//! }
//! ```

use crate::Error;
use serde::{Deserialize, Deserializer};
use std::path::PathBuf;
use std::time::Duration;

/// The usual location of VOMS trust information
pub const DEFAULT_TRUST_DIR: &str = "/etc/grid-security/vomsdir";

/// Default period between trust store reloads
pub const DEFAULT_UPDATE_FREQUENCY: Duration = Duration::from_secs(12 * 60 * 60);

/// Default tolerance for clocks running behind the AA clock
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(5 * 60);

/// Where trust information is loaded from and how often it is reloaded
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct TrustStoreConfig {
    /// Directories holding AA certificates and LSC files
    pub trust_dirs: Vec<PathBuf>,
    /// Period between reloads, `update_frequency_secs` in JSON
    #[serde(rename = "update_frequency_secs", deserialize_with = "seconds")]
    pub update_frequency: Duration,
}

impl Default for TrustStoreConfig {
    fn default() -> Self {
        Self {
            trust_dirs: vec![PathBuf::from(DEFAULT_TRUST_DIR)],
            update_frequency: DEFAULT_UPDATE_FREQUENCY,
        }
    }
}

impl TryFrom<&str> for TrustStoreConfig {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let config: TrustStoreConfig = serde_json::from_str(value)?;
        Ok(config)
    }
}

/// Tunables of [`crate::VomsAcValidator`]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ValidatorConfig {
    /// Host name compared against AC targets. ACs carrying targets are
    /// rejected when this is unset.
    pub local_hostname: Option<String>,
    /// Tolerance applied to the start of the AC validity period
    #[serde(rename = "clock_skew_secs", deserialize_with = "seconds")]
    pub clock_skew: Duration,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        Self {
            local_hostname: None,
            clock_skew: DEFAULT_CLOCK_SKEW,
        }
    }
}

impl TryFrom<&str> for ValidatorConfig {
    type Error = Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let config: ValidatorConfig = serde_json::from_str(value)?;
        Ok(config)
    }
}

fn seconds<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
    u64::deserialize(deserializer).map(Duration::from_secs)
}
