// Copyright (c) 2023 The MobileCoin Foundation

//! Trait and Error for validating certificate chains

use crate::x509::ProxyType;
use core::time::Duration;
use x509_cert::Certificate;

/// Error validating a certificate chain
///
/// Certificate positions count from the leaf, which is at index 0.
#[derive(displaydoc::Display, Debug, Clone, PartialEq, Eq)]
pub enum ChainValidationError {
    /// The certificate chain is empty
    EmptyChain,
    /// Certificate {0} of the chain is not yet valid
    CertificateNotYetValid(usize),
    /// Certificate {0} of the chain has expired
    CertificateExpired(usize),
    /// Certificate {0} of the chain could not be decoded
    GeneralCertificateError(usize),
    /// The issuer of certificate {0} is not the subject of the next certificate
    NameChaining(usize),
    /// The signature of certificate {0} does not verify
    SignatureVerification(usize),
    /// Certificate {0} is issued by a certificate which is not a CA
    IssuerNotCa(usize),
    /// No trust anchor is known for issuer {0}
    UntrustedIssuer(String),
    /// Certificate {0} is not a valid proxy: {1}
    InvalidProxy(usize, String),
}

/// A chain which passed validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedChain {
    end_entity: usize,
    proxy_type: Option<ProxyType>,
    limited: bool,
    not_after: Duration,
}

impl ValidatedChain {
    /// Describe a chain which passed validation
    pub fn new(
        end_entity: usize,
        proxy_type: Option<ProxyType>,
        limited: bool,
        not_after: Duration,
    ) -> Self {
        Self {
            end_entity,
            proxy_type,
            limited,
            not_after,
        }
    }

    /// Index of the end-entity certificate, the first non proxy from the leaf
    pub fn end_entity(&self) -> usize {
        self.end_entity
    }

    /// The dialect of the leaf proxy, `None` when the leaf is the end-entity
    pub fn proxy_type(&self) -> Option<ProxyType> {
        self.proxy_type
    }

    /// Whether any proxy in the chain was issued with limited delegation
    pub fn is_limited(&self) -> bool {
        self.limited
    }

    /// The earliest expiry in the chain, as a duration since the Unix epoch
    pub fn not_after(&self) -> Duration {
        self.not_after
    }
}

/// A trait whose implementation authenticates leaf first certificate chains,
/// proxies included, against a set of trust anchors.
///
/// The VOMS validator uses it for the holder's chain and for the AA chains
/// embedded in attribute certificates.
pub trait ChainValidator: core::fmt::Debug + Send + Sync {
    /// Validate a certificate chain.
    ///
    /// # Arguments
    /// * `chain` - The certificates, leaf first.
    /// * `unix_time` - The time to validate at, as a duration since the Unix
    ///   epoch.
    fn validate(
        &self,
        chain: &[Certificate],
        unix_time: Duration,
    ) -> Result<ValidatedChain, ChainValidationError>;

    /// Release resources held by the validator.
    ///
    /// Called once when the owning VOMS validator shuts down.
    fn dispose(&self) {}
}
