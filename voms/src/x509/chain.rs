// Copyright (c) 2023 The MobileCoin Foundation

//! Support for validating certificate chains which may start with proxies

use super::algorithm::{PublicKey, Signature};
use super::name::DistinguishedName;
use super::check_validity;
use super::proxy::{end_entity_index, proxy_info};
use crate::certificate_chain::{ChainValidationError, ChainValidator, ValidatedChain};
use const_oid::db::rfc5280::ID_CE_BASIC_CONSTRAINTS;
use arc_swap::ArcSwap;
use core::time::Duration;
use der::{Decode, Encode};
use std::sync::Arc;
use x509_cert::ext::pkix::BasicConstraints;
use x509_cert::Certificate;

/// Validates leaf first chains against a replaceable set of trust anchors.
///
/// Proxies of all three dialects are accepted above the end-entity
/// certificate. Name chaining, signatures, validity periods, CA flags, proxy
/// naming and proxy path length constraints are checked. Revocation is not.
#[derive(Debug)]
pub struct ProxyChainValidator {
    trust_anchors: ArcSwap<Vec<Certificate>>,
}

impl ProxyChainValidator {
    /// Create a validator trusting the CA certificates in `trust_anchors`
    pub fn new(trust_anchors: Vec<Certificate>) -> Self {
        Self {
            trust_anchors: ArcSwap::from_pointee(trust_anchors),
        }
    }

    /// Replace the trust anchors. Validations already running keep the
    /// anchors they started with.
    pub fn update_trust_anchors(&self, trust_anchors: Vec<Certificate>) {
        self.trust_anchors.store(Arc::new(trust_anchors));
    }

    /// The current trust anchors
    pub fn trust_anchors(&self) -> Arc<Vec<Certificate>> {
        self.trust_anchors.load_full()
    }

    fn verify_anchored(
        &self,
        index: usize,
        certificate: &Certificate,
        unix_time: Duration,
    ) -> Result<(), ChainValidationError> {
        let anchors = self.trust_anchors.load();
        let issuer = DistinguishedName::from(&certificate.tbs_certificate.issuer);
        let mut candidates = anchors
            .iter()
            .filter(|anchor| DistinguishedName::from(&anchor.tbs_certificate.subject) == issuer)
            .filter(|anchor| check_validity(anchor, unix_time).is_ok())
            .peekable();

        if candidates.peek().is_none() {
            return Err(ChainValidationError::UntrustedIssuer(issuer.to_string()));
        }
        if candidates.any(|anchor| verify_signed_by(index, certificate, anchor).is_ok()) {
            Ok(())
        } else {
            Err(ChainValidationError::SignatureVerification(index))
        }
    }
}

impl ChainValidator for ProxyChainValidator {
    fn validate(
        &self,
        chain: &[Certificate],
        unix_time: Duration,
    ) -> Result<ValidatedChain, ChainValidationError> {
        if chain.is_empty() {
            return Err(ChainValidationError::EmptyChain);
        }

        let mut not_after = Duration::MAX;
        for (index, certificate) in chain.iter().enumerate() {
            let validity = &certificate.tbs_certificate.validity;
            if unix_time < validity.not_before.to_unix_duration() {
                return Err(ChainValidationError::CertificateNotYetValid(index));
            }
            let expiry = validity.not_after.to_unix_duration();
            if unix_time > expiry {
                return Err(ChainValidationError::CertificateExpired(index));
            }
            not_after = not_after.min(expiry);
        }

        let end_entity = end_entity_index(chain).ok_or_else(|| {
            ChainValidationError::InvalidProxy(
                chain.len() - 1,
                "the chain has no end-entity certificate".to_string(),
            )
        })?;

        let mut limited = false;
        let mut proxy_type = None;
        for (index, certificate) in chain.iter().enumerate().take(end_entity) {
            let issuer = &chain[index + 1];
            let info = match proxy_info(certificate, Some(issuer)) {
                Ok(Some(info)) => info,
                Ok(None) => {
                    return Err(ChainValidationError::InvalidProxy(
                        index,
                        "not a proxy certificate".to_string(),
                    ))
                }
                Err(error) => {
                    return Err(ChainValidationError::InvalidProxy(index, error.to_string()))
                }
            };
            if let Some(max) = info.path_len_constraint {
                if index as u64 > u64::from(max) {
                    return Err(ChainValidationError::InvalidProxy(
                        index,
                        format!("the path length constraint of {max} is exceeded"),
                    ));
                }
            }
            if is_ca(certificate) {
                return Err(ChainValidationError::InvalidProxy(
                    index,
                    "a proxy can not be a CA".to_string(),
                ));
            }
            if is_ca(issuer) {
                return Err(ChainValidationError::InvalidProxy(
                    index,
                    "issued by a CA certificate".to_string(),
                ));
            }
            limited |= info.limited;
            proxy_type.get_or_insert(info.proxy_type);
        }

        if let Err(error) = proxy_info(&chain[end_entity], chain.get(end_entity + 1)) {
            return Err(ChainValidationError::InvalidProxy(
                end_entity,
                error.to_string(),
            ));
        }

        for (index, certificate) in chain.iter().enumerate() {
            match chain.get(index + 1) {
                Some(issuer) => {
                    if DistinguishedName::from(&certificate.tbs_certificate.issuer)
                        != DistinguishedName::from(&issuer.tbs_certificate.subject)
                    {
                        return Err(ChainValidationError::NameChaining(index));
                    }
                    if index >= end_entity && !is_ca(issuer) {
                        return Err(ChainValidationError::IssuerNotCa(index));
                    }
                    verify_signed_by(index, certificate, issuer)?;
                }
                None => self.verify_anchored(index, certificate, unix_time)?,
            }
        }

        Ok(ValidatedChain::new(end_entity, proxy_type, limited, not_after))
    }
}

/// Verify the signature of `certificate` at `index` with the key of `issuer`
pub(crate) fn verify_signed_by(
    index: usize,
    certificate: &Certificate,
    issuer: &Certificate,
) -> Result<(), ChainValidationError> {
    let key = PublicKey::try_from(issuer)
        .map_err(|_| ChainValidationError::GeneralCertificateError(index))?;
    let signature =
        Signature::try_from_bit_string(&certificate.signature_algorithm, &certificate.signature)
            .map_err(|_| ChainValidationError::GeneralCertificateError(index))?;
    let message = certificate
        .tbs_certificate
        .to_der()
        .map_err(|_| ChainValidationError::GeneralCertificateError(index))?;
    key.verify(&message, &signature)
        .map_err(|_| ChainValidationError::SignatureVerification(index))
}

fn is_ca(certificate: &Certificate) -> bool {
    certificate
        .tbs_certificate
        .extensions
        .iter()
        .flatten()
        .find(|extension| extension.extn_id == ID_CE_BASIC_CONSTRAINTS)
        .and_then(|extension| BasicConstraints::from_der(extension.extn_value.as_bytes()).ok())
        .map_or(false, |constraints| constraints.ca)
}
