// Copyright (c) 2023 The MobileCoin Foundation

//! Validation of the VOMS attribute certificates carried by a certificate
//! chain
//!
//! Every AC goes through the same checks, stopping at the first failing
//! step:
//!
//! 1. the chain itself is authenticated by the [`ChainValidator`]
//! 2. the AC is valid at the reference time
//! 3. the AC holder is the end-entity certificate of the chain
//! 4. the AA is trusted, through a local AA certificate or an LSC file, and
//!    its signature over the AC verifies
//! 5. the local host is one of the AC targets, if the AC has any

use crate::attribute::VomsAttribute;
use crate::certificate_chain::{ChainValidator, ValidatedChain};
use crate::config::ValidatorConfig;
use crate::parser::{ParsedAc, VomsAcParser};
use crate::trust::{LscFile, LscInfo, TrustSnapshot, VomsTrustStore};
use crate::validation::{
    ValidationErrorCode, ValidationErrorMessage, ValidationResult, ValidationResultListener,
};
use crate::x509::{check_validity, DistinguishedName, PublicKey, Signature};
use core::fmt::{Debug, Formatter};
use core::time::Duration;
use der::DateTime;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use subtle::ConstantTimeEq;
use tracing::{debug, warn};
use x509_cert::Certificate;

type CheckResult = Result<(), Vec<ValidationErrorMessage>>;

#[derive(Debug)]
enum ChainValidatorHandle {
    /// Disposed when the engine shuts down
    Owned(Box<dyn ChainValidator>),
    Shared(Arc<dyn ChainValidator>),
}

impl ChainValidatorHandle {
    fn get(&self) -> &dyn ChainValidator {
        match self {
            ChainValidatorHandle::Owned(validator) => validator.as_ref(),
            ChainValidatorHandle::Shared(validator) => validator.as_ref(),
        }
    }
}

/// Validates VOMS attribute certificates against a trust store.
///
/// One instance may be shared by any number of threads.
pub struct VomsAcValidator {
    trust_store: Arc<dyn VomsTrustStore>,
    chain_validator: ChainValidatorHandle,
    parser: VomsAcParser,
    config: ValidatorConfig,
    listeners: Vec<Arc<dyn ValidationResultListener>>,
    shut_down: AtomicBool,
}

impl VomsAcValidator {
    /// Create a validator owning `chain_validator`, which is disposed on
    /// [`VomsAcValidator::shutdown`]
    pub fn new(
        trust_store: Arc<dyn VomsTrustStore>,
        chain_validator: Box<dyn ChainValidator>,
    ) -> Self {
        Self::with_chain_validator(trust_store, ChainValidatorHandle::Owned(chain_validator))
    }

    /// Create a validator using a chain validator owned by someone else
    pub fn with_shared_chain_validator(
        trust_store: Arc<dyn VomsTrustStore>,
        chain_validator: Arc<dyn ChainValidator>,
    ) -> Self {
        Self::with_chain_validator(trust_store, ChainValidatorHandle::Shared(chain_validator))
    }

    fn with_chain_validator(
        trust_store: Arc<dyn VomsTrustStore>,
        chain_validator: ChainValidatorHandle,
    ) -> Self {
        Self {
            trust_store,
            chain_validator,
            parser: VomsAcParser::new(),
            config: ValidatorConfig::default(),
            listeners: Vec::new(),
            shut_down: AtomicBool::new(false),
        }
    }

    /// Use `config` instead of [`ValidatorConfig::default`]
    pub fn with_config(mut self, config: ValidatorConfig) -> Self {
        self.config = config;
        self
    }

    /// Register a listener for every [`ValidationResult`]
    pub fn with_listener(mut self, listener: impl ValidationResultListener + 'static) -> Self {
        self.listeners.push(Arc::new(listener));
        self
    }

    /// The configuration in use
    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// The attributes of the ACs in `chain` which pass every check, in
    /// extension order
    pub fn validate(&self, chain: &[Certificate]) -> Vec<VomsAttribute> {
        self.validate_at(chain, SystemTime::now())
    }

    /// Like [`VomsAcValidator::validate`] with `time` as the reference time
    pub fn validate_at(&self, chain: &[Certificate], time: SystemTime) -> Vec<VomsAttribute> {
        self.validate_with_results_at(chain, time)
            .into_iter()
            .filter_map(ValidationResult::into_valid_attributes)
            .collect()
    }

    /// The outcome of every AC in `chain`, rejected ones included
    pub fn validate_with_results(&self, chain: &[Certificate]) -> Vec<ValidationResult> {
        self.validate_with_results_at(chain, SystemTime::now())
    }

    /// Like [`VomsAcValidator::validate_with_results`] with `time` as the
    /// reference time
    pub fn validate_with_results_at(
        &self,
        chain: &[Certificate],
        time: SystemTime,
    ) -> Vec<ValidationResult> {
        let unix_time = time.duration_since(UNIX_EPOCH).unwrap_or_default();
        let results = self.results(chain, unix_time);
        for result in &results {
            log_result(result);
            self.notify(result);
        }
        results
    }

    /// Release the owned chain validator. Only the first call has an effect.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::AcqRel) {
            return;
        }
        if let ChainValidatorHandle::Owned(validator) = &self.chain_validator {
            validator.dispose();
        }
    }

    fn results(&self, chain: &[Certificate], unix_time: Duration) -> Vec<ValidationResult> {
        let parsed = match self.parser.parse_with_diagnostics(chain) {
            Ok(parsed) => parsed,
            Err(error) => {
                let message = ValidationErrorMessage::new(
                    ValidationErrorCode::InvalidAcCert,
                    [error.to_string()],
                );
                return vec![ValidationResult::new(None, vec![message])];
            }
        };
        if parsed.is_empty() {
            return Vec::new();
        }

        let validated = match self.chain_validator.get().validate(chain, unix_time) {
            Ok(validated) => validated,
            Err(error) => {
                let message =
                    ValidationErrorMessage::new(ValidationErrorCode::CanlError, [error.to_string()]);
                return parsed
                    .into_iter()
                    .map(|parsed| match parsed {
                        Ok(attributes) => {
                            ValidationResult::new(Some(attributes), vec![message.clone()])
                        }
                        Err(invalid) => ValidationResult::new(None, vec![invalid]),
                    })
                    .collect();
            }
        };

        // Every AC of the chain sees the same trust information
        let snapshot = self.trust_store.snapshot();
        parsed
            .into_iter()
            .map(|parsed| self.result(parsed, chain, &validated, &snapshot, unix_time))
            .collect()
    }

    fn result(
        &self,
        parsed: ParsedAc,
        chain: &[Certificate],
        validated: &ValidatedChain,
        snapshot: &TrustSnapshot,
        unix_time: Duration,
    ) -> ValidationResult {
        let attributes = match parsed {
            Ok(attributes) => attributes,
            Err(invalid) => return ValidationResult::new(None, vec![invalid]),
        };
        let checked = panic::catch_unwind(AssertUnwindSafe(|| {
            self.check(&attributes, chain, validated, snapshot, unix_time)
        }));
        let errors = match checked {
            Ok(Ok(())) => Vec::new(),
            Ok(Err(errors)) => errors,
            Err(payload) => {
                let reason = panic_message(payload.as_ref());
                warn!(
                    vo = attributes.vo(),
                    issuer = %DistinguishedName::from(attributes.issuer()),
                    %reason,
                    "Unexpected fault while validating VOMS attribute certificate"
                );
                vec![ValidationErrorMessage::new(
                    ValidationErrorCode::Other,
                    [reason],
                )]
            }
        };
        ValidationResult::new(Some(attributes), errors)
    }

    fn check(
        &self,
        attributes: &VomsAttribute,
        chain: &[Certificate],
        validated: &ValidatedChain,
        snapshot: &TrustSnapshot,
        unix_time: Duration,
    ) -> CheckResult {
        self.check_validity(attributes, unix_time)?;
        check_holder(attributes, chain, validated)?;
        self.check_signature(attributes, snapshot, unix_time)?;
        self.check_targets(attributes)
    }

    fn check_validity(&self, attributes: &VomsAttribute, unix_time: Duration) -> CheckResult {
        let not_before = attributes.not_before().unix_duration();
        let not_after = attributes.not_after().unix_duration();
        // The skew only ever widens the start of the period
        if not_before.saturating_sub(self.config.clock_skew) <= unix_time && unix_time <= not_after
        {
            return Ok(());
        }
        let reference_time = DateTime::from_unix_duration(unix_time)
            .map(|time| time.to_string())
            .unwrap_or_else(|_| format!("{}s", unix_time.as_secs()));
        Err(vec![ValidationErrorMessage::new(
            ValidationErrorCode::AcNotValidAtCurrentTime,
            [
                attributes.not_before().to_string(),
                attributes.not_after().to_string(),
                reference_time,
            ],
        )])
    }

    fn check_signature(
        &self,
        attributes: &VomsAttribute,
        snapshot: &TrustSnapshot,
        unix_time: Duration,
    ) -> CheckResult {
        let local = snapshot
            .aa_certificates_by_subject(attributes.issuer())
            .collect::<Vec<_>>();
        if !local.is_empty() {
            return verify_with_local_certificates(attributes, &local, unix_time);
        }

        match snapshot.lsc(attributes.vo(), attributes.host()) {
            Some(lsc) => self.verify_with_lsc(attributes, &lsc, unix_time),
            None => Err(vec![
                ValidationErrorMessage::new(
                    ValidationErrorCode::AaCertNotFound,
                    [DistinguishedName::from(attributes.issuer()).to_string()],
                ),
                ValidationErrorMessage::new(
                    ValidationErrorCode::LscFileNotFound,
                    [attributes.vo(), attributes.host()],
                ),
            ]),
        }
    }

    fn verify_with_lsc(
        &self,
        attributes: &VomsAttribute,
        lsc: &LscFile,
        unix_time: Duration,
    ) -> CheckResult {
        let issuer = DistinguishedName::from(attributes.issuer());
        let aa_chain = attributes.aa_certificates();
        let Some(aa_certificate) = aa_chain.first() else {
            return Err(vec![ValidationErrorMessage::new(
                ValidationErrorCode::EmptyAcCertsExtension,
                [issuer.to_string()],
            )]);
        };

        if !lsc.matches(aa_chain) {
            let subjects = aa_chain
                .iter()
                .map(|certificate| {
                    DistinguishedName::from(&certificate.tbs_certificate.subject).to_string()
                })
                .collect::<Vec<_>>()
                .join(", ");
            return Err(vec![ValidationErrorMessage::new(
                ValidationErrorCode::LscDescriptionDoesntMatchAcCert,
                [lsc.vo().to_string(), lsc.hostname().to_string(), subjects],
            )]);
        }

        let subject = DistinguishedName::from(&aa_certificate.tbs_certificate.subject);
        if subject != issuer {
            return Err(vec![ValidationErrorMessage::new(
                ValidationErrorCode::InvalidAaCert,
                [
                    subject.to_string(),
                    format!("subject differs from the AC issuer {issuer}"),
                ],
            )]);
        }

        self.chain_validator
            .get()
            .validate(aa_chain, unix_time)
            .map_err(|error| {
                vec![ValidationErrorMessage::new(
                    ValidationErrorCode::AaCertFailsSignatureVerification,
                    [error.to_string()],
                )]
            })?;

        let key = PublicKey::try_from(aa_certificate).map_err(|error| {
            vec![ValidationErrorMessage::new(
                ValidationErrorCode::InvalidAaCert,
                [subject.to_string(), error.to_string()],
            )]
        })?;
        if verify_ac_signature(attributes, &key) {
            Ok(())
        } else {
            Err(vec![signature_failure(attributes)])
        }
    }

    fn check_targets(&self, attributes: &VomsAttribute) -> CheckResult {
        let targets = attributes.targets();
        if targets.is_empty() {
            return Ok(());
        }
        let local_hostname = self.config.local_hostname.as_deref();
        if let Some(hostname) = local_hostname {
            if targets
                .iter()
                .any(|target| target.eq_ignore_ascii_case(hostname))
            {
                return Ok(());
            }
        }
        Err(vec![ValidationErrorMessage::new(
            ValidationErrorCode::LocalhostDoesntMatchAcTarget,
            [local_hostname.unwrap_or("<unset>").to_string(), targets.join(", ")],
        )])
    }

    fn notify(&self, result: &ValidationResult) {
        for listener in &self.listeners {
            let notified = panic::catch_unwind(AssertUnwindSafe(|| {
                listener.notify_validation_result(result)
            }));
            if let Err(payload) = notified {
                warn!(
                    reason = %panic_message(payload.as_ref()),
                    "Validation result listener panicked"
                );
            }
        }
    }
}

impl Debug for VomsAcValidator {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("VomsAcValidator")
            .field("trust_store", &self.trust_store)
            .field("chain_validator", &self.chain_validator)
            .field("config", &self.config)
            .field("listeners", &self.listeners.len())
            .field("shut_down", &self.shut_down)
            .finish()
    }
}

impl Drop for VomsAcValidator {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// The holder named by the AC must be the end-entity certificate of `chain`
fn check_holder(
    attributes: &VomsAttribute,
    chain: &[Certificate],
    validated: &ValidatedChain,
) -> CheckResult {
    let Some(end_entity) = chain.get(validated.end_entity()) else {
        return Err(vec![ValidationErrorMessage::new(
            ValidationErrorCode::Other,
            ["end-entity certificate outside of the chain"],
        )]);
    };
    let tbs = &end_entity.tbs_certificate;

    let issuer_matches =
        DistinguishedName::from(attributes.holder()) == DistinguishedName::from(&tbs.issuer);
    let serial_matches: bool = attributes
        .holder_serial()
        .as_bytes()
        .ct_eq(tbs.serial_number.as_bytes())
        .into();
    let subject_matches = attributes.holder_subject().map_or(true, |subject| {
        DistinguishedName::from(subject) == DistinguishedName::from(&tbs.subject)
    });

    if issuer_matches && serial_matches && subject_matches {
        return Ok(());
    }
    Err(vec![ValidationErrorMessage::new(
        ValidationErrorCode::AcHolderDoesntMatchCertChain,
        [
            DistinguishedName::from(attributes.holder()).to_string(),
            hex::encode_upper(attributes.holder_serial().as_bytes()),
            DistinguishedName::from(&tbs.issuer).to_string(),
            hex::encode_upper(tbs.serial_number.as_bytes()),
        ],
    )])
}

/// Try every local AA certificate named like the AC issuer
fn verify_with_local_certificates(
    attributes: &VomsAttribute,
    candidates: &[&Certificate],
    unix_time: Duration,
) -> CheckResult {
    let mut invalid = Vec::new();
    let mut signature_checked = false;
    for certificate in candidates {
        let subject = DistinguishedName::from(&certificate.tbs_certificate.subject);
        let key = check_validity(certificate, unix_time)
            .and_then(|()| PublicKey::try_from(*certificate));
        match key {
            Ok(key) => {
                if verify_ac_signature(attributes, &key) {
                    return Ok(());
                }
                signature_checked = true;
            }
            Err(error) => invalid.push(ValidationErrorMessage::new(
                ValidationErrorCode::InvalidAaCert,
                [subject.to_string(), error.to_string()],
            )),
        }
    }

    if signature_checked {
        Err(vec![signature_failure(attributes)])
    } else {
        Err(invalid)
    }
}

fn verify_ac_signature(attributes: &VomsAttribute, key: &PublicKey) -> bool {
    let ac = attributes.attribute_certificate();
    let verified = Signature::try_from_bit_string(&ac.signature_algorithm, &ac.signature_value)
        .and_then(|signature| {
            let message = ac.signed_bytes()?;
            key.verify(&message, &signature)
        });
    verified.is_ok()
}

fn signature_failure(attributes: &VomsAttribute) -> ValidationErrorMessage {
    ValidationErrorMessage::new(
        ValidationErrorCode::AcCertFailsSignatureVerification,
        [DistinguishedName::from(attributes.issuer()).to_string()],
    )
}

fn log_result(result: &ValidationResult) {
    let Some(attributes) = result.attributes() else {
        debug!(errors = ?codes(result), "Rejected malformed VOMS attribute certificate");
        return;
    };
    if result.is_valid() {
        debug!(
            vo = attributes.vo(),
            fqan = attributes.primary_fqan().unwrap_or_default(),
            "Accepted VOMS attribute certificate"
        );
    } else {
        debug!(
            vo = attributes.vo(),
            errors = ?codes(result),
            "Rejected VOMS attribute certificate"
        );
    }
}

fn codes(result: &ValidationResult) -> Vec<ValidationErrorCode> {
    result.errors().iter().map(|error| error.code()).collect()
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "panic".to_string()
    }
}
