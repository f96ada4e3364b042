// Copyright (c) 2023 The MobileCoin Foundation

//! Outcomes of validating VOMS attribute certificates

use crate::attribute::VomsAttribute;
use core::fmt::{Display, Formatter};

/// Why an attribute certificate was rejected
#[derive(displaydoc::Display, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValidationErrorCode {
    /// certificate chain authentication failed
    CanlError,
    /// AC not valid at current time
    AcNotValidAtCurrentTime,
    /// LSC file not found
    LscFileNotFound,
    /// empty AC certificates extension
    EmptyAcCertsExtension,
    /// LSC description does not match AC certificates
    LscDescriptionDoesntMatchAcCert,
    /// invalid attribute certificate
    InvalidAcCert,
    /// AA certificate not found
    AaCertNotFound,
    /// invalid AA certificate
    InvalidAaCert,
    /// AC signature verification failed
    AcCertFailsSignatureVerification,
    /// AA certificate chain verification failed
    AaCertFailsSignatureVerification,
    /// AC holder does not match the certificate chain
    AcHolderDoesntMatchCertChain,
    /// local host does not match AC targets
    LocalhostDoesntMatchAcTarget,
    /// unexpected error
    Other,
}

impl ValidationErrorCode {
    /// Message template, each `{}` is replaced by the next parameter
    fn template(self) -> &'static str {
        match self {
            ValidationErrorCode::CanlError => "Certificate chain validation failed: {}",
            ValidationErrorCode::AcNotValidAtCurrentTime => {
                "AC not valid at current time. AC validity period: [{} - {}], reference time: {}"
            }
            ValidationErrorCode::LscFileNotFound => "LSC file not found for VO {} and host {}",
            ValidationErrorCode::EmptyAcCertsExtension => {
                "The AC certificates extension is empty or missing, issuer {}"
            }
            ValidationErrorCode::LscDescriptionDoesntMatchAcCert => {
                "LSC file for VO {} and host {} does not match the AC certificate chain {}"
            }
            ValidationErrorCode::InvalidAcCert => "Invalid attribute certificate: {}",
            ValidationErrorCode::AaCertNotFound => "No AA certificate found for issuer {}",
            ValidationErrorCode::InvalidAaCert => "Invalid AA certificate {}: {}",
            ValidationErrorCode::AcCertFailsSignatureVerification => {
                "AC signature verification failed for issuer {}"
            }
            ValidationErrorCode::AaCertFailsSignatureVerification => {
                "AA certificate chain verification failed: {}"
            }
            ValidationErrorCode::AcHolderDoesntMatchCertChain => {
                "AC holder {} (serial {}) does not match the end-entity certificate issued by {} (serial {})"
            }
            ValidationErrorCode::LocalhostDoesntMatchAcTarget => {
                "Local host {} does not match any AC target of {}"
            }
            ValidationErrorCode::Other => "Unexpected error: {}",
        }
    }
}

/// A single rejection reason with its rendered message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationErrorMessage {
    code: ValidationErrorCode,
    message: String,
    parameters: Vec<String>,
}

impl ValidationErrorMessage {
    /// Render the message of `code` with `parameters`
    pub fn new<I, P>(code: ValidationErrorCode, parameters: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: ToString,
    {
        let parameters = parameters
            .into_iter()
            .map(|parameter| parameter.to_string())
            .collect::<Vec<_>>();
        let message = render(code.template(), &parameters);
        Self {
            code,
            message,
            parameters,
        }
    }

    /// The kind of failure
    pub fn code(&self) -> ValidationErrorCode {
        self.code
    }

    /// The rendered message
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The values substituted in the message
    pub fn parameters(&self) -> &[String] {
        &self.parameters
    }
}

impl Display for ValidationErrorMessage {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.message)
    }
}

fn render(template: &str, parameters: &[String]) -> String {
    let mut pieces = template.split("{}");
    let mut message = pieces.next().unwrap_or_default().to_string();
    let mut parameters = parameters.iter();
    for piece in pieces {
        if let Some(parameter) = parameters.next() {
            message.push_str(parameter);
        }
        message.push_str(piece);
    }
    message
}

/// The outcome of validating one attribute certificate
#[derive(Debug, Clone)]
pub struct ValidationResult {
    attributes: Option<VomsAttribute>,
    errors: Vec<ValidationErrorMessage>,
}

impl ValidationResult {
    /// Combine the parsed attributes with the errors found
    pub fn new(attributes: Option<VomsAttribute>, errors: Vec<ValidationErrorMessage>) -> Self {
        Self { attributes, errors }
    }

    /// Valid when the AC could be parsed and no error was found
    pub fn is_valid(&self) -> bool {
        self.attributes.is_some() && self.errors.is_empty()
    }

    /// The attributes, present whenever the AC could be parsed
    pub fn attributes(&self) -> Option<&VomsAttribute> {
        self.attributes.as_ref()
    }

    /// Every failed check, empty for a valid AC
    pub fn errors(&self) -> &[ValidationErrorMessage] {
        &self.errors
    }

    pub(crate) fn into_valid_attributes(self) -> Option<VomsAttribute> {
        if self.is_valid() {
            self.attributes
        } else {
            None
        }
    }
}

/// Receives every validation outcome.
///
/// Listeners are called on the validating thread. A panicking listener is
/// logged and does not affect the validation.
pub trait ValidationResultListener: Send + Sync {
    /// Called once for every validated AC
    fn notify_validation_result(&self, result: &ValidationResult);
}

impl<F> ValidationResultListener for F
where
    F: Fn(&ValidationResult) + Send + Sync,
{
    fn notify_validation_result(&self, result: &ValidationResult) {
        self(result)
    }
}
