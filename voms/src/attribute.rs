// Copyright (c) 2023 The MobileCoin Foundation

//! The VOMS attributes carried by one attribute certificate

use crate::ac::AttributeCertificate;
use core::time::Duration;
use der::{DateTime, Encode};
use std::sync::Arc;
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::Certificate;

/// A name, value and context triple from the generic attributes extension
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct VomsGenericAttribute {
    name: String,
    value: String,
    context: String,
}

impl VomsGenericAttribute {
    /// Create an attribute from its parts
    pub fn new(
        name: impl Into<String>,
        value: impl Into<String>,
        context: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            context: context.into(),
        }
    }

    /// The attribute name
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The attribute value
    pub fn value(&self) -> &str {
        &self.value
    }

    /// The VO which issued the attribute
    pub fn context(&self) -> &str {
        &self.context
    }
}

/// Attributes parsed from a single VOMS attribute certificate.
///
/// Immutable once parsed and cheap to clone.
#[derive(Debug, Clone)]
pub struct VomsAttribute {
    pub(crate) vo: String,
    pub(crate) host: String,
    pub(crate) port: u16,
    pub(crate) holder: Name,
    pub(crate) holder_serial: SerialNumber,
    pub(crate) holder_subject: Option<Name>,
    pub(crate) issuer: Name,
    pub(crate) not_before: DateTime,
    pub(crate) not_after: DateTime,
    pub(crate) fqans: Vec<String>,
    pub(crate) generic_attributes: Vec<VomsGenericAttribute>,
    pub(crate) targets: Vec<String>,
    pub(crate) signature: Vec<u8>,
    pub(crate) aa_certificates: Vec<Certificate>,
    pub(crate) attribute_certificate: Arc<AttributeCertificate>,
}

impl VomsAttribute {
    /// The VO the attributes belong to
    pub fn vo(&self) -> &str {
        &self.vo
    }

    /// Host of the VOMS server which issued the AC
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Port of the VOMS server which issued the AC
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Issuer of the certificate the AC was issued to
    pub fn holder(&self) -> &Name {
        &self.holder
    }

    /// Serial number of the certificate the AC was issued to
    pub fn holder_serial(&self) -> &SerialNumber {
        &self.holder_serial
    }

    /// Subject of the certificate the AC was issued to, when the AC names it
    pub fn holder_subject(&self) -> Option<&Name> {
        self.holder_subject.as_ref()
    }

    /// Subject of the AA certificate which signed the AC
    pub fn issuer(&self) -> &Name {
        &self.issuer
    }

    /// Start of the AC validity period
    pub fn not_before(&self) -> DateTime {
        self.not_before
    }

    /// End of the AC validity period
    pub fn not_after(&self) -> DateTime {
        self.not_after
    }

    /// Whether `unix_time` falls inside the AC validity period
    pub fn is_valid_at(&self, unix_time: Duration) -> bool {
        self.not_before.unix_duration() <= unix_time && unix_time <= self.not_after.unix_duration()
    }

    /// The FQANs in issue order
    pub fn fqans(&self) -> &[String] {
        &self.fqans
    }

    /// The first FQAN, the one requested as primary
    pub fn primary_fqan(&self) -> Option<&str> {
        self.fqans.first().map(String::as_str)
    }

    /// Attributes from the generic attributes extension
    pub fn generic_attributes(&self) -> &[VomsGenericAttribute] {
        &self.generic_attributes
    }

    /// Host names the AC is restricted to, empty when unrestricted
    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    /// The AA signature over the AC
    pub fn signature(&self) -> &[u8] {
        &self.signature
    }

    /// The AA chain embedded in the AC, leaf first
    pub fn aa_certificates(&self) -> &[Certificate] {
        &self.aa_certificates
    }

    /// The decoded AC
    pub fn attribute_certificate(&self) -> &AttributeCertificate {
        &self.attribute_certificate
    }

    /// The DER encoding of the AC
    pub fn to_der(&self) -> der::Result<Vec<u8>> {
        self.attribute_certificate.to_der()
    }
}
