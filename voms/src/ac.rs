// Copyright (c) 2023 The MobileCoin Foundation

//! ASN.1 model of the attribute certificates issued by VOMS servers, as
//! defined in [RFC5755](https://www.rfc-editor.org/rfc/rfc5755) with the VOMS
//! specific attribute and extensions.
//!
//! ```text
//! AttributeCertificate ::= SEQUENCE {
//!     acinfo               AttributeCertificateInfo,
//!     signatureAlgorithm   AlgorithmIdentifier,
//!     signatureValue       BIT STRING }
//!
//! AttributeCertificateInfo ::= SEQUENCE {
//!     version              AttCertVersion, -- v2(1)
//!     holder               Holder,
//!     issuer               AttCertIssuer,
//!     signature            AlgorithmIdentifier,
//!     serialNumber         CertificateSerialNumber,
//!     attrCertValidityPeriod AttCertValidityPeriod,
//!     attributes           SEQUENCE OF Attribute,
//!     issuerUniqueID       UniqueIdentifier OPTIONAL,
//!     extensions           Extensions OPTIONAL }
//! ```
//!
//! The VOMS extension of a proxy certificate holds `SEQUENCE OF
//! AttributeCertificate`. Only the first is normally present.

use crate::oid;
use der::asn1::{BitString, GeneralizedTime, Ia5String, OctetString};
use der::{Any, Choice, Decode, Encode, Sequence, Tag, TagNumber, Tagged};
use x509_cert::attr::Attribute;
use x509_cert::ext::pkix::name::{GeneralName, GeneralNames};
use x509_cert::ext::Extensions;
use x509_cert::serial_number::SerialNumber;
use x509_cert::spki::AlgorithmIdentifierOwned;
use x509_cert::Certificate;

/// Version number of RFC5755 attribute certificates, v2
pub const AC_VERSION_2: u8 = 1;

/// A signed RFC5755 attribute certificate
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct AttributeCertificate {
    /// The signed content
    pub acinfo: AttributeCertificateInfo,
    /// Algorithm of `signature_value`
    pub signature_algorithm: AlgorithmIdentifierOwned,
    /// Signature of the AA over the DER encoding of `acinfo`
    pub signature_value: BitString,
}

/// The content of an attribute certificate
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct AttributeCertificateInfo {
    /// Always [`AC_VERSION_2`]
    pub version: u8,
    /// The certificate the attributes are bound to
    pub holder: Holder,
    /// The AA which issued the certificate
    pub issuer: AttCertIssuer,
    /// Must equal the outer signature algorithm
    pub signature: AlgorithmIdentifierOwned,
    /// Serial number assigned by the AA
    pub serial_number: SerialNumber,
    /// When the attributes may be used
    pub attr_cert_validity_period: AttCertValidityPeriod,
    /// The attributes, VOMS issues a single FQAN attribute
    pub attributes: Vec<Attribute>,
    /// Unused by VOMS
    #[asn1(optional = "true")]
    pub issuer_unique_id: Option<BitString>,
    /// AC extensions
    #[asn1(optional = "true")]
    pub extensions: Option<Extensions>,
}

/// ```text
/// Holder ::= SEQUENCE {
///     baseCertificateID   [0] IssuerSerial OPTIONAL,
///     entityName          [1] GeneralNames OPTIONAL,
///     objectDigestInfo    [2] ObjectDigestInfo OPTIONAL }
/// ```
///
/// VOMS never issues `objectDigestInfo`.
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct Holder {
    /// Issuer and serial number of the holder certificate
    #[asn1(context_specific = "0", tag_mode = "IMPLICIT", optional = "true")]
    pub base_certificate_id: Option<IssuerSerial>,
    /// Subject of the holder certificate
    #[asn1(context_specific = "1", tag_mode = "IMPLICIT", optional = "true")]
    pub entity_name: Option<GeneralNames>,
}

/// Identifies a certificate by its issuer and serial number
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct IssuerSerial {
    /// Name of the certificate issuer
    pub issuer: GeneralNames,
    /// Serial number of the certificate
    pub serial: SerialNumber,
    /// Unique identifier of the certificate issuer
    #[asn1(optional = "true")]
    pub issuer_uid: Option<BitString>,
}

/// The name of the AA, VOMS uses the v2 form
#[derive(Clone, Debug, Eq, PartialEq, Choice)]
pub enum AttCertIssuer {
    /// Form of version 1 attribute certificates
    V1Form(GeneralNames),
    /// Form of version 2 attribute certificates
    #[asn1(context_specific = "0", tag_mode = "IMPLICIT", constructed = "true")]
    V2Form(V2Form),
}

impl AttCertIssuer {
    /// The names of the issuer, regardless of the form used
    pub fn names(&self) -> &[GeneralName] {
        match self {
            AttCertIssuer::V1Form(names) => names,
            AttCertIssuer::V2Form(form) => form.issuer_name.as_deref().unwrap_or_default(),
        }
    }
}

/// `AttCertIssuer` of version 2 attribute certificates
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct V2Form {
    /// Names of the AA
    #[asn1(optional = "true")]
    pub issuer_name: Option<GeneralNames>,
    /// The AA certificate
    #[asn1(context_specific = "0", tag_mode = "IMPLICIT", optional = "true")]
    pub base_certificate_id: Option<IssuerSerial>,
}

/// Validity period of an attribute certificate
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct AttCertValidityPeriod {
    /// Start of the period
    pub not_before_time: GeneralizedTime,
    /// End of the period, inclusive
    pub not_after_time: GeneralizedTime,
}

/// Value of the FQAN attribute
///
/// ```text
/// IetfAttrSyntax ::= SEQUENCE {
///     policyAuthority [0] GeneralNames OPTIONAL,
///     values SEQUENCE OF CHOICE {
///         octets  OCTET STRING,
///         oid     OBJECT IDENTIFIER,
///         string  UTF8String } }
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct IetfAttrSyntax {
    /// The `vo://host:port` URI of the VOMS server
    #[asn1(context_specific = "0", tag_mode = "IMPLICIT", optional = "true")]
    pub policy_authority: Option<GeneralNames>,
    /// The FQANs
    pub values: Vec<IetfAttrValue>,
}

/// One value of an [`IetfAttrSyntax`]
#[derive(Clone, Debug, Eq, PartialEq, Choice)]
pub enum IetfAttrValue {
    /// Used by VOMS for FQANs
    Octets(OctetString),
    /// Object identifier value
    Oid(const_oid::ObjectIdentifier),
    /// UTF-8 value
    String(String),
}

/// Value of the AC certificates extension, the AA chain leaf first
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct AcCerts {
    /// The AA certificate chain
    pub certificates: Vec<Certificate>,
}

/// One entry of the generic attributes extension, which holds
/// `SEQUENCE OF TagList`
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct TagList {
    /// The `vo://host:port` URI of the VOMS server
    pub policy_authority: GeneralNames,
    /// The attributes
    pub tags: Vec<GenericTag>,
}

/// A generic attribute
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct GenericTag {
    /// Attribute name
    pub name: OctetString,
    /// Attribute value
    pub value: OctetString,
    /// Attribute context, usually the VO
    pub qualifier: OctetString,
}

/// Target names from a target information extension.
///
/// ```text
/// Targets ::= SEQUENCE OF Target
/// Target  ::= CHOICE {
///     targetName   [0] GeneralName,
///     targetGroup  [1] GeneralName,
///     targetCert   [2] TargetCert }
/// ```
///
/// The extension value is a `SEQUENCE OF Targets`. Target groups and target
/// certificates are not used by VOMS and are ignored. The tags are explicit
/// since `GeneralName` is a CHOICE.
pub fn decode_targets(extension_value: &[u8]) -> der::Result<Vec<String>> {
    let sequences = Vec::<Vec<Any>>::from_der(extension_value)?;
    let mut names = Vec::new();
    for target in sequences.iter().flatten() {
        if target.tag() != target_name_tag() {
            continue;
        }
        match GeneralName::from_der(target.value())? {
            GeneralName::DnsName(name) => names.push(name.to_string()),
            GeneralName::UniformResourceIdentifier(uri) => names.push(uri.to_string()),
            _ => {}
        }
    }
    Ok(names)
}

/// Encode `names` as a target information extension value
pub fn encode_targets(names: &[&str]) -> der::Result<Vec<u8>> {
    let targets = names
        .iter()
        .map(|name| {
            let name = GeneralName::UniformResourceIdentifier(Ia5String::new(name)?);
            Any::new(target_name_tag(), name.to_der()?)
        })
        .collect::<der::Result<Vec<_>>>()?;
    vec![targets].to_der()
}

fn target_name_tag() -> Tag {
    Tag::ContextSpecific {
        constructed: true,
        number: TagNumber::N0,
    }
}

impl AttributeCertificate {
    /// The VOMS FQAN attribute, if present
    pub fn fqan_attribute(&self) -> Option<&Attribute> {
        self.acinfo
            .attributes
            .iter()
            .find(|attribute| attribute.oid == oid::VOMS_FQANS)
    }

    /// The bytes covered by the signature
    pub fn signed_bytes(&self) -> der::Result<Vec<u8>> {
        self.acinfo.to_der()
    }
}
