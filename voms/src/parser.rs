// Copyright (c) 2023 The MobileCoin Foundation

//! Extraction of VOMS attribute certificates from proxy certificate chains

use crate::ac::{
    decode_targets, AcCerts, AttributeCertificate, IetfAttrSyntax, IetfAttrValue, TagList,
    AC_VERSION_2,
};
use crate::attribute::{VomsAttribute, VomsGenericAttribute};
use crate::validation::{ValidationErrorCode, ValidationErrorMessage};
use crate::{oid, Error, Result};
use const_oid::db::rfc5280::ID_CE_AUTHORITY_KEY_IDENTIFIER;
use const_oid::db::rfc5912::{ID_CE_NO_REV_AVAIL, ID_CE_TARGET_INFORMATION};
use der::{Any, Decode};
use std::sync::Arc;
use tracing::debug;
use x509_cert::ext::pkix::name::GeneralName;
use x509_cert::name::Name;
use x509_cert::Certificate;

/// Extensions an AC may mark critical
const KNOWN_AC_EXTENSIONS: [const_oid::ObjectIdentifier; 5] = [
    oid::VOMS_AC_CERTS,
    oid::VOMS_GENERIC_ATTRIBUTES,
    ID_CE_TARGET_INFORMATION,
    ID_CE_NO_REV_AVAIL,
    ID_CE_AUTHORITY_KEY_IDENTIFIER,
];

/// The parse outcome of one attribute certificate, in extension order
pub type ParsedAc = core::result::Result<VomsAttribute, ValidationErrorMessage>;

/// Parses the VOMS attribute certificates embedded in a certificate chain.
///
/// Parsing performs no validation.
#[derive(Debug, Default, Clone, Copy)]
pub struct VomsAcParser;

impl VomsAcParser {
    /// Create a parser, the same as [`VomsAcParser::default`]
    pub fn new() -> Self {
        Self
    }

    /// The attributes of every well formed AC in `chain`.
    ///
    /// Malformed ACs are skipped. A chain without a VOMS extension gives an
    /// empty list, a VOMS extension which can not be decoded at all gives
    /// [`Error::InvalidAc`].
    pub fn parse(&self, chain: &[Certificate]) -> Result<Vec<VomsAttribute>> {
        Ok(self
            .parse_with_diagnostics(chain)?
            .into_iter()
            .filter_map(|parsed| match parsed {
                Ok(attributes) => Some(attributes),
                Err(message) => {
                    debug!(%message, "Skipping malformed VOMS attribute certificate");
                    None
                }
            })
            .collect())
    }

    /// Like [`VomsAcParser::parse`] but keeps a diagnostic for every
    /// malformed AC.
    pub fn parse_with_diagnostics(&self, chain: &[Certificate]) -> Result<Vec<ParsedAc>> {
        let Some(extension) = voms_extension(chain) else {
            return Ok(Vec::new());
        };
        let encoded = Vec::<Any>::from_der(extension).map_err(Error::InvalidAc)?;
        Ok(encoded.iter().map(parse_ac).collect())
    }
}

/// The value of the VOMS extension closest to the leaf
fn voms_extension(chain: &[Certificate]) -> Option<&[u8]> {
    chain.iter().find_map(|certificate| {
        certificate
            .tbs_certificate
            .extensions
            .iter()
            .flatten()
            .find(|extension| extension.extn_id == oid::VOMS_EXTENSION)
            .map(|extension| extension.extn_value.as_bytes())
    })
}

fn parse_ac(encoded: &Any) -> ParsedAc {
    let invalid = |reason: String| {
        ValidationErrorMessage::new(ValidationErrorCode::InvalidAcCert, [reason])
    };
    let ac = encoded
        .decode_as::<AttributeCertificate>()
        .map_err(|error| invalid(format!("malformed encoding, {error}")))?;
    attributes_from_ac(ac).map_err(|reason| invalid(reason.to_string()))
}

fn attributes_from_ac(
    ac: AttributeCertificate,
) -> core::result::Result<VomsAttribute, &'static str> {
    let info = &ac.acinfo;
    if info.version != AC_VERSION_2 {
        return Err("unsupported version");
    }

    let base_certificate_id = info
        .holder
        .base_certificate_id
        .as_ref()
        .ok_or("missing holder baseCertificateID")?;
    let holder = directory_name(&base_certificate_id.issuer).ok_or("missing holder issuer name")?;
    let holder_subject = info
        .holder
        .entity_name
        .as_deref()
        .and_then(directory_name)
        .cloned();
    let issuer = directory_name(info.issuer.names()).ok_or("missing issuer name")?;

    let fqan_attribute = ac.fqan_attribute().ok_or("missing FQAN attribute")?;
    let fqans_syntax = fqan_attribute
        .values
        .iter()
        .next()
        .ok_or("empty FQAN attribute")?
        .decode_as::<IetfAttrSyntax>()
        .map_err(|_| "malformed FQAN attribute")?;
    let authority = fqans_syntax
        .policy_authority
        .as_deref()
        .and_then(|names| {
            names.iter().find_map(|name| match name {
                GeneralName::UniformResourceIdentifier(uri) => Some(uri.to_string()),
                _ => None,
            })
        })
        .ok_or("missing FQAN policy authority")?;
    let (vo, host, port) =
        parse_policy_authority(&authority).ok_or("malformed FQAN policy authority")?;

    let fqans = fqans_syntax
        .values
        .iter()
        .filter_map(|value| match value {
            IetfAttrValue::Octets(octets) => Some(utf8(octets.as_bytes(), "FQAN is not UTF-8")),
            IetfAttrValue::String(string) => Some(Ok(string.clone())),
            IetfAttrValue::Oid(_) => None,
        })
        .map(|fqan| fqan.map(|fqan| normalize_fqan(&fqan)))
        .collect::<core::result::Result<Vec<_>, _>>()?;
    if fqans.is_empty() {
        return Err("no FQANs");
    }

    let mut aa_certificates = Vec::new();
    let mut generic_attributes = Vec::new();
    let mut targets = Vec::new();
    for extension in info.extensions.iter().flatten() {
        let value = extension.extn_value.as_bytes();
        match extension.extn_id {
            oid::VOMS_AC_CERTS => {
                aa_certificates = AcCerts::from_der(value)
                    .map_err(|_| "malformed AC certificates extension")?
                    .certificates;
            }
            oid::VOMS_GENERIC_ATTRIBUTES => {
                generic_attributes = Vec::<TagList>::from_der(value)
                    .map_err(|_| "malformed generic attributes extension")?
                    .iter()
                    .flat_map(|list| &list.tags)
                    .map(|tag| -> core::result::Result<_, &'static str> {
                        let not_utf8 = "generic attribute is not UTF-8";
                        Ok(VomsGenericAttribute::new(
                            utf8(tag.name.as_bytes(), not_utf8)?,
                            utf8(tag.value.as_bytes(), not_utf8)?,
                            utf8(tag.qualifier.as_bytes(), not_utf8)?,
                        ))
                    })
                    .collect::<core::result::Result<_, _>>()?;
            }
            ID_CE_TARGET_INFORMATION => {
                targets = decode_targets(value).map_err(|_| "malformed target information")?;
            }
            id if extension.critical && !KNOWN_AC_EXTENSIONS.contains(&id) => {
                return Err("unsupported critical extension");
            }
            _ => {}
        }
    }

    let signature = ac
        .signature_value
        .as_bytes()
        .ok_or("signature is not octet aligned")?
        .to_vec();

    Ok(VomsAttribute {
        vo,
        host,
        port,
        holder: holder.clone(),
        holder_serial: base_certificate_id.serial.clone(),
        holder_subject,
        issuer: issuer.clone(),
        not_before: info.attr_cert_validity_period.not_before_time.to_date_time(),
        not_after: info.attr_cert_validity_period.not_after_time.to_date_time(),
        fqans,
        generic_attributes,
        targets,
        signature,
        aa_certificates,
        attribute_certificate: Arc::new(ac.clone()),
    })
}

fn utf8(bytes: &[u8], error: &'static str) -> core::result::Result<String, &'static str> {
    String::from_utf8(bytes.to_vec()).map_err(|_| error)
}

fn directory_name(names: &[GeneralName]) -> Option<&Name> {
    names.iter().find_map(|name| match name {
        GeneralName::DirectoryName(name) => Some(name),
        _ => None,
    })
}

/// Split a `vo://host:port` policy authority
fn parse_policy_authority(authority: &str) -> Option<(String, String, u16)> {
    let (vo, address) = authority.split_once("://")?;
    let (host, port) = address.rsplit_once(':')?;
    if vo.is_empty() || host.is_empty() {
        return None;
    }
    Some((vo.to_string(), host.to_string(), port.parse().ok()?))
}

/// Drop the `Role=NULL` and `Capability` components VOMS servers append
pub(crate) fn normalize_fqan(fqan: &str) -> String {
    let mut normalized = fqan;
    if let Some(index) = normalized.find("/Capability=") {
        normalized = &normalized[..index];
    }
    normalized
        .strip_suffix("/Role=NULL")
        .unwrap_or(normalized)
        .to_string()
}
