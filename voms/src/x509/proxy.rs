// Copyright (c) 2023 The MobileCoin Foundation

//! Recognition of proxy certificates
//!
//! Three proxy dialects are in use on the grid:
//!
//! - Legacy (Globus Toolkit 2) proxies, recognised by their name alone: the
//!   subject is the issuer's subject with one more `CN=proxy` or
//!   `CN=limited proxy` RDN.
//! - Draft (Globus Toolkit 3) proxies carrying the pre RFC `ProxyCertInfo`
//!   extension.
//! - [RFC3820](https://www.rfc-editor.org/rfc/rfc3820) proxies.
//!
//! ```text
//! ProxyCertInfo ::= SEQUENCE {             -- RFC3820
//!     pCPathLenConstraint  INTEGER (0..MAX) OPTIONAL,
//!     proxyPolicy          ProxyPolicy }
//!
//! ProxyCertInfo ::= SEQUENCE {             -- draft
//!     proxyPolicy          ProxyPolicy,
//!     pCPathLenConstraint  [1] EXPLICIT INTEGER (0..MAX) OPTIONAL }
//!
//! ProxyPolicy ::= SEQUENCE {
//!     policyLanguage       OBJECT IDENTIFIER,
//!     policy               OCTET STRING OPTIONAL }
//! ```

use crate::oid;
use const_oid::db::rfc4519::CN;
use const_oid::ObjectIdentifier;
use core::fmt::{Display, Formatter};
use core::str::FromStr;
use der::asn1::OctetString;
use der::{Decode, Sequence, Tag, Tagged};
use x509_cert::name::Name;
use x509_cert::Certificate;

use super::name::DistinguishedName;

/// Common name of a legacy proxy with full delegation
pub(crate) const LEGACY_PROXY_CN: &str = "proxy";
/// Common name of a legacy proxy with limited delegation
pub(crate) const LEGACY_LIMITED_PROXY_CN: &str = "limited proxy";

/// The proxy certificate dialect
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProxyType {
    /// Globus Toolkit 2 proxies, identified by name
    Legacy,
    /// Globus Toolkit 3 proxies, using the pre RFC ProxyCertInfo
    Draft,
    /// RFC3820 proxies
    Rfc3820,
}

impl FromStr for ProxyType {
    type Err = crate::Error;

    /// Parses the names used by grid tooling, ignoring case
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "legacy" | "gt2" => Ok(ProxyType::Legacy),
            "draft" | "gt3" | "pre_rfc" | "pre-rfc" => Ok(ProxyType::Draft),
            "rfc3820" | "rfc" => Ok(ProxyType::Rfc3820),
            _ => Err(crate::Error::UnsupportedProxyType(s.to_string())),
        }
    }
}

impl Display for ProxyType {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        let name = match self {
            ProxyType::Legacy => "legacy",
            ProxyType::Draft => "draft",
            ProxyType::Rfc3820 => "rfc3820",
        };
        f.write_str(name)
    }
}

/// The rights delegated to a proxy
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct ProxyPolicy {
    /// How `policy` is to be interpreted
    pub policy_language: ObjectIdentifier,
    /// Policy in the policy language, absent for the standard languages
    #[asn1(optional = "true")]
    pub policy: Option<OctetString>,
}

/// RFC3820 `ProxyCertInfo`
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct ProxyCertInfo {
    /// Maximum number of proxies below this one
    #[asn1(optional = "true")]
    pub path_len_constraint: Option<u32>,
    /// The delegated rights
    pub proxy_policy: ProxyPolicy,
}

/// Pre RFC `ProxyCertInfo`
#[derive(Clone, Debug, Eq, PartialEq, Sequence)]
pub struct DraftProxyCertInfo {
    /// The delegated rights
    pub proxy_policy: ProxyPolicy,
    /// Maximum number of proxies below this one
    #[asn1(context_specific = "1", tag_mode = "EXPLICIT", optional = "true")]
    pub path_len_constraint: Option<u32>,
}

/// What a certificate declares about itself as a proxy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyInfo {
    /// The proxy dialect
    pub proxy_type: ProxyType,
    /// Whether the proxy is limited
    pub limited: bool,
    /// Maximum number of proxies below this one
    pub path_len_constraint: Option<u32>,
}

/// Why a certificate claiming to be a proxy is unacceptable
#[derive(Debug, displaydoc::Display, Clone, PartialEq, Eq)]
pub enum ProxyError {
    /// the ProxyCertInfo extension is malformed
    MalformedProxyCertInfo,
    /// the subject is not the issuer subject extended with one CN
    InvalidName,
    /// the policy language {0} is not supported
    UnsupportedPolicyLanguage(ObjectIdentifier),
}

/// Examine `certificate`, issued by `issuer` when known, as a proxy.
///
/// Returns `Ok(None)` for certificates which are not proxies.
pub fn proxy_info(
    certificate: &Certificate,
    issuer: Option<&Certificate>,
) -> Result<Option<ProxyInfo>, ProxyError> {
    let tbs = &certificate.tbs_certificate;
    let extension = tbs.extensions.iter().flatten().find(|extension| {
        extension.extn_id == oid::PROXY_CERT_INFO || extension.extn_id == oid::DRAFT_PROXY_CERT_INFO
    });

    let Some(extension) = extension else {
        return Ok(issuer.and_then(|issuer| legacy_proxy_info(certificate, issuer)));
    };

    let bytes = extension.extn_value.as_bytes();
    let (proxy_type, policy, path_len_constraint) = if extension.extn_id == oid::PROXY_CERT_INFO
    {
        let info =
            ProxyCertInfo::from_der(bytes).map_err(|_| ProxyError::MalformedProxyCertInfo)?;
        (ProxyType::Rfc3820, info.proxy_policy, info.path_len_constraint)
    } else {
        let info =
            DraftProxyCertInfo::from_der(bytes).map_err(|_| ProxyError::MalformedProxyCertInfo)?;
        (ProxyType::Draft, info.proxy_policy, info.path_len_constraint)
    };

    let limited = match policy.policy_language {
        oid::LIMITED_PROXY_POLICY => true,
        oid::INHERIT_ALL_POLICY | oid::INDEPENDENT_POLICY => false,
        language => return Err(ProxyError::UnsupportedPolicyLanguage(language)),
    };

    if let Some(issuer) = issuer {
        if !is_proxy_name(&tbs.subject, &issuer.tbs_certificate.subject) {
            return Err(ProxyError::InvalidName);
        }
    }

    Ok(Some(ProxyInfo {
        proxy_type,
        limited,
        path_len_constraint,
    }))
}

fn legacy_proxy_info(certificate: &Certificate, issuer: &Certificate) -> Option<ProxyInfo> {
    let subject = &certificate.tbs_certificate.subject;
    if !is_proxy_name(subject, &issuer.tbs_certificate.subject) {
        return None;
    }
    let limited = match last_common_name(subject)? {
        LEGACY_PROXY_CN => false,
        LEGACY_LIMITED_PROXY_CN => true,
        _ => return None,
    };
    Some(ProxyInfo {
        proxy_type: ProxyType::Legacy,
        limited,
        path_len_constraint: None,
    })
}

/// A proxy subject is its issuer's subject followed by one single valued
/// `CN` RDN.
fn is_proxy_name(subject: &Name, issuer: &Name) -> bool {
    let Some((last, prefix)) = subject.0.split_last() else {
        return false;
    };
    if prefix.len() != issuer.0.len() || last.0.len() != 1 {
        return false;
    }
    let prefix = Name::from(prefix.to_vec());
    last_common_name(subject).is_some()
        && DistinguishedName::from(&prefix) == DistinguishedName::from(issuer)
}

fn last_common_name(name: &Name) -> Option<&str> {
    let rdn = name.0.last()?;
    let attribute = rdn.0.iter().next()?;
    if attribute.oid != CN {
        return None;
    }
    match attribute.value.tag() {
        Tag::Utf8String | Tag::PrintableString | Tag::Ia5String => {
            core::str::from_utf8(attribute.value.value()).ok()
        }
        _ => None,
    }
}

/// Index of the end-entity certificate in a leaf first `chain`, the first
/// certificate which is not a proxy of its successor.
///
/// Returns `None` when every certificate looks like a proxy.
pub fn end_entity_index(chain: &[Certificate]) -> Option<usize> {
    chain.iter().enumerate().position(|(index, certificate)| {
        !matches!(proxy_info(certificate, chain.get(index + 1)), Ok(Some(_)))
    })
}
