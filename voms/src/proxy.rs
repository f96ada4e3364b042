// Copyright (c) 2023 The MobileCoin Foundation

//! Generation of proxy certificates, optionally carrying VOMS attribute
//! certificates

use crate::ac::AttributeCertificate;
use crate::credential::Credential;
use crate::x509::{
    sha256_with_rsa, sign_sha256_with_rsa, DraftProxyCertInfo, ProxyCertInfo, ProxyPolicy,
    ProxyType, LEGACY_LIMITED_PROXY_CN, LEGACY_PROXY_CN,
};
use crate::{oid, Error, Result};
use const_oid::db::rfc4519::CN;
use const_oid::db::rfc5280::ID_CE_KEY_USAGE;
use core::fmt::Display;
use core::time::Duration;
use der::asn1::{BitString, GeneralizedTime, OctetString, SetOfVec, UtcTime};
use der::pem::LineEnding;
use der::{Any, Decode, Encode, EncodePem, Tag};
use rand::Rng;
use rsa::pkcs1::EncodeRsaPrivateKey;
use rsa::pkcs8::EncodePublicKey;
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::fmt::{Debug, Formatter};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::debug;
use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::ext::Extension;
use x509_cert::name::{Name, RelativeDistinguishedName};
use x509_cert::serial_number::SerialNumber;
use x509_cert::spki::SubjectPublicKeyInfoOwned;
use x509_cert::time::{Time, Validity};
use x509_cert::{Certificate, TbsCertificate, Version};

/// Smallest accepted proxy key size
pub const MIN_KEY_BITS: usize = 512;
/// Size of the proxy key unless set otherwise
pub const DEFAULT_KEY_BITS: usize = 1024;
/// Validity of a proxy unless set otherwise
pub const DEFAULT_LIFETIME: Duration = Duration::from_secs(12 * 60 * 60);
/// How far the proxy validity starts in the past, to absorb clock skew
const NOT_BEFORE_BACKDATE: Duration = Duration::from_secs(5 * 60);

/// Rights the proxy inherits from its issuer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DelegationMode {
    /// The proxy has all the rights of its issuer
    #[default]
    Full,
    /// The proxy may not be used to submit jobs
    Limited,
}

/// Builds a proxy certificate signed by a [`Credential`]
#[derive(Debug, Clone)]
pub struct ProxyBuilder {
    lifetime: Duration,
    proxy_type: ProxyType,
    delegation: DelegationMode,
    key_bits: usize,
    path_len_constraint: Option<u32>,
    attribute_certificates: Vec<AttributeCertificate>,
}

impl Default for ProxyBuilder {
    fn default() -> Self {
        Self {
            lifetime: DEFAULT_LIFETIME,
            proxy_type: ProxyType::Rfc3820,
            delegation: DelegationMode::Full,
            key_bits: DEFAULT_KEY_BITS,
            path_len_constraint: None,
            attribute_certificates: Vec::new(),
        }
    }
}

impl ProxyBuilder {
    /// A builder for a full RFC3820 proxy valid for [`DEFAULT_LIFETIME`]
    pub fn new() -> Self {
        Self::default()
    }

    /// The validity of the proxy, capped at the expiry of the issuer
    pub fn lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// The proxy dialect to issue
    pub fn proxy_type(mut self, proxy_type: ProxyType) -> Self {
        self.proxy_type = proxy_type;
        self
    }

    /// The rights the proxy inherits
    pub fn delegation(mut self, delegation: DelegationMode) -> Self {
        self.delegation = delegation;
        self
    }

    /// Size of the generated RSA key, at least [`MIN_KEY_BITS`]
    pub fn key_bits(mut self, key_bits: usize) -> Self {
        self.key_bits = key_bits;
        self
    }

    /// Maximum number of proxies which may be issued below this one.
    ///
    /// Legacy proxies can not express a constraint and ignore it.
    pub fn path_len_constraint(mut self, path_len_constraint: Option<u32>) -> Self {
        self.path_len_constraint = path_len_constraint;
        self
    }

    /// Embed an attribute certificate in the VOMS extension
    pub fn attribute_certificate(mut self, ac: AttributeCertificate) -> Self {
        self.attribute_certificates.push(ac);
        self
    }

    /// Embed several attribute certificates in the VOMS extension
    pub fn attribute_certificates(
        mut self,
        acs: impl IntoIterator<Item = AttributeCertificate>,
    ) -> Self {
        self.attribute_certificates.extend(acs);
        self
    }

    /// Generate a fresh key pair and a proxy certificate for it, signed by
    /// `credential`.
    ///
    /// Failures after the arguments are checked are reported as
    /// [`Error::ProxyGeneration`].
    pub fn build(&self, credential: &Credential) -> Result<ProxyCertificate> {
        if self.key_bits < MIN_KEY_BITS {
            return Err(Error::InvalidKeySize(self.key_bits));
        }
        if self.lifetime.is_zero() {
            return Err(Error::ProxyGeneration(
                "the lifetime must be greater than zero".to_string(),
            ));
        }

        let mut rng = rand::thread_rng();
        let private_key = RsaPrivateKey::new(&mut rng, self.key_bits).map_err(generation)?;
        let public_key = RsaPublicKey::from(&private_key)
            .to_public_key_der()
            .map_err(generation)?;
        let subject_public_key_info =
            SubjectPublicKeyInfoOwned::from_der(public_key.as_bytes()).map_err(generation)?;

        let serial: u32 = rng.gen_range(1..=u32::MAX);
        let issuer = credential.certificate();
        let subject = self
            .subject(&issuer.tbs_certificate.subject, serial)
            .map_err(generation)?;

        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(generation)?;
        let not_after = (now + self.lifetime)
            .min(issuer.tbs_certificate.validity.not_after.to_unix_duration());
        let validity = Validity {
            not_before: x509_time(now.saturating_sub(NOT_BEFORE_BACKDATE)).map_err(generation)?,
            not_after: x509_time(not_after).map_err(generation)?,
        };

        let tbs_certificate = TbsCertificate {
            version: Version::V3,
            serial_number: SerialNumber::new(&serial.to_be_bytes()).map_err(generation)?,
            signature: sha256_with_rsa(),
            issuer: issuer.tbs_certificate.subject.clone(),
            validity,
            subject,
            subject_public_key_info,
            issuer_unique_id: None,
            subject_unique_id: None,
            extensions: Some(self.extensions().map_err(generation)?),
        };
        let message = tbs_certificate.to_der().map_err(generation)?;
        let signature =
            sign_sha256_with_rsa(credential.private_key(), &message).map_err(generation)?;
        let certificate = Certificate {
            tbs_certificate,
            signature_algorithm: sha256_with_rsa(),
            signature,
        };

        debug!(
            proxy_type = %self.proxy_type,
            delegation = ?self.delegation,
            acs = self.attribute_certificates.len(),
            "Generated proxy certificate"
        );

        let mut certificate_chain = Vec::with_capacity(credential.certificate_chain().len() + 1);
        certificate_chain.push(certificate);
        certificate_chain.extend_from_slice(credential.certificate_chain());
        Ok(ProxyCertificate {
            private_key,
            certificate_chain,
        })
    }

    /// The issuer subject with one more common name
    fn subject(&self, issuer: &Name, serial: u32) -> der::Result<Name> {
        let common_name = match (self.proxy_type, self.delegation) {
            (ProxyType::Legacy, DelegationMode::Full) => LEGACY_PROXY_CN.to_string(),
            (ProxyType::Legacy, DelegationMode::Limited) => LEGACY_LIMITED_PROXY_CN.to_string(),
            _ => serial.to_string(),
        };
        let attribute = AttributeTypeAndValue {
            oid: CN,
            value: Any::new(Tag::Utf8String, common_name.as_bytes())?,
        };
        let mut rdns = issuer.0.clone();
        rdns.push(RelativeDistinguishedName::from(SetOfVec::try_from(
            vec![attribute],
        )?));
        Ok(Name::from(rdns))
    }

    fn extensions(&self) -> der::Result<Vec<Extension>> {
        // digitalSignature and keyEncipherment
        let key_usage = BitString::new(5, vec![0xA0])?;
        let mut extensions = vec![Extension {
            extn_id: ID_CE_KEY_USAGE,
            critical: true,
            extn_value: OctetString::new(key_usage.to_der()?)?,
        }];

        let proxy_policy = ProxyPolicy {
            policy_language: match self.delegation {
                DelegationMode::Full => oid::INHERIT_ALL_POLICY,
                DelegationMode::Limited => oid::LIMITED_PROXY_POLICY,
            },
            policy: None,
        };
        let proxy_cert_info = match self.proxy_type {
            ProxyType::Legacy => None,
            ProxyType::Draft => Some((
                oid::DRAFT_PROXY_CERT_INFO,
                DraftProxyCertInfo {
                    proxy_policy,
                    path_len_constraint: self.path_len_constraint,
                }
                .to_der()?,
            )),
            ProxyType::Rfc3820 => Some((
                oid::PROXY_CERT_INFO,
                ProxyCertInfo {
                    path_len_constraint: self.path_len_constraint,
                    proxy_policy,
                }
                .to_der()?,
            )),
        };
        if let Some((extn_id, value)) = proxy_cert_info {
            extensions.push(Extension {
                extn_id,
                critical: true,
                extn_value: OctetString::new(value)?,
            });
        }

        if !self.attribute_certificates.is_empty() {
            extensions.push(Extension {
                extn_id: oid::VOMS_EXTENSION,
                critical: false,
                extn_value: OctetString::new(self.attribute_certificates.to_der()?)?,
            });
        }
        Ok(extensions)
    }
}

fn generation(error: impl Display) -> Error {
    Error::ProxyGeneration(error.to_string())
}

/// UTCTime through 2049, GeneralizedTime afterwards, as RFC5280 requires
fn x509_time(unix_time: Duration) -> der::Result<Time> {
    UtcTime::from_unix_duration(unix_time)
        .map(Time::UtcTime)
        .or_else(|_| GeneralizedTime::from_unix_duration(unix_time).map(Time::GeneralTime))
}

/// A generated proxy: the new private key and the chain starting with the
/// proxy certificate
#[derive(Clone)]
pub struct ProxyCertificate {
    private_key: RsaPrivateKey,
    certificate_chain: Vec<Certificate>,
}

impl Debug for ProxyCertificate {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyCertificate")
            .field("certificate_chain", &self.certificate_chain)
            .finish_non_exhaustive()
    }
}

impl ProxyCertificate {
    /// The proxy certificate
    pub fn certificate(&self) -> &Certificate {
        &self.certificate_chain[0]
    }

    /// The key of the proxy certificate
    pub fn private_key(&self) -> &RsaPrivateKey {
        &self.private_key
    }

    /// The proxy followed by the chain of its issuer
    pub fn certificate_chain(&self) -> &[Certificate] {
        &self.certificate_chain
    }

    /// The proxy file layout used by grid tools: the proxy certificate, its
    /// unencrypted PKCS#1 private key, then the rest of the chain.
    pub fn to_pem(&self) -> Result<String> {
        let mut pem = self.certificate().to_pem(LineEnding::LF)?;
        pem.push_str(&self.private_key.to_pkcs1_pem(LineEnding::LF)?);
        for certificate in &self.certificate_chain[1..] {
            pem.push_str(&certificate.to_pem(LineEnding::LF)?);
        }
        Ok(pem)
    }
}

impl From<ProxyCertificate> for Credential {
    fn from(proxy: ProxyCertificate) -> Self {
        Credential::from_parts(proxy.private_key, proxy.certificate_chain)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::fixtures::{self, AcFixture};
    use crate::x509::{proxy_info, DistinguishedName, ProxyInfo};
    use assert_matches::assert_matches;

    fn builder() -> ProxyBuilder {
        ProxyBuilder::new().key_bits(fixtures::PROXY_KEY_BITS)
    }

    #[test]
    fn small_keys_are_rejected() {
        assert_matches!(
            ProxyBuilder::new()
                .key_bits(256)
                .build(&fixtures::user_credential()),
            Err(Error::InvalidKeySize(256))
        );
    }

    #[test]
    fn zero_lifetime_is_rejected() {
        assert_matches!(
            builder()
                .lifetime(Duration::ZERO)
                .build(&fixtures::user_credential()),
            Err(Error::ProxyGeneration(_))
        );
    }

    #[test]
    fn legacy_proxy_names() {
        let user = fixtures::user();
        for (delegation, common_name) in [
            (DelegationMode::Full, "proxy"),
            (DelegationMode::Limited, "limited proxy"),
        ] {
            let proxy = builder()
                .proxy_type(ProxyType::Legacy)
                .delegation(delegation)
                .build(&fixtures::user_credential())
                .expect("Failed to build proxy");
            let subject = DistinguishedName::from(&proxy.certificate().tbs_certificate.subject);
            assert_eq!(
                subject.to_string(),
                format!("/C=IT/O=IGI/CN=Test User 0/CN={common_name}")
            );
            assert_eq!(
                proxy_info(proxy.certificate(), Some(&user)),
                Ok(Some(ProxyInfo {
                    proxy_type: ProxyType::Legacy,
                    limited: delegation == DelegationMode::Limited,
                    path_len_constraint: None,
                }))
            );
        }
    }

    #[test]
    fn rfc_proxy_name_uses_serial() {
        let proxy = builder()
            .build(&fixtures::user_credential())
            .expect("Failed to build proxy");
        let tbs = &proxy.certificate().tbs_certificate;
        let serial = tbs
            .serial_number
            .as_bytes()
            .iter()
            .fold(0u64, |serial, byte| serial << 8 | u64::from(*byte));
        assert_eq!(
            DistinguishedName::from(&tbs.subject).to_string(),
            format!("/C=IT/O=IGI/CN=Test User 0/CN={serial}")
        );
    }

    #[test]
    fn lifetime_and_backdating() {
        let before = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("Clock before Unix epoch");
        let proxy = builder()
            .lifetime(Duration::from_secs(3600))
            .build(&fixtures::user_credential())
            .expect("Failed to build proxy");
        let validity = &proxy.certificate().tbs_certificate.validity;

        let not_before = validity.not_before.to_unix_duration();
        let not_after = validity.not_after.to_unix_duration();
        // Times are truncated to seconds and key generation takes a while
        let slack = Duration::from_secs(60);
        assert!(not_before + NOT_BEFORE_BACKDATE + Duration::from_secs(1) >= before);
        assert!(not_before + NOT_BEFORE_BACKDATE <= before + slack);
        assert!(not_after + Duration::from_secs(1) >= before + Duration::from_secs(3600));
        assert!(not_after <= before + Duration::from_secs(3600) + slack);
    }

    #[test]
    fn lifetime_capped_at_issuer_expiry() {
        let proxy = builder()
            .lifetime(Duration::from_secs(100 * 365 * 24 * 60 * 60))
            .build(&fixtures::user_credential())
            .expect("Failed to build proxy");
        assert_eq!(
            proxy.certificate().tbs_certificate.validity.not_after,
            fixtures::user().tbs_certificate.validity.not_after
        );
    }

    #[test]
    fn attribute_certificates_are_embedded() {
        let ac = AcFixture::test_vo().sign();
        let proxy = builder()
            .attribute_certificate(ac.clone())
            .build(&fixtures::user_credential())
            .expect("Failed to build proxy");
        let extension = proxy
            .certificate()
            .tbs_certificate
            .extensions
            .iter()
            .flatten()
            .find(|extension| extension.extn_id == oid::VOMS_EXTENSION)
            .expect("Missing VOMS extension");
        let embedded = Vec::<AttributeCertificate>::from_der(extension.extn_value.as_bytes())
            .expect("Failed to decode ACs");
        assert_eq!(embedded, vec![ac]);
    }

    #[test]
    fn pem_layout() {
        let proxy = builder()
            .build(&fixtures::user_credential())
            .expect("Failed to build proxy");
        let pem = proxy.to_pem().expect("Failed to encode PEM");
        let labels = pem
            .lines()
            .filter_map(|line| line.strip_prefix("-----BEGIN "))
            .collect::<Vec<_>>();
        assert_eq!(
            labels,
            ["CERTIFICATE-----", "RSA PRIVATE KEY-----", "CERTIFICATE-----"]
        );

        let reloaded = Credential::from_pem(&pem, &pem, None).expect("Failed to reload proxy");
        assert_eq!(reloaded.certificate_chain(), proxy.certificate_chain());
    }
}
