// Copyright (c) 2023 The MobileCoin Foundation

//! Certificates, keys and attribute certificates shared by the unit tests

use crate::ac::{
    encode_targets, AcCerts, AttCertIssuer, AttCertValidityPeriod, AttributeCertificate,
    AttributeCertificateInfo, GenericTag, Holder, IetfAttrSyntax, IetfAttrValue, IssuerSerial,
    TagList, V2Form, AC_VERSION_2,
};
use crate::credential::Credential;
use crate::proxy::{ProxyBuilder, ProxyCertificate};
use crate::x509::{sha256_with_rsa, sign_sha256_with_rsa};
use crate::oid;
use const_oid::db::rfc5912::ID_CE_TARGET_INFORMATION;
use core::time::Duration;
use der::asn1::{GeneralizedTime, Ia5String, OctetString, SetOfVec};
use der::{Any, DecodePem, Encode};
use pkcs8::DecodePrivateKey;
use rsa::RsaPrivateKey;
use x509_cert::attr::Attribute;
use x509_cert::ext::pkix::name::GeneralName;
use x509_cert::ext::Extension;
use x509_cert::serial_number::SerialNumber;
use x509_cert::Certificate;

/// A time inside the validity of every fixture certificate
pub const REFERENCE_TIME: Duration = Duration::from_secs(1_900_000_000);

// Warning one should not copy this size for production code without
// understanding the security implications.
// This size is chosen to be small so that the tests run quickly.
pub const PROXY_KEY_BITS: usize = 512;

/// 2024-01-01T00:00:00Z
pub const FIXTURE_NOT_BEFORE: Duration = Duration::from_secs(1_704_067_200);
/// 2049-12-31T00:00:00Z
pub const FIXTURE_NOT_AFTER: Duration = Duration::from_secs(2_524_521_600);

pub const CA_CERT: &str = include_str!("../data/tests/ca.pem");
pub const USER_CERT: &str = include_str!("../data/tests/user.pem");
pub const USER_KEY: &str = include_str!("../data/tests/user.key");
pub const USER_OTHER_CERT: &str = include_str!("../data/tests/user_other.pem");
pub const AA_TEST_VO_CERT: &str = include_str!("../data/tests/aa_test_vo.pem");
pub const AA_TEST_VO_KEY: &str = include_str!("../data/tests/aa_test_vo.key");
pub const AA_OTHER_VO_CERT: &str = include_str!("../data/tests/aa_other_vo.pem");
pub const AA_OTHER_VO_KEY: &str = include_str!("../data/tests/aa_other_vo.key");
pub const ROGUE_CA_CERT: &str = include_str!("../data/tests/rogue_ca.pem");
pub const ROGUE_AA_CERT: &str = include_str!("../data/tests/rogue_aa.pem");
pub const ROGUE_AA_KEY: &str = include_str!("../data/tests/rogue_aa.key");

pub fn certificate(pem: &str) -> Certificate {
    Certificate::from_pem(pem).expect("Failed to decode certificate")
}

pub fn private_key(pem: &str) -> RsaPrivateKey {
    RsaPrivateKey::from_pkcs8_pem(pem).expect("Failed to decode private key")
}

pub fn ca() -> Certificate {
    certificate(CA_CERT)
}

pub fn user() -> Certificate {
    certificate(USER_CERT)
}

pub fn user_other() -> Certificate {
    certificate(USER_OTHER_CERT)
}

pub fn aa_test_vo() -> Certificate {
    certificate(AA_TEST_VO_CERT)
}

pub fn aa_other_vo() -> Certificate {
    certificate(AA_OTHER_VO_CERT)
}

pub fn rogue_ca() -> Certificate {
    certificate(ROGUE_CA_CERT)
}

pub fn rogue_aa() -> Certificate {
    certificate(ROGUE_AA_CERT)
}

pub fn user_credential() -> Credential {
    Credential::new(private_key(USER_KEY), vec![user()]).expect("Failed to build credential")
}

/// A proxy of `credential` carrying `acs`
pub fn proxy_with_acs(credential: &Credential, acs: &[AttributeCertificate]) -> ProxyCertificate {
    ProxyBuilder::new()
        .key_bits(PROXY_KEY_BITS)
        .attribute_certificates(acs.iter().cloned())
        .build(credential)
        .expect("Failed to build proxy")
}

/// The chain of a proxy of the test user carrying `acs`
pub fn proxy_chain(acs: &[AttributeCertificate]) -> Vec<Certificate> {
    proxy_with_acs(&user_credential(), acs)
        .certificate_chain()
        .to_vec()
}

/// The chain of a proxy of the test user whose VOMS extension holds
/// `extension_value`
pub fn proxy_chain_with_voms_extension(extension_value: &[u8]) -> Vec<Certificate> {
    let mut chain = proxy_chain(&[]);
    let proxy = &mut chain[0];
    proxy
        .tbs_certificate
        .extensions
        .get_or_insert_with(Vec::new)
        .push(Extension {
            extn_id: oid::VOMS_EXTENSION,
            critical: false,
            extn_value: OctetString::new(extension_value).expect("Failed to build octets"),
        });
    let message = proxy.tbs_certificate.to_der().expect("Failed to encode");
    proxy.signature =
        sign_sha256_with_rsa(&private_key(USER_KEY), &message).expect("Failed to sign");
    chain
}

/// Builds signed VOMS attribute certificates
#[derive(Clone)]
pub struct AcFixture {
    vo: String,
    host: String,
    port: u16,
    fqans: Vec<Vec<u8>>,
    holder: Certificate,
    holder_subject: Option<Certificate>,
    signer: Certificate,
    signer_key: RsaPrivateKey,
    embedded: Vec<Certificate>,
    not_before: Duration,
    not_after: Duration,
    generic_attributes: Vec<(Vec<u8>, Vec<u8>, Vec<u8>)>,
    targets: Vec<String>,
}

impl AcFixture {
    /// An AC for the test user from `voms.example.org`, the AA of `test.vo`
    pub fn test_vo() -> Self {
        Self {
            vo: "test.vo".to_string(),
            host: "voms.example.org".to_string(),
            port: 15000,
            fqans: vec![b"/test.vo/Role=NULL/Capability=NULL".to_vec()],
            holder: user(),
            holder_subject: None,
            signer: aa_test_vo(),
            signer_key: private_key(AA_TEST_VO_KEY),
            embedded: vec![aa_test_vo()],
            not_before: FIXTURE_NOT_BEFORE,
            not_after: FIXTURE_NOT_AFTER,
            generic_attributes: vec![],
            targets: vec![],
        }
    }

    /// An AC for the test user from `voms2.example.org`, the AA of
    /// `other.vo`
    pub fn other_vo() -> Self {
        Self {
            vo: "other.vo".to_string(),
            host: "voms2.example.org".to_string(),
            port: 15001,
            fqans: vec![b"/other.vo/Role=NULL/Capability=NULL".to_vec()],
            signer: aa_other_vo(),
            signer_key: private_key(AA_OTHER_VO_KEY),
            embedded: vec![aa_other_vo()],
            ..Self::test_vo()
        }
    }

    /// Signed by the rogue AA, which has the name of the `test.vo` AA
    pub fn rogue(self) -> Self {
        self.signer(rogue_aa(), private_key(ROGUE_AA_KEY))
    }

    pub fn fqans(mut self, fqans: &[&str]) -> Self {
        self.fqans = fqans.iter().map(|fqan| fqan.as_bytes().to_vec()).collect();
        self
    }

    /// Replace the FQANs with a single, possibly not UTF-8, octet string
    pub fn fqan_bytes(mut self, fqan: &[u8]) -> Self {
        self.fqans = vec![fqan.to_vec()];
        self
    }

    pub fn holder(mut self, holder: Certificate) -> Self {
        self.holder = holder;
        self
    }

    /// Also name the subject of `holder` in the AC holder
    pub fn holder_subject(mut self, holder: Certificate) -> Self {
        self.holder_subject = Some(holder);
        self
    }

    /// Sign with `signer` and embed it as the AA chain
    pub fn signer(mut self, signer: Certificate, key: RsaPrivateKey) -> Self {
        self.embedded = vec![signer.clone()];
        self.signer = signer;
        self.signer_key = key;
        self
    }

    pub fn embedded(mut self, embedded: Vec<Certificate>) -> Self {
        self.embedded = embedded;
        self
    }

    pub fn validity(mut self, not_before: Duration, not_after: Duration) -> Self {
        self.not_before = not_before;
        self.not_after = not_after;
        self
    }

    pub fn generic_attribute(mut self, name: &str, value: &str, context: &str) -> Self {
        self.generic_attribute_bytes(name, value.as_bytes(), context)
    }

    pub fn generic_attribute_bytes(mut self, name: &str, value: &[u8], context: &str) -> Self {
        self.generic_attributes.push((
            name.as_bytes().to_vec(),
            value.to_vec(),
            context.as_bytes().to_vec(),
        ));
        self
    }

    pub fn targets(mut self, targets: &[&str]) -> Self {
        self.targets = targets.iter().map(|target| target.to_string()).collect();
        self
    }

    pub fn sign(&self) -> AttributeCertificate {
        let acinfo = self.info().expect("Failed to build AC info");
        let message = acinfo.to_der().expect("Failed to encode AC info");
        let signature_value =
            sign_sha256_with_rsa(&self.signer_key, &message).expect("Failed to sign AC");
        AttributeCertificate {
            acinfo,
            signature_algorithm: sha256_with_rsa(),
            signature_value,
        }
    }

    fn info(&self) -> der::Result<AttributeCertificateInfo> {
        let authority = GeneralName::UniformResourceIdentifier(Ia5String::new(&format!(
            "{}://{}:{}",
            self.vo, self.host, self.port
        ))?);
        let fqans = IetfAttrSyntax {
            policy_authority: Some(vec![authority.clone()]),
            values: self
                .fqans
                .iter()
                .map(|fqan| OctetString::new(fqan.as_slice()).map(IetfAttrValue::Octets))
                .collect::<der::Result<_>>()?,
        };

        let mut extensions = vec![Extension {
            extn_id: oid::VOMS_AC_CERTS,
            critical: false,
            extn_value: OctetString::new(
                AcCerts {
                    certificates: self.embedded.clone(),
                }
                .to_der()?,
            )?,
        }];
        if !self.generic_attributes.is_empty() {
            let tags = self
                .generic_attributes
                .iter()
                .map(|(name, value, context)| {
                    Ok(GenericTag {
                        name: OctetString::new(name.as_slice())?,
                        value: OctetString::new(value.as_slice())?,
                        qualifier: OctetString::new(context.as_slice())?,
                    })
                })
                .collect::<der::Result<_>>()?;
            let lists = vec![TagList {
                policy_authority: vec![authority],
                tags,
            }];
            extensions.push(Extension {
                extn_id: oid::VOMS_GENERIC_ATTRIBUTES,
                critical: false,
                extn_value: OctetString::new(lists.to_der()?)?,
            });
        }
        if !self.targets.is_empty() {
            let targets = self.targets.iter().map(String::as_str).collect::<Vec<_>>();
            extensions.push(Extension {
                extn_id: ID_CE_TARGET_INFORMATION,
                critical: true,
                extn_value: OctetString::new(encode_targets(&targets)?)?,
            });
        }

        let holder_tbs = &self.holder.tbs_certificate;
        Ok(AttributeCertificateInfo {
            version: AC_VERSION_2,
            holder: Holder {
                base_certificate_id: Some(IssuerSerial {
                    issuer: vec![GeneralName::DirectoryName(holder_tbs.issuer.clone())],
                    serial: holder_tbs.serial_number.clone(),
                    issuer_uid: None,
                }),
                entity_name: self.holder_subject.as_ref().map(|holder| {
                    vec![GeneralName::DirectoryName(
                        holder.tbs_certificate.subject.clone(),
                    )]
                }),
            },
            issuer: AttCertIssuer::V2Form(V2Form {
                issuer_name: Some(vec![GeneralName::DirectoryName(
                    self.signer.tbs_certificate.subject.clone(),
                )]),
                base_certificate_id: None,
            }),
            signature: sha256_with_rsa(),
            serial_number: SerialNumber::new(&[0x2a])?,
            attr_cert_validity_period: AttCertValidityPeriod {
                not_before_time: GeneralizedTime::from_unix_duration(self.not_before)?,
                not_after_time: GeneralizedTime::from_unix_duration(self.not_after)?,
            },
            attributes: vec![Attribute {
                oid: oid::VOMS_FQANS,
                values: SetOfVec::try_from(vec![Any::encode_from(&fqans)?])?,
            }],
            issuer_unique_id: None,
            extensions: Some(extensions),
        })
    }
}
