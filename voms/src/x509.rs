// Copyright (c) 2023 The MobileCoin Foundation

//! X509 certificate support: names, signatures, proxies and chain validation

mod algorithm;
mod chain;
mod error;
mod name;
mod proxy;
mod rfc4518;

pub use algorithm::{PublicKey, RsaDigest, Signature};
pub(crate) use algorithm::{sha256_with_rsa, sign_sha256_with_rsa};
pub use chain::ProxyChainValidator;
pub use error::Error;
pub use name::{DistinguishedName, DnPattern};
pub use proxy::{
    end_entity_index, proxy_info, DraftProxyCertInfo, ProxyCertInfo, ProxyError, ProxyInfo,
    ProxyPolicy, ProxyType,
};
pub(crate) use proxy::{LEGACY_LIMITED_PROXY_CN, LEGACY_PROXY_CN};

/// Result for certificate operations
pub type Result<T> = core::result::Result<T, Error>;

use core::time::Duration;
use pem::Pem;
use x509_cert::der::Decode;
use x509_cert::Certificate;

const CERTIFICATE_TAG: &str = "CERTIFICATE";
const BEGIN_MARKER: &str = "-----BEGIN ";

/// Decode every PEM encoded certificate in `pem`, skipping other blocks
pub fn certificates_from_pem(pem: &str) -> Result<Vec<Certificate>> {
    pem_blocks(pem)?
        .iter()
        .filter(|block| block.tag() == CERTIFICATE_TAG)
        .map(|block| Ok(Certificate::from_der(block.contents())?))
        .collect()
}

/// The PEM blocks of `pem`, in order.
///
/// Text between blocks is ignored, a block which is not terminated is an
/// error.
pub(crate) fn pem_blocks(pem: &str) -> Result<Vec<Pem>> {
    let blocks = pem::parse_many(pem)?;
    if pem.matches(BEGIN_MARKER).count() != blocks.len() {
        return Err(Error::PemDecoding(pem::PemError::MissingEndTag));
    }
    Ok(blocks)
}

/// Whether `unix_time` is inside the validity period of `certificate`
pub fn check_validity(certificate: &Certificate, unix_time: Duration) -> Result<()> {
    let validity = &certificate.tbs_certificate.validity;
    if unix_time < validity.not_before.to_unix_duration() {
        Err(Error::CertificateNotYetValid)
    } else if unix_time > validity.not_after.to_unix_duration() {
        Err(Error::CertificateExpired)
    } else {
        Ok(())
    }
}
