// Copyright (c) 2023 The MobileCoin Foundation

//! Credentials used to sign proxy certificates

use crate::x509::{certificates_from_pem, pem_blocks, PublicKey};
use crate::{Error, Result};
use pkcs8::DecodePrivateKey;
use rsa::pkcs1::DecodeRsaPrivateKey;
use rsa::{RsaPrivateKey, RsaPublicKey};
use std::fmt::{Debug, Formatter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use x509_cert::Certificate;

const PKCS8_LABEL: &str = "PRIVATE KEY";
const ENCRYPTED_PKCS8_LABEL: &str = "ENCRYPTED PRIVATE KEY";
const PKCS1_LABEL: &str = "RSA PRIVATE KEY";

/// An RSA private key and the certificate chain it belongs to, leaf first
#[derive(Clone)]
pub struct Credential {
    private_key: RsaPrivateKey,
    certificate_chain: Vec<Certificate>,
}

impl Debug for Credential {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("certificate_chain", &self.certificate_chain)
            .finish_non_exhaustive()
    }
}

impl Credential {
    /// Errors when the chain is empty or the key does not belong to the
    /// leaf certificate.
    pub fn new(private_key: RsaPrivateKey, certificate_chain: Vec<Certificate>) -> Result<Self> {
        let leaf = certificate_chain.first().ok_or(Error::EmptyCredentialChain)?;
        let expected = PublicKey::Rsa(RsaPublicKey::from(&private_key));
        if PublicKey::try_from(leaf)? != expected {
            return Err(Error::CredentialKeyMismatch);
        }
        Ok(Self::from_parts(private_key, certificate_chain))
    }

    pub(crate) fn from_parts(
        private_key: RsaPrivateKey,
        certificate_chain: Vec<Certificate>,
    ) -> Self {
        Self {
            private_key,
            certificate_chain,
        }
    }

    /// Load a credential from PEM text.
    ///
    /// `key_pem` may be PKCS#8, encrypted PKCS#8 or PKCS#1. The `password`
    /// callback is only consulted for encrypted keys.
    pub fn from_pem(
        certificate_pem: &str,
        key_pem: &str,
        password: Option<&dyn PasswordCallback>,
    ) -> Result<Self> {
        let certificate_chain = certificates_from_pem(certificate_pem)?;
        let private_key = decode_private_key(key_pem, password)?;
        Self::new(private_key, certificate_chain)
    }

    /// The private key of the leaf certificate
    pub fn private_key(&self) -> &RsaPrivateKey {
        &self.private_key
    }

    /// The certificate the private key belongs to
    pub fn certificate(&self) -> &Certificate {
        // `new` rejects empty chains
        &self.certificate_chain[0]
    }

    /// The certificate chain, leaf first
    pub fn certificate_chain(&self) -> &[Certificate] {
        &self.certificate_chain
    }
}

fn decode_private_key(
    pem: &str,
    password: Option<&dyn PasswordCallback>,
) -> Result<RsaPrivateKey> {
    let blocks = pem_blocks(pem)?;
    let block = blocks
        .iter()
        .find(|block| block.tag().ends_with(PKCS8_LABEL))
        .ok_or(Error::MissingPrivateKey)?;
    match block.tag() {
        PKCS8_LABEL => Ok(RsaPrivateKey::from_pkcs8_der(block.contents())?),
        PKCS1_LABEL => Ok(RsaPrivateKey::from_pkcs1_der(block.contents())?),
        ENCRYPTED_PKCS8_LABEL => {
            let password = password
                .and_then(|callback| callback.password())
                .ok_or(Error::MissingPassword)?;
            Ok(RsaPrivateKey::from_pkcs8_encrypted_der(
                block.contents(),
                password,
            )?)
        }
        label => Err(Error::UnsupportedKeyFormat(label.to_string())),
    }
}

/// Supplies the password of an encrypted private key
pub trait PasswordCallback: Send + Sync {
    /// `None` when no password is available
    fn password(&self) -> Option<String>;
}

impl<F> PasswordCallback for F
where
    F: Fn() -> Option<String> + Send + Sync,
{
    fn password(&self) -> Option<String> {
        self()
    }
}

/// A source of credentials
pub trait CredentialProvider: Debug + Send + Sync {
    /// The credential, `Ok(None)` when the provider has nothing configured
    fn credential(&self) -> Result<Option<Credential>>;
}

/// Provides the credential stored in a PEM certificate file and a PEM key
/// file, the usual `usercert.pem` and `userkey.pem` pair.
#[derive(Clone, Default)]
pub struct PemCredentialProvider {
    certificate: Option<PathBuf>,
    private_key: Option<PathBuf>,
    password: Option<Arc<dyn PasswordCallback>>,
}

impl Debug for PemCredentialProvider {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PemCredentialProvider")
            .field("certificate", &self.certificate)
            .field("private_key", &self.private_key)
            .field("password", &self.password.is_some())
            .finish()
    }
}

impl PemCredentialProvider {
    /// Read the certificate chain and private key from the given files
    pub fn new(certificate: impl AsRef<Path>, private_key: impl AsRef<Path>) -> Self {
        Self {
            certificate: Some(certificate.as_ref().to_path_buf()),
            private_key: Some(private_key.as_ref().to_path_buf()),
            password: None,
        }
    }

    /// The callback used when the private key is encrypted
    pub fn with_password(mut self, password: impl PasswordCallback + 'static) -> Self {
        self.password = Some(Arc::new(password));
        self
    }
}

impl CredentialProvider for PemCredentialProvider {
    fn credential(&self) -> Result<Option<Credential>> {
        let (Some(certificate), Some(private_key)) = (&self.certificate, &self.private_key) else {
            return Ok(None);
        };
        let certificate_pem = std::fs::read_to_string(certificate)?;
        let key_pem = std::fs::read_to_string(private_key)?;
        Credential::from_pem(&certificate_pem, &key_pem, self.password.as_deref()).map(Some)
    }
}
