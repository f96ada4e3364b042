// Copyright (c) 2023 The MobileCoin Foundation

//! Errors that can occur loading trust material, parsing attribute
//! certificates and generating proxies
//!
//! Validation failures of individual attribute certificates are not errors,
//! they are reported as [`crate::ValidationErrorMessage`]s.

/// Result type for this crate
pub type Result<T> = core::result::Result<T, Error>;

/// Error working with VOMS credentials and trust material
#[derive(displaydoc::Display, Debug)]
pub enum Error {
    /// Error converting from DER {0}
    Der(der::Error),
    /// I/O error: {0}
    Io(std::io::Error),
    /// Error parsing configuration JSON: {0}
    Serde(serde_json::Error),
    /// X509 error: {0}
    X509(crate::x509::Error),
    /// Error decoding a PKCS#8 private key: {0}
    Pkcs8(pkcs8::Error),
    /// Error decoding a PKCS#1 private key: {0}
    Pkcs1(rsa::pkcs1::Error),
    /// The VOMS extension does not hold a sequence of attribute certificates: {0}
    InvalidAc(der::Error),
    /// No trust directories were configured
    NoTrustDirectories,
    /// Trust directory {0} does not exist or is not a directory
    TrustDirectoryNotFound(String),
    /// The trust directories hold no AA certificates and no LSC files
    EmptyTrustStore,
    /// The trust store update frequency must be greater than zero
    InvalidUpdateFrequency,
    /// Malformed LSC file {0}: {1}
    InvalidLscFile(String, String),
    /// Unsupported proxy type "{0}"
    UnsupportedProxyType(String),
    /// Proxy key size of {0} bits is below the minimum of 512 bits
    InvalidKeySize(usize),
    /// Failed to generate the proxy certificate: {0}
    ProxyGeneration(String),
    /// The credential does not hold any certificate
    EmptyCredentialChain,
    /// The credential private key does not match its certificate
    CredentialKeyMismatch,
    /// The private key is encrypted and no password was provided
    MissingPassword,
    /// No PEM encoded private key was found
    MissingPrivateKey,
    /// Unsupported private key PEM label "{0}"
    UnsupportedKeyFormat(String),
}

impl From<der::Error> for Error {
    fn from(e: der::Error) -> Self {
        Error::Der(e)
    }
}

impl From<std::io::Error> for Error {
    fn from(e: std::io::Error) -> Self {
        Error::Io(e)
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serde(e)
    }
}

impl From<crate::x509::Error> for Error {
    fn from(e: crate::x509::Error) -> Self {
        Error::X509(e)
    }
}

impl From<pkcs8::Error> for Error {
    fn from(e: pkcs8::Error) -> Self {
        Error::Pkcs8(e)
    }
}

impl From<rsa::pkcs1::Error> for Error {
    fn from(e: rsa::pkcs1::Error) -> Self {
        Error::Pkcs1(e)
    }
}

impl std::error::Error for Error {}
