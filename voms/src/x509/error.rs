// Copyright (c) 2023 The MobileCoin Foundation

/// Error type for decoding and verifying certificates.
#[derive(Debug, displaydoc::Display, PartialEq, Eq)]
pub enum Error {
    /// An error occurred decoding a signature
    SignatureDecoding,
    /// The signature does not match with the verifying key
    SignatureVerification,
    /// The certificate has expired
    CertificateExpired,
    /// An error occurred decoding the certificate: {0}
    CertificateDecoding(x509_cert::der::Error),
    /// The certificate is not yet valid
    CertificateNotYetValid,
    /// An error occurred decoding the key from a certificate
    KeyDecoding,
    /// Unable to parse the distinguished name "{0}"
    DistinguishedNameSyntax(String),
    /// An error occurred decoding PEM text: {0}
    PemDecoding(pem::PemError),
}

impl From<x509_cert::der::Error> for Error {
    fn from(src: x509_cert::der::Error) -> Self {
        Error::CertificateDecoding(src)
    }
}

impl From<pem::PemError> for Error {
    fn from(src: pem::PemError) -> Self {
        Error::PemDecoding(src)
    }
}

impl std::error::Error for Error {}
