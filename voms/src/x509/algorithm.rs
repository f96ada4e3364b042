// Copyright (c) 2023 The MobileCoin Foundation

//! Signature algorithms used by grid certificates and attribute certificates
//!
//! Verification supports RSA PKCS#1 v1.5 with SHA-256, SHA-384 and SHA-512,
//! and ECDSA P-256 with SHA-256. Signing, used for proxy certificates, is
//! always RSA with SHA-256.

use super::{Error, Result};
use const_oid::ObjectIdentifier;
use p256::ecdsa;
use p256::ecdsa::signature::Verifier;
use rsa::pkcs1::DecodeRsaPublicKey;
use rsa::sha2::{Digest, Sha256, Sha384, Sha512};
use rsa::{Pkcs1v15Sign, RsaPrivateKey};
use x509_cert::der::asn1::BitString;
use x509_cert::der::{Any, AnyRef};
use x509_cert::spki::{AlgorithmIdentifierOwned, SubjectPublicKeyInfoOwned};
use x509_cert::Certificate;

const OID_PKCS1_RSA_ENCRYPTION: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");
pub(crate) const OID_PKCS1_SHA256_WITH_RSA: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.11");
const OID_PKCS1_SHA384_WITH_RSA: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.12");
const OID_PKCS1_SHA512_WITH_RSA: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.13");
const OID_EC_PUBLIC_KEY: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");
const OID_SIG_ECDSA_WITH_SHA256: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.2");

/// Public key used in PKI signature verification
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum PublicKey {
    /// Elliptic curve public key
    Ecdsa(ecdsa::VerifyingKey),
    /// RSA public key
    Rsa(rsa::RsaPublicKey),
}

impl PublicKey {
    /// Verify the `message` and `signature` match this [`PublicKey`]
    pub fn verify(&self, message: &[u8], signature: &Signature) -> Result<()> {
        match (self, signature) {
            (PublicKey::Ecdsa(key), Signature::Ecdsa(sig)) => key
                .verify(message, sig)
                .map_err(|_| Error::SignatureVerification),
            (PublicKey::Rsa(key), Signature::Rsa(digest, sig)) => {
                let (scheme, hashed) = digest.prehash(message);
                key.verify(scheme, &hashed, sig)
                    .map_err(|_| Error::SignatureVerification)
            }
            _ => Err(Error::SignatureVerification),
        }
    }
}

/// Create a [`PublicKey`] from a [`SubjectPublicKeyInfoOwned`]
impl TryFrom<&SubjectPublicKeyInfoOwned> for PublicKey {
    type Error = Error;

    fn try_from(value: &SubjectPublicKeyInfoOwned) -> core::result::Result<Self, Self::Error> {
        let bytes = value
            .subject_public_key
            .as_bytes()
            .ok_or(Error::KeyDecoding)?;
        match value.algorithm.oid {
            OID_EC_PUBLIC_KEY => {
                let key =
                    ecdsa::VerifyingKey::from_sec1_bytes(bytes).map_err(|_| Error::KeyDecoding)?;
                Ok(PublicKey::Ecdsa(key))
            }
            OID_PKCS1_RSA_ENCRYPTION => {
                let key =
                    rsa::RsaPublicKey::from_pkcs1_der(bytes).map_err(|_| Error::KeyDecoding)?;
                Ok(PublicKey::Rsa(key))
            }
            _ => Err(Error::KeyDecoding),
        }
    }
}

/// The public key of a certificate's subject
impl TryFrom<&Certificate> for PublicKey {
    type Error = Error;

    fn try_from(certificate: &Certificate) -> core::result::Result<Self, Self::Error> {
        PublicKey::try_from(&certificate.tbs_certificate.subject_public_key_info)
    }
}

/// Digest used with an RSA PKCS#1 v1.5 signature
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum RsaDigest {
    /// SHA-256
    Sha256,
    /// SHA-384
    Sha384,
    /// SHA-512
    Sha512,
}

impl RsaDigest {
    fn prehash(self, message: &[u8]) -> (Pkcs1v15Sign, Vec<u8>) {
        match self {
            RsaDigest::Sha256 => (
                Pkcs1v15Sign::new::<Sha256>(),
                Sha256::digest(message).to_vec(),
            ),
            RsaDigest::Sha384 => (
                Pkcs1v15Sign::new::<Sha384>(),
                Sha384::digest(message).to_vec(),
            ),
            RsaDigest::Sha512 => (
                Pkcs1v15Sign::new::<Sha512>(),
                Sha512::digest(message).to_vec(),
            ),
        }
    }
}

/// Signature used in PKI verification
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum Signature {
    /// Elliptic curve signature
    Ecdsa(ecdsa::Signature),
    /// RSA signature and the digest it was computed over
    Rsa(RsaDigest, Vec<u8>),
}

impl Signature {
    /// Create a [`Signature`] from the `algorithm` and `signature` bytes
    pub fn try_from_algorithm_and_signature(
        algorithm: &AlgorithmIdentifierOwned,
        signature: &[u8],
    ) -> Result<Self> {
        let digest = match algorithm.oid {
            OID_SIG_ECDSA_WITH_SHA256 => {
                let sig =
                    ecdsa::Signature::from_der(signature).map_err(|_| Error::SignatureDecoding)?;
                return Ok(Signature::Ecdsa(sig));
            }
            OID_PKCS1_SHA256_WITH_RSA => RsaDigest::Sha256,
            OID_PKCS1_SHA384_WITH_RSA => RsaDigest::Sha384,
            OID_PKCS1_SHA512_WITH_RSA => RsaDigest::Sha512,
            _ => return Err(Error::SignatureDecoding),
        };
        Ok(Signature::Rsa(digest, signature.to_vec()))
    }

    /// Create a [`Signature`] from a signature algorithm and bit string as
    /// found at the end of certificates and attribute certificates
    pub fn try_from_bit_string(
        algorithm: &AlgorithmIdentifierOwned,
        signature: &BitString,
    ) -> Result<Self> {
        let bytes = signature.as_bytes().ok_or(Error::SignatureDecoding)?;
        Self::try_from_algorithm_and_signature(algorithm, bytes)
    }
}

/// The `sha256WithRSAEncryption` algorithm identifier, with the explicit
/// NULL parameters required by RFC4055
pub(crate) fn sha256_with_rsa() -> AlgorithmIdentifierOwned {
    AlgorithmIdentifierOwned {
        oid: OID_PKCS1_SHA256_WITH_RSA,
        parameters: Some(Any::from(AnyRef::NULL)),
    }
}

/// Sign `message` with `key` using RSA PKCS#1 v1.5 and SHA-256
pub(crate) fn sign_sha256_with_rsa(key: &RsaPrivateKey, message: &[u8]) -> Result<BitString> {
    let hashed = Sha256::digest(message);
    let signature = key
        .sign(Pkcs1v15Sign::new::<Sha256>(), &hashed)
        .map_err(|_| Error::SignatureVerification)?;
    BitString::from_bytes(&signature).map_err(Error::from)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::x509::Error::SignatureDecoding;
    use p256::ecdsa::signature::Signer;
    use p256::ecdsa::SigningKey;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use rsa::RsaPublicKey;
    use x509_cert::der::DecodePem;
    use yare::parameterized;

    const CA_CERT: &str = include_str!("../../data/tests/ca.pem");

    // Warning one should not copy this size for production code without
    // understanding the security implications.
    // This size is chosen to be small so that the tests run quickly, while
    // leaving room for a PKCS#1 v1.5 SHA-512 digest info.
    const RSA_KEY_BITS: usize = 1024;

    fn rsa_key(seed: u64) -> RsaPrivateKey {
        let mut rng = StdRng::seed_from_u64(seed);
        RsaPrivateKey::new(&mut rng, RSA_KEY_BITS).expect("Failed to create RSA key")
    }

    #[test]
    fn rsa_key_from_certificate() {
        let certificate = Certificate::from_pem(CA_CERT).expect("Failed to decode certificate");
        assert!(matches!(
            PublicKey::try_from(&certificate),
            Ok(PublicKey::Rsa(_))
        ));
    }

    #[test]
    fn certificate_self_signature_verifies() {
        let certificate = Certificate::from_pem(CA_CERT).expect("Failed to decode certificate");
        let key = PublicKey::try_from(&certificate).expect("Failed to decode key");
        let signature = Signature::try_from_bit_string(
            &certificate.signature_algorithm,
            &certificate.signature,
        )
        .expect("Failed to decode signature");
        let message = x509_cert::der::Encode::to_der(&certificate.tbs_certificate)
            .expect("Failed to encode TBS certificate");

        assert_eq!(key.verify(&message, &signature), Ok(()));
    }

    #[test]
    fn unknown_key_algorithm_fails() {
        let certificate = Certificate::from_pem(CA_CERT).expect("Failed to decode certificate");
        let mut info = certificate.tbs_certificate.subject_public_key_info;
        info.algorithm.oid = OID_PKCS1_SHA256_WITH_RSA;
        assert_eq!(PublicKey::try_from(&info), Err(Error::KeyDecoding));
    }

    #[parameterized(
        sha256 = { RsaDigest::Sha256 },
        sha384 = { RsaDigest::Sha384 },
        sha512 = { RsaDigest::Sha512 },
    )]
    fn rsa_verify(digest: RsaDigest) {
        let private_key = rsa_key(1);
        let public_key = PublicKey::Rsa(RsaPublicKey::from(&private_key));
        let message = b"/test.vo/Role=NULL/Capability=NULL";
        let (scheme, hashed) = digest.prehash(message);
        let signature = private_key
            .sign(scheme, &hashed)
            .expect("Failed to sign message");

        assert_eq!(
            public_key.verify(message, &Signature::Rsa(digest, signature)),
            Ok(())
        );
    }

    #[test]
    fn rsa_digest_mismatch_fails() {
        let private_key = rsa_key(2);
        let public_key = PublicKey::Rsa(RsaPublicKey::from(&private_key));
        let message = b"Hello, world!";
        let (scheme, hashed) = RsaDigest::Sha384.prehash(message);
        let signature = private_key
            .sign(scheme, &hashed)
            .expect("Failed to sign message");

        assert_eq!(
            public_key.verify(message, &Signature::Rsa(RsaDigest::Sha256, signature)),
            Err(Error::SignatureVerification)
        );
    }

    #[test]
    fn sha256_signer_output_verifies() {
        let private_key = rsa_key(3);
        let public_key = PublicKey::Rsa(RsaPublicKey::from(&private_key));
        let message = b"attribute certificate info";
        let bits = sign_sha256_with_rsa(&private_key, message).expect("Failed to sign");
        let signature = Signature::try_from_bit_string(&sha256_with_rsa(), &bits)
            .expect("Failed to decode signature");

        assert_eq!(public_key.verify(message, &signature), Ok(()));
        assert_eq!(
            public_key.verify(b"something else", &signature),
            Err(Error::SignatureVerification)
        );
    }

    #[parameterized(
        seed_1 = { 1 },
        seed_2 = { 2 },
    )]
    fn ecdsa_verify(seed: u64) {
        let mut rng = StdRng::seed_from_u64(seed);
        let signing_key = SigningKey::random(&mut rng);
        let public_key = PublicKey::Ecdsa(*signing_key.verifying_key());
        let message = b"Hello, world!";
        let signature = Signature::Ecdsa(signing_key.sign(message));

        assert_eq!(public_key.verify(message, &signature), Ok(()));
    }

    #[test]
    fn key_and_signature_kind_mismatch_fails() {
        let mut rng = StdRng::seed_from_u64(4);
        let signing_key = SigningKey::random(&mut rng);
        let ecdsa_signature: ecdsa::Signature = signing_key.sign(b"message");
        let public_key = PublicKey::Rsa(RsaPublicKey::from(&rsa_key(4)));

        assert_eq!(
            public_key.verify(b"message", &Signature::Ecdsa(ecdsa_signature)),
            Err(Error::SignatureVerification)
        );
    }

    #[test]
    fn unsupported_signature_algorithm_fails() {
        let algorithm = AlgorithmIdentifierOwned {
            // md5WithRSAEncryption
            oid: ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.4"),
            parameters: None,
        };
        assert_eq!(
            Signature::try_from_algorithm_and_signature(&algorithm, &[1, 2, 3]),
            Err(SignatureDecoding)
        );
    }
}
