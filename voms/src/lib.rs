// Copyright (c) 2023 The MobileCoin Foundation

#![doc = include_str!("../README.md")]
#![deny(missing_docs, missing_debug_implementations, unsafe_code)]

pub mod ac;
mod attribute;
mod certificate_chain;
pub mod config;
mod credential;
mod error;
pub mod oid;
mod parser;
mod proxy;
pub mod trust;
mod validation;
mod validator;
pub mod x509;

#[cfg(test)]
mod fixtures;

pub use crate::attribute::{VomsAttribute, VomsGenericAttribute};
pub use crate::certificate_chain::{ChainValidationError, ChainValidator, ValidatedChain};
pub use crate::config::{TrustStoreConfig, ValidatorConfig};
pub use crate::credential::{
    Credential, CredentialProvider, PasswordCallback, PemCredentialProvider,
};
pub use crate::error::{Error, Result};
pub use crate::parser::{ParsedAc, VomsAcParser};
pub use crate::proxy::{
    DelegationMode, ProxyBuilder, ProxyCertificate, DEFAULT_KEY_BITS, DEFAULT_LIFETIME,
    MIN_KEY_BITS,
};
pub use crate::trust::{
    DefaultTrustStore, LscFile, LscInfo, RefreshingTrustStore, TrustSnapshot, Updateable,
    VomsTrustStore,
};
pub use crate::validation::{
    ValidationErrorCode, ValidationErrorMessage, ValidationResult, ValidationResultListener,
};
pub use crate::validator::VomsAcValidator;
pub use crate::x509::{ProxyChainValidator, ProxyType};
