// Copyright (c) 2023 The MobileCoin Foundation

#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use voms_ac::Credential;
use x509_cert::der::DecodePem;
use x509_cert::Certificate;

pub const CA_CERT: &str = include_str!("../../data/tests/ca.pem");
pub const USER_CERT: &str = include_str!("../../data/tests/user.pem");
pub const USER_KEY: &str = include_str!("../../data/tests/user.key");
pub const AA_TEST_VO_CERT: &str = include_str!("../../data/tests/aa_test_vo.pem");
pub const AA_OTHER_VO_CERT: &str = include_str!("../../data/tests/aa_other_vo.pem");

// Small keys keep the tests fast, never use this size outside of tests.
pub const PROXY_KEY_BITS: usize = 512;

/// The trust directory checked in under `tests/data`
pub fn static_vomsdir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/data/vomsdir")
}

/// A scratch trust directory holding the AA certificate of `test.vo`
pub fn vomsdir() -> TempDir {
    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    write(dir.path(), "voms.example.org.pem", AA_TEST_VO_CERT);
    dir
}

pub fn write(dir: &Path, name: &str, contents: &str) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).expect("Failed to create directory");
    }
    fs::write(path, contents).expect("Failed to write file");
}

pub fn ca() -> Certificate {
    Certificate::from_pem(CA_CERT).expect("Failed to decode CA certificate")
}

pub fn user_credential() -> Credential {
    Credential::from_pem(USER_CERT, USER_KEY, None).expect("Failed to load user credential")
}
