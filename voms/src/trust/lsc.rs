// Copyright (c) 2023 The MobileCoin Foundation

//! LSC files, which describe the certificate chain an AA of a VO embeds in
//! its attribute certificates
//!
//! One LSC file exists per VO and AA host, named `<vomsdir>/<vo>/<host>.lsc`.
//! Each line holds the slash form distinguished name of one certificate, leaf
//! first. Alternative chains are separated by a line of dashes:
//!
//! ```text
//! # voms.example.org
//! /C=IT/O=IGI/OU=Host/CN=voms.example.org
//! /C=IT/O=IGI/CN=Test CA
//! ------ NEXT CHAIN ------
//! /C=IT/O=IGI/OU=Host/CN=voms.example.org
//! /C=IT/O=IGI/CN=New Test CA
//! ```

use crate::x509::DnPattern;
use crate::{Error, Result};
use core::hash::{Hash, Hasher};
use core::str::FromStr;
use std::fs;
use std::path::{Path, PathBuf};
use x509_cert::Certificate;

/// File extension of LSC files
pub const LSC_EXTENSION: &str = "lsc";

/// Trust information for the AA of one VO at one host
pub trait LscInfo: core::fmt::Debug + Send + Sync {
    /// The VO the AA serves
    fn vo(&self) -> &str;

    /// Host name of the AA
    fn hostname(&self) -> &str;

    /// The file the information was loaded from, if any
    fn filename(&self) -> Option<&Path>;

    /// The accepted AA certificate chains
    fn certificate_chain_descriptions(&self) -> &[ChainDescription];

    /// Whether any description matches the leaf first `chain`
    fn matches(&self, chain: &[Certificate]) -> bool {
        self.certificate_chain_descriptions()
            .iter()
            .any(|description| description.matches(chain))
    }
}

/// The names of one certificate chain, leaf first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainDescription {
    entries: Vec<DnPattern>,
}

impl ChainDescription {
    /// A description from names listed leaf first
    pub fn new(entries: Vec<DnPattern>) -> Self {
        Self { entries }
    }

    /// The names, leaf first
    pub fn entries(&self) -> &[DnPattern] {
        &self.entries
    }

    /// Entry `i` must match the subject of certificate `i`. When the
    /// description has one more entry than the chain, the extra entry must
    /// match the issuer of the last certificate, so that a chain holding only
    /// the AA certificate is matched by a description naming its CA.
    pub fn matches(&self, chain: &[Certificate]) -> bool {
        let Some(last) = chain.last() else {
            return false;
        };
        let subjects_match = || {
            self.entries
                .iter()
                .zip(chain)
                .all(|(entry, certificate)| entry.matches(&certificate.tbs_certificate.subject))
        };
        if self.entries.len() == chain.len() {
            subjects_match()
        } else if self.entries.len() == chain.len() + 1 {
            subjects_match() && self.entries[chain.len()].matches(&last.tbs_certificate.issuer)
        } else {
            false
        }
    }
}

/// A parsed LSC file.
///
/// Two LSC files are equal when they describe the same VO and host, whatever
/// their content.
#[derive(Debug, Clone)]
pub struct LscFile {
    vo: String,
    hostname: String,
    filename: Option<PathBuf>,
    descriptions: Vec<ChainDescription>,
}

impl LscFile {
    /// Parse LSC `contents` for `vo` and `hostname`
    pub fn parse(vo: &str, hostname: &str, contents: &str) -> Result<Self> {
        let descriptions = parse_descriptions(contents)
            .map_err(|reason| Error::InvalidLscFile(format!("{vo}/{hostname}"), reason))?;
        Ok(Self {
            vo: vo.to_string(),
            hostname: hostname.to_string(),
            filename: None,
            descriptions,
        })
    }

    /// Load `path`, the hostname is the file name without the `.lsc`
    /// extension
    pub fn load(vo: &str, path: &Path) -> Result<Self> {
        let hostname = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| {
                Error::InvalidLscFile(path.display().to_string(), "invalid file name".to_string())
            })?;
        let contents = fs::read_to_string(path)?;
        let descriptions = parse_descriptions(&contents)
            .map_err(|reason| Error::InvalidLscFile(path.display().to_string(), reason))?;
        Ok(Self {
            vo: vo.to_string(),
            hostname: hostname.to_string(),
            filename: Some(path.to_path_buf()),
            descriptions,
        })
    }
}

fn parse_descriptions(contents: &str) -> core::result::Result<Vec<ChainDescription>, String> {
    let mut descriptions = Vec::new();
    let mut entries = Vec::new();
    for line in contents.lines().map(str::trim) {
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if line.starts_with('-') {
            if !entries.is_empty() {
                descriptions.push(ChainDescription::new(core::mem::take(&mut entries)));
            }
            continue;
        }
        entries.push(DnPattern::from_str(line).map_err(|error| error.to_string())?);
    }
    if !entries.is_empty() {
        descriptions.push(ChainDescription::new(entries));
    }
    if descriptions.is_empty() {
        return Err("no certificate chain description".to_string());
    }
    Ok(descriptions)
}

impl LscInfo for LscFile {
    fn vo(&self) -> &str {
        &self.vo
    }

    fn hostname(&self) -> &str {
        &self.hostname
    }

    fn filename(&self) -> Option<&Path> {
        self.filename.as_deref()
    }

    fn certificate_chain_descriptions(&self) -> &[ChainDescription] {
        &self.descriptions
    }
}

impl PartialEq for LscFile {
    fn eq(&self, other: &Self) -> bool {
        self.vo == other.vo && self.hostname == other.hostname
    }
}

impl Eq for LscFile {}

impl Hash for LscFile {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.vo.hash(state);
        self.hostname.hash(state);
    }
}
