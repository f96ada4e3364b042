// Copyright (c) 2023 The MobileCoin Foundation

//! Builds trust snapshots from VOMS trust directories
//!
//! ```text
//! vomsdir/
//!     voms.example.org.pem      AA certificates
//!     test.vo/
//!         voms.example.org.lsc  LSC files, one per AA host
//!         voms2.example.org.pem more AA certificates
//! ```

use super::lsc::{LscFile, LscInfo, LSC_EXTENSION};
use super::store::TrustSnapshot;
use crate::x509::certificates_from_pem;
use crate::{Error, Result};
use core::fmt::Display;
use der::Encode;
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use x509_cert::Certificate;

const CERTIFICATE_EXTENSION: &str = "pem";

/// What to do with a configured trust directory which does not exist
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum MissingDirectory {
    /// Fail the load, used when a store is built
    Fail,
    /// Record the directory as skipped, used on reloads so that the trust
    /// material of a removed directory stops being used
    Skip,
}

/// Load every trust directory in `trust_dirs`.
///
/// Unreadable or malformed files are skipped and recorded in the snapshot.
/// Trust directories holding nothing usable are an error.
pub(crate) fn load_trust_directories(
    trust_dirs: &[PathBuf],
    missing: MissingDirectory,
) -> Result<TrustSnapshot> {
    if trust_dirs.is_empty() {
        return Err(Error::NoTrustDirectories);
    }
    let mut builder = SnapshotBuilder::default();
    for dir in trust_dirs {
        if !dir.is_dir() {
            match missing {
                MissingDirectory::Fail => {
                    return Err(Error::TrustDirectoryNotFound(dir.display().to_string()))
                }
                MissingDirectory::Skip => {
                    builder.skip(dir, "the trust directory does not exist");
                    continue;
                }
            }
        }
        builder.load_directory(dir)?;
    }

    let snapshot = builder.build();
    if snapshot.is_empty() {
        return Err(Error::EmptyTrustStore);
    }
    info!(
        certificates = snapshot.local_aa_certificates().len(),
        lsc_files = snapshot.lsc_count(),
        skipped = snapshot.skipped_files().len(),
        "Loaded VOMS trust information"
    );
    Ok(snapshot)
}

#[derive(Default)]
struct SnapshotBuilder {
    certificates: Vec<Certificate>,
    encodings: HashSet<Vec<u8>>,
    lsc_files: HashMap<String, HashMap<String, Arc<LscFile>>>,
    skipped_files: Vec<PathBuf>,
}

impl SnapshotBuilder {
    fn load_directory(&mut self, dir: &Path) -> Result<()> {
        for path in sorted_entries(dir)? {
            if path.is_dir() {
                self.load_vo_directory(&path);
            } else if has_extension(&path, CERTIFICATE_EXTENSION) {
                self.load_certificates(&path);
            }
        }
        Ok(())
    }

    fn load_vo_directory(&mut self, dir: &Path) {
        let Some(vo) = dir.file_name().and_then(|name| name.to_str()) else {
            self.skip(dir, "the VO name is not valid UTF-8");
            return;
        };
        let entries = match sorted_entries(dir) {
            Ok(entries) => entries,
            Err(error) => {
                self.skip(dir, error);
                return;
            }
        };
        for path in entries {
            if has_extension(&path, LSC_EXTENSION) {
                self.load_lsc(vo, &path);
            } else if has_extension(&path, CERTIFICATE_EXTENSION) {
                self.load_certificates(&path);
            }
        }
    }

    fn load_certificates(&mut self, path: &Path) {
        let certificates = fs::read_to_string(path)
            .map_err(Error::from)
            .and_then(|pem| Ok(certificates_from_pem(&pem)?));
        match certificates {
            Ok(certificates) if certificates.is_empty() => {
                self.skip(path, "no PEM encoded certificate");
            }
            Ok(certificates) => {
                for certificate in certificates {
                    self.add_certificate(path, certificate);
                }
            }
            Err(error) => self.skip(path, error),
        }
    }

    fn add_certificate(&mut self, path: &Path, certificate: Certificate) {
        match certificate.to_der() {
            Ok(encoding) => {
                if self.encodings.insert(encoding) {
                    self.certificates.push(certificate);
                } else {
                    debug!(path = %path.display(), "Ignoring duplicate AA certificate");
                }
            }
            Err(error) => self.skip(path, error),
        }
    }

    fn load_lsc(&mut self, vo: &str, path: &Path) {
        match LscFile::load(vo, path) {
            Ok(lsc) => {
                // Keyed by VO and host, a later file replaces an earlier one
                self.lsc_files
                    .entry(lsc.vo().to_string())
                    .or_default()
                    .insert(lsc.hostname().to_string(), Arc::new(lsc));
            }
            Err(error) => self.skip(path, error),
        }
    }

    fn skip(&mut self, path: &Path, reason: impl Display) {
        warn!(path = %path.display(), %reason, "Skipping VOMS trust file");
        self.skipped_files.push(path.to_path_buf());
    }

    fn build(self) -> TrustSnapshot {
        TrustSnapshot::new(self.certificates, self.lsc_files, self.skipped_files)
    }
}

/// The entries of `dir` in name order, hidden files excluded
fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir)?
        .map(|entry| entry.map(|entry| entry.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    entries.retain(|path| {
        !path
            .file_name()
            .and_then(|name| name.to_str())
            .map_or(false, |name| name.starts_with('.'))
    });
    entries.sort();
    Ok(entries)
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.is_file() && path.extension().and_then(|ext| ext.to_str()) == Some(extension)
}
