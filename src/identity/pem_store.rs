//! PEM-directory identity store.
//!
//! The store is a flat directory of `<stem>.crt` / `<stem>.key` PEM pairs.
//! Lookup scans every `.crt` file, computes the leaf thumbprint, and loads
//! the sibling key on an exact match.
//!
//! # File format
//!
//! All certificate and key files are expected in **PEM format**. DER is not
//! supported to keep operator tooling simple (openssl, cfssl, cert-manager
//! all default to PEM).

use std::fs;
use std::path::{Path, PathBuf};

use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use tracing::debug;

use super::{ServerIdentity, ServerIdentityProvider, Thumbprint};
use crate::{Error, Result};

/// Load all certificates from a PEM file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or contains no valid PEM
/// certificate blocks.
pub fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>> {
    let pem_data = read_file(path)?;
    let certs: Vec<CertificateDer<'static>> = rustls_pemfile::certs(&mut pem_data.as_slice())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| {
            Error::Config(format!(
                "Failed to parse certs from '{}': {e}",
                path.display()
            ))
        })?;

    if certs.is_empty() {
        return Err(Error::Config(format!(
            "No certificates found in '{}'",
            path.display()
        )));
    }

    Ok(certs)
}

/// Load the first private key from a PEM file.
///
/// Supports RSA (`RSA PRIVATE KEY`), PKCS#8 (`PRIVATE KEY`), and EC keys.
///
/// # Errors
///
/// Returns an error if the file cannot be read, contains no private key, or
/// the key format is unsupported.
pub fn load_private_key(path: &Path) -> Result<PrivateKeyDer<'static>> {
    let pem_data = read_file(path)?;
    let key = rustls_pemfile::private_key(&mut pem_data.as_slice())
        .map_err(|e| {
            Error::Config(format!(
                "Failed to parse private key from '{}': {e}",
                path.display()
            ))
        })?
        .ok_or_else(|| Error::Config(format!("No private key found in '{}'", path.display())))?;

    Ok(key)
}

/// Identity provider backed by a directory of PEM cert/key pairs.
#[derive(Debug, Clone)]
pub struct PemDirStore {
    dir: PathBuf,
}

impl PemDirStore {
    /// Create a store over `dir`. The directory is read lazily at lookup.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }
}

impl ServerIdentityProvider for PemDirStore {
    fn load_by_thumbprint(&self, thumbprint: &Thumbprint) -> Result<ServerIdentity> {
        let entries = fs::read_dir(&self.dir).map_err(|e| {
            Error::Config(format!(
                "Cannot read identity store '{}': {e}",
                self.dir.display()
            ))
        })?;

        for entry in entries {
            let entry = entry.map_err(|e| {
                Error::Config(format!(
                    "Cannot read identity store '{}': {e}",
                    self.dir.display()
                ))
            })?;
            let cert_path = entry.path();
            if cert_path.extension().and_then(|e| e.to_str()) != Some("crt") {
                continue;
            }

            let chain = load_certs(&cert_path)?;
            let leaf = &chain[0];
            let candidate = Thumbprint::from_der(leaf);
            if candidate != *thumbprint {
                debug!(candidate = %candidate, file = %cert_path.display(), "Thumbprint mismatch, skipping");
                continue;
            }

            let key_path = cert_path.with_extension("key");
            let key = load_private_key(&key_path)?;
            let key_pem = String::from_utf8(read_file(&key_path)?)
                .map_err(|e| Error::Config(format!("Key file is not UTF-8 PEM: {e}")))?;

            debug!(thumbprint = %thumbprint, file = %cert_path.display(), "Server identity loaded");
            return ServerIdentity::new(chain, key, key_pem);
        }

        Err(Error::Config(format!(
            "No certificate with thumbprint {thumbprint} in store '{}'",
            self.dir.display()
        )))
    }
}

fn read_file(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).map_err(|e| Error::Config(format!("Cannot read '{}': {e}", path.display())))
}
