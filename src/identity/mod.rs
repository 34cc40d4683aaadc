//! Server identity — the certificate + private key the process serves with.
//!
//! The identity is resolved once at startup from a [`ServerIdentityProvider`]
//! by exact thumbprint match, then shared read-only across all listeners and
//! the token signer. A missing identity is a fatal startup error.
//!
//! # Modules
//!
//! - [`thumbprint`] — SHA-1 thumbprint newtype
//! - [`pem_store`] — PEM-directory implementation of the provider

pub mod pem_store;
pub mod thumbprint;

pub use pem_store::{PemDirStore, load_certs, load_private_key};
pub use thumbprint::Thumbprint;

use base64::{Engine as _, engine::general_purpose::STANDARD};
use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use x509_parser::prelude::{FromDer, X509Certificate};

use crate::{Error, Result};

/// A certificate chain and private key owned by the process for its lifetime.
///
/// Used both as the TLS server credential and as the token-signing
/// credential. Immutable after load; share via `Arc`.
#[derive(Debug)]
pub struct ServerIdentity {
    /// Thumbprint of the leaf certificate.
    pub thumbprint: Thumbprint,
    /// DER certificate chain, leaf first.
    pub cert_chain: Vec<CertificateDer<'static>>,
    /// DER private key for the TLS layer.
    pub key: PrivateKeyDer<'static>,
    /// PEM private key for the token signer.
    pub key_pem: String,
    /// PEM (SPKI) public key of the leaf, for token verification.
    pub public_key_pem: String,
}

impl ServerIdentity {
    /// Assemble an identity from a loaded chain and key.
    ///
    /// Extracts the leaf's public key so token verifiers do not need the
    /// private half.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the chain is empty or the leaf certificate
    /// cannot be parsed.
    pub fn new(
        cert_chain: Vec<CertificateDer<'static>>,
        key: PrivateKeyDer<'static>,
        key_pem: String,
    ) -> Result<Self> {
        let leaf = cert_chain
            .first()
            .ok_or_else(|| Error::Config("Identity certificate chain is empty".to_string()))?;

        let thumbprint = Thumbprint::from_der(leaf);
        let public_key_pem = public_key_pem(leaf)?;

        Ok(Self {
            thumbprint,
            cert_chain,
            key,
            key_pem,
            public_key_pem,
        })
    }
}

/// Resolves a server identity from some certificate source.
///
/// One operation by design: lookups happen only at startup, by exact
/// thumbprint. Implementations may back onto a PEM directory, an OS
/// keystore, or a secret manager without the rest of the system noticing.
pub trait ServerIdentityProvider {
    /// Load the identity whose leaf certificate has the given thumbprint.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` when no matching certificate exists; callers
    /// treat this as fatal.
    fn load_by_thumbprint(&self, thumbprint: &Thumbprint) -> Result<ServerIdentity>;
}

/// Extract the leaf certificate's SubjectPublicKeyInfo as a PEM block.
fn public_key_pem(leaf: &CertificateDer<'_>) -> Result<String> {
    let (_, cert) = X509Certificate::from_der(leaf)
        .map_err(|e| Error::Config(format!("Failed to parse identity certificate: {e}")))?;

    let spki = cert.public_key().raw;
    let encoded = STANDARD.encode(spki);

    let mut pem = String::from("-----BEGIN PUBLIC KEY-----\n");
    for chunk in encoded.as_bytes().chunks(64) {
        pem.push_str(std::str::from_utf8(chunk).expect("base64 is ascii"));
        pem.push('\n');
    }
    pem.push_str("-----END PUBLIC KEY-----\n");
    Ok(pem)
}
