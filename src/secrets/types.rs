//! Credential and verdict types for the authentication pipeline.

use chrono::{DateTime, Utc};
use rustls::pki_types::CertificateDer;
use serde::{Deserialize, Serialize};

/// Result of extracting a credential from a request.
///
/// Absence is a valid terminal outcome, not an error: the token endpoint
/// translates it into a uniform `invalid_client` response. Modelled as an
/// enum so the no-credential case is exhaustively matched rather than
/// null-checked.
#[derive(Debug, Clone)]
pub enum ParseOutcome {
    /// A credential was extracted from the request.
    Present(ParsedSecret),
    /// No credential could be extracted.
    Absent,
}

impl ParseOutcome {
    /// True when no credential was extracted.
    pub fn is_absent(&self) -> bool {
        matches!(self, Self::Absent)
    }
}

/// A normalized credential extracted from a single request.
#[derive(Debug, Clone)]
pub struct ParsedSecret {
    /// The client identifier claimed in the request body.
    pub client_id: String,
    /// The proof of identity presented with the request.
    pub credential: ParsedCredential,
}

/// The credential material behind a [`ParsedSecret`].
///
/// An `X509Certificate` is only ever constructed from the certificate
/// presented on the active TLS connection, never from request data — that
/// invariant is what prevents credential substitution.
#[derive(Debug, Clone)]
pub enum ParsedCredential {
    /// The peer certificate from the TLS handshake (DER).
    X509Certificate(CertificateDer<'static>),
    /// A shared-secret credential (unused by this pipeline; validators
    /// for other secret kinds reject it).
    SharedSecret(String),
}

/// The kind of a registered secret.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RegisteredSecretKind {
    /// Lowercase hex SHA-1 certificate thumbprint.
    #[default]
    X509Thumbprint,
}

/// A secret registered for a client in the client registry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisteredSecret {
    /// Secret kind.
    #[serde(default, rename = "kind")]
    pub kind: RegisteredSecretKind,
    /// Expected value; for thumbprints, 40 hex characters (any case).
    pub value: String,
    /// Optional expiry; expired secrets are skipped during validation.
    #[serde(default)]
    pub expiration: Option<DateTime<Utc>>,
}

impl RegisteredSecret {
    /// A thumbprint secret without expiry.
    pub fn thumbprint(value: impl Into<String>) -> Self {
        Self {
            kind: RegisteredSecretKind::X509Thumbprint,
            value: value.into(),
            expiration: None,
        }
    }

    /// True when the secret has expired at `now`.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expiration.is_some_and(|exp| exp <= now)
    }
}

/// Outcome of secret validation.
///
/// Carries nothing but success/failure: the reason a validation failed
/// stays in the logs and is never observable in the verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidationVerdict {
    /// Whether the credential matched a registered secret.
    pub success: bool,
}

impl ValidationVerdict {
    /// An accepting verdict.
    pub const fn accept() -> Self {
        Self { success: true }
    }

    /// A rejecting verdict.
    pub const fn reject() -> Self {
        Self { success: false }
    }
}
