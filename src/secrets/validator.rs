//! Thumbprint secret validator.
//!
//! Compares the presented certificate's SHA-1 thumbprint against the secrets
//! registered for the claimed client, in constant time. The verdict carries
//! success or failure only; no reason leaks into the observable result, and
//! thumbprint values are never logged.

use chrono::Utc;
use subtle::ConstantTimeEq;
use tracing::debug;

use super::types::{
    ParsedCredential, ParsedSecret, RegisteredSecret, RegisteredSecretKind, ValidationVerdict,
};
use crate::identity::Thumbprint;
use crate::{Error, Result};

/// Validate a parsed credential against the secrets registered for its
/// client.
///
/// Multiple thumbprint secrets may be registered for one client; the first
/// match accepts, which is what allows old and new certificates to coexist
/// during a rotation window. Expired secrets are skipped.
///
/// # Errors
///
/// Returns [`Error::InvalidCredential`] when a malformed certificate
/// (empty DER) reaches the validator. That is an internal wiring bug, not an
/// authentication failure, and must surface loudly rather than as a quiet
/// rejection.
pub fn validate(
    registered: &[RegisteredSecret],
    parsed: &ParsedSecret,
) -> Result<ValidationVerdict> {
    debug!(client_id = %parsed.client_id, "Thumbprint validation start");

    let der = match &parsed.credential {
        ParsedCredential::X509Certificate(der) => der,
        ParsedCredential::SharedSecret(_) => {
            debug!("Credential is not an X.509 certificate");
            return Ok(ValidationVerdict::reject());
        }
    };

    if der.is_empty() {
        return Err(Error::InvalidCredential(
            "presented certificate has no DER bytes".to_string(),
        ));
    }

    let presented = Thumbprint::from_der(der);
    let now = Utc::now();

    for secret in registered {
        if secret.kind != RegisteredSecretKind::X509Thumbprint {
            continue;
        }
        if secret.is_expired(now) {
            debug!(client_id = %parsed.client_id, "Skipping expired registered secret");
            continue;
        }

        let expected = secret.value.to_ascii_lowercase();
        // Equal-length inputs are compared byte for byte regardless of where
        // the first difference sits; length mismatch short-circuits, which
        // reveals nothing useful for a fixed-width hex digest.
        if presented
            .as_str()
            .as_bytes()
            .ct_eq(expected.as_bytes())
            .into()
        {
            debug!(client_id = %parsed.client_id, "Thumbprint matched a registered secret");
            return Ok(ValidationVerdict::accept());
        }
    }

    debug!(client_id = %parsed.client_id, "No registered secret matched");
    Ok(ValidationVerdict::reject())
}
