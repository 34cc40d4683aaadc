//! Bearer-token verification.
//!
//! Tokens are ES256 JWTs minted by the authorization server; the verifier
//! holds the public half of the shared server identity and checks signature,
//! expiry, audience, and issuer. Any failure yields a uniform `401` with a
//! `WWW-Authenticate: Bearer` challenge.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use jsonwebtoken::{Algorithm, DecodingKey, Validation};
use tracing::debug;

use crate::authserver::TokenClaims;
use crate::{Error, Result};

/// Verifies bearer tokens against the token-signing public key.
pub struct TokenVerifier {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier").finish_non_exhaustive()
    }
}

impl TokenVerifier {
    /// Create a verifier for tokens signed by the given public key and
    /// scoped to one audience and issuer.
    ///
    /// # Errors
    ///
    /// Returns `Error::Token` when the PEM is not a usable EC public key.
    pub fn new(public_key_pem: &str, audience: &str, issuer: &str) -> Result<Self> {
        let decoding_key = DecodingKey::from_ec_pem(public_key_pem.as_bytes())
            .map_err(|e| Error::Token(format!("Verification key is not usable: {e}")))?;

        let mut validation = Validation::new(Algorithm::ES256);
        validation.set_audience(&[audience]);
        validation.set_issuer(&[issuer]);

        Ok(Self {
            decoding_key,
            validation,
        })
    }

    /// Verify a compact JWT and return its claims.
    ///
    /// # Errors
    ///
    /// Returns `Error::Token` for any signature, expiry, audience, or issuer
    /// failure.
    pub fn verify(&self, token: &str) -> Result<TokenClaims> {
        jsonwebtoken::decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| Error::Token(format!("Token rejected: {e}")))
    }
}

/// Middleware: demand a valid bearer token, then attach its claims to the
/// request as a [`TokenClaims`] extension.
pub async fn require_bearer(
    State(verifier): State<Arc<TokenVerifier>>,
    mut request: Request,
    next: Next,
) -> Response {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "));

    let Some(token) = token else {
        debug!("Request without bearer token");
        return unauthorized();
    };

    match verifier.verify(token) {
        Ok(claims) => {
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(e) => {
            debug!(error = %e, "Bearer token rejected");
            unauthorized()
        }
    }
}

fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        [(header::WWW_AUTHENTICATE, "Bearer")],
    )
        .into_response()
}
