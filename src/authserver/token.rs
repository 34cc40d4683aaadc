//! Access token mint.
//!
//! Tokens are ES256 JWTs signed with the server identity's private key —
//! the same certificate that terminates TLS also signs tokens, so resource
//! servers sharing the identity store can verify with its public half.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use jsonwebtoken::{Algorithm, EncodingKey, Header};
use serde::{Deserialize, Serialize};
use tracing::debug;
use uuid::Uuid;

use crate::identity::ServerIdentity;
use crate::{Error, Result};

/// Claims carried by an issued access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenClaims {
    /// Issuer URL.
    pub iss: String,
    /// Subject — the authenticated client id.
    pub sub: String,
    /// The authenticated client id (duplicated for claim-set consumers).
    pub client_id: String,
    /// Audiences — one per granted scope, so a multi-scope token is
    /// accepted by each of its resources.
    pub aud: Vec<String>,
    /// Space-separated granted scopes.
    pub scope: String,
    /// Token identifier.
    pub jti: String,
    /// Issued-at (Unix seconds).
    pub iat: u64,
    /// Expiry (Unix seconds).
    pub exp: u64,
}

/// A freshly minted token plus the metadata the token response needs.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// Encoded JWT.
    pub access_token: String,
    /// Seconds until expiry.
    pub expires_in: u64,
    /// Granted scope string.
    pub scope: String,
}

/// Signs access tokens with the server identity key.
pub struct TokenSigner {
    encoding_key: EncodingKey,
    issuer: String,
    ttl: Duration,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("issuer", &self.issuer)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenSigner {
    /// Create a signer from the server identity.
    ///
    /// # Errors
    ///
    /// Returns `Error::Token` if the identity's private key is not a usable
    /// EC key.
    pub fn new(identity: &ServerIdentity, issuer: String, ttl: Duration) -> Result<Self> {
        let encoding_key = EncodingKey::from_ec_pem(identity.key_pem.as_bytes())
            .map_err(|e| Error::Token(format!("Identity key is not usable for ES256: {e}")))?;
        Ok(Self {
            encoding_key,
            issuer,
            ttl,
        })
    }

    /// Mint a token for an authenticated client.
    ///
    /// # Errors
    ///
    /// Returns `Error::Token` if encoding fails.
    pub fn issue(&self, client_id: &str, scope: &str) -> Result<IssuedToken> {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_err(|e| Error::Internal(format!("System time error: {e}")))?
            .as_secs();
        let expires_in = self.ttl.as_secs();

        let claims = TokenClaims {
            iss: self.issuer.clone(),
            sub: client_id.to_string(),
            client_id: client_id.to_string(),
            aud: scope.split_whitespace().map(str::to_string).collect(),
            scope: scope.to_string(),
            jti: Uuid::new_v4().to_string(),
            iat: now,
            exp: now + expires_in,
        };

        let access_token =
            jsonwebtoken::encode(&Header::new(Algorithm::ES256), &claims, &self.encoding_key)
                .map_err(|e| Error::Token(format!("Token encoding failed: {e}")))?;

        debug!(client_id = %client_id, jti = %claims.jti, expires_in, "Access token issued");

        Ok(IssuedToken {
            access_token,
            expires_in,
            scope: scope.to_string(),
        })
    }
}
