//! Token endpoint and discovery document handlers.
//!
//! Every authentication failure — no certificate, unparseable form, unknown
//! client, thumbprint mismatch — produces the same `invalid_client` object.
//! The cause is logged for operators but never distinguishable to the
//! caller.

use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Extension, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, error};

use super::registry::ClientRegistry;
use super::token::TokenSigner;
use crate::listener::PeerCertificate;
use crate::secrets::{self, InputLengthRestrictions, ParseOutcome};

/// Grant type accepted by the token endpoint.
const CLIENT_CREDENTIALS: &str = "client_credentials";

/// Shared state for the authorization server handlers.
#[derive(Debug)]
pub struct AuthServerState {
    /// Registered clients and their secrets.
    pub registry: ClientRegistry,
    /// Token mint.
    pub signer: TokenSigner,
    /// Request field limits for the secret parser.
    pub restrictions: InputLengthRestrictions,
    /// Issuer URL advertised in the discovery document.
    pub issuer: String,
}

/// Successful token response.
#[derive(Debug, Serialize)]
struct TokenResponse {
    access_token: String,
    token_type: &'static str,
    expires_in: u64,
    scope: String,
}

/// Build the authorization server routes.
pub fn auth_routes(state: Arc<AuthServerState>) -> Router {
    Router::new()
        .route("/connect/token", post(token_endpoint))
        .route("/.well-known/openid-configuration", get(discovery))
        .with_state(state)
}

/// `POST /connect/token` — client-credentials grant with an mTLS
/// certificate secret.
async fn token_endpoint(
    State(state): State<Arc<AuthServerState>>,
    Extension(peer): Extension<PeerCertificate>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok());

    let outcome = secrets::parse(peer.0.as_ref(), content_type, &body, state.restrictions);
    let ParseOutcome::Present(parsed) = outcome else {
        return oauth_error(StatusCode::BAD_REQUEST, "invalid_client");
    };

    let Some(client) = state.registry.get(&parsed.client_id) else {
        debug!(client_id = %parsed.client_id, "Unknown client");
        return oauth_error(StatusCode::BAD_REQUEST, "invalid_client");
    };

    let verdict = match secrets::validate(&client.secrets, &parsed) {
        Ok(v) => v,
        Err(e) => {
            // Contract violation: malformed credential made it past parsing.
            error!(error = %e, "Secret validator rejected its input");
            return oauth_error(StatusCode::INTERNAL_SERVER_ERROR, "server_error");
        }
    };
    if !verdict.success {
        return oauth_error(StatusCode::BAD_REQUEST, "invalid_client");
    }

    let grant_type = form_field(&body, "grant_type");
    if grant_type.as_deref() != Some(CLIENT_CREDENTIALS) {
        debug!(grant_type = ?grant_type, "Unsupported grant type");
        return oauth_error(StatusCode::BAD_REQUEST, "unsupported_grant_type");
    }

    let scope = match granted_scope(&body, &client.scopes) {
        Some(scope) => scope,
        None => return oauth_error(StatusCode::BAD_REQUEST, "invalid_scope"),
    };

    match state.signer.issue(&client.client_id, &scope) {
        Ok(issued) => Json(TokenResponse {
            access_token: issued.access_token,
            token_type: "Bearer",
            expires_in: issued.expires_in,
            scope: issued.scope,
        })
        .into_response(),
        Err(e) => {
            error!(error = %e, "Token issuance failed");
            oauth_error(StatusCode::INTERNAL_SERVER_ERROR, "server_error")
        }
    }
}

/// `GET /.well-known/openid-configuration`
async fn discovery(State(state): State<Arc<AuthServerState>>) -> Json<serde_json::Value> {
    Json(json!({
        "issuer": state.issuer,
        "token_endpoint": format!("{}/connect/token", state.issuer),
        "grant_types_supported": [CLIENT_CREDENTIALS],
        "scopes_supported": state.registry.known_scopes(),
        "token_endpoint_auth_methods_supported": ["tls_client_auth"],
        "response_types_supported": ["token"],
    }))
}

/// Uniform OAuth2 error object.
fn oauth_error(status: StatusCode, code: &'static str) -> Response {
    (status, Json(json!({ "error": code }))).into_response()
}

/// First value of a form field.
fn form_field(body: &[u8], name: &str) -> Option<String> {
    url::form_urlencoded::parse(body)
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.into_owned())
}

/// Resolve the scope to grant.
///
/// An absent or empty `scope` grants everything the client is allowed;
/// otherwise every requested scope must be registered for the client.
fn granted_scope(body: &[u8], allowed: &[String]) -> Option<String> {
    let requested = form_field(body, "scope").unwrap_or_default();
    if requested.trim().is_empty() {
        return Some(allowed.join(" "));
    }
    let all_allowed = requested
        .split_whitespace()
        .all(|s| allowed.iter().any(|a| a == s));
    all_allowed.then(|| requested.trim().to_string())
}
