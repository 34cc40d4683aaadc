//! Resource endpoint handlers.

use std::sync::Arc;

use axum::{
    Json, Router,
    extract::Extension,
    middleware,
    routing::get,
};
use serde::Serialize;

use super::bearer::{TokenVerifier, require_bearer};
use crate::authserver::TokenClaims;

/// One claim of the caller's token, echoed back.
#[derive(Debug, Serialize, PartialEq, Eq)]
#[cfg_attr(test, derive(serde::Deserialize))]
pub struct ClaimView {
    /// Claim type.
    #[serde(rename = "type")]
    pub kind: String,
    /// Claim value.
    pub value: String,
}

/// Build the resource routes with bearer verification applied.
pub fn resource_routes(verifier: Arc<TokenVerifier>) -> Router {
    Router::new()
        .route("/api", get(claims_endpoint))
        .layer(middleware::from_fn_with_state(verifier, require_bearer))
}

/// `GET /api` — list the claims of the presented token.
async fn claims_endpoint(Extension(claims): Extension<TokenClaims>) -> Json<Vec<ClaimView>> {
    Json(claim_views(&claims))
}

fn claim_views(claims: &TokenClaims) -> Vec<ClaimView> {
    let mut views = vec![
        view("iss", &claims.iss),
        view("sub", &claims.sub),
        view("client_id", &claims.client_id),
        view("jti", &claims.jti),
        view("iat", &claims.iat.to_string()),
        view("exp", &claims.exp.to_string()),
    ];
    for aud in &claims.aud {
        views.push(view("aud", aud));
    }
    for scope in claims.scope.split_whitespace() {
        views.push(view("scope", scope));
    }
    views
}

fn view(kind: &str, value: &str) -> ClaimView {
    ClaimView {
        kind: kind.to_string(),
        value: value.to_string(),
    }
}
