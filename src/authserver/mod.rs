//! Authorization server — the OAuth2 client-credentials token endpoint.
//!
//! Runs on a single `Optional`-policy TLS listener so that a missing client
//! certificate becomes a protocol-level `invalid_client` rather than a
//! transport failure.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/connect/token` | Client-credentials grant, mTLS certificate as the secret |
//! | `GET`  | `/.well-known/openid-configuration` | Discovery document |
//!
//! # Modules
//!
//! - [`registry`] — registered clients and their secrets
//! - [`token`] — ES256 token mint backed by the server identity key
//! - [`routes`] — axum handlers
//! - [`server`] — listener wiring and lifecycle

pub mod registry;
pub mod routes;
pub mod server;
pub mod token;

pub use registry::{ClientRegistry, RegisteredClient};
pub use routes::{AuthServerState, auth_routes};
pub use server::AuthServer;
pub use token::{IssuedToken, TokenClaims, TokenSigner};
