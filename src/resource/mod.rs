//! Resource server — bearer-token claims endpoint on two trust tiers.
//!
//! The same routes are served on two listeners: an open port with the
//! `None` client-certificate policy (bearer token only) and an mTLS port
//! with the `Required` policy (client certificate at the transport layer
//! and a bearer token on top).
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET` | `/api` | Echo the caller's token claims |
//!
//! # Modules
//!
//! - [`bearer`] — ES256 bearer-token verification middleware
//! - [`routes`] — axum handlers
//! - [`server`] — the two listeners and their lifecycle

pub mod bearer;
pub mod routes;
pub mod server;

pub use bearer::TokenVerifier;
pub use routes::resource_routes;
pub use server::ResourceServer;
