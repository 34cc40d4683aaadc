//! TLS listeners with per-port client-certificate policy.
//!
//! Each protocol phase runs on its own listener with its own trust posture:
//!
//! | Policy     | Handshake without client cert | Used for                         |
//! |------------|-------------------------------|----------------------------------|
//! | `None`     | succeeds, no cert requested   | bearer-only / discovery traffic  |
//! | `Optional` | succeeds, cert requested      | the token endpoint               |
//! | `Required` | fails at the TLS layer        | mTLS-only resource endpoints     |
//!
//! Under `Required`, a peer without a certificate never reaches HTTP
//! handling — the rejection is observable only as a connection failure.
//!
//! # Modules
//!
//! - [`policy`] — the closed `ClientCertPolicy` enum
//! - [`tls`] — rustls server config pinned to the server identity, TLS 1.3 only
//! - [`serve`] — per-listener accept loop injecting the peer certificate

pub mod policy;
pub mod serve;
pub mod tls;

pub use policy::ClientCertPolicy;
pub use serve::{ListenerEndpoint, PeerCertificate, serve, shutdown_signal};
pub use tls::build_server_config;
