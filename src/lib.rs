//! certgrant — mTLS client certificates as the OAuth2 client secret.
//!
//! A machine client identifies itself during the TLS handshake with an X.509
//! certificate. The authorization server extracts that certificate, matches
//! its thumbprint against the registered value for the claimed `client_id`
//! (constant-time), and issues a short-lived access token via the
//! client-credentials grant. A resource server then accepts the bearer token
//! over separately configured TLS listeners with their own client-certificate
//! policies.
//!
//! # Components
//!
//! - [`identity`] — server identity (certificate + key) loaded by thumbprint
//! - [`listener`] — TLS listeners with per-port client-certificate policy
//! - [`secrets`] — certificate secret parser and thumbprint validator
//! - [`authserver`] — token endpoint + discovery document
//! - [`resource`] — bearer-token claims endpoint on two trust tiers
//! - [`client`] — sequential resource client (discover → token → call loop)
//! - [`fault`] — injected reporting for unobserved background failures

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod authserver;
pub mod cli;
pub mod client;
pub mod config;
pub mod error;
pub mod fault;
pub mod identity;
pub mod listener;
pub mod resource;
pub mod secrets;

pub use error::{Error, Result};

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Setup tracing/logging
pub fn setup_tracing(level: &str, format: Option<&str>) -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::registry().with(filter);

    match format {
        Some("json") => {
            subscriber.with(fmt::layer().json()).init();
        }
        _ => {
            subscriber.with(fmt::layer()).init();
        }
    }

    Ok(())
}
