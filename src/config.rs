//! Configuration management

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Yaml},
};
use serde::{Deserialize, Serialize};

use crate::identity::Thumbprint;
use crate::secrets::RegisteredSecret;
use crate::{Error, Result};

/// Main configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    /// Server identity (certificate + key) selection
    pub identity: IdentityConfig,
    /// Trust roots for verifying client certificates
    pub trust: TrustConfig,
    /// Authorization server configuration
    pub auth_server: AuthServerConfig,
    /// Resource server configuration
    pub resource_server: ResourceServerConfig,
    /// Resource client configuration
    pub client: ClientConfig,
}

/// Which certificate the process serves (and signs tokens) with.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentityConfig {
    /// Directory of PEM `<stem>.crt` / `<stem>.key` pairs.
    pub store_dir: PathBuf,
    /// Thumbprint of the identity certificate (40 hex chars, any case).
    pub thumbprint: String,
}

impl Default for IdentityConfig {
    fn default() -> Self {
        Self {
            store_dir: PathBuf::from("certs"),
            thumbprint: String::new(),
        }
    }
}

/// CA certificates trusted to sign client certificates.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrustConfig {
    /// Path to the PEM-encoded CA certificate(s).
    pub ca_cert: PathBuf,
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            ca_cert: PathBuf::from("certs/ca.crt"),
        }
    }
}

/// Authorization server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthServerConfig {
    /// Bind host.
    pub host: String,
    /// Token endpoint port (`Optional` client-cert policy).
    pub port: u16,
    /// Issuer URL advertised in tokens and the discovery document.
    pub issuer: String,
    /// Lifetime of issued access tokens.
    #[serde(with = "humantime_serde")]
    pub token_ttl: Duration,
    /// Maximum accepted `client_id` length.
    pub max_client_id_length: usize,
    /// Registered clients.
    pub clients: Vec<RegisteredClientConfig>,
}

impl Default for AuthServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 5000,
            issuer: "https://localhost:5000".to_string(),
            token_ttl: Duration::from_secs(3600),
            max_client_id_length: 100,
            clients: Vec::new(),
        }
    }
}

/// One registered client.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct RegisteredClientConfig {
    /// OAuth2 client identifier.
    pub client_id: String,
    /// Scopes this client may be granted.
    pub scopes: Vec<String>,
    /// Registered secrets (several during certificate rotation).
    pub secrets: Vec<RegisteredSecret>,
}

/// Resource server settings — two listeners over the same routes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResourceServerConfig {
    /// Bind host.
    pub host: String,
    /// Port served with the `None` client-cert policy.
    pub open_port: u16,
    /// Port served with the `Required` client-cert policy.
    pub mtls_port: u16,
    /// Audience accepted in bearer tokens.
    pub audience: String,
    /// Issuer accepted in bearer tokens.
    pub issuer: String,
}

impl Default for ResourceServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            open_port: 5001,
            mtls_port: 5002,
            audience: "api1".to_string(),
            issuer: "https://localhost:5000".to_string(),
        }
    }
}

/// Resource client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Authorization server base URL (discovery lives under it).
    pub authority: String,
    /// Resource server base URL for the call loop.
    pub resource_url: String,
    /// Client identifier sent in the token request.
    pub client_id: String,
    /// Scope requested with the client-credentials grant.
    pub scope: String,
    /// PEM client certificate presented during TLS handshakes.
    pub cert: PathBuf,
    /// PEM private key for the client certificate.
    pub key: PathBuf,
    /// PEM CA bundle used to verify the servers.
    pub ca_cert: PathBuf,
    /// Number of resource calls to make.
    pub calls: u32,
    /// Pause after each successful call (self-imposed pacing).
    #[serde(with = "humantime_serde")]
    pub request_interval: Duration,
    /// Timeout applied to discovery, token, and resource requests.
    #[serde(with = "humantime_serde")]
    pub http_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            authority: "https://localhost:5000".to_string(),
            resource_url: "https://localhost:5001".to_string(),
            client_id: "client".to_string(),
            scope: "api1".to_string(),
            cert: PathBuf::from("certs/client.crt"),
            key: PathBuf::from("certs/client.key"),
            ca_cert: PathBuf::from("certs/ca.crt"),
            calls: 100,
            request_interval: Duration::from_millis(100),
            http_timeout: Duration::from_secs(10),
        }
    }
}

impl Config {
    /// Load configuration from an optional YAML file plus `CERTGRANT_*`
    /// environment variables (env wins).
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if the file or environment cannot be parsed,
    /// or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut figment = Figment::new();
        if let Some(path) = path {
            figment = figment.merge(Yaml::file(path));
        }
        let config: Self = figment
            .merge(Env::prefixed("CERTGRANT_").split("__"))
            .extract()
            .map_err(|e| Error::Config(format!("Failed to load configuration: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate cross-field invariants.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` when the identity thumbprint is malformed or
    /// two listeners bind the same (host, port).
    pub fn validate(&self) -> Result<()> {
        if !self.identity.thumbprint.is_empty() {
            let _: Thumbprint = self.identity.thumbprint.parse()?;
        }

        let endpoints = [
            (&self.auth_server.host, self.auth_server.port),
            (&self.resource_server.host, self.resource_server.open_port),
            (&self.resource_server.host, self.resource_server.mtls_port),
        ];
        for (i, a) in endpoints.iter().enumerate() {
            for b in endpoints.iter().skip(i + 1) {
                if a == b {
                    return Err(Error::Config(format!(
                        "Two listeners bind the same endpoint {}:{}",
                        a.0, a.1
                    )));
                }
            }
        }

        Ok(())
    }

    /// Parsed identity thumbprint.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if unset or malformed.
    pub fn identity_thumbprint(&self) -> Result<Thumbprint> {
        if self.identity.thumbprint.is_empty() {
            return Err(Error::Config(
                "identity.thumbprint is required".to_string(),
            ));
        }
        self.identity.thumbprint.parse()
    }

    /// Socket address of the token endpoint listener.
    pub fn auth_addr(&self) -> Result<SocketAddr> {
        socket_addr(&self.auth_server.host, self.auth_server.port)
    }

    /// Socket address of the open (`None` policy) resource listener.
    pub fn resource_open_addr(&self) -> Result<SocketAddr> {
        socket_addr(&self.resource_server.host, self.resource_server.open_port)
    }

    /// Socket address of the mTLS (`Required` policy) resource listener.
    pub fn resource_mtls_addr(&self) -> Result<SocketAddr> {
        socket_addr(&self.resource_server.host, self.resource_server.mtls_port)
    }
}

fn socket_addr(host: &str, port: u16) -> Result<SocketAddr> {
    let ip = host
        .parse()
        .map_err(|e| Error::Config(format!("Invalid host '{host}': {e}")))?;
    Ok(SocketAddr::new(ip, port))
}
