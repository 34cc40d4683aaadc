//! Resource client — discover, authenticate, then call the resource.
//!
//! A sequential machine client: it resolves the token endpoint from the
//! authority's discovery document, obtains one access token with the
//! client-credentials grant (its certificate presented during the TLS
//! handshake is the secret), then calls the resource a fixed number of
//! times with a self-imposed pause between calls. Any non-success response
//! is a hard failure; the token is never refreshed mid-loop, so an expiry
//! during the loop surfaces as a `401` failure.

use reqwest::StatusCode;
use serde::Deserialize;
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::{Error, Result};

/// What the client is currently doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientPhase {
    /// Fetching the discovery document.
    Discovering,
    /// Requesting an access token.
    Authenticating,
    /// Holding a token, about to start the call loop.
    Authenticated,
    /// Looping over resource calls.
    Calling,
    /// All calls completed.
    Idle,
    /// A step failed; the run is over.
    Failed,
}

/// Subset of the discovery document the client needs.
#[derive(Debug, Deserialize)]
struct Discovery {
    token_endpoint: String,
}

/// Successful token response.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

/// Outcome of a completed run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    /// Resource calls that returned success.
    pub calls_made: u32,
}

/// The paced sequential resource client.
pub struct ResourceClient {
    config: ClientConfig,
    http: reqwest::Client,
    phase: ClientPhase,
}

impl ResourceClient {
    /// Build a client with its certificate loaded and TLS pinned to the
    /// configured CA.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` when the certificate, key, or CA files are
    /// unreadable, and `Error::Http` when the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let mut identity_pem = std::fs::read(&config.cert).map_err(|e| {
            Error::Config(format!("Cannot read {}: {e}", config.cert.display()))
        })?;
        let key_pem = std::fs::read(&config.key).map_err(|e| {
            Error::Config(format!("Cannot read {}: {e}", config.key.display()))
        })?;
        identity_pem.extend_from_slice(&key_pem);
        let identity = reqwest::Identity::from_pem(&identity_pem)
            .map_err(|e| Error::Config(format!("Invalid client identity: {e}")))?;

        let ca_pem = std::fs::read(&config.ca_cert).map_err(|e| {
            Error::Config(format!("Cannot read {}: {e}", config.ca_cert.display()))
        })?;
        let ca = reqwest::Certificate::from_pem(&ca_pem)
            .map_err(|e| Error::Config(format!("Invalid CA certificate: {e}")))?;

        let http = reqwest::Client::builder()
            .identity(identity)
            .tls_certs_only([ca])
            .min_tls_version(reqwest::tls::Version::TLS_1_3)
            .timeout(config.http_timeout)
            .build()?;

        Ok(Self {
            config,
            http,
            phase: ClientPhase::Idle,
        })
    }

    /// Current phase. Transitions are logged at debug as they happen, so
    /// operators can follow a run in progress; after [`run`](Self::run)
    /// returns this is `Idle` or `Failed`.
    pub fn phase(&self) -> ClientPhase {
        self.phase
    }

    fn set_phase(&mut self, phase: ClientPhase) {
        debug!(?phase, "Client phase change");
        self.phase = phase;
    }

    /// Run the full discover → token → call-loop sequence.
    ///
    /// # Errors
    ///
    /// Fails on the first non-success response from any step; the error
    /// carries the status and response body.
    pub async fn run(&mut self) -> Result<RunReport> {
        let result = self.run_inner().await;
        self.set_phase(match result {
            Ok(_) => ClientPhase::Idle,
            Err(_) => ClientPhase::Failed,
        });
        result
    }

    async fn run_inner(&mut self) -> Result<RunReport> {
        self.set_phase(ClientPhase::Discovering);
        let token_endpoint = self.discover().await?;
        debug!(token_endpoint = %token_endpoint, "Discovery complete");

        self.set_phase(ClientPhase::Authenticating);
        let token = self.request_token(&token_endpoint).await?;
        self.set_phase(ClientPhase::Authenticated);
        info!(expires_in = token.expires_in, "Access token obtained");

        self.set_phase(ClientPhase::Calling);
        let url = format!("{}/api", self.config.resource_url.trim_end_matches('/'));
        for call in 1..=self.config.calls {
            self.call_resource(&url, &token.access_token, call).await?;
            tokio::time::sleep(self.config.request_interval).await;
        }

        info!(calls = self.config.calls, "Run complete");
        Ok(RunReport {
            calls_made: self.config.calls,
        })
    }

    /// Resolve the token endpoint from the discovery document.
    async fn discover(&self) -> Result<String> {
        let url = format!(
            "{}/.well-known/openid-configuration",
            self.config.authority.trim_end_matches('/')
        );
        let response = self.http.get(&url).send().await?;
        let discovery: Discovery = check_success("discovery", response)
            .await?
            .json()
            .await?;
        Ok(discovery.token_endpoint)
    }

    /// Obtain an access token with the client-credentials grant.
    async fn request_token(&self, token_endpoint: &str) -> Result<TokenResponse> {
        let response = self
            .http
            .post(token_endpoint)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.config.client_id.as_str()),
                ("scope", self.config.scope.as_str()),
            ])
            .send()
            .await?;
        Ok(check_success("token request", response).await?.json().await?)
    }

    /// One resource call.
    async fn call_resource(&self, url: &str, token: &str, call: u32) -> Result<()> {
        let response = self.http.get(url).bearer_auth(token).send().await?;
        let status = response.status();
        let response = check_success("resource call", response).await?;
        let body = response.text().await?;
        debug!(call, status = %status, bytes = body.len(), "Resource call succeeded");
        Ok(())
    }
}

/// Turn a non-success response into a hard failure carrying status + body.
async fn check_success(step: &str, response: reqwest::Response) -> Result<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(step_error(step, status, &body))
}

fn step_error(step: &str, status: StatusCode, body: &str) -> Error {
    Error::Token(format!("{step} failed with {status}: {body}"))
}
