//! Authorization server lifecycle.

use std::sync::Arc;

use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;
use tracing::info;

use super::registry::{ClientRegistry, RegisteredClient};
use super::routes::{AuthServerState, auth_routes};
use super::token::TokenSigner;
use crate::config::Config;
use crate::fault::FaultReporter;
use crate::identity::{PemDirStore, ServerIdentityProvider, load_certs};
use crate::listener::{self, ClientCertPolicy, ListenerEndpoint};
use crate::secrets::InputLengthRestrictions;
use crate::{Error, Result};

/// The authorization server: one `Optional`-policy listener serving the
/// token endpoint and discovery document.
pub struct AuthServer {
    config: Config,
    reporter: FaultReporter,
}

impl AuthServer {
    /// Create a server from configuration.
    pub fn new(config: Config, reporter: FaultReporter) -> Self {
        Self { config, reporter }
    }

    /// Run until a shutdown signal arrives.
    ///
    /// # Errors
    ///
    /// Returns an error when the identity, trust roots, or client registry
    /// cannot be loaded, or the listener cannot bind.
    pub async fn run(self) -> Result<()> {
        let thumbprint = self.config.identity_thumbprint()?;
        let store = PemDirStore::new(&self.config.identity.store_dir);
        let identity = Arc::new(store.load_by_thumbprint(&thumbprint)?);
        info!(thumbprint = %identity.thumbprint, "Loaded server identity");

        let client_roots = load_certs(&self.config.trust.ca_cert)?;

        let registry = ClientRegistry::new(self.config.auth_server.clients.iter().map(|c| {
            RegisteredClient {
                client_id: c.client_id.clone(),
                scopes: c.scopes.clone(),
                secrets: c.secrets.clone(),
            }
        }));
        if registry.is_empty() {
            return Err(Error::Config(
                "auth_server.clients must register at least one client".to_string(),
            ));
        }
        info!(clients = registry.len(), "Client registry loaded");

        let signer = TokenSigner::new(
            &identity,
            self.config.auth_server.issuer.clone(),
            self.config.auth_server.token_ttl,
        )?;

        let state = Arc::new(AuthServerState {
            registry,
            signer,
            restrictions: InputLengthRestrictions {
                max_client_id: self.config.auth_server.max_client_id_length,
            },
            issuer: self.config.auth_server.issuer.clone(),
        });
        let router = auth_routes(state).layer(TraceLayer::new_for_http());

        // A missing client certificate must surface as an invalid_client
        // response, not a handshake failure, so the token listener asks for
        // a certificate without demanding one.
        let endpoint = ListenerEndpoint {
            addr: self.config.auth_addr()?,
            policy: ClientCertPolicy::Optional,
        };
        let tls_config = Arc::new(listener::build_server_config(
            &identity,
            &client_roots,
            endpoint.policy,
        )?);

        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
        tokio::spawn(listener::shutdown_signal(shutdown_tx));

        listener::serve(endpoint, tls_config, router, self.reporter, shutdown_rx).await
    }
}
