//! Resource server lifecycle — two listeners over one router.

use std::sync::Arc;

use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;
use tracing::info;

use super::bearer::TokenVerifier;
use super::routes::resource_routes;
use crate::config::Config;
use crate::fault::FaultReporter;
use crate::identity::{PemDirStore, ServerIdentityProvider, load_certs};
use crate::listener::{self, ClientCertPolicy, ListenerEndpoint};
use crate::Result;

/// The resource server: the claims endpoint on an open port and an
/// mTLS-only port.
pub struct ResourceServer {
    config: Config,
    reporter: FaultReporter,
}

impl ResourceServer {
    /// Create a server from configuration.
    pub fn new(config: Config, reporter: FaultReporter) -> Self {
        Self { config, reporter }
    }

    /// Run both listeners until a shutdown signal arrives.
    ///
    /// # Errors
    ///
    /// Returns an error when the identity or trust roots cannot be loaded,
    /// or either listener cannot bind.
    pub async fn run(self) -> Result<()> {
        let thumbprint = self.config.identity_thumbprint()?;
        let store = PemDirStore::new(&self.config.identity.store_dir);
        let identity = Arc::new(store.load_by_thumbprint(&thumbprint)?);
        info!(thumbprint = %identity.thumbprint, "Loaded server identity");

        let client_roots = load_certs(&self.config.trust.ca_cert)?;

        // Tokens are signed with the same identity the servers share, so the
        // certificate's public half is the verification key.
        let verifier = Arc::new(TokenVerifier::new(
            &identity.public_key_pem,
            &self.config.resource_server.audience,
            &self.config.resource_server.issuer,
        )?);
        let router = resource_routes(verifier).layer(TraceLayer::new_for_http());

        let open = ListenerEndpoint {
            addr: self.config.resource_open_addr()?,
            policy: ClientCertPolicy::None,
        };
        let mtls = ListenerEndpoint {
            addr: self.config.resource_mtls_addr()?,
            policy: ClientCertPolicy::Required,
        };

        let open_tls = Arc::new(listener::build_server_config(
            &identity,
            &client_roots,
            open.policy,
        )?);
        let mtls_tls = Arc::new(listener::build_server_config(
            &identity,
            &client_roots,
            mtls.policy,
        )?);

        let (shutdown_tx, _) = broadcast::channel(1);
        tokio::spawn(listener::shutdown_signal(shutdown_tx.clone()));

        // One listener failing to bind takes the whole server down; the
        // other listener then stops through the select in its accept loop.
        tokio::try_join!(
            listener::serve(
                open,
                open_tls,
                router.clone(),
                self.reporter.clone(),
                shutdown_tx.subscribe(),
            ),
            listener::serve(
                mtls,
                mtls_tls,
                router,
                self.reporter.clone(),
                shutdown_tx.subscribe(),
            ),
        )?;

        Ok(())
    }
}
