//! rustls server configuration.
//!
//! Every listener is pinned to the process's [`ServerIdentity`] and to
//! TLS 1.3 as the only permitted protocol version. The client-certificate
//! posture comes from [`ClientCertPolicy`].

use std::sync::Arc;

use rustls::ServerConfig;
use rustls::pki_types::CertificateDer;
use rustls::server::WebPkiClientVerifier;
use tracing::debug;

use super::policy::ClientCertPolicy;
use crate::identity::ServerIdentity;
use crate::{Error, Result};

/// Build a `rustls::ServerConfig` for one listener.
///
/// `client_roots` are the CA certificates trusted to sign client
/// certificates; they are required for `Optional` and `Required` policies
/// and ignored for `None`.
///
/// # Errors
///
/// Returns an error if the verifier cannot be built (e.g. no client roots
/// for a policy that requests certificates) or the identity's cert/key pair
/// mismatches.
pub fn build_server_config(
    identity: &ServerIdentity,
    client_roots: &[CertificateDer<'static>],
    policy: ClientCertPolicy,
) -> Result<ServerConfig> {
    // TLS 1.3 only; no legacy protocol versions.
    let builder = ServerConfig::builder_with_protocol_versions(&[&rustls::version::TLS13]);

    let builder = if policy.requests_certificate() {
        let mut root_store = rustls::RootCertStore::empty();
        for cert in client_roots {
            root_store
                .add(cert.clone())
                .map_err(|e| Error::Tls(format!("Failed to add CA cert to trust store: {e}")))?;
        }
        if root_store.is_empty() {
            return Err(Error::Tls(format!(
                "Policy {policy:?} requests client certificates but no trust roots are configured"
            )));
        }

        let verifier_builder = WebPkiClientVerifier::builder(Arc::new(root_store));
        let verifier = match policy {
            ClientCertPolicy::Required => verifier_builder
                .build()
                .map_err(|e| Error::Tls(format!("Failed to build client verifier: {e}")))?,
            ClientCertPolicy::Optional => verifier_builder
                .allow_unauthenticated()
                .build()
                .map_err(|e| Error::Tls(format!("Failed to build client verifier: {e}")))?,
            ClientCertPolicy::None => unreachable!("None never requests a certificate"),
        };
        builder.with_client_cert_verifier(verifier)
    } else {
        builder.with_no_client_auth()
    };

    let mut tls_cfg = builder
        .with_single_cert(identity.cert_chain.clone(), identity.key.clone_key())
        .map_err(|e| Error::Tls(format!("TLS config error (cert/key mismatch?): {e}")))?;

    // Prefer HTTP/2, fall back to HTTP/1.1
    tls_cfg.alpn_protocols = vec![b"h2".to_vec(), b"http/1.1".to_vec()];

    debug!(
        thumbprint = %identity.thumbprint,
        policy = ?policy,
        "TLS listener config built"
    );

    Ok(tls_cfg)
}
