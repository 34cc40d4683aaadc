//! Listener accept loop.
//!
//! Each listener owns its TCP accept loop; accepted connections are handled
//! concurrently and independently. After the TLS handshake, the leaf peer
//! certificate (if any) is attached to the connection's requests as a
//! [`PeerCertificate`] extension, which is the only path by which
//! certificate material reaches the secret parser.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{Extension, Router};
use hyper_util::rt::{TokioExecutor, TokioIo};
use hyper_util::service::TowerToHyperService;
use rustls::ServerConfig;
use rustls::pki_types::CertificateDer;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio_rustls::TlsAcceptor;
use tracing::{debug, info, warn};

use super::policy::ClientCertPolicy;
use crate::fault::{FaultReporter, spawn_reported};
use crate::{Error, Result};

/// One TLS listener: where it binds and what it demands of peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListenerEndpoint {
    /// Bind address.
    pub addr: SocketAddr,
    /// Client-certificate posture.
    pub policy: ClientCertPolicy,
}

/// The leaf certificate the peer presented during the TLS handshake.
///
/// `None` on listeners with the `None` policy and on `Optional` listeners
/// when the peer declined to present one.
#[derive(Debug, Clone)]
pub struct PeerCertificate(pub Option<CertificateDer<'static>>);

/// Run one listener until shutdown.
///
/// Binds `endpoint.addr`, then accepts connections forever: TLS handshake,
/// peer-certificate extraction, and per-connection HTTP serving of `router`.
/// Handshake failures (including certificate-less peers under the
/// `Required` policy) drop the connection before any HTTP processing.
///
/// # Errors
///
/// Returns an error only if the address cannot be bound.
pub async fn serve(
    endpoint: ListenerEndpoint,
    tls_config: Arc<ServerConfig>,
    router: Router,
    reporter: FaultReporter,
    mut shutdown: broadcast::Receiver<()>,
) -> Result<()> {
    let listener = TcpListener::bind(endpoint.addr)
        .await
        .map_err(|e| Error::Config(format!("Cannot bind {}: {e}", endpoint.addr)))?;
    let local_addr = listener.local_addr()?;
    let acceptor = TlsAcceptor::from(tls_config);

    info!(addr = %local_addr, policy = ?endpoint.policy, "Listener started");

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                let (stream, peer_addr) = match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        warn!(addr = %local_addr, error = %e, "Accept failed");
                        continue;
                    }
                };

                let acceptor = acceptor.clone();
                let router = router.clone();
                spawn_reported(&reporter, "connection", async move {
                    handle_connection(acceptor, stream, peer_addr, router).await
                });
            }
            _ = shutdown.recv() => {
                info!(addr = %local_addr, "Listener shutting down");
                break;
            }
        }
    }

    Ok(())
}

/// Broadcast a shutdown on Ctrl+C or SIGTERM.
pub async fn shutdown_signal(shutdown_tx: broadcast::Sender<()>) {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    info!("Shutdown signal received");
    let _ = shutdown_tx.send(());
}

/// Handshake + serve a single connection.
async fn handle_connection(
    acceptor: TlsAcceptor,
    stream: TcpStream,
    peer_addr: SocketAddr,
    router: Router,
) -> Result<()> {
    let tls_stream = match acceptor.accept(stream).await {
        Ok(s) => s,
        Err(e) => {
            // Required-policy peers without a certificate land here; the
            // rejection stays at the transport layer.
            debug!(peer = %peer_addr, error = %e, "TLS handshake failed");
            return Ok(());
        }
    };

    let peer_cert = tls_stream
        .get_ref()
        .1
        .peer_certificates()
        .and_then(|certs| certs.first().cloned());
    debug!(peer = %peer_addr, has_cert = peer_cert.is_some(), "TLS handshake complete");

    let service = TowerToHyperService::new(router.layer(Extension(PeerCertificate(peer_cert))));

    if let Err(e) = hyper_util::server::conn::auto::Builder::new(TokioExecutor::new())
        .serve_connection(TokioIo::new(tls_stream), service)
        .await
    {
        // Abrupt client disconnects are routine, not faults.
        debug!(peer = %peer_addr, error = %e, "Connection closed with error");
    }

    Ok(())
}
