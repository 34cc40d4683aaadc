//! End-to-end tests over real TLS sockets: listener policies, the token
//! endpoint, and the bearer-protected resource.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{TestCa, TestLeaf, free_port, wait_listening};
use rustls::pki_types::CertificateDer;
use tokio::sync::broadcast;

use certgrant::authserver::{
    AuthServerState, ClientRegistry, RegisteredClient, TokenClaims, TokenSigner, auth_routes,
};
use certgrant::client::{ClientPhase, ResourceClient};
use certgrant::config::ClientConfig;
use certgrant::fault::FaultReporter;
use certgrant::identity::{PemDirStore, ServerIdentity, ServerIdentityProvider};
use certgrant::listener::{ClientCertPolicy, ListenerEndpoint, build_server_config, serve};
use certgrant::resource::{TokenVerifier, resource_routes};
use certgrant::secrets::{InputLengthRestrictions, RegisteredSecret};

/// Everything a test scenario needs: a CA, a loaded server identity, and a
/// registered client certificate.
struct TestEnv {
    ca: TestCa,
    identity: Arc<ServerIdentity>,
    client_leaf: TestLeaf,
    roots: Vec<CertificateDer<'static>>,
    shutdown_tx: broadcast::Sender<()>,
    // Keeps the identity store directory alive.
    _store_dir: tempfile::TempDir,
}

impl TestEnv {
    fn new() -> Self {
        let ca = TestCa::new();

        let store_dir = tempfile::tempdir().unwrap();
        let server_leaf = ca.issue("localhost");
        server_leaf.write_to(store_dir.path(), "server");
        let thumbprint = server_leaf.thumbprint();
        let identity = Arc::new(
            PemDirStore::new(store_dir.path())
                .load_by_thumbprint(&thumbprint)
                .unwrap(),
        );

        let client_leaf = ca.issue("client.test");
        let roots = vec![ca.der()];
        let (shutdown_tx, _) = broadcast::channel(1);

        Self {
            ca,
            identity,
            client_leaf,
            roots,
            shutdown_tx,
            _store_dir: store_dir,
        }
    }

    fn issuer(&self, auth_port: u16) -> String {
        format!("https://localhost:{auth_port}")
    }

    /// Spawn the token endpoint on an `Optional`-policy listener.
    async fn spawn_auth(&self, port: u16) {
        let state = Arc::new(AuthServerState {
            registry: ClientRegistry::new([RegisteredClient {
                client_id: "client".to_string(),
                scopes: vec!["api1".to_string(), "api2".to_string()],
                secrets: vec![RegisteredSecret::thumbprint(
                    self.client_leaf.thumbprint().as_str(),
                )],
            }]),
            signer: TokenSigner::new(
                &self.identity,
                self.issuer(port),
                Duration::from_secs(3600),
            )
            .unwrap(),
            restrictions: InputLengthRestrictions::default(),
            issuer: self.issuer(port),
        });
        self.spawn_listener(port, ClientCertPolicy::Optional, auth_routes(state))
            .await;
    }

    /// Spawn the resource routes on a listener with the given policy.
    async fn spawn_resource(&self, port: u16, policy: ClientCertPolicy, auth_port: u16) {
        let verifier = Arc::new(
            TokenVerifier::new(&self.identity.public_key_pem, "api1", &self.issuer(auth_port))
                .unwrap(),
        );
        self.spawn_listener(port, policy, resource_routes(verifier))
            .await;
    }

    async fn spawn_listener(&self, port: u16, policy: ClientCertPolicy, router: axum::Router) {
        let endpoint = ListenerEndpoint {
            addr: format!("127.0.0.1:{port}").parse().unwrap(),
            policy,
        };
        let tls = Arc::new(build_server_config(&self.identity, &self.roots, policy).unwrap());
        tokio::spawn(serve(
            endpoint,
            tls,
            router,
            FaultReporter::default(),
            self.shutdown_tx.subscribe(),
        ));
        wait_listening(port).await;
    }

    /// HTTP client trusting the test CA, optionally presenting the
    /// registered client certificate.
    fn http_client(&self, with_cert: bool) -> reqwest::Client {
        let mut builder = reqwest::Client::builder()
            .tls_certs_only([reqwest::Certificate::from_pem(self.ca.cert_pem().as_bytes()).unwrap()])
            .timeout(Duration::from_secs(5));
        if with_cert {
            let identity =
                reqwest::Identity::from_pem(&self.client_leaf.identity_pem()).unwrap();
            builder = builder.identity(identity);
        }
        builder.build().unwrap()
    }
}

async fn request_token(client: &reqwest::Client, auth_port: u16) -> reqwest::Response {
    client
        .post(format!("https://localhost:{auth_port}/connect/token"))
        .form(&[
            ("grant_type", "client_credentials"),
            ("client_id", "client"),
            ("scope", "api1"),
        ])
        .send()
        .await
        .unwrap()
}

#[tokio::test]
async fn required_listener_rejects_certless_peers_before_http() {
    let env = TestEnv::new();
    let auth_port = free_port();
    let mtls_port = free_port();
    env.spawn_resource(mtls_port, ClientCertPolicy::Required, auth_port)
        .await;

    // No client certificate: the handshake fails, so there is no HTTP
    // status to observe, only a transport error.
    let result = env
        .http_client(false)
        .get(format!("https://localhost:{mtls_port}/api"))
        .send()
        .await;
    assert!(result.is_err());

    // The same peer with a certificate gets through to HTTP (401, since it
    // carries no token).
    let response = env
        .http_client(true)
        .get(format!("https://localhost:{mtls_port}/api"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn optional_listener_turns_a_missing_certificate_into_invalid_client() {
    let env = TestEnv::new();
    let auth_port = free_port();
    env.spawn_auth(auth_port).await;

    let response = request_token(&env.http_client(false), auth_port).await;
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "invalid_client");
}

#[tokio::test]
async fn unregistered_certificate_is_indistinguishable_from_none() {
    let env = TestEnv::new();
    let auth_port = free_port();
    env.spawn_auth(auth_port).await;

    // A certificate the CA signed but nobody registered.
    let stranger = env.ca.issue("stranger.test");
    let client = reqwest::Client::builder()
        .tls_certs_only([
            reqwest::Certificate::from_pem(env.ca.cert_pem().as_bytes()).unwrap(),
        ])
        .identity(reqwest::Identity::from_pem(&stranger.identity_pem()).unwrap())
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap();

    let response = request_token(&client, auth_port).await;
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

    let body: serde_json::Value = response.json().await.unwrap();
    assert_eq!(body["error"], "invalid_client");
}

#[tokio::test]
async fn full_grant_flow_discovery_token_and_both_resource_tiers() {
    let env = TestEnv::new();
    let auth_port = free_port();
    let open_port = free_port();
    let mtls_port = free_port();
    env.spawn_auth(auth_port).await;
    env.spawn_resource(open_port, ClientCertPolicy::None, auth_port)
        .await;
    env.spawn_resource(mtls_port, ClientCertPolicy::Required, auth_port)
        .await;

    let client = env.http_client(true);

    // Discovery
    let discovery: serde_json::Value = client
        .get(format!(
            "https://localhost:{auth_port}/.well-known/openid-configuration"
        ))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    let token_endpoint = discovery["token_endpoint"].as_str().unwrap().to_string();
    assert_eq!(
        token_endpoint,
        format!("https://localhost:{auth_port}/connect/token")
    );

    // Token
    let token_response = client
        .post(&token_endpoint)
        .form(&[
            ("grant_type", "client_credentials"),
            ("client_id", "client"),
            ("scope", "api1"),
        ])
        .send()
        .await
        .unwrap();
    assert_eq!(token_response.status(), reqwest::StatusCode::OK);
    let token: serde_json::Value = token_response.json().await.unwrap();
    let access_token = token["access_token"].as_str().unwrap().to_string();
    assert_eq!(token["token_type"], "Bearer");

    // The same token works on both resource tiers.
    for port in [open_port, mtls_port] {
        let response = client
            .get(format!("https://localhost:{port}/api"))
            .bearer_auth(&access_token)
            .send()
            .await
            .unwrap();
        assert_eq!(response.status(), reqwest::StatusCode::OK);

        let claims: serde_json::Value = response.json().await.unwrap();
        let has_client_id = claims
            .as_array()
            .unwrap()
            .iter()
            .any(|c| c["type"] == "client_id" && c["value"] == "client");
        assert!(has_client_id);
    }
}

#[tokio::test]
async fn empty_scope_token_from_a_multi_scope_client_reaches_the_resource() {
    let env = TestEnv::new();
    let auth_port = free_port();
    let open_port = free_port();
    env.spawn_auth(auth_port).await;
    env.spawn_resource(open_port, ClientCertPolicy::None, auth_port)
        .await;

    let client = env.http_client(true);

    // No scope field: the grant covers everything the client is registered
    // for, and the token carries one audience per granted scope.
    let token_response = client
        .post(format!("https://localhost:{auth_port}/connect/token"))
        .form(&[("grant_type", "client_credentials"), ("client_id", "client")])
        .send()
        .await
        .unwrap();
    assert_eq!(token_response.status(), reqwest::StatusCode::OK);
    let token: serde_json::Value = token_response.json().await.unwrap();
    assert_eq!(token["scope"], "api1 api2");

    let response = client
        .get(format!("https://localhost:{open_port}/api"))
        .bearer_auth(token["access_token"].as_str().unwrap())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::OK);
}

#[tokio::test]
async fn expired_token_is_unauthorized() {
    let env = TestEnv::new();
    let auth_port = free_port();
    let open_port = free_port();
    env.spawn_resource(open_port, ClientCertPolicy::None, auth_port)
        .await;

    // Sign a token well past its expiry with the real identity key, far
    // enough back to clear any validation leeway.
    let now = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs();
    let claims = TokenClaims {
        iss: env.issuer(auth_port),
        sub: "client".to_string(),
        client_id: "client".to_string(),
        aud: vec!["api1".to_string()],
        scope: "api1".to_string(),
        jti: "stale".to_string(),
        iat: now - 7200,
        exp: now - 3600,
    };
    let key = jsonwebtoken::EncodingKey::from_ec_pem(env.identity.key_pem.as_bytes()).unwrap();
    let stale = jsonwebtoken::encode(
        &jsonwebtoken::Header::new(jsonwebtoken::Algorithm::ES256),
        &claims,
        &key,
    )
    .unwrap();

    let response = env
        .http_client(false)
        .get(format!("https://localhost:{open_port}/api"))
        .bearer_auth(stale)
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()["www-authenticate"], "Bearer");
}

/// Client configuration pointing at the spawned listeners, with the client
/// leaf and CA written out where `ResourceClient::new` expects files.
fn client_config(env: &TestEnv, dir: &std::path::Path, auth_port: u16, resource_port: u16) -> ClientConfig {
    env.client_leaf.write_to(dir, "client");
    std::fs::write(dir.join("ca.crt"), env.ca.cert_pem()).unwrap();

    ClientConfig {
        authority: format!("https://localhost:{auth_port}"),
        resource_url: format!("https://localhost:{resource_port}"),
        client_id: "client".to_string(),
        scope: "api1".to_string(),
        cert: dir.join("client.crt"),
        key: dir.join("client.key"),
        ca_cert: dir.join("ca.crt"),
        calls: 3,
        request_interval: Duration::from_millis(10),
        http_timeout: Duration::from_secs(5),
    }
}

#[tokio::test]
async fn resource_client_completes_a_paced_run() {
    let env = TestEnv::new();
    let auth_port = free_port();
    let open_port = free_port();
    env.spawn_auth(auth_port).await;
    env.spawn_resource(open_port, ClientCertPolicy::None, auth_port)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let mut client =
        ResourceClient::new(client_config(&env, dir.path(), auth_port, open_port)).unwrap();

    let report = client.run().await.unwrap();
    assert_eq!(report.calls_made, 3);
    assert_eq!(client.phase(), ClientPhase::Idle);
}

#[tokio::test]
async fn resource_client_fails_hard_when_the_resource_is_down() {
    let env = TestEnv::new();
    let auth_port = free_port();
    // Nothing ever listens on this port.
    let dead_port = free_port();
    env.spawn_auth(auth_port).await;

    let dir = tempfile::tempdir().unwrap();
    let mut client =
        ResourceClient::new(client_config(&env, dir.path(), auth_port, dead_port)).unwrap();

    assert!(client.run().await.is_err());
    assert_eq!(client.phase(), ClientPhase::Failed);
}

#[tokio::test]
async fn resource_without_a_token_is_unauthorized_with_a_challenge() {
    let env = TestEnv::new();
    let auth_port = free_port();
    let open_port = free_port();
    env.spawn_resource(open_port, ClientCertPolicy::None, auth_port)
        .await;

    let response = env
        .http_client(false)
        .get(format!("https://localhost:{open_port}/api"))
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);
    assert_eq!(response.headers()["www-authenticate"], "Bearer");
}
