//! Shared test fixtures: a throwaway CA, leaf certificates, and PEM
//! identity stores.

// Each test binary uses a different subset of the fixtures.
#![allow(dead_code)]

use std::net::TcpListener;
use std::path::Path;
use std::time::Duration;

use rcgen::{
    BasicConstraints, CertificateParams, CertifiedIssuer, DistinguishedName, DnType, IsCa,
    KeyPair,
};
use rustls::pki_types::CertificateDer;

use certgrant::identity::Thumbprint;

/// A self-signed CA that can issue client and server leaves.
pub struct TestCa {
    issuer: CertifiedIssuer<'static, KeyPair>,
}

/// One issued leaf certificate.
pub struct TestLeaf {
    pub cert_pem: String,
    pub key_pem: String,
    pub der: CertificateDer<'static>,
}

impl TestCa {
    pub fn new() -> Self {
        let key = KeyPair::generate().unwrap();
        let mut params = CertificateParams::default();
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, "certgrant test ca");
        params.distinguished_name = dn;
        params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        let issuer = CertifiedIssuer::self_signed(params, key).unwrap();
        Self { issuer }
    }

    pub fn cert_pem(&self) -> String {
        self.issuer.pem()
    }

    pub fn der(&self) -> CertificateDer<'static> {
        self.issuer.der().clone()
    }

    /// Issue a leaf with one DNS SAN.
    pub fn issue(&self, dns_name: &str) -> TestLeaf {
        let leaf_key = KeyPair::generate().unwrap();
        let params = CertificateParams::new(vec![dns_name.to_string()]).unwrap();
        let cert = params.signed_by(&leaf_key, &self.issuer).unwrap();
        TestLeaf {
            cert_pem: cert.pem(),
            key_pem: leaf_key.serialize_pem(),
            der: cert.der().clone(),
        }
    }
}

impl TestLeaf {
    pub fn thumbprint(&self) -> Thumbprint {
        Thumbprint::from_der(&self.der)
    }

    /// Certificate followed by key, the layout `reqwest::Identity` expects.
    pub fn identity_pem(&self) -> Vec<u8> {
        let mut pem = self.cert_pem.clone().into_bytes();
        pem.extend_from_slice(self.key_pem.as_bytes());
        pem
    }

    /// Write `<stem>.crt` / `<stem>.key` under `dir`.
    pub fn write_to(&self, dir: &Path, stem: &str) {
        std::fs::write(dir.join(format!("{stem}.crt")), &self.cert_pem).unwrap();
        std::fs::write(dir.join(format!("{stem}.key")), &self.key_pem).unwrap();
    }
}

/// Grab a free localhost port. Racy by nature, fine for tests.
pub fn free_port() -> u16 {
    TcpListener::bind("127.0.0.1:0")
        .unwrap()
        .local_addr()
        .unwrap()
        .port()
}

/// Wait until something accepts TCP connections on the port.
pub async fn wait_listening(port: u16) {
    for _ in 0..50 {
        if tokio::net::TcpStream::connect(("127.0.0.1", port))
            .await
            .is_ok()
        {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("nothing listening on port {port}");
}
