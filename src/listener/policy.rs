//! Client-certificate trust policy.

use serde::{Deserialize, Serialize};

/// What a listener demands of the peer during the TLS handshake.
///
/// A closed, three-valued policy: configuration data, not behavior. The
/// mapping onto the TLS stack lives in [`crate::listener::tls`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClientCertPolicy {
    /// No client certificate is requested.
    #[default]
    None,
    /// A certificate is requested but its absence does not fail the
    /// handshake; a missing certificate becomes a protocol-level
    /// `invalid_client` instead of a transport-level failure, keeping the
    /// error channel uniform.
    Optional,
    /// The handshake fails outright without a valid client certificate.
    Required,
}

impl ClientCertPolicy {
    /// True when this policy asks the peer for a certificate at all.
    pub fn requests_certificate(self) -> bool {
        !matches!(self, Self::None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_none_skips_the_certificate_request() {
        assert!(!ClientCertPolicy::None.requests_certificate());
        assert!(ClientCertPolicy::Optional.requests_certificate());
        assert!(ClientCertPolicy::Required.requests_certificate());
    }

    #[test]
    fn policy_deserialises_from_snake_case() {
        let p: ClientCertPolicy = serde_yaml::from_str("required").unwrap();
        assert_eq!(p, ClientCertPolicy::Required);
        let p: ClientCertPolicy = serde_yaml::from_str("optional").unwrap();
        assert_eq!(p, ClientCertPolicy::Optional);
        let p: ClientCertPolicy = serde_yaml::from_str("none").unwrap();
        assert_eq!(p, ClientCertPolicy::None);
    }
}
