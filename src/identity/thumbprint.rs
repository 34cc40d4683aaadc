//! Certificate thumbprints.
//!
//! A thumbprint is the SHA-1 digest of a certificate's DER encoding,
//! rendered as 40 lowercase hex characters. It identifies a certificate in
//! the identity store and in the client registry; it is not a
//! collision-resistant security boundary on its own — the TLS layer has
//! already verified that the peer holds the matching private key.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use sha1::{Digest, Sha1};

use crate::{Error, Result};

/// Hex length of a SHA-1 thumbprint.
const THUMBPRINT_LEN: usize = 40;

/// A 40-hex-char SHA-1 certificate digest, always lowercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Thumbprint(String);

impl Thumbprint {
    /// Compute the thumbprint of a DER-encoded certificate.
    pub fn from_der(der: &[u8]) -> Self {
        Self(hex::encode(Sha1::digest(der)))
    }

    /// The lowercase hex representation.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for Thumbprint {
    type Err = Error;

    /// Parse a thumbprint, case-insensitively.
    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if trimmed.len() != THUMBPRINT_LEN {
            return Err(Error::Config(format!(
                "Thumbprint must be {THUMBPRINT_LEN} hex characters, got {}",
                trimmed.len()
            )));
        }
        if !trimmed.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::Config(
                "Thumbprint contains non-hex characters".to_string(),
            ));
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }
}

impl TryFrom<String> for Thumbprint {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Thumbprint> for String {
    fn from(t: Thumbprint) -> Self {
        t.0
    }
}

impl fmt::Display for Thumbprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_der_is_40_lowercase_hex() {
        let tp = Thumbprint::from_der(b"some certificate bytes");
        assert_eq!(tp.as_str().len(), 40);
        assert!(tp.as_str().chars().all(|c| c.is_ascii_hexdigit()));
        assert_eq!(tp.as_str(), tp.as_str().to_ascii_lowercase());
    }

    #[test]
    fn parse_is_case_insensitive() {
        let upper: Thumbprint = "6710526CDF6A07FE918863DC042A4C5581BB0579".parse().unwrap();
        let lower: Thumbprint = "6710526cdf6a07fe918863dc042a4c5581bb0579".parse().unwrap();
        assert_eq!(upper, lower);
    }

    #[test]
    fn parse_rejects_wrong_length() {
        assert!("abc123".parse::<Thumbprint>().is_err());
        assert!("".parse::<Thumbprint>().is_err());
    }

    #[test]
    fn parse_rejects_non_hex() {
        let bad = "g710526cdf6a07fe918863dc042a4c5581bb0579";
        assert!(bad.parse::<Thumbprint>().is_err());
    }

    #[test]
    fn parse_trims_whitespace() {
        let tp: Thumbprint = "  6710526cdf6a07fe918863dc042a4c5581bb0579 ".parse().unwrap();
        assert_eq!(tp.as_str(), "6710526cdf6a07fe918863dc042a4c5581bb0579");
    }

    #[test]
    fn identical_der_gives_identical_thumbprint() {
        assert_eq!(Thumbprint::from_der(b"der"), Thumbprint::from_der(b"der"));
        assert_ne!(Thumbprint::from_der(b"der"), Thumbprint::from_der(b"other"));
    }
}
