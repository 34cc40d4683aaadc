//! Certificate secret parser.
//!
//! Maps an inbound form-encoded HTTPS request to a [`ParseOutcome`]: either
//! the peer certificate paired with the claimed `client_id`, or `Absent`.
//! Each early-exit condition is logged and returned as an ordinary value —
//! the parser authorizes nothing and throws nothing.

use rustls::pki_types::CertificateDer;
use tracing::{debug, error};

use super::types::{ParseOutcome, ParsedCredential, ParsedSecret};

/// Content type required for token requests.
pub const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Upper bounds on attacker-controlled request fields.
///
/// The `client_id` cap protects against unbounded-memory and log-injection
/// attacks via oversized identifiers.
#[derive(Debug, Clone, Copy)]
pub struct InputLengthRestrictions {
    /// Maximum accepted `client_id` length in bytes.
    pub max_client_id: usize,
}

impl Default for InputLengthRestrictions {
    fn default() -> Self {
        Self { max_client_id: 100 }
    }
}

/// Extract a certificate credential from a request.
///
/// Pure request → result mapping; the ordered early exits are:
///
/// 1. no peer certificate on the connection
/// 2. content type is not a form
/// 3. body contains no parseable form fields
/// 4. `client_id` missing or empty/whitespace
/// 5. `client_id` exceeds the configured maximum (logged at error level)
///
/// Every exit yields [`ParseOutcome::Absent`]; callers translate that into a
/// protocol-level rejection without distinguishing the cause externally.
pub fn parse(
    peer_certificate: Option<&CertificateDer<'static>>,
    content_type: Option<&str>,
    body: &[u8],
    restrictions: InputLengthRestrictions,
) -> ParseOutcome {
    debug!("Start parsing for X.509 certificate secret");

    let Some(certificate) = peer_certificate else {
        debug!("No client certificate on the connection");
        return ParseOutcome::Absent;
    };

    if !is_form_content_type(content_type) {
        debug!(content_type = ?content_type, "Content type is not a form");
        return ParseOutcome::Absent;
    }

    let mut fields = url::form_urlencoded::parse(body).peekable();
    if fields.peek().is_none() {
        debug!("Request body has no form fields");
        return ParseOutcome::Absent;
    }

    let Some(client_id) = fields
        .find(|(name, _)| name == "client_id")
        .map(|(_, value)| value.into_owned())
    else {
        debug!("No client_id in form body");
        return ParseOutcome::Absent;
    };

    if client_id.trim().is_empty() {
        debug!("client_id is empty or whitespace");
        return ParseOutcome::Absent;
    }

    if client_id.len() > restrictions.max_client_id {
        error!(
            length = client_id.len(),
            max = restrictions.max_client_id,
            "client_id exceeds maximum length"
        );
        return ParseOutcome::Absent;
    }

    ParseOutcome::Present(ParsedSecret {
        client_id,
        credential: ParsedCredential::X509Certificate(certificate.clone()),
    })
}

/// True when the content type (ignoring parameters such as charset) is a
/// URL-encoded form.
fn is_form_content_type(content_type: Option<&str>) -> bool {
    content_type
        .map(|ct| ct.split(';').next().unwrap_or("").trim())
        .is_some_and(|ct| ct.eq_ignore_ascii_case(FORM_CONTENT_TYPE))
}
