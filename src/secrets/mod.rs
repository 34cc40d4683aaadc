//! Certificate secret extraction and validation.
//!
//! The authentication pipeline for the token endpoint:
//!
//! ```text
//! TLS connection (Optional policy — cert requested, handshake never fails on absence)
//!   → parser::parse        extracts the peer certificate + claimed client_id
//!   → ClientRegistry       looks up the registered secrets for that client_id
//!   → validator::validate  constant-time thumbprint match
//!   → token mint or uniform invalid_client
//! ```
//!
//! Both stages are pure functions over their inputs: no shared state, no
//! locking, safe under any concurrency. Expected "not authenticated"
//! outcomes are ordinary values ([`ParseOutcome::Absent`], a failed
//! [`ValidationVerdict`]); only genuine contract violations produce errors.
//!
//! # Modules
//!
//! - [`types`] — `ParsedSecret`, `RegisteredSecret`, `ValidationVerdict`
//! - [`parser`] — request → credential extraction
//! - [`validator`] — thumbprint matching

pub mod parser;
pub mod types;
pub mod validator;

pub use parser::{InputLengthRestrictions, parse};
pub use types::{
    ParseOutcome, ParsedCredential, ParsedSecret, RegisteredSecret, RegisteredSecretKind,
    ValidationVerdict,
};
pub use validator::validate;
