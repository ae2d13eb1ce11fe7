//! Error types shared across the vaultkit crates

// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

use miette::Diagnostic;
use thiserror::Error;

/// Error type for secret store operations
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// Login was rejected or could not complete
    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(vaultkit::auth),
        help("Verify the credentials and that the auth method is enabled on the server")
    )]
    Authentication {
        /// What the server (or transport) reported
        message: String,
    },

    /// The call was refused locally, before any request was sent
    #[error("Precondition failed: {message}")]
    #[diagnostic(
        code(vaultkit::precondition),
        help("No request was sent to the secret store; fix the client state or arguments")
    )]
    Precondition {
        /// Why the call was refused
        message: String,
    },

    /// The addressed bundle, key, or version does not exist
    #[error("Secret not found: {what}")]
    #[diagnostic(code(vaultkit::not_found))]
    NotFound {
        /// The path, key, or version that was requested
        what: String,
    },

    /// Any other failure reported by the store or the transport
    #[error("Secret store request failed{}: {message}", status.map_or(String::new(), |s| format!(" (HTTP {s})")))]
    #[diagnostic(
        code(vaultkit::remote),
        help("Retry is left to the caller; transient failures may succeed on a later attempt")
    )]
    Remote {
        /// HTTP status, absent for transport-level failures
        status: Option<u16>,
        /// The server's error message, or the transport error text
        message: String,
    },
}

impl Error {
    /// Create an authentication error
    #[must_use]
    pub fn authentication(msg: impl Into<String>) -> Self {
        Self::Authentication {
            message: msg.into(),
        }
    }

    /// Create a precondition error
    #[must_use]
    pub fn precondition(msg: impl Into<String>) -> Self {
        Self::Precondition {
            message: msg.into(),
        }
    }

    /// Create a not found error
    #[must_use]
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// Create a remote error carrying the server's HTTP status
    #[must_use]
    pub fn remote(status: u16, msg: impl Into<String>) -> Self {
        Self::Remote {
            status: Some(status),
            message: msg.into(),
        }
    }

    /// Create a remote error for a transport failure with no HTTP status
    #[must_use]
    pub fn transport(msg: impl Into<String>) -> Self {
        Self::Remote {
            status: None,
            message: msg.into(),
        }
    }

    /// Whether this error means the addressed secret does not exist
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Whether a retry could plausibly change the outcome.
    ///
    /// Transport failures, throttling, and server-side errors qualify;
    /// authentication, precondition, not-found, and other 4xx responses
    /// are terminal.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Remote { status, .. } => status.is_none_or(|s| s == 429 || s >= 500),
            _ => false,
        }
    }
}

/// Result type for secret store operations
pub type Result<T> = std::result::Result<T, Error>;
