//! Shared building blocks for the vaultkit secret-store toolkit.
//!
//! This crate carries everything the client and the CLI have in common:
//! - The error taxonomy for secret store operations
//! - Bundle, version-history, and credential types
//! - Path normalization and encoding for hierarchical secret addresses
//! - An exponential-backoff retry helper for callers that want one
//!
//! # Example
//!
//! ```ignore
//! use vaultkit_core::{Credential, RetryConfig, retry::with_retry};
//!
//! let credential = Credential::new("svc_deploy", "pw1");
//! assert_eq!(format!("{credential:?}").contains("pw1"), false);
//!
//! // Wrap an idempotent operation in bounded retries
//! let bundle = with_retry(&RetryConfig::default(), || client.read("kv", "infra/app1", None)).await?;
//! ```

#![warn(missing_docs)]

mod bundle;
mod credential;
mod error;
pub mod path;
pub mod retry;

pub use bundle::{BundleVersion, SecretBundle, SecretMetadata, SecretVersion, merge_payload};
pub use credential::Credential;
pub use error::{Error, Result};
pub use retry::RetryConfig;
