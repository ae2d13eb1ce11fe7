//! Typed client for a KV v2 secret store.
//!
//! This crate speaks the store's HTTP API directly:
//! - Session establishment via approle or LDAP login
//! - Listing child bundles and bundle subkeys
//! - Reading bundles (latest or a historical version), single keys, and
//!   credential pairs
//! - Merge-on-write ("append") and overwrite writes, plus an optional
//!   compare-and-swap variant
//! - Whole-bundle deletion and delete-by-rewrite for single keys
//! - Version-history metadata
//!
//! Operations other than login refuse to run without a session, and no
//! operation retries on its own; callers compose
//! `vaultkit_core::retry::with_retry` around idempotent calls when they
//! want backoff.
//!
//! # Example
//!
//! ```ignore
//! use vaultkit_client::{AuthMethod, VaultClient, WriteMode};
//!
//! let mut client = VaultClient::new("https://vault.example.com:8200")?;
//! client.login(&AuthMethod::app_role(role_id, secret_id)).await?;
//!
//! let bundle = client.read("kv", "infra/app1", None).await?;
//! let credential = client.read_credential("kv", "infra/app1", "svc_deploy", None).await?;
//! ```

#![warn(missing_docs)]

mod auth;
mod client;
mod kv;

pub use auth::AuthMethod;
pub use client::{DEFAULT_TIMEOUT, VaultClient};
pub use kv::WriteMode;

// Re-export the core types operations return, so callers need one import
pub use vaultkit_core::{
    BundleVersion, Credential, Error, Result, SecretBundle, SecretMetadata, SecretVersion,
};
