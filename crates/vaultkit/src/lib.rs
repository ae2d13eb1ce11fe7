// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

//! vaultkit - command-line client for Vault-style KV v2 secret stores
//!
//! The binary in `main.rs` is a thin shell around this library: [`cli`]
//! defines the argument surface, error categories, exit codes, and
//! rendering; [`commands`] maps parsed arguments onto `vaultkit-client`
//! calls.

/// CLI argument parsing, error categories, and exit codes.
pub mod cli;
/// Command dispatch onto the secret store client.
pub mod commands;

pub use cli::{Cli, CliError};
pub use vaultkit_core::Result;
