//! Command-line surface: argument parsing, error mapping, output envelopes

use clap::{Parser, Subcommand, ValueEnum};
use miette::{Diagnostic, Report};
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use thiserror::Error;

/// Successful exit
pub const EXIT_OK: i32 = 0;
/// Usage or configuration error exit code
pub const EXIT_USAGE: i32 = 2;
/// Secret store operation failure exit code
pub const EXIT_OPERATION: i32 = 3;

/// CLI-level error types with exit code mapping
#[derive(Error, Debug, Clone, Diagnostic)]
pub enum CliError {
    /// Bad arguments or configuration (exit code 2)
    #[error("{message}")]
    #[diagnostic(code(vaultkit::cli::usage))]
    Usage {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
    /// A secret store operation failed (exit code 3)
    #[error("{message}")]
    #[diagnostic(code(vaultkit::cli::operation))]
    Operation {
        /// The error message
        message: String,
        /// Optional help text
        #[help]
        help: Option<String>,
    },
}

impl CliError {
    /// Create a usage error
    #[must_use]
    pub fn usage(message: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
            help: None,
        }
    }

    /// Create a usage error with help text
    #[must_use]
    pub fn usage_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Usage {
            message: message.into(),
            help: Some(help.into()),
        }
    }

    /// Create an operation error
    #[must_use]
    pub fn operation(message: impl Into<String>) -> Self {
        Self::Operation {
            message: message.into(),
            help: None,
        }
    }

    /// Create an operation error with help text
    #[must_use]
    pub fn operation_with_help(message: impl Into<String>, help: impl Into<String>) -> Self {
        Self::Operation {
            message: message.into(),
            help: Some(help.into()),
        }
    }
}

/// Convert a secret store error to the matching CLI category.
///
/// Preconditions are caller mistakes and map to usage errors (exit
/// code 2); everything the store or the transport reports maps to
/// operation errors (exit code 3).
impl From<vaultkit_core::Error> for CliError {
    fn from(err: vaultkit_core::Error) -> Self {
        match err {
            vaultkit_core::Error::Precondition { message } => Self::usage(message),
            vaultkit_core::Error::Authentication { message } => Self::operation_with_help(
                format!("authentication failed: {message}"),
                "Check the credentials and the --auth method selection",
            ),
            vaultkit_core::Error::NotFound { what } => {
                Self::operation(format!("not found: {what}"))
            }
            err @ vaultkit_core::Error::Remote { .. } => Self::operation(err.to_string()),
        }
    }
}

/// Map a CLI error to its exit code
#[must_use]
pub const fn exit_code_for(err: &CliError) -> i32 {
    match err {
        CliError::Usage { .. } => EXIT_USAGE,
        CliError::Operation { .. } => EXIT_OPERATION,
    }
}

/// Render an error for the selected output mode: a JSON envelope on
/// stdout, or a miette report on stderr.
#[allow(clippy::print_stdout, clippy::print_stderr)]
pub fn render_error(err: &CliError, json_mode: bool) {
    if json_mode {
        let envelope = ErrorEnvelope::new(serde_json::json!({
            "code": match err {
                CliError::Usage { .. } => "usage",
                CliError::Operation { .. } => "operation",
            },
            "message": err.to_string(),
        }));
        match serde_json::to_string(&envelope) {
            Ok(json) => println!("{json}"),
            Err(_) => eprintln!("Error serializing error response"),
        }
    } else {
        let report = Report::new(err.clone());
        eprintln!("{report:?}");
        let _ = io::stderr().flush();
    }
}

/// Success response envelope for JSON output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OkEnvelope<T> {
    /// Status indicator, always "ok" for success
    pub status: &'static str,
    /// The actual data payload
    pub data: T,
}

impl<T> OkEnvelope<T> {
    /// Create a new success envelope
    #[must_use]
    pub const fn new(data: T) -> Self {
        Self { status: "ok", data }
    }
}

/// Error response envelope for JSON output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEnvelope<E> {
    /// Status indicator, always "error" for failures
    pub status: &'static str,
    /// The error details
    pub error: E,
}

impl<E> ErrorEnvelope<E> {
    /// Create a new error envelope
    #[must_use]
    pub const fn new(error: E) -> Self {
        Self {
            status: "error",
            error,
        }
    }
}

/// Logging verbosity for the stderr subscriber
#[derive(ValueEnum, Copy, Clone, Debug)]
pub enum LogLevel {
    /// Most verbose
    Trace,
    /// Debugging detail
    Debug,
    /// Informational events
    Info,
    /// Warnings only (default)
    Warn,
    /// Errors only
    Error,
}

impl LogLevel {
    /// The `EnvFilter` directive for this level
    #[must_use]
    pub const fn as_directive(self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Authentication method selection
#[derive(ValueEnum, Copy, Clone, Debug, PartialEq, Eq)]
pub enum AuthKind {
    /// Machine auth with a role ID and secret ID
    Approle,
    /// Directory auth with a username and password
    Ldap,
}

/// Main CLI entry point for vaultkit.
///
/// A non-interactive client for Vault-style KV v2 secret stores. All
/// credentials arrive via flags or environment variables; there are no
/// prompts, so every command is safe to run from automation.
#[derive(Parser, Debug)]
#[command(name = "vaultkit")]
#[command(about = "Non-interactive client for Vault-style KV v2 secret stores")]
#[command(version)]
pub struct Cli {
    /// The subcommand to execute.
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Secret store address. HTTPS is enforced for non-loopback hosts.
    #[arg(
        long,
        global = true,
        env = "VAULT_ADDR",
        help = "Secret store address (HTTPS)"
    )]
    pub address: Option<String>,

    /// KV v2 engine mount to operate on.
    #[arg(
        long,
        global = true,
        env = "VAULT_ENGINE",
        default_value = "secret",
        help = "KV v2 engine mount"
    )]
    pub engine: String,

    /// Authentication method.
    #[arg(
        long,
        global = true,
        value_enum,
        default_value = "approle",
        help = "Authentication method"
    )]
    pub auth: AuthKind,

    /// Role ID for approle auth.
    #[arg(
        long,
        global = true,
        env = "VAULT_ROLE_ID",
        help = "Role ID for approle auth"
    )]
    pub role_id: Option<String>,

    /// Secret ID for approle auth.
    #[arg(
        long,
        global = true,
        env = "VAULT_SECRET_ID",
        hide_env_values = true,
        help = "Secret ID for approle auth"
    )]
    pub secret_id: Option<String>,

    /// Username for LDAP auth.
    #[arg(
        long,
        global = true,
        env = "VAULT_LDAP_USERNAME",
        help = "Username for LDAP auth"
    )]
    pub username: Option<String>,

    /// Password for LDAP auth.
    #[arg(
        long,
        global = true,
        env = "VAULT_LDAP_PASSWORD",
        hide_env_values = true,
        help = "Password for LDAP auth"
    )]
    pub password: Option<String>,

    /// Extra attempts for idempotent reads on transient failures.
    #[arg(
        long,
        global = true,
        default_value_t = 0,
        value_name = "N",
        help = "Extra attempts for idempotent reads on transient failures"
    )]
    pub retries: u32,

    /// Logging verbosity level.
    #[arg(
        short = 'L',
        long,
        global = true,
        value_enum,
        default_value = "warn",
        help = "Set logging level"
    )]
    pub level: LogLevel,

    /// Emit JSON envelopes on stdout.
    #[arg(long, global = true, help = "Emit JSON envelopes on stdout")]
    pub json: bool,
}

/// Available CLI subcommands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// KV v2 secret operations.
    #[command(about = "KV v2 secret operations")]
    Kv {
        /// KV subcommand to execute.
        #[command(subcommand)]
        subcommand: KvCommands,
    },
}

/// KV v2 subcommands, one per client operation.
#[derive(Subcommand, Debug)]
pub enum KvCommands {
    /// List child names one level below a folder.
    #[command(about = "List child names one level below a folder")]
    List {
        /// Folder to list; omitted lists the engine root.
        #[arg(value_name = "FOLDER", help = "Folder to list (engine root if omitted)")]
        folder: Option<String>,
    },
    /// List the key names inside a bundle, without values.
    #[command(about = "List the key names inside a bundle, without values")]
    Subkeys {
        /// Path of the bundle.
        #[arg(value_name = "PATH")]
        path: String,
    },
    /// Read a bundle, or a single key out of it.
    #[command(about = "Read a bundle, or a single key out of it")]
    Get {
        /// Path of the bundle.
        #[arg(value_name = "PATH")]
        path: String,
        /// Read only this key.
        #[arg(long, value_name = "KEY", help = "Read only this key")]
        key: Option<String>,
        /// Read a historical version instead of the latest.
        #[arg(long, value_name = "N", help = "Read a historical version")]
        version: Option<u64>,
        /// Print the bare value only (requires --key).
        #[arg(long, help = "Print the bare value only (requires --key)")]
        field_only: bool,
    },
    /// Write entries to a bundle (appends by default).
    #[command(about = "Write entries to a bundle (appends by default)")]
    Put {
        /// Path of the bundle.
        #[arg(value_name = "PATH")]
        path: String,
        /// Entries to write.
        #[arg(required = true, value_name = "KEY=VALUE", help = "Entries to write")]
        entries: Vec<String>,
        /// Overwrite the whole bundle instead of appending.
        #[arg(long, help = "Overwrite the whole bundle instead of appending")]
        replace: bool,
        /// Only write if the current version matches (implies overwrite).
        #[arg(
            long,
            value_name = "VERSION",
            help = "Only write if the current version matches (implies overwrite)"
        )]
        cas: Option<u64>,
    },
    /// Delete a whole bundle, or a single key out of it.
    #[command(about = "Delete a whole bundle, or a single key out of it")]
    Delete {
        /// Path of the bundle.
        #[arg(value_name = "PATH")]
        path: String,
        /// Delete only this key, keeping the rest of the bundle.
        #[arg(long, value_name = "KEY", help = "Delete only this key")]
        key: Option<String>,
    },
    /// Show the version history of a path.
    #[command(about = "Show the version history of a path")]
    Metadata {
        /// Path of the bundle.
        #[arg(value_name = "PATH")]
        path: String,
    },
}

/// Parse command line arguments into a CLI structure.
#[must_use]
pub fn parse() -> Cli {
    Cli::parse()
}
