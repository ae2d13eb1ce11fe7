//! vaultkit CLI entry point
//!
//! Parses arguments, wires up tracing to stderr, and hands the parsed
//! command to [`vaultkit::commands::execute`]. Stdout stays reserved for
//! command output so results can be piped.

// CLI binary needs to output to stdout/stderr - this is intentional
#![allow(clippy::print_stdout, clippy::print_stderr)]

use vaultkit::cli::{self, EXIT_OK, exit_code_for, render_error};
use vaultkit::commands;

fn main() {
    let cli = cli::parse();
    init_tracing(cli.level, cli.json);

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("Fatal error: failed to create tokio runtime: {e}");
            std::process::exit(1);
        }
    };

    std::process::exit(rt.block_on(run(cli)));
}

async fn run(cli: cli::Cli) -> i32 {
    let json_mode = cli.json;
    match commands::execute(cli).await {
        Ok(()) => EXIT_OK,
        Err(err) => {
            let code = exit_code_for(&err);
            render_error(&err, json_mode);
            code
        }
    }
}

/// Logs go to stderr so stdout stays clean for command output.
/// `RUST_LOG` overrides the `--level` flag when set.
fn init_tracing(level: cli::LogLevel, json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(level.as_directive()));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        let _ = builder.json().try_init();
    } else {
        let _ = builder.try_init();
    }
}
