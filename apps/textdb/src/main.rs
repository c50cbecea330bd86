//! # TextDB
//!
//! Command-line access to TextDB stores.
//!
//! ## Usage
//!
//! ```bash
//! textdb --store scores set alice 42
//! textdb --store scores get alice
//! textdb --store scores list --json-mode
//! textdb --root /srv/textdb --store scores sync
//! ```
//!
//! Logging goes to stderr. `RUST_LOG` overrides the filter and
//! `TEXTDB_LOG_FORMAT=json` switches to machine-parseable output.

use clap::Parser;
use textdb::cli;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// APPLICATION ENTRY POINT
// =============================================================================

#[tokio::main]
async fn main() {
    // Parse CLI arguments
    let cli = cli::Cli::parse();

    // Initialize tracing on stderr; stdout carries command output.
    let log_format = std::env::var("TEXTDB_LOG_FORMAT").unwrap_or_else(|_| "text".to_string());
    let default_filter = if cli.verbose {
        "textdb=debug,textdb_core=debug"
    } else {
        "textdb=warn,textdb_core=warn"
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| default_filter.into());

    match log_format.as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(filter)
                .with(
                    tracing_subscriber::fmt::layer()
                        .json()
                        .with_writer(std::io::stderr),
                )
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(filter)
                .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
                .init();
        }
    }

    // Execute command
    if let Err(e) = cli::execute(cli).await {
        tracing::error!("Error: {}", e);
        std::process::exit(1);
    }
}
