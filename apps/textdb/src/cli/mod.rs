//! # TextDB CLI Module
//!
//! This module implements the CLI interface for TextDB.
//!
//! ## Available Commands
//!
//! - `get` - Print the value of a key
//! - `set` - Insert or overwrite a key
//! - `add` - Insert a key that must not exist yet
//! - `remove` - Delete a key
//! - `clear` - Delete every key
//! - `list` - Print every entry
//! - `status` - Show store location and settings
//! - `sync` - Run one sync cycle and report what it did

mod commands;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use textdb_core::{Registry, RegistryConfig, Separator, TextDbError};

pub use commands::*;

// =============================================================================
// CLI STRUCTURE
// =============================================================================

/// TextDB - key-value stores in plain text files
///
/// Every command opens the store, runs, and flushes pending writes before exiting.
#[derive(Parser, Debug)]
#[command(name = "textdb")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress confirmations for write commands
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Directory holding the store files
    #[arg(short, long, global = true)]
    pub root: Option<PathBuf>,

    /// Name of the store to operate on
    #[arg(short, long, global = true, default_value = "Test")]
    pub store: String,

    /// TOML configuration file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Seconds between sync cycles
    #[arg(long, global = true)]
    pub interval: Option<u64>,

    /// Separator token (`\n`, `\t`, `\r` and `\\` escapes are understood)
    #[arg(long, global = true)]
    pub separator: Option<String>,

    /// Output in JSON format (for programmatic access)
    #[arg(long, global = true)]
    pub json_mode: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Commands {
    /// Print the value of a key
    #[command(alias = "read")]
    Get {
        /// Key to read
        key: String,
    },

    /// Insert or overwrite a key
    Set {
        /// Key to write
        key: String,
        /// Value to store
        value: String,
    },

    /// Insert a key, failing if it already exists
    Add {
        /// Key to write
        key: String,
        /// Value to store
        value: String,
    },

    /// Delete a key (no error if absent)
    Remove {
        /// Key to delete
        key: String,
    },

    /// Delete every key
    Clear,

    /// Print every entry
    List,

    /// Show store location and settings
    Status,

    /// Run one sync cycle now
    Sync,
}

// =============================================================================
// CONFIGURATION
// =============================================================================

/// Expand `\n`, `\t`, `\r` and `\\` in a separator given on the command line.
///
/// Any other backslash sequence is kept as written.
pub fn unescape_separator(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars();

    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('\\') => out.push('\\'),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }

    out
}

/// Build the registry configuration: file or environment, then flags.
pub fn resolve_config(cli: &Cli) -> Result<RegistryConfig, TextDbError> {
    let mut config = match &cli.config {
        Some(path) => RegistryConfig::load(path)?,
        None => RegistryConfig::from_env(),
    };

    if let Some(root) = &cli.root {
        config.root = root.clone();
    }
    if let Some(secs) = cli.interval {
        config.store.sync_interval_secs = secs;
    }
    if let Some(raw) = &cli.separator {
        config.store.separator = Separator::new(unescape_separator(raw))?;
    }

    config.validate()?;
    Ok(config)
}

// =============================================================================
// COMMAND EXECUTION
// =============================================================================

/// Execute the CLI with parsed arguments.
pub async fn execute(cli: Cli) -> Result<(), TextDbError> {
    let config = resolve_config(&cli)?;
    tracing::debug!("Using root {:?}", config.root);

    let registry = Registry::new(config)?;
    let store = registry.open(&cli.store)?;
    let output = Output {
        json_mode: cli.json_mode,
        quiet: cli.quiet,
    };

    let result = match cli.command.unwrap_or(Commands::Status) {
        Commands::Get { key } => cmd_get(&store, output, &key),
        Commands::Set { key, value } => cmd_set(&store, output, key, value),
        Commands::Add { key, value } => cmd_add(&store, output, key, value),
        Commands::Remove { key } => cmd_remove(&store, output, key),
        Commands::Clear => cmd_clear(&store, output),
        Commands::List => cmd_list(&store, output),
        Commands::Status => cmd_status(&store, output),
        Commands::Sync => cmd_sync(&store, output).await,
    };

    // Flush even when the command failed, so earlier writes are not lost.
    let shutdown = registry.shutdown().await;
    result?;
    shutdown
}

// =============================================================================
// TESTS
// =============================================================================
