//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.
//! Each command works on an already opened store; `execute` owns the
//! registry and flushes it afterwards.

use textdb_core::{Store, TextDbError};

/// How command results are printed.
#[derive(Debug, Clone, Copy, Default)]
pub struct Output {
    /// Print JSON instead of plain text.
    pub json_mode: bool,
    /// Skip confirmations for write commands.
    pub quiet: bool,
}

impl Output {
    fn json(&self, value: &serde_json::Value) {
        println!(
            "{}",
            serde_json::to_string_pretty(value).unwrap_or_default()
        );
    }

    fn done(&self, store: &Store, action: &str) {
        if self.json_mode {
            self.json(&serde_json::json!({
                "store": store.name().as_str(),
                "action": action,
                "ok": true
            }));
        } else if !self.quiet {
            println!("Done");
        }
    }
}

// =============================================================================
// READ COMMANDS
// =============================================================================

/// Print the value of `key`.
pub fn cmd_get(store: &Store, output: Output, key: &str) -> Result<(), TextDbError> {
    let value = store.get(key)?;

    if output.json_mode {
        output.json(&serde_json::json!({ "key": key, "value": value }));
    } else {
        println!("{}", value);
    }
    Ok(())
}

/// Print every entry in key order.
pub fn cmd_list(store: &Store, output: Output) -> Result<(), TextDbError> {
    let snapshot = store.snapshot();

    if output.json_mode {
        let entries: serde_json::Map<String, serde_json::Value> = snapshot
            .iter()
            .map(|(k, v)| (k.to_string(), serde_json::Value::from(v)))
            .collect();
        output.json(&serde_json::Value::Object(entries));
        return Ok(());
    }

    if snapshot.is_empty() {
        println!("Store '{}' is empty", store.name());
        return Ok(());
    }

    for (key, value) in snapshot.iter() {
        println!("{} = {}", key, value);
    }
    Ok(())
}

/// Show where the store lives and how it is configured.
pub fn cmd_status(store: &Store, output: Output) -> Result<(), TextDbError> {
    let config = store.config();

    if output.json_mode {
        output.json(&serde_json::json!({
            "store": store.name().as_str(),
            "path": store.path().to_string_lossy(),
            "entries": store.count(),
            "pending_edits": store.pending_edits(),
            "sync_interval_secs": config.sync_interval_secs,
            "separator": config.separator.as_str(),
        }));
        return Ok(());
    }

    println!("TextDB Store Status");
    println!("===================");
    println!("Store:     {}", store.name());
    println!("File:      {}", store.path().display());
    println!();
    println!("Entries:   {}", store.count());
    println!("Pending:   {}", store.pending_edits());
    println!("Interval:  {} s", config.sync_interval_secs);
    println!("Separator: {:?}", config.separator.as_str());

    Ok(())
}

// =============================================================================
// WRITE COMMANDS
// =============================================================================

/// Insert or overwrite `key`.
pub fn cmd_set(
    store: &Store,
    output: Output,
    key: String,
    value: String,
) -> Result<(), TextDbError> {
    store.set(key, value)?;
    output.done(store, "set");
    Ok(())
}

/// Insert `key`, failing if present.
pub fn cmd_add(
    store: &Store,
    output: Output,
    key: String,
    value: String,
) -> Result<(), TextDbError> {
    store.add(key, value)?;
    output.done(store, "add");
    Ok(())
}

/// Delete `key`.
pub fn cmd_remove(store: &Store, output: Output, key: String) -> Result<(), TextDbError> {
    store.remove(key)?;
    output.done(store, "remove");
    Ok(())
}

/// Delete every entry.
pub fn cmd_clear(store: &Store, output: Output) -> Result<(), TextDbError> {
    store.clear()?;
    output.done(store, "clear");
    Ok(())
}

// =============================================================================
// SYNC COMMAND
// =============================================================================

/// Run one sync cycle and report it.
pub async fn cmd_sync(store: &Store, output: Output) -> Result<(), TextDbError> {
    let report = store.sync_now().await?;

    if output.json_mode {
        output.json(&serde_json::json!({
            "store": store.name().as_str(),
            "loaded": report.loaded,
            "replayed": report.replayed,
            "skipped": report.skipped,
            "entries": report.entries,
            "written": report.written,
        }));
        return Ok(());
    }

    println!("Synchronized '{}'", store.name());
    println!("  Loaded from file: {}", report.loaded);
    println!("  Edits replayed:   {}", report.replayed);
    if report.skipped > 0 {
        println!("  Edits skipped:    {}", report.skipped);
    }
    println!("  Entries now:      {}", report.entries);
    println!(
        "  File {}",
        if report.written { "rewritten" } else { "unchanged" }
    );
    Ok(())
}
