//! # Sync Engine
//!
//! Reconciles a store's table with its backing file.
//!
//! ## Sync Cycle
//!
//! 1. Read the backing file (missing or empty file = empty mapping)
//! 2. Decode it; an odd token count aborts the cycle with `CorruptedStore`
//!    before anything is drained, so memory, file and queue stay untouched
//! 3. Drain the pending edits and replay them onto the decoded mapping;
//!    edits that no longer apply are skipped and logged
//! 4. Make the merged mapping live
//! 5. If any edit was replayed, encode the result and overwrite the file,
//!    unless the file already holds exactly that text
//!
//! If step 5 fails the drained edits are put back at the head of the queue.
//!
//! ## Background Task
//!
//! One tokio task per store runs a cycle every interval. After an I/O failure
//! the next wait is stretched by a random 3-6 s so two processes contending
//! for the same file drift apart. Errors are logged, never propagated: only
//! `SyncEngine::stop` ends the task.

use crate::formats::{decode, encode};
use crate::primitives::{FILE_EXTENSION, RETRY_JITTER_MAX_MS, RETRY_JITTER_MIN_MS};
use crate::table::Table;
use crate::{Entries, Separator, StoreName, TextDbError};
use serde::Serialize;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::Instrument;

// =============================================================================
// SYNC REPORT
// =============================================================================

/// What one sync cycle did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct SyncReport {
    /// Entries decoded from the backing file.
    pub loaded: usize,
    /// Pending edits replayed onto them.
    pub replayed: usize,
    /// Replayed edits that no longer applied and were skipped.
    pub skipped: usize,
    /// Entries in the merged mapping.
    pub entries: usize,
    /// Whether the backing file was rewritten.
    pub written: bool,
}

// =============================================================================
// BACKING FILE
// =============================================================================

/// Path of the backing file for `name` under `root`.
#[must_use]
pub fn backing_path(root: &Path, name: &StoreName) -> PathBuf {
    root.join(format!("{}.{}", name.as_str(), FILE_EXTENSION))
}

/// Create `root` and an empty backing file if needed, then load the file.
///
/// A corrupt file is logged and yields an empty mapping; the background
/// task keeps retrying it. I/O failures are returned.
///
/// Uses blocking `std::fs` calls on the caller's thread. Fine for files of a
/// few megabytes; larger stores would want this moved to `spawn_blocking`.
pub fn prepare_backing_file(
    root: &Path,
    name: &StoreName,
    separator: &Separator,
) -> Result<(PathBuf, Entries), TextDbError> {
    std::fs::create_dir_all(root).map_err(|e| TextDbError::io(root, e))?;

    let path = backing_path(root, name);
    if !path.exists() {
        std::fs::write(&path, "").map_err(|e| TextDbError::io(&path, e))?;
        tracing::debug!(store = %name, path = %path.display(), "Created backing file");
    }

    let text = std::fs::read_to_string(&path).map_err(|e| TextDbError::io(&path, e))?;
    let entries = match decode(&text, separator) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::error!(
                store = %name,
                path = %path.display(),
                "Backing file unreadable at open, starting empty: {}",
                e
            );
            Entries::new()
        }
    };

    Ok((path, entries))
}

async fn read_backing_file(path: &Path) -> Result<String, TextDbError> {
    match tokio::fs::read_to_string(path).await {
        Ok(text) => Ok(text),
        // Deleted from outside: the next write recreates it.
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(String::new()),
        Err(e) => Err(TextDbError::io(path, e)),
    }
}

// =============================================================================
// SYNC TARGET
// =============================================================================

/// A table bound to its backing file.
///
/// Shared by the store handle and its background task. Cycles on the same
/// target never overlap.
#[derive(Debug)]
pub struct SyncTarget {
    name: StoreName,
    path: PathBuf,
    table: Table,
    cycle: tokio::sync::Mutex<()>,
}

impl SyncTarget {
    /// Bind `table` to the file at `path`.
    #[must_use]
    pub fn new(name: StoreName, path: PathBuf, table: Table) -> Self {
        Self {
            name,
            path,
            table,
            cycle: tokio::sync::Mutex::new(()),
        }
    }

    #[must_use]
    pub fn name(&self) -> &StoreName {
        &self.name
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    #[must_use]
    pub fn table(&self) -> &Table {
        &self.table
    }

    /// Run one sync cycle.
    pub async fn sync(&self) -> Result<SyncReport, TextDbError> {
        let _cycle = self.cycle.lock().await;
        self.run_cycle().await
    }

    async fn run_cycle(&self) -> Result<SyncReport, TextDbError> {
        let separator = self.table.separator();
        let text = read_backing_file(&self.path).await?;
        let disk = decode(&text, separator)?;
        let loaded = disk.len();

        let merge = self.table.merge(disk);
        let encoded = encode(merge.snapshot.entries(), separator);

        // Without local edits the file is already authoritative, even if its
        // layout differs from what encode would produce.
        let written = !merge.edits.is_empty() && encoded != text;
        if written {
            if let Err(e) = tokio::fs::write(&self.path, &encoded).await {
                self.table.requeue(merge.edits);
                return Err(TextDbError::io(&self.path, e));
            }
        }

        Ok(SyncReport {
            loaded,
            replayed: merge.edits.len(),
            skipped: merge.skipped,
            entries: merge.snapshot.len(),
            written,
        })
    }
}

// =============================================================================
// BACKGROUND ENGINE
// =============================================================================

/// Handle to the background task syncing one store.
///
/// Dropping the handle signals the task to stop without flushing.
#[derive(Debug)]
pub struct SyncEngine {
    shutdown: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SyncEngine {
    /// Spawn the background task for `target` on the current tokio runtime.
    ///
    /// Returns `TextDbError::NoRuntime` when called outside a runtime.
    pub fn start(target: Arc<SyncTarget>, interval: Duration) -> Result<Self, TextDbError> {
        let runtime = tokio::runtime::Handle::try_current().map_err(|_| TextDbError::NoRuntime)?;
        let (shutdown, signal) = watch::channel(false);

        let span = tracing::debug_span!("sync_engine", store = %target.name());
        let task = runtime.spawn(run(target, interval, signal).instrument(span));

        Ok(Self {
            shutdown,
            task: Mutex::new(Some(task)),
        })
    }

    /// Stop the background task and wait for it to finish.
    ///
    /// A cycle already in progress completes first. Calling this twice is fine.
    pub async fn stop(&self) {
        let _ = self.shutdown.send(true);

        let task = self
            .task
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take();

        if let Some(task) = task {
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    tracing::error!("Sync task ended abnormally: {}", e);
                }
            }
        }
    }
}

impl Drop for SyncEngine {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

/// Random extra wait after a failed I/O cycle.
fn retry_jitter() -> Duration {
    Duration::from_millis(rand::random_range(RETRY_JITTER_MIN_MS..RETRY_JITTER_MAX_MS))
}

async fn run(target: Arc<SyncTarget>, interval: Duration, mut shutdown: watch::Receiver<bool>) {
    let mut delay = interval;

    loop {
        tokio::select! {
            biased;
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
                continue;
            }
            () = tokio::time::sleep(delay) => {}
        }

        delay = match target.sync().await {
            Ok(report) => {
                tracing::debug!(
                    loaded = report.loaded,
                    replayed = report.replayed,
                    skipped = report.skipped,
                    written = report.written,
                    "Sync cycle complete"
                );
                interval
            }
            Err(e) if e.is_transient() => {
                let backoff = retry_jitter();
                tracing::debug!(
                    "Backing file in use, retrying in {} ms: {}",
                    (interval + backoff).as_millis(),
                    e
                );
                interval + backoff
            }
            Err(e @ TextDbError::CorruptedStore { .. }) => {
                tracing::error!(path = %target.path().display(), "Sync cycle aborted: {}", e);
                interval
            }
            Err(e) => {
                tracing::error!("Unexpected error in sync cycle: {}", e);
                interval
            }
        };
    }

    tracing::debug!("Sync task stopped");
}

// =============================================================================
// TESTS
// =============================================================================
