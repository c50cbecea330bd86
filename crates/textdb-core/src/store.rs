//! # Store
//!
//! The public handle to one named key-value table backed by one file.
//!
//! `Store` is cheap to clone; every clone refers to the same table and the
//! same background sync task. Stores are obtained through a `Registry`,
//! which guarantees one store (and one task) per name.
//!
//! Reads and writes are synchronous and never wait on the disk. Writes become
//! durable on the next sync cycle, or at `close`.

use crate::config::StoreConfig;
use crate::sync::{SyncEngine, SyncReport, SyncTarget, prepare_backing_file};
use crate::table::{Keys, Snapshot, Table, Values};
use crate::{StoreName, TextDbError};
use std::path::Path;
use std::sync::Arc;

#[derive(Debug)]
struct StoreInner {
    target: Arc<SyncTarget>,
    engine: SyncEngine,
    config: StoreConfig,
}

/// Handle to an open store.
#[derive(Debug, Clone)]
pub struct Store {
    inner: Arc<StoreInner>,
}

impl Store {
    /// Create the store `name` under `root` and start its sync task.
    ///
    /// Must be called from within a tokio runtime.
    pub(crate) fn open(root: &Path, name: StoreName, config: StoreConfig) -> Result<Self, TextDbError> {
        config.validate()?;
        if tokio::runtime::Handle::try_current().is_err() {
            return Err(TextDbError::NoRuntime);
        }

        let (path, entries) = prepare_backing_file(root, &name, &config.separator)?;
        let table = Table::with_entries(config.separator.clone(), entries);

        tracing::info!(
            store = %name,
            path = %path.display(),
            entries = table.count(),
            interval_secs = config.sync_interval_secs,
            "Opened store"
        );

        let target = Arc::new(SyncTarget::new(name, path, table));
        let engine = SyncEngine::start(Arc::clone(&target), config.sync_interval())?;

        Ok(Self {
            inner: Arc::new(StoreInner {
                target,
                engine,
                config,
            }),
        })
    }

    fn table(&self) -> &Table {
        self.inner.target.table()
    }

    // =========================================================================
    // IDENTITY
    // =========================================================================

    #[must_use]
    pub fn name(&self) -> &StoreName {
        self.inner.target.name()
    }

    /// Path of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.inner.target.path()
    }

    /// Configuration the store was created with.
    #[must_use]
    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// Whether both handles refer to the same store.
    #[must_use]
    pub fn same_store(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    /// Whether `close` has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.table().is_closed()
    }

    // =========================================================================
    // READS
    // =========================================================================

    /// Number of entries.
    #[must_use]
    pub fn count(&self) -> usize {
        self.table().count()
    }

    /// Whether `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.table().contains_key(key)
    }

    /// Value for `key`, if present.
    #[must_use]
    pub fn try_get(&self, key: &str) -> Option<String> {
        self.table().try_get(key)
    }

    /// Value for `key`, or `TextDbError::KeyNotFound`.
    pub fn get(&self, key: &str) -> Result<String, TextDbError> {
        self.table().get(key)
    }

    /// Keys at this moment, in key order.
    #[must_use]
    pub fn keys(&self) -> Keys {
        self.table().keys()
    }

    /// Values at this moment, in key order.
    #[must_use]
    pub fn values(&self) -> Values {
        self.table().values()
    }

    /// Every entry at this moment.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        self.table().snapshot()
    }

    /// Number of writes not yet persisted by a sync cycle.
    #[must_use]
    pub fn pending_edits(&self) -> usize {
        self.table().pending_len()
    }

    // =========================================================================
    // WRITES
    // =========================================================================

    /// Insert or overwrite `key`.
    ///
    /// Fails with `SeparatorConflict` if the key or value contains the
    /// separator token. Every write fails with `StoreClosed` once `close`
    /// has started.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) -> Result<(), TextDbError> {
        self.table().set(key, value)
    }

    /// Insert `key`, failing with `DuplicateKey` if it exists.
    pub fn add(&self, key: impl Into<String>, value: impl Into<String>) -> Result<(), TextDbError> {
        self.table().add(key, value)
    }

    /// Delete `key` if present.
    pub fn remove(&self, key: impl Into<String>) -> Result<(), TextDbError> {
        self.table().remove(key)
    }

    /// Delete every entry.
    pub fn clear(&self) -> Result<(), TextDbError> {
        self.table().clear()
    }

    // =========================================================================
    // SYNC & LIFECYCLE
    // =========================================================================

    /// Run a sync cycle now instead of waiting for the next interval.
    pub async fn sync_now(&self) -> Result<SyncReport, TextDbError> {
        if self.is_closed() {
            return Err(TextDbError::StoreClosed);
        }
        self.inner.target.sync().await
    }

    /// Refuse further writes, stop the sync task, and persist every pending edit.
    ///
    /// Reads keep serving the last state. If the final cycle fails (for
    /// instance because the file is corrupt) the file is left untouched, the
    /// edits stay pending and the error is returned; calling `close` again
    /// retries the flush. With nothing pending the file is not read at all.
    pub async fn close(&self) -> Result<SyncReport, TextDbError> {
        let first = self.table().close();
        self.inner.engine.stop().await;

        if self.pending_edits() == 0 {
            if first {
                tracing::info!(store = %self.name(), "Closed store");
            }
            return Ok(SyncReport {
                entries: self.count(),
                ..SyncReport::default()
            });
        }

        let report = match self.inner.target.sync().await {
            Ok(report) => report,
            Err(e) => {
                tracing::error!(
                    store = %self.name(),
                    path = %self.path().display(),
                    pending = self.pending_edits(),
                    "Final sync failed, pending edits not persisted: {}",
                    e
                );
                return Err(e);
            }
        };

        tracing::info!(
            store = %self.name(),
            entries = report.entries,
            written = report.written,
            "Closed store"
        );
        Ok(report)
    }
}

// =============================================================================
// TESTS
// =============================================================================
