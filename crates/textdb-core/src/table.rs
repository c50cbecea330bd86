//! # Table
//!
//! The in-memory half of a store: the live mapping, the pending-edit queue,
//! and the rules every write must satisfy.
//!
//! Reads and writes never touch the disk. A write is validated, applied to
//! the live mapping, and recorded in the queue while the mapping's write lock
//! is held. The sync engine drains the queue and swaps in the merged mapping
//! under that same lock, so an edit is either in the drained batch or still
//! queued, never neither.
//!
//! Closing a table takes the same lock, so every write either lands before
//! the close (and is drained by the final cycle) or fails with `StoreClosed`.
//!
//! The mapping sits behind an `Arc`. Readers take cheap snapshots; a write
//! made while a snapshot is alive clones the mapping first (`Arc::make_mut`).

use crate::mutation::Edit;
use crate::queue::PendingEdits;
use crate::types::EntryField;
use crate::{Entries, Separator, TextDbError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

// =============================================================================
// SNAPSHOTS
// =============================================================================

/// An immutable view of a table at one point in time.
///
/// Later writes to the table are not visible through a snapshot.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    entries: Arc<Entries>,
}

impl Snapshot {
    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the snapshot has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Value for `key`, if present.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Iterate over `(key, value)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Borrow the underlying mapping.
    #[must_use]
    pub fn entries(&self) -> &Entries {
        &self.entries
    }
}

/// Keys of a snapshot. Can be iterated any number of times.
#[derive(Debug, Clone)]
pub struct Keys(Snapshot);

impl Keys {
    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.0.entries.keys().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a Keys {
    type Item = &'a String;
    type IntoIter = std::collections::btree_map::Keys<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.entries.keys()
    }
}

/// Values of a snapshot, in key order. Can be iterated any number of times.
#[derive(Debug, Clone)]
pub struct Values(Snapshot);

impl Values {
    pub fn iter(&self) -> impl Iterator<Item = &str> + '_ {
        self.0.entries.values().map(String::as_str)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a Values {
    type Item = &'a String;
    type IntoIter = std::collections::btree_map::Values<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.entries.values()
    }
}

// =============================================================================
// MERGE RESULT
// =============================================================================

/// Outcome of folding the pending edits into a mapping loaded from disk.
#[derive(Debug)]
pub struct Merge {
    /// The merged mapping, now live in the table.
    pub snapshot: Snapshot,
    /// The edits drained from the queue, in replay order.
    pub edits: Vec<Edit>,
    /// How many of `edits` no longer applied and were skipped.
    pub skipped: usize,
}

// =============================================================================
// TABLE
// =============================================================================

/// The live mapping of a store plus its pending edits.
#[derive(Debug)]
pub struct Table {
    separator: Separator,
    entries: RwLock<Arc<Entries>>,
    pending: PendingEdits,
    // Only flipped while `entries` is write-locked.
    closed: AtomicBool,
}

impl Table {
    /// Create an empty table using `separator` for validation.
    #[must_use]
    pub fn new(separator: Separator) -> Self {
        Self::with_entries(separator, Entries::new())
    }

    /// Create a table holding `entries`, with nothing pending.
    #[must_use]
    pub fn with_entries(separator: Separator, entries: Entries) -> Self {
        Self {
            separator,
            entries: RwLock::new(Arc::new(entries)),
            pending: PendingEdits::new(),
            closed: AtomicBool::new(false),
        }
    }

    /// The separator this table validates against.
    #[must_use]
    pub fn separator(&self) -> &Separator {
        &self.separator
    }

    fn read(&self) -> RwLockReadGuard<'_, Arc<Entries>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, Arc<Entries>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }

    // -------------------------------------------------------------------------
    // Reads
    // -------------------------------------------------------------------------

    /// Number of entries.
    #[must_use]
    pub fn count(&self) -> usize {
        self.read().len()
    }

    /// Whether `key` is present.
    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.read().contains_key(key)
    }

    /// Value for `key`, if present.
    #[must_use]
    pub fn try_get(&self, key: &str) -> Option<String> {
        self.read().get(key).cloned()
    }

    /// Value for `key`, or `TextDbError::KeyNotFound`.
    pub fn get(&self, key: &str) -> Result<String, TextDbError> {
        self.try_get(key)
            .ok_or_else(|| TextDbError::KeyNotFound(key.to_string()))
    }

    /// Immutable view of the current mapping.
    #[must_use]
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            entries: Arc::clone(&self.read()),
        }
    }

    /// Keys of the current mapping.
    #[must_use]
    pub fn keys(&self) -> Keys {
        Keys(self.snapshot())
    }

    /// Values of the current mapping.
    #[must_use]
    pub fn values(&self) -> Values {
        Values(self.snapshot())
    }

    /// Whether `close` has been called.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Number of edits waiting for the next sync cycle.
    #[must_use]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    // -------------------------------------------------------------------------
    // Writes
    // -------------------------------------------------------------------------

    /// Insert or overwrite `key`.
    pub fn set(&self, key: impl Into<String>, value: impl Into<String>) -> Result<(), TextDbError> {
        let (key, value) = (key.into(), value.into());
        self.validate(&key, &value)?;
        self.record(Edit::Set { key, value })
    }

    /// Insert `key`; fails with `TextDbError::DuplicateKey` if present.
    pub fn add(&self, key: impl Into<String>, value: impl Into<String>) -> Result<(), TextDbError> {
        let (key, value) = (key.into(), value.into());
        self.validate(&key, &value)?;
        self.record(Edit::Add { key, value })
    }

    /// Delete `key`. Deleting an absent key succeeds.
    pub fn remove(&self, key: impl Into<String>) -> Result<(), TextDbError> {
        self.record(Edit::Remove { key: key.into() })
    }

    /// Delete every entry.
    pub fn clear(&self) -> Result<(), TextDbError> {
        self.record(Edit::Clear)
    }

    fn validate(&self, key: &str, value: &str) -> Result<(), TextDbError> {
        if self.separator.occurs_in(key) {
            return Err(TextDbError::SeparatorConflict {
                field: EntryField::Key,
            });
        }
        if self.separator.occurs_in(value) {
            return Err(TextDbError::SeparatorConflict {
                field: EntryField::Value,
            });
        }
        Ok(())
    }

    fn record(&self, edit: Edit) -> Result<(), TextDbError> {
        let mut entries = self.write();

        if self.is_closed() {
            return Err(TextDbError::StoreClosed);
        }

        // Checked before make_mut so a rejected add never clones the mapping.
        if let Edit::Add { key, .. } = &edit {
            if entries.contains_key(key) {
                return Err(TextDbError::DuplicateKey(key.clone()));
            }
        }

        edit.apply(Arc::make_mut(&mut entries))?;
        self.pending.push(edit);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Sync support
    // -------------------------------------------------------------------------

    /// Replay every pending edit onto `disk` and make the result live.
    ///
    /// An edit that no longer applies is skipped and logged; the rest of the
    /// batch still replays.
    pub fn merge(&self, mut disk: Entries) -> Merge {
        let mut entries = self.write();
        let edits = self.pending.drain();
        let mut skipped = 0;

        for edit in &edits {
            if let Err(e) = edit.apply(&mut disk) {
                skipped += 1;
                tracing::warn!(
                    edit = edit.kind(),
                    key = edit.key().unwrap_or_default(),
                    error = %e,
                    "Skipping pending edit that no longer applies"
                );
            }
        }

        *entries = Arc::new(disk);
        Merge {
            snapshot: Snapshot {
                entries: Arc::clone(&entries),
            },
            edits,
            skipped,
        }
    }

    /// Put edits drained by a failed cycle back at the head of the queue.
    pub fn requeue(&self, edits: Vec<Edit>) {
        if !edits.is_empty() {
            self.pending.requeue_front(edits);
        }
    }

    /// Refuse every later write. Returns `false` if already closed.
    ///
    /// Edits recorded before this call stay queued for the final cycle.
    pub fn close(&self) -> bool {
        let _entries = self.write();
        !self.closed.swap(true, Ordering::AcqRel)
    }
}

// =============================================================================
// TESTS
// =============================================================================
