//! # Pending-Edit Queue
//!
//! Ordered record of the edits made since the last successful sync cycle.
//!
//! Any number of writers may push concurrently. The sync engine is the only
//! consumer: `drain` takes every queued edit in FIFO order and leaves the
//! queue empty, so no edit is handed out twice.

use crate::mutation::Edit;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};

/// Thread-safe FIFO of pending edits.
#[derive(Debug, Default)]
pub struct PendingEdits {
    edits: Mutex<VecDeque<Edit>>,
}

impl PendingEdits {
    /// Create an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    // A writer that panicked mid-push cannot leave the deque half-updated.
    fn lock(&self) -> MutexGuard<'_, VecDeque<Edit>> {
        self.edits.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Append an edit.
    pub fn push(&self, edit: Edit) {
        self.lock().push_back(edit);
    }

    /// Remove and return every queued edit, oldest first.
    pub fn drain(&self) -> Vec<Edit> {
        self.lock().drain(..).collect()
    }

    /// Put a drained batch back in front of anything queued since.
    ///
    /// Used when a cycle fails after draining, so the batch is replayed
    /// before newer edits on the next attempt.
    pub fn requeue_front(&self, batch: Vec<Edit>) {
        let mut edits = self.lock();
        for edit in batch.into_iter().rev() {
            edits.push_front(edit);
        }
    }

    /// Number of queued edits.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether the queue is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

// =============================================================================
// TESTS
// =============================================================================
