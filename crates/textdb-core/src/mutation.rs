//! # Edits
//!
//! The write intents recorded by a store.
//!
//! An `Edit` is applied once to the live mapping when the write call is made,
//! and replayed once more during the next sync cycle against the mapping
//! rebuilt from disk. It carries everything it needs, so replay does not
//! depend on what the live mapping looked like when it was recorded.

use crate::{Entries, TextDbError};

/// A recorded write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Edit {
    /// Insert or overwrite `key`.
    Set { key: String, value: String },
    /// Insert `key`; fails if it already exists.
    Add { key: String, value: String },
    /// Delete `key` if present.
    Remove { key: String },
    /// Delete every entry.
    Clear,
}

impl Edit {
    /// Apply this edit to `entries`.
    ///
    /// Only `Add` can fail, with `TextDbError::DuplicateKey`. On failure
    /// `entries` is left unchanged.
    pub fn apply(&self, entries: &mut Entries) -> Result<(), TextDbError> {
        match self {
            Self::Set { key, value } => {
                entries.insert(key.clone(), value.clone());
            }
            Self::Add { key, value } => {
                if entries.contains_key(key) {
                    return Err(TextDbError::DuplicateKey(key.clone()));
                }
                entries.insert(key.clone(), value.clone());
            }
            Self::Remove { key } => {
                entries.remove(key);
            }
            Self::Clear => entries.clear(),
        }
        Ok(())
    }

    /// Short name of the operation, for logs.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Set { .. } => "set",
            Self::Add { .. } => "add",
            Self::Remove { .. } => "remove",
            Self::Clear => "clear",
        }
    }

    /// The key this edit targets, if any.
    #[must_use]
    pub fn key(&self) -> Option<&str> {
        match self {
            Self::Set { key, .. } | Self::Add { key, .. } | Self::Remove { key } => Some(key),
            Self::Clear => None,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
