//! # Core Type Definitions
//!
//! This module contains the value types shared by every TextDB component:
//! - Store identity (`StoreName`)
//! - The separator token of the flat file format (`Separator`)
//! - The mapping type (`Entries`)
//! - Error types (`TextDbError`)
//!
//! ## Determinism Guarantees
//!
//! `Entries` is a `BTreeMap`, so iteration and serialization order is the key
//! order regardless of the order in which entries were written.

use crate::primitives::{DEFAULT_SEPARATOR, FORBIDDEN_NAME_CHARS, RESERVED_NAMES};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// The key-value mapping held by a store.
pub type Entries = BTreeMap<String, String>;

// =============================================================================
// STORE NAME
// =============================================================================

/// Name of a store, safe to embed as a file name component.
///
/// A valid name is non-empty, is not `.` or `..`, contains neither path
/// separators, reserved file name characters, nor control characters, does not
/// end in a dot or a space, and is not a reserved device name such as `CON`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StoreName(String);

impl StoreName {
    /// Validate and wrap a store name.
    pub fn new(name: impl Into<String>) -> Result<Self, TextDbError> {
        let name = name.into();

        if name.is_empty() {
            return Err(TextDbError::InvalidName {
                name,
                reason: "name cannot be empty".to_string(),
            });
        }

        if name == "." || name == ".." {
            return Err(TextDbError::InvalidName {
                reason: format!("'{}' is a reserved path component", name),
                name,
            });
        }

        if name.ends_with('.') || name.ends_with(' ') {
            return Err(TextDbError::InvalidName {
                name,
                reason: "name cannot end with a dot or a space".to_string(),
            });
        }

        // Device names stay reserved with any extension: `nul.txt` is `NUL`.
        let stem = name.split('.').next().unwrap_or_default();
        if RESERVED_NAMES.iter().any(|r| r.eq_ignore_ascii_case(stem)) {
            return Err(TextDbError::InvalidName {
                reason: format!("'{}' is a reserved device name", stem),
                name,
            });
        }

        let mut forbidden: Vec<char> = Vec::new();
        for c in name.chars() {
            if (FORBIDDEN_NAME_CHARS.contains(&c) || c.is_control()) && !forbidden.contains(&c) {
                forbidden.push(c);
            }
        }

        if !forbidden.is_empty() {
            let listed: Vec<String> = forbidden.iter().map(|c| format!("{:?}", c)).collect();
            return Err(TextDbError::InvalidName {
                name,
                reason: format!(
                    "name cannot contain the following characters: {}",
                    listed.join(", ")
                ),
            });
        }

        Ok(Self(name))
    }

    /// Get the name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StoreName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// =============================================================================
// SEPARATOR
// =============================================================================

/// The token delimiting keys and values in the serialized form.
///
/// Never empty. Keys and values stored under a separator may not contain it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Separator(String);

impl Separator {
    /// Create a separator from a non-empty string.
    pub fn new(token: impl Into<String>) -> Result<Self, TextDbError> {
        let token = token.into();
        if token.is_empty() {
            return Err(TextDbError::InvalidConfig(
                "separator cannot be empty".to_string(),
            ));
        }
        Ok(Self(token))
    }

    /// Get the separator as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check whether `text` contains this separator.
    #[must_use]
    pub fn occurs_in(&self, text: &str) -> bool {
        text.contains(self.0.as_str())
    }
}

impl Default for Separator {
    fn default() -> Self {
        Self(DEFAULT_SEPARATOR.to_string())
    }
}

impl TryFrom<String> for Separator {
    type Error = TextDbError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Separator> for String {
    fn from(separator: Separator) -> Self {
        separator.0
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Which half of an entry violated the separator invariant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryField {
    Key,
    Value,
}

impl fmt::Display for EntryField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key => f.write_str("key"),
            Self::Value => f.write_str("value"),
        }
    }
}

/// Errors that can occur in the TextDB system.
///
/// - Validation errors are returned synchronously by the offending call.
/// - Corruption and I/O errors occur inside sync cycles, where they are
///   logged and the cycle is retried on the next interval.
#[derive(Debug, Error)]
pub enum TextDbError {
    /// The store name is not safe to use as a file name.
    #[error("Invalid store name '{name}': {reason}")]
    InvalidName { name: String, reason: String },

    /// A key or value contains the separator token.
    #[error("The {field} cannot contain the separator token")]
    SeparatorConflict { field: EntryField },

    /// `add` was called with a key that already exists.
    #[error("Key already exists: {0}")]
    DuplicateKey(String),

    /// `get` was called with a key that does not exist.
    #[error("Key not found: {0}")]
    KeyNotFound(String),

    /// The backing file does not split into key/value pairs.
    #[error("Store file is corrupted: odd number of tokens ({tokens})")]
    CorruptedStore { tokens: usize },

    /// Reading or writing a backing file failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A configuration value is invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// A store was opened outside of a tokio runtime.
    #[error("No tokio runtime available to run the sync engine")]
    NoRuntime,

    /// The store has been shut down.
    #[error("Store is closed")]
    StoreClosed,
}

impl TextDbError {
    /// Build an I/O error for `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Whether a sync cycle failing with this error should back off before retrying.
    ///
    /// Only I/O errors are transient: another process may hold the file.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Io { .. })
    }
}

// =============================================================================
// TESTS
// =============================================================================
