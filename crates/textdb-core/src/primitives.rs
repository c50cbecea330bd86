//! # Store Primitives
//!
//! Hardcoded constants for the TextDB store.
//!
//! These values are compiled into the binary. Per-store configuration
//! (`StoreConfig`) may override the interval and the separator, never the rest.

/// Default interval between two sync cycles, in seconds.
pub const DEFAULT_SYNC_INTERVAL_SECS: u64 = 15;

/// Smallest sync interval a store accepts, in seconds.
pub const MIN_SYNC_INTERVAL_SECS: u64 = 1;

/// Default separator token between keys and values in the backing file.
///
/// A newline keeps the file readable and editable by hand:
/// `key1\nvalue1\nkey2\nvalue2`.
pub const DEFAULT_SEPARATOR: &str = "\n";

/// Default root directory for backing files.
pub const DEFAULT_ROOT: &str = "textdb";

/// Extension appended to the store name to build the backing file name.
pub const FILE_EXTENSION: &str = "txt";

/// Lower bound of the random delay added after a failed I/O cycle (ms).
pub const RETRY_JITTER_MIN_MS: u64 = 3_000;

/// Upper bound (exclusive) of the random delay added after a failed I/O cycle (ms).
pub const RETRY_JITTER_MAX_MS: u64 = 6_000;

/// Characters that may never appear in a store name.
///
/// This is the union of the path separators and the characters reserved
/// in file names on common platforms. ASCII control characters are
/// rejected separately.
pub const FORBIDDEN_NAME_CHARS: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Device names that cannot be used as a file name, with or without an
/// extension, on Windows. Compared case-insensitively.
pub const RESERVED_NAMES: &[&str] = &[
    "CON", "PRN", "AUX", "NUL", "COM1", "COM2", "COM3", "COM4", "COM5", "COM6", "COM7", "COM8",
    "COM9", "LPT1", "LPT2", "LPT3", "LPT4", "LPT5", "LPT6", "LPT7", "LPT8", "LPT9",
];
