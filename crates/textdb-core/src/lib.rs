//! # textdb-core
//!
//! An embedded key-value store that keeps its state in memory and reconciles
//! it periodically with a flat text file - THE STORE.
//!
//! Other processes (or a restart) may read and edit the same file. The
//! running process keeps answering reads from memory with no I/O.
//!
//! ## Components
//!
//! - `formats` - codec between a mapping and its single delimited text blob
//! - `table` - the live mapping, validation, and mutation application
//! - `queue` - pending edits recorded between sync cycles
//! - `sync` - the background task that reloads, replays, and persists
//! - `registry` - one store per name, created on first request
//!
//! ## Usage
//!
//! ```no_run
//! # async fn demo() -> Result<(), textdb_core::TextDbError> {
//! use textdb_core::{Registry, RegistryConfig};
//!
//! let registry = Registry::new(RegistryConfig::with_root("data"))?;
//! let scores = registry.open("scores")?;
//!
//! scores.set("alice", "42")?;
//! assert_eq!(scores.get("alice")?, "42");
//!
//! registry.shutdown().await?;
//! # Ok(())
//! # }
//! ```
//!
//! ## Guarantees
//!
//! - A write is visible to reads as soon as it returns
//! - A write is on disk after the next successful sync cycle, or after `close`
//! - External edits to the file are folded in on the next cycle
//! - No multi-key atomicity, no network access

// =============================================================================
// MODULES
// =============================================================================

pub mod config;
pub mod formats;
pub mod mutation;
pub mod primitives;
pub mod queue;
pub mod registry;
pub mod store;
pub mod sync;
pub mod table;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{EntryField, Entries, Separator, StoreName, TextDbError};

// =============================================================================
// RE-EXPORTS: Store
// =============================================================================

pub use config::{RegistryConfig, StoreConfig};
pub use mutation::Edit;
pub use queue::PendingEdits;
pub use registry::{Registry, global, init_global, open, shutdown_global};
pub use store::Store;
pub use sync::{SyncEngine, SyncReport, SyncTarget};
pub use table::{Keys, Merge, Snapshot, Table, Values};

// =============================================================================
// RE-EXPORTS: Formats (from formats module)
// =============================================================================

pub use formats::{decode, encode};
