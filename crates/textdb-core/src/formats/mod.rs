//! # Formats Module
//!
//! On-disk representation of a store.
//!
//! Only pure transformations live here. File I/O is done by the sync engine.

mod codec;

pub use codec::*;
