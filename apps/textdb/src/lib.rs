//! # TextDB CLI library
//!
//! The command-line layer, exposed as a library so it can be driven from tests.

pub mod cli;
