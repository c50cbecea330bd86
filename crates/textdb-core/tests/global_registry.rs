//! # Process-Wide Registry
//!
//! Kept in its own test binary: the global registry can only be initialised
//! once per process.

use tempfile::TempDir;
use textdb_core::{RegistryConfig, TextDbError};

#[tokio::test]
async fn global_registry_lifecycle() {
    let dir = TempDir::new().expect("tempdir");

    let registry =
        textdb_core::init_global(RegistryConfig::with_root(dir.path())).expect("init global");
    assert!(registry.is_empty());

    // A second initialisation is refused.
    let again = textdb_core::init_global(RegistryConfig::with_root(dir.path()));
    assert!(matches!(again, Err(TextDbError::InvalidConfig(_))));

    let a = textdb_core::open("Test").expect("open");
    let b = textdb_core::open("Test").expect("open again");
    assert!(a.same_store(&b));

    a.add("key", "value").expect("add");
    textdb_core::shutdown_global().await.expect("shutdown");

    assert!(textdb_core::global().is_empty());
    assert_eq!(
        std::fs::read_to_string(dir.path().join("Test.txt")).expect("read"),
        "key\nvalue"
    );
}
