//! # Store Scenarios
//!
//! End-to-end behaviour of stores opened through a registry, with real
//! backing files in a temporary root.

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use textdb_core::{
    Entries, Registry, RegistryConfig, Separator, Store, StoreConfig, TextDbError, decode,
};

// =============================================================================
// HELPERS
// =============================================================================

fn registry(dir: &TempDir) -> Registry {
    Registry::new(RegistryConfig::with_root(dir.path())).expect("registry")
}

fn read(path: &Path) -> String {
    fs::read_to_string(path).expect("read backing file")
}

fn entries(pairs: &[(&str, &str)]) -> Entries {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
        .collect()
}

fn on_disk(store: &Store) -> Entries {
    decode(&read(store.path()), &store.config().separator).expect("decode backing file")
}

// =============================================================================
// OPEN
// =============================================================================

#[tokio::test]
async fn open_creates_empty_backing_file() {
    let dir = TempDir::new().expect("tempdir");
    let registry = registry(&dir);

    let store = registry.open("S").expect("open");

    assert_eq!(store.path(), dir.path().join("S.txt"));
    assert_eq!(read(store.path()), "");
    assert_eq!(store.count(), 0);
}

#[tokio::test]
async fn open_loads_existing_file() {
    let dir = TempDir::new().expect("tempdir");
    fs::write(dir.path().join("S.txt"), "a\n1\nb\n2").expect("seed");

    let store = registry(&dir).open("S").expect("open");

    assert_eq!(store.count(), 2);
    assert_eq!(store.get("b").expect("get"), "2");
}

// =============================================================================
// IMMEDIATE VISIBILITY & VALIDATION
// =============================================================================

#[tokio::test]
async fn writes_are_visible_before_any_sync() {
    let dir = TempDir::new().expect("tempdir");
    let store = registry(&dir).open("S").expect("open");

    store.set("k", "v").expect("set");

    assert_eq!(store.get("k").expect("get"), "v");
    assert_eq!(read(store.path()), "", "nothing is written before a cycle");
}

#[tokio::test]
async fn separator_conflicts_leave_map_unchanged() {
    let dir = TempDir::new().expect("tempdir");
    let store = registry(&dir).open("S").expect("open");
    store.set("a", "1").expect("set");
    let before = store.snapshot();

    let in_key = store.set("a\n", "b");
    let in_value = store.set("a", "b\n");
    let in_add = store.add("x\ny", "z");

    for result in [in_key, in_value, in_add] {
        assert!(matches!(
            result,
            Err(TextDbError::SeparatorConflict { .. })
        ));
    }
    assert_eq!(store.snapshot().entries(), before.entries());
    assert_eq!(store.pending_edits(), 1);
}

#[tokio::test]
async fn custom_separator_is_enforced() {
    let dir = TempDir::new().expect("tempdir");
    let config = StoreConfig::default().with_separator(Separator::new("|").expect("sep"));
    let store = registry(&dir).open_with("S", config).expect("open");

    store.set("multi\nline", "ok").expect("newline is fine with '|'");
    assert!(store.set("a|b", "c").is_err());

    store.sync_now().await.expect("sync");
    assert_eq!(read(store.path()), "multi\nline|ok");
}

#[tokio::test]
async fn add_duplicate_and_get_missing() {
    let dir = TempDir::new().expect("tempdir");
    let store = registry(&dir).open("S").expect("open");
    store.add("k", "v").expect("add");

    assert!(matches!(store.add("k", "w"), Err(TextDbError::DuplicateKey(_))));
    assert!(matches!(store.get("nope"), Err(TextDbError::KeyNotFound(_))));
    assert_eq!(store.try_get("nope"), None);
    assert_eq!(store.get("k").expect("get"), "v");
}

// =============================================================================
// SYNC CYCLES
// =============================================================================

#[tokio::test]
async fn corrupted_file_aborts_cycle_without_changes() {
    let dir = TempDir::new().expect("tempdir");
    fs::write(dir.path().join("S.txt"), "a\n1").expect("seed");
    let store = registry(&dir).open("S").expect("open");
    store.set("b", "2").expect("set");

    fs::write(store.path(), "x\ny\nz").expect("corrupt");
    let result = store.sync_now().await;

    assert!(matches!(
        result,
        Err(TextDbError::CorruptedStore { tokens: 3 })
    ));
    assert_eq!(read(store.path()), "x\ny\nz");
    assert_eq!(store.snapshot().entries(), &entries(&[("a", "1"), ("b", "2")]));
    assert_eq!(store.pending_edits(), 1, "edit stays queued for the next cycle");

    // Once the file is repaired the queued edit lands.
    fs::write(store.path(), "a\n1").expect("repair");
    store.sync_now().await.expect("sync");
    assert_eq!(on_disk(&store), entries(&[("a", "1"), ("b", "2")]));
}

#[tokio::test]
async fn external_edits_merge_with_local_edits() {
    let dir = TempDir::new().expect("tempdir");
    fs::write(dir.path().join("S.txt"), "a\n1").expect("seed");
    let store = registry(&dir).open("S").expect("open");

    fs::write(store.path(), "a\n1\nb\n2").expect("external rewrite");
    store.remove("a").expect("remove");
    store.sync_now().await.expect("sync");

    assert_eq!(store.snapshot().entries(), &entries(&[("b", "2")]));
    assert_eq!(on_disk(&store), entries(&[("b", "2")]));
}

#[tokio::test]
async fn external_edits_are_folded_into_reads() {
    let dir = TempDir::new().expect("tempdir");
    let store = registry(&dir).open("S").expect("open");

    fs::write(store.path(), "from\noutside").expect("external write");
    assert!(!store.contains_key("from"), "not visible before a cycle");

    let report = store.sync_now().await.expect("sync");

    assert_eq!(report.loaded, 1);
    assert!(!report.written);
    assert_eq!(store.get("from").expect("get"), "outside");
}

#[tokio::test]
async fn add_conflicting_with_disk_is_skipped_rest_applies() {
    let dir = TempDir::new().expect("tempdir");
    let store = registry(&dir).open("S").expect("open");
    store.add("k", "local").expect("add");
    store.set("other", "x").expect("set");

    fs::write(store.path(), "k\nremote").expect("external write");
    let report = store.sync_now().await.expect("sync");

    assert_eq!(report.replayed, 2);
    assert_eq!(report.skipped, 1);
    assert_eq!(store.get("k").expect("get"), "remote");
    assert_eq!(on_disk(&store), entries(&[("k", "remote"), ("other", "x")]));
}

#[tokio::test]
async fn idle_sync_leaves_file_untouched() {
    let dir = TempDir::new().expect("tempdir");
    fs::write(dir.path().join("S.txt"), "b\n2\na\n1").expect("seed");
    let store = registry(&dir).open("S").expect("open");
    let empty = registry(&dir).open("E").expect("open");

    for _ in 0..2 {
        let report = store.sync_now().await.expect("sync");
        assert!(!report.written);
        assert_eq!(read(store.path()), "b\n2\na\n1");

        let report = empty.sync_now().await.expect("sync");
        assert!(!report.written);
        assert_eq!(read(empty.path()), "");
    }
}

#[tokio::test]
async fn add_sync_remove_sync() {
    let dir = TempDir::new().expect("tempdir");
    let store = registry(&dir).open("S").expect("open");

    store.add("k1", "v1").expect("add");
    store.add("k2", "v2").expect("add");
    store.sync_now().await.expect("sync");

    let text = read(store.path());
    assert_eq!(text.matches("k1\nv1").count(), 1);
    assert_eq!(text.matches("k2\nv2").count(), 1);
    assert_eq!(text.split('\n').count(), 4);

    store.remove("k1").expect("remove");
    store.sync_now().await.expect("sync");

    assert_eq!(read(store.path()), "k2\nv2");
}

#[tokio::test]
async fn clear_replays_against_disk() {
    let dir = TempDir::new().expect("tempdir");
    let store = registry(&dir).open("S").expect("open");
    store.set("a", "1").expect("set");
    store.sync_now().await.expect("sync");

    fs::write(store.path(), "a\n1\nb\n2").expect("external write");
    store.clear().expect("clear");
    store.set("c", "3").expect("set");
    store.sync_now().await.expect("sync");

    assert_eq!(read(store.path()), "c\n3");
}

#[tokio::test]
async fn background_task_persists_without_trigger() {
    let dir = TempDir::new().expect("tempdir");
    let config = StoreConfig::default().with_sync_interval_secs(1);
    let store = registry(&dir).open_with("S", config).expect("open");

    store.set("k", "v").expect("set");

    let mut persisted = false;
    for _ in 0..50 {
        tokio::time::sleep(Duration::from_millis(100)).await;
        if read(store.path()) == "k\nv" {
            persisted = true;
            break;
        }
    }
    assert!(persisted, "background cycle should have written the file");
    assert_eq!(store.pending_edits(), 0);
}

// =============================================================================
// LIFECYCLE
// =============================================================================

#[tokio::test]
async fn shutdown_flushes_every_store() {
    let dir = TempDir::new().expect("tempdir");
    let registry = registry(&dir);
    let a = registry.open("a").expect("open");
    let b = registry.open("b").expect("open");
    a.set("x", "1").expect("set");
    b.set("y", "2").expect("set");

    registry.shutdown().await.expect("shutdown");

    assert_eq!(read(&dir.path().join("a.txt")), "x\n1");
    assert_eq!(read(&dir.path().join("b.txt")), "y\n2");
}

#[tokio::test]
async fn shutdown_leaves_corrupt_file_intact() {
    let dir = TempDir::new().expect("tempdir");
    fs::write(dir.path().join("S.txt"), "a\n1\nb\n2\nc").expect("seed");
    let registry = registry(&dir);
    let store = registry.open("S").expect("open");
    assert_eq!(store.count(), 0);

    registry.shutdown().await.expect("shutdown");

    assert_eq!(read(&dir.path().join("S.txt")), "a\n1\nb\n2\nc");
}

#[tokio::test]
async fn shutdown_reports_corruption_instead_of_overwriting() {
    let dir = TempDir::new().expect("tempdir");
    let registry = registry(&dir);
    let store = registry.open("S").expect("open");
    store.set("b", "2").expect("set");
    fs::write(store.path(), "a\n1\nx\n9\ny").expect("external write");

    let result = registry.shutdown().await;

    assert!(matches!(result, Err(TextDbError::CorruptedStore { .. })));
    assert_eq!(read(store.path()), "a\n1\nx\n9\ny");
    assert_eq!(store.pending_edits(), 1);
}

#[tokio::test]
async fn reopen_after_shutdown_sees_persisted_state() {
    let dir = TempDir::new().expect("tempdir");
    {
        let registry = registry(&dir);
        let store = registry.open("S").expect("open");
        store.set("persist", "me").expect("set");
        registry.shutdown().await.expect("shutdown");
    }

    let store = registry(&dir).open("S").expect("reopen");
    assert_eq!(store.get("persist").expect("get"), "me");
}

// =============================================================================
// CONCURRENCY
// =============================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_writers_and_syncs_lose_nothing() {
    let dir = TempDir::new().expect("tempdir");
    let registry = Arc::new(registry(&dir));
    let store = registry.open("S").expect("open");

    let mut writers = Vec::new();
    for t in 0..4 {
        let store = store.clone();
        writers.push(std::thread::spawn(move || {
            for i in 0..250 {
                store
                    .set(format!("w{t}-{i}"), i.to_string())
                    .expect("set");
            }
        }));
    }

    for _ in 0..5 {
        store.sync_now().await.expect("sync");
    }
    for writer in writers {
        writer.join().expect("writer thread");
    }
    store.sync_now().await.expect("final sync");

    assert_eq!(store.count(), 1000);
    assert_eq!(on_disk(&store).len(), 1000);
    assert_eq!(store.pending_edits(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn writes_racing_shutdown_are_persisted_or_refused() {
    for round in 0..20 {
        let dir = TempDir::new().expect("tempdir");
        let registry = registry(&dir);
        let store = registry.open("S").expect("open");

        let mut writers = Vec::new();
        for t in 0..4 {
            let store = store.clone();
            writers.push(tokio::task::spawn_blocking(move || {
                let mut acked = 0usize;
                loop {
                    match store.set(format!("w{t}-{acked}"), "v") {
                        Ok(()) => acked += 1,
                        Err(e) => {
                            assert!(matches!(e, TextDbError::StoreClosed), "write failed: {e}");
                            return acked;
                        }
                    }
                }
            }));
        }

        tokio::time::sleep(Duration::from_millis(2)).await;
        registry.shutdown().await.expect("shutdown");

        let mut acked = 0;
        for writer in writers {
            acked += writer.await.expect("writer task");
        }

        assert_eq!(on_disk(&store).len(), acked, "round {round}");
        assert_eq!(store.pending_edits(), 0, "round {round}");
    }
}
