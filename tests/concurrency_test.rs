//! Mutations racing on one record file stay serialized and crash-safe.

use std::sync::Arc;
use std::thread;

use tempfile::TempDir;
use warren::core::lockfile::LockGuard;
use warren::core::record::{self, Record};

#[test]
fn test_concurrent_sets_all_land() {
    let tmp = TempDir::new().unwrap();
    let path = Arc::new(tmp.path().join(".env"));

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let path = Arc::clone(&path);
            thread::spawn(move || {
                let key = format!("KEY_{i}");
                record::set(&path, &key, &format!("value-{i}")).unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let parsed = Record::parse(&path).unwrap();
    assert_eq!(parsed.len(), 8);
    for i in 0..8 {
        assert_eq!(
            parsed.get(&format!("KEY_{i}")),
            Some(format!("value-{i}").as_str())
        );
    }
}

#[test]
fn test_readers_never_see_torn_writes() {
    let tmp = TempDir::new().unwrap();
    let path = Arc::new(tmp.path().join(".env"));
    record::set(&path, "KEY", "initial").unwrap();

    let writer = {
        let path = Arc::clone(&path);
        thread::spawn(move || {
            for i in 0..20 {
                record::set(&path, "KEY", &format!("generation-{i}")).unwrap();
            }
        })
    };

    // Unlocked readers: rename-based replace means each parse observes a
    // complete file, old or new, never a prefix.
    for _ in 0..50 {
        let parsed = Record::parse(&path).unwrap();
        let value = parsed.get("KEY").unwrap();
        assert!(
            value == "initial" || value.starts_with("generation-"),
            "torn value: {value:?}"
        );
    }

    writer.join().unwrap();
}

#[cfg(unix)]
#[test]
fn test_stale_lock_does_not_block_mutation() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join(".env");

    // A crashed writer left its marker behind.
    let dead_pid = {
        let mut child = std::process::Command::new("true").spawn().unwrap();
        let pid = child.id();
        child.wait().unwrap();
        pid
    };
    std::fs::write(
        tmp.path().join(".env.lock"),
        dead_pid.to_string(),
    )
    .unwrap();

    record::set(&path, "KEY", "value").unwrap();

    let parsed = Record::parse(&path).unwrap();
    assert_eq!(parsed.get("KEY"), Some("value"));
    assert!(!tmp.path().join(".env.lock").exists());
}

#[test]
fn test_mutation_times_out_while_lock_held_by_live_process() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join(".env");

    let _held = LockGuard::acquire(&path).unwrap();
    let err = LockGuard::acquire_with_budget(&path, 2).expect_err("should time out");

    assert!(err.to_string().contains("timed out"));
}
