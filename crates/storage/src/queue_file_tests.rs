// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use std::io::Write;
use sx_core::SessionId;
use tempfile::tempdir;

fn item(id: &str, code: &str) -> OfflineQueueItem {
    let mut item = OfflineQueueItem::new(code, "python", 1_000);
    item.id = id.to_string();
    item
}

#[test]
fn missing_file_is_empty_queue() {
    let dir = tempdir().unwrap();
    let store = QueueFile::new(dir.path().join("queue.json"));
    assert!(store.load().unwrap().is_empty());
}

#[test]
fn save_and_load_preserves_order_and_fields() {
    let dir = tempdir().unwrap();
    let store = QueueFile::new(dir.path().join("nested/queue.json"));

    let items = vec![
        item("a", "print(1)").with_session(Some(SessionId::new("s-1"))),
        item("b", "print(2)"),
        item("c", "print(3)"),
    ];
    store.save(&items).unwrap();

    assert_eq!(store.load().unwrap(), items);
    let mut left: Vec<_> = std::fs::read_dir(dir.path().join("nested"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    left.sort();
    assert_eq!(left, vec!["queue.json", "queue.lock"]);
}

#[test]
fn save_replaces_previous_contents() {
    let dir = tempdir().unwrap();
    let store = QueueFile::new(dir.path().join("queue.json"));

    store.save(&[item("a", "1"), item("b", "2")]).unwrap();
    store.save(&[item("b", "2")]).unwrap();

    let ids: Vec<_> = store.load().unwrap().into_iter().map(|i| i.id).collect();
    assert_eq!(ids, vec!["b"]);
}

#[test]
fn corrupt_file_is_moved_aside() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("queue.json");
    let mut f = File::create(&path).unwrap();
    f.write_all(b"{not json").unwrap();
    drop(f);

    let store = QueueFile::new(&path);
    assert!(store.load().unwrap().is_empty());
    assert!(!path.exists());
    assert_eq!(
        fs::read(path.with_extension("bak")).unwrap(),
        b"{not json".to_vec()
    );
}

#[test]
fn backups_rotate() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("queue.json");
    let store = QueueFile::new(&path);

    for n in 0..4 {
        fs::write(&path, format!("garbage-{n}")).unwrap();
        store.load().unwrap();
    }

    assert_eq!(fs::read_to_string(path.with_extension("bak")).unwrap(), "garbage-3");
    assert_eq!(fs::read_to_string(path.with_extension("bak.2")).unwrap(), "garbage-2");
    assert_eq!(fs::read_to_string(path.with_extension("bak.3")).unwrap(), "garbage-1");
}

#[test]
fn newer_format_version_is_refused() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("queue.json");
    fs::write(
        &path,
        r#"{"version":99,"saved_at":"2026-01-01T00:00:00Z","items":[]}"#,
    )
    .unwrap();

    let result = QueueFile::new(&path).load();
    assert!(matches!(result, Err(QueueStoreError::Version(99))));
    // Left in place for a newer client to read
    assert!(path.exists());
}

#[test]
fn memory_store_shares_state_and_can_fail() {
    let store = MemoryQueueStore::new();
    let clone = store.clone();
    store.save(&[item("a", "1")]).unwrap();
    assert_eq!(clone.items().len(), 1);

    store.set_fail_saves(true);
    assert!(store.save(&[]).is_err());
    assert_eq!(clone.load().unwrap().len(), 1);
}

#[test]
fn concurrent_updates_keep_every_item() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("queue.json");

    let writers: Vec<_> = (0..8)
        .map(|w| {
            let store = QueueFile::new(&path);
            std::thread::spawn(move || {
                for n in 0..20 {
                    store
                        .update(|items| items.push(item(&format!("{w}-{n}"), "x")))
                        .unwrap();
                }
            })
        })
        .collect();
    for writer in writers {
        writer.join().unwrap();
    }

    let stored = QueueFile::new(&path).load().unwrap();
    assert_eq!(stored.len(), 160);
    // Each writer's items stay in its own order
    let first_writer: Vec<_> = stored
        .iter()
        .filter(|i| i.id.starts_with("0-"))
        .map(|i| i.id.clone())
        .collect();
    let expected: Vec<_> = (0..20).map(|n| format!("0-{n}")).collect();
    assert_eq!(first_writer, expected);
}

#[test]
fn update_returns_the_closure_result() {
    let dir = tempdir().unwrap();
    let store = QueueFile::new(dir.path().join("queue.json"));
    store.save(&[item("a", "1"), item("b", "2")]).unwrap();

    let removed = store
        .update(|items| {
            let before = items.len();
            items.retain(|i| i.id != "a");
            before - items.len()
        })
        .unwrap();

    assert_eq!(removed, 1);
    assert_eq!(store.load().unwrap(), vec![item("b", "2")]);
}
