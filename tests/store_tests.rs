//! Integration tests for the credential store engine and its
//! persistence log.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use keycraft::crypto::Argon2Params;
use keycraft::errors::{KeycraftError, LogError};
use keycraft::vault::{CredentialStore, EntryFields, PersistenceLog, DEFAULT_IO_TIMEOUT};
use tempfile::TempDir;

const PASSWORD: &[u8] = b"integration-password";

fn fast() -> Argon2Params {
    Argon2Params {
        memory_kib: 8_192,
        iterations: 1,
        parallelism: 1,
    }
}

/// Helper: a fresh vault inside a temp dir.
fn new_vault() -> (TempDir, PathBuf, CredentialStore) {
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join("keys.kcv");
    let log = PersistenceLog::create(&path, PASSWORD, &fast(), DEFAULT_IO_TIMEOUT).expect("create");
    let store = CredentialStore::open(log).expect("load");
    (dir, path, store)
}

fn reopen(path: &Path) -> CredentialStore {
    let log = PersistenceLog::open(path, PASSWORD, DEFAULT_IO_TIMEOUT).expect("open");
    CredentialStore::open(log).expect("load")
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn add_list_reveal_scenario() {
    let (_dir, _path, store) = new_vault();

    let added = store
        .add(EntryFields::new("Prod", "OpenAI", "sk-ABCDEFGH1234"))
        .unwrap();
    assert_eq!(added.masked_value, "sk-A...1234");
    assert_eq!(added.created_at, added.updated_at);

    let listed = store.list().unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, added.id);
    assert_eq!(listed[0].masked_value, "sk-A...1234");

    assert_eq!(store.reveal(&added.id).unwrap().as_str(), "sk-ABCDEFGH1234");
}

#[test]
fn empty_name_is_rejected_and_nothing_is_stored() {
    let (_dir, path, store) = new_vault();
    let before = fs::read(&path).unwrap();

    let err = store.add(EntryFields::new("", "X", "y")).unwrap_err();
    assert!(matches!(err, KeycraftError::Validation { field: "name" }));
    assert!(store.list().unwrap().is_empty());
    assert_eq!(fs::read(&path).unwrap(), before);
}

#[test]
fn masked_value_never_exposes_long_secrets() {
    let (_dir, _path, store) = new_vault();
    for secret in ["sk-ABCDEFGH1234", "ghp_0123456789abcdefghijklmnop", "ключ-секрет-длинный"] {
        let view = store.add(EntryFields::new("n", "v", secret)).unwrap();
        assert_ne!(view.masked_value, secret);
        assert!(!view.masked_value.contains(secret));
    }
}

#[test]
fn unknown_id_leaves_file_untouched() {
    let (_dir, path, store) = new_vault();
    store.add(EntryFields::new("Prod", "OpenAI", "sk-1")).unwrap();
    let before = fs::read(&path).unwrap();

    let update = store.update("ghost", EntryFields::new("a", "b", "c"));
    let delete = store.delete("ghost");
    assert!(matches!(update, Err(KeycraftError::NotFound { .. })));
    assert!(matches!(delete, Err(KeycraftError::NotFound { .. })));
    assert_eq!(fs::read(&path).unwrap(), before);
}

#[test]
fn committed_state_survives_reload() {
    let (_dir, path, store) = new_vault();
    let mut fields = EntryFields::new("Prod", "Anthropic", "sk-ant-0000000000");
    fields.base_url = Some("https://api.anthropic.com".into());
    fields.tags = Some("llm, prod".into());
    fields.notes = Some("team account".into());
    fields.code_snippets = Some("curl https://api.anthropic.com".into());
    store.add(fields).unwrap();
    let doomed = store.add(EntryFields::new("Old", "OpenAI", "sk-old")).unwrap();
    store.delete(&doomed.id).unwrap();

    let before = store.list().unwrap();
    let reloaded = reopen(&path);
    assert_eq!(reloaded.list().unwrap(), before);
    assert!(matches!(
        reloaded.reveal(&doomed.id),
        Err(KeycraftError::NotFound { .. })
    ));
}

#[test]
fn wrong_password_is_corrupt_state() {
    let (_dir, path, store) = new_vault();
    store.add(EntryFields::new("Prod", "OpenAI", "sk-1")).unwrap();
    drop(store);

    let log = PersistenceLog::open(&path, b"not-the-password", DEFAULT_IO_TIMEOUT).unwrap();
    let err = CredentialStore::open(log).err().expect("load must fail");
    assert!(matches!(
        err,
        KeycraftError::Persistence(LogError::CorruptState(_))
    ));
}

#[test]
fn secrets_never_appear_in_plaintext_on_disk() {
    let (_dir, path, store) = new_vault();
    store
        .add(EntryFields::new("Prod", "OpenAI", "sk-plaintext-canary-42"))
        .unwrap();
    let raw = fs::read(&path).unwrap();
    let needle = b"sk-plaintext-canary-42";
    assert!(!raw.windows(needle.len()).any(|w| w == needle));
}

// ---------------------------------------------------------------------------
// Ordering and concurrency
// ---------------------------------------------------------------------------

#[test]
fn sequential_adds_list_in_insertion_order() {
    let (_dir, _path, store) = new_vault();
    let ids: Vec<String> = (0..10)
        .map(|i| {
            store
                .add(EntryFields::new(&format!("key-{i}"), "Vendor", "sk-1"))
                .unwrap()
                .id
        })
        .collect();

    let listed: Vec<String> = store.list().unwrap().into_iter().map(|v| v.id).collect();
    assert_eq!(listed, ids);
}

#[test]
fn concurrent_adds_are_all_kept() {
    let (_dir, path, store) = new_vault();
    let store = Arc::new(store);

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                store
                    .add(EntryFields::new(&format!("worker-{i}"), "Vendor", "sk-concurrent"))
                    .unwrap()
                    .id
            })
        })
        .collect();
    let mut ids: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 8);

    assert_eq!(store.len().unwrap(), 8);
    assert_eq!(reopen(&path).len().unwrap(), 8);
}

#[test]
fn readers_see_consistent_snapshots_during_writes() {
    let (_dir, _path, store) = new_vault();
    let target = store
        .add(EntryFields::new("Prod", "OpenAI", "sk-one-1111111"))
        .unwrap();

    thread::scope(|s| {
        s.spawn(|| {
            for i in 0..20 {
                let secret = format!("sk-rot-{i:08}");
                store
                    .update(&target.id, EntryFields::new("Prod", "OpenAI", &secret))
                    .unwrap();
            }
        });
        s.spawn(|| {
            for _ in 0..50 {
                let views = store.list().unwrap();
                assert_eq!(views.len(), 1);
                assert!(views[0].updated_at >= views[0].created_at);
            }
        });
    });

    assert_eq!(store.reveal(&target.id).unwrap().as_str(), "sk-rot-00000019");
}
