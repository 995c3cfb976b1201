use super::*;

// =============================================================
// MemoryStore
// =============================================================

#[test]
fn memory_store_set_get_remove() {
    let store = MemoryStore::new();
    assert!(store.is_empty());
    store.set_item("authToken", "abc").unwrap();
    assert_eq!(store.get_item("authToken").unwrap().as_deref(), Some("abc"));
    assert_eq!(store.len(), 1);

    store.remove_item("authToken").unwrap();
    assert_eq!(store.get_item("authToken").unwrap(), None);
    assert!(store.is_empty());
}

#[test]
fn memory_store_remove_missing_key_is_ok() {
    let store = MemoryStore::new();
    assert!(store.remove_item("nope").is_ok());
}

// =============================================================
// FileStore
// =============================================================

#[test]
fn file_store_missing_file_reads_as_empty() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::in_dir(dir.path());
    assert_eq!(store.get_item("authData").unwrap(), None);
    assert!(store.remove_item("authData").is_ok());
    assert!(!store.path().exists());
}

#[test]
fn file_store_persists_across_instances() {
    let dir = tempfile::tempdir().unwrap();
    FileStore::in_dir(dir.path()).set_item("authToken", "tok").unwrap();

    let reopened = FileStore::in_dir(dir.path().to_path_buf());
    assert_eq!(reopened.get_item("authToken").unwrap().as_deref(), Some("tok"));
}

#[test]
fn file_store_remove_keeps_other_keys() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::in_dir(dir.path());
    store.set_item("a", "1").unwrap();
    store.set_item("b", "2").unwrap();
    store.remove_item("a").unwrap();
    assert_eq!(store.get_item("a").unwrap(), None);
    assert_eq!(store.get_item("b").unwrap().as_deref(), Some("2"));
}

#[test]
fn file_store_creates_nested_directory() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::in_dir(dir.path().join("nested").join("profile"));
    store.set_item("k", "v").unwrap();
    assert!(store.path().exists());
}

#[test]
fn file_store_reports_corrupt_file() {
    let dir = tempfile::tempdir().unwrap();
    let store = FileStore::in_dir(dir.path());
    std::fs::write(store.path(), "{not json").unwrap();
    assert!(matches!(store.get_item("k"), Err(StoreError::Corrupt(_))));
}
