use hardlinker::actions::{FileSnapshot, LinkError, Linker};
use hardlinker::dedup::{DedupConfig, DedupError, Deduplicator};
use hardlinker::scanner::{FileIdentity, HashError, InventoryBuilder, ScanError, WalkerConfig};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tempfile::TempDir;

fn create_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

/// Linker that refuses every target.
struct RefusingLinker;

impl Linker for RefusingLinker {
    fn replace_with_link(&self, _source: &Path, target: &FileSnapshot) -> Result<(), LinkError> {
        Err(LinkError::Modified(target.path.clone()))
    }
}

#[test]
fn test_missing_root_is_fatal() {
    let dir = TempDir::new().unwrap();
    let missing = dir.path().join("does-not-exist");

    let result = Deduplicator::with_defaults().dedup_paths(&[missing], WalkerConfig::default());

    match result {
        Err(DedupError::Scan(ScanError::NotFound(path))) => {
            assert!(path.ends_with("does-not-exist"));
        }
        other => panic!("Expected NotFound, got: {:?}", other.map(|(_, s)| s)),
    }
}

#[test]
fn test_missing_second_root_is_fatal() {
    let dir = TempDir::new().unwrap();
    create_file(dir.path(), "a", b"x");

    let result = Deduplicator::with_defaults().dedup_paths(
        &[dir.path().to_path_buf(), dir.path().join("nope")],
        WalkerConfig::default(),
    );
    assert!(matches!(result, Err(DedupError::Scan(ScanError::NotFound(_)))));
}

#[test]
fn test_link_failures_are_collected_and_run_continues() {
    let dir = TempDir::new().unwrap();
    create_file(dir.path(), "a", b"first");
    create_file(dir.path(), "b", b"first");
    create_file(dir.path(), "c", b"second!");
    create_file(dir.path(), "d", b"second!");

    let (_, summary) = Deduplicator::with_defaults()
        .with_linker(RefusingLinker)
        .dedup_paths(&[dir.path().to_path_buf()], WalkerConfig::default())
        .unwrap();

    assert_eq!(summary.link_failures.len(), 2);
    assert_eq!(summary.link_failures[0].source, dir.path().join("a"));
    assert_eq!(summary.link_failures[0].target, dir.path().join("b"));
    assert_eq!(summary.link_failures[1].target, dir.path().join("d"));
    assert_eq!(summary.files_linked, 0);
    assert_eq!(summary.reduced, 12);
    assert_eq!(summary.unlinked, 12);
    assert_eq!(summary.reclaimed(), 0);
    assert!(summary.has_failures());
}

#[test]
#[cfg(unix)]
fn test_file_deleted_after_inventory_is_skipped() {
    let dir = TempDir::new().unwrap();
    create_file(dir.path(), "a", b"content");
    let b = create_file(dir.path(), "b", b"content");
    create_file(dir.path(), "c", b"content");

    let (mut catalog, _) = InventoryBuilder::new(WalkerConfig::default())
        .build(&[dir.path().to_path_buf()])
        .unwrap();
    fs::remove_file(&b).unwrap();

    let summary = Deduplicator::with_defaults()
        .dedup_catalog(&mut catalog)
        .unwrap();

    assert_eq!(summary.files_linked, 1);
    assert_eq!(summary.reduced, 7);
    assert!(summary.hash_failures.iter().all(|f| f.path == b));
    assert!(!b.exists());
}

#[test]
#[cfg(target_os = "linux")]
fn test_unreadable_candidate_is_skipped_regardless_of_privileges() {
    let dir = TempDir::new().unwrap();
    let a = create_file(dir.path(), "a", b"content");
    let b = create_file(dir.path(), "b", b"content");
    let c = create_file(dir.path(), "c", b"content");

    let (mut catalog, _) = InventoryBuilder::new(WalkerConfig::default())
        .build(&[dir.path().to_path_buf()])
        .unwrap();
    // Opening a directory succeeds but reading it fails, even for root
    fs::remove_file(&b).unwrap();
    fs::create_dir(&b).unwrap();

    let summary = Deduplicator::with_defaults()
        .dedup_catalog(&mut catalog)
        .unwrap();

    // "b" is skipped as a candidate of "a", which still reaches "c"
    assert!(!summary.hash_failures.is_empty());
    assert!(summary.hash_failures.iter().all(|f| f.path == b));
    assert!(summary.link_failures.is_empty());
    assert_eq!(summary.files_linked, 1);
    assert_eq!(summary.reduced, 7);
    assert_eq!(
        FileIdentity::probe(&a).unwrap().unwrap(),
        FileIdentity::probe(&c).unwrap().unwrap()
    );
    assert!(b.is_dir());
}

#[test]
#[cfg(unix)]
fn test_file_modified_after_inventory_is_not_replaced() {
    let dir = TempDir::new().unwrap();
    create_file(dir.path(), "a", b"content");
    let b = create_file(dir.path(), "b", b"content");

    let (mut catalog, _) = InventoryBuilder::new(WalkerConfig::default())
        .build(&[dir.path().to_path_buf()])
        .unwrap();
    // Same content, but "b" is now a different file than the one inventoried
    fs::remove_file(&b).unwrap();
    fs::write(&b, b"content").unwrap();

    let summary = Deduplicator::with_defaults()
        .dedup_catalog(&mut catalog)
        .unwrap();

    // Either the hash was taken from the new file and the snapshot check
    // refused the replacement, or nothing changed at all.
    assert_eq!(summary.files_linked + summary.link_failures.len(), 1);
    assert_eq!(fs::read(&b).unwrap(), b"content");
}

#[test]
#[cfg(unix)]
fn test_unreadable_file_is_skipped() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    let a = create_file(dir.path(), "a", b"secret");
    create_file(dir.path(), "b", b"secret");
    create_file(dir.path(), "c", b"secret");
    fs::set_permissions(&a, fs::Permissions::from_mode(0o000)).unwrap();

    // Privileged users read regardless of mode bits
    if fs::read(&a).is_ok() {
        return;
    }

    let (_, summary) = Deduplicator::with_defaults()
        .dedup_paths(&[dir.path().to_path_buf()], WalkerConfig::default())
        .unwrap();

    fs::set_permissions(&a, fs::Permissions::from_mode(0o644)).unwrap();
    assert!(summary.hash_failures.iter().any(|f| f.path == a));
    // Round "a" is abandoned; "b" still becomes the canonical copy of "c"
    assert_eq!(summary.files_linked, 1);
    assert_eq!(summary.reduced, 6);
}

#[test]
#[cfg(unix)]
fn test_unreadable_directory_is_counted_not_fatal() {
    use std::os::unix::fs::PermissionsExt;

    let dir = TempDir::new().unwrap();
    create_file(dir.path(), "open/a", b"x");
    create_file(dir.path(), "locked/b", b"x");
    let locked = dir.path().join("locked");
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

    if fs::read_dir(&locked).is_ok() {
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
        return;
    }

    let result = InventoryBuilder::new(WalkerConfig::default()).build(&[dir.path().to_path_buf()]);
    fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

    let (catalog, stats) = result.unwrap();
    assert_eq!(catalog.len(), 1);
    assert_eq!(stats.permission_denied, 1);
}

#[test]
fn test_hash_error_kinds() {
    let dir = TempDir::new().unwrap();
    let err = hardlinker::scanner::Hasher::new()
        .hash_file(&dir.path().join("missing"))
        .unwrap_err();
    assert!(matches!(err, HashError::NotFound(_)));
}

#[test]
fn test_shutdown_before_run_interrupts() {
    let dir = TempDir::new().unwrap();
    create_file(dir.path(), "a", b"dup");
    create_file(dir.path(), "b", b"dup");

    let flag = Arc::new(AtomicBool::new(true));
    let result = Deduplicator::new(DedupConfig::default().with_shutdown_flag(flag))
        .dedup_paths(&[dir.path().to_path_buf()], WalkerConfig::default());

    assert!(matches!(result, Err(DedupError::Interrupted)));
    assert_ne!(
        fs::metadata(dir.path().join("a")).unwrap().len(),
        0,
        "files must be untouched"
    );
}
