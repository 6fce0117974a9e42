#![cfg(unix)]

use hardlinker::dedup::{DedupConfig, Deduplicator};
use hardlinker::scanner::{FileIdentity, WalkerConfig};
use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn create_file(dir: &Path, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(&path, content).unwrap();
    path
}

fn identity(path: &Path) -> FileIdentity {
    FileIdentity::probe(path).unwrap().unwrap()
}

fn run(roots: &[PathBuf]) -> hardlinker::dedup::DedupSummary {
    Deduplicator::new(DedupConfig::default())
        .dedup_paths(roots, WalkerConfig::default())
        .unwrap()
        .1
}

#[test]
fn test_hello_world_tree() {
    let dir = TempDir::new().unwrap();
    let f1 = create_file(dir.path(), "d/f1", b"hello");
    let f2 = create_file(dir.path(), "d/f2", b"hello");
    let f3 = create_file(dir.path(), "d/f3", b"world");

    let summary = run(&[dir.path().join("d")]);

    assert_eq!(identity(&f1), identity(&f2));
    assert_ne!(identity(&f1), identity(&f3));
    assert_eq!(fs::metadata(&f1).unwrap().nlink(), 2);
    assert_eq!(fs::metadata(&f3).unwrap().nlink(), 1);
    assert_eq!(summary.inventory.files, 3);
    assert_eq!(summary.reduced, 5);
    assert_eq!(summary.files_linked, 1);
}

#[test]
fn test_contents_preserved_after_linking() {
    let dir = TempDir::new().unwrap();
    let content: Vec<u8> = (0..300_000u32).map(|i| (i % 251) as u8).collect();
    let a = create_file(dir.path(), "a.bin", &content);
    let b = create_file(dir.path(), "nested/deeper/b.bin", &content);

    let summary = run(&[dir.path().to_path_buf()]);

    assert_eq!(identity(&a), identity(&b));
    assert_eq!(fs::read(&b).unwrap(), content);
    assert_eq!(summary.reduced, content.len() as u64);
}

#[test]
fn test_canonical_survivor_is_lexicographically_first() {
    let dir = TempDir::new().unwrap();
    // Created in reverse order so creation order cannot explain the result
    let z = create_file(dir.path(), "c/z", b"same");
    let y = create_file(dir.path(), "b/y", b"same");
    let x = create_file(dir.path(), "a/x", b"same");
    let original = identity(&x);

    let summary = run(&[dir.path().to_path_buf()]);

    assert_eq!(identity(&x), original);
    assert_eq!(identity(&y), original);
    assert_eq!(identity(&z), original);
    assert_eq!(summary.files_linked, 2);
    assert_eq!(summary.reduced, 8);
}

#[test]
fn test_survivor_follows_string_order_not_component_order() {
    let dir = TempDir::new().unwrap();
    let nested = create_file(dir.path(), "a/x", b"same");
    let sibling = create_file(dir.path(), "a.txt", b"same");
    let original = identity(&sibling);

    let summary = run(&[dir.path().to_path_buf()]);

    // "a.txt" < "a/x" as strings, so its inode is the one kept
    assert_eq!(identity(&sibling), original);
    assert_eq!(identity(&nested), original);
    assert_eq!(summary.files_linked, 1);
}

#[test]
fn test_multiple_roots_share_one_catalog() {
    let dir = TempDir::new().unwrap();
    let a = create_file(dir.path(), "left/file", b"shared content");
    let b = create_file(dir.path(), "right/file", b"shared content");

    let summary = run(&[dir.path().join("right"), dir.path().join("left")]);

    assert_eq!(identity(&a), identity(&b));
    assert_eq!(summary.inventory.files, 2);
    // "left/file" sorts first and survives
    assert_eq!(fs::metadata(&a).unwrap().nlink(), 2);
}

#[test]
fn test_overlapping_roots_do_not_double_count() {
    let dir = TempDir::new().unwrap();
    create_file(dir.path(), "sub/a", b"dup");
    create_file(dir.path(), "sub/b", b"dup");

    let summary = run(&[dir.path().to_path_buf(), dir.path().join("sub")]);

    assert_eq!(summary.inventory.files, 2);
    assert_eq!(summary.reduced, 3);
}

#[test]
fn test_file_root_is_accepted() {
    let dir = TempDir::new().unwrap();
    let a = create_file(dir.path(), "a", b"lonely");

    let summary = run(&[a]);

    assert_eq!(summary.inventory.files, 1);
    assert_eq!(summary.reduced, 0);
}

#[test]
fn test_zero_byte_files_are_not_linked() {
    let dir = TempDir::new().unwrap();
    let a = create_file(dir.path(), "a", b"");
    let b = create_file(dir.path(), "b", b"");

    let summary = run(&[dir.path().to_path_buf()]);

    assert_ne!(identity(&a), identity(&b));
    assert_eq!(summary.files_linked, 0);
    assert_eq!(summary.files_hashed, 0);
}

#[test]
fn test_same_size_different_content() {
    let dir = TempDir::new().unwrap();
    let a = create_file(dir.path(), "a", b"1234");
    let b = create_file(dir.path(), "b", b"5678");

    let summary = run(&[dir.path().to_path_buf()]);

    assert_ne!(identity(&a), identity(&b));
    assert_eq!(summary.comparisons, 1);
    assert_eq!(summary.files_hashed, 2);
    assert_eq!(summary.reduced, 0);
}

#[test]
fn test_second_run_is_a_no_op() {
    let dir = TempDir::new().unwrap();
    create_file(dir.path(), "a", b"repeat");
    create_file(dir.path(), "b", b"repeat");
    create_file(dir.path(), "c", b"repeat");
    create_file(dir.path(), "d", b"unique");

    let first = run(&[dir.path().to_path_buf()]);
    assert_eq!(first.reduced, 12);

    let second = run(&[dir.path().to_path_buf()]);
    assert_eq!(second.reduced, 0);
    assert_eq!(second.files_linked, 0);
    assert_eq!(second.files_hashed, 0);
}

#[test]
fn test_preexisting_hardlinks_counted_once() {
    let dir = TempDir::new().unwrap();
    let a = create_file(dir.path(), "a", b"12345678");
    let b = create_file(dir.path(), "b", b"12345678");
    let c = dir.path().join("c");
    fs::hard_link(&b, &c).unwrap();

    let summary = run(&[dir.path().to_path_buf()]);

    assert_eq!(identity(&a), identity(&c));
    assert_eq!(fs::metadata(&a).unwrap().nlink(), 3);
    assert_eq!(summary.reduced, 8);
    assert_eq!(summary.files_hashed, 2);
}

#[test]
fn test_symlinks_are_left_alone() {
    let dir = TempDir::new().unwrap();
    let a = create_file(dir.path(), "a", b"target");
    let link = dir.path().join("b");
    std::os::unix::fs::symlink(&a, &link).unwrap();

    let summary = run(&[dir.path().to_path_buf()]);

    assert!(fs::symlink_metadata(&link).unwrap().file_type().is_symlink());
    assert_eq!(summary.inventory.files, 1);
    assert_eq!(summary.inventory.symlinks, 1);
}

#[test]
fn test_recycle_bin_is_pruned() {
    let dir = TempDir::new().unwrap();
    let a = create_file(dir.path(), "a", b"deleted later");
    let trashed = create_file(dir.path(), "$RECYCLE.BIN/S-1-5/a", b"deleted later");

    let summary = run(&[dir.path().to_path_buf()]);

    assert_ne!(identity(&a), identity(&trashed));
    assert_eq!(summary.inventory.files, 1);
    assert_eq!(summary.inventory.trash_pruned, 1);
}

#[test]
fn test_no_temporary_files_left_behind() {
    let dir = TempDir::new().unwrap();
    create_file(dir.path(), "a", b"dup");
    create_file(dir.path(), "b", b"dup");
    create_file(dir.path(), "c", b"dup");

    run(&[dir.path().to_path_buf()]);

    let mut names: Vec<String> = fs::read_dir(dir.path())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, vec!["a", "b", "c"]);
}
