use clap::Parser;
use hardlinker::cli::Cli;
use hardlinker::error::{ExitCode, StructuredError};
use hardlinker::run_app;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

fn create_file(dir: &Path, name: &str, content: &[u8]) {
    let path = dir.join(name);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    fs::write(path, content).unwrap();
}

fn cli(args: &[&str]) -> Cli {
    let mut argv = vec!["hardlinker"];
    argv.extend_from_slice(args);
    Cli::try_parse_from(argv).unwrap()
}

#[test]
#[cfg(unix)]
fn test_run_app_links_duplicates() {
    use std::os::unix::fs::MetadataExt;

    let dir = TempDir::new().unwrap();
    create_file(dir.path(), "a", b"dup");
    create_file(dir.path(), "b", b"dup");
    let root = dir.path().to_string_lossy().into_owned();

    let code = run_app(cli(&["-q", &root])).unwrap();

    assert_eq!(code, ExitCode::Success);
    assert_eq!(fs::metadata(dir.path().join("a")).unwrap().nlink(), 2);
}

#[test]
#[cfg(unix)]
fn test_run_app_simulate_leaves_tree() {
    use std::os::unix::fs::MetadataExt;

    let dir = TempDir::new().unwrap();
    create_file(dir.path(), "a", b"dup");
    create_file(dir.path(), "b", b"dup");
    let root = dir.path().to_string_lossy().into_owned();

    let code = run_app(cli(&["--simulate", "--output", "json", &root])).unwrap();

    assert_eq!(code, ExitCode::Success);
    assert_eq!(fs::metadata(dir.path().join("a")).unwrap().nlink(), 1);
}

#[test]
fn test_run_app_with_exclude() {
    let dir = TempDir::new().unwrap();
    create_file(dir.path(), "a.py", b"dup");
    create_file(dir.path(), "b.py", b"dup");
    let root = dir.path().to_string_lossy().into_owned();

    let code = run_app(cli(&["-q", r"--exclude=\.py$", &root])).unwrap();
    assert_eq!(code, ExitCode::Success);
}

#[test]
fn test_run_app_missing_root_is_general_error() {
    let dir = TempDir::new().unwrap();
    let root = dir.path().join("missing").to_string_lossy().into_owned();

    let err = run_app(cli(&["-q", &root])).unwrap_err();
    let code = ExitCode::for_error(&err);
    assert_eq!(code, ExitCode::GeneralError);

    let structured = StructuredError::new(&err, code);
    assert_eq!(structured.code, "HL001");
    assert!(structured.message.contains("missing"));
    assert!(!structured.interrupted);
}
