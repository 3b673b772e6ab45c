use clap::Parser;
use linkdupe::cli::Cli;
use linkdupe::error::{ExitCode, StructuredError};
use std::fs;
use std::os::unix::fs::MetadataExt;
use std::path::Path;
use tempfile::tempdir;

fn cli(args: &[&str], root: &Path, config: &Path) -> Cli {
    let mut argv = vec!["linkdupe", "-q", "--no-progress", "--config"];
    argv.push(config.to_str().unwrap());
    argv.extend_from_slice(args);
    argv.push(root.to_str().unwrap());
    Cli::try_parse_from(argv).unwrap()
}

fn empty_config(dir: &Path) -> std::path::PathBuf {
    let path = dir.join("linkdupe.toml");
    fs::write(&path, "").unwrap();
    path
}

#[test]
fn test_run_app_success() {
    let dir = tempdir().unwrap();
    let conf = tempdir().unwrap();
    fs::write(dir.path().join("a"), b"dup").unwrap();
    fs::write(dir.path().join("b"), b"dup").unwrap();

    let code = linkdupe::run_app(cli(&[], dir.path(), &empty_config(conf.path()))).unwrap();

    assert_eq!(code, ExitCode::Success);
    assert_eq!(
        fs::metadata(dir.path().join("a")).unwrap().ino(),
        fs::metadata(dir.path().join("b")).unwrap().ino()
    );
}

#[test]
fn test_run_app_dry_run_json() {
    let dir = tempdir().unwrap();
    let conf = tempdir().unwrap();
    fs::write(dir.path().join("a"), b"dup").unwrap();
    fs::write(dir.path().join("b"), b"dup").unwrap();

    let code = linkdupe::run_app(cli(
        &["--dry-run", "--output", "json"],
        dir.path(),
        &empty_config(conf.path()),
    ))
    .unwrap();

    assert_eq!(code, ExitCode::Success);
    assert_ne!(
        fs::metadata(dir.path().join("a")).unwrap().ino(),
        fs::metadata(dir.path().join("b")).unwrap().ino()
    );
}

#[test]
fn test_run_app_not_a_directory() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("file");
    fs::write(&file, b"x").unwrap();

    let err = linkdupe::run_app(cli(&[], &file, &empty_config(dir.path()))).unwrap_err();
    let structured = StructuredError::new(&err, ExitCode::GeneralError);

    assert_eq!(structured.code, "LD001");
    assert_eq!(structured.exit_code, 1);
    assert!(structured.message.contains("Not a directory"));
}

#[test]
fn test_run_app_missing_config_file() {
    let dir = tempdir().unwrap();
    let missing = dir.path().join("missing.toml");

    let result = linkdupe::run_app(cli(&[], dir.path(), &missing));
    assert!(result.is_err());
}

#[test]
fn test_run_app_zero_threads_rejected() {
    let dir = tempdir().unwrap();
    let conf = tempdir().unwrap();
    let result = linkdupe::run_app(cli(
        &["--io-threads", "0"],
        dir.path(),
        &empty_config(conf.path()),
    ));
    assert!(result.is_err());
}
