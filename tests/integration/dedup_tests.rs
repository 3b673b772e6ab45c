use linkdupe::duplicates::{DedupConfig, Deduplicator};
use linkdupe::report::Outcome;
use linkdupe::scanner::WalkerConfig;
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn ino(path: &Path) -> u64 {
    fs::metadata(path).unwrap().ino()
}

fn snapshot(root: &Path) -> HashMap<PathBuf, Vec<u8>> {
    walkdir::WalkDir::new(root)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_file())
        .map(|e| (e.path().to_path_buf(), fs::read(e.path()).unwrap()))
        .collect()
}

#[test]
fn test_one_merge_for_two_identical_files() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a"), b"X").unwrap();
    fs::write(dir.path().join("b"), b"X").unwrap();
    fs::write(dir.path().join("c"), b"Y").unwrap();

    let report = linkdupe::deduplicate(dir.path()).unwrap();

    assert_eq!(report.merge_count(), 1);
    assert_eq!(report.failure_count(), 0);
    assert_eq!(ino(&dir.path().join("a")), ino(&dir.path().join("b")));
    assert_ne!(ino(&dir.path().join("a")), ino(&dir.path().join("c")));

    match report.merges().next().unwrap() {
        Outcome::Merged {
            path,
            representative,
            inode_freed,
            ..
        } => {
            assert_eq!(path, &dir.path().join("b"));
            assert_eq!(representative, &dir.path().join("a"));
            assert!(inode_freed);
        }
        other => panic!("expected merge, got {other:?}"),
    };
}

#[test]
fn test_permission_mismatch_not_merged() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a");
    let b = dir.path().join("b");
    fs::write(&a, b"same content").unwrap();
    fs::write(&b, b"same content").unwrap();
    fs::set_permissions(&a, fs::Permissions::from_mode(0o644)).unwrap();
    fs::set_permissions(&b, fs::Permissions::from_mode(0o600)).unwrap();

    let report = linkdupe::deduplicate(dir.path()).unwrap();

    assert_eq!(report.stats.candidate_groups, 0);
    assert_eq!(report.stats.files_hashed, 0);
    assert_eq!(report.merge_count(), 0);
    assert_ne!(ino(&a), ino(&b));
}

#[test]
fn test_nested_directories_merged() {
    let dir = tempdir().unwrap();
    fs::create_dir_all(dir.path().join("x/y")).unwrap();
    fs::create_dir_all(dir.path().join("z")).unwrap();
    for rel in ["top.bin", "x/one.bin", "x/y/two.bin", "z/three.bin"] {
        File::create(dir.path().join(rel))
            .unwrap()
            .write_all(&[7u8; 4096])
            .unwrap();
    }

    let report = linkdupe::deduplicate(dir.path()).unwrap();

    assert_eq!(report.stats.merged, 3);
    assert_eq!(report.stats.bytes_reclaimed, 3 * 4096);
    let first = ino(&dir.path().join("top.bin"));
    for rel in ["x/one.bin", "x/y/two.bin", "z/three.bin"] {
        assert_eq!(ino(&dir.path().join(rel)), first);
    }
}

#[test]
fn test_no_data_loss() {
    let dir = tempdir().unwrap();
    fs::create_dir(dir.path().join("sub")).unwrap();
    fs::write(dir.path().join("a"), b"alpha").unwrap();
    fs::write(dir.path().join("b"), b"alpha").unwrap();
    fs::write(dir.path().join("c"), b"gamma").unwrap();
    fs::write(dir.path().join("sub/a"), b"alpha").unwrap();
    fs::write(dir.path().join("sub/d"), b"delta-long").unwrap();
    fs::write(dir.path().join("sub/e"), b"").unwrap();
    fs::write(dir.path().join("f"), b"").unwrap();

    let before = snapshot(dir.path());
    linkdupe::deduplicate(dir.path()).unwrap();
    let after = snapshot(dir.path());

    assert_eq!(before, after);
}

#[test]
fn test_idempotent() {
    let dir = tempdir().unwrap();
    for i in 0..5 {
        fs::write(dir.path().join(format!("copy{i}")), b"repeated").unwrap();
    }
    fs::write(dir.path().join("unique"), b"different").unwrap();

    let first = linkdupe::deduplicate(dir.path()).unwrap();
    let second = linkdupe::deduplicate(dir.path()).unwrap();

    assert_eq!(first.stats.merged, 4);
    assert_eq!(second.stats.merged, 0);
    assert_eq!(second.failure_count(), 0);
}

#[test]
fn test_partially_linked_group() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a");
    let b = dir.path().join("b");
    let c = dir.path().join("c");
    fs::write(&a, b"data").unwrap();
    fs::hard_link(&a, &b).unwrap();
    fs::write(&c, b"data").unwrap();

    let report = linkdupe::deduplicate(dir.path()).unwrap();

    assert_eq!(report.stats.linked_paths_skipped, 1);
    assert_eq!(report.stats.merged, 1);
    assert_eq!(ino(&a), ino(&c));
    assert_eq!(fs::metadata(&a).unwrap().nlink(), 3);
}

#[test]
fn test_linked_member_relinks_every_path() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a");
    let b = dir.path().join("b");
    let c = dir.path().join("c");
    fs::write(&a, b"data").unwrap();
    fs::write(&b, b"data").unwrap();
    fs::hard_link(&b, &c).unwrap();

    let first = linkdupe::deduplicate(dir.path()).unwrap();

    assert_eq!(first.stats.merged, 2);
    assert_eq!(first.stats.failures, 0);
    assert_eq!(first.stats.bytes_reclaimed, 4);
    assert_eq!(ino(&a), ino(&b));
    assert_eq!(ino(&a), ino(&c));
    assert_eq!(fs::metadata(&a).unwrap().nlink(), 3);
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 3);

    let second = linkdupe::deduplicate(dir.path()).unwrap();
    assert_eq!(second.stats.merged, 0);
    assert_eq!(second.stats.failures, 0);
}

#[test]
fn test_multiply_linked_member_does_not_free_inode() {
    let dir = tempdir().unwrap();
    let outside = tempdir().unwrap();
    let a = dir.path().join("a");
    let b = dir.path().join("b");
    fs::write(&a, b"shared bytes").unwrap();
    fs::write(&b, b"shared bytes").unwrap();
    // Extra link outside the tree keeps b's inode alive.
    fs::hard_link(&b, outside.path().join("keep")).unwrap();

    let report = linkdupe::deduplicate(dir.path()).unwrap();

    assert_eq!(report.stats.merged, 1);
    assert_eq!(report.stats.bytes_reclaimed, 0);
    match report.merges().next().unwrap() {
        Outcome::Merged { inode_freed, .. } => assert!(!inode_freed),
        other => panic!("expected merge, got {other:?}"),
    }
    assert_eq!(fs::read(outside.path().join("keep")).unwrap(), b"shared bytes");
}

#[test]
fn test_empty_files_merged_unless_skipped() {
    let dir = tempdir().unwrap();
    File::create(dir.path().join("e1")).unwrap();
    File::create(dir.path().join("e2")).unwrap();

    let skip = DedupConfig::default().with_walker_config(WalkerConfig::default().with_skip_empty(true));
    let report = Deduplicator::new(skip).deduplicate(dir.path()).unwrap();
    assert_eq!(report.stats.files_scanned, 0);
    assert_ne!(ino(&dir.path().join("e1")), ino(&dir.path().join("e2")));

    let report = linkdupe::deduplicate(dir.path()).unwrap();
    assert_eq!(report.stats.merged, 1);
    assert_eq!(ino(&dir.path().join("e1")), ino(&dir.path().join("e2")));
}

#[test]
fn test_dry_run_changes_nothing() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a"), b"dup").unwrap();
    fs::write(dir.path().join("b"), b"dup").unwrap();
    let before = (ino(&dir.path().join("a")), ino(&dir.path().join("b")));

    let report = Deduplicator::new(DedupConfig::default().with_dry_run(true))
        .deduplicate(dir.path())
        .unwrap();

    assert_eq!(report.stats.planned, 1);
    assert_eq!(report.stats.merged, 0);
    assert_eq!(
        before,
        (ino(&dir.path().join("a")), ino(&dir.path().join("b")))
    );
}

#[test]
fn test_single_io_thread_matches_many() {
    let dir = tempdir().unwrap();
    for group in 0..6 {
        for copy in 0..3 {
            fs::write(
                dir.path().join(format!("g{group}_{copy}")),
                format!("content of group {group}").repeat(group + 1),
            )
            .unwrap();
        }
    }

    let report = Deduplicator::new(DedupConfig::default().with_io_threads(1).with_dry_run(true))
        .deduplicate(dir.path())
        .unwrap();
    let parallel = Deduplicator::new(DedupConfig::default().with_io_threads(8).with_dry_run(true))
        .deduplicate(dir.path())
        .unwrap();

    assert_eq!(report.stats.content_groups, 6);
    assert_eq!(report.outcomes, parallel.outcomes);
}
