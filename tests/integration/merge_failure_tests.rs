use filetime::FileTime;
use linkdupe::actions::merge::{LinkAction, LinkOps, MergeConfig, MergeError, Merger, OsLinkOps};
use linkdupe::duplicates::{group_candidates, match_contents, ContentGroup, MatcherConfig};
use linkdupe::report::{FailureKind, Outcome};
use linkdupe::scanner::{Hasher, Walker, WalkerConfig};
use std::cell::RefCell;
use std::fs::{self, Metadata};
use std::io;
use std::os::unix::fs::{MetadataExt, PermissionsExt};
use std::path::{Path, PathBuf};
use tempfile::tempdir;

fn content_groups(root: &Path) -> Vec<ContentGroup> {
    let catalog = Walker::new(root, WalkerConfig::default())
        .collect()
        .unwrap();
    let (candidates, _) = group_candidates(catalog.records);
    match_contents(candidates, &Hasher::new(), &MatcherConfig::default()).0
}

/// Delegates to the real filesystem but refuses every hardlink.
struct RefuseLinks {
    ops: RefCell<Vec<String>>,
}

impl RefuseLinks {
    fn new() -> Self {
        Self {
            ops: RefCell::new(Vec::new()),
        }
    }
}

impl LinkOps for RefuseLinks {
    fn exists(&self, path: &Path) -> io::Result<bool> {
        OsLinkOps.exists(path)
    }

    fn stat(&self, path: &Path) -> io::Result<Metadata> {
        OsLinkOps.stat(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        self.ops.borrow_mut().push(format!("rename {}", from.display()));
        OsLinkOps.rename(from, to)
    }

    fn hard_link(&self, _original: &Path, link: &Path) -> io::Result<()> {
        self.ops.borrow_mut().push(format!("link {}", link.display()));
        Err(io::Error::from(io::ErrorKind::PermissionDenied))
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        self.ops.borrow_mut().push(format!("remove {}", path.display()));
        OsLinkOps.remove_file(path)
    }
}

/// Counts every mutating call.
#[derive(Default)]
struct CountingOps {
    mutations: RefCell<usize>,
}

impl LinkOps for CountingOps {
    fn exists(&self, path: &Path) -> io::Result<bool> {
        OsLinkOps.exists(path)
    }

    fn stat(&self, path: &Path) -> io::Result<Metadata> {
        OsLinkOps.stat(path)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        *self.mutations.borrow_mut() += 1;
        OsLinkOps.rename(from, to)
    }

    fn hard_link(&self, original: &Path, link: &Path) -> io::Result<()> {
        *self.mutations.borrow_mut() += 1;
        OsLinkOps.hard_link(original, link)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        *self.mutations.borrow_mut() += 1;
        OsLinkOps.remove_file(path)
    }
}

#[test]
fn test_forced_link_failure_restores_content_and_mode() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a");
    let b = dir.path().join("b");
    fs::write(&a, b"precious").unwrap();
    fs::write(&b, b"precious").unwrap();
    fs::set_permissions(&a, fs::Permissions::from_mode(0o640)).unwrap();
    fs::set_permissions(&b, fs::Permissions::from_mode(0o640)).unwrap();
    let before = fs::metadata(&b).unwrap();

    let groups = content_groups(dir.path());
    let merger = Merger::with_ops(MergeConfig::default(), RefuseLinks::new());
    let summary = merger.merge_all(&groups);

    assert_eq!(summary.failed, 1);
    let after = fs::metadata(&b).unwrap();
    assert_eq!(fs::read(&b).unwrap(), b"precious");
    assert_eq!(after.ino(), before.ino());
    assert_eq!(after.mode() & 0o7777, 0o640);
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);

    let ops = merger.ops().ops.borrow().clone();
    assert_eq!(ops.len(), 3);
    assert!(ops[0].starts_with("rename"));
    assert!(ops[1].starts_with("link"));
    assert!(ops[2].starts_with("rename"));

    match &summary.outcomes[0] {
        Outcome::Failed { path, cause } => {
            assert_eq!(path, &b);
            assert_eq!(cause.kind, FailureKind::LinkFailed);
            assert!(cause.staged_path.is_none());
        }
        other => panic!("expected failure, got {other:?}"),
    }
}

#[test]
fn test_failure_does_not_stop_other_members() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("a"), b"one").unwrap();
    fs::write(dir.path().join("b"), b"one").unwrap();
    fs::write(dir.path().join("c"), b"one").unwrap();

    let groups = content_groups(dir.path());
    let summary = Merger::with_ops(MergeConfig::default(), RefuseLinks::new()).merge_all(&groups);

    assert_eq!(summary.failed, 2);
    assert_eq!(summary.outcomes.len(), 2);
}

#[test]
fn test_already_linked_pair_has_no_mutations() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a");
    fs::write(&a, b"linked").unwrap();
    fs::hard_link(&a, dir.path().join("b")).unwrap();

    let meta_a = fs::symlink_metadata(&a).unwrap();
    let meta_b = fs::symlink_metadata(dir.path().join("b")).unwrap();
    let rep = linkdupe::scanner::FileRecord::from_metadata(a.clone(), &meta_a);
    let member = linkdupe::scanner::FileRecord::from_metadata(dir.path().join("b"), &meta_b);

    let merger = Merger::with_ops(MergeConfig::default(), CountingOps::default());
    let action = merger.replace_with_link(&rep, &member).unwrap();

    assert_eq!(action, LinkAction::AlreadyLinked);
    assert_eq!(*merger.ops().mutations.borrow(), 0);
}

#[test]
fn test_touched_after_scan_is_left_alone() {
    let dir = tempdir().unwrap();
    let b = dir.path().join("b");
    fs::write(dir.path().join("a"), b"stable").unwrap();
    fs::write(&b, b"stable").unwrap();

    let groups = content_groups(dir.path());
    // Same size and content, only the mtime moves.
    filetime::set_file_mtime(&b, FileTime::from_unix_time(1_000_000, 0)).unwrap();

    let merger = Merger::with_ops(MergeConfig::default(), CountingOps::default());
    let summary = merger.merge_all(&groups);

    assert_eq!(summary.failed, 1);
    assert_eq!(*merger.ops().mutations.borrow(), 0);
    match &summary.outcomes[0] {
        Outcome::Failed { cause, .. } => assert_eq!(cause.kind, FailureKind::Modified),
        other => panic!("expected failure, got {other:?}"),
    }
}

#[test]
fn test_representative_replaced_after_scan() {
    let dir = tempdir().unwrap();
    let a = dir.path().join("a");
    fs::write(&a, b"orig").unwrap();
    fs::write(dir.path().join("b"), b"orig").unwrap();

    let groups = content_groups(dir.path());
    let replacement = dir.path().join("replacement");
    fs::write(&replacement, b"orig").unwrap();
    fs::rename(&replacement, &a).unwrap();

    let summary = Merger::new(MergeConfig::default()).merge_all(&groups);

    assert_eq!(summary.failed, 1);
    assert_eq!(summary.merged, 0);
}

#[test]
fn test_vanished_member_reports_modified() {
    let dir = tempdir().unwrap();
    let b = dir.path().join("b");
    fs::write(dir.path().join("a"), b"soon gone").unwrap();
    fs::write(&b, b"soon gone").unwrap();

    let groups = content_groups(dir.path());
    fs::remove_file(&b).unwrap();

    let summary = Merger::new(MergeConfig::default()).merge_all(&groups);
    assert_eq!(summary.failed, 1);
    assert!(!b.exists());
}

#[test]
fn test_merge_error_paths() {
    let err = MergeError::RestoreFailed {
        path: PathBuf::from("/d/b"),
        staged: PathBuf::from("/d/bXYZ"),
        source: io::Error::from(io::ErrorKind::Other),
    };
    assert_eq!(err.path(), Path::new("/d/b"));
    assert!(err.to_string().contains("/d/bXYZ"));
}
