//! Escalation out of protected and obstructed states.

#![cfg(unix)]

use std::fs;
use std::os::unix::fs::PermissionsExt;

use engine::{DeleteOptions, ErrorKind, StrategyKind, TaskStatus, delete_path, verify_removed};

#[test]
fn file_under_readonly_directory_recovers_via_reset() {
    let temp = tempfile::tempdir().expect("tempdir");
    let root = temp.path().join("tree");
    let guard = root.join("guard");
    fs::create_dir_all(&guard).expect("mkdir");
    fs::write(guard.join("trapped.txt"), b"data").expect("write");
    // Without the write bit on the directory, its children cannot be
    // unlinked until a protection reset restores it.
    fs::set_permissions(&guard, fs::Permissions::from_mode(0o555)).expect("chmod");

    let report = delete_path(&root, &DeleteOptions::new()).expect("delete");

    assert!(report.is_complete_success());
    assert!(!root.exists());

    let trapped = report
        .results()
        .iter()
        .find(|r| r.path().ends_with("trapped.txt"))
        .expect("trapped file result");
    assert_eq!(trapped.status(), TaskStatus::Succeeded);

    let outcomes = trapped.outcomes();
    assert_eq!(outcomes[0].strategy(), StrategyKind::DirectRemove);
    assert_eq!(outcomes[0].error(), Some(ErrorKind::AttributeProtected));
    let winner = outcomes.last().expect("at least one attempt");
    assert!(winner.succeeded());
    assert_eq!(winner.strategy(), StrategyKind::ResetAndRetry);
}

#[test]
fn deeply_nested_readonly_directories_are_removed() {
    let temp = tempfile::tempdir().expect("tempdir");
    let root = temp.path().join("tree");
    let mut current = root.clone();
    for depth in 0..5 {
        current = current.join(format!("level-{depth}"));
    }
    fs::create_dir_all(&current).expect("mkdir");
    fs::write(current.join("leaf.txt"), b"x").expect("write");

    // Lock every level read-only, deepest first so the chmods succeed.
    let mut lock = current.clone();
    loop {
        fs::set_permissions(&lock, fs::Permissions::from_mode(0o555)).expect("chmod");
        if lock == root {
            break;
        }
        lock = lock.parent().expect("parent").to_path_buf();
    }

    let report = delete_path(&root, &DeleteOptions::new()).expect("delete");
    assert!(report.is_complete_success());
    assert!(!root.exists());
}

#[test]
fn open_file_handle_does_not_block_deletion() {
    let temp = tempfile::tempdir().expect("tempdir");
    let root = temp.path().join("tree");
    fs::create_dir(&root).expect("mkdir");
    let held = root.join("held.bin");
    fs::write(&held, vec![0_u8; 1024]).expect("write");

    // POSIX permits unlinking an open file; the handle keeps the inode
    // alive but the name disappears on the first rung.
    let handle = fs::File::open(&held).expect("open");
    let report = delete_path(&root, &DeleteOptions::new()).expect("delete");
    drop(handle);

    assert!(report.is_complete_success());
    assert!(!root.exists());
}

#[test]
fn verification_sweep_converges_on_a_leftover_tree() {
    let temp = tempfile::tempdir().expect("tempdir");
    let root = temp.path().join("leftovers");
    fs::create_dir_all(root.join("inner")).expect("mkdir");
    fs::write(root.join("inner/file.txt"), b"data").expect("write");
    fs::set_permissions(root.join("inner"), fs::Permissions::from_mode(0o555)).expect("chmod");

    assert!(verify_removed(&root, 3).expect("verify"));
    assert!(!root.exists());
}

#[test]
fn verification_of_a_missing_root_is_true() {
    let temp = tempfile::tempdir().expect("tempdir");
    assert!(verify_removed(temp.path().join("gone"), 1).expect("verify"));
}
