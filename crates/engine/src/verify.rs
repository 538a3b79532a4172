//! Post-run verification.
//!
//! After the pool drains, the root is re-walked and residual entries are
//! re-attempted with protections reset first. Passes repeat up to the
//! configured limit; the loop exits early the moment the root is gone.
//! Verification never trusts task bookkeeping: only an existence check on
//! the real filesystem counts.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use walk::WalkBuilder;

use crate::entry_is_gone;
use crate::lockbreak::LockBreakerSession;

pub(crate) struct VerifyOutcome {
    /// The root and everything under it is confirmed gone.
    pub(crate) converged: bool,
    /// Entries still present after the final pass.
    pub(crate) residuals: Vec<PathBuf>,
}

pub(crate) fn verify(
    root: &Path,
    session: &LockBreakerSession,
    max_passes: usize,
) -> VerifyOutcome {
    let mut residuals = vec![root.to_path_buf()];
    for pass in 1..=max_passes.max(1) {
        residuals = sweep(root, session);
        if residuals.is_empty() {
            tracing::debug!(pass, root = %root.display(), "verification converged");
            return VerifyOutcome {
                converged: true,
                residuals,
            };
        }
        tracing::debug!(
            pass,
            remaining = residuals.len(),
            root = %root.display(),
            "verification pass left residual entries"
        );
    }
    VerifyOutcome {
        converged: false,
        residuals,
    }
}

/// One cleanup pass. Returns the entries still present afterwards.
fn sweep(root: &Path, session: &LockBreakerSession) -> Vec<PathBuf> {
    match fs::symlink_metadata(root) {
        Err(error) if error.kind() == io::ErrorKind::NotFound => return Vec::new(),
        Err(_) => return vec![root.to_path_buf()],
        Ok(metadata) if !metadata.is_dir() => {
            session.reset_protections(root);
            let _ = fs::remove_file(root);
            return if entry_is_gone(root) {
                Vec::new()
            } else {
                vec![root.to_path_buf()]
            };
        }
        Ok(_) => {}
    }

    let mut residuals = Vec::new();
    match WalkBuilder::new(root).include_root(false).build() {
        Ok(walker) => {
            for entry in walker {
                let Ok(entry) = entry else {
                    // An unreadable subtree leaves the root unverifiable.
                    residuals.push(root.to_path_buf());
                    break;
                };
                let path = entry.full_path().to_path_buf();
                session.reset_protections(&path);
                let removed = match entry.kind() {
                    walk::EntryKind::File => fs::remove_file(&path).is_ok(),
                    walk::EntryKind::Directory => fs::remove_dir(&path).is_ok(),
                };
                if !removed && !entry_is_gone(&path) {
                    residuals.push(path);
                }
            }
        }
        Err(_) => residuals.push(root.to_path_buf()),
    }

    if residuals.is_empty() {
        session.reset_protections(root);
        if fs::remove_dir(root).is_err() && !entry_is_gone(root) {
            residuals.push(root.to_path_buf());
        }
    }
    residuals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::DeleteOptions;

    #[test]
    fn missing_root_converges_immediately() {
        let temp = tempfile::tempdir().expect("tempdir");
        let session = LockBreakerSession::new(&DeleteOptions::new());
        let outcome = verify(&temp.path().join("missing"), &session, 3);
        assert!(outcome.converged);
        assert!(outcome.residuals.is_empty());
    }

    #[test]
    fn leftover_tree_is_swept_clean() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path().join("leftovers");
        fs::create_dir_all(root.join("inner")).expect("mkdir");
        fs::write(root.join("inner/file.txt"), b"data").expect("write");

        let session = LockBreakerSession::new(&DeleteOptions::new());
        let outcome = verify(&root, &session, 3);
        assert!(outcome.converged);
        assert!(!root.exists());
    }

    #[cfg(unix)]
    #[test]
    fn readonly_directory_contents_converge() {
        use std::os::unix::fs::PermissionsExt;

        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path().join("guarded");
        fs::create_dir_all(root.join("inner")).expect("mkdir");
        fs::write(root.join("inner/file.txt"), b"data").expect("write");
        // Read-only directory: children cannot be unlinked until the
        // protection reset restores the write bit.
        fs::set_permissions(root.join("inner"), fs::Permissions::from_mode(0o555))
            .expect("chmod");

        let session = LockBreakerSession::new(&DeleteOptions::new());
        let outcome = verify(&root, &session, 3);
        assert!(outcome.converged);
        assert!(!root.exists());
    }

    #[test]
    fn file_root_is_removed() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path().join("single.txt");
        fs::write(&root, b"data").expect("write");

        let session = LockBreakerSession::new(&DeleteOptions::new());
        let outcome = verify(&root, &session, 1);
        assert!(outcome.converged);
        assert!(!root.exists());
    }
}
