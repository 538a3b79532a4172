#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

//! # Overview
//!
//! `walk` provides the bottom-up filesystem traversal used by the
//! forced-deletion engine when building its task list. The walker enumerates
//! regular files, directories, and symbolic links in **post-order**: every
//! descendant of a directory is yielded strictly before the directory itself,
//! and the traversal root is yielded last. This matches the deletion
//! requirement that a directory is only attempted once all of its enumerated
//! children have been attempted.
//!
//! # Design
//!
//! - [`WalkBuilder`] configures traversal options such as whether the root
//!   entry should be emitted.
//! - [`Walker`] implements [`Iterator`] and yields [`WalkEntry`] values in
//!   post-order. Directory entries are sorted lexicographically before being
//!   descended into, keeping the sequence deterministic regardless of the
//!   underlying filesystem's iteration order.
//! - [`WalkError`] describes I/O failures encountered while querying metadata
//!   or reading directories. Errors capture the offending path so higher
//!   layers can surface actionable diagnostics.
//!
//! # Invariants
//!
//! - Every non-root entry is yielded strictly before its parent directory.
//! - Symbolic links are reported with their own metadata and are never
//!   followed, so a link to a directory is classified as [`EntryKind::File`]
//!   (it is removed by unlinking the link, not its target).
//! - Entries that vanish between directory listing and metadata inspection
//!   are skipped silently; concurrent removal is not an error for a deleter.
//! - Traversal never panics; unexpected filesystem failures are reported via
//!   [`WalkError`].
//!
//! # Examples
//!
//! ```
//! use walk::WalkBuilder;
//! use std::fs;
//!
//! # fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let temp = tempfile::tempdir()?;
//! let root = temp.path().join("tree");
//! fs::create_dir_all(root.join("nested"))?;
//! fs::write(root.join("nested/file.txt"), b"data")?;
//!
//! let mut paths = Vec::new();
//! for entry in WalkBuilder::new(&root).build()? {
//!     paths.push(entry?.full_path().to_path_buf());
//! }
//!
//! // Children come first, the root comes last.
//! assert_eq!(paths[0], root.join("nested/file.txt"));
//! assert_eq!(paths[1], root.join("nested"));
//! assert_eq!(paths[2], root);
//! # Ok(())
//! # }
//! # demo().unwrap();
//! ```

mod error;

pub use error::{WalkError, WalkErrorKind};

use std::ffi::OsString;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// Classification of a filesystem entry for deletion purposes.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum EntryKind {
    /// Anything removed by unlinking: regular files, symlinks, specials.
    File,
    /// A real directory (not a symlink to one), removed once empty.
    Directory,
}

/// Configures a bottom-up traversal rooted at a specific path.
#[derive(Clone, Debug)]
pub struct WalkBuilder {
    root: PathBuf,
    include_root: bool,
}

impl WalkBuilder {
    /// Creates a new builder that will traverse the provided root path.
    #[must_use]
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self {
            root: root.into(),
            include_root: true,
        }
    }

    /// Controls whether the root entry itself should be included in the
    /// output. When disabled, traversal yields only the root's descendants.
    #[must_use]
    pub const fn include_root(mut self, include: bool) -> Self {
        self.include_root = include;
        self
    }

    /// Builds a [`Walker`] using the configured options.
    pub fn build(self) -> Result<Walker, WalkError> {
        let root = absolutize(self.root)?;
        let metadata = fs::symlink_metadata(&root)
            .map_err(|error| WalkError::root_metadata(root.clone(), error))?;

        let mut walker = Walker {
            include_root: self.include_root,
            stack: Vec::new(),
            single: None,
            finished: false,
        };

        if metadata.file_type().is_dir() {
            walker.stack.push(DirectoryState::new(root, 0)?);
        } else if self.include_root {
            let size_bytes = if metadata.file_type().is_file() {
                metadata.len()
            } else {
                0
            };
            walker.single = Some(WalkEntry {
                full_path: root,
                kind: EntryKind::File,
                size_bytes,
                depth: 0,
                is_root: true,
            });
        } else {
            walker.finished = true;
        }

        Ok(walker)
    }
}

/// Post-order iterator over filesystem entries.
pub struct Walker {
    include_root: bool,
    stack: Vec<DirectoryState>,
    single: Option<WalkEntry>,
    finished: bool,
}

enum Step {
    Descend(PathBuf, usize),
    Emit(WalkEntry),
    Skip,
    Fail(WalkError),
}

impl Walker {
    fn classify_child(full_path: PathBuf, depth: usize) -> Step {
        match fs::symlink_metadata(&full_path) {
            Ok(metadata) => {
                if metadata.file_type().is_dir() {
                    Step::Descend(full_path, depth)
                } else {
                    let size_bytes = if metadata.file_type().is_file() {
                        metadata.len()
                    } else {
                        0
                    };
                    Step::Emit(WalkEntry {
                        full_path,
                        kind: EntryKind::File,
                        size_bytes,
                        depth,
                        is_root: false,
                    })
                }
            }
            // Another worker or process already removed the entry.
            Err(error) if error.kind() == io::ErrorKind::NotFound => Step::Skip,
            Err(error) => Step::Fail(WalkError::metadata(full_path, error)),
        }
    }
}

impl Iterator for Walker {
    type Item = Result<WalkEntry, WalkError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }

        if let Some(entry) = self.single.take() {
            self.finished = true;
            return Some(Ok(entry));
        }

        loop {
            let next_child = {
                let state = match self.stack.last_mut() {
                    Some(state) => state,
                    None => {
                        self.finished = true;
                        return None;
                    }
                };
                state
                    .next_name()
                    .map(|name| (state.fs_path.join(name), state.depth + 1))
            };

            let Some((full_path, depth)) = next_child else {
                // Directory exhausted: emit it after all of its children.
                let state = self.stack.pop().expect("non-empty stack");
                let is_root = self.stack.is_empty();
                if is_root {
                    self.finished = true;
                    if !self.include_root {
                        return None;
                    }
                }
                return Some(Ok(WalkEntry {
                    full_path: state.fs_path,
                    kind: EntryKind::Directory,
                    size_bytes: 0,
                    depth: state.depth,
                    is_root,
                }));
            };

            match Self::classify_child(full_path, depth) {
                Step::Descend(path, dir_depth) => match DirectoryState::new(path, dir_depth) {
                    Ok(state) => self.stack.push(state),
                    Err(error)
                        if error
                            .source_io_kind()
                            .is_some_and(|kind| kind == io::ErrorKind::NotFound) =>
                    {
                        // Directory vanished between stat and read_dir.
                    }
                    Err(error) => {
                        self.finished = true;
                        return Some(Err(error));
                    }
                },
                Step::Emit(entry) => return Some(Ok(entry)),
                Step::Skip => {}
                Step::Fail(error) => {
                    self.finished = true;
                    return Some(Err(error));
                }
            }
        }
    }
}

impl WalkError {
    fn source_io_kind(&self) -> Option<io::ErrorKind> {
        use std::error::Error as _;
        self.source()
            .and_then(|source| source.downcast_ref::<io::Error>())
            .map(io::Error::kind)
    }
}

#[derive(Debug)]
struct DirectoryState {
    fs_path: PathBuf,
    entries: Vec<OsString>,
    index: usize,
    depth: usize,
}

impl DirectoryState {
    fn new(fs_path: PathBuf, depth: usize) -> Result<Self, WalkError> {
        let mut entries = Vec::new();
        let read_dir =
            fs::read_dir(&fs_path).map_err(|error| WalkError::read_dir(fs_path.clone(), error))?;
        for entry in read_dir {
            let entry = entry.map_err(|error| WalkError::read_dir_entry(fs_path.clone(), error))?;
            entries.push(entry.file_name());
        }
        entries.sort();

        Ok(Self {
            fs_path,
            entries,
            index: 0,
            depth,
        })
    }

    fn next_name(&mut self) -> Option<OsString> {
        let name = self.entries.get(self.index)?.clone();
        self.index += 1;
        Some(name)
    }
}

/// Result of a traversal step.
#[derive(Clone, Debug)]
pub struct WalkEntry {
    full_path: PathBuf,
    kind: EntryKind,
    size_bytes: u64,
    depth: usize,
    is_root: bool,
}

impl WalkEntry {
    /// Returns the absolute path to the filesystem entry.
    #[must_use]
    pub fn full_path(&self) -> &Path {
        &self.full_path
    }

    /// Consumes the entry and returns its absolute path.
    #[must_use]
    pub fn into_full_path(self) -> PathBuf {
        self.full_path
    }

    /// Returns the entry's classification.
    #[must_use]
    pub const fn kind(&self) -> EntryKind {
        self.kind
    }

    /// Best-effort size captured before deletion (0 for directories and
    /// entries whose size is unknown).
    #[must_use]
    pub const fn size_bytes(&self) -> u64 {
        self.size_bytes
    }

    /// Reports the depth of the entry relative to the root (root depth is `0`).
    #[must_use]
    pub const fn depth(&self) -> usize {
        self.depth
    }

    /// Indicates whether this entry corresponds to the traversal root.
    #[must_use]
    pub const fn is_root(&self) -> bool {
        self.is_root
    }
}

fn absolutize(path: PathBuf) -> Result<PathBuf, WalkError> {
    if path.is_absolute() {
        Ok(path)
    } else {
        let cwd = std::env::current_dir().map_err(WalkError::current_dir)?;
        Ok(cwd.join(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn collect_paths(walker: Walker) -> Vec<PathBuf> {
        walker
            .map(|entry| entry.expect("walker entry").into_full_path())
            .collect()
    }

    #[test]
    fn walk_errors_when_root_missing() {
        let builder = WalkBuilder::new("/nonexistent/path/for/walker");
        let error = match builder.build() {
            Ok(_) => panic!("missing root should fail"),
            Err(error) => error,
        };
        assert!(matches!(error.kind(), WalkErrorKind::RootMetadata { .. }));
    }

    #[test]
    fn walk_single_file_emits_root_entry() {
        let temp = tempfile::tempdir().expect("tempdir");
        let file = temp.path().join("file.txt");
        fs::write(&file, b"contents").expect("write");

        let mut walker = WalkBuilder::new(&file).build().expect("build walker");
        let entry = walker.next().expect("entry").expect("entry ok");
        assert!(entry.is_root());
        assert_eq!(entry.kind(), EntryKind::File);
        assert_eq!(entry.size_bytes(), 8);
        assert_eq!(entry.full_path(), file);
        assert!(walker.next().is_none());
    }

    #[test]
    fn walk_yields_children_before_parents() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path().join("root");
        fs::create_dir_all(root.join("a/b")).expect("create dirs");
        fs::write(root.join("a/b/file.txt"), b"data").expect("write file");
        fs::write(root.join("c.txt"), b"xy").expect("write file");

        let walker = WalkBuilder::new(&root).build().expect("build walker");
        let paths = collect_paths(walker);
        assert_eq!(
            paths,
            vec![
                root.join("a/b/file.txt"),
                root.join("a/b"),
                root.join("a"),
                root.join("c.txt"),
                root.clone(),
            ]
        );
    }

    #[test]
    fn walk_reports_kinds_and_sizes() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path().join("root");
        fs::create_dir(&root).expect("create root");
        fs::write(root.join("data.bin"), vec![0u8; 100]).expect("write");

        let walker = WalkBuilder::new(&root).build().expect("build walker");
        let entries: Vec<WalkEntry> = walker.map(|entry| entry.expect("entry")).collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].kind(), EntryKind::File);
        assert_eq!(entries[0].size_bytes(), 100);
        assert_eq!(entries[1].kind(), EntryKind::Directory);
        assert_eq!(entries[1].size_bytes(), 0);
        assert!(entries[1].is_root());
    }

    #[test]
    fn walk_can_exclude_root() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path().join("root");
        fs::create_dir(&root).expect("create root");
        fs::write(root.join("file.txt"), b"data").expect("write");

        let walker = WalkBuilder::new(&root)
            .include_root(false)
            .build()
            .expect("build walker");
        let paths = collect_paths(walker);
        assert_eq!(paths, vec![root.join("file.txt")]);
    }

    #[cfg(unix)]
    #[test]
    fn walk_never_follows_symlinks() {
        use std::os::unix::fs::symlink;

        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path().join("root");
        let target = temp.path().join("target");
        fs::create_dir(&root).expect("create root");
        fs::create_dir(&target).expect("create target");
        fs::write(target.join("inner.txt"), b"data").expect("write inner");
        symlink(&target, root.join("link")).expect("create symlink");

        let walker = WalkBuilder::new(&root).build().expect("build walker");
        let entries: Vec<WalkEntry> = walker.map(|entry| entry.expect("entry")).collect();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].full_path(), root.join("link"));
        // A symlink to a directory unlinks like a file.
        assert_eq!(entries[0].kind(), EntryKind::File);
        assert!(target.join("inner.txt").exists());
    }

    #[test]
    fn walk_empty_directory_emits_only_root() {
        let temp = tempfile::tempdir().expect("tempdir");
        let root = temp.path().join("empty");
        fs::create_dir(&root).expect("create root");

        let walker = WalkBuilder::new(&root).build().expect("build walker");
        let paths = collect_paths(walker);
        assert_eq!(paths, vec![root]);
    }
}
