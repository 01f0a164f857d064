//! Point-in-time view of an input directory.

use std::collections::{BTreeMap, BTreeSet};
use std::time::SystemTime;

use camino::{Utf8Path, Utf8PathBuf};

/// What the analyzer remembers about one file between builds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileState {
    /// Size in bytes.
    pub size: u64,
    /// Last modification time, when the platform reports one.
    pub mtime: Option<SystemTime>,
    /// Content hash.
    pub hash: u64,
}

impl FileState {
    /// Whether `size` and `mtime` match, so the stored hash can be reused
    /// without reading the file again.
    #[inline]
    #[must_use]
    pub fn is_fresh(&self, size: u64, mtime: Option<SystemTime>) -> bool {
        mtime.is_some() && self.size == size && self.mtime == mtime
    }
}

/// Files and directories under an input root, keyed by relative path.
///
/// Both maps are ordered by path, which is what makes
/// [`diff`](crate::patch::diff) deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TreeSnapshot {
    files: BTreeMap<Utf8PathBuf, FileState>,
    dirs: BTreeSet<Utf8PathBuf>,
}

impl TreeSnapshot {
    /// Creates an empty snapshot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a file.
    pub fn insert_file(&mut self, path: impl Into<Utf8PathBuf>, state: FileState) {
        self.files.insert(path.into(), state);
    }

    /// Records a directory.
    pub fn insert_dir(&mut self, path: impl Into<Utf8PathBuf>) {
        self.dirs.insert(path.into());
    }

    /// The state of a file, if present.
    #[must_use]
    pub fn file(&self, path: &Utf8Path) -> Option<&FileState> {
        self.files.get(path)
    }

    /// Whether the snapshot contains the directory.
    #[must_use]
    pub fn has_dir(&self, path: &Utf8Path) -> bool {
        self.dirs.contains(path)
    }

    /// Files in path order.
    pub fn files(&self) -> impl Iterator<Item = (&Utf8Path, &FileState)> {
        self.files.iter().map(|(path, state)| (path.as_path(), state))
    }

    /// Directories in path order.
    pub fn dirs(&self) -> impl Iterator<Item = &Utf8Path> {
        self.dirs.iter().map(Utf8PathBuf::as_path)
    }

    /// Number of files.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.files.len()
    }

    /// Whether the snapshot has no files and no directories.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.dirs.is_empty()
    }
}
