//! Directory traversal into a [`TreeSnapshot`].
//!
//! Unlike a source scanner, the analyzer mirrors its whole input tree, so
//! [`TreeWalker`] sees every file: hidden files are included and no ignore
//! files are honored.
//!
//! # Examples
//!
//! ```no_run
//! use aim_analyzer::{TreeSnapshot, TreeWalker};
//! use camino::Utf8Path;
//!
//! let walker = TreeWalker::new(Utf8Path::new("/work/my-app/app"));
//! let snapshot = walker.walk(&TreeSnapshot::new())?;
//! for (path, state) in snapshot.files() {
//!     println!("{path}: {} bytes", state.size);
//! }
//! # Ok::<(), aim_analyzer::AnalyzeError>(())
//! ```

use std::fs;

use aim_core::hash_bytes;
use camino::{Utf8Path, Utf8PathBuf};
use ignore::WalkBuilder;
use tracing::{debug, trace};

use crate::error::AnalyzeError;
use crate::snapshot::{FileState, TreeSnapshot};

/// Walks an input directory and records every file and directory below it.
#[derive(Debug, Clone)]
pub struct TreeWalker {
    root: Utf8PathBuf,
    follow_links: bool,
}

impl TreeWalker {
    /// Creates a walker rooted at `root`. Symlinks are followed.
    #[must_use]
    pub fn new(root: impl Into<Utf8PathBuf>) -> Self {
        Self {
            root: root.into(),
            follow_links: true,
        }
    }

    /// Sets whether to follow symbolic links.
    #[must_use]
    pub const fn with_follow_links(mut self, follow: bool) -> Self {
        self.follow_links = follow;
        self
    }

    /// Returns the root directory being walked.
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Takes a snapshot of the tree.
    ///
    /// Content hashes are copied from `previous` for files whose size and
    /// mtime did not change; every other file is read and hashed. A missing
    /// root yields an empty snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the walk fails, a path is not UTF-8, or a file
    /// cannot be read.
    pub fn walk(&self, previous: &TreeSnapshot) -> Result<TreeSnapshot, AnalyzeError> {
        let mut snapshot = TreeSnapshot::new();
        if !self.root.is_dir() {
            debug!(root = %self.root, "input directory does not exist");
            return Ok(snapshot);
        }

        let mut hashed = 0usize;
        for entry in self.build_walker() {
            let entry = entry?;
            if entry.depth() == 0 {
                continue;
            }

            let path = Utf8Path::from_path(entry.path())
                .ok_or_else(|| AnalyzeError::NonUtf8Path(entry.path().to_path_buf()))?;
            let relative = path
                .strip_prefix(&self.root)
                .map_or_else(|_| path.to_owned(), Utf8Path::to_owned);

            let Some(file_type) = entry.file_type() else {
                continue;
            };
            if file_type.is_dir() {
                snapshot.insert_dir(relative);
                continue;
            }

            let metadata = entry
                .metadata()
                .map_err(|e| AnalyzeError::read(path, into_io(e)))?;
            let size = metadata.len();
            let mtime = metadata.modified().ok();

            let hash = match previous.file(&relative) {
                Some(state) if state.is_fresh(size, mtime) => state.hash,
                _ => {
                    hashed += 1;
                    let bytes = fs::read(path).map_err(|e| AnalyzeError::read(path, e))?;
                    hash_bytes(&bytes)
                }
            };
            trace!(path = %relative, size, "walked file");
            snapshot.insert_file(relative, FileState { size, mtime, hash });
        }

        debug!(
            root = %self.root,
            files = snapshot.file_count(),
            hashed,
            "snapshot complete"
        );
        Ok(snapshot)
    }

    /// Builds the ignore walker with configured settings.
    fn build_walker(&self) -> ignore::Walk {
        WalkBuilder::new(&self.root)
            // No .gitignore, .ignore or hidden-file filtering
            .standard_filters(false)
            .follow_links(self.follow_links)
            // Stable order so snapshots are reproducible
            .sort_by_file_path(std::cmp::Ord::cmp)
            .build()
    }
}

fn into_io(err: ignore::Error) -> std::io::Error {
    err.into_io_error()
        .unwrap_or_else(|| std::io::Error::other("metadata unavailable"))
}
