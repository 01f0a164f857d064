//! Reflecting the input tree into an output directory.
//!
//! Files are symlinked where the platform allows it and copied otherwise.

use std::fs;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::trace;

use crate::error::AnalyzeError;
use crate::patch::{PatchEntry, PatchOp};

/// Applies patch entries from an input root onto an output root.
#[derive(Debug, Clone)]
pub struct Mirror {
    input: Utf8PathBuf,
    output: Utf8PathBuf,
}

impl Mirror {
    /// Creates a mirror from `input` into `output`.
    #[must_use]
    pub fn new(input: impl Into<Utf8PathBuf>, output: impl Into<Utf8PathBuf>) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
        }
    }

    /// The output root.
    #[must_use]
    pub fn output(&self) -> &Utf8Path {
        &self.output
    }

    /// Makes sure the output root exists.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzeError::Mirror`] if the directory cannot be created.
    pub fn prepare(&self) -> Result<(), AnalyzeError> {
        fs::create_dir_all(&self.output).map_err(|e| AnalyzeError::mirror(&self.output, e))
    }

    /// Applies one entry. Removing something already gone is not an error,
    /// so a build that failed halfway can be replayed.
    ///
    /// # Errors
    ///
    /// Returns [`AnalyzeError::Mirror`] if the output cannot be updated.
    pub fn apply(&self, entry: &PatchEntry) -> Result<(), AnalyzeError> {
        let target = self.output.join(&entry.path);
        trace!(op = %entry.op, path = %entry.path, "mirroring");

        let result = match entry.op {
            PatchOp::Mkdir => fs::create_dir_all(&target),
            PatchOp::Rmdir => ignore_missing(fs::remove_dir_all(&target)),
            PatchOp::Unlink => ignore_missing(fs::remove_file(&target)),
            PatchOp::Create | PatchOp::Change => {
                ignore_missing(fs::remove_file(&target)).and_then(|()| {
                    let source = self.input.join(&entry.path);
                    link_or_copy(&source, &target)
                })
            }
        };
        result.map_err(|e| AnalyzeError::mirror(target, e))
    }
}

fn ignore_missing(result: io::Result<()>) -> io::Result<()> {
    match result {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}

#[cfg(unix)]
fn link_or_copy(source: &Utf8Path, target: &Utf8Path) -> io::Result<()> {
    let absolute = source.canonicalize_utf8()?;
    match std::os::unix::fs::symlink(&absolute, target) {
        Ok(()) => Ok(()),
        Err(e) => {
            tracing::warn!(path = %target, error = %e, "symlink failed, copying instead");
            fs::copy(source, target).map(|_| ())
        }
    }
}

#[cfg(not(unix))]
fn link_or_copy(source: &Utf8Path, target: &Utf8Path) -> io::Result<()> {
    fs::copy(source, target).map(|_| ())
}
