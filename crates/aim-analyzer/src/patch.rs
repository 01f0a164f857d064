//! Turning two snapshots into an ordered list of filesystem operations.

use std::fmt;

use camino::{Utf8Path, Utf8PathBuf};
use serde::Serialize;

use crate::snapshot::TreeSnapshot;

/// A filesystem operation between two snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    /// A file appeared.
    Create,
    /// A file's content changed.
    Change,
    /// A file disappeared.
    Unlink,
    /// A directory appeared.
    Mkdir,
    /// A directory disappeared.
    Rmdir,
}

impl PatchOp {
    /// The operation's lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Change => "change",
            Self::Unlink => "unlink",
            Self::Mkdir => "mkdir",
            Self::Rmdir => "rmdir",
        }
    }

    /// Whether the operation leaves a file with new content behind.
    #[must_use]
    pub const fn writes_file(self) -> bool {
        matches!(self, Self::Create | Self::Change)
    }
}

impl fmt::Display for PatchOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One operation on one relative path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PatchEntry {
    /// What happened.
    pub op: PatchOp,
    /// Path relative to the input root.
    pub path: Utf8PathBuf,
}

impl PatchEntry {
    fn new(op: PatchOp, path: &Utf8Path) -> Self {
        Self {
            op,
            path: path.to_owned(),
        }
    }
}

/// Computes the operations that turn `previous` into `next`.
///
/// Removals come first, deepest paths first, so directories are emptied
/// before they are removed. Additions and changes follow in path order, so
/// a directory is created before anything inside it. Files whose content
/// hash is unchanged produce no entry, whatever their mtime.
///
/// # Examples
///
/// ```
/// use aim_analyzer::{FileState, PatchOp, TreeSnapshot, diff};
///
/// let state = FileState { size: 1, mtime: None, hash: 7 };
/// let mut before = TreeSnapshot::new();
/// before.insert_dir("old");
/// before.insert_file("old/a.js", state);
///
/// let mut after = TreeSnapshot::new();
/// after.insert_file("b.js", state);
///
/// let ops: Vec<_> = diff(&before, &after).into_iter().map(|e| e.op).collect();
/// assert_eq!(ops, [PatchOp::Unlink, PatchOp::Rmdir, PatchOp::Create]);
/// ```
#[must_use]
pub fn diff(previous: &TreeSnapshot, next: &TreeSnapshot) -> Vec<PatchEntry> {
    let mut removals: Vec<PatchEntry> = previous
        .files()
        .filter(|(path, _)| next.file(path).is_none())
        .map(|(path, _)| PatchEntry::new(PatchOp::Unlink, path))
        .chain(
            previous
                .dirs()
                .filter(|path| !next.has_dir(path))
                .map(|path| PatchEntry::new(PatchOp::Rmdir, path)),
        )
        .collect();
    removals.sort_by(|a, b| {
        depth(&b.path)
            .cmp(&depth(&a.path))
            .then_with(|| b.path.cmp(&a.path))
    });

    let mut additions: Vec<PatchEntry> = next
        .dirs()
        .filter(|path| !previous.has_dir(path))
        .map(|path| PatchEntry::new(PatchOp::Mkdir, path))
        .chain(next.files().filter_map(|(path, state)| {
            match previous.file(path) {
                None => Some(PatchEntry::new(PatchOp::Create, path)),
                Some(old) if old.hash != state.hash => Some(PatchEntry::new(PatchOp::Change, path)),
                Some(_) => None,
            }
        }))
        .collect();
    additions.sort_by(|a, b| a.path.cmp(&b.path));

    removals.extend(additions);
    removals
}

fn depth(path: &Utf8Path) -> usize {
    path.components().count()
}
