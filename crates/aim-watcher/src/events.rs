//! Debounced change notifications.
//!
//! The debouncer does not say whether a path was created, modified or
//! removed. Consumers re-walk the affected trees, so the path alone is
//! enough.

use std::time::Instant;

use aim_core::FxHashSet;
use camino::{Utf8Path, Utf8PathBuf};
use smallvec::SmallVec;

/// Manifest file name; a change to one invalidates cached dependency data.
const MANIFEST_FILE: &str = "package.json";

/// One changed path.
///
/// # Examples
///
/// ```
/// use aim_watcher::FileEvent;
/// use camino::Utf8PathBuf;
///
/// let event = FileEvent::new(Utf8PathBuf::from("/work/my-app/package.json"));
/// assert!(event.is_manifest());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEvent {
    /// Absolute path of the changed file.
    pub path: Utf8PathBuf,

    /// When the event was received.
    pub timestamp: Instant,
}

impl FileEvent {
    /// Creates an event stamped with the current instant.
    #[inline]
    #[must_use]
    pub fn new(path: Utf8PathBuf) -> Self {
        Self {
            path,
            timestamp: Instant::now(),
        }
    }

    /// Whether the changed file is a `package.json`.
    #[must_use]
    pub fn is_manifest(&self) -> bool {
        self.path.file_name() == Some(MANIFEST_FILE)
    }

    /// Whether the changed path lies under `dir`.
    #[must_use]
    pub fn is_under(&self, dir: &Utf8Path) -> bool {
        self.path.starts_with(dir)
    }
}

/// All events from one debounce window.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileEventBatch {
    events: SmallVec<[FileEvent; 8]>,
}

impl FileEventBatch {
    /// Creates an empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an event.
    pub fn push(&mut self, event: FileEvent) {
        self.events.push(event);
    }

    /// Number of events.
    #[must_use]
    pub fn len(&self) -> usize {
        self.events.len()
    }

    /// Whether the batch is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// Events in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = &FileEvent> {
        self.events.iter()
    }

    /// Whether any `package.json` changed.
    #[must_use]
    pub fn touches_manifest(&self) -> bool {
        self.events.iter().any(FileEvent::is_manifest)
    }

    /// Distinct paths, in first-seen order.
    #[must_use]
    pub fn unique_paths(&self) -> Vec<&Utf8Path> {
        let mut seen = FxHashSet::default();
        self.events
            .iter()
            .map(|event| event.path.as_path())
            .filter(|path| seen.insert(*path))
            .collect()
    }
}

impl FromIterator<FileEvent> for FileEventBatch {
    fn from_iter<I: IntoIterator<Item = FileEvent>>(iter: I) -> Self {
        Self {
            events: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a FileEventBatch {
    type Item = &'a FileEvent;
    type IntoIter = std::slice::Iter<'a, FileEvent>;

    fn into_iter(self) -> Self::IntoIter {
        self.events.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(path: &str) -> FileEvent {
        FileEvent::new(Utf8PathBuf::from(path))
    }

    #[test]
    fn test_manifest_detection() {
        assert!(event("/p/package.json").is_manifest());
        assert!(!event("/p/package.json.bak").is_manifest());
        assert!(!event("/p/app/package.js").is_manifest());
    }

    #[test]
    fn test_batch() {
        let batch: FileEventBatch = [
            event("/p/app/a.js"),
            event("/p/app/a.js"),
            event("/p/package.json"),
        ]
        .into_iter()
        .collect();

        assert_eq!(batch.len(), 3);
        assert!(batch.touches_manifest());
        assert_eq!(
            batch.unique_paths(),
            [Utf8Path::new("/p/app/a.js"), Utf8Path::new("/p/package.json")]
        );
    }

    #[test]
    fn test_is_under() {
        let e = event("/p/node_modules/lib/index.js");
        assert!(e.is_under(Utf8Path::new("/p/node_modules/lib")));
        assert!(!e.is_under(Utf8Path::new("/p/node_modules/li")));
    }
}
