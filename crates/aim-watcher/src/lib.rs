//! Debounced file watching for `aim watch`.
//!
//! [`FileWatcher`] runs a `notify` debouncer on a blocking thread and
//! streams one [`FileEventBatch`] per debounce window. A [`FileFilter`]
//! drops uninteresting paths before they reach the channel:
//!
//! - [`SourceFilter`] keeps tracked source extensions and `package.json`
//! - [`ExcludeDirFilter`] drops the build's own output
//! - [`CompositeFilter`] combines filters
//!
//! A batch that [touches a manifest](FileEventBatch::touches_manifest)
//! means cached dependency data is stale, not only analyzed sources.

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod error;
pub mod events;
pub mod filter;
pub mod watcher;

pub use error::WatchError;
pub use events::{FileEvent, FileEventBatch};
pub use filter::{AcceptAllFilter, CompositeFilter, ExcludeDirFilter, FileFilter, SourceFilter};
pub use watcher::{FileWatcher, WatchPath};
