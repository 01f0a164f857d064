//! Incremental import discovery over source trees.
//!
//! One [`Analyzer`] watches one input directory (an app's `app/` or
//! `tests/`, an addon's tree) on behalf of one [`Package`](aim_package::Package).
//! Every build re-parses only the files whose content changed and keeps a
//! per-file list of [`Import`]s that the splitter consumes through
//! [`ImportSource`].
//!
//! # Overview
//!
//! - [`TreeWalker`]: walks every file, hidden ones included, into a [`TreeSnapshot`]
//! - [`diff`]: turns two snapshots into an ordered patch of [`PatchEntry`]s
//! - [`Mirror`]: reflects the patch into an output directory
//! - [`Analyzer`]: parses changed files in parallel and owns the import lists
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use aim_analyzer::{Analyzer, ImportSource};
//! use aim_core::{PackageConfig, TreeType};
//! use aim_package::PackageCache;
//! use camino::Utf8Path;
//!
//! let project = Utf8Path::new("/work/my-app");
//! let packages = PackageCache::new();
//! let app = packages.get_or_create(project, &PackageConfig::default_app(), false)?;
//!
//! let mut analyzer = Analyzer::new(project.join("app"), app, Some(TreeType::App))
//!     .with_output(project.join("dist/aim/app"));
//! analyzer.build()?;
//!
//! let first = analyzer.imports();
//! analyzer.build()?;
//! // Nothing changed on disk, so the memoized list is reused.
//! assert!(Arc::ptr_eq(&first, &analyzer.imports()));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Architecture
//!
//! ```text
//! Analyzer::build
//!     │
//!     ├── TreeWalker (ignore crate, no filters)
//!     │       └── TreeSnapshot (size, mtime, content hash)
//!     │
//!     ├── diff (removals deepest first, then additions in path order)
//!     │
//!     ├── parse (rayon map_init, one TsParser per worker)
//!     │
//!     └── apply
//!             ├── IndexMap<path, Vec<Import>> + memo
//!             └── Mirror (symlink, copy fallback)
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

mod analyzer;
mod error;
mod import;
mod mirror;
mod patch;
mod snapshot;
mod walker;

pub use analyzer::{Analyzer, BuildSummary, DEFAULT_EXTENSIONS};
pub use error::AnalyzeError;
pub use import::{Import, ImportSource, LiteralImport, TemplateImport};
pub use mirror::Mirror;
pub use patch::{PatchEntry, PatchOp, diff};
pub use snapshot::{FileState, TreeSnapshot};
pub use walker::TreeWalker;
