//! Path filtering for watch events.
//!
//! Filters run on the watcher thread, before anything is sent to the
//! channel, so editor swap files and build output never wake the consumer.
//!
//! # Examples
//!
//! ```
//! use aim_watcher::{FileFilter, SourceFilter};
//! use camino::Utf8Path;
//!
//! let filter = SourceFilter::new(["js", "ts"]);
//!
//! assert!(filter.should_process(Utf8Path::new("app/routes/index.ts")));
//! assert!(filter.should_process(Utf8Path::new("node_modules/lodash/package.json")));
//! assert!(!filter.should_process(Utf8Path::new("app/styles/app.css")));
//! assert!(!filter.should_process(Utf8Path::new("types/global.d.ts")));
//! ```

use camino::{Utf8Path, Utf8PathBuf};
use smallvec::SmallVec;

/// A predicate deciding which changed paths are worth reporting.
///
/// Filters must be [`Send`] and [`Sync`] because they run on the blocking
/// watcher thread, and `'static` to be moved into it.
///
/// # Examples
///
/// ```
/// use aim_watcher::FileFilter;
/// use camino::Utf8Path;
///
/// struct OnlyJs;
///
/// impl FileFilter for OnlyJs {
///     fn should_process(&self, path: &Utf8Path) -> bool {
///         path.extension() == Some("js")
///     }
/// }
/// ```
pub trait FileFilter: Send + Sync + 'static {
    /// Returns `true` if a change to `path` should be reported.
    fn should_process(&self, path: &Utf8Path) -> bool;
}

/// Accepts every path.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptAllFilter;

impl FileFilter for AcceptAllFilter {
    #[inline]
    fn should_process(&self, _path: &Utf8Path) -> bool {
        true
    }
}

/// Accepts analyzable sources and `package.json` manifests.
///
/// Declaration files (`.d.ts`) never contain imports worth tracking, and
/// anything inside a `.git` directory is ignored.
#[derive(Debug, Clone)]
pub struct SourceFilter {
    /// Accepted extensions without the leading dot.
    extensions: SmallVec<[String; 4]>,

    /// Whether `package.json` changes are reported.
    manifests: bool,
}

impl SourceFilter {
    /// Creates a filter for the given extensions. Leading dots are ignored.
    #[must_use]
    pub fn new<I, S>(extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            extensions: extensions
                .into_iter()
                .map(|ext| ext.as_ref().trim_start_matches('.').to_owned())
                .collect(),
            manifests: true,
        }
    }

    /// Stops reporting `package.json` changes.
    #[must_use]
    pub const fn without_manifests(mut self) -> Self {
        self.manifests = false;
        self
    }

    fn is_source(&self, path: &Utf8Path) -> bool {
        let Some(name) = path.file_name() else {
            return false;
        };
        if name.ends_with(".d.ts") {
            return false;
        }
        path.extension()
            .is_some_and(|ext| self.extensions.iter().any(|accepted| accepted == ext))
    }
}

impl FileFilter for SourceFilter {
    fn should_process(&self, path: &Utf8Path) -> bool {
        if path.components().any(|c| c.as_str() == ".git") {
            return false;
        }
        if self.manifests && path.file_name() == Some("package.json") {
            return true;
        }
        self.is_source(path)
    }
}

/// Rejects everything under a set of directories.
///
/// Used to keep the build's own output from triggering another build.
#[derive(Debug, Clone, Default)]
pub struct ExcludeDirFilter {
    dirs: SmallVec<[Utf8PathBuf; 2]>,
}

impl ExcludeDirFilter {
    /// Creates a filter excluding `dirs`.
    #[must_use]
    pub fn new<I, P>(dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<Utf8PathBuf>,
    {
        Self {
            dirs: dirs.into_iter().map(Into::into).collect(),
        }
    }
}

impl FileFilter for ExcludeDirFilter {
    fn should_process(&self, path: &Utf8Path) -> bool {
        !self.dirs.iter().any(|dir| path.starts_with(dir))
    }
}

/// Accepts a path only if every inner filter does.
///
/// An empty composite accepts everything.
///
/// # Examples
///
/// ```
/// use aim_watcher::{CompositeFilter, ExcludeDirFilter, FileFilter, SourceFilter};
/// use camino::Utf8Path;
///
/// let filter = CompositeFilter::new()
///     .with(SourceFilter::new(["js"]))
///     .with(ExcludeDirFilter::new(["/work/app/dist"]));
///
/// assert!(filter.should_process(Utf8Path::new("/work/app/app/app.js")));
/// assert!(!filter.should_process(Utf8Path::new("/work/app/dist/app.js")));
/// ```
#[derive(Default)]
pub struct CompositeFilter {
    filters: Vec<Box<dyn FileFilter>>,
}

impl CompositeFilter {
    /// Creates an empty composite.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a filter.
    #[must_use]
    pub fn with<F: FileFilter>(mut self, filter: F) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    /// Number of inner filters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Whether no filters were added.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

impl std::fmt::Debug for CompositeFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompositeFilter")
            .field("filters", &self.filters.len())
            .finish()
    }
}

impl FileFilter for CompositeFilter {
    fn should_process(&self, path: &Utf8Path) -> bool {
        self.filters.iter().all(|filter| filter.should_process(path))
    }
}
