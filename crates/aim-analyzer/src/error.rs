//! Error types for the aim-analyzer crate.

use camino::Utf8PathBuf;

/// Errors that can fail an [`Analyzer`](crate::Analyzer) build.
///
/// A failed build leaves the analyzer at its last good snapshot, so every
/// variant is retried on the next build.
///
/// # Examples
///
/// ```
/// use aim_analyzer::AnalyzeError;
///
/// fn report(err: &AnalyzeError) -> String {
///     match err {
///         AnalyzeError::Parse { path, .. } => format!("fix {path} and save again"),
///         other => other.to_string(),
///     }
/// }
/// ```
#[derive(Debug, thiserror::Error)]
pub enum AnalyzeError {
    /// Failed to walk the input directory.
    #[error("failed to walk directory: {0}")]
    Walk(#[from] ignore::Error),

    /// Failed to read an input file.
    #[error("failed to read file {path}: {source}")]
    Read {
        /// The file that couldn't be read.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A tracked file has malformed or unsupported imports.
    #[error("{path}: {source}")]
    Parse {
        /// Path of the file, relative to the input directory.
        path: Utf8PathBuf,
        /// The underlying parse error.
        #[source]
        source: aim_parser::ParseError,
    },

    /// The tree-sitter parser could not be set up.
    #[error("failed to initialize parser: {0}")]
    Parser(#[source] aim_parser::ParseError),

    /// Failed to update the output directory.
    #[error("failed to mirror {path} into the output directory: {source}")]
    Mirror {
        /// The output path being written or removed.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A path is not valid UTF-8.
    #[error("path is not valid UTF-8: {}", _0.display())]
    NonUtf8Path(std::path::PathBuf),
}

impl AnalyzeError {
    /// Creates a new [`AnalyzeError::Read`] error.
    #[inline]
    pub fn read(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Read {
            path: path.into(),
            source,
        }
    }

    /// Creates a new [`AnalyzeError::Parse`] error.
    #[inline]
    pub fn parse(path: impl Into<Utf8PathBuf>, source: aim_parser::ParseError) -> Self {
        Self::Parse {
            path: path.into(),
            source,
        }
    }

    /// Creates a new [`AnalyzeError::Mirror`] error.
    #[inline]
    pub fn mirror(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Mirror {
            path: path.into(),
            source,
        }
    }

    /// Returns `true` if the user can fix this by editing a source file.
    #[inline]
    #[must_use]
    pub fn is_source_error(&self) -> bool {
        match self {
            Self::Parse { source, .. } => source.is_source_error(),
            _ => false,
        }
    }
}

impl From<std::path::PathBuf> for AnalyzeError {
    fn from(path: std::path::PathBuf) -> Self {
        Self::NonUtf8Path(path)
    }
}
