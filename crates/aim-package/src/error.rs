//! Error types for the aim-package crate.
//!
//! This module provides the [`PackageError`] type for errors that can occur
//! while reading manifests and resolving specifiers.

use camino::Utf8PathBuf;

/// Errors that can occur while answering questions about a package.
///
/// # Examples
///
/// ```
/// use aim_package::PackageError;
///
/// let err = PackageError::disallowed_dev_dependency("my-addon", "lodash");
/// assert!(err.is_user_error());
/// assert!(err.to_string().contains("is a devDependency"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum PackageError {
    /// An addon imports something it only lists in `devDependencies`.
    ///
    /// The addon's consumers never install its dev dependencies, so this
    /// would break as soon as the addon is published.
    #[error(
        "{package} tried to import \"{dependency}\" in its addon tree, but \"{dependency}\" is a devDependency. You may need to move it into dependencies."
    )]
    DisallowedDevDependency {
        /// The importing package.
        package: String,
        /// The dependency it tried to import.
        dependency: String,
    },

    /// A declared dependency is not installed anywhere above the package root.
    #[error(
        "{package} tried to import \"{dependency}\" but the package was not resolvable from {root}"
    )]
    MissingPackage {
        /// The importing package.
        package: String,
        /// The dependency that could not be found.
        dependency: String,
        /// Where the search started.
        root: Utf8PathBuf,
    },

    /// Failed to read a `package.json` or resolve a package directory.
    #[error("failed to read {path}: {source}")]
    Io {
        /// The path that could not be read.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// A `package.json` is not valid JSON for the fields we read.
    #[error("failed to parse {path}: {source}")]
    ManifestParse {
        /// The manifest that could not be parsed.
        path: Utf8PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A `package.json` has no `name` and none was configured.
    #[error("package at {0} has no name")]
    MissingName(Utf8PathBuf),

    /// An npm version range could not be understood.
    #[error("invalid version range '{range}': {reason}")]
    InvalidRange {
        /// The range as written.
        range: String,
        /// Why it was rejected.
        reason: String,
    },

    /// A package's `version` field is not valid semver.
    #[error("invalid version '{version}' in {path}")]
    InvalidVersion {
        /// The manifest the version came from.
        path: Utf8PathBuf,
        /// The version as written.
        version: String,
    },

    /// A candidate registered after the leader was already instantiated.
    #[error("a leader for {project} was already chosen; late registration from version {version}")]
    LeaderAlreadyChosen {
        /// The project identity.
        project: String,
        /// The late candidate's version.
        version: semver::Version,
    },

    /// No candidate registered for the project.
    #[error("no candidates registered for {0}")]
    NoCandidates(String),
}

impl PackageError {
    /// Creates a new [`PackageError::DisallowedDevDependency`] error.
    #[inline]
    pub fn disallowed_dev_dependency(
        package: impl Into<String>,
        dependency: impl Into<String>,
    ) -> Self {
        Self::DisallowedDevDependency {
            package: package.into(),
            dependency: dependency.into(),
        }
    }

    /// Creates a new [`PackageError::Io`] error.
    #[inline]
    pub fn io(path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Creates a new [`PackageError::InvalidRange`] error.
    #[inline]
    pub fn invalid_range(range: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidRange {
            range: range.into(),
            reason: reason.to_string(),
        }
    }

    /// Returns `true` if the fix is in the project's own code or manifests
    /// rather than in the install.
    #[inline]
    #[must_use]
    pub const fn is_user_error(&self) -> bool {
        matches!(
            self,
            Self::DisallowedDevDependency { .. } | Self::InvalidRange { .. } | Self::MissingName(_)
        )
    }
}
