//! Error types for the aim-splitter crate.

use aim_package::PackageError;
use camino::Utf8PathBuf;

/// Errors that stop the splitter from producing a manifest.
///
/// The first three variants point at a user's source or `package.json`;
/// [`Package`](Self::Package) wraps resolution and manifest failures.
#[derive(Debug, thiserror::Error)]
pub enum SplitError {
    /// `import()` of a relative path, which cannot be split out.
    #[error(
        "aim does not support dynamic relative imports. \"{specifier}\" is relative (in {package}, {path}). Import it statically or move it into a package."
    )]
    RelativeDynamicImport {
        /// The importing package.
        package: String,
        /// The importing file.
        path: Utf8PathBuf,
        /// The relative specifier.
        specifier: String,
    },

    /// A template import whose leading quasi does not name a whole package.
    #[error(
        "Dynamic imports must target unambiguous package names. {leading} is ambiguous (in {package}, {path})"
    )]
    AmbiguousDynamicImport {
        /// The importing package.
        package: String,
        /// The importing file.
        path: Utf8PathBuf,
        /// The leading quasi as written.
        leading: String,
    },

    /// Two packages import the same specifier but need incompatible versions.
    #[error(
        "{requester} needs {dependency} satisfying {range}, but we have version {version} because of {importers}"
    )]
    VersionConflict {
        /// The package whose range is not satisfied.
        requester: String,
        /// The dependency both packages import.
        dependency: String,
        /// The requester's declared range.
        range: String,
        /// The version already chosen.
        version: String,
        /// Packages that caused the chosen version, comma-separated.
        importers: String,
    },

    /// A bundle or asset type that the bundle layout does not define.
    #[error("no entrypoint for bundle '{bundle}' and type '{asset_type}'")]
    UnknownBundle {
        /// The bundle asked for.
        bundle: String,
        /// The asset type asked for.
        asset_type: String,
    },

    /// Resolution or manifest failure.
    #[error(transparent)]
    Package(#[from] PackageError),
}

impl SplitError {
    /// Returns `true` if the error points at the user's code or manifest
    /// rather than the environment.
    #[must_use]
    pub fn is_user_error(&self) -> bool {
        match self {
            Self::RelativeDynamicImport { .. }
            | Self::AmbiguousDynamicImport { .. }
            | Self::VersionConflict { .. } => true,
            Self::UnknownBundle { .. } => false,
            Self::Package(err) => err.is_user_error(),
        }
    }
}
