//! `package.json` reading.
//!
//! Only the fields that matter for import resolution are deserialized:
//! the name, version, the three dependency tables and keywords.

use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::PackageError;

/// The file name of a package manifest.
pub const MANIFEST_FILE: &str = "package.json";

/// The keyword that marks a package as an ember addon.
pub const ADDON_KEYWORD: &str = "ember-addon";

/// Parsed `package.json`.
///
/// # Examples
///
/// ```
/// use aim_package::PackageJson;
///
/// let manifest: PackageJson = serde_json::from_str(
///     r#"{ "name": "my-addon", "keywords": ["ember-addon"], "devDependencies": { "qunit": "^2" } }"#,
/// )
/// .unwrap();
/// assert!(manifest.is_addon());
/// assert_eq!(manifest.dev_dependencies["qunit"], "^2");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PackageJson {
    /// Package name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Package version.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// Production dependencies.
    #[serde(default)]
    pub dependencies: IndexMap<String, String>,

    /// Development dependencies.
    #[serde(default)]
    pub dev_dependencies: IndexMap<String, String>,

    /// Peer dependencies.
    #[serde(default)]
    pub peer_dependencies: IndexMap<String, String>,

    /// Registry keywords.
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl PackageJson {
    /// Reads and parses a manifest.
    ///
    /// # Errors
    ///
    /// Returns [`PackageError::Io`] if the file cannot be read and
    /// [`PackageError::ManifestParse`] if it is malformed.
    pub fn read(path: &Utf8Path) -> Result<Self, PackageError> {
        let text = std::fs::read_to_string(path).map_err(|e| PackageError::io(path, e))?;
        serde_json::from_str(&text).map_err(|source| PackageError::ManifestParse {
            path: path.to_owned(),
            source,
        })
    }

    /// Reads the manifest in a package directory.
    ///
    /// # Errors
    ///
    /// See [`read`](Self::read).
    pub fn read_dir(root: &Utf8Path) -> Result<Self, PackageError> {
        Self::read(&manifest_path(root))
    }

    /// Whether the package declares itself an ember addon.
    #[must_use]
    pub fn is_addon(&self) -> bool {
        self.keywords.iter().any(|k| k == ADDON_KEYWORD)
    }

    /// The parsed `version` field.
    ///
    /// # Errors
    ///
    /// Returns [`PackageError::InvalidVersion`] if the field is absent or not
    /// valid semver. `path` is only used for the message.
    pub fn semver(&self, path: &Utf8Path) -> Result<semver::Version, PackageError> {
        let raw = self.version.as_deref().unwrap_or_default();
        semver::Version::parse(raw.trim().trim_start_matches(['v', '='])).map_err(|_| {
            PackageError::InvalidVersion {
                path: path.to_owned(),
                version: raw.to_owned(),
            }
        })
    }
}

/// `root/package.json`.
#[must_use]
pub fn manifest_path(root: &Utf8Path) -> Utf8PathBuf {
    root.join(MANIFEST_FILE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_tables_default_to_empty() {
        let manifest: PackageJson = serde_json::from_str(r#"{ "name": "x" }"#).unwrap();
        assert!(manifest.dependencies.is_empty());
        assert!(manifest.peer_dependencies.is_empty());
        assert!(!manifest.is_addon());
    }

    #[test]
    fn test_semver_accepts_leading_v() {
        let manifest = PackageJson {
            version: Some("v1.2.3".to_owned()),
            ..PackageJson::default()
        };
        let version = manifest.semver(Utf8Path::new("package.json")).unwrap();
        assert_eq!(version, semver::Version::new(1, 2, 3));
    }

    #[test]
    fn test_semver_missing_version() {
        let manifest = PackageJson::default();
        assert!(matches!(
            manifest.semver(Utf8Path::new("package.json")),
            Err(PackageError::InvalidVersion { .. })
        ));
    }

    #[test]
    fn test_read_dir() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        std::fs::write(
            root.join(MANIFEST_FILE),
            r#"{ "name": "app", "version": "0.0.1", "dependencies": { "alpha": "^1.0.0" } }"#,
        )
        .unwrap();
        let manifest = PackageJson::read_dir(root).unwrap();
        assert_eq!(manifest.name.as_deref(), Some("app"));
        assert_eq!(manifest.dependencies["alpha"], "^1.0.0");
    }

    #[test]
    fn test_read_reports_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        std::fs::write(root.join(MANIFEST_FILE), "{").unwrap();
        assert!(matches!(
            PackageJson::read_dir(root),
            Err(PackageError::ManifestParse { .. })
        ));
    }
}
