//! Installed versions, read once per package root.

use std::collections::hash_map::Entry;

use aim_package::{PackageError, PackageJson};
use camino::{Utf8Path, Utf8PathBuf};
use rustc_hash::FxHashMap;
use semver::Version;

/// Caches the `version` field of installed packages.
#[derive(Debug, Default)]
pub struct VersionCache {
    versions: FxHashMap<Utf8PathBuf, Version>,
}

impl VersionCache {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The version installed at `root`.
    ///
    /// # Errors
    ///
    /// Returns an error if the manifest cannot be read or has no valid
    /// version.
    pub fn version(&mut self, root: &Utf8Path) -> Result<&Version, PackageError> {
        match self.versions.entry(root.to_owned()) {
            Entry::Occupied(entry) => Ok(&*entry.into_mut()),
            Entry::Vacant(entry) => {
                let version = PackageJson::read_dir(root)?.semver(root)?;
                Ok(&*entry.insert(version))
            }
        }
    }

    /// Forgets every version.
    pub fn clear(&mut self) {
        self.versions.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_and_caches() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        std::fs::write(root.join("package.json"), r#"{ "name": "x", "version": "1.2.3" }"#).unwrap();

        let mut cache = VersionCache::new();
        assert_eq!(*cache.version(root).unwrap(), Version::new(1, 2, 3));

        // Served from the cache until cleared.
        std::fs::write(root.join("package.json"), r#"{ "name": "x", "version": "2.0.0" }"#).unwrap();
        assert_eq!(*cache.version(root).unwrap(), Version::new(1, 2, 3));
        cache.clear();
        assert_eq!(*cache.version(root).unwrap(), Version::new(2, 0, 0));
    }
}
