//! One [`Package`] per distinct root.
//!
//! Import equality compares packages by identity, so two analyzers over the
//! same package must share the same `Arc<Package>`.

use std::sync::Arc;

use aim_core::PackageConfig;
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::debug;

use crate::error::PackageError;
use crate::invalidation::InvalidationSource;
use crate::package::Package;

/// Interns packages by canonical root.
///
/// # Examples
///
/// ```no_run
/// use aim_core::PackageConfig;
/// use aim_package::PackageCache;
/// use camino::Utf8Path;
///
/// let cache = PackageCache::new();
/// let root = Utf8Path::new("/work/my-app");
/// let a = cache.get_or_create(root, &PackageConfig::default(), false)?;
/// let b = cache.get_or_create(root, &PackageConfig::default(), false)?;
/// assert!(std::sync::Arc::ptr_eq(&a, &b));
/// # Ok::<(), aim_package::PackageError>(())
/// ```
#[derive(Debug, Default)]
pub struct PackageCache {
    invalidation: InvalidationSource,
    packages: RwLock<IndexMap<Utf8PathBuf, Arc<Package>>>,
}

impl PackageCache {
    /// Creates an empty cache with a fresh [`InvalidationSource`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty cache whose packages observe `invalidation`.
    #[must_use]
    pub fn with_invalidation(invalidation: InvalidationSource) -> Self {
        Self {
            invalidation,
            packages: RwLock::new(IndexMap::new()),
        }
    }

    /// The source every cached package observes.
    #[must_use]
    pub const fn invalidation(&self) -> &InvalidationSource {
        &self.invalidation
    }

    /// Returns the package for `config`, creating it on first request.
    ///
    /// Options and addon status are taken from the first request for a root;
    /// later requests for the same root get the existing package.
    ///
    /// # Errors
    ///
    /// See [`Package::from_config`].
    pub fn get_or_create(
        &self,
        project_root: &Utf8Path,
        config: &PackageConfig,
        is_addon: bool,
    ) -> Result<Arc<Package>, PackageError> {
        let root = project_root
            .join(&config.root)
            .canonicalize_utf8()
            .map_err(|e| PackageError::io(project_root.join(&config.root), e))?;

        if let Some(existing) = self.packages.read().get(&root) {
            return Ok(Arc::clone(existing));
        }

        let package = Arc::new(Package::from_config(
            project_root,
            config,
            is_addon,
            self.invalidation.token(),
        )?);

        let mut packages = self.packages.write();
        let entry = packages.entry(root).or_insert_with(|| {
            debug!(package = %package.name(), root = %package.root(), "registered package");
            Arc::clone(&package)
        });
        Ok(Arc::clone(entry))
    }

    /// All packages in creation order.
    #[must_use]
    pub fn packages(&self) -> Vec<Arc<Package>> {
        self.packages.read().values().map(Arc::clone).collect()
    }

    /// Number of distinct packages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.packages.read().len()
    }

    /// Whether no package has been created yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.packages.read().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_root_shares_identity() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        std::fs::write(root.join("package.json"), r#"{ "name": "app" }"#).unwrap();

        let cache = PackageCache::new();
        let a = cache.get_or_create(root, &PackageConfig::default(), false).unwrap();
        let alias = PackageConfig {
            root: "./".into(),
            ..PackageConfig::default()
        };
        let b = cache.get_or_create(root, &alias, false).unwrap();

        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_packages_share_invalidation() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap();
        std::fs::write(root.join("package.json"), r#"{ "name": "app" }"#).unwrap();

        let cache = PackageCache::new();
        let app = cache.get_or_create(root, &PackageConfig::default(), false).unwrap();
        assert!(!app.has_dependency("x").unwrap());

        std::fs::write(
            root.join("package.json"),
            r#"{ "name": "app", "dependencies": { "x": "*" } }"#,
        )
        .unwrap();
        cache.invalidation().bump();
        assert!(app.has_dependency("x").unwrap());
    }

    #[test]
    fn test_missing_root() {
        let cache = PackageCache::new();
        let config = PackageConfig {
            root: "does/not/exist".into(),
            ..PackageConfig::default()
        };
        assert!(matches!(
            cache.get_or_create(Utf8Path::new("/nowhere"), &config, false),
            Err(PackageError::Io { .. })
        ));
        assert!(cache.is_empty());
    }
}
