//! Options the bundler backend consumes, gathered from every package.

use std::sync::Arc;

use aim_core::SkipBabel;
use aim_package::{Package, PackageError};
use camino::Utf8PathBuf;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

/// Backend settings aggregated across the app and its addons.
///
/// # Examples
///
/// ```
/// use std::sync::Arc;
///
/// use aim_core::AutoImportOptions;
/// use aim_package::{InvalidationSource, Package};
/// use aim_splitter::BackendOptions;
///
/// let invalidation = InvalidationSource::new();
/// let options = AutoImportOptions {
///     forbid_eval: true,
///     ..AutoImportOptions::default()
/// };
/// let app = Arc::new(Package::new("my-app", "/work/my-app".into(), false, options, invalidation.token()));
///
/// let backend = BackendOptions::collect(&[app])?;
/// assert!(backend.forbid_eval);
/// # Ok::<(), aim_package::PackageError>(())
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BackendOptions {
    /// Every package's `webpack` overrides, deep-merged in package order.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webpack: Option<Value>,
    /// The app's public asset URL.
    #[serde(rename = "publicAssetURL", skip_serializing_if = "Option::is_none")]
    pub public_asset_url: Option<String>,
    /// Whether the app forbids `eval` in generated code.
    pub forbid_eval: bool,
    /// Transpilation opt-outs from every package.
    pub skip_babel: Vec<SkipBabel>,
    /// Installed dependency directories to watch in dev mode.
    pub watched_directories: Vec<Utf8PathBuf>,
}

impl BackendOptions {
    /// Gathers options from `packages`. The first non-addon package is the
    /// app.
    ///
    /// # Errors
    ///
    /// Returns [`PackageError::MissingPackage`] if a watched dependency is
    /// not installed.
    pub fn collect(packages: &[Arc<Package>]) -> Result<Self, PackageError> {
        let mut out = Self::default();

        for package in packages {
            let options = package.options();
            if let Some(webpack) = &options.webpack {
                match &mut out.webpack {
                    Some(merged) => merge(merged, webpack),
                    None => out.webpack = Some(webpack.clone()),
                }
            }
            out.skip_babel.extend(options.skip_babel.iter().cloned());
        }

        if let Some(app) = packages.iter().find(|package| !package.is_addon()) {
            let options = app.options();
            out.public_asset_url.clone_from(&options.public_asset_url);
            out.forbid_eval = options.forbid_eval;
            for dependency in &options.watch_dependencies {
                let dir = app.locate_chain(dependency.chain())?;
                debug!(dependency = ?dependency.chain(), dir = %dir, "watching dependency");
                out.watched_directories.push(dir);
            }
        }

        Ok(out)
    }
}

/// Deep-merges `source` into `target`: objects merge key by key, arrays
/// concatenate, anything else is replaced.
fn merge(target: &mut Value, source: &Value) {
    match (target, source) {
        (Value::Object(target), Value::Object(source)) => {
            for (key, value) in source {
                match target.get_mut(key) {
                    Some(existing) => merge(existing, value),
                    None => {
                        target.insert(key.clone(), value.clone());
                    }
                }
            }
        }
        (Value::Array(target), Value::Array(source)) => {
            target.extend(source.iter().cloned());
        }
        (target, source) => *target = source.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aim_core::{AutoImportOptions, WatchDependency};
    use aim_package::InvalidationSource;
    use camino::Utf8Path;
    use serde_json::json;

    fn package(name: &str, is_addon: bool, options: AutoImportOptions) -> Arc<Package> {
        Arc::new(Package::new(
            name,
            Utf8PathBuf::from("/work").join(name),
            is_addon,
            options,
            InvalidationSource::new().token(),
        ))
    }

    #[test]
    fn test_merge() {
        let mut target = json!({ "resolve": { "extensions": [".js"] }, "devtool": "eval" });
        merge(
            &mut target,
            &json!({ "resolve": { "extensions": [".ts"], "symlinks": false }, "devtool": false }),
        );
        assert_eq!(
            target,
            json!({ "resolve": { "extensions": [".js", ".ts"], "symlinks": false }, "devtool": false })
        );
    }

    #[test]
    fn test_app_only_settings_come_from_app() {
        let addon = package(
            "my-addon",
            true,
            AutoImportOptions {
                skip_babel: vec![SkipBabel {
                    package: "mapbox-gl".to_owned(),
                    semver_range: None,
                }],
                webpack: Some(json!({ "node": { "fs": "empty" } })),
                ..AutoImportOptions::default()
            },
        );
        let app = package(
            "my-app",
            false,
            AutoImportOptions {
                public_asset_url: Some("/assets/".to_owned()),
                webpack: Some(json!({ "node": { "path": true } })),
                ..AutoImportOptions::default()
            },
        );

        let options = BackendOptions::collect(&[addon, app]).unwrap();
        assert_eq!(options.public_asset_url.as_deref(), Some("/assets/"));
        assert!(!options.forbid_eval);
        assert_eq!(options.skip_babel.len(), 1);
        assert_eq!(
            options.webpack,
            Some(json!({ "node": { "fs": "empty", "path": true } }))
        );
    }

    #[test]
    fn test_watched_dependencies_are_located() {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path())
            .unwrap()
            .canonicalize_utf8()
            .unwrap();
        let installed = root.join("node_modules/watched-lib");
        std::fs::create_dir_all(&installed).unwrap();
        std::fs::write(installed.join("package.json"), r#"{ "name": "watched-lib" }"#).unwrap();

        let app = Arc::new(Package::new(
            "my-app",
            root.clone(),
            false,
            AutoImportOptions {
                watch_dependencies: vec![WatchDependency::Name("watched-lib".to_owned())],
                ..AutoImportOptions::default()
            },
            InvalidationSource::new().token(),
        ));

        let options = BackendOptions::collect(&[app]).unwrap();
        assert_eq!(options.watched_directories, [installed]);
    }
}
