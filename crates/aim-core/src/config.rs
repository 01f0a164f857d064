//! Configuration structures for the aim workspace.
//!
//! - [`AutoImportOptions`] - Per-package import options (exclude, alias, backend overrides)
//! - [`PackageConfig`] - One package taking part in the build: its root, options and source trees
//! - [`BundlesConfig`] - Output bundle names, asset types and entrypoints
//! - [`WatchConfig`] - File watcher settings (debouncing, recursion)
//! - [`ProjectConfig`] - Root configuration, usually loaded from `aim.json`
//!
//! Every type deserializes with `#[serde(default)]`, so a config file only
//! needs to spell out what differs from the defaults. Keys are camelCase to
//! match the `package.json` options they mirror.

use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::TreeType;

/// The file name [`ProjectConfig::discover`] looks for.
pub const CONFIG_FILE_NAME: &str = "aim.json";

/// A rule telling the backend not to transpile a package.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SkipBabel {
    /// Package name the rule applies to.
    pub package: String,

    /// Only versions matching this npm range are skipped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semver_range: Option<String>,
}

/// A dependency whose installed sources should be watched in dev mode.
///
/// Either a single package name, or a chain of names where each entry is
/// resolved from the previous one (`["a", "b"]` watches the `b` that `a`
/// depends on).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WatchDependency {
    /// A direct dependency of the app.
    Name(String),
    /// A transitive dependency reached through the listed packages.
    Chain(Vec<String>),
}

impl WatchDependency {
    /// The package names to walk, outermost first.
    #[must_use]
    pub fn chain(&self) -> &[String] {
        match self {
            Self::Name(name) => std::slice::from_ref(name),
            Self::Chain(names) => names,
        }
    }
}

/// Import options a package declares for itself.
///
/// # Examples
///
/// ```
/// use aim_core::AutoImportOptions;
///
/// let options: AutoImportOptions = serde_json::from_str(
///     r#"{ "exclude": ["jquery"], "alias": { "lo": "lodash-es" } }"#,
/// )
/// .unwrap();
/// assert_eq!(options.exclude, vec!["jquery"]);
/// assert_eq!(options.alias["lo"], "lodash-es");
/// assert!(!options.forbid_eval);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AutoImportOptions {
    /// Package names that are never auto-imported.
    pub exclude: Vec<String>,

    /// Specifier prefix rewrites, applied before resolution.
    pub alias: IndexMap<String, String>,

    /// Backend configuration merged into the bundler's config.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub webpack: Option<serde_json::Value>,

    /// Public URL prefix for emitted chunks. App-only.
    #[serde(rename = "publicAssetURL", skip_serializing_if = "Option::is_none")]
    pub public_asset_url: Option<String>,

    /// Forbid `eval` in generated bundles. App-only.
    pub forbid_eval: bool,

    /// Packages the backend should not transpile.
    pub skip_babel: Vec<SkipBabel>,

    /// Dependencies to watch for rebuilds. App-only.
    pub watch_dependencies: Vec<WatchDependency>,
}

/// A source tree belonging to a package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeConfig {
    /// Directory relative to the package root.
    pub dir: Utf8PathBuf,

    /// The kind of tree. When absent, bundle assignment falls back to path rules.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub tree_type: Option<TreeType>,
}

impl TreeConfig {
    /// Creates a tree config.
    #[must_use]
    pub fn new(dir: impl Into<Utf8PathBuf>, tree_type: Option<TreeType>) -> Self {
        Self {
            dir: dir.into(),
            tree_type,
        }
    }
}

/// A package taking part in the build.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PackageConfig {
    /// Package root, relative to the project root.
    pub root: Utf8PathBuf,

    /// Overrides the name read from `package.json`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// The package's import options.
    pub options: AutoImportOptions,

    /// Source trees to analyze.
    pub trees: Vec<TreeConfig>,
}

impl Default for PackageConfig {
    fn default() -> Self {
        Self {
            root: Utf8PathBuf::from("."),
            name: None,
            options: AutoImportOptions::default(),
            trees: Vec::new(),
        }
    }
}

impl PackageConfig {
    /// The conventional app layout: `app/` and `tests/` at the project root.
    #[must_use]
    pub fn default_app() -> Self {
        Self {
            trees: vec![
                TreeConfig::new("app", Some(TreeType::App)),
                TreeConfig::new("tests", Some(TreeType::Test)),
            ],
            ..Self::default()
        }
    }
}

/// Output bundle layout.
///
/// # Examples
///
/// ```
/// use aim_core::BundlesConfig;
///
/// let bundles = BundlesConfig::default();
/// assert_eq!(bundles.names, vec!["app", "tests"]);
/// assert_eq!(bundles.entrypoints["tests"]["css"], "assets/test-support.css");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct BundlesConfig {
    /// Bundle names in priority order.
    pub names: Vec<String>,

    /// Asset types every bundle emits.
    pub types: Vec<String>,

    /// `bundle -> type -> output path`.
    pub entrypoints: IndexMap<String, IndexMap<String, String>>,

    /// Bundle receiving application code.
    pub app_bundle: String,

    /// Bundle receiving test trees and files under `tests/` or `test-support/`.
    pub test_bundle: String,
}

impl Default for BundlesConfig {
    fn default() -> Self {
        let entry = |js: &str, css: &str| {
            IndexMap::from([
                ("js".to_owned(), js.to_owned()),
                ("css".to_owned(), css.to_owned()),
            ])
        };
        Self {
            names: vec!["app".to_owned(), "tests".to_owned()],
            types: vec!["js".to_owned(), "css".to_owned()],
            entrypoints: IndexMap::from([
                (
                    "app".to_owned(),
                    entry("assets/vendor.js", "assets/vendor.css"),
                ),
                (
                    "tests".to_owned(),
                    entry("assets/test-support.js", "assets/test-support.css"),
                ),
            ]),
            app_bundle: "app".to_owned(),
            test_bundle: "tests".to_owned(),
        }
    }
}

/// Configuration for the file watcher.
///
/// Controls how file changes are detected and debounced.
///
/// # Examples
///
/// ```
/// use aim_core::WatchConfig;
///
/// let config = WatchConfig::default();
/// assert_eq!(config.debounce_ms, 100);
/// assert!(config.recursive);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WatchConfig {
    /// Debounce window in milliseconds.
    ///
    /// Multiple file changes within this window are batched into a single event.
    pub debounce_ms: u64,

    /// Whether to watch subdirectories recursively.
    pub recursive: bool,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 100,
            recursive: true,
        }
    }
}

/// Root configuration for a project.
///
/// Combines the app, its addons and the bundle layout into a single structure
/// that can be loaded from `aim.json` or constructed programmatically.
///
/// # Examples
///
/// ```
/// use aim_core::ProjectConfig;
///
/// let config = ProjectConfig::default();
/// assert_eq!(config.app.trees.len(), 2);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ProjectConfig {
    /// The application package.
    pub app: PackageConfig,

    /// Addons whose trees are analyzed alongside the app.
    pub addons: Vec<PackageConfig>,

    /// Output bundle layout.
    pub bundles: BundlesConfig,

    /// Watch mode settings.
    pub watch: WatchConfig,

    /// Where analyzed trees are mirrored, relative to the project root.
    pub output_dir: Utf8PathBuf,

    /// Source extensions the parser handles, without the leading dot.
    pub extensions: Vec<String>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            app: PackageConfig::default_app(),
            addons: Vec::new(),
            bundles: BundlesConfig::default(),
            watch: WatchConfig::default(),
            output_dir: Utf8PathBuf::from("dist/aim"),
            extensions: ["js", "mjs", "ts", "jsx", "tsx"]
                .into_iter()
                .map(str::to_owned)
                .collect(),
        }
    }
}

impl ProjectConfig {
    /// Loads and validates a config file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read,
    /// [`ConfigError::Parse`] if it is not valid JSON for this shape, and any
    /// error [`validate`](Self::validate) reports.
    pub fn load(path: &Utf8Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        let config: Self = serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_owned(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Loads `aim.json` from `project_root` if present, else the defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingDirectory`] if `project_root` is not a
    /// directory, or any error from [`load`](Self::load).
    pub fn discover(project_root: &Utf8Path) -> Result<Self, ConfigError> {
        if !project_root.is_dir() {
            return Err(ConfigError::MissingDirectory(project_root.to_owned()));
        }
        let candidate = project_root.join(CONFIG_FILE_NAME);
        if candidate.is_file() {
            Self::load(&candidate)
        } else {
            Ok(Self::default())
        }
    }

    /// The app followed by every addon.
    pub fn packages(&self) -> impl Iterator<Item = &PackageConfig> {
        std::iter::once(&self.app).chain(&self.addons)
    }

    /// Checks cross-field constraints serde cannot express.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidOption`] when an addon sets an app-only
    /// option, the bundle layout is empty, or an entrypoint names an unknown
    /// bundle or asset type. Returns [`ConfigError::InvalidPath`] when a
    /// package root or tree escapes upward with `..`.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for addon in &self.addons {
            let label = addon.name.as_deref().unwrap_or(addon.root.as_str());
            if addon.options.forbid_eval {
                return Err(ConfigError::invalid_option(
                    "forbidEval",
                    format!("only the app may set it (found on {label})"),
                ));
            }
            if !addon.options.watch_dependencies.is_empty() {
                return Err(ConfigError::invalid_option(
                    "watchDependencies",
                    format!("only the app may set it (found on {label})"),
                ));
            }
        }

        for package in self.packages() {
            for tree in &package.trees {
                if tree.dir.is_absolute() || escapes(&tree.dir) {
                    return Err(ConfigError::InvalidPath {
                        path: tree.dir.clone(),
                        reason: "tree directories must stay inside their package".to_owned(),
                    });
                }
            }
        }

        if self.bundles.names.is_empty() {
            return Err(ConfigError::invalid_option(
                "bundles.names",
                "at least one bundle is required",
            ));
        }
        for (field, bundle) in [
            ("bundles.appBundle", &self.bundles.app_bundle),
            ("bundles.testBundle", &self.bundles.test_bundle),
        ] {
            if !self.bundles.names.contains(bundle) {
                return Err(ConfigError::invalid_option(
                    field,
                    format!("bundle '{bundle}' is not listed in bundles.names"),
                ));
            }
        }
        for (bundle, types) in &self.bundles.entrypoints {
            if !self.bundles.names.contains(bundle) {
                return Err(ConfigError::invalid_option(
                    "bundles.entrypoints",
                    format!("unknown bundle '{bundle}'"),
                ));
            }
            if let Some(kind) = types.keys().find(|kind| !self.bundles.types.contains(*kind)) {
                return Err(ConfigError::invalid_option(
                    "bundles.entrypoints",
                    format!("unknown asset type '{kind}' for bundle '{bundle}'"),
                ));
            }
        }
        Ok(())
    }
}

fn escapes(path: &Utf8Path) -> bool {
    path.components()
        .any(|c| matches!(c, camino::Utf8Component::ParentDir))
}
