//! Which output bundle a dependency belongs in.

use aim_analyzer::Import;
use aim_core::{BundlesConfig, TreeType};
use camino::Utf8Path;
use indexmap::IndexMap;

use crate::error::SplitError;

/// Bundle names, asset types and their output paths.
///
/// Names are in priority order: a dependency used by several bundles goes
/// to the first of them. Test trees map to the configured test bundle and
/// everything else to the app bundle.
///
/// # Examples
///
/// ```
/// use aim_core::{BundlesConfig, TreeType};
/// use aim_splitter::BundleConfig;
///
/// let bundles = BundleConfig::new(&BundlesConfig::default());
/// assert_eq!(bundles.names(), ["app", "tests"]);
/// assert_eq!(bundles.entrypoint("tests", "js")?, "assets/test-support.js");
/// assert_eq!(bundles.bundle_for_tree_type(TreeType::AddonTestSupport), "tests");
/// # Ok::<(), aim_splitter::SplitError>(())
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleConfig {
    names: Vec<String>,
    types: Vec<String>,
    entrypoints: IndexMap<String, IndexMap<String, String>>,
    app_bundle: String,
    test_bundle: String,
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self::new(&BundlesConfig::default())
    }
}

impl BundleConfig {
    /// Creates a layout from configuration.
    #[must_use]
    pub fn new(config: &BundlesConfig) -> Self {
        Self {
            names: config.names.clone(),
            types: config.types.clone(),
            entrypoints: config.entrypoints.clone(),
            app_bundle: config.app_bundle.clone(),
            test_bundle: config.test_bundle.clone(),
        }
    }

    /// Bundle names in priority order.
    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Asset types every bundle emits.
    #[must_use]
    pub fn types(&self) -> &[String] {
        &self.types
    }

    /// `bundle -> type -> output path`.
    #[must_use]
    pub const fn entrypoints(&self) -> &IndexMap<String, IndexMap<String, String>> {
        &self.entrypoints
    }

    /// The output path of one asset of one bundle.
    ///
    /// # Errors
    ///
    /// Returns [`SplitError::UnknownBundle`] if the bundle or type is not
    /// configured.
    pub fn entrypoint(&self, bundle: &str, asset_type: &str) -> Result<&str, SplitError> {
        self.entrypoints
            .get(bundle)
            .and_then(|types| types.get(asset_type))
            .map(String::as_str)
            .ok_or_else(|| SplitError::UnknownBundle {
                bundle: bundle.to_owned(),
                asset_type: asset_type.to_owned(),
            })
    }

    /// The bundle application code lands in.
    #[must_use]
    pub fn app_bundle(&self) -> &str {
        &self.app_bundle
    }

    /// The bundle test code lands in.
    #[must_use]
    pub fn test_bundle(&self) -> &str {
        &self.test_bundle
    }

    /// The bundle code from a tree of this type belongs in.
    #[must_use]
    pub fn bundle_for_tree_type(&self, tree_type: TreeType) -> &str {
        if tree_type.is_test() {
            &self.test_bundle
        } else {
            &self.app_bundle
        }
    }

    /// Fallback for files with no tree type: any `tests` or `test-support`
    /// path segment means test code.
    #[must_use]
    pub fn bundle_for_path(&self, path: &Utf8Path) -> &str {
        let is_test = path
            .components()
            .any(|segment| matches!(segment.as_str(), "tests" | "test-support"));
        if is_test { &self.test_bundle } else { &self.app_bundle }
    }

    /// The bundle one importer asks for.
    #[must_use]
    pub fn bundle_for(&self, import: &Import) -> &str {
        import.tree_type().map_or_else(
            || self.bundle_for_path(import.path()),
            |tree_type| self.bundle_for_tree_type(tree_type),
        )
    }

    /// Picks the highest-priority bundle any of `importers` asks for.
    ///
    /// Falls back to the first configured bundle when none of the requested
    /// bundles is configured.
    #[must_use]
    pub fn choose<'a, I>(&self, importers: I) -> &str
    where
        I: IntoIterator<Item = &'a Import>,
    {
        let wanted: Vec<&str> = importers
            .into_iter()
            .map(|import| self.bundle_for(import))
            .collect();
        self.names
            .iter()
            .find(|name| wanted.contains(&name.as_str()))
            .or_else(|| self.names.first())
            .map_or(self.app_bundle.as_str(), String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aim_core::{AutoImportOptions, ImportSyntax, LiteralSyntax, SourceLocation};
    use aim_package::{InvalidationSource, Package};
    use camino::Utf8PathBuf;
    use std::sync::Arc;

    fn importer(path: &str, tree_type: Option<TreeType>) -> Import {
        let package = Arc::new(Package::new(
            "app",
            Utf8PathBuf::from("/work/app"),
            false,
            AutoImportOptions::default(),
            InvalidationSource::new().token(),
        ));
        let syntax =
            ImportSyntax::Literal(LiteralSyntax::new("lodash", false, SourceLocation::new(1, 0, 0)));
        Import::from_syntax(&syntax, Utf8Path::new(path), &package, tree_type)
    }

    fn renamed() -> BundleConfig {
        let config = BundlesConfig {
            names: vec!["vendor".to_owned(), "test-support".to_owned()],
            entrypoints: IndexMap::new(),
            app_bundle: "vendor".to_owned(),
            test_bundle: "test-support".to_owned(),
            ..BundlesConfig::default()
        };
        BundleConfig::new(&config)
    }

    #[test]
    fn test_tree_type_mapping() {
        let bundles = BundleConfig::default();
        for tree_type in TreeType::ALL {
            let expected = match tree_type {
                TreeType::Test | TreeType::AddonTestSupport => "tests",
                _ => "app",
            };
            assert_eq!(bundles.bundle_for_tree_type(tree_type), expected);
        }
    }

    #[test]
    fn test_path_fallback() {
        let bundles = BundleConfig::default();
        assert_eq!(bundles.bundle_for_path(Utf8Path::new("tests/unit/a.js")), "tests");
        assert_eq!(
            bundles.bundle_for_path(Utf8Path::new("addon/test-support/helper.js")),
            "tests"
        );
        assert_eq!(bundles.bundle_for_path(Utf8Path::new("app/tests.js")), "app");
        assert_eq!(bundles.bundle_for_path(Utf8Path::new("routes/index.js")), "app");
    }

    #[test]
    fn test_renamed_bundles_route_test_code() {
        let bundles = renamed();
        assert_eq!(bundles.bundle_for_tree_type(TreeType::Test), "test-support");
        assert_eq!(bundles.bundle_for_tree_type(TreeType::Addon), "vendor");
        assert_eq!(bundles.bundle_for_path(Utf8Path::new("tests/unit/a.js")), "test-support");

        let tests_only = [importer("tests/unit/a-test.js", Some(TreeType::Test))];
        assert_eq!(bundles.choose(&tests_only), "test-support");

        let untyped = [importer("tests/helpers/setup.js", None)];
        assert_eq!(bundles.choose(&untyped), "test-support");

        let mixed = [
            importer("tests/unit/a-test.js", Some(TreeType::Test)),
            importer("app/routes/index.js", Some(TreeType::App)),
        ];
        assert_eq!(bundles.choose(&mixed), "vendor");
    }

    #[test]
    fn test_unknown_entrypoints() {
        let bundles = BundleConfig::default();
        assert_eq!(bundles.entrypoint("app", "css").unwrap(), "assets/vendor.css");
        assert!(matches!(
            bundles.entrypoint("admin", "js"),
            Err(SplitError::UnknownBundle { .. })
        ));
        assert!(matches!(
            bundles.entrypoint("app", "wasm"),
            Err(SplitError::UnknownBundle { .. })
        ));
    }
}
