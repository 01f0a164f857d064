//! What the splitter hands to the bundler backend.

use aim_analyzer::Import;
use camino::Utf8PathBuf;
use indexmap::IndexMap;
use serde::Serialize;

use crate::backend::BackendOptions;

/// A dependency imported through a plain string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedImport {
    /// The specifier as written by the importers.
    pub specifier: String,
    /// The specifier after aliasing; what the backend actually imports.
    pub path: String,
    /// The dependency's package name.
    pub package_name: String,
    /// Where the dependency is installed.
    pub package_root: Utf8PathBuf,
    /// Every import of this target in this bundle.
    pub imported_by: Vec<Import>,
}

/// A dependency imported through a template string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedTemplateImport {
    /// Cooked quasis; the first one is aliased.
    pub cooked_quasis: Vec<String>,
    /// One name per interpolation, `arg{index}` where none was found.
    pub expression_name_hints: Vec<String>,
    /// The dependency's package name.
    pub package_name: String,
    /// Where the dependency is installed.
    pub package_root: Utf8PathBuf,
    /// Every import of this target in this bundle.
    pub imported_by: Vec<Import>,
}

impl ResolvedTemplateImport {
    /// The aliased leading quasi.
    #[must_use]
    pub fn leading_quasi(&self) -> &str {
        self.cooked_quasis.first().map_or("", String::as_str)
    }
}

/// Dependencies of one bundle.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BundleDependencies {
    /// Needed when the bundle loads.
    pub static_imports: Vec<ResolvedImport>,
    /// Template imports needed when the bundle loads.
    pub static_template_imports: Vec<ResolvedTemplateImport>,
    /// Loaded lazily through `import()`.
    pub dynamic_imports: Vec<ResolvedImport>,
    /// Template imports loaded lazily.
    pub dynamic_template_imports: Vec<ResolvedTemplateImport>,
}

impl BundleDependencies {
    /// Whether the bundle needs nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.static_imports.is_empty()
            && self.static_template_imports.is_empty()
            && self.dynamic_imports.is_empty()
            && self.dynamic_template_imports.is_empty()
    }
}

/// Per-bundle dependencies plus everything else the backend needs.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DependencyManifest {
    /// Dependencies keyed by bundle name, in priority order.
    pub bundles: IndexMap<String, BundleDependencies>,
    /// `bundle -> type -> output path`.
    pub entrypoints: IndexMap<String, IndexMap<String, String>>,
    /// Aggregated backend options.
    pub options: BackendOptions,
}

impl DependencyManifest {
    /// Dependencies of one bundle.
    #[must_use]
    pub fn bundle(&self, name: &str) -> Option<&BundleDependencies> {
        self.bundles.get(name)
    }
}
