//! Imports with their owning package and file attached.
//!
//! An [`Import`] is an [`ImportSyntax`] plus the context the splitter needs
//! to resolve it: which package's rules apply, which file it came from and
//! what kind of tree that file lives in.

use std::sync::Arc;

use aim_core::{ImportSyntax, SourceLocation, TreeType};
use aim_package::Package;
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Serialize, Serializer};

/// An import with a single known target.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LiteralImport {
    /// The specifier as written, before aliasing.
    pub specifier: String,
    /// Whether the import is loaded lazily.
    pub is_dynamic: bool,
    /// The importing file, relative to its input directory.
    pub path: Utf8PathBuf,
    /// The package whose rules resolve this import.
    #[serde(serialize_with = "serialize_package")]
    pub package: Arc<Package>,
    /// Kind of tree the file lives in, when known.
    pub tree_type: Option<TreeType>,
    /// Where the import appears.
    pub location: SourceLocation,
}

/// An import whose target is a template string with interpolations.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateImport {
    /// Cooked literal segments; one more than there are hints.
    pub cooked_quasis: Vec<String>,
    /// Identifier names of the interpolated expressions, where available.
    pub expression_name_hints: Vec<Option<String>>,
    /// Whether the import is loaded lazily.
    pub is_dynamic: bool,
    /// The importing file, relative to its input directory.
    pub path: Utf8PathBuf,
    /// The package whose rules resolve this import.
    #[serde(serialize_with = "serialize_package")]
    pub package: Arc<Package>,
    /// Kind of tree the file lives in, when known.
    pub tree_type: Option<TreeType>,
    /// Where the import appears.
    pub location: SourceLocation,
}

impl TemplateImport {
    /// The first quasi, which must name the target package.
    #[must_use]
    pub fn leading_quasi(&self) -> &str {
        self.cooked_quasis.first().map_or("", String::as_str)
    }
}

/// An import found by an [`Analyzer`](crate::Analyzer).
///
/// Equality compares packages by identity, not by name.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Import {
    /// See [`LiteralImport`].
    Literal(LiteralImport),
    /// See [`TemplateImport`].
    Template(TemplateImport),
}

impl Import {
    /// Attaches package and file context to parser output.
    #[must_use]
    pub fn from_syntax(
        syntax: &ImportSyntax,
        path: &Utf8Path,
        package: &Arc<Package>,
        tree_type: Option<TreeType>,
    ) -> Self {
        match syntax {
            ImportSyntax::Literal(literal) => Self::Literal(LiteralImport {
                specifier: literal.specifier.clone(),
                is_dynamic: literal.is_dynamic,
                path: path.to_owned(),
                package: Arc::clone(package),
                tree_type,
                location: literal.location,
            }),
            ImportSyntax::Template(template) => Self::Template(TemplateImport {
                cooked_quasis: template.cooked_quasis().to_vec(),
                expression_name_hints: template.expression_name_hints().to_vec(),
                is_dynamic: template.is_dynamic(),
                path: path.to_owned(),
                package: Arc::clone(package),
                tree_type,
                location: template.location(),
            }),
        }
    }

    /// Whether the import is loaded lazily.
    #[must_use]
    pub const fn is_dynamic(&self) -> bool {
        match self {
            Self::Literal(import) => import.is_dynamic,
            Self::Template(import) => import.is_dynamic,
        }
    }

    /// The importing file, relative to its input directory.
    #[must_use]
    pub fn path(&self) -> &Utf8Path {
        match self {
            Self::Literal(import) => &import.path,
            Self::Template(import) => &import.path,
        }
    }

    /// The package whose rules resolve this import.
    #[must_use]
    pub fn package(&self) -> &Arc<Package> {
        match self {
            Self::Literal(import) => &import.package,
            Self::Template(import) => &import.package,
        }
    }

    /// Kind of tree the importing file lives in.
    #[must_use]
    pub const fn tree_type(&self) -> Option<TreeType> {
        match self {
            Self::Literal(import) => import.tree_type,
            Self::Template(import) => import.tree_type,
        }
    }

    /// Where the import appears.
    #[must_use]
    pub const fn location(&self) -> SourceLocation {
        match self {
            Self::Literal(import) => import.location,
            Self::Template(import) => import.location,
        }
    }
}

// Locations are diagnostic only. Moving an import within its file does not
// change what gets bundled.
impl PartialEq for LiteralImport {
    fn eq(&self, other: &Self) -> bool {
        self.specifier == other.specifier
            && self.is_dynamic == other.is_dynamic
            && self.path == other.path
            && self.tree_type == other.tree_type
            && Arc::ptr_eq(&self.package, &other.package)
    }
}

impl Eq for LiteralImport {}

impl PartialEq for TemplateImport {
    fn eq(&self, other: &Self) -> bool {
        self.cooked_quasis == other.cooked_quasis
            && self.expression_name_hints == other.expression_name_hints
            && self.is_dynamic == other.is_dynamic
            && self.path == other.path
            && self.tree_type == other.tree_type
            && Arc::ptr_eq(&self.package, &other.package)
    }
}

impl Eq for TemplateImport {}

impl PartialEq for Import {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Literal(a), Self::Literal(b)) => a == b,
            (Self::Template(a), Self::Template(b)) => a == b,
            _ => false,
        }
    }
}

impl Eq for Import {}

fn serialize_package<S: Serializer>(package: &Arc<Package>, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(package.name())
}

/// Anything that can hand the splitter its current imports.
///
/// Implementors must return the same `Arc` for as long as their imports
/// are unchanged; the splitter's memo compares snapshots by pointer.
pub trait ImportSource {
    /// The current imports, flattened.
    fn imports(&self) -> Arc<[Import]>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use aim_core::{AutoImportOptions, LiteralSyntax, TemplateSyntax};
    use aim_package::InvalidationSource;

    fn package(name: &str) -> Arc<Package> {
        Arc::new(Package::new(
            name,
            Utf8PathBuf::from("/work").join(name),
            false,
            AutoImportOptions::default(),
            InvalidationSource::new().token(),
        ))
    }

    fn literal(specifier: &str) -> ImportSyntax {
        ImportSyntax::Literal(LiteralSyntax::new(specifier, false, SourceLocation::new(1, 0, 0)))
    }

    #[test]
    fn test_equality_uses_package_identity() {
        let first = package("app");
        let twin = package("app");
        let path = Utf8Path::new("index.js");

        let a = Import::from_syntax(&literal("lodash"), path, &first, Some(TreeType::App));
        let b = Import::from_syntax(&literal("lodash"), path, &first, Some(TreeType::App));
        let c = Import::from_syntax(&literal("lodash"), path, &twin, Some(TreeType::App));

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_equality_ignores_location() {
        let app = package("app");
        let path = Utf8Path::new("index.js");
        let moved = ImportSyntax::Literal(LiteralSyntax::new(
            "lodash",
            false,
            SourceLocation::new(7, 2, 90),
        ));

        let a = Import::from_syntax(&literal("lodash"), path, &app, Some(TreeType::App));
        let b = Import::from_syntax(&moved, path, &app, Some(TreeType::App));
        assert_eq!(a, b);
    }

    #[test]
    fn test_template_keeps_quasis_and_hints() {
        let syntax = ImportSyntax::Template(
            TemplateSyntax::new(
                vec!["alpha/".to_owned(), String::new()],
                vec![Some("x".to_owned())],
                true,
                SourceLocation::new(2, 4, 20),
            )
            .unwrap(),
        );
        let import = Import::from_syntax(&syntax, Utf8Path::new("a.js"), &package("app"), None);

        let Import::Template(template) = &import else {
            panic!("expected a template import");
        };
        assert_eq!(template.leading_quasi(), "alpha/");
        assert_eq!(template.expression_name_hints, [Some("x".to_owned())]);
        assert!(import.is_dynamic());
    }

    #[test]
    fn test_serializes_package_as_name() {
        let import = Import::from_syntax(
            &literal("lodash"),
            Utf8Path::new("routes/index.js"),
            &package("my-app"),
            Some(TreeType::App),
        );
        insta::assert_json_snapshot!(import, @r#"
        {
          "kind": "literal",
          "specifier": "lodash",
          "isDynamic": false,
          "path": "routes/index.js",
          "package": "my-app",
          "treeType": "app",
          "location": {
            "line": 1,
            "column": 0,
            "byte_offset": 0
          }
        }
        "#);
    }
}
