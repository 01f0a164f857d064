//! Imports as they appear in source.
//!
//! These are the parser's output: pure data with no knowledge of which
//! package or file they came from. The analyzer wraps them with that context.
//!
//! | Source                         | Variant                      | `is_dynamic` |
//! |--------------------------------|------------------------------|--------------|
//! | `import x from 'a'`            | [`ImportSyntax::Literal`]    | `false`      |
//! | `export { x } from 'a'`        | [`ImportSyntax::Literal`]    | `false`      |
//! | `import('a')`, `` import(`a`) ``| [`ImportSyntax::Literal`]   | `true`       |
//! | `` import(`a/${x}`) ``         | [`ImportSyntax::Template`]   | `true`       |
//! | `importSync('a')`              | [`ImportSyntax::Literal`]    | `false`      |

use serde::{Deserialize, Serialize};

use super::location::SourceLocation;

/// An import whose target is a single known string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiteralSyntax {
    /// The cooked specifier, e.g. `"lodash/get"`.
    pub specifier: String,

    /// Whether the import is loaded lazily via `import()`.
    pub is_dynamic: bool,

    /// Where the import appears.
    pub location: SourceLocation,
}

impl LiteralSyntax {
    /// Creates a literal import.
    #[must_use]
    pub fn new(specifier: impl Into<String>, is_dynamic: bool, location: SourceLocation) -> Self {
        Self {
            specifier: specifier.into(),
            is_dynamic,
            location,
        }
    }
}

/// An import whose target is a template string with interpolations.
///
/// Only the literal segments ("quasis") are known statically. There is always
/// exactly one more quasi than there are interpolated expressions, which the
/// constructor enforces.
///
/// # Examples
///
/// ```
/// use aim_core::{SourceLocation, TemplateSyntax};
///
/// let template = TemplateSyntax::new(
///     vec!["chart.js/locale/".to_owned(), ".js".to_owned()],
///     vec![Some("lang".to_owned())],
///     true,
///     SourceLocation::default(),
/// )
/// .unwrap();
/// assert_eq!(template.leading_quasi(), "chart.js/locale/");
///
/// // Mismatched lengths are rejected.
/// assert!(TemplateSyntax::new(vec![], vec![], true, SourceLocation::default()).is_none());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateSyntax {
    cooked_quasis: Vec<String>,
    expression_name_hints: Vec<Option<String>>,
    is_dynamic: bool,
    location: SourceLocation,
}

impl TemplateSyntax {
    /// Creates a template import, returning `None` unless
    /// `cooked_quasis.len() == expression_name_hints.len() + 1`.
    #[must_use]
    pub fn new(
        cooked_quasis: Vec<String>,
        expression_name_hints: Vec<Option<String>>,
        is_dynamic: bool,
        location: SourceLocation,
    ) -> Option<Self> {
        if cooked_quasis.len() != expression_name_hints.len() + 1 {
            return None;
        }
        Some(Self {
            cooked_quasis,
            expression_name_hints,
            is_dynamic,
            location,
        })
    }

    /// The literal segments around each interpolation, escapes already applied.
    #[inline]
    #[must_use]
    pub fn cooked_quasis(&self) -> &[String] {
        &self.cooked_quasis
    }

    /// Best-effort identifier name for each interpolation slot.
    #[inline]
    #[must_use]
    pub fn expression_name_hints(&self) -> &[Option<String>] {
        &self.expression_name_hints
    }

    /// The first literal segment, before any interpolation.
    #[inline]
    #[must_use]
    pub fn leading_quasi(&self) -> &str {
        self.cooked_quasis.first().map_or("", String::as_str)
    }

    /// Whether the import is loaded lazily via `import()`.
    #[inline]
    #[must_use]
    pub const fn is_dynamic(&self) -> bool {
        self.is_dynamic
    }

    /// Where the import appears.
    #[inline]
    #[must_use]
    pub const fn location(&self) -> SourceLocation {
        self.location
    }
}

/// A discovered import, before package context is attached.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ImportSyntax {
    /// The target is a plain string.
    Literal(LiteralSyntax),
    /// The target is a template string with interpolations.
    Template(TemplateSyntax),
}

impl ImportSyntax {
    /// Whether the import is loaded lazily via `import()`.
    #[inline]
    #[must_use]
    pub const fn is_dynamic(&self) -> bool {
        match self {
            Self::Literal(literal) => literal.is_dynamic,
            Self::Template(template) => template.is_dynamic,
        }
    }

    /// Where the import appears.
    #[inline]
    #[must_use]
    pub const fn location(&self) -> SourceLocation {
        match self {
            Self::Literal(literal) => literal.location,
            Self::Template(template) => template.location,
        }
    }
}
