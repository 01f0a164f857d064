//! Parser management using tree-sitter.
//!
//! This module provides the [`TsParser`] struct for parsing source files and
//! extracting import information, and [`Dialect`] for picking a grammar.

use smallvec::SmallVec;
use tree_sitter::{Language, Parser};

use aim_core::ImportSyntax;

use crate::error::ParseError;
use crate::import::extract_imports;
use crate::queries::import_query;

/// The grammar a file is parsed with.
///
/// Plain TypeScript and TSX disagree on `<T>expr` casts, so `.ts` files get
/// the TypeScript grammar. Everything else gets TSX, which accepts all of
/// JavaScript plus JSX.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dialect {
    /// The TypeScript grammar, for `.ts` files.
    TypeScript,
    /// The TSX grammar, for `.js`, `.mjs`, `.jsx` and `.tsx` files.
    Tsx,
}

impl Dialect {
    /// Picks the grammar for a file extension, given without the leading dot.
    ///
    /// # Examples
    ///
    /// ```
    /// use aim_parser::Dialect;
    ///
    /// assert_eq!(Dialect::from_extension("ts"), Dialect::TypeScript);
    /// assert_eq!(Dialect::from_extension("js"), Dialect::Tsx);
    /// assert_eq!(Dialect::from_extension("tsx"), Dialect::Tsx);
    /// ```
    #[must_use]
    pub fn from_extension(extension: &str) -> Self {
        if extension.eq_ignore_ascii_case("ts") {
            Self::TypeScript
        } else {
            Self::Tsx
        }
    }

    /// The tree-sitter language for this grammar.
    #[must_use]
    pub fn language(self) -> Language {
        match self {
            Self::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            Self::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
        }
    }

    const fn name(self) -> &'static str {
        match self {
            Self::TypeScript => "TypeScript",
            Self::Tsx => "TSX",
        }
    }
}

/// Imports extracted from one file.
///
/// Uses `SmallVec<[ImportSyntax; 8]>` to avoid heap allocation for typical
/// files with 8 or fewer imports.
pub type ParseResult = SmallVec<[ImportSyntax; 8]>;

/// Parser for extracting imports from source files.
///
/// Holds one tree-sitter parser per [`Dialect`]. The parser can be reused for
/// multiple files to avoid repeated initialization.
///
/// # Thread Safety
///
/// `TsParser` is `Send` but not `Sync`. For parallel parsing with rayon,
/// create one parser per worker with `map_init`. The compiled queries are
/// thread-safe and shared across all parser instances.
///
/// # Examples
///
/// ```
/// use aim_parser::{Dialect, TsParser};
///
/// let mut parser = TsParser::new()?;
/// let imports = parser.parse("import 'lodash';\nimport('moment');", Dialect::Tsx)?;
/// assert_eq!(imports.len(), 2);
/// assert!(imports[1].is_dynamic());
/// # Ok::<(), aim_parser::ParseError>(())
/// ```
pub struct TsParser {
    typescript: Parser,
    tsx: Parser,
}

impl TsParser {
    /// Creates a new parser with both grammars loaded.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::LanguageInit`] if either grammar cannot be set
    /// on a tree-sitter parser.
    pub fn new() -> Result<Self, ParseError> {
        Ok(Self {
            typescript: Self::parser_for(Dialect::TypeScript)?,
            tsx: Self::parser_for(Dialect::Tsx)?,
        })
    }

    fn parser_for(dialect: Dialect) -> Result<Parser, ParseError> {
        let mut parser = Parser::new();
        parser
            .set_language(&dialect.language())
            .map_err(|_| ParseError::LanguageInit(dialect.name()))?;
        Ok(parser)
    }

    /// Parses source code and extracts its imports in source order.
    ///
    /// # Errors
    ///
    /// - Returns [`ParseError::Parse`] if tree-sitter gives up
    /// - Returns [`ParseError::Syntax`] if the source is malformed
    /// - Returns [`ParseError::UnsupportedDynamicImport`] for an import call
    ///   whose argument is not a string or template literal
    /// - Returns [`ParseError::QueryCompile`] if the import query fails to compile
    pub fn parse(&mut self, source: &str, dialect: Dialect) -> Result<ParseResult, ParseError> {
        let parser = match dialect {
            Dialect::TypeScript => &mut self.typescript,
            Dialect::Tsx => &mut self.tsx,
        };
        let tree = parser.parse(source, None).ok_or(ParseError::Parse)?;
        extract_imports(&tree, source, import_query(dialect)?)
    }

    /// Parses a file's contents, picking the grammar from its extension.
    ///
    /// # Errors
    ///
    /// See [`parse`](Self::parse).
    pub fn parse_for_extension(
        &mut self,
        source: &str,
        extension: &str,
    ) -> Result<ParseResult, ParseError> {
        self.parse(source, Dialect::from_extension(extension))
    }
}

impl std::fmt::Debug for TsParser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TsParser")
            .field("dialects", &[Dialect::TypeScript.name(), Dialect::Tsx.name()])
            .finish_non_exhaustive()
    }
}
