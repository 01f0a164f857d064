//! Error types for the aim-parser crate.
//!
//! This module provides the [`ParseError`] type for errors that can occur
//! while parsing a source file and extracting its imports.

use aim_core::SourceLocation;

/// Errors that can occur during parsing.
///
/// The first four variants are setup failures that will hit every file
/// equally. [`Syntax`](Self::Syntax) and
/// [`UnsupportedDynamicImport`](Self::UnsupportedDynamicImport) are specific
/// to one file and go away once the file is fixed.
///
/// # Examples
///
/// ```
/// use aim_core::SourceLocation;
/// use aim_parser::ParseError;
///
/// let err = ParseError::Syntax { location: SourceLocation::new(3, 7, 40) };
/// assert!(err.is_source_error());
/// assert_eq!(err.to_string(), "syntax error at 3:7");
/// ```
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// Failed to create a new tree-sitter parser.
    #[error("failed to initialize tree-sitter parser")]
    ParserInit,

    /// Failed to set the grammar on the parser.
    #[error("failed to set {0} language")]
    LanguageInit(&'static str),

    /// Failed to compile a tree-sitter query.
    ///
    /// Contains the byte offset where the error occurred and the error kind.
    #[error("failed to compile query at offset {offset}: {kind:?}")]
    QueryCompile {
        /// The byte offset in the query string where the error occurred.
        offset: usize,
        /// The kind of query error.
        kind: tree_sitter::QueryError,
    },

    /// The compiled query lacks a capture the extractor relies on.
    #[error("import query has no capture named '{0}'")]
    MissingCapture(String),

    /// Failed to parse the source code.
    ///
    /// This typically indicates the parser ran out of memory or was cancelled.
    #[error("failed to parse source code")]
    Parse,

    /// The source is malformed.
    #[error("syntax error at {location}")]
    Syntax {
        /// Position of the first error or missing node.
        location: SourceLocation,
    },

    /// An import call whose argument is neither a string nor a template literal.
    #[error(
        "{callee}() is only allowed to contain string literals or template string literals (at {location})"
    )]
    UnsupportedDynamicImport {
        /// `import` or the local name of `importSync`.
        callee: String,
        /// Position of the call.
        location: SourceLocation,
    },
}

impl ParseError {
    /// Whether the error comes from the file's contents rather than parser setup.
    #[must_use]
    pub const fn is_source_error(&self) -> bool {
        matches!(self, Self::Syntax { .. } | Self::UnsupportedDynamicImport { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parser_init_display() {
        let err = ParseError::ParserInit;
        assert_eq!(err.to_string(), "failed to initialize tree-sitter parser");
    }

    #[test]
    fn test_language_init_display() {
        let err = ParseError::LanguageInit("TSX");
        assert_eq!(err.to_string(), "failed to set TSX language");
    }

    #[test]
    fn test_unsupported_dynamic_import_display() {
        let err = ParseError::UnsupportedDynamicImport {
            callee: "import".to_owned(),
            location: SourceLocation::new(2, 4, 17),
        };
        insta::assert_snapshot!(
            err.to_string(),
            @"import() is only allowed to contain string literals or template string literals (at 2:4)"
        );
    }

    #[test]
    fn test_is_source_error() {
        assert!(!ParseError::Parse.is_source_error());
        assert!(ParseError::Syntax {
            location: SourceLocation::default()
        }
        .is_source_error());
    }
}
