//! Pre-compiled tree-sitter queries for import extraction.
//!
//! This module provides the [`IMPORT_QUERY`] constant containing S-expression
//! patterns for every import form we care about, and [`import_query`] for
//! lazily compiling and caching it per grammar.

use std::sync::OnceLock;

use tree_sitter::{Language, Query};

use crate::error::ParseError;
use crate::parser::Dialect;

/// Tree-sitter query for extracting imports.
///
/// # Patterns
///
/// 0. `import … from 'x'` and `import 'x'`
/// 1. `export … from 'x'`
/// 2. `import(arg)`
/// 3. `ident(arg)`, narrowed later to local bindings of `importSync`
///
/// # Capture Names
///
/// - `static.statement` / `static.source` - Import or re-export statement and its source string
/// - `dynamic.call` / `dynamic.arguments` - An `import()` call and its argument list
/// - `call.expression` / `call.callee` / `call.arguments` - Any call through a plain identifier
pub const IMPORT_QUERY: &str = r"
; Static imports, including side-effect imports
(import_statement
  source: (string) @static.source) @static.statement

; Re-exports: export { x } from '...', export * from '...'
(export_statement
  source: (string) @static.source) @static.statement

; Dynamic imports: import('./path') or await import(`./${x}`)
(call_expression
  function: (import)
  arguments: (arguments) @dynamic.arguments) @dynamic.call

; Calls through an identifier, candidates for importSync bindings
(call_expression
  function: (identifier) @call.callee
  arguments: (arguments) @call.arguments) @call.expression
";

/// Pattern index of static import statements.
pub const PATTERN_IMPORT: usize = 0;

/// Pattern index of re-export statements.
pub const PATTERN_EXPORT: usize = 1;

/// Pattern index of `import()` calls.
pub const PATTERN_DYNAMIC: usize = 2;

/// Pattern index of identifier calls.
pub const PATTERN_CALL: usize = 3;

/// A compiled [`IMPORT_QUERY`] with its capture indices resolved by name.
#[derive(Debug)]
pub struct ImportQuery {
    /// The compiled query.
    pub query: Query,
    /// Index of `static.statement`.
    pub static_statement: u32,
    /// Index of `static.source`.
    pub static_source: u32,
    /// Index of `dynamic.call`.
    pub dynamic_call: u32,
    /// Index of `dynamic.arguments`.
    pub dynamic_arguments: u32,
    /// Index of `call.expression`.
    pub call_expression: u32,
    /// Index of `call.callee`.
    pub call_callee: u32,
    /// Index of `call.arguments`.
    pub call_arguments: u32,
}

impl ImportQuery {
    fn compile(language: &Language) -> Result<Self, ParseError> {
        let query = Query::new(language, IMPORT_QUERY).map_err(|e| ParseError::QueryCompile {
            offset: e.offset,
            kind: e,
        })?;

        let index = |name: &str| {
            query
                .capture_index_for_name(name)
                .ok_or_else(|| ParseError::MissingCapture(name.to_owned()))
        };

        Ok(Self {
            static_statement: index("static.statement")?,
            static_source: index("static.source")?,
            dynamic_call: index("dynamic.call")?,
            dynamic_arguments: index("dynamic.arguments")?,
            call_expression: index("call.expression")?,
            call_callee: index("call.callee")?,
            call_arguments: index("call.arguments")?,
            query,
        })
    }
}

/// Global cache for the compiled import query (TypeScript).
static COMPILED_QUERY_TS: OnceLock<ImportQuery> = OnceLock::new();

/// Global cache for the compiled import query (TSX).
static COMPILED_QUERY_TSX: OnceLock<ImportQuery> = OnceLock::new();

/// Returns the compiled import query for a grammar.
///
/// The query is compiled once per grammar and cached for all subsequent
/// calls. This function is thread-safe.
///
/// # Errors
///
/// Returns [`ParseError::QueryCompile`] if the query fails to compile.
pub fn import_query(dialect: Dialect) -> Result<&'static ImportQuery, ParseError> {
    let cell = match dialect {
        Dialect::TypeScript => &COMPILED_QUERY_TS,
        Dialect::Tsx => &COMPILED_QUERY_TSX,
    };
    if let Some(query) = cell.get() {
        return Ok(query);
    }

    let query = ImportQuery::compile(&dialect.language())?;
    Ok(cell.get_or_init(|| query))
}
