//! Import extraction for JavaScript and TypeScript using tree-sitter.
//!
//! This crate finds every module import in a source file, without executing
//! or transforming it:
//!
//! | Pattern | Example | Result |
//! |---------|---------|--------|
//! | Static import | `import x from 'a'`, `import 'a'` | Literal |
//! | Re-export | `export { x } from 'a'` | Literal |
//! | Dynamic | `import('a')`, ``import(`a`)`` | Literal, dynamic |
//! | Dynamic template | ``import(`a/${x}`)`` | Template, dynamic |
//! | Sync helper | `importSync('a')` from `@embroider/macros` | Literal or Template |
//! | Type-only | `import type { X } from 'a'` | ignored |
//!
//! # Overview
//!
//! The main entry point is [`TsParser`]:
//!
//! ```
//! use aim_core::ImportSyntax;
//! use aim_parser::{Dialect, TsParser};
//!
//! let mut parser = TsParser::new()?;
//! let source = r#"
//!     import { get } from 'lodash';
//!     const locale = await import(`moment/locale/${lang}`);
//! "#;
//!
//! let imports = parser.parse(source, Dialect::Tsx)?;
//! match &imports[1] {
//!     ImportSyntax::Template(template) => {
//!         assert_eq!(template.leading_quasi(), "moment/locale/");
//!     }
//!     ImportSyntax::Literal(_) => unreachable!(),
//! }
//! # Ok::<(), aim_parser::ParseError>(())
//! ```
//!
//! # Errors
//!
//! Malformed files are never skipped: a syntax error or an `import()` with a
//! computed argument fails the parse, so a half-written file cannot silently
//! drop its imports.
//!
//! # Thread Safety
//!
//! [`TsParser`] is `Send` but not `Sync`. For parallel parsing with rayon,
//! create one parser per worker. The underlying tree-sitter queries are
//! thread-safe and shared globally.

#![deny(clippy::all)]
#![warn(missing_docs)]

mod cook;
pub mod error;
mod import;
mod parser;
pub mod queries;

pub use error::ParseError;
pub use import::{IMPORT_SYNC, MACROS_MODULE, extract_imports};
pub use parser::{Dialect, ParseResult, TsParser};
