//! Domain types shared across the import pipeline.
//!
//! # Module Organization
//!
//! - [`syntax`] - Imports as discovered in source, before package context is attached
//! - [`location`] - Source code locations
//! - [`tree_type`] - Classification of the source tree a file came from
//!
//! All public types are re-exported here and at the crate root:
//!
//! ```
//! use aim_core::{ImportSyntax, LiteralSyntax, SourceLocation, TreeType};
//! ```

mod location;
mod syntax;
mod tree_type;

pub use location::SourceLocation;
pub use syntax::{ImportSyntax, LiteralSyntax, TemplateSyntax};
pub use tree_type::{TreeType, UnknownTreeType};
