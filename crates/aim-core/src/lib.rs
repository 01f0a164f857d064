//! Core types, errors, and utilities for the aim workspace.
//!
//! This crate provides the foundational types shared by every layer of the
//! import pipeline:
//!
//! - The import syntax model produced by `aim-parser` ([`ImportSyntax`])
//! - Tree types that classify where a source file came from ([`TreeType`])
//! - Project and per-package configuration ([`ProjectConfig`], [`AutoImportOptions`])
//! - Error types for configuration loading ([`ConfigError`])
//! - Type aliases for `FxHashMap`/`FxHashSet` and content hashing helpers

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod hash;
pub mod types;

pub use config::{
    AutoImportOptions, BundlesConfig, CONFIG_FILE_NAME, PackageConfig, ProjectConfig, SkipBabel, TreeConfig,
    WatchConfig, WatchDependency,
};
pub use error::ConfigError;
pub use hash::{FxHashMap, FxHashSet, hash_bytes, hash_str};
pub use types::{
    ImportSyntax, LiteralSyntax, SourceLocation, TemplateSyntax, TreeType, UnknownTreeType,
};
