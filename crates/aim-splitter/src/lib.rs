//! Bundle splitting for auto-imported dependencies.
//!
//! The [`Splitter`] takes the imports every analyzer found, resolves them
//! through their packages and decides which output bundle each third-party
//! dependency belongs in. The result is a [`DependencyManifest`]: per
//! bundle, the static and dynamic imports the bundler backend has to
//! produce, plus the [`BackendOptions`] gathered from every package.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use aim_analyzer::{Analyzer, ImportSource};
//! use aim_core::{PackageConfig, TreeType};
//! use aim_package::PackageCache;
//! use aim_splitter::{BackendOptions, BundleConfig, Splitter};
//! use camino::Utf8Path;
//!
//! let project = Utf8Path::new("/work/my-app");
//! let packages = PackageCache::new();
//! let app = packages.get_or_create(project, &PackageConfig::default_app(), false)?;
//!
//! let mut sources = Analyzer::new(project.join("app"), Arc::clone(&app), Some(TreeType::App));
//! let mut tests = Analyzer::new(project.join("tests"), Arc::clone(&app), Some(TreeType::Test));
//! sources.build()?;
//! tests.build()?;
//!
//! let mut splitter = Splitter::new(BundleConfig::default())
//!     .with_options(BackendOptions::collect(&packages.packages())?)
//!     .with_invalidation(packages.invalidation().token());
//! let manifest = splitter.deps(&[&sources, &tests])?;
//! println!("{}", serde_json::to_string_pretty(&*manifest)?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

mod backend;
mod bundle;
pub mod error;
mod manifest;
mod splitter;
mod version;

pub use backend::BackendOptions;
pub use bundle::BundleConfig;
pub use error::SplitError;
pub use manifest::{BundleDependencies, DependencyManifest, ResolvedImport, ResolvedTemplateImport};
pub use splitter::Splitter;
pub use version::VersionCache;
