//! The package model behind import resolution.
//!
//! Every analyzed file belongs to a [`Package`]: the app or one of its
//! addons. This crate answers the questions the splitter asks about an
//! import from that package:
//!
//! - Is the specifier a URL, a local path, or a dependency? ([`categorize`])
//! - Which installed package does it name, if any? ([`Package::resolve`])
//! - What version range did the package ask for? ([`Package::requested_range`], [`NpmRange`])
//!
//! It also owns the plumbing that keeps those answers fresh and unique:
//!
//! - [`PackageCache`] interns one `Arc<Package>` per root
//! - [`InvalidationSource`] forces manifests to be re-read after edits
//! - [`LeaderRegistry`] and [`elect`] pick one active instance per project
//!
//! # Example
//!
//! ```no_run
//! use aim_core::ProjectConfig;
//! use aim_package::{PackageCache, Resolution};
//! use camino::Utf8Path;
//!
//! let project = Utf8Path::new("/work/my-app");
//! let config = ProjectConfig::discover(project).unwrap();
//! let cache = PackageCache::new();
//! let app = cache.get_or_create(project, &config.app, false)?;
//!
//! match app.resolve("lodash/get", false)? {
//!     Some(Resolution::Package { package_root, .. }) => println!("{package_root}"),
//!     other => println!("not auto-imported: {other:?}"),
//! }
//! # Ok::<(), aim_package::PackageError>(())
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

mod cache;
pub mod error;
mod invalidation;
mod leader;
pub mod manifest;
mod package;
pub mod semver_range;

pub use cache::PackageCache;
pub use error::PackageError;
pub use invalidation::{InvalidationSource, InvalidationToken};
pub use leader::{LeaderRegistry, elect};
pub use manifest::{ADDON_KEYWORD, MANIFEST_FILE, PackageJson};
pub use package::{Category, Package, Resolution, categorize, package_name};
pub use semver_range::NpmRange;
