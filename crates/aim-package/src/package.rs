//! A package taking part in the build and the questions asked of it.
//!
//! Every import is resolved relative to the package that owns the importing
//! file: its declared dependencies, its aliases and exclusions, and the
//! `node_modules` directories above its root.

use std::sync::Arc;

use aim_core::{AutoImportOptions, FxHashMap, PackageConfig};
use camino::{Utf8Path, Utf8PathBuf};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::PackageError;
use crate::invalidation::InvalidationToken;
use crate::manifest::{MANIFEST_FILE, PackageJson, manifest_path};
use crate::semver_range::NpmRange;

/// How a specifier relates to the package graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// A relative or absolute path, e.g. `./utils`.
    Local,
    /// A URL, e.g. `https://cdn/x.js` or `data:…`.
    Url,
    /// A template prefix too short to name a package, e.g. `` `lo${x}` ``.
    Imprecise,
    /// A bare package specifier.
    Dep,
}

/// Classifies a specifier.
///
/// `partial` marks the leading quasi of a template import, which only counts
/// as a package when it contains the whole package name followed by a slash.
///
/// # Examples
///
/// ```
/// use aim_package::{categorize, Category};
///
/// assert_eq!(categorize("https://x.com/a.js", false), Category::Url);
/// assert_eq!(categorize("./a", false), Category::Local);
/// assert_eq!(categorize("lodash", false), Category::Dep);
/// assert_eq!(categorize("lodash", true), Category::Imprecise);
/// assert_eq!(categorize("lodash/", true), Category::Dep);
/// assert_eq!(categorize("@scope/", true), Category::Imprecise);
/// assert_eq!(categorize("@scope/pkg/", true), Category::Dep);
/// ```
#[must_use]
pub fn categorize(specifier: &str, partial: bool) -> Category {
    if is_url(specifier) {
        return Category::Url;
    }
    if specifier.starts_with(['.', '/']) {
        return Category::Local;
    }
    if partial && !is_precise(specifier) {
        return Category::Imprecise;
    }
    Category::Dep
}

/// `^(\w+:)?//` or `data:`.
fn is_url(specifier: &str) -> bool {
    if specifier.starts_with("data:") || specifier.starts_with("//") {
        return true;
    }
    let Some((scheme, rest)) = specifier.split_once(':') else {
        return false;
    };
    !scheme.is_empty()
        && scheme.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        && rest.starts_with("//")
}

/// Whether a (possibly partial) specifier pins down a package name.
fn is_precise(specifier: &str) -> bool {
    let slashes = specifier.matches('/').count();
    if specifier.starts_with('@') {
        slashes >= 2
    } else {
        slashes >= 1
    }
}

/// The package name a bare specifier refers to: `@scope/name` or `name`.
///
/// # Examples
///
/// ```
/// use aim_package::package_name;
///
/// assert_eq!(package_name("lodash/get"), "lodash");
/// assert_eq!(package_name("@ember/string/x"), "@ember/string");
/// assert_eq!(package_name("moment"), "moment");
/// ```
#[must_use]
pub fn package_name(specifier: &str) -> &str {
    let segments = if specifier.starts_with('@') { 2 } else { 1 };
    match specifier.match_indices('/').nth(segments - 1) {
        Some((index, _)) => &specifier[..index],
        None => specifier,
    }
}

/// Where a specifier leads.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Resolution {
    /// A URL the backend leaves alone.
    Url {
        /// The (aliased) URL.
        url: String,
    },
    /// A path inside the project.
    Local {
        /// The (aliased) path.
        local: String,
    },
    /// A template prefix that does not name a package.
    Imprecise,
    /// An installed third-party package.
    #[serde(rename_all = "camelCase")]
    Package {
        /// The (aliased) specifier.
        path: String,
        /// The package's name.
        package_name: String,
        /// Canonical directory the package is installed in.
        package_root: Utf8PathBuf,
    },
}

/// Cached `package.json` data, valid for one invalidation generation.
#[derive(Debug)]
struct Cached {
    generation: u64,
    manifest: Arc<PackageJson>,
    /// `dependency name -> installed location`, `None` for "not installed".
    located: FxHashMap<String, Option<Installed>>,
}

#[derive(Debug, Clone)]
struct Installed {
    root: Utf8PathBuf,
    is_addon: bool,
}

/// A package whose source trees are analyzed.
///
/// Created once per distinct root by [`PackageCache`](crate::PackageCache)
/// and shared by `Arc`. Options are fixed at construction; the manifest is
/// read lazily and re-read whenever the [`InvalidationToken`] moves on.
///
/// # Examples
///
/// ```no_run
/// use aim_package::{InvalidationSource, Package, Resolution};
/// use aim_core::AutoImportOptions;
/// use camino::Utf8PathBuf;
///
/// let source = InvalidationSource::new();
/// let app = Package::new(
///     "my-app",
///     Utf8PathBuf::from("/work/my-app"),
///     false,
///     AutoImportOptions::default(),
///     source.token(),
/// );
///
/// if let Some(Resolution::Package { package_root, .. }) = app.resolve("lodash/get", false)? {
///     println!("lodash lives in {package_root}");
/// }
/// # Ok::<(), aim_package::PackageError>(())
/// ```
pub struct Package {
    name: String,
    root: Utf8PathBuf,
    is_addon: bool,
    options: AutoImportOptions,
    token: InvalidationToken,
    cache: RwLock<Option<Cached>>,
}

impl Package {
    /// Creates a package. No I/O happens until a question needs the manifest.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        root: Utf8PathBuf,
        is_addon: bool,
        options: AutoImportOptions,
        token: InvalidationToken,
    ) -> Self {
        Self {
            name: name.into(),
            root,
            is_addon,
            options,
            token,
            cache: RwLock::new(None),
        }
    }

    /// Creates a package from its configuration.
    ///
    /// The root is resolved against `project_root` and canonicalized. The
    /// name comes from the config, else from `package.json`.
    ///
    /// # Errors
    ///
    /// Returns [`PackageError::Io`] if the root does not exist or its
    /// manifest cannot be read, [`PackageError::ManifestParse`] for a
    /// malformed manifest and [`PackageError::MissingName`] when no name is
    /// available.
    pub fn from_config(
        project_root: &Utf8Path,
        config: &PackageConfig,
        is_addon: bool,
        token: InvalidationToken,
    ) -> Result<Self, PackageError> {
        let root = canonical(&project_root.join(&config.root))?;
        let name = match &config.name {
            Some(name) => name.clone(),
            None => PackageJson::read_dir(&root)?
                .name
                .ok_or_else(|| PackageError::MissingName(root.clone()))?,
        };
        Ok(Self::new(name, root, is_addon, config.options.clone(), token))
    }

    /// The package's name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The package's canonical root directory.
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// Whether this is an addon rather than the app.
    #[inline]
    #[must_use]
    pub const fn is_addon(&self) -> bool {
        self.is_addon
    }

    /// The package's import options.
    #[inline]
    #[must_use]
    pub const fn options(&self) -> &AutoImportOptions {
        &self.options
    }

    /// The package's `package.json`, re-read if the generation moved on.
    ///
    /// # Errors
    ///
    /// Returns [`PackageError::Io`] or [`PackageError::ManifestParse`] if the
    /// manifest cannot be loaded.
    pub fn manifest(&self) -> Result<Arc<PackageJson>, PackageError> {
        let generation = self.token.generation();
        if let Some(cached) = self.cache.read().as_ref() {
            if cached.generation == generation {
                return Ok(Arc::clone(&cached.manifest));
            }
        }

        let mut cache = self.cache.write();
        if let Some(cached) = cache.as_ref() {
            if cached.generation == generation {
                return Ok(Arc::clone(&cached.manifest));
            }
        }

        debug!(package = %self.name, generation, "reading {MANIFEST_FILE}");
        let manifest = Arc::new(PackageJson::read_dir(&self.root)?);
        *cache = Some(Cached {
            generation,
            manifest: Arc::clone(&manifest),
            located: FxHashMap::default(),
        });
        Ok(manifest)
    }

    /// Whether `name` is declared in any dependency table.
    ///
    /// # Errors
    ///
    /// See [`manifest`](Self::manifest).
    pub fn has_dependency(&self, name: &str) -> Result<bool, PackageError> {
        let manifest = self.manifest()?;
        Ok(manifest.dependencies.contains_key(name)
            || manifest.dev_dependencies.contains_key(name)
            || manifest.peer_dependencies.contains_key(name))
    }

    /// Whether `name` is declared somewhere consumers will install it.
    ///
    /// # Errors
    ///
    /// See [`manifest`](Self::manifest).
    pub fn has_non_dev_dependency(&self, name: &str) -> Result<bool, PackageError> {
        let manifest = self.manifest()?;
        Ok(manifest.dependencies.contains_key(name) || manifest.peer_dependencies.contains_key(name))
    }

    /// The version range this package declares for `name`.
    ///
    /// Looks in `dependencies`, then `devDependencies`, then
    /// `peerDependencies`.
    ///
    /// # Errors
    ///
    /// See [`manifest`](Self::manifest).
    pub fn requested_range(&self, name: &str) -> Result<Option<String>, PackageError> {
        let manifest = self.manifest()?;
        Ok(manifest
            .dependencies
            .get(name)
            .or_else(|| manifest.dev_dependencies.get(name))
            .or_else(|| manifest.peer_dependencies.get(name))
            .cloned())
    }

    /// [`requested_range`](Self::requested_range), parsed.
    ///
    /// # Errors
    ///
    /// Additionally returns [`PackageError::InvalidRange`] for a range npm
    /// syntax cannot express.
    pub fn requested_npm_range(&self, name: &str) -> Result<Option<NpmRange>, PackageError> {
        self.requested_range(name)?
            .map(|range| NpmRange::parse(&range))
            .transpose()
    }

    /// Whether the user asked never to auto-import `name`.
    #[must_use]
    pub fn excludes_dependency(&self, name: &str) -> bool {
        self.options.exclude.iter().any(|excluded| excluded == name)
    }

    /// Applies the package's aliases to a specifier.
    ///
    /// An exact alias key wins; otherwise the longest key matching a leading
    /// run of `/`-separated segments is replaced.
    ///
    /// # Examples
    ///
    /// ```
    /// use aim_core::AutoImportOptions;
    /// use aim_package::{InvalidationSource, Package};
    ///
    /// let mut options = AutoImportOptions::default();
    /// options.alias.insert("lo".into(), "lodash-es".into());
    /// options.alias.insert("lo/fp".into(), "lodash-fp".into());
    /// let pkg = Package::new("app", "/app".into(), false, options, InvalidationSource::new().token());
    ///
    /// assert_eq!(pkg.alias_for("lo"), "lodash-es");
    /// assert_eq!(pkg.alias_for("lo/get"), "lodash-es/get");
    /// assert_eq!(pkg.alias_for("lo/fp/map"), "lodash-fp/map");
    /// assert_eq!(pkg.alias_for("lodash"), "lodash");
    /// ```
    #[must_use]
    pub fn alias_for(&self, specifier: &str) -> String {
        let aliases = &self.options.alias;
        if let Some(exact) = aliases.get(specifier) {
            return exact.clone();
        }

        let mut best: Option<(&str, &str)> = None;
        for (prefix, target) in aliases {
            let Some(rest) = specifier.strip_prefix(prefix.as_str()) else {
                continue;
            };
            if !rest.starts_with('/') {
                continue;
            }
            if best.is_none_or(|(current, _)| prefix.len() > current.len()) {
                best = Some((prefix.as_str(), target.as_str()));
            }
        }

        match best {
            Some((prefix, target)) => format!("{target}{}", &specifier[prefix.len()..]),
            None => specifier.to_owned(),
        }
    }

    /// Resolves a specifier imported from one of this package's files.
    ///
    /// Returns `Ok(None)` for specifiers that are not auto-imported: excluded
    /// names, names this package does not declare, and ember addons (which
    /// the host build handles).
    ///
    /// # Errors
    ///
    /// - [`PackageError::MissingPackage`] when a declared dependency is not
    ///   installed above the package root
    /// - [`PackageError::DisallowedDevDependency`] when an addon imports a
    ///   dependency it only lists in `devDependencies`
    /// - manifest read failures, see [`manifest`](Self::manifest)
    pub fn resolve(
        &self,
        specifier: &str,
        partial: bool,
    ) -> Result<Option<Resolution>, PackageError> {
        let path = self.alias_for(specifier);

        match categorize(&path, partial) {
            Category::Url => return Ok(Some(Resolution::Url { url: path })),
            Category::Local => return Ok(Some(Resolution::Local { local: path })),
            Category::Imprecise => return Ok(Some(Resolution::Imprecise)),
            Category::Dep => {}
        }

        let name = package_name(&path);
        if self.excludes_dependency(name) {
            trace!(package = %self.name, dependency = name, "excluded");
            return Ok(None);
        }
        if !self.has_dependency(name)? {
            return Ok(None);
        }

        let Some(installed) = self.locate(name)? else {
            return Err(PackageError::MissingPackage {
                package: self.name.clone(),
                dependency: name.to_owned(),
                root: self.root.clone(),
            });
        };

        if installed.is_addon {
            trace!(package = %self.name, dependency = name, "skipping ember addon");
            return Ok(None);
        }

        if self.is_addon && !self.has_non_dev_dependency(name)? {
            return Err(PackageError::disallowed_dev_dependency(&self.name, name));
        }

        Ok(Some(Resolution::Package {
            package_name: name.to_owned(),
            path,
            package_root: installed.root,
        }))
    }

    /// Follows a chain of package names through `node_modules`, starting at
    /// this package, and returns the last one's canonical root.
    ///
    /// # Errors
    ///
    /// Returns [`PackageError::MissingPackage`] at the first link that is not
    /// installed.
    pub fn locate_chain(&self, chain: &[String]) -> Result<Utf8PathBuf, PackageError> {
        let mut current = self.root.clone();
        let mut requester = self.name.clone();
        for name in chain {
            let Some(found) = find_installed(&current, name)? else {
                return Err(PackageError::MissingPackage {
                    package: requester,
                    dependency: name.clone(),
                    root: current,
                });
            };
            current = found;
            requester.clone_from(name);
        }
        Ok(current)
    }

    /// Finds where `name` is installed for this package, with caching.
    fn locate(&self, name: &str) -> Result<Option<Installed>, PackageError> {
        // Populates the cache for the current generation.
        self.manifest()?;

        if let Some(cached) = self.cache.read().as_ref() {
            if let Some(hit) = cached.located.get(name) {
                return Ok(hit.clone());
            }
        }

        let installed = match find_installed(&self.root, name)? {
            Some(root) => {
                let is_addon = PackageJson::read_dir(&root)?.is_addon();
                Some(Installed { root, is_addon })
            }
            None => None,
        };

        if let Some(cached) = self.cache.write().as_mut() {
            cached.located.insert(name.to_owned(), installed.clone());
        }
        Ok(installed)
    }
}

impl std::fmt::Debug for Package {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Package")
            .field("name", &self.name)
            .field("root", &self.root)
            .field("is_addon", &self.is_addon)
            .finish_non_exhaustive()
    }
}

/// Walks `node_modules` directories upward from `start` looking for `name`.
fn find_installed(start: &Utf8Path, name: &str) -> Result<Option<Utf8PathBuf>, PackageError> {
    for dir in start.ancestors() {
        let candidate = dir.join("node_modules").join(name);
        if manifest_path(&candidate).is_file() {
            return canonical(&candidate).map(Some);
        }
    }
    Ok(None)
}

fn canonical(path: &Utf8Path) -> Result<Utf8PathBuf, PackageError> {
    path.canonicalize_utf8()
        .map_err(|e| PackageError::io(path, e))
}
