//! Resolving every analyzed import and assigning targets to bundles.
//!
//! [`Splitter::deps`] merges the imports of all sources, resolves each one
//! through its package, rejects imports the backend cannot split and
//! groups the rest per bundle:
//!
//! 1. literal imports resolve their specifier; template imports resolve
//!    their leading quasi as a partial specifier
//! 2. targets are keyed by specifier (or quasis joined with `${e}`), so
//!    importers of the same target share one entry
//! 3. when two packages reach the same key through different installs, the
//!    installed version must satisfy the newcomer's declared range
//! 4. each target's static and dynamic importers are placed separately, in
//!    the highest-priority bundle any of them belongs to

use std::sync::Arc;

use aim_analyzer::{Import, ImportSource};
use aim_package::{InvalidationToken, PackageError, Resolution};
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use indexmap::map::Entry;
use tracing::{debug, info, warn};

use crate::backend::BackendOptions;
use crate::bundle::BundleConfig;
use crate::error::SplitError;
use crate::manifest::{BundleDependencies, DependencyManifest, ResolvedImport, ResolvedTemplateImport};
use crate::version::VersionCache;

/// Separator between quasis in template target keys.
const TEMPLATE_KEY_SEPARATOR: &str = "${e}";

/// Turns the imports of many sources into one [`DependencyManifest`].
///
/// # Examples
///
/// ```no_run
/// use aim_analyzer::{Analyzer, ImportSource};
/// use aim_splitter::{BundleConfig, Splitter};
///
/// fn split(app: &Analyzer, tests: &Analyzer) -> Result<(), aim_splitter::SplitError> {
///     let mut splitter = Splitter::new(BundleConfig::default());
///     let manifest = splitter.deps(&[app, tests])?;
///     for (bundle, deps) in &manifest.bundles {
///         println!("{bundle}: {} static imports", deps.static_imports.len());
///     }
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct Splitter {
    bundles: BundleConfig,
    options: BackendOptions,
    invalidation: Option<InvalidationToken>,
    versions: VersionCache,
    memo: Option<Memo>,
}

#[derive(Debug)]
struct Memo {
    generation: u64,
    snapshot: Vec<Arc<[Import]>>,
    manifest: Arc<DependencyManifest>,
}

impl Splitter {
    /// Creates a splitter for a bundle layout.
    #[must_use]
    pub fn new(bundles: BundleConfig) -> Self {
        Self {
            bundles,
            options: BackendOptions::default(),
            invalidation: None,
            versions: VersionCache::new(),
            memo: None,
        }
    }

    /// Sets the backend options copied into every manifest.
    #[must_use]
    pub fn with_options(mut self, options: BackendOptions) -> Self {
        self.set_options(options);
        self
    }

    /// Recomputes after every bump of the token's source, even when no
    /// source's imports changed.
    #[must_use]
    pub fn with_invalidation(mut self, token: InvalidationToken) -> Self {
        self.invalidation = Some(token);
        self
    }

    /// Replaces the backend options and drops the memo.
    pub fn set_options(&mut self, options: BackendOptions) {
        self.options = options;
        self.memo = None;
    }

    /// The bundle layout.
    #[must_use]
    pub const fn bundles(&self) -> &BundleConfig {
        &self.bundles
    }

    /// Computes the manifest for the current imports of `sources`.
    ///
    /// Returns the previous `Arc` when every source returns the same import
    /// list as last time and no invalidation happened in between.
    ///
    /// # Errors
    ///
    /// - [`SplitError::RelativeDynamicImport`] for `import('./x')`
    /// - [`SplitError::AmbiguousDynamicImport`] for a template whose leading
    ///   quasi does not name a package, like `` import(`lo${x}`) ``
    /// - [`SplitError::VersionConflict`] when two packages need
    ///   incompatible installs of one dependency
    /// - [`SplitError::Package`] for resolution failures
    pub fn deps(
        &mut self,
        sources: &[&dyn ImportSource],
    ) -> Result<Arc<DependencyManifest>, SplitError> {
        let snapshot: Vec<Arc<[Import]>> = sources.iter().map(|source| source.imports()).collect();
        let generation = self.invalidation.as_ref().map_or(0, InvalidationToken::generation);

        if let Some(memo) = &self.memo {
            if memo.generation == generation && same_snapshot(&memo.snapshot, &snapshot) {
                debug!("imports unchanged, reusing manifest");
                return Ok(Arc::clone(&memo.manifest));
            }
            if memo.generation != generation {
                self.versions.clear();
            }
        }

        let manifest = Arc::new(self.split(&snapshot)?);
        self.memo = Some(Memo {
            generation,
            snapshot,
            manifest: Arc::clone(&manifest),
        });
        Ok(manifest)
    }

    fn split(&mut self, snapshot: &[Arc<[Import]>]) -> Result<DependencyManifest, SplitError> {
        let mut literals: IndexMap<String, LiteralTarget<'_>> = IndexMap::new();
        let mut templates: IndexMap<String, TemplateTarget<'_>> = IndexMap::new();

        for import in snapshot.iter().flat_map(|imports| imports.iter()) {
            match import {
                Import::Literal(literal) => {
                    let resolution = literal.package.resolve(&literal.specifier, false)?;
                    let Some(found) = accept(import, resolution, &literal.specifier)? else {
                        continue;
                    };
                    match literals.entry(literal.specifier.clone()) {
                        Entry::Occupied(mut entry) => {
                            self.check_version(&entry.get().target, import, &found)?;
                            entry.get_mut().target.importers.push(import);
                        }
                        Entry::Vacant(entry) => {
                            entry.insert(LiteralTarget {
                                specifier: literal.specifier.clone(),
                                path: found.path,
                                target: Target::new(found.package_name, found.package_root, import),
                            });
                        }
                    }
                }
                Import::Template(template) => {
                    let leading = template.leading_quasi();
                    let resolution = template.package.resolve(leading, true)?;
                    let Some(found) = accept(import, resolution, leading)? else {
                        continue;
                    };
                    let key = template.cooked_quasis.join(TEMPLATE_KEY_SEPARATOR);
                    match templates.entry(key) {
                        Entry::Occupied(mut entry) => {
                            self.check_version(&entry.get().target, import, &found)?;
                            entry.get_mut().target.importers.push(import);
                        }
                        Entry::Vacant(entry) => {
                            let mut cooked_quasis = template.cooked_quasis.clone();
                            if let Some(first) = cooked_quasis.first_mut() {
                                first.clone_from(&found.path);
                            }
                            let expression_name_hints = template
                                .expression_name_hints
                                .iter()
                                .enumerate()
                                .map(|(index, hint)| hint.clone().unwrap_or_else(|| format!("arg{index}")))
                                .collect();
                            entry.insert(TemplateTarget {
                                cooked_quasis,
                                expression_name_hints,
                                target: Target::new(found.package_name, found.package_root, import),
                            });
                        }
                    }
                }
            }
        }

        let mut bundles: IndexMap<String, BundleDependencies> = self
            .bundles
            .names()
            .iter()
            .map(|name| (name.clone(), BundleDependencies::default()))
            .collect();

        for literal in literals.into_values() {
            let (dynamic, statics) = literal.target.partition();
            if !statics.is_empty() {
                let bundle = self.bundles.choose(statics.iter().copied()).to_owned();
                let resolved = literal.resolve(&statics);
                bundles.entry(bundle).or_default().static_imports.push(resolved);
            }
            if !dynamic.is_empty() {
                let bundle = self.bundles.choose(dynamic.iter().copied()).to_owned();
                let resolved = literal.resolve(&dynamic);
                bundles.entry(bundle).or_default().dynamic_imports.push(resolved);
            }
        }

        for template in templates.into_values() {
            let (dynamic, statics) = template.target.partition();
            if !statics.is_empty() {
                let bundle = self.bundles.choose(statics.iter().copied()).to_owned();
                let resolved = template.resolve(&statics);
                bundles.entry(bundle).or_default().static_template_imports.push(resolved);
            }
            if !dynamic.is_empty() {
                let bundle = self.bundles.choose(dynamic.iter().copied()).to_owned();
                let resolved = template.resolve(&dynamic);
                bundles.entry(bundle).or_default().dynamic_template_imports.push(resolved);
            }
        }

        for deps in bundles.values_mut() {
            deps.static_imports.sort_by(|a, b| a.specifier.cmp(&b.specifier));
            deps.dynamic_imports.sort_by(|a, b| a.specifier.cmp(&b.specifier));
            deps.static_template_imports.sort_by(compare_templates);
            deps.dynamic_template_imports.sort_by(compare_templates);
        }

        info!(
            bundles = bundles.len(),
            targets = bundles
                .values()
                .map(|deps| {
                    deps.static_imports.len()
                        + deps.dynamic_imports.len()
                        + deps.static_template_imports.len()
                        + deps.dynamic_template_imports.len()
                })
                .sum::<usize>(),
            "split dependencies"
        );

        Ok(DependencyManifest {
            bundles,
            entrypoints: self.bundles.entrypoints().clone(),
            options: self.options.clone(),
        })
    }

    /// Makes sure the install `existing` points at satisfies the range the
    /// newcomer's package asks for.
    fn check_version(
        &mut self,
        existing: &Target<'_>,
        import: &Import,
        found: &Found,
    ) -> Result<(), SplitError> {
        if existing.package_root == found.package_root {
            return Ok(());
        }

        let requester = import.package();
        let range = match requester.requested_npm_range(&found.package_name) {
            Ok(Some(range)) => range,
            Ok(None) => return Ok(()),
            Err(PackageError::InvalidRange { range, reason }) => {
                warn!(
                    package = %requester.name(),
                    dependency = %found.package_name,
                    range = %range,
                    reason = %reason,
                    "skipping version check for unparseable range"
                );
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };

        let have = self.versions.version(&existing.package_root)?.clone();
        if range.satisfies(&have) {
            return Ok(());
        }
        // A second copy of the exact same release bundles identically.
        if self
            .versions
            .version(&found.package_root)
            .is_ok_and(|version| *version == have)
        {
            return Ok(());
        }

        Err(SplitError::VersionConflict {
            requester: requester.name().to_owned(),
            dependency: found.package_name.clone(),
            range: range.to_string(),
            version: have.to_string(),
            importers: existing.importer_names(),
        })
    }
}

/// A resolved package target.
struct Found {
    path: String,
    package_name: String,
    package_root: Utf8PathBuf,
}

/// Filters a resolution down to the package targets the backend bundles.
fn accept(
    import: &Import,
    resolution: Option<Resolution>,
    specifier: &str,
) -> Result<Option<Found>, SplitError> {
    match resolution {
        None | Some(Resolution::Url { .. }) => Ok(None),
        Some(Resolution::Local { .. }) if import.is_dynamic() => {
            Err(SplitError::RelativeDynamicImport {
                package: import.package().name().to_owned(),
                path: import.path().to_owned(),
                specifier: specifier.to_owned(),
            })
        }
        Some(Resolution::Local { .. }) => Ok(None),
        Some(Resolution::Imprecise) => Err(SplitError::AmbiguousDynamicImport {
            package: import.package().name().to_owned(),
            path: import.path().to_owned(),
            leading: specifier.to_owned(),
        }),
        Some(Resolution::Package {
            path,
            package_name,
            package_root,
        }) => Ok(Some(Found {
            path,
            package_name,
            package_root,
        })),
    }
}

struct Target<'a> {
    package_name: String,
    package_root: Utf8PathBuf,
    importers: Vec<&'a Import>,
}

impl<'a> Target<'a> {
    fn new(package_name: String, package_root: Utf8PathBuf, first: &'a Import) -> Self {
        Self {
            package_name,
            package_root,
            importers: vec![first],
        }
    }

    /// Importers split into `(dynamic, static)`.
    fn partition(&self) -> (Vec<&'a Import>, Vec<&'a Import>) {
        self.importers.iter().copied().partition(|import| import.is_dynamic())
    }

    /// Distinct importing package names, in first-import order.
    fn importer_names(&self) -> String {
        let mut names: Vec<&str> = Vec::new();
        for import in &self.importers {
            let name = import.package().name();
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names.join(", ")
    }

    fn package_root(&self) -> &Utf8Path {
        &self.package_root
    }
}

struct LiteralTarget<'a> {
    specifier: String,
    path: String,
    target: Target<'a>,
}

impl LiteralTarget<'_> {
    fn resolve(&self, importers: &[&Import]) -> ResolvedImport {
        ResolvedImport {
            specifier: self.specifier.clone(),
            path: self.path.clone(),
            package_name: self.target.package_name.clone(),
            package_root: self.target.package_root().to_owned(),
            imported_by: importers.iter().copied().cloned().collect(),
        }
    }
}

struct TemplateTarget<'a> {
    cooked_quasis: Vec<String>,
    expression_name_hints: Vec<String>,
    target: Target<'a>,
}

impl TemplateTarget<'_> {
    fn resolve(&self, importers: &[&Import]) -> ResolvedTemplateImport {
        ResolvedTemplateImport {
            cooked_quasis: self.cooked_quasis.clone(),
            expression_name_hints: self.expression_name_hints.clone(),
            package_name: self.target.package_name.clone(),
            package_root: self.target.package_root().to_owned(),
            imported_by: importers.iter().copied().cloned().collect(),
        }
    }
}

fn compare_templates(a: &ResolvedTemplateImport, b: &ResolvedTemplateImport) -> std::cmp::Ordering {
    a.leading_quasi()
        .cmp(b.leading_quasi())
        .then_with(|| a.cooked_quasis.cmp(&b.cooked_quasis))
}

fn same_snapshot(previous: &[Arc<[Import]>], next: &[Arc<[Import]>]) -> bool {
    previous.len() == next.len()
        && previous
            .iter()
            .zip(next)
            .all(|(a, b)| Arc::ptr_eq(a, b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use aim_core::{AutoImportOptions, LiteralSyntax, SourceLocation, TreeType};
    use aim_core::{ImportSyntax, TemplateSyntax};
    use aim_package::{InvalidationSource, Package};
    use std::fs;

    struct Fixed(Arc<[Import]>);

    impl ImportSource for Fixed {
        fn imports(&self) -> Arc<[Import]> {
            Arc::clone(&self.0)
        }
    }

    struct Project {
        _dir: tempfile::TempDir,
        root: Utf8PathBuf,
        invalidation: InvalidationSource,
    }

    impl Project {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let root = Utf8Path::from_path(dir.path())
                .unwrap()
                .canonicalize_utf8()
                .unwrap();
            Self {
                _dir: dir,
                root,
                invalidation: InvalidationSource::new(),
            }
        }

        fn install(&self, at: &Utf8Path, name: &str, version: &str) {
            let dir = at.join("node_modules").join(name);
            fs::create_dir_all(&dir).unwrap();
            fs::write(
                dir.join("package.json"),
                format!(r#"{{ "name": "{name}", "version": "{version}" }}"#),
            )
            .unwrap();
        }

        fn package(&self, dir: &str, name: &str, deps: &str) -> Arc<Package> {
            let root = self.root.join(dir);
            fs::create_dir_all(&root).unwrap();
            fs::write(
                root.join("package.json"),
                format!(r#"{{ "name": "{name}", "dependencies": {deps} }}"#),
            )
            .unwrap();
            Arc::new(Package::new(
                name,
                root,
                false,
                AutoImportOptions::default(),
                self.invalidation.token(),
            ))
        }
    }

    fn literal(package: &Arc<Package>, specifier: &str, dynamic: bool, tree: TreeType) -> Import {
        Import::from_syntax(
            &ImportSyntax::Literal(LiteralSyntax::new(specifier, dynamic, SourceLocation::default())),
            Utf8Path::new("index.js"),
            package,
            Some(tree),
        )
    }

    fn template(package: &Arc<Package>, quasis: &[&str], tree: TreeType) -> Import {
        let hints = vec![None; quasis.len() - 1];
        let syntax = TemplateSyntax::new(
            quasis.iter().map(|&q| q.to_owned()).collect(),
            hints,
            true,
            SourceLocation::default(),
        )
        .unwrap();
        Import::from_syntax(
            &ImportSyntax::Template(syntax),
            Utf8Path::new("index.js"),
            package,
            Some(tree),
        )
    }

    #[test]
    fn test_memoized_until_sources_change() {
        let project = Project::new();
        project.install(&project.root, "alpha", "1.0.0");
        let app = project.package(".", "app", r#"{ "alpha": "^1.0.0" }"#);

        let source = Fixed(vec![literal(&app, "alpha", false, TreeType::App)].into());
        let mut splitter = Splitter::new(BundleConfig::default());
        let first = splitter.deps(&[&source]).unwrap();
        let second = splitter.deps(&[&source]).unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        let changed = Fixed(vec![literal(&app, "alpha", true, TreeType::App)].into());
        let third = splitter.deps(&[&changed]).unwrap();
        assert!(!Arc::ptr_eq(&first, &third));
        assert_eq!(third.bundle("app").unwrap().dynamic_imports.len(), 1);
    }

    #[test]
    fn test_invalidation_recomputes() {
        let project = Project::new();
        project.install(&project.root, "alpha", "1.0.0");
        let app = project.package(".", "app", r#"{ "alpha": "^1.0.0" }"#);
        let source = Fixed(vec![literal(&app, "alpha", false, TreeType::App)].into());

        let mut splitter =
            Splitter::new(BundleConfig::default()).with_invalidation(project.invalidation.token());
        let first = splitter.deps(&[&source]).unwrap();
        project.invalidation.bump();
        let second = splitter.deps(&[&source]).unwrap();
        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(*first, *second);
    }

    #[test]
    fn test_static_and_dynamic_uses_split() {
        let project = Project::new();
        project.install(&project.root, "alpha", "1.0.0");
        let app = project.package(".", "app", r#"{ "alpha": "^1.0.0" }"#);
        let source = Fixed(
            vec![
                literal(&app, "alpha", false, TreeType::Test),
                literal(&app, "alpha", true, TreeType::App),
            ]
            .into(),
        );

        let manifest = Splitter::new(BundleConfig::default()).deps(&[&source]).unwrap();
        let app_deps = manifest.bundle("app").unwrap();
        let test_deps = manifest.bundle("tests").unwrap();
        assert_eq!(app_deps.dynamic_imports.len(), 1);
        assert!(app_deps.static_imports.is_empty());
        assert_eq!(test_deps.static_imports.len(), 1);
        assert_eq!(test_deps.static_imports[0].imported_by.len(), 1);
    }

    #[test]
    fn test_missing_hints_become_positional() {
        let project = Project::new();
        project.install(&project.root, "alpha", "1.0.0");
        let app = project.package(".", "app", r#"{ "alpha": "^1.0.0" }"#);
        let source = Fixed(vec![template(&app, &["alpha/", "/", ""], TreeType::App)].into());

        let manifest = Splitter::new(BundleConfig::default()).deps(&[&source]).unwrap();
        let entry = &manifest.bundle("app").unwrap().dynamic_template_imports[0];
        assert_eq!(entry.expression_name_hints, ["arg0", "arg1"]);
        assert_eq!(entry.package_name, "alpha");
    }

    #[test]
    fn test_same_install_skips_version_check() {
        let project = Project::new();
        project.install(&project.root, "dep", "1.0.0");
        let a = project.package("a", "a", r#"{ "dep": "^1.0.0" }"#);
        let b = project.package("b", "b", r#"{ "dep": "^9.0.0" }"#);
        let source = Fixed(
            vec![
                literal(&a, "dep", false, TreeType::App),
                literal(&b, "dep", false, TreeType::App),
            ]
            .into(),
        );

        // Both resolve to the one hoisted install, so there is nothing to compare.
        let manifest = Splitter::new(BundleConfig::default()).deps(&[&source]).unwrap();
        assert_eq!(manifest.bundle("app").unwrap().static_imports[0].imported_by.len(), 2);
    }
}
