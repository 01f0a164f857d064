//! A project's analyzers and splitter, wired together.

use std::sync::Arc;

use aim_analyzer::{Analyzer, Import, ImportSource};
use aim_core::ProjectConfig;
use aim_package::{InvalidationSource, PackageCache};
use aim_splitter::{BackendOptions, BundleConfig, DependencyManifest, Splitter};
use aim_watcher::WatchPath;
use camino::{Utf8Path, Utf8PathBuf};
use color_eyre::eyre::WrapErr;
use tracing::{debug, info};

/// Every analyzer of a project feeding one splitter.
pub struct Pipeline {
    root: Utf8PathBuf,
    config: ProjectConfig,
    invalidation: InvalidationSource,
    packages: PackageCache,
    analyzers: Vec<Analyzer>,
    splitter: Splitter,
    watched: Vec<Utf8PathBuf>,
}

impl Pipeline {
    /// Creates one analyzer per configured tree.
    ///
    /// With `mirror` set, every tree is mirrored below the configured output
    /// directory as `<outputDir>/<package name>/<tree dir>`.
    pub fn new(root: &Utf8Path, config: ProjectConfig, mirror: bool) -> color_eyre::Result<Self> {
        let root = root
            .canonicalize_utf8()
            .wrap_err_with(|| format!("cannot resolve project root {root}"))?;
        let invalidation = InvalidationSource::new();
        let packages = PackageCache::with_invalidation(invalidation.clone());
        let output_root = root.join(&config.output_dir);

        let mut analyzers = Vec::new();
        for (index, package_config) in config.packages().enumerate() {
            let package = packages
                .get_or_create(&root, package_config, index > 0)
                .wrap_err_with(|| format!("loading package at {}", package_config.root))?;

            for tree in &package_config.trees {
                let input = package.root().join(&tree.dir);
                debug!(package = %package.name(), input = %input, "adding tree");
                let mut analyzer = Analyzer::new(input, Arc::clone(&package), tree.tree_type)
                    .with_extensions(config.extensions.iter().cloned());
                if mirror {
                    analyzer =
                        analyzer.with_output(output_root.join(package.name()).join(&tree.dir));
                }
                analyzers.push(analyzer);
            }
        }

        let options = BackendOptions::collect(&packages.packages())?;
        let watched = options.watched_directories.clone();
        let splitter = Splitter::new(BundleConfig::new(&config.bundles))
            .with_options(options)
            .with_invalidation(invalidation.token());

        Ok(Self {
            root,
            config,
            invalidation,
            packages,
            analyzers,
            splitter,
            watched,
        })
    }

    /// The canonical project root.
    pub fn root(&self) -> &Utf8Path {
        &self.root
    }

    /// The loaded project configuration.
    pub const fn config(&self) -> &ProjectConfig {
        &self.config
    }

    /// Where trees are mirrored.
    pub fn output_dir(&self) -> Utf8PathBuf {
        self.root.join(&self.config.output_dir)
    }

    /// Brings every analyzer up to date and splits their imports.
    pub fn build(&mut self) -> color_eyre::Result<Arc<DependencyManifest>> {
        let mut parsed = 0;
        for analyzer in &mut self.analyzers {
            let summary = analyzer
                .build()
                .wrap_err_with(|| format!("analyzing {}", analyzer.input()))?;
            parsed += summary.parsed;
        }

        let sources: Vec<&dyn ImportSource> = self
            .analyzers
            .iter()
            .map(|analyzer| analyzer as &dyn ImportSource)
            .collect();
        let manifest = self.splitter.deps(&sources)?;

        info!(
            trees = self.analyzers.len(),
            parsed,
            bundles = manifest.bundles.len(),
            "build complete"
        );
        Ok(manifest)
    }

    /// Re-reads every `package.json` and the options derived from them.
    ///
    /// Returns `true` when the set of watched dependency directories changed.
    pub fn reload_manifests(&mut self) -> color_eyre::Result<bool> {
        let generation = self.invalidation.bump();
        let options = BackendOptions::collect(&self.packages.packages())?;
        let changed = options.watched_directories != self.watched;
        self.watched.clone_from(&options.watched_directories);
        self.splitter.set_options(options);
        info!(generation, watch_changed = changed, "reloaded package manifests");
        Ok(changed)
    }

    /// Source trees, package roots and watched dependencies that exist on
    /// disk.
    pub fn watch_paths(&self) -> Vec<WatchPath> {
        let trees = self
            .analyzers
            .iter()
            .map(|analyzer| WatchPath::recursive(analyzer.input()));
        let roots = self
            .packages
            .packages()
            .into_iter()
            .map(|package| WatchPath::shallow(package.root()));
        let dependencies = self.watched.iter().map(WatchPath::recursive);

        let mut paths: Vec<WatchPath> = Vec::new();
        for path in trees.chain(roots).chain(dependencies) {
            if path.path.exists() && !paths.contains(&path) {
                paths.push(path);
            }
        }
        paths
    }

    /// Per-file imports of every tree, after a build.
    pub fn files(&self) -> impl Iterator<Item = (&Utf8Path, &Utf8Path, &[Import])> {
        self.analyzers.iter().flat_map(|analyzer| {
            analyzer
                .files()
                .map(move |(path, imports)| (analyzer.input(), path, imports))
        })
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("root", &self.root)
            .field("analyzers", &self.analyzers.len())
            .field("watched", &self.watched)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn project() -> (tempfile::TempDir, Utf8PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path()).unwrap().canonicalize_utf8().unwrap();
        fs::write(
            root.join("package.json"),
            r#"{ "name": "my-app", "dependencies": { "lodash": "^4.0.0" } }"#,
        )
        .unwrap();
        fs::create_dir_all(root.join("node_modules/lodash")).unwrap();
        fs::write(
            root.join("node_modules/lodash/package.json"),
            r#"{ "name": "lodash", "version": "4.17.21" }"#,
        )
        .unwrap();
        fs::create_dir_all(root.join("app")).unwrap();
        fs::write(root.join("app/app.js"), "import get from 'lodash/get';\n").unwrap();
        (dir, root)
    }

    #[test]
    fn test_build_and_mirror() {
        let (_dir, root) = project();
        let mut pipeline = Pipeline::new(&root, ProjectConfig::default(), true).unwrap();

        let manifest = pipeline.build().unwrap();
        let app = manifest.bundle("app").unwrap();
        assert_eq!(app.static_imports.len(), 1);
        assert_eq!(app.static_imports[0].specifier, "lodash/get");

        assert!(pipeline.output_dir().join("my-app/app/app.js").exists());
        assert_eq!(pipeline.files().count(), 1);
    }

    #[test]
    fn test_rebuild_without_changes_reuses_manifest() {
        let (_dir, root) = project();
        let mut pipeline = Pipeline::new(&root, ProjectConfig::default(), false).unwrap();

        let first = pipeline.build().unwrap();
        let second = pipeline.build().unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        assert!(!pipeline.reload_manifests().unwrap());
        let third = pipeline.build().unwrap();
        assert!(!Arc::ptr_eq(&second, &third));
        assert_eq!(first, third);
    }

    #[test]
    fn test_watch_paths_skip_missing_trees() {
        let (_dir, root) = project();
        let pipeline = Pipeline::new(&root, ProjectConfig::default(), false).unwrap();

        // The default layout also has `tests/`, which does not exist here.
        let paths = pipeline.watch_paths();
        assert_eq!(
            paths,
            [WatchPath::recursive(root.join("app")), WatchPath::shallow(&root)]
        );
    }
}
