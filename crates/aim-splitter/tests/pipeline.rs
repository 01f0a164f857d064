//! End-to-end tests: source trees on disk, through the analyzer, into a
//! dependency manifest.

use std::fs;
use std::sync::Arc;

use aim_analyzer::{Analyzer, ImportSource};
use aim_core::{AutoImportOptions, PackageConfig, TreeType};
use aim_package::{Package, PackageCache};
use aim_splitter::{BackendOptions, BundleConfig, SplitError, Splitter};
use camino::{Utf8Path, Utf8PathBuf};

struct Project {
    _dir: tempfile::TempDir,
    root: Utf8PathBuf,
    packages: PackageCache,
}

impl Project {
    fn new(app_dependencies: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8Path::from_path(dir.path())
            .unwrap()
            .canonicalize_utf8()
            .unwrap();
        let project = Self {
            _dir: dir,
            root,
            packages: PackageCache::new(),
        };
        project.write(
            "package.json",
            &format!(r#"{{ "name": "my-app", "dependencies": {app_dependencies} }}"#),
        );
        project
    }

    fn write(&self, path: &str, contents: &str) {
        let full = self.root.join(path);
        fs::create_dir_all(full.parent().unwrap()).unwrap();
        fs::write(full, contents).unwrap();
    }

    fn install(&self, under: &str, name: &str, version: &str) {
        self.write(
            &format!("{under}node_modules/{name}/package.json"),
            &format!(r#"{{ "name": "{name}", "version": "{version}" }}"#),
        );
    }

    fn app(&self) -> Arc<Package> {
        self.app_with(AutoImportOptions::default())
    }

    fn app_with(&self, options: AutoImportOptions) -> Arc<Package> {
        let config = PackageConfig {
            options,
            ..PackageConfig::default_app()
        };
        self.packages.get_or_create(&self.root, &config, false).unwrap()
    }

    fn addon(&self, dir: &str) -> Arc<Package> {
        let config = PackageConfig {
            root: dir.into(),
            ..PackageConfig::default()
        };
        self.packages.get_or_create(&self.root, &config, true).unwrap()
    }

    fn analyzer(&self, dir: &str, package: &Arc<Package>, tree_type: TreeType) -> Analyzer {
        let mut analyzer = Analyzer::new(self.root.join(dir), Arc::clone(package), Some(tree_type));
        analyzer.build().unwrap();
        analyzer
    }
}

fn splitter() -> Splitter {
    Splitter::new(BundleConfig::default())
}

#[test]
fn test_literal_dynamic_and_template_imports() {
    let project = Project::new(r#"{ "alpha": "^1.0.0", "@beta/thing": "^2.0.0" }"#);
    project.install("", "alpha", "1.0.0");
    project.install("", "@beta/thing", "2.1.0");
    project.write(
        "app/index.js",
        "import 'alpha';\nimport('@beta/thing');\nimport(`alpha/${x}`);\n",
    );

    let app = project.app();
    let sources = project.analyzer("app", &app, TreeType::App);
    let manifest = splitter().deps(&[&sources]).unwrap();
    let deps = manifest.bundle("app").unwrap();

    assert_eq!(deps.static_imports.len(), 1);
    assert_eq!(deps.static_imports[0].specifier, "alpha");

    assert_eq!(deps.dynamic_imports.len(), 1);
    assert_eq!(deps.dynamic_imports[0].package_name, "@beta/thing");

    assert!(deps.static_template_imports.is_empty());
    assert_eq!(deps.dynamic_template_imports.len(), 1);
    let template = &deps.dynamic_template_imports[0];
    assert_eq!(template.cooked_quasis, ["alpha/", ""]);
    assert_eq!(template.expression_name_hints, ["x"]);
    assert_eq!(template.package_root, project.root.join("node_modules/alpha"));

    assert!(manifest.bundle("tests").unwrap().is_empty());
}

#[test]
fn test_app_bundle_wins_over_tests() {
    let project = Project::new(r#"{ "alpha": "*" }"#);
    project.install("", "alpha", "1.0.0");
    project.write("app/a.js", "import 'alpha';");
    project.write("tests/a-test.js", "import 'alpha';");

    let app = project.app();
    let sources = project.analyzer("app", &app, TreeType::App);
    let tests = project.analyzer("tests", &app, TreeType::Test);

    // Order of sources does not matter, bundle priority does.
    let manifest = splitter().deps(&[&tests, &sources]).unwrap();
    let app_deps = manifest.bundle("app").unwrap();
    assert_eq!(app_deps.static_imports.len(), 1);
    assert_eq!(app_deps.static_imports[0].imported_by.len(), 2);
    assert!(manifest.bundle("tests").unwrap().is_empty());
}

#[test]
fn test_test_only_dependency_goes_to_tests() {
    let project = Project::new(r#"{ "qunit-dom": "*" }"#);
    project.install("", "qunit-dom", "3.0.0");
    project.write("tests/helper.js", "import 'qunit-dom';");

    let app = project.app();
    let tests = project.analyzer("tests", &app, TreeType::Test);
    let manifest = splitter().deps(&[&tests]).unwrap();

    assert!(manifest.bundle("app").unwrap().is_empty());
    assert_eq!(manifest.bundle("tests").unwrap().static_imports.len(), 1);
}

#[test]
fn test_ambiguous_templates_are_rejected() {
    for source in ["import(`lo${x}`);", "import(`@scope/${x}`);"] {
        let project = Project::new("{}");
        project.write("app/index.js", source);
        let app = project.app();
        let sources = project.analyzer("app", &app, TreeType::App);

        let err = splitter().deps(&[&sources]).unwrap_err();
        assert!(matches!(err, SplitError::AmbiguousDynamicImport { .. }));
        assert!(
            err.to_string()
                .starts_with("Dynamic imports must target unambiguous package names"),
            "{err}"
        );
    }
}

#[test]
fn test_dynamic_relative_import_is_rejected() {
    let project = Project::new("{}");
    project.write("app/index.js", "import './static-is-fine';\nimport('./local');");
    let app = project.app();
    let sources = project.analyzer("app", &app, TreeType::App);

    let err = splitter().deps(&[&sources]).unwrap_err();
    assert!(matches!(err, SplitError::RelativeDynamicImport { .. }));
    assert!(err.to_string().contains("does not support dynamic relative imports"));
    assert!(err.to_string().contains("\"./local\""));
}

#[test]
fn test_type_position_imports_are_not_dependencies() {
    let project = Project::new(r#"{ "alpha": "^1.0.0" }"#);
    project.install("", "alpha", "1.0.0");
    project.write(
        "app/types.ts",
        "type Local = import('./local').X;\n\
         let shape: typeof import('not-installed');\n\
         const lazy = import('alpha');\n",
    );
    let app = project.app();
    let sources = project.analyzer("app", &app, TreeType::App);

    let manifest = splitter().deps(&[&sources]).unwrap();
    let deps = manifest.bundle("app").unwrap();
    assert!(deps.static_imports.is_empty());
    assert_eq!(deps.dynamic_imports.len(), 1);
    assert_eq!(deps.dynamic_imports[0].package_name, "alpha");
}

#[test]
fn test_version_conflict_between_installs() {
    let project = Project::new(r#"{ "dep": "^1.0.0" }"#);
    project.install("", "dep", "1.2.0");
    project.write(
        "addons/other/package.json",
        r#"{ "name": "other-addon", "dependencies": { "dep": "^2.0.0" } }"#,
    );
    project.install("addons/other/", "dep", "2.0.0");
    project.write("app/index.js", "import 'dep';");
    project.write("addons/other/addon/index.js", "import 'dep';");

    let app = project.app();
    let addon = project.addon("addons/other");
    let app_sources = project.analyzer("app", &app, TreeType::App);
    let addon_sources = project.analyzer("addons/other/addon", &addon, TreeType::Addon);

    let err = splitter().deps(&[&app_sources, &addon_sources]).unwrap_err();
    insta::assert_snapshot!(
        err.to_string(),
        @"other-addon needs dep satisfying ^2.0.0, but we have version 1.2.0 because of my-app"
    );
}

#[test]
fn test_identical_versions_skip_the_range_check() {
    let project = Project::new(r#"{ "dep": "^1.0.0" }"#);
    project.install("", "dep", "1.2.0");
    project.write(
        "addons/other/package.json",
        r#"{ "name": "other-addon", "dependencies": { "dep": "^2.0.0" } }"#,
    );
    project.install("addons/other/", "dep", "1.2.0");
    project.write("app/index.js", "import 'dep';");
    project.write("addons/other/addon/index.js", "import 'dep';");

    let app = project.app();
    let addon = project.addon("addons/other");
    let app_sources = project.analyzer("app", &app, TreeType::App);
    let addon_sources = project.analyzer("addons/other/addon", &addon, TreeType::Addon);

    let manifest = splitter().deps(&[&app_sources, &addon_sources]).unwrap();
    let deps = manifest.bundle("app").unwrap();
    assert_eq!(deps.static_imports.len(), 1);
    assert_eq!(deps.static_imports[0].package_root, project.root.join("node_modules/dep"));
    assert_eq!(deps.static_imports[0].imported_by.len(), 2);
}

#[test]
fn test_compatible_installs_share_a_target() {
    let project = Project::new(r#"{ "dep": "^1.0.0" }"#);
    project.install("", "dep", "1.5.0");
    project.write(
        "addons/other/package.json",
        r#"{ "name": "other-addon", "dependencies": { "dep": "^1.2.0" } }"#,
    );
    project.install("addons/other/", "dep", "1.2.0");
    project.write("app/index.js", "import 'dep';");
    project.write("addons/other/addon/index.js", "import 'dep';");

    let app = project.app();
    let addon = project.addon("addons/other");
    let app_sources = project.analyzer("app", &app, TreeType::App);
    let addon_sources = project.analyzer("addons/other/addon", &addon, TreeType::Addon);

    let manifest = splitter().deps(&[&app_sources, &addon_sources]).unwrap();
    let target = &manifest.bundle("app").unwrap().static_imports[0];
    assert_eq!(target.package_root, project.root.join("node_modules/dep"));
    assert_eq!(target.imported_by.len(), 2);
}

#[test]
fn test_addon_dev_dependency_is_rejected() {
    let project = Project::new("{}");
    project.write(
        "addons/other/package.json",
        r#"{ "name": "other-addon", "devDependencies": { "dep": "^1.0.0" } }"#,
    );
    project.install("addons/other/", "dep", "1.0.0");
    project.write("addons/other/addon/index.js", "import 'dep';");

    let addon = project.addon("addons/other");
    let sources = project.analyzer("addons/other/addon", &addon, TreeType::Addon);

    let err = splitter().deps(&[&sources]).unwrap_err();
    assert!(matches!(err, SplitError::Package(_)));
    assert!(err.is_user_error());
}

#[test]
fn test_alias_and_exclude() {
    let project = Project::new(r#"{ "lodash-es": "*", "jquery": "*" }"#);
    project.install("", "lodash-es", "4.17.21");
    project.install("", "jquery", "3.7.1");
    project.write("app/index.js", "import 'lodash/get';\nimport 'jquery';\nimport 'undeclared';");

    let mut options = AutoImportOptions::default();
    options.alias.insert("lodash".to_owned(), "lodash-es".to_owned());
    options.exclude.push("jquery".to_owned());
    let app = project.app_with(options);
    let sources = project.analyzer("app", &app, TreeType::App);

    let manifest = splitter().deps(&[&sources]).unwrap();
    let imports = &manifest.bundle("app").unwrap().static_imports;
    assert_eq!(imports.len(), 1);
    assert_eq!(imports[0].specifier, "lodash/get");
    assert_eq!(imports[0].path, "lodash-es/get");
    assert_eq!(imports[0].package_name, "lodash-es");
}

#[test]
fn test_rebuilds_are_incremental_and_memoized() {
    let project = Project::new(r#"{ "alpha": "*", "beta": "*" }"#);
    project.install("", "alpha", "1.0.0");
    project.install("", "beta", "1.0.0");
    project.write("app/a.js", "import 'alpha';");
    project.write("app/b.js", "export const b = 1;");

    let app = project.app();
    let mut sources = project.analyzer("app", &app, TreeType::App);
    let mut splitter = splitter();
    let first = splitter.deps(&[&sources]).unwrap();

    // Deleting an import-free file changes nothing downstream.
    fs::remove_file(project.root.join("app/b.js")).unwrap();
    sources.build().unwrap();
    assert!(Arc::ptr_eq(&first, &splitter.deps(&[&sources]).unwrap()));

    project.write("app/a.js", "import 'alpha';\nimport 'beta';");
    let summary = sources.build().unwrap();
    assert_eq!(summary.parsed, 1);
    let second = splitter.deps(&[&sources]).unwrap();
    assert_eq!(second.bundle("app").unwrap().static_imports.len(), 2);

    fs::remove_file(project.root.join("app/a.js")).unwrap();
    sources.build().unwrap();
    assert!(sources.imports().is_empty());
    assert!(splitter.deps(&[&sources]).unwrap().bundle("app").unwrap().is_empty());
}

#[test]
fn test_manifest_json_shape() {
    let project = Project::new(r#"{ "alpha": "*" }"#);
    project.install("", "alpha", "1.0.0");
    project.write("app/index.js", "import { a } from 'alpha';");

    let app = project.app();
    let sources = project.analyzer("app", &app, TreeType::App);
    let mut splitter = splitter().with_options(BackendOptions::collect(&[Arc::clone(&app)]).unwrap());
    let manifest = splitter.deps(&[&sources]).unwrap();

    let json = serde_json::to_value(&*manifest).unwrap();
    let entry = &json["bundles"]["app"]["staticImports"][0];
    assert_eq!(entry["specifier"], "alpha");
    assert_eq!(entry["packageName"], "alpha");
    assert_eq!(entry["importedBy"][0]["package"], "my-app");
    assert_eq!(entry["importedBy"][0]["path"], "index.js");
    assert_eq!(json["entrypoints"]["app"]["js"], "assets/vendor.js");
    assert_eq!(json["options"]["forbidEval"], false);
}
