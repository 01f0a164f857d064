//! Incremental import analysis of one source tree.
//!
//! Each [`Analyzer::build`] walks its input directory, diffs it against the
//! previous build and only re-parses files whose content changed:
//!
//! 1. [`TreeWalker`] takes a [`TreeSnapshot`]
//! 2. [`diff`] turns the two snapshots into ordered [`PatchEntry`]s
//! 3. changed files are parsed in parallel with `rayon`, one [`TsParser`]
//!    per worker via `map_init()`
//! 4. entries are applied in order to the per-file import lists and the
//!    output mirror
//!
//! Parsing happens before any state changes. A file that fails to parse
//! fails the whole build and the next build starts again from the last good
//! snapshot.

use std::fs;
use std::sync::Arc;

use aim_core::TreeType;
use aim_package::Package;
use aim_parser::{ParseError, TsParser};
use camino::{Utf8Path, Utf8PathBuf};
use indexmap::IndexMap;
use parking_lot::Mutex;
use rayon::prelude::*;
use rustc_hash::FxHashMap;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::AnalyzeError;
use crate::import::{Import, ImportSource};
use crate::mirror::Mirror;
use crate::patch::{PatchEntry, PatchOp, diff};
use crate::snapshot::TreeSnapshot;
use crate::walker::TreeWalker;

/// Extensions parsed for imports unless configured otherwise.
pub const DEFAULT_EXTENSIONS: &[&str] = &["js", "mjs", "ts", "jsx", "tsx"];

/// What one build did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BuildSummary {
    /// Patch entries applied.
    pub entries: usize,
    /// Files parsed.
    pub parsed: usize,
    /// Whether the flattened import list changed.
    pub invalidated: bool,
}

/// Discovers the imports of every file in one input tree.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
///
/// use aim_analyzer::{Analyzer, ImportSource};
/// use aim_core::{PackageConfig, TreeType};
/// use aim_package::PackageCache;
/// use camino::Utf8Path;
///
/// let project = Utf8Path::new("/work/my-app");
/// let cache = PackageCache::new();
/// let app = cache.get_or_create(project, &PackageConfig::default_app(), false)?;
///
/// let mut analyzer = Analyzer::new(project.join("app"), Arc::clone(&app), Some(TreeType::App));
/// let summary = analyzer.build()?;
/// println!("parsed {} files, {} imports", summary.parsed, analyzer.imports().len());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Analyzer {
    package: Arc<Package>,
    tree_type: Option<TreeType>,
    walker: TreeWalker,
    mirror: Option<Mirror>,
    extensions: Vec<String>,
    snapshot: TreeSnapshot,
    files: IndexMap<Utf8PathBuf, Vec<Import>>,
    memo: Mutex<Option<Arc<[Import]>>>,
}

impl Analyzer {
    /// Creates an analyzer for `input`, owned by `package`.
    #[must_use]
    pub fn new(
        input: impl Into<Utf8PathBuf>,
        package: Arc<Package>,
        tree_type: Option<TreeType>,
    ) -> Self {
        Self {
            package,
            tree_type,
            walker: TreeWalker::new(input),
            mirror: None,
            extensions: DEFAULT_EXTENSIONS.iter().map(|&ext| ext.to_owned()).collect(),
            snapshot: TreeSnapshot::new(),
            files: IndexMap::new(),
            memo: Mutex::new(None),
        }
    }

    /// Mirrors the input tree into `output` on every build.
    #[must_use]
    pub fn with_output(mut self, output: impl Into<Utf8PathBuf>) -> Self {
        self.mirror = Some(Mirror::new(self.walker.root(), output));
        self
    }

    /// Replaces the extensions whose files are parsed.
    #[must_use]
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.extensions = extensions.into_iter().map(Into::into).collect();
        self
    }

    /// The input directory.
    #[must_use]
    pub fn input(&self) -> &Utf8Path {
        self.walker.root()
    }

    /// The owning package.
    #[must_use]
    pub const fn package(&self) -> &Arc<Package> {
        &self.package
    }

    /// The tree type every import is tagged with.
    #[must_use]
    pub const fn tree_type(&self) -> Option<TreeType> {
        self.tree_type
    }

    /// The snapshot of the last successful build.
    #[must_use]
    pub const fn snapshot(&self) -> &TreeSnapshot {
        &self.snapshot
    }

    /// Per-file import lists in discovery order.
    pub fn files(&self) -> impl Iterator<Item = (&Utf8Path, &[Import])> {
        self.files
            .iter()
            .map(|(path, imports)| (path.as_path(), imports.as_slice()))
    }

    /// Whether `path` is parsed for imports.
    #[must_use]
    pub fn is_tracked(&self, path: &Utf8Path) -> bool {
        if path.as_str().ends_with(".d.ts") {
            return false;
        }
        path.extension()
            .is_some_and(|ext| self.extensions.iter().any(|tracked| tracked == ext))
    }

    /// Drops the memoized flattened list.
    pub fn invalidate(&self) {
        *self.memo.lock() = None;
    }

    /// Brings the analyzer up to date with its input directory.
    ///
    /// # Errors
    ///
    /// Returns the first walk, read, parse or mirror error. Walk, read and
    /// parse errors leave the analyzer untouched.
    pub fn build(&mut self) -> Result<BuildSummary, AnalyzeError> {
        let next = self.walker.walk(&self.snapshot)?;
        let patch = diff(&self.snapshot, &next);
        if patch.is_empty() {
            debug!(input = %self.input(), "no changes");
            self.snapshot = next;
            return Ok(BuildSummary::default());
        }

        let mut parsed = self.parse_changed(&patch)?;
        let parsed_count = parsed.len();

        if let Some(mirror) = &self.mirror {
            mirror.prepare()?;
        }

        let mut invalidated = false;
        for entry in &patch {
            if self.is_tracked(&entry.path) {
                invalidated |= self.apply(entry, &mut parsed);
            }
            if let Some(mirror) = &self.mirror {
                mirror.apply(entry)?;
            }
        }

        if invalidated {
            self.invalidate();
        }
        self.snapshot = next;

        info!(
            input = %self.input(),
            entries = patch.len(),
            parsed = parsed_count,
            invalidated,
            "analyzed tree"
        );
        Ok(BuildSummary {
            entries: patch.len(),
            parsed: parsed_count,
            invalidated,
        })
    }

    /// Parses every created or changed tracked file, in parallel.
    fn parse_changed(
        &self,
        patch: &[PatchEntry],
    ) -> Result<FxHashMap<Utf8PathBuf, Vec<Import>>, AnalyzeError> {
        let targets: Vec<&Utf8Path> = patch
            .iter()
            .filter(|entry| entry.op.writes_file() && self.is_tracked(&entry.path))
            .map(|entry| entry.path.as_path())
            .collect();
        if targets.is_empty() {
            return Ok(FxHashMap::default());
        }

        // Surface grammar problems once, with their real cause.
        TsParser::new().map_err(AnalyzeError::Parser)?;

        let root = self.walker.root();
        let package = &self.package;
        let tree_type = self.tree_type;

        targets
            .par_iter()
            .map_init(
                || TsParser::new().ok(),
                |parser, &path| {
                    let parser = parser
                        .as_mut()
                        .ok_or_else(|| AnalyzeError::Parser(ParseError::ParserInit))?;
                    let full = root.join(path);
                    let source =
                        fs::read_to_string(&full).map_err(|e| AnalyzeError::read(&full, e))?;
                    let syntax = parser
                        .parse_for_extension(&source, path.extension().unwrap_or_default())
                        .map_err(|e| AnalyzeError::parse(path, e))?;

                    debug!(path = %path, imports = syntax.len(), "parsed file");
                    let imports = syntax
                        .iter()
                        .map(|s| Import::from_syntax(s, path, package, tree_type))
                        .collect();
                    Ok((path.to_owned(), imports))
                },
            )
            .collect()
    }

    /// Applies one entry for a tracked path. Returns whether the flattened
    /// list changed.
    fn apply(
        &mut self,
        entry: &PatchEntry,
        parsed: &mut FxHashMap<Utf8PathBuf, Vec<Import>>,
    ) -> bool {
        match entry.op {
            PatchOp::Unlink => self
                .files
                .shift_remove(&entry.path)
                .is_some_and(|old| !old.is_empty()),
            PatchOp::Create | PatchOp::Change => {
                let imports = parsed.remove(&entry.path).unwrap_or_default();
                let previous = self.files.get(&entry.path);
                if previous.is_some_and(|previous| *previous == imports) {
                    return false;
                }
                let changed = previous.is_some() || !imports.is_empty();
                self.files.insert(entry.path.clone(), imports);
                changed
            }
            PatchOp::Mkdir | PatchOp::Rmdir => false,
        }
    }
}

impl ImportSource for Analyzer {
    fn imports(&self) -> Arc<[Import]> {
        let mut memo = self.memo.lock();
        if let Some(imports) = memo.as_ref() {
            return Arc::clone(imports);
        }
        let flattened: Arc<[Import]> = self.files.values().flatten().cloned().collect();
        *memo = Some(Arc::clone(&flattened));
        flattened
    }
}

impl std::fmt::Debug for Analyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Analyzer")
            .field("input", &self.input())
            .field("package", &self.package.name())
            .field("tree_type", &self.tree_type)
            .field("files", &self.files.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use aim_core::AutoImportOptions;
    use aim_package::InvalidationSource;

    struct Fixture {
        _dir: tempfile::TempDir,
        root: Utf8PathBuf,
        package: Arc<Package>,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let root = Utf8Path::from_path(dir.path()).unwrap().to_owned();
            fs::create_dir_all(root.join("app")).unwrap();
            let package = Arc::new(Package::new(
                "my-app",
                root.clone(),
                false,
                AutoImportOptions::default(),
                InvalidationSource::new().token(),
            ));
            Self {
                _dir: dir,
                root,
                package,
            }
        }

        fn write(&self, path: &str, contents: &str) {
            let full = self.root.join("app").join(path);
            if let Some(parent) = full.parent() {
                fs::create_dir_all(parent).unwrap();
            }
            fs::write(full, contents).unwrap();
        }

        fn analyzer(&self) -> Analyzer {
            Analyzer::new(
                self.root.join("app"),
                Arc::clone(&self.package),
                Some(TreeType::App),
            )
        }
    }

    fn specifiers(imports: &[Import]) -> Vec<String> {
        imports
            .iter()
            .map(|import| match import {
                Import::Literal(literal) => literal.specifier.clone(),
                Import::Template(template) => template.cooked_quasis.join("${}"),
            })
            .collect()
    }

    #[test]
    fn test_initial_build() {
        let fixture = Fixture::new();
        fixture.write("a.js", "import 'alpha';");
        fixture.write("b/c.ts", "import x from 'beta';\nexport { y } from 'gamma';");
        fixture.write("styles.css", "body {}");
        fixture.write("types.d.ts", "import 'ignored';");

        let mut analyzer = fixture.analyzer();
        let summary = analyzer.build().unwrap();

        assert_eq!(summary.parsed, 2);
        assert!(summary.invalidated);
        assert_eq!(specifiers(&analyzer.imports()), ["alpha", "beta", "gamma"]);
        assert!(analyzer.imports().iter().all(|i| i.tree_type() == Some(TreeType::App)));
    }

    #[test]
    fn test_memo_is_stable_without_changes() {
        let fixture = Fixture::new();
        fixture.write("a.js", "import 'alpha';");
        let mut analyzer = fixture.analyzer();
        analyzer.build().unwrap();

        let first = analyzer.imports();
        let summary = analyzer.build().unwrap();
        assert_eq!(summary, BuildSummary::default());
        assert!(Arc::ptr_eq(&first, &analyzer.imports()));
    }

    #[test]
    fn test_only_changed_file_is_parsed() {
        let fixture = Fixture::new();
        fixture.write("a.js", "import 'alpha';");
        fixture.write("b.js", "import 'beta';");
        let mut analyzer = fixture.analyzer();
        analyzer.build().unwrap();

        fixture.write("b.js", "import 'beta';\nimport 'delta';");
        let summary = analyzer.build().unwrap();

        assert_eq!(summary.parsed, 1);
        assert!(summary.invalidated);
        assert_eq!(specifiers(&analyzer.imports()), ["alpha", "beta", "delta"]);
    }

    #[test]
    fn test_moving_imports_keeps_memo() {
        let fixture = Fixture::new();
        fixture.write("a.js", "import 'alpha';");
        let mut analyzer = fixture.analyzer();
        analyzer.build().unwrap();
        let before = analyzer.imports();

        fixture.write("a.js", "// a comment\n\nimport 'alpha';\n");
        let summary = analyzer.build().unwrap();

        assert_eq!(summary.parsed, 1);
        assert!(!summary.invalidated);
        assert!(Arc::ptr_eq(&before, &analyzer.imports()));
    }

    #[test]
    fn test_deleting_import_free_file_keeps_memo() {
        let fixture = Fixture::new();
        fixture.write("a.js", "import 'alpha';");
        fixture.write("plain.js", "export const x = 1;");
        let mut analyzer = fixture.analyzer();
        analyzer.build().unwrap();
        let before = analyzer.imports();

        fs::remove_file(fixture.root.join("app/plain.js")).unwrap();
        let summary = analyzer.build().unwrap();

        assert!(!summary.invalidated);
        assert!(Arc::ptr_eq(&before, &analyzer.imports()));
        assert_eq!(analyzer.files().count(), 1);
    }

    #[test]
    fn test_deleting_file_removes_its_imports() {
        let fixture = Fixture::new();
        fixture.write("a.js", "import 'alpha';");
        fixture.write("b.js", "import 'beta';");
        let mut analyzer = fixture.analyzer();
        analyzer.build().unwrap();

        fs::remove_file(fixture.root.join("app/a.js")).unwrap();
        let summary = analyzer.build().unwrap();

        assert!(summary.invalidated);
        assert_eq!(specifiers(&analyzer.imports()), ["beta"]);
    }

    #[test]
    fn test_parse_failure_leaves_state_untouched() {
        let fixture = Fixture::new();
        fixture.write("a.js", "import 'alpha';");
        let mut analyzer = fixture.analyzer();
        analyzer.build().unwrap();
        let before = analyzer.imports();

        fixture.write("a.js", "import 'alpha';\nimport('beta' + suffix);");
        let err = analyzer.build().unwrap_err();
        assert!(matches!(err, AnalyzeError::Parse { .. }));
        assert!(err.is_source_error());
        assert!(Arc::ptr_eq(&before, &analyzer.imports()));

        fixture.write("a.js", "import 'alpha';\nimport('beta');");
        analyzer.build().unwrap();
        assert_eq!(specifiers(&analyzer.imports()), ["alpha", "beta"]);
    }

    #[test]
    fn test_output_mirror() {
        let fixture = Fixture::new();
        fixture.write("nested/a.js", "import 'alpha';");
        let output = fixture.root.join("out");
        let mut analyzer = fixture.analyzer().with_output(&output);
        analyzer.build().unwrap();
        assert_eq!(
            fs::read_to_string(output.join("nested/a.js")).unwrap(),
            "import 'alpha';"
        );

        fs::remove_file(fixture.root.join("app/nested/a.js")).unwrap();
        fs::remove_dir(fixture.root.join("app/nested")).unwrap();
        analyzer.build().unwrap();
        assert!(!output.join("nested").exists());
    }

    #[test]
    fn test_custom_extensions() {
        let fixture = Fixture::new();
        fixture.write("a.js", "import 'alpha';");
        fixture.write("b.ts", "import 'beta';");
        let mut analyzer = fixture.analyzer().with_extensions(["ts"]);
        analyzer.build().unwrap();
        assert_eq!(specifiers(&analyzer.imports()), ["beta"]);
    }
}
