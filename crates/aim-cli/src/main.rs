//! CLI entry point for aim.
//!
//! aim finds the npm imports in an app's source trees and splits them into
//! the bundles a backend should build.
//!
//! # Usage
//!
//! ```bash
//! aim [OPTIONS] <COMMAND>
//!
//! # One build, manifest on stdout
//! aim build --project ./my-app
//!
//! # Rebuild on every change, rewriting the manifest file
//! aim watch --project ./my-app --output dist/aim/manifest.json
//!
//! # List the imports found in each file
//! aim inspect --json
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

mod pipeline;

use std::io::Write;

use aim_analyzer::Import;
use aim_core::ProjectConfig;
use aim_splitter::DependencyManifest;
use aim_watcher::{CompositeFilter, ExcludeDirFilter, FileWatcher, SourceFilter};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};
use color_eyre::eyre::{WrapErr, eyre};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::pipeline::Pipeline;

// =============================================================================
// CLI ARGUMENT TYPES
// =============================================================================

/// Finds npm imports in app and addon sources and splits them into bundles.
#[derive(Parser)]
#[command(name = "aim", version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    command: Commands,

    /// Project root containing the app's `package.json`.
    #[arg(short, long, global = true, env = "AIM_PROJECT", default_value = ".")]
    project: Utf8PathBuf,

    /// Config file to use instead of `<project>/aim.json`.
    #[arg(short, long, global = true, env = "AIM_CONFIG")]
    config: Option<Utf8PathBuf>,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Analyze every tree once and print the dependency manifest.
    Build {
        /// Write the manifest here instead of stdout.
        #[arg(short, long)]
        output: Option<Utf8PathBuf>,
    },

    /// Build, then rebuild whenever sources or manifests change.
    Watch {
        /// Manifest file (defaults to `<outputDir>/manifest.json`).
        #[arg(short, long)]
        output: Option<Utf8PathBuf>,
    },

    /// Print the imports found in each source file.
    Inspect {
        /// Print JSON instead of one line per import.
        #[arg(long)]
        json: bool,
    },
}

// =============================================================================
// INITIALIZATION FUNCTIONS
// =============================================================================

/// Initializes the tracing subscriber.
///
/// `RUST_LOG` wins when set. Otherwise `--verbose` selects `debug`, and
/// `notify` is held at `warn`. Logs go to stderr so the manifest can be
/// piped from stdout.
fn init_tracing(verbose: bool, no_color: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { "info" };
        EnvFilter::new(format!("{level},notify=warn,ignore=warn"))
    });

    let use_ansi = !no_color && std::env::var("NO_COLOR").is_err();

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(use_ansi)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

/// Loads the project config from `--config` or by discovery.
fn load_config(cli: &Cli) -> color_eyre::Result<ProjectConfig> {
    let config = match &cli.config {
        Some(path) => ProjectConfig::load(path)?,
        None => ProjectConfig::discover(&cli.project)?,
    };
    Ok(config)
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

/// Runs a single build.
fn run_build(cli: &Cli, output: Option<&Utf8Path>) -> color_eyre::Result<()> {
    let mut pipeline = Pipeline::new(&cli.project, load_config(cli)?, true)?;
    info!(project = %pipeline.root(), "Starting build");

    let manifest = pipeline.build()?;
    match output {
        Some(path) => write_manifest(&manifest, path)?,
        None => {
            let stdout = std::io::stdout();
            let mut handle = stdout.lock();
            writeln!(handle, "{}", render_manifest(&manifest)?)?;
        }
    }
    Ok(())
}

/// Builds, then rebuilds on every debounced change until interrupted.
///
/// A `package.json` change reloads cached manifests before rebuilding. Build
/// errors are logged and watching continues, so fixing the offending file
/// recovers.
async fn run_watch(cli: &Cli, output: Option<Utf8PathBuf>) -> color_eyre::Result<()> {
    let config = load_config(cli)?;
    let watch_config = config.watch;
    let mut pipeline = Pipeline::new(&cli.project, config, true)?;
    let output = output.unwrap_or_else(|| pipeline.output_dir().join("manifest.json"));

    rebuild(&mut pipeline, &output);

    loop {
        let filter = CompositeFilter::new()
            .with(SourceFilter::new(&pipeline.config().extensions))
            .with(ExcludeDirFilter::new([pipeline.output_dir()]));
        let mut watcher = FileWatcher::new(&pipeline.watch_paths(), &watch_config, filter).await?;
        info!(paths = watcher.paths().len(), "Watching for changes");

        let restart = loop {
            tokio::select! {
                batch = watcher.recv() => {
                    let Some(batch) = batch else {
                        return Err(eyre!("file watcher stopped unexpectedly"));
                    };
                    info!(changes = batch.unique_paths().len(), "Change detected");

                    let mut restart = false;
                    if batch.touches_manifest() {
                        match pipeline.reload_manifests() {
                            Ok(changed) => restart = changed,
                            Err(err) => error!("{err:#}"),
                        }
                    }
                    rebuild(&mut pipeline, &output);
                    if restart {
                        break true;
                    }
                }
                _ = shutdown_signal() => break false,
            }
        };

        watcher.shutdown().await?;
        if !restart {
            info!("Shutting down");
            return Ok(());
        }
        info!("Watched dependencies changed, restarting watcher");
    }
}

/// Runs a build and writes the manifest, logging instead of failing.
fn rebuild(pipeline: &mut Pipeline, output: &Utf8Path) {
    let result = pipeline
        .build()
        .and_then(|manifest| write_manifest(&manifest, output));
    if let Err(err) = result {
        error!("{err:#}");
    }
}

/// Resolves on Ctrl-C or, on unix, SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {}
                _ = sigterm.recv() => {}
            }
            return;
        }
    }
    let _ = tokio::signal::ctrl_c().await;
}

/// Analyzes every tree and prints what each file imports.
fn run_inspect(cli: &Cli, json: bool) -> color_eyre::Result<()> {
    let mut pipeline = Pipeline::new(&cli.project, load_config(cli)?, false)?;
    pipeline.build()?;

    let stdout = std::io::stdout();
    let mut handle = stdout.lock();

    if json {
        #[derive(serde::Serialize)]
        struct FileImports<'a> {
            file: Utf8PathBuf,
            imports: &'a [Import],
        }

        let files: Vec<FileImports<'_>> = pipeline
            .files()
            .map(|(input, path, imports)| FileImports {
                file: input.join(path),
                imports,
            })
            .collect();
        let text = serde_json::to_string_pretty(&files)
            .wrap_err("Failed to serialize imports")?;
        writeln!(handle, "{text}")?;
        return Ok(());
    }

    for (input, path, imports) in pipeline.files() {
        let file = input.join(path);
        for import in imports {
            writeln!(handle, "{file}:{}  {}", import.location(), describe(import))?;
        }
    }
    Ok(())
}

// =============================================================================
// OUTPUT HELPERS
// =============================================================================

/// One-line summary of an import, e.g. `dynamic  lodash` or
/// ``static  `chart.js/${x}` ``.
fn describe(import: &Import) -> String {
    let kind = if import.is_dynamic() { "dynamic" } else { "static" };
    match import {
        Import::Literal(literal) => format!("{kind}  {}", literal.specifier),
        Import::Template(template) => {
            format!("{kind}  `{}`", template.cooked_quasis.join("${…}"))
        }
    }
}

fn render_manifest(manifest: &DependencyManifest) -> color_eyre::Result<String> {
    serde_json::to_string_pretty(manifest).wrap_err("Failed to serialize manifest")
}

/// Writes the manifest, creating parent directories.
fn write_manifest(manifest: &DependencyManifest, path: &Utf8Path) -> color_eyre::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .wrap_err_with(|| format!("Failed to create {parent}"))?;
    }
    std::fs::write(path, render_manifest(manifest)?)
        .wrap_err_with(|| format!("Failed to write {path}"))?;
    info!(path = %path, "Manifest written");
    Ok(())
}

// =============================================================================
// MAIN ENTRY POINT
// =============================================================================

/// Application entry point.
#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    // Install color-eyre before anything can panic.
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.no_color);

    match &cli.command {
        Commands::Build { output } => run_build(&cli, output.as_deref()),
        Commands::Watch { output } => run_watch(&cli, output.clone()).await,
        Commands::Inspect { json } => run_inspect(&cli, *json),
    }
}
