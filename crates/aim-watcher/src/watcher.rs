//! Debounced watching of source trees and package manifests.
//!
//! `notify` is synchronous, so the debouncer runs on a blocking thread and
//! forwards each debounce window as one [`FileEventBatch`] over a bounded
//! tokio channel.
//!
//! ```text
//!  spawn_blocking                               tokio
//! ┌──────────────────────────────────────┐     ┌─────────────────────┐
//! │ RecommendedWatcher -> Debouncer ->   │     │ FileWatcher::recv() │
//! │ callback (filter, batch)             │ --> │  -> rebuild         │
//! └──────────────────────────────────────┘     └─────────────────────┘
//!                            blocking_send
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use aim_core::WatchConfig;
//! use aim_watcher::{FileWatcher, SourceFilter, WatchPath};
//!
//! # async fn example() -> Result<(), aim_watcher::WatchError> {
//! let paths = [
//!     WatchPath::recursive("/work/my-app/app"),
//!     WatchPath::shallow("/work/my-app"),
//! ];
//! let filter = SourceFilter::new(["js", "ts"]);
//! let mut watcher = FileWatcher::new(&paths, &WatchConfig::default(), filter).await?;
//!
//! while let Some(batch) = watcher.recv().await {
//!     println!("{} changes, manifest: {}", batch.len(), batch.touches_manifest());
//! }
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use camino::{Utf8Path, Utf8PathBuf};
use notify::RecursiveMode;
use notify_debouncer_mini::{DebounceEventResult, Debouncer, new_debouncer};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use aim_core::WatchConfig;

use crate::error::WatchError;
use crate::events::{FileEvent, FileEventBatch};
use crate::filter::FileFilter;

/// Default channel capacity, in batches.
const DEFAULT_CHANNEL_CAPACITY: usize = 32;

/// A path to watch and how deep.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchPath {
    /// File or directory to watch.
    pub path: Utf8PathBuf,

    /// Whether subdirectories are watched too.
    pub recursive: bool,
}

impl WatchPath {
    /// Watches `path` and everything below it.
    #[must_use]
    pub fn recursive(path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            path: path.into(),
            recursive: true,
        }
    }

    /// Watches only the direct entries of `path`.
    ///
    /// Watching a package root this way catches `package.json` edits,
    /// including editors that save by rename, without descending into
    /// `node_modules`.
    #[must_use]
    pub fn shallow(path: impl Into<Utf8PathBuf>) -> Self {
        Self {
            path: path.into(),
            recursive: false,
        }
    }
}

/// A running watcher that streams debounced change batches.
///
/// Dropping the watcher signals the blocking thread to stop; call
/// [`shutdown`](Self::shutdown) to also wait for it.
pub struct FileWatcher {
    /// Cleared once shutdown has been requested.
    shutdown_tx: Option<oneshot::Sender<()>>,

    task_handle: Option<JoinHandle<Result<(), WatchError>>>,

    event_rx: mpsc::Receiver<FileEventBatch>,

    /// Canonicalized watch targets.
    paths: Vec<WatchPath>,
}

impl std::fmt::Debug for FileWatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileWatcher")
            .field("paths", &self.paths)
            .field("is_running", &self.is_running())
            .finish_non_exhaustive()
    }
}

impl FileWatcher {
    /// Starts watching `paths`.
    ///
    /// When `config.recursive` is false every path is watched shallowly,
    /// whatever its own setting.
    ///
    /// # Errors
    ///
    /// Returns [`WatchError::NothingToWatch`] for an empty list,
    /// [`WatchError::PathNotFound`] if any path is missing, and
    /// [`WatchError::Io`] if a path cannot be canonicalized. Failures to
    /// register with the OS surface from [`shutdown`](Self::shutdown).
    #[allow(clippy::unused_async)] // Async for API consistency with shutdown()
    pub async fn new<F: FileFilter>(
        paths: &[WatchPath],
        config: &WatchConfig,
        filter: F,
    ) -> Result<Self, WatchError> {
        Self::with_capacity(paths, config, filter, DEFAULT_CHANNEL_CAPACITY).await
    }

    /// Like [`new`](Self::new) with an explicit channel capacity.
    ///
    /// # Errors
    ///
    /// See [`new`](Self::new).
    #[allow(clippy::unused_async)]
    pub async fn with_capacity<F: FileFilter>(
        paths: &[WatchPath],
        config: &WatchConfig,
        filter: F,
        channel_capacity: usize,
    ) -> Result<Self, WatchError> {
        if paths.is_empty() {
            return Err(WatchError::NothingToWatch);
        }

        let paths = paths
            .iter()
            .map(|target| {
                if !target.path.exists() {
                    return Err(WatchError::path_not_found(target.path.clone()));
                }
                Ok(WatchPath {
                    path: target.path.canonicalize_utf8()?,
                    recursive: target.recursive && config.recursive,
                })
            })
            .collect::<Result<Vec<_>, WatchError>>()?;

        let (event_tx, event_rx) = mpsc::channel(channel_capacity.max(1));
        let (shutdown_tx, shutdown_rx) = oneshot::channel();

        let task_paths = paths.clone();
        let debounce = Duration::from_millis(config.debounce_ms);
        let task_handle = tokio::task::spawn_blocking(move || {
            run_watcher_loop(&task_paths, debounce, event_tx, shutdown_rx, filter)
        });

        Ok(Self {
            shutdown_tx: Some(shutdown_tx),
            task_handle: Some(task_handle),
            event_rx,
            paths,
        })
    }

    /// Waits for the next batch. `None` once the watcher has stopped.
    pub async fn recv(&mut self) -> Option<FileEventBatch> {
        self.event_rx.recv().await
    }

    /// Takes a batch if one is ready.
    ///
    /// # Errors
    ///
    /// [`mpsc::error::TryRecvError::Empty`] when nothing is queued,
    /// `Disconnected` once the watcher has stopped.
    pub fn try_recv(&mut self) -> Result<FileEventBatch, mpsc::error::TryRecvError> {
        self.event_rx.try_recv()
    }

    /// The receiver, for use in `tokio::select!`.
    pub fn events(&mut self) -> &mut mpsc::Receiver<FileEventBatch> {
        &mut self.event_rx
    }

    /// The canonicalized watch targets.
    #[must_use]
    pub fn paths(&self) -> &[WatchPath] {
        &self.paths
    }

    /// Whether `path` lies under one of the watch targets.
    #[must_use]
    pub fn covers(&self, path: &Utf8Path) -> bool {
        self.paths.iter().any(|target| path.starts_with(&target.path))
    }

    /// Whether the watcher thread is still running.
    #[must_use]
    pub fn is_running(&self) -> bool {
        self.shutdown_tx.is_some() && self.task_handle.as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Stops the watcher thread and waits for it.
    ///
    /// # Errors
    ///
    /// Returns the thread's own error, e.g. a [`WatchError::Notify`] from
    /// registering a path, or [`WatchError::ChannelClosed`] if it panicked.
    pub async fn shutdown(mut self) -> Result<(), WatchError> {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }

        if let Some(handle) = self.task_handle.take() {
            match handle.await {
                Ok(result) => result?,
                Err(_join_error) => return Err(WatchError::ChannelClosed),
            }
        }

        Ok(())
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

/// Runs the debouncer on the blocking pool until shutdown.
fn run_watcher_loop<F: FileFilter>(
    paths: &[WatchPath],
    debounce: Duration,
    event_tx: mpsc::Sender<FileEventBatch>,
    shutdown_rx: oneshot::Receiver<()>,
    filter: F,
) -> Result<(), WatchError> {
    let tx = event_tx;
    let debouncer_result: Result<Debouncer<notify::RecommendedWatcher>, notify::Error> =
        new_debouncer(debounce, move |res: DebounceEventResult| match res {
            Ok(events) => {
                let batch: FileEventBatch = events
                    .into_iter()
                    .filter_map(|event| match Utf8PathBuf::try_from(event.path) {
                        Ok(path) => Some(path),
                        Err(e) => {
                            tracing::warn!(
                                path = %e.into_path_buf().display(),
                                "Skipping non-UTF-8 path in file event"
                            );
                            None
                        }
                    })
                    .filter(|path| {
                        let keep = filter.should_process(path);
                        if !keep {
                            tracing::trace!(path = %path, "Filtered out file event");
                        }
                        keep
                    })
                    .map(FileEvent::new)
                    .collect();

                if batch.is_empty() {
                    return;
                }
                tracing::debug!(events = batch.len(), "Forwarding change batch");
                if tx.blocking_send(batch).is_err() {
                    tracing::debug!("Event channel closed, dropping batch");
                }
            }
            Err(error) => tracing::warn!(error = %error, "Debouncer error"),
        });

    let mut debouncer = debouncer_result?;

    for target in paths {
        let mode = if target.recursive {
            RecursiveMode::Recursive
        } else {
            RecursiveMode::NonRecursive
        };
        debouncer.watcher().watch(target.path.as_std_path(), mode)?;
        tracing::info!(path = %target.path, recursive = target.recursive, "Watching");
    }

    let _ = shutdown_rx.blocking_recv();

    tracing::info!(paths = paths.len(), "File watcher stopped");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{AcceptAllFilter, SourceFilter};
    use std::fs;
    use tempfile::TempDir;

    fn temp_root() -> (TempDir, Utf8PathBuf) {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).expect("Invalid path");
        (dir, root)
    }

    fn fast() -> WatchConfig {
        WatchConfig {
            debounce_ms: 50,
            recursive: true,
        }
    }

    #[tokio::test]
    async fn test_watcher_creation() {
        let (_dir, root) = temp_root();
        fs::create_dir(root.join("app")).unwrap();

        let paths = [WatchPath::recursive(root.join("app")), WatchPath::shallow(&root)];
        let watcher = FileWatcher::new(&paths, &WatchConfig::default(), AcceptAllFilter)
            .await
            .expect("Watcher should be created");

        assert!(watcher.is_running());
        assert_eq!(watcher.paths().len(), 2);
        assert!(watcher.paths()[0].recursive);
        assert!(!watcher.paths()[1].recursive);
        watcher.shutdown().await.expect("Shutdown failed");
    }

    #[tokio::test]
    async fn test_config_forces_shallow() {
        let (_dir, root) = temp_root();
        let config = WatchConfig {
            debounce_ms: 50,
            recursive: false,
        };

        let watcher = FileWatcher::new(&[WatchPath::recursive(&root)], &config, AcceptAllFilter)
            .await
            .unwrap();
        assert!(!watcher.paths()[0].recursive);
    }

    #[tokio::test]
    async fn test_path_not_found() {
        let (_dir, root) = temp_root();
        let paths = [WatchPath::recursive(&root), WatchPath::recursive(root.join("missing"))];

        let result = FileWatcher::new(&paths, &WatchConfig::default(), AcceptAllFilter).await;
        match result {
            Err(WatchError::PathNotFound(path)) => assert!(path.ends_with("missing")),
            other => panic!("Expected PathNotFound, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_nothing_to_watch() {
        let result = FileWatcher::new(&[], &WatchConfig::default(), AcceptAllFilter).await;
        assert!(matches!(result, Err(WatchError::NothingToWatch)));
    }

    #[tokio::test]
    async fn test_covers() {
        let (_dir, root) = temp_root();
        fs::create_dir(root.join("app")).unwrap();
        let watcher = FileWatcher::new(
            &[WatchPath::recursive(root.join("app"))],
            &WatchConfig::default(),
            AcceptAllFilter,
        )
        .await
        .unwrap();

        let app = root.join("app").canonicalize_utf8().unwrap();
        assert!(watcher.covers(&app.join("routes/index.js")));
        assert!(!watcher.covers(Utf8Path::new("/elsewhere/index.js")));
    }

    #[tokio::test]
    async fn test_watcher_receives_batches() {
        let (_dir, root) = temp_root();
        let mut watcher = FileWatcher::new(
            &[WatchPath::recursive(&root)],
            &fast(),
            SourceFilter::new(["js"]),
        )
        .await
        .expect("Failed to create watcher");

        // Give the thread a moment to register before writing.
        tokio::time::sleep(Duration::from_millis(100)).await;
        fs::write(root.join("ignored.css"), "a {}").unwrap();
        fs::write(root.join("index.js"), "import 'x';").unwrap();

        let batch = tokio::time::timeout(Duration::from_secs(2), watcher.recv()).await;
        watcher.shutdown().await.expect("Shutdown failed");

        // Timing-dependent on some CI filesystems.
        if let Ok(Some(batch)) = batch {
            assert!(!batch.is_empty());
            assert!(batch.iter().all(|event| event.path.extension() == Some("js")));
            assert!(!batch.touches_manifest());
        }
    }

    #[tokio::test]
    async fn test_try_recv_empty() {
        let (_dir, root) = temp_root();
        let mut watcher = FileWatcher::with_capacity(
            &[WatchPath::recursive(&root)],
            &WatchConfig::default(),
            AcceptAllFilter,
            4,
        )
        .await
        .unwrap();

        assert!(matches!(
            watcher.try_recv(),
            Err(mpsc::error::TryRecvError::Empty)
        ));
    }
}
