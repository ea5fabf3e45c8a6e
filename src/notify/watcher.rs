//! File watching for automatic provider reloads.

use crate::error::{ConfigError, Result};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::sleep;

/// Watches a single configuration file and invokes a callback when it changes.
///
/// Uses the `notify` crate on the file's parent directory, so editors that
/// replace the file atomically are still observed. Bursts of events are
/// debounced: the callback runs once, `debounce` after the first event of a
/// burst. The debounce task runs on the current Tokio runtime and ends when
/// the watcher is dropped.
///
/// # Examples
///
/// ```rust,no_run
/// use layered_config::notify::ConfigWatcher;
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let watcher = ConfigWatcher::watch("/etc/app/appsettings.json", Duration::from_millis(250), || {
///     println!("appsettings.json changed");
/// })?;
/// # drop(watcher);
/// # Ok(())
/// # }
/// ```
pub struct ConfigWatcher {
    _watcher: RecommendedWatcher,
    path: PathBuf,
    debounce_duration: Duration,
}

impl ConfigWatcher {
    /// Start watching `path`.
    ///
    /// The file itself does not need to exist yet, but its parent directory
    /// does.
    ///
    /// # Errors
    ///
    /// Returns an error if no Tokio runtime is active, if the parent
    /// directory cannot be resolved, or if the underlying watcher fails.
    pub fn watch<F>(path: impl AsRef<Path>, debounce_duration: Duration, on_change: F) -> Result<Self>
    where
        F: Fn() + Send + Sync + 'static,
    {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| ConfigError::WatchError("file watching requires a Tokio runtime".to_string()))?;

        let path = path.as_ref();
        let file_name = path
            .file_name()
            .map(|name| name.to_os_string())
            .ok_or_else(|| ConfigError::WatchError(format!("Not a file path: {}", path.display())))?;
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let directory = parent
            .canonicalize()
            .map_err(|e| ConfigError::WatchError(format!("Failed to resolve path: {}", e)))?;

        // Channel for raw events from notify
        let (event_tx, mut event_rx) = mpsc::unbounded_channel::<Event>();

        let watched_name = file_name.clone();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            if let Ok(event) = res {
                let relevant = matches!(
                    event.kind,
                    notify::EventKind::Modify(_) | notify::EventKind::Create(_) | notify::EventKind::Remove(_)
                ) && event
                    .paths
                    .iter()
                    .any(|p| p.file_name() == Some(watched_name.as_os_str()));
                if relevant {
                    let _ = event_tx.send(event);
                }
            }
        })
        .map_err(|e| ConfigError::WatchError(format!("Failed to create file watcher: {}", e)))?;

        watcher
            .watch(&directory, RecursiveMode::NonRecursive)
            .map_err(|e| ConfigError::WatchError(format!("Failed to watch path: {}", e)))?;

        let debounce = debounce_duration;
        runtime.spawn(async move {
            while event_rx.recv().await.is_some() {
                sleep(debounce).await;
                while event_rx.try_recv().is_ok() {}
                on_change();
            }
        });

        Ok(Self {
            _watcher: watcher,
            path: directory.join(file_name),
            debounce_duration,
        })
    }

    /// The resolved path being watched.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Get the debounce duration for this watcher.
    pub fn debounce_duration(&self) -> Duration {
        self.debounce_duration
    }
}
