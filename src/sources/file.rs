//! File-based configuration source.

use super::config_source::flatten_value;
use super::{BuildContext, ConfigurationProvider, ConfigurationSource, ProviderData};
use crate::error::{ConfigError, Result};
use crate::notify::ReloadToken;
use config::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[cfg(feature = "file-watch")]
use crate::notify::ConfigWatcher;
#[cfg(feature = "file-watch")]
use parking_lot::Mutex;

/// File-based configuration source.
///
/// Loads configuration from YAML, TOML, or JSON files with automatic format
/// detection based on file extension. Nested tables become `:`-delimited
/// keys and array items are keyed by index. Relative paths are resolved
/// against the `BasePath` property of the owning manager.
///
/// # Examples
///
/// ```rust,no_run
/// use layered_config::sources::FileSource;
///
/// let source = FileSource::new("appsettings.json")
///     .optional(true)
///     .reload_on_change(true);
/// ```
#[derive(Debug, Clone)]
pub struct FileSource {
    path: PathBuf,
    optional: bool,
    reload_on_change: bool,
    debounce: Duration,
}

impl FileSource {
    /// Create a new, required file source.
    ///
    /// The format is detected from the file extension:
    /// - `.yaml`, `.yml` -> YAML
    /// - `.toml` -> TOML
    /// - `.json` -> JSON
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            optional: false,
            reload_on_change: false,
            debounce: Duration::from_millis(250),
        }
    }

    /// Whether a missing file is allowed (it then contributes no keys).
    pub fn optional(mut self, optional: bool) -> Self {
        self.optional = optional;
        self
    }

    /// Reload the provider when the file changes on disk.
    ///
    /// Requires the `file-watch` feature and a Tokio runtime at build time.
    pub fn reload_on_change(mut self, reload_on_change: bool) -> Self {
        self.reload_on_change = reload_on_change;
        self
    }

    /// Minimum quiet period before a change triggers a reload (default: 250ms).
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Validate that the file extension is supported.
    fn validate_extension(&self) -> Result<()> {
        let extension = self
            .path
            .extension()
            .and_then(|ext| ext.to_str())
            .ok_or_else(|| {
                ConfigError::LoadError(format!(
                    "Unable to determine file format for: {}",
                    self.path.display()
                ))
            })?;

        match extension {
            "yaml" | "yml" | "toml" | "json" => Ok(()),
            _ => Err(ConfigError::LoadError(format!(
                "Unsupported file extension: {}. Supported: .yaml, .yml, .toml, .json",
                extension
            ))),
        }
    }

    fn resolve(&self, context: &BuildContext<'_>) -> PathBuf {
        match context.base_path() {
            Some(base) if self.path.is_relative() => base.join(&self.path),
            _ => self.path.clone(),
        }
    }
}

impl ConfigurationSource for FileSource {
    fn build(&self, context: &BuildContext<'_>) -> Result<Arc<dyn ConfigurationProvider>> {
        self.validate_extension()?;

        let provider = Arc::new(FileProvider {
            state: Arc::new(FileState {
                path: self.resolve(context),
                optional: self.optional,
                data: ProviderData::new(),
            }),
            #[cfg(feature = "file-watch")]
            watcher: Mutex::new(None),
        });

        if self.reload_on_change {
            provider.start_watching(self.debounce);
        }

        Ok(provider)
    }

    fn name(&self) -> String {
        format!("file:{}", self.path.display())
    }
}

struct FileState {
    path: PathBuf,
    optional: bool,
    data: ProviderData,
}

impl FileState {
    fn read(&self) -> Result<Vec<(String, String)>> {
        // Check if file exists
        if !self.path.exists() {
            if self.optional {
                return Ok(Vec::new());
            }
            return Err(ConfigError::LoadError(format!(
                "Configuration file not found: {}",
                self.path.display()
            )));
        }

        // Build a config using the config crate (auto-detects format from extension)
        let parsed = config::Config::builder()
            .add_source(File::from(self.path.as_path()).required(true))
            .build()
            .map_err(|e| ConfigError::ParseError(format!("{}: {}", self.path.display(), e)))?;

        let root = parsed.try_deserialize::<config::Map<String, config::Value>>()?;

        let mut entries = Vec::new();
        for (key, value) in root {
            flatten_value(Some(&key), value, &mut entries);
        }
        Ok(entries)
    }
}

/// Provider backed by a single file.
pub struct FileProvider {
    state: Arc<FileState>,
    #[cfg(feature = "file-watch")]
    watcher: Mutex<Option<ConfigWatcher>>,
}

impl FileProvider {
    /// The resolved path of the backing file.
    pub fn path(&self) -> &Path {
        &self.state.path
    }

    #[cfg(feature = "file-watch")]
    fn start_watching(&self, debounce: Duration) {
        let state = Arc::downgrade(&self.state);
        let watched = ConfigWatcher::watch(&self.state.path, debounce, move || {
            let Some(state) = state.upgrade() else {
                return;
            };
            match state.read() {
                Ok(entries) => {
                    state.data.replace(entries);
                    tracing::debug!(path = %state.path.display(), "configuration file reloaded");
                    state.data.on_reload();
                }
                Err(error) => {
                    // Keep serving the last good contents.
                    tracing::warn!(path = %state.path.display(), %error, "failed to reload configuration file");
                }
            }
        });

        match watched {
            Ok(watcher) => *self.watcher.lock() = Some(watcher),
            Err(error) => {
                tracing::warn!(path = %self.state.path.display(), %error, "reload_on_change disabled for file source");
            }
        }
    }

    #[cfg(not(feature = "file-watch"))]
    fn start_watching(&self, _debounce: Duration) {
        tracing::warn!(
            path = %self.state.path.display(),
            "reload_on_change requires the file-watch feature"
        );
    }
}

impl ConfigurationProvider for FileProvider {
    fn load(&self) -> Result<()> {
        let entries = self.state.read()?;
        self.state.data.replace(entries);
        Ok(())
    }

    fn try_get(&self, key: &str) -> Option<String> {
        self.state.data.try_get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.state.data.set(key, value);
        Ok(())
    }

    fn child_keys(&self, earlier_keys: Vec<String>, parent_path: Option<&str>) -> Vec<String> {
        self.state.data.child_keys(earlier_keys, parent_path)
    }

    fn reload_token(&self) -> Option<ReloadToken> {
        Some(self.state.data.reload_token())
    }

    fn dispose(&self) {
        #[cfg(feature = "file-watch")]
        self.watcher.lock().take();
    }

    fn name(&self) -> String {
        format!("file:{}", self.state.path.display())
    }
}
