//! In-memory configuration source.

use super::{BuildContext, ConfigurationProvider, ConfigurationSource, ProviderData};
use crate::error::Result;
use crate::notify::ReloadToken;
use std::sync::Arc;

/// In-memory configuration source.
///
/// Every build produces a fresh provider seeded with the initial data, so
/// values written through the manager are lost when the providers are
/// rebuilt.
///
/// # Examples
///
/// ```rust
/// use layered_config::core::{Configuration, ConfigurationManager};
/// use layered_config::sources::MemorySource;
///
/// # fn example() -> layered_config::error::Result<()> {
/// let config = ConfigurationManager::new();
/// config.add_source(MemorySource::new([("Server:Port", "8080")]))?;
/// assert_eq!(config.get("server:port").as_deref(), Some("8080"));
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    initial_data: Vec<(String, String)>,
}

impl MemorySource {
    /// Create a source seeded with `initial_data`.
    pub fn new<I, K, V>(initial_data: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            initial_data: initial_data
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Create a source with no initial data.
    pub fn empty() -> Self {
        Self::default()
    }
}

impl ConfigurationSource for MemorySource {
    fn build(&self, _context: &BuildContext<'_>) -> Result<Arc<dyn ConfigurationProvider>> {
        Ok(Arc::new(MemoryProvider::new(self.initial_data.iter().cloned())))
    }

    fn name(&self) -> String {
        format!("memory:{} keys", self.initial_data.len())
    }
}

/// Provider holding key/values in memory.
///
/// `load` is a no-op: the data lives only in the provider.
pub struct MemoryProvider {
    data: ProviderData,
}

impl MemoryProvider {
    /// Create a provider holding `data`.
    pub fn new<I, K, V>(data: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            data: ProviderData::with_entries(data),
        }
    }

    /// Add or overwrite a value.
    pub fn add(&self, key: &str, value: &str) {
        self.data.set(key, value);
    }

    /// Snapshot of every `(key, value)` pair.
    pub fn entries(&self) -> Vec<(String, String)> {
        self.data.entries()
    }
}

impl ConfigurationProvider for MemoryProvider {
    fn load(&self) -> Result<()> {
        Ok(())
    }

    fn try_get(&self, key: &str) -> Option<String> {
        self.data.try_get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.data.set(key, value);
        Ok(())
    }

    fn child_keys(&self, earlier_keys: Vec<String>, parent_path: Option<&str>) -> Vec<String> {
        self.data.child_keys(earlier_keys, parent_path)
    }

    fn reload_token(&self) -> Option<ReloadToken> {
        Some(self.data.reload_token())
    }

    fn name(&self) -> String {
        "memory".to_string()
    }
}
