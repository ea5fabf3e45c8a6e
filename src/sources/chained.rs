//! Sources that layer existing configurations and providers.

use super::{BuildContext, ConfigurationProvider, ConfigurationSource};
use crate::core::{Configuration, path};
use crate::error::Result;
use crate::notify::ReloadToken;
use std::sync::Arc;

/// Layers another configuration (a root or a section) as a provider.
///
/// Reads and writes go straight through to the chained configuration and
/// its reload token is forwarded, so changes there reach the owner.
///
/// # Examples
///
/// ```rust
/// use layered_config::prelude::*;
/// use std::sync::Arc;
///
/// # fn example() -> Result<()> {
/// let host = ConfigurationManager::new();
/// host.add_source(MemorySource::new([("environment", "Staging")]))?;
///
/// let app = ConfigurationManager::new();
/// app.add_source(ChainedSource::new(Arc::new(host.clone())))?;
/// assert_eq!(app.get("environment").as_deref(), Some("Staging"));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ChainedSource {
    configuration: Arc<dyn Configuration>,
    should_dispose: bool,
}

impl ChainedSource {
    /// Chain `configuration` without taking ownership of its lifetime.
    pub fn new(configuration: Arc<dyn Configuration>) -> Self {
        Self {
            configuration,
            should_dispose: false,
        }
    }

    /// Dispose the chained configuration when the provider is disposed.
    pub fn should_dispose(mut self, should_dispose: bool) -> Self {
        self.should_dispose = should_dispose;
        self
    }

    /// The chained configuration.
    pub fn configuration(&self) -> &Arc<dyn Configuration> {
        &self.configuration
    }
}

impl ConfigurationSource for ChainedSource {
    fn build(&self, _context: &BuildContext<'_>) -> Result<Arc<dyn ConfigurationProvider>> {
        Ok(Arc::new(ChainedProvider {
            configuration: Arc::clone(&self.configuration),
            should_dispose: self.should_dispose,
        }))
    }

    fn name(&self) -> String {
        "chained".to_string()
    }
}

/// Provider that reads through to another configuration.
pub struct ChainedProvider {
    configuration: Arc<dyn Configuration>,
    should_dispose: bool,
}

impl ChainedProvider {
    /// The chained configuration.
    pub fn configuration(&self) -> &Arc<dyn Configuration> {
        &self.configuration
    }
}

impl ConfigurationProvider for ChainedProvider {
    fn load(&self) -> Result<()> {
        Ok(())
    }

    fn try_get(&self, key: &str) -> Option<String> {
        self.configuration.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.configuration.set(key, value)
    }

    fn child_keys(&self, earlier_keys: Vec<String>, parent_path: Option<&str>) -> Vec<String> {
        let children = match parent_path {
            None => self.configuration.get_children(),
            Some(parent) => self.configuration.get_section(parent).get_children(),
        };
        let mut keys: Vec<String> = children.iter().map(|section| section.key().to_string()).collect();
        keys.extend(earlier_keys);
        keys.sort_by(|a, b| path::compare_keys(a, b));
        keys
    }

    fn reload_token(&self) -> Option<ReloadToken> {
        Some(self.configuration.reload_token())
    }

    fn dispose(&self) {
        if self.should_dispose {
            self.configuration.dispose();
        }
    }

    fn name(&self) -> String {
        "chained".to_string()
    }
}

/// Adds an already-built provider. Every build returns that same provider.
#[derive(Clone)]
pub struct ProviderSource {
    provider: Arc<dyn ConfigurationProvider>,
}

impl ProviderSource {
    /// Wrap `provider`.
    pub fn new(provider: Arc<dyn ConfigurationProvider>) -> Self {
        Self { provider }
    }
}

impl ConfigurationSource for ProviderSource {
    fn build(&self, _context: &BuildContext<'_>) -> Result<Arc<dyn ConfigurationProvider>> {
        Ok(Arc::clone(&self.provider))
    }

    fn name(&self) -> String {
        format!("provider:{}", self.provider.name())
    }
}
