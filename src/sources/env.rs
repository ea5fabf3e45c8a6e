//! Environment variable configuration source.

use super::{BuildContext, ConfigurationProvider, ConfigurationSource, ProviderData};
use crate::core::path;
use crate::error::Result;
use crate::notify::ReloadToken;
use config::{Environment, Source as _};
use std::collections::HashMap;
use std::sync::Arc;

/// Environment variable configuration source.
///
/// Loads variables that start with `prefix_`, strips the prefix and maps the
/// `__` separator onto the `:` key delimiter. Only the separator creates
/// hierarchy: a variable named `A.B` stays the single key `a.b`.
///
/// # Examples
///
/// ```rust
/// use layered_config::sources::EnvSource;
///
/// // APP_SERVER__PORT=8080 -> server:port = 8080
/// let source = EnvSource::new("APP");
/// ```
#[derive(Debug, Clone)]
pub struct EnvSource {
    prefix: Option<String>,
    separator: String,
    vars: Option<HashMap<String, String>>,
}

impl EnvSource {
    /// Create a source reading variables that start with `prefix_`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use layered_config::sources::EnvSource;
    ///
    /// // Matches: APP_SERVER__PORT, APP_DB__HOST, etc.
    /// let source = EnvSource::new("APP");
    /// ```
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
            separator: "__".to_string(),
            vars: None,
        }
    }

    /// Create a source reading every environment variable.
    pub fn unprefixed() -> Self {
        Self {
            prefix: None,
            separator: "__".to_string(),
            vars: None,
        }
    }

    /// Set the separator between hierarchy levels (default `__`).
    pub fn with_separator(mut self, separator: impl Into<String>) -> Self {
        self.separator = separator.into();
        self
    }

    /// Read from `vars` instead of the process environment.
    pub fn with_vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.vars = Some(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }
}

impl ConfigurationSource for EnvSource {
    fn build(&self, _context: &BuildContext<'_>) -> Result<Arc<dyn ConfigurationProvider>> {
        Ok(Arc::new(EnvProvider {
            source: self.clone(),
            data: ProviderData::new(),
        }))
    }

    fn name(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("env:{}_*", prefix),
            None => "env:*".to_string(),
        }
    }
}

/// Provider snapshotting environment variables on every load.
pub struct EnvProvider {
    source: EnvSource,
    data: ProviderData,
}

impl ConfigurationProvider for EnvProvider {
    fn load(&self) -> Result<()> {
        // No separator here: the Environment source would report nesting with
        // '.', which a variable name may contain literally.
        let mut environment = Environment::default();
        if let Some(prefix) = &self.source.prefix {
            environment = environment.prefix(prefix).prefix_separator("_");
        }
        if let Some(vars) = &self.source.vars {
            environment = environment.source(Some(vars.iter().map(|(k, v)| (k.clone(), v.clone())).collect()));
        }

        let values = environment.collect()?;

        let separator = self.source.separator.to_lowercase();
        let entries = values.into_iter().map(|(key, value)| {
            let key = if separator.is_empty() {
                key
            } else {
                path::combine(key.split(separator.as_str()))
            };
            (key, value.into_string().unwrap_or_default())
        });
        self.data.replace(entries);
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
        self.source.name()
    }
}
