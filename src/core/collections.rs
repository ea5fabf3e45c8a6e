//! Observable views over a manager's source list and property bag.

use super::manager::{ConfigurationManager, SharedSource};
use crate::error::{ConfigError, Result};
use crate::sources::ConfigurationSource;
use std::collections::BTreeMap;
use std::sync::Arc;

/// The ordered source list of a [`ConfigurationManager`].
///
/// Position is precedence: later sources override earlier ones. Appending
/// with [`add`](Self::add) builds only the new provider; every other
/// mutation rebuilds all providers before it returns.
///
/// # Examples
///
/// ```rust
/// use layered_config::prelude::*;
/// use std::sync::Arc;
///
/// # fn example() -> Result<()> {
/// let config = ConfigurationManager::new();
/// let defaults: Arc<dyn ConfigurationSource> = Arc::new(MemorySource::new([("mode", "default")]));
/// config.sources().add_shared(Arc::clone(&defaults))?;
/// config.sources().add(MemorySource::new([("mode", "override")]))?;
///
/// // Move the defaults to the top of the stack.
/// config.sources().remove(&defaults)?;
/// config.sources().add_shared(defaults)?;
/// assert_eq!(config.get("mode").as_deref(), Some("default"));
/// # Ok(())
/// # }
/// ```
pub struct Sources<'a> {
    manager: &'a ConfigurationManager,
}

impl<'a> Sources<'a> {
    pub(crate) fn new(manager: &'a ConfigurationManager) -> Self {
        Self { manager }
    }

    /// Append a source. Only the new provider is built.
    pub fn add<S>(&self, source: S) -> Result<()>
    where
        S: ConfigurationSource + 'static,
    {
        self.manager.append(Arc::new(source))
    }

    /// Append a shared source. Only the new provider is built.
    pub fn add_shared(&self, source: Arc<dyn ConfigurationSource>) -> Result<()> {
        self.manager.append(source)
    }

    /// Insert a source at `index`, shifting later ones up.
    ///
    /// # Errors
    ///
    /// Fails if `index > len`, or if rebuilding a provider fails.
    pub fn insert(&self, index: usize, source: Arc<dyn ConfigurationSource>) -> Result<()> {
        self.manager.mutate(|sources, _| {
            if index > sources.len() {
                return Err(out_of_range(index, sources.len()));
            }
            sources.insert(index, source);
            Ok(((), true))
        })
    }

    /// Remove a source by identity. Returns whether it was present.
    ///
    /// Nothing is rebuilt when the source is not in the list.
    pub fn remove(&self, source: &Arc<dyn ConfigurationSource>) -> Result<bool> {
        self.manager.mutate(|sources, _| {
            match sources.iter().position(|candidate| Arc::ptr_eq(candidate, source)) {
                Some(index) => {
                    sources.remove(index);
                    Ok((true, true))
                }
                None => Ok((false, false)),
            }
        })
    }

    /// Remove and return the source at `index`.
    pub fn remove_at(&self, index: usize) -> Result<Arc<dyn ConfigurationSource>> {
        self.manager.mutate(|sources, _| {
            if index >= sources.len() {
                return Err(out_of_range(index, sources.len()));
            }
            Ok((sources.remove(index), true))
        })
    }

    /// Replace the source at `index`, returning the previous one.
    pub fn set(&self, index: usize, source: Arc<dyn ConfigurationSource>) -> Result<Arc<dyn ConfigurationSource>> {
        self.manager.mutate(|sources, _| {
            let len = sources.len();
            let slot = sources.get_mut(index).ok_or_else(|| out_of_range(index, len))?;
            Ok((std::mem::replace(slot, source), true))
        })
    }

    /// Remove every source.
    pub fn clear(&self) -> Result<()> {
        self.manager.mutate(|sources, _| {
            sources.clear();
            Ok(((), true))
        })
    }

    /// Number of sources.
    pub fn len(&self) -> usize {
        self.manager.read(|sources, _| sources.len())
    }

    /// Whether the list is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The source at `index`.
    pub fn get(&self, index: usize) -> Option<Arc<dyn ConfigurationSource>> {
        self.manager.read(|sources, _| sources.get(index).cloned())
    }

    /// Whether `source` is in the list.
    pub fn contains(&self, source: &Arc<dyn ConfigurationSource>) -> bool {
        self.manager
            .read(|sources, _| sources.iter().any(|candidate| Arc::ptr_eq(candidate, source)))
    }

    /// Snapshot of the list.
    pub fn to_vec(&self) -> Vec<Arc<dyn ConfigurationSource>> {
        self.manager.read(|sources, _| sources.to_vec())
    }
}

fn out_of_range(index: usize, len: usize) -> ConfigError {
    ConfigError::Other(format!("source index {} out of range for {} sources", index, len))
}

/// The property bag of a [`ConfigurationManager`].
///
/// Sources read it while building their providers (for example
/// [`BASE_PATH_PROPERTY`](crate::sources::BASE_PATH_PROPERTY)), so every
/// mutation rebuilds all providers. Values written with `set` on the
/// manager are lost by a rebuild.
pub struct Properties<'a> {
    manager: &'a ConfigurationManager,
}

impl<'a> Properties<'a> {
    pub(crate) fn new(manager: &'a ConfigurationManager) -> Self {
        Self { manager }
    }

    /// Look up a property.
    pub fn get(&self, key: &str) -> Option<String> {
        self.manager.read(|_, properties| properties.get(key).cloned())
    }

    /// Whether a property is set.
    pub fn contains_key(&self, key: &str) -> bool {
        self.manager.read(|_, properties| properties.contains_key(key))
    }

    /// Number of properties.
    pub fn len(&self) -> usize {
        self.manager.read(|_, properties| properties.len())
    }

    /// Whether the bag is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Property keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        self.manager.read(|_, properties| properties.keys().cloned().collect())
    }

    /// Set a property, returning the previous value.
    pub fn insert(&self, key: impl Into<String>, value: impl Into<String>) -> Result<Option<String>> {
        let (key, value) = (key.into(), value.into());
        self.manager
            .mutate(|_, properties| Ok((properties.insert(key, value), true)))
    }

    /// Remove a property. Nothing is rebuilt when it was not set.
    pub fn remove(&self, key: &str) -> Result<Option<String>> {
        self.manager.mutate(|_, properties| {
            let removed = properties.remove(key);
            let changed = removed.is_some();
            Ok((removed, changed))
        })
    }

    /// Remove every property.
    pub fn clear(&self) -> Result<()> {
        self.manager.mutate(|_, properties| {
            properties.clear();
            Ok(((), true))
        })
    }

    /// Snapshot of every property.
    pub fn snapshot(&self) -> BTreeMap<String, String> {
        self.manager.read(|_, properties| properties.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Configuration;
    use crate::sources::MemorySource;

    fn shared(data: &[(&str, &str)]) -> SharedSource {
        Arc::new(MemorySource::new(data.iter().copied()))
    }

    #[test]
    fn test_insert_changes_precedence() {
        let config = ConfigurationManager::new();
        config.sources().add_shared(shared(&[("k", "a")])).unwrap();
        config.sources().insert(0, shared(&[("k", "b")])).unwrap();
        assert_eq!(config.get("k").as_deref(), Some("a"));

        config.sources().insert(2, shared(&[("k", "c")])).unwrap();
        assert_eq!(config.get("k").as_deref(), Some("c"));
        assert_eq!(config.providers().len(), 3);
    }

    #[test]
    fn test_out_of_range_is_an_error() {
        let config = ConfigurationManager::new();
        assert!(config.sources().insert(1, shared(&[])).is_err());
        assert!(config.sources().remove_at(0).is_err());
        assert!(config.sources().set(0, shared(&[])).is_err());
        assert!(config.sources().is_empty());
    }

    #[test]
    fn test_remove_unknown_source_does_not_rebuild() {
        let config = ConfigurationManager::new();
        config.sources().add_shared(shared(&[("k", "v")])).unwrap();
        let token = config.reload_token();

        assert!(!config.sources().remove(&shared(&[])).unwrap());
        assert!(!token.has_changed());
    }

    #[test]
    fn test_set_and_clear() {
        let config = ConfigurationManager::new();
        let first = shared(&[("k", "1")]);
        config.sources().add_shared(Arc::clone(&first)).unwrap();

        let previous = config.sources().set(0, shared(&[("k", "2")])).unwrap();
        assert!(Arc::ptr_eq(&previous, &first));
        assert_eq!(config.get("k").as_deref(), Some("2"));

        config.sources().clear().unwrap();
        assert_eq!(config.get("k"), None);
        assert!(config.providers().is_empty());
    }

    #[test]
    fn test_property_change_rebuilds_and_drops_writes() {
        let config = ConfigurationManager::new();
        config.add_source(MemorySource::new([("k", "seed")])).unwrap();
        config.set("k", "written").unwrap();
        assert_eq!(config.get("k").as_deref(), Some("written"));

        let token = config.reload_token();
        config.properties().insert("Marker", "1").unwrap();

        assert!(token.has_changed());
        assert_eq!(config.get("k").as_deref(), Some("seed"));
        assert_eq!(config.properties().get("Marker").as_deref(), Some("1"));
    }

    #[test]
    fn test_property_remove_and_clear() {
        let config = ConfigurationManager::new();
        config.properties().insert("a", "1").unwrap();
        config.properties().insert("b", "2").unwrap();

        assert_eq!(config.properties().remove("a").unwrap().as_deref(), Some("1"));
        assert_eq!(config.properties().remove("a").unwrap(), None);
        assert_eq!(config.properties().keys(), vec!["b"]);

        config.properties().clear().unwrap();
        assert!(config.properties().is_empty());
    }
}
