//! Configuration traits and sections.

use super::binder;
use super::manager::ConfigurationManager;
use super::path;
use crate::error::{ConfigError, Result};
use crate::notify::ReloadToken;
use crate::sources::ConfigurationProvider;
use serde::de::DeserializeOwned;
use std::sync::Arc;

/// Read/write access to a tree of `:`-delimited configuration keys.
///
/// Implemented by [`ConfigurationManager`] (the root) and by
/// [`ConfigurationSection`] (a subtree of a root).
pub trait Configuration: Send + Sync {
    /// Look up a value. Keys are case-insensitive.
    fn get(&self, key: &str) -> Option<String>;

    /// Write a value through every provider.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoSourceRegistered`] if no provider is built.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// The subsection at `key`. Never fails; check [`ConfigurationSection::exists`].
    fn get_section(&self, key: &str) -> ConfigurationSection;

    /// Immediate children, sorted and case-insensitively unique.
    fn get_children(&self) -> Vec<ConfigurationSection>;

    /// Token that fires on the next change.
    fn reload_token(&self) -> ReloadToken;

    /// This configuration as a section, if it is one.
    fn as_section(&self) -> Option<ConfigurationSection> {
        None
    }

    /// Release resources. Only roots hold any.
    fn dispose(&self) {}
}

/// A configuration root: the provider list itself.
pub trait ConfigurationRoot: Configuration {
    /// Reload every provider, then notify.
    ///
    /// # Errors
    ///
    /// Propagates the first provider load failure.
    fn reload(&self) -> Result<()>;

    /// Snapshot of the built providers, lowest precedence first.
    fn providers(&self) -> Vec<Arc<dyn ConfigurationProvider>>;
}

/// A view on the subtree of a root below one path.
///
/// Sections do not copy data: every read goes through the root.
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
///
/// let server = config.get_section("Server");
/// assert_eq!(server.key(), "Server");
/// assert_eq!(server.get("port").as_deref(), Some("8080"));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ConfigurationSection {
    root: ConfigurationManager,
    path: String,
}

impl ConfigurationSection {
    pub(crate) fn new(root: ConfigurationManager, path: String) -> Self {
        Self { root, path }
    }

    /// Last segment of the path.
    pub fn key(&self) -> &str {
        path::section_key(&self.path)
    }

    /// Full path from the root.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Value stored at this path, if any.
    pub fn value(&self) -> Option<String> {
        self.root.get(&self.path)
    }

    /// Write the value at this path.
    pub fn set_value(&self, value: &str) -> Result<()> {
        self.root.set(&self.path, value)
    }

    /// Whether the section has a value or any children.
    pub fn exists(&self) -> bool {
        self.value().is_some() || !self.get_children().is_empty()
    }

    /// The root this section reads from.
    pub fn root(&self) -> &ConfigurationManager {
        &self.root
    }
}

impl Configuration for ConfigurationSection {
    fn get(&self, key: &str) -> Option<String> {
        self.root.get(&path::combine([self.path.as_str(), key]))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.root.set(&path::combine([self.path.as_str(), key]), value)
    }

    fn get_section(&self, key: &str) -> ConfigurationSection {
        self.root.get_section(&path::combine([self.path.as_str(), key]))
    }

    fn get_children(&self) -> Vec<ConfigurationSection> {
        self.root.children_of(Some(&self.path))
    }

    fn reload_token(&self) -> ReloadToken {
        self.root.reload_token()
    }

    fn as_section(&self) -> Option<ConfigurationSection> {
        Some(self.clone())
    }
}

impl std::fmt::Debug for ConfigurationSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConfigurationSection")
            .field("path", &self.path)
            .finish()
    }
}

/// Helpers available on every [`Configuration`].
pub trait ConfigurationExt: Configuration {
    /// Like [`Configuration::get_section`], but the section must exist.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::SectionNotFound`] if nothing is stored at or
    /// below `key`.
    fn get_required_section(&self, key: &str) -> Result<ConfigurationSection> {
        let section = self.get_section(key);
        if section.exists() {
            Ok(section)
        } else {
            Err(ConfigError::SectionNotFound(section.path().to_string()))
        }
    }

    /// Every path below this configuration with its value.
    ///
    /// Intermediate sections are included with the value stored at their
    /// path (usually `None`). With `make_paths_relative`, paths are relative
    /// to this section and the section itself is skipped.
    fn as_enumerable(&self, make_paths_relative: bool) -> Vec<(String, Option<String>)> {
        let start = self.as_section();
        let prefix_len = match (&start, make_paths_relative) {
            (Some(section), true) => section.path().len() + path::KEY_DELIMITER.len(),
            _ => 0,
        };

        let mut out = Vec::new();
        if let (Some(section), false) = (&start, make_paths_relative) {
            out.push((section.path().to_string(), section.value()));
        }

        let mut stack = self.get_children();
        stack.reverse();
        while let Some(section) = stack.pop() {
            let relative = section.path().get(prefix_len..).unwrap_or_default();
            out.push((relative.to_string(), section.value()));
            let mut children = section.get_children();
            children.reverse();
            stack.extend(children);
        }
        out
    }

    /// Deserialize this subtree into `T`.
    ///
    /// Keys are matched lowercased, children keyed `0..n` become sequences
    /// and string values are coerced to the requested scalar types.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::DeserializationError`] if the tree does not
    /// fit `T`.
    fn bind<T: DeserializeOwned>(&self) -> Result<T> {
        let value = binder::to_value(self.get_children(), self.as_section().and_then(|s| s.value()));
        value
            .try_deserialize()
            .map_err(|e| ConfigError::DeserializationError(e.to_string()))
    }
}

impl<C: Configuration + ?Sized> ConfigurationExt for C {}
