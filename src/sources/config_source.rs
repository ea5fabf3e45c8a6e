//! Configuration source and provider traits.

use crate::core::path;
use crate::error::Result;
use crate::notify::{ReloadToken, TokenState};
use arc_swap::ArcSwap;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

/// Property key consulted by file sources to resolve relative paths.
pub const BASE_PATH_PROPERTY: &str = "BasePath";

/// Side information handed to [`ConfigurationSource::build`].
///
/// Carries a snapshot of the owning manager's property bag, taken under the
/// manager's lock for the duration of the build.
pub struct BuildContext<'a> {
    properties: &'a BTreeMap<String, String>,
}

impl<'a> BuildContext<'a> {
    /// Create a context over a property snapshot.
    pub fn new(properties: &'a BTreeMap<String, String>) -> Self {
        Self { properties }
    }

    /// Look up a property by key.
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }

    /// All properties, ordered by key.
    pub fn properties(&self) -> &BTreeMap<String, String> {
        self.properties
    }

    /// The base path used to resolve relative file paths, if one was set.
    pub fn base_path(&self) -> Option<PathBuf> {
        self.property(BASE_PATH_PROPERTY).map(PathBuf::from)
    }
}

/// Trait for configuration sources.
///
/// A source is a descriptor ("this JSON file", "the process environment")
/// that produces a provider. Sources are kept in insertion order by the
/// manager and may be built more than once: every structural change to the
/// source list or property bag rebuilds every provider.
///
/// Implement this trait to create custom configuration sources (e.g., remote
/// APIs, databases, key-value stores).
pub trait ConfigurationSource: Send + Sync {
    /// Build a provider for this source.
    ///
    /// The returned provider is loaded by the manager right after it is built.
    ///
    /// # Errors
    ///
    /// Returns an error if the source is misconfigured.
    fn build(&self, context: &BuildContext<'_>) -> Result<Arc<dyn ConfigurationProvider>>;

    /// Get a human-readable name for this source (for logging/debugging).
    fn name(&self) -> String;
}

/// Trait for the materialized key/value state of one source.
///
/// Keys are `:`-delimited and compared case-insensitively. Providers are
/// shared between the manager and anything that built them, so every method
/// takes `&self` and implementations use interior mutability.
pub trait ConfigurationProvider: Send + Sync {
    /// Refresh the provider from its backing store.
    ///
    /// May be called repeatedly. After it returns, [`try_get`](Self::try_get)
    /// reflects the current state of the source.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read or parsed.
    fn load(&self) -> Result<()>;

    /// Look up a value by key.
    fn try_get(&self, key: &str) -> Option<String>;

    /// Write a value.
    ///
    /// # Errors
    ///
    /// Providers backed by another configuration propagate its errors.
    fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Immediate child keys below `parent_path`, merged with `earlier_keys`
    /// and sorted with [`path::compare_keys`].
    fn child_keys(&self, earlier_keys: Vec<String>, parent_path: Option<&str>) -> Vec<String>;

    /// Token that fires when the provider reloads on its own.
    fn reload_token(&self) -> Option<ReloadToken> {
        None
    }

    /// Release resources held by the provider.
    fn dispose(&self) {}

    /// Get a human-readable name for this provider (for logging/debugging).
    fn name(&self) -> String;
}

/// Case-insensitive key/value store with a swappable reload token.
///
/// Shared building block for the bundled providers.
pub struct ProviderData {
    // normalized key -> (key as written, value)
    entries: RwLock<BTreeMap<String, (String, String)>>,
    token: ArcSwap<TokenState>,
}

impl ProviderData {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(BTreeMap::new()),
            token: ArcSwap::from_pointee(TokenState::new()),
        }
    }

    /// Create a store holding `entries`.
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let data = Self::new();
        data.replace(entries);
        data
    }

    /// Look up a value by key.
    pub fn try_get(&self, key: &str) -> Option<String> {
        self.entries
            .read()
            .get(&path::normalize(key))
            .map(|(_, value)| value.clone())
    }

    /// Insert or overwrite a value.
    pub fn set(&self, key: &str, value: &str) {
        self.entries
            .write()
            .insert(path::normalize(key), (key.to_string(), value.to_string()));
    }

    /// Replace every entry. Later duplicates of a key win.
    pub fn replace<I, K, V>(&self, entries: I)
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut map = BTreeMap::new();
        for (key, value) in entries {
            let key = key.into();
            map.insert(path::normalize(&key), (key, value.into()));
        }
        *self.entries.write() = map;
    }

    /// Snapshot of every `(key, value)` pair.
    pub fn entries(&self) -> Vec<(String, String)> {
        self.entries.read().values().cloned().collect()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the store is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Child keys of `parent_path` merged with `earlier_keys`, sorted.
    pub fn child_keys(&self, earlier_keys: Vec<String>, parent_path: Option<&str>) -> Vec<String> {
        let mut keys: Vec<String> = {
            let entries = self.entries.read();
            entries
                .values()
                .filter_map(|(key, _)| path::child_segment(key, parent_path))
                .map(str::to_string)
                .collect()
        };
        keys.extend(earlier_keys);
        keys.sort_by(|a, b| path::compare_keys(a, b));
        keys
    }

    /// Current reload token.
    pub fn reload_token(&self) -> ReloadToken {
        ReloadToken::from_state(self.token.load_full())
    }

    /// Swap in a fresh token, then fire the previous one.
    pub fn on_reload(&self) {
        let previous = self.token.swap(Arc::new(TokenState::new()));
        ReloadToken::from_state(previous).fire();
    }
}

impl Default for ProviderData {
    fn default() -> Self {
        Self::new()
    }
}

/// Flatten a `config` value tree into `:`-delimited key/value pairs.
///
/// Tables contribute their keys as segments, arrays their indices. Nil
/// leaves become empty strings.
pub(crate) fn flatten_value(prefix: Option<&str>, value: config::Value, out: &mut Vec<(String, String)>) {
    use config::ValueKind;

    let join = |segment: &str| match prefix {
        Some(prefix) => path::combine([prefix, segment]),
        None => segment.to_string(),
    };

    match value.kind {
        ValueKind::Table(table) => {
            for (key, child) in table {
                let child_path = join(&key);
                flatten_value(Some(&child_path), child, out);
            }
        }
        ValueKind::Array(items) => {
            for (index, child) in items.into_iter().enumerate() {
                let child_path = join(&index.to_string());
                flatten_value(Some(&child_path), child, out);
            }
        }
        scalar => {
            if let Some(key) = prefix {
                out.push((key.to_string(), scalar_to_string(scalar)));
            }
        }
    }
}

fn scalar_to_string(kind: config::ValueKind) -> String {
    use config::ValueKind;

    match kind {
        ValueKind::Nil => String::new(),
        ValueKind::Boolean(value) => value.to_string(),
        ValueKind::I64(value) => value.to_string(),
        ValueKind::I128(value) => value.to_string(),
        ValueKind::U64(value) => value.to_string(),
        ValueKind::U128(value) => value.to_string(),
        ValueKind::Float(value) => value.to_string(),
        ValueKind::String(value) => value,
        _ => String::new(),
    }
}
