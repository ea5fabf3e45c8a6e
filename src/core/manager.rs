//! The layered configuration root.

use super::collections::{Properties, Sources};
use super::path;
use super::section::{Configuration, ConfigurationRoot, ConfigurationSection};
use crate::error::{ConfigError, Result};
use crate::notify::{ChangeSubscription, ReloadToken, TokenState, on_change};
use crate::sources::{BuildContext, ConfigurationProvider, ConfigurationSource};
use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

#[cfg(feature = "metrics")]
use crate::metrics::ConfigMetrics;
#[cfg(feature = "metrics")]
use std::sync::OnceLock;

pub(crate) type SharedSource = Arc<dyn ConfigurationSource>;
pub(crate) type SharedProvider = Arc<dyn ConfigurationProvider>;

/// The layered configuration root.
///
/// Holds an ordered list of sources and the provider built from each one.
/// Reads walk the providers from the most recently added to the first, so
/// later sources override earlier ones. Writes go to every provider.
///
/// The manager is both builder and root: adding a source makes its values
/// visible immediately. Appending builds only the new provider; any other
/// change to the source list or the property bag rebuilds every provider.
///
/// Cloning is cheap and every clone shares the same state.
///
/// # Examples
///
/// ```rust
/// use layered_config::prelude::*;
///
/// # fn example() -> Result<()> {
/// let config = ConfigurationManager::new();
/// config
///     .add_source(MemorySource::new([("Logging:Level", "info"), ("Name", "demo")]))?
///     .add_source(MemorySource::new([("Logging:Level", "debug")]))?;
///
/// assert_eq!(config.get("logging:level").as_deref(), Some("debug"));
/// assert_eq!(config.get("name").as_deref(), Some("demo"));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct ConfigurationManager {
    inner: Arc<ManagerInner>,
}

struct ManagerInner {
    state: Mutex<ManagerState>,
    token: ArcSwap<TokenState>,
    #[cfg(feature = "metrics")]
    metrics: OnceLock<ConfigMetrics>,
}

#[derive(Default)]
struct ManagerState {
    sources: Vec<SharedSource>,
    providers: Vec<SharedProvider>,
    subscriptions: Vec<ChangeSubscription>,
    properties: BTreeMap<String, String>,
}

impl ConfigurationManager {
    /// Create an empty manager.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                state: Mutex::new(ManagerState::default()),
                token: ArcSwap::from_pointee(TokenState::new()),
                #[cfg(feature = "metrics")]
                metrics: OnceLock::new(),
            }),
        }
    }

    /// Record OpenTelemetry metrics for this manager.
    ///
    /// Only the first collector attached to a manager is kept.
    #[cfg(feature = "metrics")]
    pub fn with_metrics(self, metrics: ConfigMetrics) -> Self {
        let _ = self.inner.metrics.set(metrics);
        self
    }

    /// Append a source, build its provider and load it.
    ///
    /// Existing providers are left alone. Returns `self` so calls chain.
    ///
    /// # Errors
    ///
    /// Propagates build and load failures. The source stays in the list
    /// without a provider; the next rebuild retries it.
    pub fn add_source<S>(&self, source: S) -> Result<&Self>
    where
        S: ConfigurationSource + 'static,
    {
        self.append(Arc::new(source))?;
        Ok(self)
    }

    /// The source list. Mutating it other than by appending rebuilds every provider.
    pub fn sources(&self) -> Sources<'_> {
        Sources::new(self)
    }

    /// The property bag consulted by sources when they build. Every mutation
    /// rebuilds every provider.
    pub fn properties(&self) -> Properties<'_> {
        Properties::new(self)
    }

    /// Snapshot of the built providers, lowest precedence first.
    pub fn providers(&self) -> Vec<Arc<dyn ConfigurationProvider>> {
        self.inner.state.lock().providers.clone()
    }

    /// Reload every provider without rebuilding, then notify once.
    ///
    /// # Errors
    ///
    /// Propagates the first load failure; no notification is raised then.
    pub fn reload(&self) -> Result<()> {
        #[cfg(feature = "metrics")]
        let timer = self.inner.metrics.get().map(ConfigMetrics::start_reload);

        let result = {
            let state = self.inner.state.lock();
            state.providers.iter().try_for_each(|provider| provider.load())
        };

        #[cfg(feature = "metrics")]
        if let (Some(metrics), Some(timer)) = (self.inner.metrics.get(), timer) {
            match &result {
                Ok(()) => metrics.record_reload_success(timer),
                Err(_) => metrics.record_reload_failure(timer),
            }
        }

        match result {
            Ok(()) => {
                tracing::debug!("configuration providers reloaded");
                self.inner.raise_changed();
                Ok(())
            }
            Err(error) => {
                tracing::debug!(%error, "configuration reload failed");
                Err(error)
            }
        }
    }

    /// Drop every change subscription, then dispose every provider.
    ///
    /// Safe to call more than once. The source list is kept; a later
    /// structural change rebuilds the providers.
    pub fn dispose(&self) {
        let (subscriptions, providers) = {
            let mut state = self.inner.state.lock();
            (
                std::mem::take(&mut state.subscriptions),
                std::mem::take(&mut state.providers),
            )
        };
        drop(subscriptions);
        for provider in providers {
            provider.dispose();
        }
    }

    /// Whether two handles share the same manager.
    pub fn ptr_eq(&self, other: &ConfigurationManager) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn append(&self, source: SharedSource) -> Result<()> {
        let name = source.name();
        let provider_count = {
            let mut state = self.inner.state.lock();
            state.sources.push(Arc::clone(&source));

            let provider = {
                let context = BuildContext::new(&state.properties);
                source.build(&context)?
            };
            provider.load()?;

            let subscription = subscribe(&self.inner, &provider);
            state.providers.push(provider);
            state.subscriptions.push(subscription);
            state.providers.len()
        };

        #[cfg(feature = "metrics")]
        if let Some(metrics) = self.inner.metrics.get() {
            metrics.record_source_added();
            metrics.update_provider_count(provider_count);
        }

        tracing::debug!(source = %name, providers = provider_count, "configuration source added");
        self.inner.raise_changed();
        Ok(())
    }

    /// Mutate the source list and property bag under the lock.
    ///
    /// `mutate` reports whether anything changed; if so every provider is
    /// rebuilt and a single notification is raised once the lock is released.
    pub(crate) fn mutate<R, F>(&self, mutate: F) -> Result<R>
    where
        F: FnOnce(&mut Vec<SharedSource>, &mut BTreeMap<String, String>) -> Result<(R, bool)>,
    {
        #[cfg(feature = "metrics")]
        let start = std::time::Instant::now();

        let (value, rebuilt) = {
            let mut guard = self.inner.state.lock();
            let state = &mut *guard;
            let (value, changed) = mutate(&mut state.sources, &mut state.properties)?;
            if changed {
                (value, Some(self.inner.rebuild_locked(state)))
            } else {
                (value, None)
            }
        };

        let Some(result) = rebuilt else {
            return Ok(value);
        };

        #[cfg(feature = "metrics")]
        if let Some(metrics) = self.inner.metrics.get() {
            metrics.record_rebuild(start);
            metrics.update_provider_count(self.inner.state.lock().providers.len());
        }

        // Providers were replaced even if one of them failed to load.
        self.inner.raise_changed();
        result.map(|()| value)
    }

    /// Read the source list and property bag under the lock.
    pub(crate) fn read<R>(&self, read: impl FnOnce(&[SharedSource], &BTreeMap<String, String>) -> R) -> R {
        let state = self.inner.state.lock();
        read(&state.sources, &state.properties)
    }

    pub(crate) fn children_of(&self, parent: Option<&str>) -> Vec<ConfigurationSection> {
        let mut keys = {
            let state = self.inner.state.lock();
            state
                .providers
                .iter()
                .fold(Vec::new(), |earlier, provider| provider.child_keys(earlier, parent))
        };
        path::sort_and_dedup(&mut keys);

        keys.into_iter()
            .map(|key| match parent {
                Some(parent) => path::combine([parent, key.as_str()]),
                None => key,
            })
            .map(|path| ConfigurationSection::new(self.clone(), path))
            .collect()
    }
}

impl ManagerInner {
    /// Swap in a fresh token, then fire the previous one.
    fn raise_changed(&self) {
        let previous = self.token.swap(Arc::new(TokenState::new()));

        #[cfg(feature = "metrics")]
        if let Some(metrics) = self.metrics.get() {
            metrics.record_notification();
        }

        tracing::trace!("configuration change raised");
        ReloadToken::from_state(previous).fire();
    }

    fn rebuild_locked(self: &Arc<Self>, state: &mut ManagerState) -> Result<()> {
        let ManagerState {
            sources,
            providers,
            subscriptions,
            properties,
        } = state;

        subscriptions.clear();
        for provider in providers.drain(..) {
            provider.dispose();
        }

        let context = BuildContext::new(properties);
        for source in sources.iter() {
            providers.push(source.build(&context)?);
        }
        for provider in providers.iter() {
            provider.load()?;
            subscriptions.push(subscribe(self, provider));
        }

        tracing::debug!(providers = providers.len(), "configuration providers rebuilt");
        Ok(())
    }
}

impl Drop for ManagerInner {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        state.subscriptions.clear();
        for provider in state.providers.drain(..) {
            provider.dispose();
        }
    }
}

/// Raise a root change every time `provider` reports a reload.
fn subscribe(root: &Arc<ManagerInner>, provider: &SharedProvider) -> ChangeSubscription {
    let provider: Weak<dyn ConfigurationProvider> = Arc::downgrade(provider);
    let root = Arc::downgrade(root);
    on_change(
        move || provider.upgrade().and_then(|provider| provider.reload_token()),
        move || {
            if let Some(root) = root.upgrade() {
                root.raise_changed();
            }
        },
    )
}

impl Configuration for ConfigurationManager {
    fn get(&self, key: &str) -> Option<String> {
        let state = self.inner.state.lock();
        state
            .providers
            .iter()
            .rev()
            .find_map(|provider| provider.try_get(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        let state = self.inner.state.lock();
        if state.providers.is_empty() {
            return Err(ConfigError::NoSourceRegistered);
        }
        for provider in &state.providers {
            provider.set(key, value)?;
        }
        Ok(())
    }

    fn get_section(&self, key: &str) -> ConfigurationSection {
        ConfigurationSection::new(self.clone(), key.to_string())
    }

    fn get_children(&self) -> Vec<ConfigurationSection> {
        self.children_of(None)
    }

    fn reload_token(&self) -> ReloadToken {
        ReloadToken::from_state(self.inner.token.load_full())
    }

    fn dispose(&self) {
        ConfigurationManager::dispose(self);
    }
}

impl ConfigurationRoot for ConfigurationManager {
    fn reload(&self) -> Result<()> {
        ConfigurationManager::reload(self)
    }

    fn providers(&self) -> Vec<Arc<dyn ConfigurationProvider>> {
        ConfigurationManager::providers(self)
    }
}

impl Default for ConfigurationManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConfigurationManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("ConfigurationManager")
            .field(
                "sources",
                &state.sources.iter().map(|s| s.name()).collect::<Vec<_>>(),
            )
            .field("providers", &state.providers.len())
            .field("properties", &state.properties)
            .finish()
    }
}
