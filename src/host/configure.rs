//! Post-bootstrap facades: callbacks run immediately and host identity is frozen.

use super::builder::{Host, HostBuilder, HostOperation};
use super::defaults::{CONTENT_ROOT_KEY, HOST_IDENTITY_KEYS, WEB_IDENTITY_KEYS, WEB_ROOT_KEY};
use super::environment::{HostBuilderContext, WebHostEnvironment};
use super::services::{ServiceCollection, ServiceProviderFactory};
use crate::core::{Configuration, ConfigurationManager};
use crate::error::{ConfigError, Result};
use std::any::Any;
use std::path::{Path, PathBuf};

/// State shared by the facades of one application builder.
pub(crate) struct HostState {
    pub(crate) context: HostBuilderContext,
    pub(crate) services: ServiceCollection,
    pub(crate) operations: Vec<HostOperation>,
}

impl HostState {
    pub(crate) fn new(context: HostBuilderContext, services: ServiceCollection) -> Self {
        Self {
            context,
            services,
            operations: Vec::new(),
        }
    }

    fn configuration(&self) -> &ConfigurationManager {
        self.context.configuration()
    }
}

/// Run `apply`, then fail if any of `keys` reads differently than before.
fn guard_identity<F>(configuration: &ConfigurationManager, keys: &[(&'static str, &'static str)], apply: F) -> Result<()>
where
    F: FnOnce() -> Result<()>,
{
    let before: Vec<Option<String>> = keys.iter().map(|(key, _)| configuration.get(key)).collect();
    apply()?;

    for (&(key, setting), previous) in keys.iter().zip(before) {
        let current = configuration.get(key);
        if !same_setting(configuration, key, previous.as_deref(), current.as_deref()) {
            tracing::debug!(setting, "host identity change rejected");
            return Err(ConfigError::IdentityChanged {
                setting,
                from: previous.unwrap_or_default(),
                to: current.unwrap_or_default(),
            });
        }
    }
    Ok(())
}

fn same_setting(configuration: &ConfigurationManager, key: &str, previous: Option<&str>, current: Option<&str>) -> bool {
    let same = match (previous, current) {
        (Some(previous), Some(current)) => previous.eq_ignore_ascii_case(current),
        (None, None) => true,
        _ => false,
    };
    if same {
        return true;
    }

    // "./app" and "app" name the same directory.
    if key.eq_ignore_ascii_case(CONTENT_ROOT_KEY) {
        resolve_content_root(previous) == resolve_content_root(current)
    } else if key.eq_ignore_ascii_case(WEB_ROOT_KEY) {
        let Some(content_root) = resolve_content_root(configuration.get(CONTENT_ROOT_KEY).as_deref()) else {
            return false;
        };
        match (previous, current) {
            (Some(previous), Some(current)) => resolve(&content_root, previous) == resolve(&content_root, current),
            _ => false,
        }
    } else {
        false
    }
}

/// Content root as an absolute path; unset means the working directory.
fn resolve_content_root(value: Option<&str>) -> Option<PathBuf> {
    let current_dir = std::env::current_dir().ok()?;
    Some(match value.filter(|v| !v.is_empty()) {
        Some(root) => resolve(&current_dir, root),
        None => current_dir,
    })
}

fn resolve(base: &Path, value: &str) -> PathBuf {
    base.join(value).components().collect()
}

/// Host facade returned by [`ApplicationBuilder::host`](super::ApplicationBuilder::host).
///
/// Configuration and service callbacks run as soon as they are registered.
/// A callback that changes the application name, environment or content
/// root fails with [`ConfigError::IdentityChanged`]. Factory and container
/// calls are queued until the application is built.
pub struct ConfigureHostBuilder<'a> {
    state: &'a mut HostState,
}

impl<'a> ConfigureHostBuilder<'a> {
    pub(crate) fn new(state: &'a mut HostState) -> Self {
        Self { state }
    }

    /// The configuration callbacks write to.
    pub fn configuration(&self) -> &ConfigurationManager {
        self.state.configuration()
    }
}

impl HostBuilder for ConfigureHostBuilder<'_> {
    fn configure_host_configuration<F>(&mut self, configure: F) -> Result<&mut Self>
    where
        F: FnOnce(&ConfigurationManager) -> Result<()> + Send + 'static,
    {
        let configuration = self.state.configuration();
        guard_identity(configuration, &HOST_IDENTITY_KEYS, || configure(configuration))?;
        Ok(self)
    }

    fn configure_app_configuration<F>(&mut self, configure: F) -> Result<&mut Self>
    where
        F: FnOnce(&HostBuilderContext, &ConfigurationManager) -> Result<()> + Send + 'static,
    {
        let context = &self.state.context;
        let configuration = context.configuration();
        guard_identity(configuration, &HOST_IDENTITY_KEYS, || configure(context, configuration))?;
        Ok(self)
    }

    fn configure_services<F>(&mut self, configure: F) -> Result<&mut Self>
    where
        F: FnOnce(&HostBuilderContext, &mut ServiceCollection) -> Result<()> + Send + 'static,
    {
        let HostState { context, services, .. } = &mut *self.state;
        configure(context, services)?;
        Ok(self)
    }

    fn use_service_provider_factory<P>(&mut self, factory: P) -> Result<&mut Self>
    where
        P: ServiceProviderFactory,
    {
        self.state.operations.push(Box::new(move |inner| {
            inner.use_service_provider_factory(factory)?;
            Ok(())
        }));
        Ok(self)
    }

    fn configure_container<C, F>(&mut self, configure: F) -> Result<&mut Self>
    where
        C: Any + Send,
        F: FnOnce(&HostBuilderContext, &mut C) -> Result<()> + Send + 'static,
    {
        self.state.operations.push(Box::new(move |inner| {
            inner.configure_container::<C, F>(configure)?;
            Ok(())
        }));
        Ok(self)
    }

    fn build(&mut self) -> Result<Host> {
        Err(ConfigError::BuildNotSupported("ConfigureHostBuilder"))
    }
}

/// Web host facade returned by [`ApplicationBuilder::web_host`](super::ApplicationBuilder::web_host).
///
/// Guards the web root and hosting startup settings on top of the host
/// identity keys.
pub struct ConfigureWebHostBuilder<'a> {
    state: &'a mut HostState,
    environment: &'a WebHostEnvironment,
}

impl<'a> ConfigureWebHostBuilder<'a> {
    pub(crate) fn new(state: &'a mut HostState, environment: &'a WebHostEnvironment) -> Self {
        Self { state, environment }
    }

    /// The web hosting environment computed after bootstrap.
    pub fn environment(&self) -> &WebHostEnvironment {
        self.environment
    }

    /// Contribute to the application configuration, immediately.
    ///
    /// # Errors
    ///
    /// Propagates the callback's error, or fails with
    /// [`ConfigError::IdentityChanged`] if an identity setting changed.
    pub fn configure_app_configuration<F>(&mut self, configure: F) -> Result<&mut Self>
    where
        F: FnOnce(&HostBuilderContext, &ConfigurationManager) -> Result<()>,
    {
        let context = &self.state.context;
        let configuration = context.configuration();
        let keys: Vec<_> = HOST_IDENTITY_KEYS.iter().chain(WEB_IDENTITY_KEYS.iter()).copied().collect();
        guard_identity(configuration, &keys, || configure(context, configuration))?;
        Ok(self)
    }

    /// Register services, immediately.
    ///
    /// # Errors
    ///
    /// Propagates the callback's error.
    pub fn configure_services<F>(&mut self, configure: F) -> Result<&mut Self>
    where
        F: FnOnce(&HostBuilderContext, &mut ServiceCollection) -> Result<()>,
    {
        let HostState { context, services, .. } = &mut *self.state;
        configure(context, services)?;
        Ok(self)
    }

    /// Write `value` to `key` in the live configuration.
    ///
    /// # Errors
    ///
    /// Writing a different value to an identity key fails with
    /// [`ConfigError::IdentityChanged`].
    pub fn use_setting(&mut self, key: &str, value: &str) -> Result<&mut Self> {
        let configuration = self.state.configuration();
        let identity = HOST_IDENTITY_KEYS
            .iter()
            .chain(WEB_IDENTITY_KEYS.iter())
            .find(|(identity_key, _)| identity_key.eq_ignore_ascii_case(key));

        if let Some(&(identity_key, setting)) = identity {
            let previous = configuration.get(identity_key);
            if !same_setting(configuration, identity_key, previous.as_deref(), Some(value)) {
                return Err(ConfigError::IdentityChanged {
                    setting,
                    from: previous.unwrap_or_default(),
                    to: value.to_string(),
                });
            }
        }

        configuration.set(key, value)?;
        Ok(self)
    }

    /// Read `key` from the live configuration.
    pub fn get_setting(&self, key: &str) -> Option<String> {
        self.state.configuration().get(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::environment::HostEnvironment;
    use crate::sources::MemorySource;

    fn state(data: &[(&str, &str)]) -> HostState {
        let configuration = ConfigurationManager::new();
        configuration.add_source(MemorySource::new(data.iter().copied())).unwrap();
        let environment = HostEnvironment::from_configuration(&configuration).unwrap();
        HostState::new(
            HostBuilderContext::new(environment, configuration),
            ServiceCollection::new(),
        )
    }

    #[test]
    fn test_callbacks_run_immediately() {
        let mut state = state(&[("environment", "Development")]);
        let mut host = ConfigureHostBuilder::new(&mut state);

        host.configure_app_configuration(|_, config| {
            config.add_source(MemorySource::new([("Feature", "on")]))?;
            Ok(())
        })
        .unwrap()
        .configure_services(|_, services| {
            services.add_singleton(1u8);
            Ok(())
        })
        .unwrap();

        assert_eq!(host.configuration().get("feature").as_deref(), Some("on"));
        assert!(state.services.contains::<u8>());
    }

    #[test]
    fn test_environment_change_is_rejected() {
        let mut state = state(&[("environment", "Development")]);
        let mut host = ConfigureHostBuilder::new(&mut state);

        let result = host.configure_host_configuration(|config| {
            config.add_source(MemorySource::new([("environment", "Staging")]))?;
            Ok(())
        });

        match result {
            Err(ConfigError::IdentityChanged { setting, from, to }) => {
                assert_eq!(setting, "environment");
                assert_eq!(from, "Development");
                assert_eq!(to, "Staging");
            }
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("identity change was accepted"),
        }
        assert!(state.context.environment().is_development());
    }

    #[test]
    fn test_same_value_in_different_case_is_allowed() {
        let mut state = state(&[("environment", "Development")]);
        let mut host = ConfigureHostBuilder::new(&mut state);

        host.configure_host_configuration(|config| {
            config.add_source(MemorySource::new([("ENVIRONMENT", "development")]))?;
            Ok(())
        })
        .unwrap();
    }

    #[test]
    fn test_equivalent_content_root_is_allowed() {
        let mut state = state(&[("contentRoot", "app")]);
        let mut host = ConfigureHostBuilder::new(&mut state);

        host.configure_host_configuration(|config| {
            config.add_source(MemorySource::new([("contentRoot", "./app")]))?;
            Ok(())
        })
        .unwrap();

        let moved = host.configure_host_configuration(|config| {
            config.add_source(MemorySource::new([("contentRoot", "elsewhere")]))?;
            Ok(())
        });
        assert!(matches!(moved, Err(ConfigError::IdentityChanged { setting: "content root", .. })));
    }

    #[test]
    fn test_container_calls_are_queued() {
        let mut state = state(&[]);
        let mut host = ConfigureHostBuilder::new(&mut state);

        host.configure_container(|_, _: &mut ServiceCollection| Ok(())).unwrap();
        assert!(matches!(host.build(), Err(ConfigError::BuildNotSupported("ConfigureHostBuilder"))));
        assert_eq!(state.operations.len(), 1);
    }

    #[test]
    fn test_use_setting() {
        let mut state = state(&[("environment", "Production"), ("webroot", "public")]);
        let environment = WebHostEnvironment::from_configuration(
            state.context.environment().clone(),
            state.context.configuration(),
        );
        let mut web = ConfigureWebHostBuilder::new(&mut state, &environment);

        web.use_setting("greeting", "hello").unwrap();
        assert_eq!(web.get_setting("GREETING").as_deref(), Some("hello"));

        // Same value is fine, a new one is not.
        web.use_setting("WebRoot", "public").unwrap();
        assert!(matches!(
            web.use_setting("webroot", "static"),
            Err(ConfigError::IdentityChanged { setting: "web root", .. })
        ));
        assert!(matches!(
            web.use_setting("environment", "Staging"),
            Err(ConfigError::IdentityChanged { setting: "environment", .. })
        ));
    }

    #[test]
    fn test_equivalent_web_root_is_allowed() {
        let mut state = state(&[("contentRoot", "site"), ("webroot", "public")]);
        let environment = WebHostEnvironment::from_configuration(
            state.context.environment().clone(),
            state.context.configuration(),
        );
        let mut web = ConfigureWebHostBuilder::new(&mut state, &environment);

        web.use_setting("webroot", "./public").unwrap();
        web.configure_app_configuration(|_, config| {
            config.add_source(MemorySource::new([("WebRoot", "public/")]))?;
            Ok(())
        })
        .unwrap();
        assert!(matches!(
            web.use_setting("webroot", "./static"),
            Err(ConfigError::IdentityChanged { setting: "web root", .. })
        ));
    }

    #[test]
    fn test_web_facade_guards_hosting_startup() {
        let mut state = state(&[]);
        let environment = WebHostEnvironment::from_configuration(
            state.context.environment().clone(),
            state.context.configuration(),
        );
        let mut web = ConfigureWebHostBuilder::new(&mut state, &environment);

        let result = web.configure_app_configuration(|_, config| {
            config.add_source(MemorySource::new([("hostingStartupAssemblies", "Extra")]))?;
            Ok(())
        });
        assert!(matches!(
            result,
            Err(ConfigError::IdentityChanged { setting: "hosting startup assemblies", .. })
        ));
    }
}
