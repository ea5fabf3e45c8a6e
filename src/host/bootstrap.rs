//! The throwaway builder that runs default wiring before the real host exists.

use super::builder::{
    AppConfigAction, DefaultHostBuilder, Host, HostBuilder, HostConfigAction, HostOperation,
    ServicesAction,
};
use super::environment::{HostBuilderContext, HostEnvironment};
use super::services::{ServiceCollection, ServiceProviderFactory};
use crate::core::ConfigurationManager;
use crate::error::{ConfigError, Result};
use crate::sources::{BASE_PATH_PROPERTY, ChainedSource};
use std::any::Any;
use std::sync::Arc;

/// Collects host callbacks so they can run once, early, before the real
/// builder is configured.
///
/// Host configuration, app configuration and service callbacks are queued
/// and run by [`run_default_callbacks`](Self::run_default_callbacks).
/// Factory and container calls are queued separately and replayed on the
/// real builder. The bootstrap builder itself cannot be built.
///
/// # Examples
///
/// ```rust
/// use layered_config::prelude::*;
/// use layered_config::host::{BootstrapHostBuilder, DefaultHostBuilder, HostBuilder, ServiceCollection};
///
/// # fn example() -> Result<()> {
/// let mut services = ServiceCollection::new();
/// let mut inner = DefaultHostBuilder::new();
///
/// let mut bootstrap = BootstrapHostBuilder::new(&mut services);
/// bootstrap.configure_host_configuration(|config| {
///     config.add_source(MemorySource::new([("environment", "Development")]))?;
///     Ok(())
/// })?;
///
/// let (context, configuration) = bootstrap.run_default_callbacks(&mut inner)?;
/// assert!(context.environment().is_development());
/// assert_eq!(configuration.get("environment").as_deref(), Some("Development"));
/// # Ok(())
/// # }
/// ```
pub struct BootstrapHostBuilder<'a> {
    services: &'a mut ServiceCollection,
    host_config_actions: Vec<HostConfigAction>,
    app_config_actions: Vec<AppConfigAction>,
    service_actions: Vec<ServicesAction>,
    remaining_operations: Vec<HostOperation>,
}

impl<'a> BootstrapHostBuilder<'a> {
    /// Create a bootstrap builder that registers services into `services`.
    pub fn new(services: &'a mut ServiceCollection) -> Self {
        Self {
            services,
            host_config_actions: Vec::new(),
            app_config_actions: Vec::new(),
            service_actions: Vec::new(),
            remaining_operations: Vec::new(),
        }
    }

    /// Run every queued callback once and hand the deferred calls to `inner`.
    ///
    /// 1. Host configuration callbacks build a fresh host configuration.
    /// 2. The environment is derived from it (`Production` by default).
    /// 3. A second configuration, based at the content root and chaining
    ///    the host configuration, receives the app configuration callbacks.
    /// 4. That configuration becomes the context's; service callbacks run
    ///    against the shared service collection.
    /// 5. Factory and container calls are replayed on `inner`.
    ///
    /// Consumes the builder, so the queues drain exactly once.
    ///
    /// # Errors
    ///
    /// Propagates the first callback failure.
    pub fn run_default_callbacks(
        self,
        inner: &mut DefaultHostBuilder,
    ) -> Result<(HostBuilderContext, ConfigurationManager)> {
        let host_configuration = ConfigurationManager::new();
        for action in self.host_config_actions {
            action(&host_configuration)?;
        }
        tracing::trace!("bootstrap host configuration applied");

        let environment = HostEnvironment::from_configuration(&host_configuration)?;
        let mut context = HostBuilderContext::new(environment, host_configuration.clone());

        let app_configuration = ConfigurationManager::new();
        app_configuration.properties().insert(
            BASE_PATH_PROPERTY,
            context.environment().content_root_path().display().to_string(),
        )?;
        app_configuration.add_source(ChainedSource::new(Arc::new(host_configuration)).should_dispose(true))?;
        for action in self.app_config_actions {
            action(&context, &app_configuration)?;
        }
        tracing::trace!("bootstrap app configuration applied");

        context.set_configuration(app_configuration.clone());
        for action in self.service_actions {
            action(&context, &mut *self.services)?;
        }

        for operation in self.remaining_operations {
            operation(inner)?;
        }

        tracing::debug!(
            environment = context.environment().environment_name(),
            application = context.environment().application_name(),
            "bootstrap complete"
        );
        Ok((context, app_configuration))
    }
}

impl HostBuilder for BootstrapHostBuilder<'_> {
    fn configure_host_configuration<F>(&mut self, configure: F) -> Result<&mut Self>
    where
        F: FnOnce(&ConfigurationManager) -> Result<()> + Send + 'static,
    {
        self.host_config_actions.push(Box::new(configure));
        Ok(self)
    }

    fn configure_app_configuration<F>(&mut self, configure: F) -> Result<&mut Self>
    where
        F: FnOnce(&HostBuilderContext, &ConfigurationManager) -> Result<()> + Send + 'static,
    {
        self.app_config_actions.push(Box::new(configure));
        Ok(self)
    }

    fn configure_services<F>(&mut self, configure: F) -> Result<&mut Self>
    where
        F: FnOnce(&HostBuilderContext, &mut ServiceCollection) -> Result<()> + Send + 'static,
    {
        self.service_actions.push(Box::new(configure));
        Ok(self)
    }

    fn use_service_provider_factory<P>(&mut self, factory: P) -> Result<&mut Self>
    where
        P: ServiceProviderFactory,
    {
        self.remaining_operations.push(Box::new(move |inner| {
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
        self.remaining_operations.push(Box::new(move |inner| {
            inner.configure_container::<C, F>(configure)?;
            Ok(())
        }));
        Ok(self)
    }

    fn build(&mut self) -> Result<Host> {
        Err(ConfigError::BuildNotSupported("BootstrapHostBuilder"))
    }
}
