//! The host builder abstraction and the real, deferred implementation.

use super::environment::{HostBuilderContext, HostEnvironment};
use super::services::{
    DefaultServiceProviderFactory, Erased, ErasedFactory, ServiceCollection, ServiceProvider,
    ServiceProviderFactory,
};
use crate::core::ConfigurationManager;
use crate::error::{ConfigError, Result};
use crate::sources::{BASE_PATH_PROPERTY, ChainedSource};
use std::any::{Any, type_name};
use std::sync::Arc;

pub(crate) type HostConfigAction = Box<dyn FnOnce(&ConfigurationManager) -> Result<()> + Send>;
pub(crate) type AppConfigAction =
    Box<dyn FnOnce(&HostBuilderContext, &ConfigurationManager) -> Result<()> + Send>;
pub(crate) type ServicesAction =
    Box<dyn FnOnce(&HostBuilderContext, &mut ServiceCollection) -> Result<()> + Send>;

/// A call that can only take effect on the real builder.
pub(crate) type HostOperation = Box<dyn FnOnce(&mut DefaultHostBuilder) -> Result<()> + Send>;

/// Container callback with its container type erased.
pub(crate) struct ContainerAction {
    expected: &'static str,
    apply: Box<dyn FnOnce(&HostBuilderContext, &mut (dyn Any + Send)) -> Option<Result<()>> + Send>,
}

impl ContainerAction {
    pub(crate) fn new<C, F>(configure: F) -> Self
    where
        C: Any + Send,
        F: FnOnce(&HostBuilderContext, &mut C) -> Result<()> + Send + 'static,
    {
        Self {
            expected: type_name::<C>(),
            apply: Box::new(move |context, container| {
                container
                    .downcast_mut::<C>()
                    .map(|container| configure(context, container))
            }),
        }
    }

    fn run(
        self,
        context: &HostBuilderContext,
        container: &mut (dyn Any + Send),
        actual: &'static str,
    ) -> Result<()> {
        (self.apply)(context, container).unwrap_or(Err(ConfigError::ContainerTypeMismatch {
            expected: self.expected,
            actual,
        }))
    }
}

/// Registration surface shared by the real builder, the bootstrap builder
/// and the post-bootstrap facades.
///
/// Whether a callback runs now or at build time depends on the
/// implementation. Every method returns `self` so calls chain with `?`.
pub trait HostBuilder {
    /// Contribute to the host configuration (identity keys and the like).
    fn configure_host_configuration<F>(&mut self, configure: F) -> Result<&mut Self>
    where
        F: FnOnce(&ConfigurationManager) -> Result<()> + Send + 'static;

    /// Contribute to the application configuration.
    fn configure_app_configuration<F>(&mut self, configure: F) -> Result<&mut Self>
    where
        F: FnOnce(&HostBuilderContext, &ConfigurationManager) -> Result<()> + Send + 'static;

    /// Register services.
    fn configure_services<F>(&mut self, configure: F) -> Result<&mut Self>
    where
        F: FnOnce(&HostBuilderContext, &mut ServiceCollection) -> Result<()> + Send + 'static;

    /// Replace the factory that turns services into a provider.
    fn use_service_provider_factory<P>(&mut self, factory: P) -> Result<&mut Self>
    where
        P: ServiceProviderFactory;

    /// Configure the factory's container before the provider is created.
    fn configure_container<C, F>(&mut self, configure: F) -> Result<&mut Self>
    where
        C: Any + Send,
        F: FnOnce(&HostBuilderContext, &mut C) -> Result<()> + Send + 'static;

    /// Build the host.
    fn build(&mut self) -> Result<Host>;
}

/// A built host: its environment, configuration and services.
#[derive(Debug, Clone)]
pub struct Host {
    environment: HostEnvironment,
    configuration: ConfigurationManager,
    services: ServiceProvider,
}

impl Host {
    /// The hosting environment.
    pub fn environment(&self) -> &HostEnvironment {
        &self.environment
    }

    /// The final application configuration.
    pub fn configuration(&self) -> &ConfigurationManager {
        &self.configuration
    }

    /// The built services.
    pub fn services(&self) -> &ServiceProvider {
        &self.services
    }
}

/// The real host builder. Every callback is deferred until [`build`](HostBuilder::build).
///
/// # Examples
///
/// ```rust
/// use layered_config::prelude::*;
/// use layered_config::host::{DefaultHostBuilder, HostBuilder};
///
/// # fn example() -> Result<()> {
/// let mut builder = DefaultHostBuilder::new();
/// builder
///     .configure_host_configuration(|config| {
///         config.add_source(MemorySource::new([("environment", "Staging")]))?;
///         Ok(())
///     })?
///     .configure_services(|context, services| {
///         services.add_singleton(context.environment().environment_name().to_string());
///         Ok(())
///     })?;
///
/// let host = builder.build()?;
/// assert!(host.environment().is_staging());
/// assert_eq!(host.services().get::<String>().unwrap().as_str(), "Staging");
/// # Ok(())
/// # }
/// ```
pub struct DefaultHostBuilder {
    host_config_actions: Vec<HostConfigAction>,
    app_config_actions: Vec<AppConfigAction>,
    service_actions: Vec<ServicesAction>,
    container_actions: Vec<ContainerAction>,
    factory: Box<dyn ErasedFactory>,
    built: bool,
}

impl DefaultHostBuilder {
    /// Create a builder using [`DefaultServiceProviderFactory`].
    pub fn new() -> Self {
        Self {
            host_config_actions: Vec::new(),
            app_config_actions: Vec::new(),
            service_actions: Vec::new(),
            container_actions: Vec::new(),
            factory: Box::new(Erased(DefaultServiceProviderFactory)),
            built: false,
        }
    }

    /// Build from a context and services prepared by a bootstrap phase.
    ///
    /// Host and app configuration callbacks registered on this builder are
    /// skipped; the context's configuration is final.
    pub(crate) fn build_from_parts(
        &mut self,
        context: HostBuilderContext,
        services: ServiceCollection,
    ) -> Result<Host> {
        self.mark_built()?;
        self.host_config_actions.clear();
        self.app_config_actions.clear();
        self.finish(context, services)
    }

    fn mark_built(&mut self) -> Result<()> {
        if self.built {
            return Err(ConfigError::HostAlreadyBuilt);
        }
        self.built = true;
        Ok(())
    }

    fn finish(&mut self, context: HostBuilderContext, mut services: ServiceCollection) -> Result<Host> {
        for action in self.service_actions.drain(..) {
            action(&context, &mut services)?;
        }

        let factory = std::mem::replace(&mut self.factory, Box::new(Erased(DefaultServiceProviderFactory)));
        let mut container = factory.create_builder(services);
        for action in self.container_actions.drain(..) {
            action.run(&context, container.as_mut(), factory.container_type())?;
        }
        let services = factory.create_service_provider(container)?;

        tracing::debug!(
            environment = context.environment().environment_name(),
            services = services.len(),
            "host built"
        );
        let environment = context.environment().clone();
        Ok(Host {
            environment,
            configuration: context.configuration().clone(),
            services,
        })
    }
}

impl Default for DefaultHostBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl HostBuilder for DefaultHostBuilder {
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
        self.factory = Box::new(Erased(factory));
        Ok(self)
    }

    fn configure_container<C, F>(&mut self, configure: F) -> Result<&mut Self>
    where
        C: Any + Send,
        F: FnOnce(&HostBuilderContext, &mut C) -> Result<()> + Send + 'static,
    {
        self.container_actions.push(ContainerAction::new(configure));
        Ok(self)
    }

    fn build(&mut self) -> Result<Host> {
        self.mark_built()?;

        let host_configuration = ConfigurationManager::new();
        for action in self.host_config_actions.drain(..) {
            action(&host_configuration)?;
        }
        let environment = HostEnvironment::from_configuration(&host_configuration)?;

        let app_configuration = ConfigurationManager::new();
        app_configuration
            .properties()
            .insert(BASE_PATH_PROPERTY, environment.content_root_path().display().to_string())?;
        app_configuration.add_source(ChainedSource::new(Arc::new(host_configuration)).should_dispose(true))?;

        let context = HostBuilderContext::new(environment, app_configuration.clone());
        for action in self.app_config_actions.drain(..) {
            action(&context, &app_configuration)?;
        }

        self.finish(context, ServiceCollection::new())
    }
}
