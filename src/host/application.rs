//! The application builder: default wiring, bootstrap and final build.

use super::bootstrap::BootstrapHostBuilder;
use super::builder::{DefaultHostBuilder, Host, HostBuilder};
use super::configure::{ConfigureHostBuilder, ConfigureWebHostBuilder, HostState};
use super::defaults::{APPLICATION_KEY, CONTENT_ROOT_KEY, ENVIRONMENT_KEY, HOST_ENV_PREFIX, WEB_ROOT_KEY};
use super::environment::{HostEnvironment, WebHostEnvironment};
use super::services::{ServiceCollection, ServiceProvider};
use crate::core::ConfigurationManager;
use crate::error::Result;
use crate::sources::{BASE_PATH_PROPERTY, ChainedSource, CommandLineSource, EnvSource, FileSource, MemorySource};
use std::path::PathBuf;
use std::sync::Arc;

/// Inputs that fix the host identity before any configuration is read.
///
/// Values set here win over environment variables and command line
/// arguments for the same settings.
#[derive(Debug, Clone)]
pub struct ApplicationOptions {
    args: Vec<String>,
    application_name: Option<String>,
    environment_name: Option<String>,
    content_root_path: Option<PathBuf>,
    web_root_path: Option<PathBuf>,
    env_vars: Option<Vec<(String, String)>>,
    reload_config_on_change: bool,
}

impl Default for ApplicationOptions {
    fn default() -> Self {
        Self {
            args: Vec::new(),
            application_name: None,
            environment_name: None,
            content_root_path: None,
            web_root_path: None,
            env_vars: None,
            reload_config_on_change: true,
        }
    }
}

impl ApplicationOptions {
    /// Options with nothing set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Command line arguments, without the program name.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Set the application name.
    pub fn application_name(mut self, name: impl Into<String>) -> Self {
        self.application_name = Some(name.into());
        self
    }

    /// Set the environment name.
    pub fn environment_name(mut self, name: impl Into<String>) -> Self {
        self.environment_name = Some(name.into());
        self
    }

    /// Set the content root.
    pub fn content_root_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.content_root_path = Some(path.into());
        self
    }

    /// Set the web root, relative to the content root.
    pub fn web_root_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.web_root_path = Some(path.into());
        self
    }

    /// Read environment variables from `vars` instead of the process.
    pub fn env_vars<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env_vars = Some(vars.into_iter().map(|(k, v)| (k.into(), v.into())).collect());
        self
    }

    /// Watch the `appsettings` files for changes (default: true).
    pub fn reload_config_on_change(mut self, reload: bool) -> Self {
        self.reload_config_on_change = reload;
        self
    }

    fn host_settings(&self) -> Vec<(String, String)> {
        let path = |p: &PathBuf| p.display().to_string();
        [
            (APPLICATION_KEY, self.application_name.clone()),
            (ENVIRONMENT_KEY, self.environment_name.clone()),
            (CONTENT_ROOT_KEY, self.content_root_path.as_ref().map(path)),
            (WEB_ROOT_KEY, self.web_root_path.as_ref().map(path)),
        ]
        .into_iter()
        .filter_map(|(key, value)| value.map(|value| (key.to_string(), value)))
        .collect()
    }

    fn env_source(&self, prefix: Option<&str>) -> EnvSource {
        let source = match prefix {
            Some(prefix) => EnvSource::new(prefix),
            None => EnvSource::unprefixed(),
        };
        match &self.env_vars {
            Some(vars) => source.with_vars(vars.iter().cloned()),
            None => source,
        }
    }
}

/// Wire the host and app configuration every application starts with.
fn add_defaults(bootstrap: &mut BootstrapHostBuilder<'_>, options: &ApplicationOptions) -> Result<()> {
    let host_env = options.env_source(Some(HOST_ENV_PREFIX));
    let host_args = options.args.clone();
    let host_settings = options.host_settings();
    bootstrap.configure_host_configuration(move |config| {
        config.add_source(host_env)?;
        if !host_args.is_empty() {
            config.add_source(CommandLineSource::new(host_args))?;
        }
        if !host_settings.is_empty() {
            config.add_source(MemorySource::new(host_settings))?;
        }
        Ok(())
    })?;

    let app_env = options.env_source(None);
    let app_args = options.args.clone();
    let reload = options.reload_config_on_change;
    bootstrap.configure_app_configuration(move |context, config| {
        let environment = context.environment().environment_name();
        config.add_source(FileSource::new("appsettings.json").optional(true).reload_on_change(reload))?;
        config.add_source(
            FileSource::new(format!("appsettings.{environment}.json"))
                .optional(true)
                .reload_on_change(reload),
        )?;
        config.add_source(app_env)?;
        if !app_args.is_empty() {
            config.add_source(CommandLineSource::new(app_args))?;
        }
        Ok(())
    })?;

    bootstrap.configure_services(|context, services| {
        services.add_singleton(context.environment().clone());
        Ok(())
    })?;
    Ok(())
}

/// Builds an [`Application`] with the default configuration wiring.
///
/// [`new`](Self::new) runs the bootstrap: host configuration (options,
/// `HOST_`-prefixed environment variables, command line), then app
/// configuration (`appsettings.json`, `appsettings.{environment}.json`,
/// environment variables, command line). Afterwards the environment is
/// fixed; [`host`](Self::host) and [`web_host`](Self::web_host) run
/// further callbacks immediately but reject identity changes.
///
/// # Examples
///
/// ```rust
/// use layered_config::prelude::*;
/// use layered_config::host::{ApplicationBuilder, ApplicationOptions, HostBuilder};
///
/// # fn example() -> Result<()> {
/// let mut builder = ApplicationBuilder::new(
///     ApplicationOptions::new()
///         .environment_name("Development")
///         .env_vars([("HOST_APPLICATIONNAME", "demo")])
///         .reload_config_on_change(false),
/// )?;
/// assert!(builder.environment().is_development());
///
/// builder.host().configure_app_configuration(|_, config| {
///     config.add_source(MemorySource::new([("Greeting", "hello")]))?;
///     Ok(())
/// })?;
///
/// let app = builder.build()?;
/// assert_eq!(app.environment().application_name(), "demo");
/// assert_eq!(app.configuration().get("greeting").as_deref(), Some("hello"));
/// # Ok(())
/// # }
/// ```
pub struct ApplicationBuilder {
    state: HostState,
    environment: WebHostEnvironment,
    inner: DefaultHostBuilder,
}

impl ApplicationBuilder {
    /// Run the bootstrap for `options`.
    ///
    /// # Errors
    ///
    /// Fails if a default source cannot be loaded, e.g. a malformed
    /// `appsettings.json` or command line.
    pub fn new(options: ApplicationOptions) -> Result<Self> {
        let mut services = ServiceCollection::new();
        let mut inner = DefaultHostBuilder::new();

        let (mut context, bootstrap_configuration) = {
            let mut bootstrap = BootstrapHostBuilder::new(&mut services);
            add_defaults(&mut bootstrap, &options)?;
            bootstrap.run_default_callbacks(&mut inner)?
        };

        let configuration = ConfigurationManager::new();
        configuration.properties().insert(
            BASE_PATH_PROPERTY,
            context.environment().content_root_path().display().to_string(),
        )?;
        configuration.add_source(ChainedSource::new(Arc::new(bootstrap_configuration)).should_dispose(true))?;
        context.set_configuration(configuration);

        let environment = WebHostEnvironment::from_configuration(context.environment().clone(), context.configuration());
        tracing::debug!(
            application = environment.application_name(),
            environment = environment.environment_name(),
            content_root = %environment.content_root_path().display(),
            "application builder ready"
        );

        Ok(Self {
            state: HostState::new(context, services),
            environment,
            inner,
        })
    }

    /// The live application configuration.
    pub fn configuration(&self) -> &ConfigurationManager {
        self.state.context.configuration()
    }

    /// The environment fixed by the bootstrap.
    pub fn environment(&self) -> &WebHostEnvironment {
        &self.environment
    }

    /// Services registered so far.
    pub fn services(&mut self) -> &mut ServiceCollection {
        &mut self.state.services
    }

    /// Host facade: callbacks run now, identity changes fail.
    pub fn host(&mut self) -> ConfigureHostBuilder<'_> {
        ConfigureHostBuilder::new(&mut self.state)
    }

    /// Web host facade: like [`host`](Self::host), also guarding the web root.
    pub fn web_host(&mut self) -> ConfigureWebHostBuilder<'_> {
        ConfigureWebHostBuilder::new(&mut self.state, &self.environment)
    }

    /// Build the application.
    ///
    /// Registers the configuration and environments as services, replays
    /// queued factory and container calls, then builds the host.
    ///
    /// # Errors
    ///
    /// Propagates failures of queued calls and of the service provider factory.
    pub fn build(self) -> Result<Application> {
        let Self {
            state,
            environment,
            mut inner,
        } = self;
        let HostState {
            context,
            mut services,
            operations,
        } = state;

        services
            .add_singleton(context.configuration().clone())
            .add_singleton(environment.clone());
        for operation in operations {
            operation(&mut inner)?;
        }

        let host = inner.build_from_parts(context, services)?;
        Ok(Application { host, environment })
    }
}

/// A built application.
#[derive(Debug, Clone)]
pub struct Application {
    host: Host,
    environment: WebHostEnvironment,
}

impl Application {
    /// The final configuration.
    pub fn configuration(&self) -> &ConfigurationManager {
        self.host.configuration()
    }

    /// The web hosting environment.
    pub fn environment(&self) -> &WebHostEnvironment {
        &self.environment
    }

    /// The built services.
    pub fn services(&self) -> &ServiceProvider {
        self.host.services()
    }

    /// The underlying host.
    pub fn host(&self) -> &Host {
        &self.host
    }
}
