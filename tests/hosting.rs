//! Integration tests for the bootstrap and post-bootstrap host builders.

use layered_config::host::{
    ApplicationBuilder, ApplicationOptions, BootstrapHostBuilder, DefaultHostBuilder, HostBuilder,
    ServiceCollection, ServiceProvider, ServiceProviderFactory,
};
use layered_config::prelude::*;
use std::fs;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;

fn options(root: &TempDir) -> ApplicationOptions {
    ApplicationOptions::new()
        .content_root_path(root.path())
        .env_vars(Vec::<(String, String)>::new())
        .reload_config_on_change(false)
}

#[test]
fn test_environment_cannot_change_after_bootstrap() {
    let root = TempDir::new().unwrap();
    let mut builder = ApplicationBuilder::new(options(&root).environment_name("Development")).unwrap();
    assert!(builder.environment().is_development());

    let result = builder
        .host()
        .configure_host_configuration(|config| {
            config.add_source(MemorySource::new([("environment", "Staging")]))?;
            Ok(())
        })
        .map(|_| ());

    match result {
        Err(ConfigError::IdentityChanged { setting, from, to }) => {
            assert_eq!(setting, "environment");
            assert_eq!(from, "Development");
            assert_eq!(to, "Staging");
        }
        Err(other) => panic!("unexpected error: {other}"),
        Ok(()) => panic!("environment change was accepted"),
    }
    assert!(builder.environment().is_development());

    let app = builder.build().unwrap();
    assert!(app.environment().is_development());
}

#[test]
fn test_application_name_and_content_root_are_guarded() {
    let root = TempDir::new().unwrap();
    let mut builder = ApplicationBuilder::new(options(&root).application_name("demo")).unwrap();

    let renamed = builder
        .host()
        .configure_app_configuration(|_, config| {
            config.add_source(MemorySource::new([("applicationName", "other")]))?;
            Ok(())
        })
        .map(|_| ());
    assert!(matches!(
        renamed,
        Err(ConfigError::IdentityChanged { setting: "application name", .. })
    ));

    let moved = builder
        .web_host()
        .configure_app_configuration(|_, config| {
            config.add_source(MemorySource::new([("contentRoot", "/somewhere/else")]))?;
            Ok(())
        })
        .map(|_| ());
    assert!(matches!(
        moved,
        Err(ConfigError::IdentityChanged { setting: "content root", .. })
    ));
}

#[test]
fn test_facade_callbacks_run_immediately_in_order() {
    let root = TempDir::new().unwrap();
    let mut builder = ApplicationBuilder::new(options(&root)).unwrap();
    let order = Arc::new(Mutex::new(Vec::new()));

    let (o1, o2) = (Arc::clone(&order), Arc::clone(&order));
    builder
        .host()
        .configure_services(move |_, services| {
            o1.lock().unwrap().push("services");
            services.add_singleton(3u8);
            Ok(())
        })
        .unwrap()
        .configure_app_configuration(move |_, config| {
            o2.lock().unwrap().push("app");
            config.add_source(MemorySource::new([("Feature:Enabled", "true")]))?;
            Ok(())
        })
        .unwrap();

    assert_eq!(*order.lock().unwrap(), vec!["services", "app"]);
    assert_eq!(builder.configuration().get("feature:enabled").as_deref(), Some("true"));
    assert!(builder.services().contains::<u8>());
}

#[test]
fn test_facades_cannot_be_built() {
    let root = TempDir::new().unwrap();
    let mut builder = ApplicationBuilder::new(options(&root)).unwrap();
    assert!(matches!(
        builder.host().build(),
        Err(ConfigError::BuildNotSupported("ConfigureHostBuilder"))
    ));

    let mut services = ServiceCollection::new();
    let mut bootstrap = BootstrapHostBuilder::new(&mut services);
    assert!(matches!(
        bootstrap.build(),
        Err(ConfigError::BuildNotSupported("BootstrapHostBuilder"))
    ));
}

#[test]
fn test_use_setting_and_get_setting() {
    let root = TempDir::new().unwrap();
    let mut builder = ApplicationBuilder::new(options(&root).environment_name("Staging")).unwrap();

    let mut web = builder.web_host();
    web.use_setting("Detailed:Errors", "true").unwrap();
    web.use_setting("environment", "staging").unwrap();
    assert_eq!(web.get_setting("detailed:errors").as_deref(), Some("true"));
    assert!(matches!(
        web.use_setting("Environment", "Production"),
        Err(ConfigError::IdentityChanged { .. })
    ));

    assert_eq!(builder.configuration().get("DETAILED:ERRORS").as_deref(), Some("true"));
}

#[derive(Default)]
struct TaggingContainer {
    services: ServiceCollection,
    tags: Vec<&'static str>,
}

struct TaggingFactory;

impl ServiceProviderFactory for TaggingFactory {
    type Container = TaggingContainer;

    fn create_builder(&self, services: ServiceCollection) -> TaggingContainer {
        TaggingContainer {
            services,
            tags: Vec::new(),
        }
    }

    fn create_service_provider(&self, mut container: TaggingContainer) -> Result<ServiceProvider> {
        let tags = std::mem::take(&mut container.tags);
        container.services.add_singleton(tags);
        Ok(container.services.build_service_provider())
    }
}

#[test]
fn test_factory_and_container_calls_apply_at_build() {
    let root = TempDir::new().unwrap();
    let mut builder = ApplicationBuilder::new(options(&root)).unwrap();

    builder
        .host()
        .use_service_provider_factory(TaggingFactory)
        .unwrap()
        .configure_container(|context, container: &mut TaggingContainer| {
            assert!(context.environment().is_production());
            container.tags.push("first");
            Ok(())
        })
        .unwrap()
        .configure_container(|_, container: &mut TaggingContainer| {
            container.tags.push("second");
            Ok(())
        })
        .unwrap();

    let app = builder.build().unwrap();
    let tags = app.services().get::<Vec<&'static str>>().unwrap();
    assert_eq!(*tags, vec!["first", "second"]);
}

#[test]
fn test_container_type_mismatch_fails_build() {
    let root = TempDir::new().unwrap();
    let mut builder = ApplicationBuilder::new(options(&root)).unwrap();
    builder
        .host()
        .configure_container(|_, _: &mut TaggingContainer| Ok(()))
        .unwrap();

    assert!(matches!(
        builder.build(),
        Err(ConfigError::ContainerTypeMismatch { .. })
    ));
}

#[test]
fn test_bootstrap_order_and_separation() {
    let mut services = ServiceCollection::new();
    let mut inner = DefaultHostBuilder::new();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let (s1, s2, s3) = (Arc::clone(&seen), Arc::clone(&seen), Arc::clone(&seen));
    let mut bootstrap = BootstrapHostBuilder::new(&mut services);
    bootstrap
        .configure_app_configuration(move |context, config| {
            s2.lock().unwrap().push(format!("app:{}", context.environment().environment_name()));
            config.add_source(MemorySource::new([("environment", "Staging")]))?;
            Ok(())
        })
        .unwrap()
        .configure_host_configuration(move |config| {
            s1.lock().unwrap().push("host".to_string());
            config.add_source(MemorySource::new([("environment", "Development")]))?;
            Ok(())
        })
        .unwrap()
        .configure_services(move |context, _| {
            s3.lock()
                .unwrap()
                .push(format!("services:{}", context.configuration().get("environment").unwrap_or_default()));
            Ok(())
        })
        .unwrap();

    let (context, configuration) = bootstrap.run_default_callbacks(&mut inner).unwrap();

    assert_eq!(
        *seen.lock().unwrap(),
        vec!["host", "app:Development", "services:Staging"]
    );
    // The app callback wrote to the app configuration, not the host identity.
    assert!(context.environment().is_development());
    assert_eq!(configuration.get("environment").as_deref(), Some("Staging"));
}

#[test]
fn test_default_wiring_reads_files_env_and_args() {
    let root = TempDir::new().unwrap();
    fs::write(
        root.path().join("appsettings.json"),
        r#"{"Logging": {"Level": "info"}, "Name": "base", "Hosts": ["a", "b"]}"#,
    )
    .unwrap();
    fs::write(
        root.path().join("appsettings.Staging.json"),
        r#"{"Logging": {"Level": "warn"}}"#,
    )
    .unwrap();

    let builder = ApplicationBuilder::new(
        options(&root)
            .env_vars([("HOST_ENVIRONMENT", "Staging"), ("NAME", "from-env")])
            .args(["--Hosts:1=c"]),
    )
    .unwrap();

    let configuration = builder.configuration();
    assert!(builder.environment().is_staging());
    assert_eq!(configuration.get("logging:level").as_deref(), Some("warn"));
    assert_eq!(configuration.get("name").as_deref(), Some("from-env"));
    assert_eq!(configuration.get("hosts:0").as_deref(), Some("a"));
    assert_eq!(configuration.get("hosts:1").as_deref(), Some("c"));

    let hosts: Vec<String> = configuration.get_section("hosts").bind().unwrap();
    assert_eq!(hosts, vec!["a", "c"]);
}

#[test]
fn test_web_root_from_options() {
    let root = TempDir::new().unwrap();
    fs::create_dir(root.path().join("public")).unwrap();

    let builder = ApplicationBuilder::new(options(&root).web_root_path("public")).unwrap();
    let environment = builder.environment();
    assert_eq!(environment.web_root_path(), Some(root.path().join("public").as_path()));
    assert!(environment.web_root_file_provider().is_some());
}
