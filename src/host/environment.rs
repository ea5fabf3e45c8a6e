//! Hosting environment records derived from host configuration.

use super::defaults::{
    APPLICATION_KEY, CONTENT_ROOT_KEY, DEFAULT_WEB_ROOT, ENVIRONMENT_KEY, Environments, WEB_ROOT_KEY,
};
use crate::core::{Configuration, ConfigurationManager};
use crate::error::Result;
use std::path::{Path, PathBuf};

/// Read-only access to files below a root directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhysicalFileProvider {
    root: PathBuf,
}

impl PhysicalFileProvider {
    /// Serve files below `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Full path of `subpath` if it exists and stays below the root.
    pub fn resolve(&self, subpath: impl AsRef<Path>) -> Option<PathBuf> {
        let subpath = subpath.as_ref();
        if subpath.is_absolute()
            || subpath
                .components()
                .any(|c| matches!(c, std::path::Component::ParentDir))
        {
            return None;
        }
        let full = self.root.join(subpath);
        full.exists().then_some(full)
    }

    /// Whether `subpath` exists below the root.
    pub fn exists(&self, subpath: impl AsRef<Path>) -> bool {
        self.resolve(subpath).is_some()
    }
}

/// Identity of the running host: who, where and in which environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostEnvironment {
    application_name: String,
    environment_name: String,
    content_root_path: PathBuf,
    content_root_file_provider: PhysicalFileProvider,
}

impl HostEnvironment {
    /// Derive the environment from host configuration.
    ///
    /// Missing values default to the executable name, `Production` and the
    /// current directory. A relative content root is resolved against the
    /// current directory.
    ///
    /// # Errors
    ///
    /// Fails if the current directory cannot be determined.
    pub fn from_configuration(configuration: &dyn Configuration) -> Result<Self> {
        let non_empty = |key: &str| configuration.get(key).filter(|value| !value.is_empty());

        let application_name = non_empty(APPLICATION_KEY).unwrap_or_else(default_application_name);
        let environment_name =
            non_empty(ENVIRONMENT_KEY).unwrap_or_else(|| Environments::PRODUCTION.to_string());

        let current_dir = std::env::current_dir()?;
        let content_root_path = match non_empty(CONTENT_ROOT_KEY) {
            Some(root) => current_dir.join(root),
            None => current_dir,
        };

        Ok(Self::new(application_name, environment_name, content_root_path))
    }

    /// Create an environment record.
    pub fn new(
        application_name: impl Into<String>,
        environment_name: impl Into<String>,
        content_root_path: impl Into<PathBuf>,
    ) -> Self {
        let content_root_path = content_root_path.into();
        Self {
            application_name: application_name.into(),
            environment_name: environment_name.into(),
            content_root_file_provider: PhysicalFileProvider::new(content_root_path.clone()),
            content_root_path,
        }
    }

    /// The application name.
    pub fn application_name(&self) -> &str {
        &self.application_name
    }

    /// The environment name, e.g. `Development`.
    pub fn environment_name(&self) -> &str {
        &self.environment_name
    }

    /// Absolute path of the content root.
    pub fn content_root_path(&self) -> &Path {
        &self.content_root_path
    }

    /// File access below the content root.
    pub fn content_root_file_provider(&self) -> &PhysicalFileProvider {
        &self.content_root_file_provider
    }

    /// Whether the environment is `name`, ignoring case.
    pub fn is_environment(&self, name: &str) -> bool {
        self.environment_name.eq_ignore_ascii_case(name)
    }

    /// Whether the environment is `Development`.
    pub fn is_development(&self) -> bool {
        self.is_environment(Environments::DEVELOPMENT)
    }

    /// Whether the environment is `Staging`.
    pub fn is_staging(&self) -> bool {
        self.is_environment(Environments::STAGING)
    }

    /// Whether the environment is `Production`.
    pub fn is_production(&self) -> bool {
        self.is_environment(Environments::PRODUCTION)
    }
}

fn default_application_name() -> String {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.file_stem().map(|stem| stem.to_string_lossy().into_owned()))
        .unwrap_or_else(|| "application".to_string())
}

/// Host environment plus the web root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WebHostEnvironment {
    host: HostEnvironment,
    web_root_path: Option<PathBuf>,
    web_root_file_provider: Option<PhysicalFileProvider>,
}

impl WebHostEnvironment {
    /// Add the web root to `host`.
    ///
    /// The configured web root is resolved against the content root. Without
    /// one, `wwwroot` is used when that directory exists.
    pub fn from_configuration(host: HostEnvironment, configuration: &dyn Configuration) -> Self {
        let web_root_path = match configuration.get(WEB_ROOT_KEY).filter(|v| !v.is_empty()) {
            Some(root) => Some(host.content_root_path().join(root)),
            None => host.content_root_file_provider().resolve(DEFAULT_WEB_ROOT),
        };
        let web_root_file_provider = web_root_path.clone().map(PhysicalFileProvider::new);
        Self {
            host,
            web_root_path,
            web_root_file_provider,
        }
    }

    /// The host part of the environment.
    pub fn host(&self) -> &HostEnvironment {
        &self.host
    }

    /// Absolute path of the web root, if there is one.
    pub fn web_root_path(&self) -> Option<&Path> {
        self.web_root_path.as_deref()
    }

    /// File access below the web root.
    pub fn web_root_file_provider(&self) -> Option<&PhysicalFileProvider> {
        self.web_root_file_provider.as_ref()
    }
}

impl std::ops::Deref for WebHostEnvironment {
    type Target = HostEnvironment;

    fn deref(&self) -> &HostEnvironment {
        &self.host
    }
}

/// What host callbacks can see: the environment and the live configuration.
#[derive(Debug, Clone)]
pub struct HostBuilderContext {
    environment: HostEnvironment,
    configuration: ConfigurationManager,
}

impl HostBuilderContext {
    pub(crate) fn new(environment: HostEnvironment, configuration: ConfigurationManager) -> Self {
        Self {
            environment,
            configuration,
        }
    }

    /// The hosting environment.
    pub fn environment(&self) -> &HostEnvironment {
        &self.environment
    }

    /// The configuration visible at this stage.
    pub fn configuration(&self) -> &ConfigurationManager {
        &self.configuration
    }

    pub(crate) fn set_configuration(&mut self, configuration: ConfigurationManager) {
        self.configuration = configuration;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::MemorySource;
    use std::fs;
    use tempfile::TempDir;

    fn configuration(data: &[(&str, &str)]) -> ConfigurationManager {
        let config = ConfigurationManager::new();
        config.add_source(MemorySource::new(data.iter().copied())).unwrap();
        config
    }

    #[test]
    fn test_defaults() {
        let environment = HostEnvironment::from_configuration(&configuration(&[])).unwrap();
        assert!(environment.is_production());
        assert_eq!(environment.content_root_path(), std::env::current_dir().unwrap());
        assert!(!environment.application_name().is_empty());
    }

    #[test]
    fn test_configured_values() {
        let temp_dir = TempDir::new().unwrap();
        let root = temp_dir.path().display().to_string();
        let environment = HostEnvironment::from_configuration(&configuration(&[
            ("applicationName", "demo"),
            ("Environment", "development"),
            ("contentRoot", root.as_str()),
        ]))
        .unwrap();

        assert_eq!(environment.application_name(), "demo");
        assert!(environment.is_development());
        assert_eq!(environment.content_root_path(), temp_dir.path());
        assert_eq!(environment.content_root_file_provider().root(), temp_dir.path());
    }

    #[test]
    fn test_file_provider_stays_below_root() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("a.json"), "{}").unwrap();
        let provider = PhysicalFileProvider::new(temp_dir.path());

        assert!(provider.exists("a.json"));
        assert!(!provider.exists("b.json"));
        assert!(!provider.exists("../a.json"));
    }

    #[test]
    fn test_web_root_defaults_to_existing_wwwroot() {
        let temp_dir = TempDir::new().unwrap();
        let host = HostEnvironment::new("demo", "Production", temp_dir.path());

        let without = WebHostEnvironment::from_configuration(host.clone(), &configuration(&[]));
        assert_eq!(without.web_root_path(), None);

        fs::create_dir(temp_dir.path().join("wwwroot")).unwrap();
        let with = WebHostEnvironment::from_configuration(host.clone(), &configuration(&[]));
        assert_eq!(with.web_root_path(), Some(temp_dir.path().join("wwwroot").as_path()));

        let custom = WebHostEnvironment::from_configuration(host, &configuration(&[("webroot", "public")]));
        assert_eq!(custom.web_root_path(), Some(temp_dir.path().join("public").as_path()));
        assert_eq!(custom.application_name(), "demo");
    }
}
