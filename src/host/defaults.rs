//! Well-known host configuration keys and environment names.

/// Key holding the application name.
pub const APPLICATION_KEY: &str = "applicationName";

/// Key holding the environment name.
pub const ENVIRONMENT_KEY: &str = "environment";

/// Key holding the content root path.
pub const CONTENT_ROOT_KEY: &str = "contentRoot";

/// Key holding the web root path, relative to the content root.
pub const WEB_ROOT_KEY: &str = "webroot";

/// Key holding the `;`-separated hosting startup assemblies.
pub const HOSTING_STARTUP_ASSEMBLIES_KEY: &str = "hostingStartupAssemblies";

/// Key holding the `;`-separated hosting startup assemblies to skip.
pub const HOSTING_STARTUP_EXCLUDE_ASSEMBLIES_KEY: &str = "hostingStartupExcludeAssemblies";

/// Prefix of the environment variables read into host configuration.
pub const HOST_ENV_PREFIX: &str = "HOST";

/// Directory used as web root when none is configured and it exists.
pub const DEFAULT_WEB_ROOT: &str = "wwwroot";

/// Standard environment names.
pub struct Environments;

impl Environments {
    /// Local development.
    pub const DEVELOPMENT: &'static str = "Development";
    /// Pre-production.
    pub const STAGING: &'static str = "Staging";
    /// The default when nothing is configured.
    pub const PRODUCTION: &'static str = "Production";
}

/// Identity keys guarded after bootstrap, with their display names.
pub(crate) const HOST_IDENTITY_KEYS: [(&str, &str); 3] = [
    (APPLICATION_KEY, "application name"),
    (ENVIRONMENT_KEY, "environment"),
    (CONTENT_ROOT_KEY, "content root"),
];

/// Identity keys guarded on the web host facade in addition to the host ones.
pub(crate) const WEB_IDENTITY_KEYS: [(&str, &str); 3] = [
    (WEB_ROOT_KEY, "web root"),
    (HOSTING_STARTUP_ASSEMBLIES_KEY, "hosting startup assemblies"),
    (HOSTING_STARTUP_EXCLUDE_ASSEMBLIES_KEY, "hosting startup exclude assemblies"),
];
