//! Error types for layered-config.

/// Result type alias for layered-config operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that can occur when composing configuration or bootstrapping a host.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A value was written before any provider was registered.
    #[error("A configuration source is not registered. Please register one before setting a value.")]
    NoSourceRegistered,

    /// A required section has neither a value nor children.
    #[error("Section '{0}' not found in configuration.")]
    SectionNotFound(String),

    /// `build` was called on a builder that only exists to collect callbacks.
    #[error("{0} cannot be built directly. Build the application builder instead.")]
    BuildNotSupported(&'static str),

    /// The real host builder was asked to build a second time.
    #[error("Build can only be called once.")]
    HostAlreadyBuilt,

    /// A host identity setting changed after bootstrap.
    #[error(
        "The {setting} changed from \"{from}\" to \"{to}\". Changing the host configuration \
         after bootstrap is not supported. Use ApplicationOptions instead."
    )]
    IdentityChanged {
        /// Human readable name of the setting
        setting: &'static str,
        /// Value observed when bootstrap completed
        from: String,
        /// Value the callback tried to install
        to: String,
    },

    /// A container callback was registered for a different container type.
    #[error("Container callback expects '{expected}' but the service provider factory builds '{actual}'")]
    ContainerTypeMismatch {
        /// Container type the callback was written against
        expected: &'static str,
        /// Container type produced by the active factory
        actual: &'static str,
    },

    /// A required service was never registered.
    #[error("No service of type '{0}' has been registered.")]
    ServiceNotFound(&'static str),

    /// Failed to load configuration from a source.
    #[error("Failed to load configuration: {0}")]
    LoadError(String),

    /// Failed to parse configuration input.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Failed to deserialize configuration into a typed value.
    #[error("Failed to deserialize configuration: {0}")]
    DeserializationError(String),

    /// File watching failed to initialize.
    #[error("File watching error: {0}")]
    WatchError(String),

    /// IO error occurred.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Generic error for other cases.
    #[error("Configuration error: {0}")]
    Other(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        match err {
            config::ConfigError::NotFound(key) => ConfigError::LoadError(format!("missing key '{}'", key)),
            config::ConfigError::Foreign(inner) => ConfigError::ParseError(inner.to_string()),
            other => ConfigError::DeserializationError(other.to_string()),
        }
    }
}
