//! # layered-config
//!
//! Layered, reload-aware configuration composition with a two-phase host bootstrap.
//!
//! ## Overview
//!
//! `layered-config` composes configuration from an ordered list of sources:
//! - Later sources win: reads walk providers from last-added to first-added
//! - Writes fan out to every provider
//! - Appending a source is cheap; any other change rebuilds every provider
//! - Single-use reload tokens signal that the composed view changed
//! - Keys are `:`-delimited paths compared case-insensitively
//!
//! On top of that, the [`host`] module runs a bootstrap phase that fixes the
//! environment, application name and content root before the application
//! configuration is read, and rejects later attempts to change them.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use layered_config::prelude::*;
//! use serde::Deserialize;
//!
//! #[derive(Debug, Deserialize)]
//! struct ServerConfig {
//!     host: String,
//!     port: u16,
//! }
//!
//! # fn example() -> layered_config::error::Result<()> {
//! let config = ConfigurationManager::new();
//! config
//!     .add_source(FileSource::new("appsettings.json").optional(true))?
//!     .add_source(EnvSource::new("APP"))?
//!     .add_source(CommandLineSource::from_env())?;
//!
//! // Last source wins
//! let port = config.get("server:port");
//!
//! // Typed view of a subtree
//! let server: ServerConfig = config.get_section("server").bind()?;
//! println!("{}:{} ({:?})", server.host, server.port, port);
//!
//! // React to every change of the composed view
//! let watched = config.clone();
//! let _subscription = on_change(move || Some(watched.reload_token()), || println!("configuration changed"));
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - `file-watch` (default): reload file sources when the file changes
//! - `metrics`: OpenTelemetry counters for source additions, rebuilds and reloads
//!
//! ```toml
//! [dependencies]
//! layered-config = { version = "0.1", features = ["metrics"] }
//! ```

#![warn(missing_docs, rust_2024_compatibility)]
#![deny(unsafe_code)]

pub mod core;
pub mod error;
pub mod host;
pub mod notify;
pub mod sources;

#[cfg(feature = "metrics")]
pub mod metrics;

/// Convenient re-exports for common usage patterns.
pub mod prelude {
    pub use crate::core::{
        Configuration, ConfigurationExt, ConfigurationManager, ConfigurationRoot, ConfigurationSection,
    };
    pub use crate::error::{ConfigError, Result};
    pub use crate::notify::{ChangeSubscription, ReloadToken, on_change};
    pub use crate::sources::{
        ChainedSource, CommandLineSource, ConfigurationProvider, ConfigurationSource, EnvSource, FileSource,
        MemorySource, ProviderSource,
    };
}
