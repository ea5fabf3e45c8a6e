//! Built-in metrics for configuration operations.
//!
//! Provides OpenTelemetry metrics tracking:
//! - Source additions and full provider rebuilds
//! - Reload attempts, failures and duration
//! - Change notifications
//! - Live provider count
//!
//! # Examples
//!
//! ```rust,no_run
//! use layered_config::prelude::*;
//! use layered_config::metrics::ConfigMetrics;
//! use opentelemetry::global;
//!
//! # fn example() -> Result<()> {
//! let meter = global::meter("my-app");
//!
//! let config = ConfigurationManager::new().with_metrics(ConfigMetrics::new(meter));
//! config.add_source(FileSource::new("appsettings.json").optional(true))?;
//! # Ok(())
//! # }
//! ```

mod config_metrics;

pub use config_metrics::ConfigMetrics;
