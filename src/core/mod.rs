//! Core configuration management types.

mod binder;
mod collections;
mod manager;
pub mod path;
mod section;

pub use collections::{Properties, Sources};
pub use manager::ConfigurationManager;
pub use section::{Configuration, ConfigurationExt, ConfigurationRoot, ConfigurationSection};
