//! Configuration source implementations.

mod chained;
mod command_line;
mod config_source;
mod env;
mod file;
mod memory;

pub use chained::{ChainedProvider, ChainedSource, ProviderSource};
pub use command_line::{CommandLineProvider, CommandLineSource};
pub use config_source::{
    BASE_PATH_PROPERTY, BuildContext, ConfigurationProvider, ConfigurationSource, ProviderData,
};
pub use env::{EnvProvider, EnvSource};
pub use file::{FileProvider, FileSource};
pub use memory::{MemoryProvider, MemorySource};
