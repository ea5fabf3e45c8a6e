//! Hosting: environment, services and the two-phase builder protocol.
//!
//! [`ApplicationBuilder`] runs a [`BootstrapHostBuilder`] to fix the host
//! identity early, then hands out [`ConfigureHostBuilder`] and
//! [`ConfigureWebHostBuilder`] facades whose callbacks run immediately.
//! [`DefaultHostBuilder`] is the real builder both phases feed into.

mod application;
mod bootstrap;
mod builder;
mod configure;
pub mod defaults;
mod environment;
mod services;

pub use application::{Application, ApplicationBuilder, ApplicationOptions};
pub use bootstrap::BootstrapHostBuilder;
pub use builder::{DefaultHostBuilder, Host, HostBuilder};
pub use configure::{ConfigureHostBuilder, ConfigureWebHostBuilder};
pub use defaults::Environments;
pub use environment::{HostBuilderContext, HostEnvironment, PhysicalFileProvider, WebHostEnvironment};
pub use services::{DefaultServiceProviderFactory, ServiceCollection, ServiceProvider, ServiceProviderFactory};
