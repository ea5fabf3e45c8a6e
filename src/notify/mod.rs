//! Configuration change notification system.
//!
//! Provides single-use reload tokens, long-lived subscriptions that follow a
//! token chain, and (with `file-watch`) debounced file watching.

pub mod subscriber;
pub mod token;
#[cfg(feature = "file-watch")]
pub mod watcher;

pub use subscriber::{ChangeSubscription, on_change};
pub use token::{ChangeRegistration, ReloadToken, TokenState};
#[cfg(feature = "file-watch")]
pub use watcher::ConfigWatcher;
