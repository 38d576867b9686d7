//! Configuration loading and dependency wiring types.

mod settings;

pub use settings::{
    ConfigError, Credentials, Environment, FeedConfig, RefreshSettings, StreamSettings,
};
