//! Infrastructure layer: configuration loading.

pub mod config;

pub use config::{Config, ConfigError};
