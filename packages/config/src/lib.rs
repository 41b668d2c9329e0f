// ABOUTME: Shared configuration for the Sandcraft workspace
// ABOUTME: Environment variable names, defaults and the typed Config loaded from the environment

pub mod config;
pub mod constants;

pub use config::{Config, ConfigError};
