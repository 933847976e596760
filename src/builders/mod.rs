//! Builders
//!
//! Fluent builder patterns for component configuration.

pub mod config;

pub use config::{component_config, ComponentConfigBuilder};
