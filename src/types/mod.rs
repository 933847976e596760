//! Component Types
//!
//! Core type definitions for component credential operations.

pub mod api;
pub mod config;
pub mod credential;

pub use api::*;
pub use config::*;
pub use credential::*;
