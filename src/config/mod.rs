//! Configuration management
//!
//! Runtime configuration sourced from environment variables, shared through
//! a process-wide handle.

pub mod settings;

pub use settings::{Config, GLOBAL_CONFIG};
