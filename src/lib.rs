//! devflow - named project tasks and pipelines
//!
//! devflow replaces ad-hoc project scripts with tasks declared in
//! `pyproject.toml` or `devflow.toml`. A task is either a single command or a
//! pipeline of other tasks; pipelines are expanded into an ordered plan and
//! run step by step, stopping at the first failure.

// Public modules
pub mod cli;
pub mod config;
pub mod error;
pub mod runner;
pub mod ui;
pub mod utils;

// Re-export commonly used types
pub use error::{DevflowError, Result};

/// Current version of devflow
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
