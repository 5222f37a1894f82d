//! Configuration parsing and validation
//!
//! This module handles discovery and parsing of devflow's TOML configuration
//! and its conversion into a task registry.

pub mod parse;
pub mod schema;
pub mod types;

// Re-export main types
pub use parse::*;
pub use schema::*;
pub use types::*;
