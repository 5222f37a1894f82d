//! CLI interface and argument parsing
//!
//! This module handles command-line parsing, task listing and shell
//! completion, and hands task runs to the engine.

pub mod app;

// Re-export main types
pub use app::*;
