//! Task resolution and execution engine
//!
//! This module turns a requested task name into an ordered plan of command
//! steps and runs that plan.

pub mod command;
pub mod context;
pub mod engine;
pub mod env;
pub mod executor;
pub mod resolve;
pub mod task;

// Re-export main types
pub use command::*;
pub use context::*;
pub use engine::*;
pub use env::*;
pub use executor::*;
pub use resolve::*;
pub use task::*;
