//! Presentation of engine log events
//!
//! The engine only builds structured [`LogEvent`]s; reporters decide how
//! (and whether) to show them.

pub mod reporter;

// Re-export main types
pub use reporter::*;
