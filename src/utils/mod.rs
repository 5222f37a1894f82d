//! Small helpers shared across modules

pub mod suggest;

pub use suggest::*;
