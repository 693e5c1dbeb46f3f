//! Terminal output helpers for the CLI

pub mod progress;
pub mod styling;

pub use progress::*;
pub use styling::*;
