//! Report module - preparation and evaluation summaries

pub mod summary;

pub use summary::*;
