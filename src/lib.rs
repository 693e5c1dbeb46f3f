//! churnkit: Customer Churn Prediction Library
//!
//! A feature-transformation, training and inference pipeline for tabular
//! churn data. The same fitted transformation chain (binning, encoding,
//! scaling, identifier pruning) runs at training time and at inference time.

pub mod cli;
pub mod config;
pub mod error;
pub mod inference;
pub mod model;
pub mod pipeline;
pub mod report;
pub mod service;
pub mod utils;
pub mod workflow;

pub use config::PipelineConfig;
pub use error::{ChurnError, Result};
pub use inference::{ChurnPredictor, ChurnStatus, Prediction, RawRecord};
pub use service::PredictionService;
