//! Model module - classifier construction, training, evaluation
//!
//! A [`ModelBuilder`] produces an untrained [`Classifier`] from the configured
//! hyperparameters. [`ModelTrainer`] fits it and persists a [`ModelArtifact`]
//! that pins the feature column order; [`ModelEvaluator`] scores it on the
//! held-out split.

pub mod boosting;
pub mod evaluation;
pub mod forest;
pub mod trainer;
pub mod tree;

use ndarray::{Array1, Array2};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::{ModelConfig, ModelKind};
use crate::error::{ChurnError, Result};
use crate::pipeline::columns::numeric_values;

pub use boosting::GradientBoosting;
pub use evaluation::{ConfusionMatrix, EvaluationReport, ModelEvaluator};
pub use forest::RandomForest;
pub use trainer::{ModelArtifact, ModelTrainer};

/// Probability at or above which a row is labelled as churn
pub const DECISION_THRESHOLD: f64 = 0.5;

/// A binary classifier producing churn probabilities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum Classifier {
    RandomForest(RandomForest),
    GradientBoosting(GradientBoosting),
}

impl Classifier {
    pub fn kind(&self) -> ModelKind {
        match self {
            Classifier::RandomForest(_) => ModelKind::RandomForest,
            Classifier::GradientBoosting(_) => ModelKind::GradientBoosting,
        }
    }

    pub fn is_fitted(&self) -> bool {
        match self {
            Classifier::RandomForest(model) => model.is_fitted(),
            Classifier::GradientBoosting(model) => model.is_fitted(),
        }
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        match self {
            Classifier::RandomForest(model) => model.fit(x, y),
            Classifier::GradientBoosting(model) => model.fit(x, y),
        }
    }

    /// Positive-class (churn) probability per row
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        match self {
            Classifier::RandomForest(model) => model.predict_proba(x),
            Classifier::GradientBoosting(model) => model.predict_proba(x),
        }
    }

    /// 0/1 labels at [`DECISION_THRESHOLD`]
    pub fn predict(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        Ok(self
            .predict_proba(x)?
            .mapv(|p| if p >= DECISION_THRESHOLD { 1.0 } else { 0.0 }))
    }
}

/// Builds an untrained classifier
pub trait ModelBuilder {
    fn name(&self) -> &'static str;
    fn build(&self) -> Classifier;
}

/// Tree ensemble (bagging)
pub struct RandomForestBuilder {
    config: ModelConfig,
}

impl RandomForestBuilder {
    pub fn new(config: &ModelConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

impl ModelBuilder for RandomForestBuilder {
    fn name(&self) -> &'static str {
        "random forest"
    }

    fn build(&self) -> Classifier {
        Classifier::RandomForest(RandomForest::new(&self.config))
    }
}

/// Gradient-boosted trees
pub struct GradientBoostingBuilder {
    config: ModelConfig,
}

impl GradientBoostingBuilder {
    pub fn new(config: &ModelConfig) -> Self {
        Self {
            config: config.clone(),
        }
    }
}

impl ModelBuilder for GradientBoostingBuilder {
    fn name(&self) -> &'static str {
        "gradient boosting"
    }

    fn build(&self) -> Classifier {
        Classifier::GradientBoosting(GradientBoosting::new(&self.config))
    }
}

/// Pick the builder for the configured model kind
pub fn builder_for(config: &ModelConfig) -> Box<dyn ModelBuilder> {
    match config.kind {
        ModelKind::RandomForest => Box::new(RandomForestBuilder::new(config)),
        ModelKind::GradientBoosting => Box::new(GradientBoostingBuilder::new(config)),
    }
}

/// Dense row-major feature matrix from the named columns, in order.
///
/// Every value must be present; nulls are a schema error.
pub fn frame_to_matrix(df: &DataFrame, columns: &[String]) -> Result<Array2<f64>> {
    let mut matrix = Array2::zeros((df.height(), columns.len()));

    for (j, name) in columns.iter().enumerate() {
        let values = numeric_values(df, name)?;
        for (i, value) in values.into_iter().enumerate() {
            matrix[[i, j]] = value.ok_or_else(|| {
                ChurnError::schema(name, format!("null feature value in row {}", i))
            })?;
        }
    }

    Ok(matrix)
}

/// 0/1 label vector from a single-column (or named) target frame
pub fn labels_from_frame(df: &DataFrame, target: &str) -> Result<Array1<f64>> {
    let labels = numeric_values(df, target)?
        .into_iter()
        .enumerate()
        .map(|(i, value)| match value {
            Some(v) if v == 0.0 || v == 1.0 => Ok(v),
            other => Err(ChurnError::schema(
                target,
                format!("label in row {} must be 0 or 1, found {:?}", i, other),
            )),
        })
        .collect::<Result<Vec<f64>>>()?;
    Ok(Array1::from_vec(labels))
}
