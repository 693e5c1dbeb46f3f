//! Training and model persistence

use std::fs;
use std::path::Path;

use log::info;
use ndarray::Array2;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use super::{frame_to_matrix, labels_from_frame, Classifier};
use crate::error::{ChurnError, Result};
use crate::pipeline::columns::column_names;

/// A fitted classifier together with the feature order it was trained on
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub classifier: Classifier,
    pub feature_columns: Vec<String>,
    pub target: String,
    pub train_accuracy: f64,
}

impl ModelArtifact {
    /// Select the feature columns in training order as a dense matrix
    pub fn feature_matrix(&self, df: &DataFrame) -> Result<Array2<f64>> {
        frame_to_matrix(df, &self.feature_columns)
    }

    /// Churn probability per row of `df`
    pub fn predict_proba(&self, df: &DataFrame) -> Result<Vec<f64>> {
        let x = self.feature_matrix(df)?;
        Ok(self.classifier.predict_proba(&x)?.to_vec())
    }
}

/// Fits classifiers and persists them
#[derive(Debug, Clone, Default)]
pub struct ModelTrainer;

impl ModelTrainer {
    pub fn new() -> Self {
        Self
    }

    /// Fit `model` on the training split.
    ///
    /// Returns the artifact and its accuracy on the training rows. The feature
    /// order is taken from `x_train`; `y_train` holds the single target column.
    pub fn train(
        &self,
        mut model: Classifier,
        x_train: &DataFrame,
        y_train: &DataFrame,
    ) -> Result<(ModelArtifact, f64)> {
        if x_train.height() != y_train.height() {
            return Err(ChurnError::InvalidRecord(format!(
                "training features have {} rows but labels have {}",
                x_train.height(),
                y_train.height()
            )));
        }
        let target = column_names(y_train)
            .into_iter()
            .next()
            .ok_or_else(|| ChurnError::InvalidRecord("label frame has no columns".to_string()))?;

        let feature_columns = column_names(x_train);
        let x = frame_to_matrix(x_train, &feature_columns)?;
        let y = labels_from_frame(y_train, &target)?;

        info!(
            "Training {} on {} rows x {} features",
            model.kind(),
            x.nrows(),
            x.ncols()
        );
        model.fit(&x, &y)?;

        let predictions = model.predict(&x)?;
        let correct = predictions
            .iter()
            .zip(y.iter())
            .filter(|(p, t)| p == t)
            .count();
        let accuracy = correct as f64 / y.len() as f64;
        info!("Training accuracy: {:.4}", accuracy);

        let artifact = ModelArtifact {
            classifier: model,
            feature_columns,
            target,
            train_accuracy: accuracy,
        };
        Ok((artifact, accuracy))
    }

    pub fn save_model(&self, artifact: &ModelArtifact, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string(artifact)?)?;
        info!("Model saved to {}", path.display());
        Ok(())
    }

    pub fn load_model(&self, path: &Path) -> Result<ModelArtifact> {
        if !path.exists() {
            return Err(ChurnError::MissingArtifact(path.to_path_buf()));
        }
        let text = fs::read_to_string(path)?;
        let artifact: ModelArtifact = serde_json::from_str(&text)?;
        if !artifact.classifier.is_fitted() {
            return Err(ChurnError::NotFitted("persisted model"));
        }
        Ok(artifact)
    }
}
