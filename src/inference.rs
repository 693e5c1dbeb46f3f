//! Single-record churn inference
//!
//! [`ChurnPredictor::load`] reads the manifest, every encoder it lists, the
//! scaler and the model once. [`ChurnPredictor::predict`] then only reads the
//! loaded state, so a predictor can be shared across threads behind an `Arc`.

use std::fmt;

use log::{debug, info};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{ColumnKind, ColumnSpec};
use crate::error::{ChurnError, Result};
use crate::model::{ModelArtifact, ModelTrainer, DECISION_THRESHOLD};
use crate::pipeline::{ArtifactLayout, Manifest, TransformChain};

/// A raw input record: flat JSON object keyed by column name
pub type RawRecord = serde_json::Map<String, Value>;

/// Predicted outcome
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChurnStatus {
    Churn,
    Retain,
}

impl fmt::Display for ChurnStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChurnStatus::Churn => write!(f, "Churn"),
            ChurnStatus::Retain => write!(f, "Retain"),
        }
    }
}

/// Inference response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prediction {
    pub status: ChurnStatus,
    /// Churn probability as a percentage with two decimals, e.g. `"73.41%"`
    pub confidence: String,
}

impl Prediction {
    pub fn from_probability(probability: f64) -> Self {
        let status = if probability >= DECISION_THRESHOLD {
            ChurnStatus::Churn
        } else {
            ChurnStatus::Retain
        };
        Self {
            status,
            confidence: format!("{:.2}%", probability * 100.0),
        }
    }
}

/// Loaded transformation state and model
#[derive(Debug, Clone)]
pub struct ChurnPredictor {
    input_schema: Vec<ColumnSpec>,
    chain: TransformChain,
    model: ModelArtifact,
}

impl ChurnPredictor {
    /// Load every artifact the predictor needs. Any missing file is fatal.
    pub fn load(layout: &ArtifactLayout) -> Result<Self> {
        let manifest = Manifest::load(layout)?;
        let chain = TransformChain::load(&manifest, layout)?;
        let model = ModelTrainer::new().load_model(&layout.model_path())?;

        if model.feature_columns != manifest.feature_columns {
            return Err(ChurnError::schema(
                &manifest.target,
                "model feature columns do not match the prepared data; retrain the model",
            ));
        }

        let input_schema = manifest.input_schema();

        info!(
            "Predictor loaded from {} ({} model, {} features, manifest {})",
            layout.root().display(),
            model.classifier.kind(),
            model.feature_columns.len(),
            manifest.created_at
        );

        Ok(Self {
            input_schema,
            chain,
            model,
        })
    }

    /// Fields a record must provide
    pub fn input_schema(&self) -> &[ColumnSpec] {
        &self.input_schema
    }

    pub fn model(&self) -> &ModelArtifact {
        &self.model
    }

    /// Convert a record to a one-row frame in schema order
    pub fn record_to_frame(&self, record: &RawRecord) -> Result<DataFrame> {
        let mut columns = Vec::with_capacity(self.input_schema.len());

        for spec in &self.input_schema {
            let value = match record.get(&spec.name) {
                None | Some(Value::Null) => {
                    return Err(ChurnError::InvalidRecord(format!(
                        "missing required field '{}'",
                        spec.name
                    )))
                }
                Some(value) => value,
            };

            let column = match spec.kind {
                ColumnKind::Categorical => {
                    let text = value.as_str().ok_or_else(|| invalid_type(spec, value))?;
                    Column::new(spec.name.as_str().into(), [text])
                }
                ColumnKind::Numeric => {
                    let number = match value {
                        Value::Bool(b) => f64::from(u8::from(*b)),
                        _ => value.as_f64().ok_or_else(|| invalid_type(spec, value))?,
                    };
                    Column::new(spec.name.as_str().into(), [number])
                }
                ColumnKind::Boolean => {
                    let flag = match value {
                        Value::Bool(b) => f64::from(u8::from(*b)),
                        _ => match value.as_f64() {
                            Some(v) if v == 0.0 || v == 1.0 => v,
                            _ => return Err(invalid_type(spec, value)),
                        },
                    };
                    Column::new(spec.name.as_str().into(), [flag])
                }
            };
            columns.push(column);
        }

        Ok(DataFrame::new(columns)?)
    }

    /// Churn probability for one record
    pub fn predict_proba(&self, record: &RawRecord) -> Result<f64> {
        let frame = self.record_to_frame(record)?;
        let features = self.chain.apply(frame)?;
        let probabilities = self.model.predict_proba(&features)?;
        let probability = probabilities
            .first()
            .copied()
            .ok_or_else(|| ChurnError::InvalidRecord("record produced no rows".to_string()))?;
        debug!("Churn probability {:.6}", probability);
        Ok(probability)
    }

    pub fn predict(&self, record: &RawRecord) -> Result<Prediction> {
        Ok(Prediction::from_probability(self.predict_proba(record)?))
    }
}

fn invalid_type(spec: &ColumnSpec, value: &Value) -> ChurnError {
    ChurnError::InvalidRecord(format!(
        "field '{}' expects a {:?} value, got {}",
        spec.name, spec.kind, value
    ))
}
