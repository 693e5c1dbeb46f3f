//! Min-max scaling with persisted parameters
//!
//! [`MinMaxScaler`] only describes which columns to scale; fitting produces a
//! [`FittedScaler`], the only type that can transform. A scaler loaded from
//! `scaler.json` is a `FittedScaler` and has no way to refit.

use std::fs;
use std::path::Path;

use log::debug;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use super::columns::numeric_values;
use crate::error::{ChurnError, Result};

/// Fitted range of one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScalerParams {
    pub column: String,
    pub min: f64,
    pub max: f64,
}

impl ScalerParams {
    /// `(x - min) / (max - min)`, or 0.0 for a constant column. Not clipped.
    pub fn scale(&self, value: f64) -> f64 {
        let range = self.max - self.min;
        if range == 0.0 {
            0.0
        } else {
            (value - self.min) / range
        }
    }

    pub fn unscale(&self, value: f64) -> f64 {
        self.min + value * (self.max - self.min)
    }
}

/// Columns to be min-max scaled
#[derive(Debug, Clone, PartialEq)]
pub struct MinMaxScaler {
    columns: Vec<String>,
}

impl MinMaxScaler {
    pub fn new(columns: Vec<String>) -> Self {
        Self { columns }
    }

    /// Compute `min`/`max` per column over its non-null values
    pub fn fit(&self, df: &DataFrame) -> Result<FittedScaler> {
        let mut params = Vec::with_capacity(self.columns.len());

        for name in &self.columns {
            let values = numeric_values(df, name)?;
            let (min, max) = values
                .iter()
                .flatten()
                .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
                    (lo.min(v), hi.max(v))
                });
            if !min.is_finite() || !max.is_finite() {
                return Err(ChurnError::schema(name, "no values to fit a scaler on"));
            }
            debug!("Scaler range for '{}': [{}, {}]", name, min, max);
            params.push(ScalerParams {
                column: name.clone(),
                min,
                max,
            });
        }

        Ok(FittedScaler { columns: params })
    }
}

/// Persisted min-max parameters, in configured column order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedScaler {
    columns: Vec<ScalerParams>,
}

impl FittedScaler {
    pub fn params(&self) -> &[ScalerParams] {
        &self.columns
    }

    pub fn get(&self, column: &str) -> Option<&ScalerParams> {
        self.columns.iter().find(|p| p.column == column)
    }

    /// Scale every fitted column in place, nulls preserved
    pub fn transform(&self, df: DataFrame) -> Result<DataFrame> {
        self.map_columns(df, ScalerParams::scale)
    }

    pub fn inverse_transform(&self, df: DataFrame) -> Result<DataFrame> {
        self.map_columns(df, ScalerParams::unscale)
    }

    fn map_columns(&self, mut df: DataFrame, f: fn(&ScalerParams, f64) -> f64) -> Result<DataFrame> {
        for params in &self.columns {
            let scaled: Vec<Option<f64>> = numeric_values(&df, &params.column)?
                .into_iter()
                .map(|v| v.map(|x| f(params, x)))
                .collect();
            df.with_column(Series::new(params.column.as_str().into(), scaled))?;
        }
        Ok(df)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ChurnError::MissingArtifact(path.to_path_buf()));
        }
        let text = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&text)?)
    }
}
