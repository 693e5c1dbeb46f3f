//! Custom binning of continuous columns into ordered labels
//!
//! Bins are fixed by configuration: strictly increasing edges and one label per
//! interval. The bin definition is recorded in the artifact manifest so inference replays
//! exactly the bins used in training.

use polars::prelude::*;
use serde::{Deserialize, Serialize};

use super::columns::numeric_values;
use crate::error::{ChurnError, Result};

/// Which side of each interval is closed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntervalClosed {
    /// `[a, b)`; the top edge belongs to the last bin
    #[default]
    Left,
    /// `(a, b]`; the bottom edge belongs to the first bin
    Right,
}

/// What happens to values outside `[first edge, last edge]`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutOfRangePolicy {
    /// Assign to the nearest bin
    #[default]
    Clamp,
    /// Fail with [`ChurnError::OutOfRange`]
    Reject,
}

fn default_drop_source() -> bool {
    true
}

/// Binning definition for one column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BinSpec {
    pub column: String,
    pub edges: Vec<f64>,
    pub labels: Vec<String>,
    /// Name of the produced label column, `<column>Bins` when absent
    #[serde(default)]
    pub output_column: Option<String>,
    #[serde(default)]
    pub closed: IntervalClosed,
    #[serde(default)]
    pub out_of_range: OutOfRangePolicy,
    #[serde(default = "default_drop_source")]
    pub drop_source: bool,
}

impl BinSpec {
    pub fn output_name(&self) -> String {
        self.output_column
            .clone()
            .unwrap_or_else(|| format!("{}Bins", self.column))
    }

    /// Edges must be finite and strictly increasing, with one label per interval
    pub fn validate(&self) -> Result<()> {
        if self.edges.len() < 2 {
            return Err(ChurnError::InvalidConfig(format!(
                "bins for '{}' need at least two edges",
                self.column
            )));
        }
        if self.edges.iter().any(|e| !e.is_finite()) {
            return Err(ChurnError::InvalidConfig(format!(
                "bin edges for '{}' must be finite",
                self.column
            )));
        }
        if self.edges.windows(2).any(|w| w[0] >= w[1]) {
            return Err(ChurnError::InvalidConfig(format!(
                "bin edges for '{}' must be strictly increasing",
                self.column
            )));
        }
        if self.labels.len() != self.edges.len() - 1 {
            return Err(ChurnError::InvalidConfig(format!(
                "bins for '{}' have {} edges but {} labels (expected {})",
                self.column,
                self.edges.len(),
                self.labels.len(),
                self.edges.len() - 1
            )));
        }
        Ok(())
    }
}

/// Applies one validated [`BinSpec`]
#[derive(Debug, Clone)]
pub struct CustomBinning {
    spec: BinSpec,
}

impl CustomBinning {
    pub fn new(spec: BinSpec) -> Result<Self> {
        spec.validate()?;
        Ok(Self { spec })
    }

    pub fn spec(&self) -> &BinSpec {
        &self.spec
    }

    /// Index of the bin holding `value`
    pub fn bin_index(&self, value: f64) -> Result<usize> {
        let edges = &self.spec.edges;
        let last = edges.len() - 2;
        let lower = edges[0];
        let upper = edges[edges.len() - 1];

        if value.is_nan() || value < lower || value > upper {
            return match self.spec.out_of_range {
                OutOfRangePolicy::Clamp if value < lower => Ok(0),
                OutOfRangePolicy::Clamp if value > upper => Ok(last),
                _ => Err(ChurnError::OutOfRange {
                    column: self.spec.column.clone(),
                    value,
                    lower,
                    upper,
                }),
            };
        }

        // Number of interior edges the value has passed
        let interior = &edges[1..edges.len() - 1];
        let index = match self.spec.closed {
            IntervalClosed::Left => interior.iter().filter(|&&e| value >= e).count(),
            IntervalClosed::Right => interior.iter().filter(|&&e| value > e).count(),
        };
        Ok(index)
    }

    pub fn bin_value(&self, value: f64) -> Result<&str> {
        let index = self.bin_index(value)?;
        Ok(&self.spec.labels[index])
    }

    /// Add the label column and, when configured, drop the source column
    pub fn apply(&self, df: DataFrame) -> Result<DataFrame> {
        let values = numeric_values(&df, &self.spec.column)?;

        let labels = values
            .iter()
            .map(|value| match value {
                Some(v) => self.bin_value(*v).map(str::to_string),
                None => Err(ChurnError::schema(
                    &self.spec.column,
                    "null values cannot be binned",
                )),
            })
            .collect::<Result<Vec<String>>>()?;

        let mut df = df;
        df.with_column(Series::new(self.spec.output_name().as_str().into(), labels))?;
        if self.spec.drop_source {
            df = df.drop(&self.spec.column)?;
        }
        Ok(df)
    }
}
