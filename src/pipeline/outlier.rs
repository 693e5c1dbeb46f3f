//! IQR outlier detection and multi-column row removal
//!
//! Each examined column gets independent fences `[Q1 - k*IQR, Q3 + k*IQR]`.
//! A row is removed only when it falls outside the fences in at least
//! `min_flagged_columns` of the examined columns.

use log::{debug, info};
use polars::prelude::*;

use super::columns::{numeric_values, sorted_quantile};
use crate::config::OutlierConfig;
use crate::error::{ChurnError, Result};

/// Fences computed for one column
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct IqrBounds {
    pub q1: f64,
    pub q3: f64,
    pub lower: f64,
    pub upper: f64,
}

impl IqrBounds {
    /// Compute fences over the non-null values of a column.
    ///
    /// Returns `None` when the column has no values.
    pub fn from_values(values: &[Option<f64>], factor: f64) -> Option<Self> {
        let mut present: Vec<f64> = values.iter().flatten().copied().collect();
        present.sort_by(f64::total_cmp);

        let q1 = sorted_quantile(&present, 0.25)?;
        let q3 = sorted_quantile(&present, 0.75)?;
        let iqr = q3 - q1;
        Some(Self {
            q1,
            q3,
            lower: q1 - factor * iqr,
            upper: q3 + factor * iqr,
        })
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.lower && value <= self.upper
    }
}

/// Removes rows that are outliers in several columns at once
#[derive(Debug, Clone, PartialEq)]
pub struct OutlierDetector {
    factor: f64,
    min_flagged_columns: usize,
}

impl Default for OutlierDetector {
    fn default() -> Self {
        Self {
            factor: 1.5,
            min_flagged_columns: 2,
        }
    }
}

impl OutlierDetector {
    pub fn new(factor: f64, min_flagged_columns: usize) -> Result<Self> {
        if !(factor > 0.0) {
            return Err(ChurnError::InvalidConfig(
                "outlier factor must be positive".to_string(),
            ));
        }
        if min_flagged_columns == 0 {
            return Err(ChurnError::InvalidConfig(
                "outlier min_flagged_columns must be at least 1".to_string(),
            ));
        }
        Ok(Self {
            factor,
            min_flagged_columns,
        })
    }

    pub fn from_config(config: &OutlierConfig) -> Result<Self> {
        Self::new(config.factor, config.min_flagged_columns)
    }

    /// Per-row, per-column outlier flags.
    ///
    /// The result has one boolean column per examined column, named after it.
    /// Nulls are never flagged.
    pub fn detect_outliers(&self, df: &DataFrame, columns: &[String]) -> Result<DataFrame> {
        let mut flags = Vec::with_capacity(columns.len());

        for name in columns {
            let values = numeric_values(df, name)?;
            let column_flags: Vec<bool> = match IqrBounds::from_values(&values, self.factor) {
                Some(bounds) => {
                    debug!(
                        "IQR fences for '{}': [{:.4}, {:.4}] (Q1 {:.4}, Q3 {:.4})",
                        name, bounds.lower, bounds.upper, bounds.q1, bounds.q3
                    );
                    values
                        .iter()
                        .map(|v| v.is_some_and(|x| !bounds.contains(x)))
                        .collect()
                }
                None => vec![false; values.len()],
            };
            flags.push(Column::new(name.as_str().into(), column_flags));
        }

        Ok(DataFrame::new(flags)?)
    }

    /// Drop rows flagged in at least `min_flagged_columns` of `columns`
    pub fn handle_outliers(&self, df: DataFrame, columns: &[String]) -> Result<DataFrame> {
        let flags = self.detect_outliers(&df, columns)?;
        let mut counts = vec![0usize; df.height()];

        for column in flags.get_columns() {
            for (count, flagged) in counts.iter_mut().zip(column.bool()?.into_iter()) {
                if flagged.unwrap_or(false) {
                    *count += 1;
                }
            }
        }

        let keep: Vec<bool> = counts
            .iter()
            .map(|&count| count < self.min_flagged_columns)
            .collect();

        let before = df.height();
        let filtered = df.filter(&BooleanChunked::from_slice("keep".into(), &keep))?;
        info!(
            "Removed {} outlier row(s) flagged in >= {} of {} columns",
            before - filtered.height(),
            self.min_flagged_columns,
            columns.len()
        );
        Ok(filtered)
    }
}
