//! Missing value analysis and handling
//!
//! Two strategies implement [`MissingValueStrategy`]: dropping rows with nulls in
//! critical columns, and filling a column's nulls either from a summary
//! statistic or from a pluggable [`Imputer`]. The data pipeline builds the list
//! of strategies from configuration before any data is touched.

use std::collections::{BTreeMap, HashMap};

use log::{debug, info, warn};
use polars::prelude::*;

use super::columns::{numeric_values, require_column, sorted_quantile, string_values};
use crate::config::{FillMethod, FillRule};
use crate::error::{ChurnError, Result};

/// A stage that resolves missing values in a dataset
pub trait MissingValueStrategy {
    /// Short description used in logs
    fn describe(&self) -> String;

    /// Apply the strategy, returning the cleaned dataset
    fn handle(&mut self, df: DataFrame) -> Result<DataFrame>;
}

/// Summary statistic used to fill nulls
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statistic {
    Mean,
    Median,
    Mode,
}

/// Read access to one row of a dataset, handed to an [`Imputer`]
pub struct RowContext<'a> {
    df: &'a DataFrame,
    row: usize,
}

impl<'a> RowContext<'a> {
    pub fn new(df: &'a DataFrame, row: usize) -> Self {
        Self { df, row }
    }

    pub fn row(&self) -> usize {
        self.row
    }

    /// String value of another column in this row, if present and non-null
    pub fn str_value(&self, column: &str) -> Option<&'a str> {
        self.df.column(column).ok()?.str().ok()?.get(self.row)
    }
}

/// Produces a fill value for a row from the row's other attributes
pub trait Imputer: Send + Sync {
    fn name(&self) -> &'static str;

    /// Learn from the rows where `column` is present
    fn fit(&mut self, df: &DataFrame, column: &str) -> Result<()>;

    /// Fill value for one row; `None` leaves the value missing
    fn impute(&self, row: &RowContext<'_>) -> Option<String>;
}

/// Infers a categorical value (gender) from the row's first name.
///
/// The lookup holds the majority value per first name among complete rows;
/// names never seen fall back to the column mode.
#[derive(Debug, Clone)]
pub struct FirstNameGenderImputer {
    name_column: String,
    lookup: HashMap<String, String>,
    fallback: Option<String>,
}

impl FirstNameGenderImputer {
    pub fn new(name_column: &str) -> Self {
        Self {
            name_column: name_column.to_string(),
            lookup: HashMap::new(),
            fallback: None,
        }
    }

    /// Number of distinct first names in the learned lookup
    pub fn known_names(&self) -> usize {
        self.lookup.len()
    }
}

impl Imputer for FirstNameGenderImputer {
    fn name(&self) -> &'static str {
        "first-name gender lookup"
    }

    fn fit(&mut self, df: &DataFrame, column: &str) -> Result<()> {
        let names = string_values(df, &self.name_column)?;
        let values = string_values(df, column)?;

        let mut counts: BTreeMap<String, BTreeMap<String, usize>> = BTreeMap::new();
        for (name, value) in names.iter().zip(values.iter()) {
            if let (Some(name), Some(value)) = (name, value) {
                *counts
                    .entry(name.to_lowercase())
                    .or_default()
                    .entry(value.clone())
                    .or_insert(0) += 1;
            }
        }

        self.lookup = counts
            .into_iter()
            .filter_map(|(name, by_value)| majority(&by_value).map(|v| (name, v)))
            .collect();
        self.fallback = string_mode(&values);

        debug!(
            "Imputer learned {} first names for '{}' (fallback {:?})",
            self.lookup.len(),
            column,
            self.fallback
        );
        Ok(())
    }

    fn impute(&self, row: &RowContext<'_>) -> Option<String> {
        row.str_value(&self.name_column)
            .and_then(|name| self.lookup.get(&name.to_lowercase()).cloned())
            .or_else(|| self.fallback.clone())
    }
}

/// Drop every row with a null in any critical column
#[derive(Debug, Clone)]
pub struct DropMissingValues {
    critical_columns: Vec<String>,
}

impl DropMissingValues {
    pub fn new(critical_columns: Vec<String>) -> Self {
        Self { critical_columns }
    }
}

impl MissingValueStrategy for DropMissingValues {
    fn describe(&self) -> String {
        format!("drop rows with nulls in {:?}", self.critical_columns)
    }

    fn handle(&mut self, df: DataFrame) -> Result<DataFrame> {
        let mut keep = vec![true; df.height()];

        for name in &self.critical_columns {
            let column = require_column(&df, name)?;
            for (flag, value) in keep.iter_mut().zip(column.as_materialized_series().iter()) {
                if value.is_null() {
                    *flag = false;
                }
            }
        }

        let before = df.height();
        let cleaned = df.filter(&BooleanChunked::from_slice("keep".into(), &keep))?;
        info!(
            "Dropped {} row(s) with missing critical values",
            before - cleaned.height()
        );
        Ok(cleaned)
    }
}

enum Filler {
    Statistic(Statistic),
    Imputer(Box<dyn Imputer>),
}

/// Fill nulls in one column from a statistic or an imputer
pub struct FillMissingValues {
    column: String,
    filler: Filler,
}

impl FillMissingValues {
    pub fn with_statistic(column: &str, statistic: Statistic) -> Self {
        Self {
            column: column.to_string(),
            filler: Filler::Statistic(statistic),
        }
    }

    pub fn with_imputer(column: &str, imputer: Box<dyn Imputer>) -> Self {
        Self {
            column: column.to_string(),
            filler: Filler::Imputer(imputer),
        }
    }

    /// Build the strategy a configured fill rule asks for
    pub fn from_rule(rule: &FillRule) -> Self {
        match &rule.method {
            FillMethod::Mean => Self::with_statistic(&rule.column, Statistic::Mean),
            FillMethod::Median => Self::with_statistic(&rule.column, Statistic::Median),
            FillMethod::Mode => Self::with_statistic(&rule.column, Statistic::Mode),
            FillMethod::FirstNameGender { name_column } => Self::with_imputer(
                &rule.column,
                Box::new(FirstNameGenderImputer::new(name_column)),
            ),
        }
    }
}

fn fill_with_statistic(df: &mut DataFrame, name: &str, statistic: Statistic) -> Result<()> {
    let column = require_column(df, name)?;

    if column.dtype() == &DataType::String {
        if statistic != Statistic::Mode {
            return Err(ChurnError::schema(
                name,
                "mean and median require a numeric column",
            ));
        }
        let values = string_values(df, name)?;
        let fill = string_mode(&values);
        let filled: Vec<Option<String>> = values
            .into_iter()
            .map(|v| v.or_else(|| fill.clone()))
            .collect();
        df.with_column(Series::new(name.into(), filled))?;
        return Ok(());
    }

    let values = numeric_values(df, name)?;
    let mut present: Vec<f64> = values.iter().flatten().copied().collect();
    present.sort_by(f64::total_cmp);

    let fill = match statistic {
        Statistic::Mean if !present.is_empty() => {
            Some(present.iter().sum::<f64>() / present.len() as f64)
        }
        Statistic::Mean => None,
        Statistic::Median => sorted_quantile(&present, 0.5),
        Statistic::Mode => numeric_mode(&present),
    };

    let Some(fill) = fill else {
        warn!(
            "Column '{}' has no values to compute a {:?} from; nulls kept",
            name, statistic
        );
        return Ok(());
    };

    debug!("Filling '{}' nulls with {:?} = {}", name, statistic, fill);
    let filled: Vec<f64> = values.into_iter().map(|v| v.unwrap_or(fill)).collect();
    df.with_column(Series::new(name.into(), filled))?;
    Ok(())
}

fn fill_with_imputer(df: &mut DataFrame, name: &str, imputer: &mut dyn Imputer) -> Result<()> {
    imputer.fit(df, name)?;

    let values = string_values(df, name)?;
    let mut unresolved = 0usize;
    let mut filled: Vec<Option<String>> = Vec::with_capacity(values.len());
    for (row, value) in values.into_iter().enumerate() {
        let value = value.or_else(|| imputer.impute(&RowContext::new(df, row)));
        if value.is_none() {
            unresolved += 1;
        }
        filled.push(value);
    }

    if unresolved > 0 {
        warn!(
            "{} could not fill {} value(s) in '{}'",
            imputer.name(),
            unresolved,
            name
        );
    }
    df.with_column(Series::new(name.into(), filled))?;
    Ok(())
}

impl MissingValueStrategy for FillMissingValues {
    fn describe(&self) -> String {
        match &self.filler {
            Filler::Statistic(statistic) => format!("fill '{}' with {:?}", self.column, statistic),
            Filler::Imputer(imputer) => format!("fill '{}' with {}", self.column, imputer.name()),
        }
    }

    fn handle(&mut self, mut df: DataFrame) -> Result<DataFrame> {
        let nulls = require_column(&df, &self.column)?.null_count();
        if nulls == 0 {
            return Ok(df);
        }

        match &mut self.filler {
            Filler::Statistic(statistic) => {
                fill_with_statistic(&mut df, &self.column, *statistic)?;
            }
            Filler::Imputer(imputer) => {
                fill_with_imputer(&mut df, &self.column, imputer.as_mut())?;
            }
        }

        info!("Filled {} missing value(s) in '{}'", nulls, self.column);
        Ok(df)
    }
}

/// Build the configured missing-value strategies in execution order:
/// the critical-column drop first, then each fill rule.
pub fn strategies_from_config(
    critical_columns: &[String],
    fill: &[FillRule],
) -> Vec<Box<dyn MissingValueStrategy>> {
    let mut strategies: Vec<Box<dyn MissingValueStrategy>> =
        vec![Box::new(DropMissingValues::new(critical_columns.to_vec()))];
    strategies.extend(
        fill.iter()
            .map(|rule| Box::new(FillMissingValues::from_rule(rule)) as Box<dyn MissingValueStrategy>),
    );
    strategies
}

/// Null ratio per column, sorted descending
pub fn analyze_missing_values(df: &DataFrame) -> Vec<(String, f64)> {
    if df.height() == 0 {
        return Vec::new();
    }

    let rows = df.height() as f64;
    let mut ratios: Vec<(String, f64)> = df
        .get_columns()
        .iter()
        .map(|col| (col.name().to_string(), col.null_count() as f64 / rows))
        .collect();

    ratios.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    ratios
}

/// Most frequent value; ties resolve to the alphabetically first
fn majority(counts: &BTreeMap<String, usize>) -> Option<String> {
    let mut best: Option<(&String, usize)> = None;
    for (value, &count) in counts {
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((value, count));
        }
    }
    best.map(|(value, _)| value.clone())
}

fn string_mode(values: &[Option<String>]) -> Option<String> {
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    for value in values.iter().flatten() {
        *counts.entry(value.clone()).or_insert(0) += 1;
    }
    majority(&counts)
}

/// Mode of sorted values; ties resolve to the smallest
fn numeric_mode(sorted: &[f64]) -> Option<f64> {
    let mut best: Option<(f64, usize)> = None;
    let mut i = 0;
    while i < sorted.len() {
        let value = sorted[i];
        let mut j = i;
        while j < sorted.len() && sorted[j] == value {
            j += 1;
        }
        let count = j - i;
        if best.map_or(true, |(_, c)| count > c) {
            best = Some((value, count));
        }
        i = j;
    }
    best.map(|(value, _)| value)
}
