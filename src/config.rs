//! Pipeline configuration
//!
//! A single immutable [`PipelineConfig`] is built once, validated, and passed by
//! reference into every stage. Every field has a default describing the bank
//! churn dataset, so a JSON file only needs to override what differs.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{ChurnError, Result};
use crate::pipeline::binning::{BinSpec, IntervalClosed, OutOfRangePolicy};

/// Value kind of a raw input column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnKind {
    Numeric,
    Categorical,
    Boolean,
}

/// One column of the raw input schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnSpec {
    pub name: String,
    pub kind: ColumnKind,
}

impl ColumnSpec {
    pub fn new(name: &str, kind: ColumnKind) -> Self {
        Self {
            name: name.to_string(),
            kind,
        }
    }
}

/// How a column's nulls are filled
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "method", rename_all = "snake_case")]
pub enum FillMethod {
    Mean,
    Median,
    Mode,
    /// Infer the value from a first-name lookup learned from complete rows
    FirstNameGender { name_column: String },
}

/// A fill rule for one column
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillRule {
    pub column: String,
    #[serde(flatten)]
    pub method: FillMethod,
}

/// Outlier removal settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutlierConfig {
    /// Numeric columns examined for outliers
    pub columns: Vec<String>,
    /// IQR multiplier for the fences
    pub factor: f64,
    /// Rows flagged in at least this many columns are removed
    pub min_flagged_columns: usize,
}

impl Default for OutlierConfig {
    fn default() -> Self {
        Self {
            columns: strings(&["CreditScore", "Age", "Balance", "EstimatedSalary"]),
            factor: 1.5,
            min_flagged_columns: 2,
        }
    }
}

/// Categorical encoding settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncodingConfig {
    /// Unordered categorical columns, one-hot encoded from fitted categories
    pub nominal_columns: Vec<String>,
    /// Fixed category → rank mappings for ordered categorical columns
    pub ordinal_mappings: BTreeMap<String, BTreeMap<String, i64>>,
}

impl Default for EncodingConfig {
    fn default() -> Self {
        let ranks: BTreeMap<String, i64> = ["Poor", "Fair", "Good", "Very Good", "Excellent"]
            .iter()
            .enumerate()
            .map(|(rank, label)| (label.to_string(), rank as i64))
            .collect();

        let mut ordinal_mappings = BTreeMap::new();
        ordinal_mappings.insert("CreditScoreBins".to_string(), ranks);

        Self {
            nominal_columns: strings(&["Geography", "Gender"]),
            ordinal_mappings,
        }
    }
}

/// Train/test split settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitConfig {
    pub test_size: f64,
    pub seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        Self {
            test_size: 0.2,
            seed: 42,
        }
    }
}

/// Classifier family
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelKind {
    RandomForest,
    #[default]
    GradientBoosting,
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ModelKind::RandomForest => write!(f, "random-forest"),
            ModelKind::GradientBoosting => write!(f, "gradient-boosting"),
        }
    }
}

impl std::str::FromStr for ModelKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "random-forest" | "random_forest" | "rf" => Ok(ModelKind::RandomForest),
            "gradient-boosting" | "gradient_boosting" | "gbdt" | "xgboost" => {
                Ok(ModelKind::GradientBoosting)
            }
            _ => Err(format!(
                "Unknown model kind: '{}'. Use 'random-forest' or 'gradient-boosting'.",
                s
            )),
        }
    }
}

/// Classifier hyperparameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub kind: ModelKind,
    pub n_estimators: usize,
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Shrinkage applied to each boosting round
    pub learning_rate: f64,
    /// Row subsample ratio per boosting round
    pub subsample: f64,
    pub random_state: u64,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            kind: ModelKind::default(),
            n_estimators: 100,
            max_depth: 10,
            min_samples_split: 2,
            min_samples_leaf: 1,
            learning_rate: 0.1,
            subsample: 1.0,
            random_state: 42,
        }
    }
}

/// Complete pipeline configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Raw input schema, in file order
    pub schema: Vec<ColumnSpec>,
    /// Binary label column (0 = retained, 1 = churned)
    pub target: String,
    /// Identifier columns pruned before training
    pub id_columns: Vec<String>,
    /// Rows with a null in any of these columns are dropped
    pub critical_columns: Vec<String>,
    pub fill: Vec<FillRule>,
    pub outliers: OutlierConfig,
    pub bins: Vec<BinSpec>,
    pub encoding: EncodingConfig,
    /// Columns min-max scaled into [0, 1]
    pub scale_columns: Vec<String>,
    pub split: SplitConfig,
    pub model: ModelConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        use ColumnKind::{Boolean, Categorical, Numeric};

        let schema = vec![
            ColumnSpec::new("RowNumber", Numeric),
            ColumnSpec::new("CustomerId", Numeric),
            ColumnSpec::new("Firstname", Categorical),
            ColumnSpec::new("Lastname", Categorical),
            ColumnSpec::new("CreditScore", Numeric),
            ColumnSpec::new("Geography", Categorical),
            ColumnSpec::new("Gender", Categorical),
            ColumnSpec::new("Age", Numeric),
            ColumnSpec::new("Tenure", Numeric),
            ColumnSpec::new("Balance", Numeric),
            ColumnSpec::new("NumOfProducts", Numeric),
            ColumnSpec::new("HasCrCard", Boolean),
            ColumnSpec::new("IsActiveMember", Boolean),
            ColumnSpec::new("EstimatedSalary", Numeric),
            ColumnSpec::new("Exited", Numeric),
        ];

        let credit_score_bins = BinSpec {
            column: "CreditScore".to_string(),
            edges: vec![300.0, 580.0, 670.0, 740.0, 800.0, 850.0],
            labels: strings(&["Poor", "Fair", "Good", "Very Good", "Excellent"]),
            output_column: Some("CreditScoreBins".to_string()),
            closed: IntervalClosed::Left,
            out_of_range: OutOfRangePolicy::Clamp,
            drop_source: true,
        };

        Self {
            schema,
            target: "Exited".to_string(),
            id_columns: strings(&["RowNumber", "CustomerId", "Firstname", "Lastname"]),
            critical_columns: strings(&[
                "CreditScore",
                "Geography",
                "Tenure",
                "Balance",
                "NumOfProducts",
                "HasCrCard",
                "IsActiveMember",
                "EstimatedSalary",
                "Exited",
            ]),
            fill: vec![
                FillRule {
                    column: "Age".to_string(),
                    method: FillMethod::Mean,
                },
                FillRule {
                    column: "Gender".to_string(),
                    method: FillMethod::FirstNameGender {
                        name_column: "Firstname".to_string(),
                    },
                },
            ],
            outliers: OutlierConfig::default(),
            bins: vec![credit_score_bins],
            encoding: EncodingConfig::default(),
            scale_columns: strings(&["Balance", "EstimatedSalary", "Age"]),
            split: SplitConfig::default(),
            model: ModelConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load a configuration from a JSON file and validate it.
    ///
    /// Fields absent from the file keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ChurnError::InvalidConfig(format!(
                "configuration file not found: {}",
                path.display()
            )));
        }
        let text = std::fs::read_to_string(path)?;
        let config: PipelineConfig = serde_json::from_str(&text)?;
        config.validate()?;
        Ok(config)
    }

    /// Kind of a raw schema column
    pub fn kind_of(&self, column: &str) -> Option<ColumnKind> {
        self.schema
            .iter()
            .find(|spec| spec.name == column)
            .map(|spec| spec.kind)
    }

    /// Check internal consistency. Called once before any stage runs.
    pub fn validate(&self) -> Result<()> {
        let require = |column: &str, purpose: &str| -> Result<ColumnKind> {
            self.kind_of(column).ok_or_else(|| {
                ChurnError::InvalidConfig(format!(
                    "{} column '{}' is not part of the schema",
                    purpose, column
                ))
            })
        };

        require(&self.target, "target")?;
        for column in &self.id_columns {
            require(column, "identifier")?;
        }
        for column in &self.critical_columns {
            require(column, "critical")?;
        }
        for rule in &self.fill {
            let kind = require(&rule.column, "fill")?;
            match &rule.method {
                FillMethod::Mean | FillMethod::Median if kind == ColumnKind::Categorical => {
                    return Err(ChurnError::InvalidConfig(format!(
                        "fill column '{}' is categorical; only 'mode' or an imputer can fill it",
                        rule.column
                    )));
                }
                FillMethod::FirstNameGender { name_column } => {
                    require(name_column, "imputer name")?;
                }
                _ => {}
            }
        }

        for column in &self.outliers.columns {
            if require(column, "outlier")? == ColumnKind::Categorical {
                return Err(ChurnError::InvalidConfig(format!(
                    "outlier column '{}' must be numeric",
                    column
                )));
            }
        }
        if !(self.outliers.factor > 0.0) {
            return Err(ChurnError::InvalidConfig(
                "outlier factor must be positive".to_string(),
            ));
        }
        if self.outliers.min_flagged_columns == 0 {
            return Err(ChurnError::InvalidConfig(
                "outlier min_flagged_columns must be at least 1".to_string(),
            ));
        }

        for spec in &self.bins {
            require(&spec.column, "binning")?;
            spec.validate()?;
        }

        let bin_outputs: Vec<String> = self.bins.iter().map(BinSpec::output_name).collect();
        for column in &self.encoding.nominal_columns {
            require(column, "nominal")?;
        }
        for (column, mapping) in &self.encoding.ordinal_mappings {
            if self.kind_of(column).is_none() && !bin_outputs.contains(column) {
                return Err(ChurnError::InvalidConfig(format!(
                    "ordinal column '{}' is neither in the schema nor produced by binning",
                    column
                )));
            }
            if mapping.is_empty() {
                return Err(ChurnError::InvalidConfig(format!(
                    "ordinal mapping for '{}' is empty",
                    column
                )));
            }
        }
        for column in &self.scale_columns {
            if require(column, "scaling")? == ColumnKind::Categorical {
                return Err(ChurnError::InvalidConfig(format!(
                    "scaling column '{}' must be numeric",
                    column
                )));
            }
        }

        if !(self.split.test_size > 0.0 && self.split.test_size < 1.0) {
            return Err(ChurnError::InvalidConfig(format!(
                "test_size must be in (0, 1), got {}",
                self.split.test_size
            )));
        }

        if self.model.n_estimators == 0 || self.model.max_depth == 0 {
            return Err(ChurnError::InvalidConfig(
                "n_estimators and max_depth must be at least 1".to_string(),
            ));
        }
        if !(self.model.subsample > 0.0 && self.model.subsample <= 1.0) {
            return Err(ChurnError::InvalidConfig(format!(
                "subsample must be in (0, 1], got {}",
                self.model.subsample
            )));
        }

        Ok(())
    }
}

fn strings(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = PipelineConfig::default();
        config.validate().unwrap();
        assert_eq!(config.target, "Exited");
        assert_eq!(config.outliers.min_flagged_columns, 2);
        assert_eq!(config.split.test_size, 0.2);
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let json = r#"{ "split": { "test_size": 0.3 }, "model": { "kind": "random-forest" } }"#;
        let config: PipelineConfig = serde_json::from_str(json).unwrap();

        assert_eq!(config.split.test_size, 0.3);
        assert_eq!(config.split.seed, 42);
        assert_eq!(config.model.kind, ModelKind::RandomForest);
        assert_eq!(config.model.n_estimators, 100);
        assert_eq!(config.schema.len(), 15);
    }

    #[test]
    fn test_fill_rules_deserialize_tagged() {
        let json = r#"[
            { "column": "Age", "method": "median" },
            { "column": "Gender", "method": "first_name_gender", "name_column": "Firstname" }
        ]"#;
        let rules: Vec<FillRule> = serde_json::from_str(json).unwrap();
        assert_eq!(rules[0].method, FillMethod::Median);
        assert_eq!(
            rules[1].method,
            FillMethod::FirstNameGender {
                name_column: "Firstname".to_string()
            }
        );
    }

    #[test]
    fn test_unknown_column_rejected() {
        let mut config = PipelineConfig::default();
        config.scale_columns.push("Income".to_string());
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Income"));
    }

    #[test]
    fn test_invalid_test_size_rejected() {
        let mut config = PipelineConfig::default();
        config.split.test_size = 1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_model_kind_from_str() {
        assert_eq!("rf".parse::<ModelKind>().unwrap(), ModelKind::RandomForest);
        assert_eq!(
            "xgboost".parse::<ModelKind>().unwrap(),
            ModelKind::GradientBoosting
        );
        assert!("svm".parse::<ModelKind>().is_err());
    }
}
