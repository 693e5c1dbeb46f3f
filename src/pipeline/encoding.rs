//! Categorical encoders with per-column persisted mappings
//!
//! Ordinal columns use a fixed, configured `category -> rank` mapping and are
//! replaced by their ranks. Nominal columns learn their sorted categories at
//! fit time and are replaced by one indicator column per category.
//!
//! Each encoder persists its mapping as `<column>_encoder.json` holding a flat
//! `{category: code}` object, so every column can be reloaded on its own.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use super::columns::{require_column, string_values};
use crate::error::{ChurnError, Result};

/// Category to integer code
pub type CategoryMapping = BTreeMap<String, i64>;

/// Which encoder a persisted mapping belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EncoderKind {
    Ordinal,
    Nominal,
}

/// File name of a column's persisted mapping
pub fn encoder_file_name(column: &str) -> String {
    format!("{}_encoder.json", column)
}

/// Write a mapping as a JSON object
pub fn save_mapping(path: &Path, mapping: &CategoryMapping) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, serde_json::to_string_pretty(mapping)?)?;
    Ok(())
}

/// Read a mapping written by [`save_mapping`]
pub fn load_mapping(path: &Path) -> Result<CategoryMapping> {
    if !path.exists() {
        return Err(ChurnError::MissingArtifact(path.to_path_buf()));
    }
    let text = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&text)?)
}

/// Categories ordered by code
fn categories_by_code(mapping: &CategoryMapping) -> Vec<(&str, i64)> {
    let mut entries: Vec<(&str, i64)> = mapping.iter().map(|(k, &v)| (k.as_str(), v)).collect();
    entries.sort_by_key(|&(category, code)| (code, category));
    entries
}

fn lookup(column: &str, mapping: &CategoryMapping, value: Option<&str>) -> Result<i64> {
    let value = value.ok_or_else(|| ChurnError::schema(column, "null category"))?;
    mapping
        .get(value)
        .copied()
        .ok_or_else(|| ChurnError::UnmappedCategory {
            column: column.to_string(),
            value: value.to_string(),
        })
}

/// Fixed-rank encoder for an ordered categorical column
#[derive(Debug, Clone, PartialEq)]
pub struct OrdinalEncoder {
    column: String,
    mapping: CategoryMapping,
}

impl OrdinalEncoder {
    pub fn new(column: &str, mapping: CategoryMapping) -> Self {
        Self {
            column: column.to_string(),
            mapping,
        }
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn mapping(&self) -> &CategoryMapping {
        &self.mapping
    }

    /// Replace the column with its integer ranks
    pub fn transform(&self, df: DataFrame) -> Result<DataFrame> {
        let values = string_values(&df, &self.column)?;
        let ranks = values
            .iter()
            .map(|v| lookup(&self.column, &self.mapping, v.as_deref()))
            .collect::<Result<Vec<i64>>>()?;

        let mut df = df;
        df.with_column(Series::new(self.column.as_str().into(), ranks))?;
        Ok(df)
    }

    pub fn decode(&self, code: i64) -> Option<&str> {
        self.mapping
            .iter()
            .find(|(_, &c)| c == code)
            .map(|(category, _)| category.as_str())
    }

    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(encoder_file_name(&self.column));
        save_mapping(&path, &self.mapping)?;
        Ok(path)
    }

    pub fn load(column: &str, path: &Path) -> Result<Self> {
        Ok(Self::new(column, load_mapping(path)?))
    }
}

/// One-hot encoder for an unordered categorical column
#[derive(Debug, Clone, PartialEq)]
pub struct NominalEncoder {
    column: String,
    mapping: Option<CategoryMapping>,
}

impl NominalEncoder {
    pub fn new(column: &str) -> Self {
        Self {
            column: column.to_string(),
            mapping: None,
        }
    }

    /// Build an already fitted encoder from a persisted mapping
    pub fn from_mapping(column: &str, mapping: CategoryMapping) -> Self {
        Self {
            column: column.to_string(),
            mapping: Some(mapping),
        }
    }

    pub fn column(&self) -> &str {
        &self.column
    }

    pub fn mapping(&self) -> Result<&CategoryMapping> {
        self.mapping.as_ref().ok_or(ChurnError::NotFitted("NominalEncoder"))
    }

    /// Record the sorted distinct categories and assign codes `0..k`
    pub fn fit(&mut self, df: &DataFrame) -> Result<()> {
        let values = string_values(df, &self.column)?;
        let mut categories: Vec<String> = values.into_iter().flatten().collect();
        categories.sort();
        categories.dedup();

        if categories.is_empty() {
            return Err(ChurnError::schema(&self.column, "no categories to fit"));
        }

        let mapping: CategoryMapping = categories
            .into_iter()
            .enumerate()
            .map(|(code, category)| (category, code as i64))
            .collect();
        debug!("Nominal encoder for '{}': {:?}", self.column, mapping);
        self.mapping = Some(mapping);
        Ok(())
    }

    /// Indicator column names in code order
    pub fn output_columns(&self) -> Result<Vec<String>> {
        Ok(categories_by_code(self.mapping()?)
            .into_iter()
            .map(|(category, _)| format!("{}_{}", self.column, category))
            .collect())
    }

    /// Replace the column with one 0/1 indicator column per fitted category
    pub fn transform(&self, df: DataFrame) -> Result<DataFrame> {
        let mapping = self.mapping()?;
        require_column(&df, &self.column)?;
        let values = string_values(&df, &self.column)?;
        let codes = values
            .iter()
            .map(|v| lookup(&self.column, mapping, v.as_deref()))
            .collect::<Result<Vec<i64>>>()?;

        let mut df = df.drop(&self.column)?;
        for (category, code) in categories_by_code(mapping) {
            let indicator: Vec<i32> = codes.iter().map(|&c| i32::from(c == code)).collect();
            let name = format!("{}_{}", self.column, category);
            df.with_column(Series::new(name.as_str().into(), indicator))?;
        }
        Ok(df)
    }

    pub fn decode(&self, code: i64) -> Option<&str> {
        self.mapping.as_ref()?.iter().find(|(_, &c)| c == code).map(|(k, _)| k.as_str())
    }

    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        let path = dir.join(encoder_file_name(&self.column));
        save_mapping(&path, self.mapping()?)?;
        Ok(path)
    }

    pub fn load(column: &str, path: &Path) -> Result<Self> {
        Ok(Self::from_mapping(column, load_mapping(path)?))
    }
}
