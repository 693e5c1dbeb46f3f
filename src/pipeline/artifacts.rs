//! Artifact directory layout and manifest
//!
//! ```text
//! <root>/
//!   manifest.json
//!   data/X_train.csv  data/X_test.csv  data/Y_train.csv  data/Y_test.csv
//!   encode/<column>_encoder.json
//!   transform/scaler.json
//!   models/churn_model.json
//! ```
//!
//! The manifest lists every file the predictor has to load, so nothing is
//! discovered by scanning directories.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::{Deserialize, Serialize};

use super::binning::BinSpec;
use super::encoding::{encoder_file_name, EncoderKind};
use crate::config::{ColumnSpec, SplitConfig};
use crate::error::{ChurnError, Result};

/// Paths of every artifact under one root directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactLayout {
    root: PathBuf,
}

impl ArtifactLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a path stored relative to the root in the manifest
    pub fn resolve(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.root.join("manifest.json")
    }

    pub fn data_dir(&self) -> PathBuf {
        self.root.join("data")
    }

    pub fn x_train_path(&self) -> PathBuf {
        self.data_dir().join("X_train.csv")
    }

    pub fn x_test_path(&self) -> PathBuf {
        self.data_dir().join("X_test.csv")
    }

    pub fn y_train_path(&self) -> PathBuf {
        self.data_dir().join("Y_train.csv")
    }

    pub fn y_test_path(&self) -> PathBuf {
        self.data_dir().join("Y_test.csv")
    }

    pub fn split_paths(&self) -> [PathBuf; 4] {
        [
            self.x_train_path(),
            self.x_test_path(),
            self.y_train_path(),
            self.y_test_path(),
        ]
    }

    /// All four split files and the manifest exist
    pub fn has_prepared_data(&self) -> bool {
        self.manifest_path().exists() && self.split_paths().iter().all(|p| p.exists())
    }

    pub fn encode_dir(&self) -> PathBuf {
        self.root.join("encode")
    }

    /// Encoder file path relative to the root, as recorded in the manifest
    pub fn encoder_relative(column: &str) -> String {
        format!("encode/{}", encoder_file_name(column))
    }

    pub fn scaler_relative() -> &'static str {
        "transform/scaler.json"
    }

    pub fn model_path(&self) -> PathBuf {
        self.root.join("models").join("churn_model.json")
    }

    /// Fail with [`ChurnError::MissingArtifact`] if `path` does not exist
    pub fn require(path: &Path) -> Result<()> {
        if path.exists() {
            Ok(())
        } else {
            Err(ChurnError::MissingArtifact(path.to_path_buf()))
        }
    }
}

/// One persisted encoder mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncoderEntry {
    pub column: String,
    pub kind: EncoderKind,
    /// Path relative to the artifact root
    pub file: String,
}

/// Index of the transformation state persisted by a prepare run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub created_at: String,
    pub version: String,
    /// Raw dataset schema, target included
    pub schema: Vec<ColumnSpec>,
    pub target: String,
    pub id_columns: Vec<String>,
    pub bins: Vec<BinSpec>,
    /// Encoders in application order
    pub encoders: Vec<EncoderEntry>,
    pub scaler_file: String,
    /// Feature columns of the prepared split, in order
    pub feature_columns: Vec<String>,
    /// Seed the cached split was drawn with
    #[serde(default)]
    pub split_seed: u64,
    #[serde(default)]
    pub test_size: f64,
}

impl Manifest {
    /// Stamp the creation time and crate version
    pub fn stamp(&mut self) {
        self.created_at = Local::now().format("%Y-%m-%dT%H:%M:%S%:z").to_string();
        self.version = env!("CARGO_PKG_VERSION").to_string();
    }

    pub fn save(&self, layout: &ArtifactLayout) -> Result<PathBuf> {
        let path = layout.manifest_path();
        fs::create_dir_all(layout.root())?;
        fs::write(&path, serde_json::to_string_pretty(self)?)?;
        Ok(path)
    }

    pub fn load(layout: &ArtifactLayout) -> Result<Self> {
        let path = layout.manifest_path();
        ArtifactLayout::require(&path)?;
        let text = fs::read_to_string(&path)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Raw schema without the target and identifier columns: the fields an
    /// inference record must carry
    pub fn input_schema(&self) -> Vec<ColumnSpec> {
        self.schema
            .iter()
            .filter(|spec| spec.name != self.target && !self.id_columns.contains(&spec.name))
            .cloned()
            .collect()
    }

    /// Whether the cached split was drawn with these split settings
    pub fn split_matches(&self, split: &SplitConfig) -> bool {
        self.split_seed == split.seed && (self.test_size - split.test_size).abs() < 1e-9
    }

    /// Every file the manifest references, resolved against the layout
    pub fn referenced_files(&self, layout: &ArtifactLayout) -> Vec<PathBuf> {
        self.encoders
            .iter()
            .map(|entry| layout.resolve(&entry.file))
            .chain(std::iter::once(layout.resolve(&self.scaler_file)))
            .collect()
    }
}
