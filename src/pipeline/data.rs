//! Data preparation pipeline
//!
//! Runs the fixed stage order on a raw dataset:
//! missing values, outliers, transform chain (binning, encoding, scaling,
//! pruning), then the seeded train/test split. The split, the fitted
//! transformation state and the manifest are written under an artifact root.
//! A later run reuses the cached split unless a rebuild is forced.

use std::path::Path;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use log::{info, warn};
use polars::prelude::*;

use super::artifacts::{ArtifactLayout, Manifest};
use super::chain::TransformChain;
use super::columns::{column_names, conform_to_schema};
use super::loader::{load_dataset, save_dataset};
use super::missing::{analyze_missing_values, strategies_from_config, MissingValueStrategy};
use super::outlier::OutlierDetector;
use super::split::{train_test_split, TrainTestSplit};
use crate::config::PipelineConfig;

/// Row counts and timings recorded while preparing a dataset
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PrepareStats {
    pub rows_loaded: usize,
    pub rows_after_missing: usize,
    pub rows_after_outliers: usize,
    /// Null fraction per raw column before missing-value handling, highest first
    pub missing_ratios: Vec<(String, f64)>,
    pub feature_count: usize,
    pub train_rows: usize,
    pub test_rows: usize,
    pub missing_time: Duration,
    pub outlier_time: Duration,
    pub transform_time: Duration,
    pub split_time: Duration,
}

/// Result of a prepare run, either freshly built or read from the cache
#[derive(Debug, Clone)]
pub struct PreparedData {
    pub split: TrainTestSplit,
    pub manifest: Manifest,
    pub from_cache: bool,
    /// Present only when the data was rebuilt
    pub stats: Option<PrepareStats>,
}

/// Stage runner bound to one configuration
pub struct DataPipeline<'a> {
    config: &'a PipelineConfig,
}

impl<'a> DataPipeline<'a> {
    pub fn new(config: &'a PipelineConfig) -> Self {
        Self { config }
    }

    /// Apply the configured missing-value strategies in order
    pub fn handle_missing(&self, mut df: DataFrame) -> Result<DataFrame> {
        let mut strategies: Vec<Box<dyn MissingValueStrategy>> =
            strategies_from_config(&self.config.critical_columns, &self.config.fill);
        for strategy in strategies.iter_mut() {
            info!("Missing values: {}", strategy.describe());
            df = strategy
                .handle(df)
                .with_context(|| format!("Missing-value step failed: {}", strategy.describe()))?;
        }
        Ok(df)
    }

    pub fn remove_outliers(&self, df: DataFrame) -> Result<DataFrame> {
        let detector = OutlierDetector::from_config(&self.config.outliers)?;
        Ok(detector.handle_outliers(df, &self.config.outliers.columns)?)
    }

    /// Run every stage on an in-memory dataset and persist the results
    pub fn prepare_frame(&self, raw: DataFrame, layout: &ArtifactLayout) -> Result<PreparedData> {
        let mut stats = PrepareStats {
            rows_loaded: raw.height(),
            ..Default::default()
        };

        let df = conform_to_schema(&raw, &self.config.schema)
            .context("Dataset does not match the configured schema")?;

        stats.missing_ratios = analyze_missing_values(&df);
        for (column, ratio) in stats.missing_ratios.iter().filter(|(_, r)| *r > 0.0) {
            info!("Column {} is {:.2}% null", column, ratio * 100.0);
        }

        let start = Instant::now();
        let df = self.handle_missing(df)?;
        stats.rows_after_missing = df.height();
        stats.missing_time = start.elapsed();
        info!("After missing-value handling: {} rows", df.height());

        let start = Instant::now();
        let df = self.remove_outliers(df)?;
        stats.rows_after_outliers = df.height();
        stats.outlier_time = start.elapsed();
        info!("After outlier removal: {} rows", df.height());

        let start = Instant::now();
        let (chain, df) = TransformChain::fit_transform(df, self.config)
            .context("Failed to fit the transform chain")?;
        stats.transform_time = start.elapsed();
        info!("Transformed dataset: {} rows x {} columns", df.height(), df.width());

        let start = Instant::now();
        let split = train_test_split(
            &df,
            &self.config.target,
            self.config.split.test_size,
            self.config.split.seed,
        )?;
        stats.split_time = start.elapsed();
        stats.feature_count = split.x_train.width();
        stats.train_rows = split.x_train.height();
        stats.test_rows = split.x_test.height();
        info!(
            "Split into {} train / {} test rows (seed {})",
            stats.train_rows, stats.test_rows, self.config.split.seed
        );

        let manifest = self.persist(&chain, &split, layout)?;

        Ok(PreparedData {
            split,
            manifest,
            from_cache: false,
            stats: Some(stats),
        })
    }

    fn persist(
        &self,
        chain: &TransformChain,
        split: &TrainTestSplit,
        layout: &ArtifactLayout,
    ) -> Result<Manifest> {
        let (encoders, scaler_file) = chain
            .save(layout)
            .with_context(|| format!("Failed to write transform state under {}", layout.root().display()))?;

        let frames = [
            (split.x_train.clone(), layout.x_train_path()),
            (split.x_test.clone(), layout.x_test_path()),
            (split.y_train.clone(), layout.y_train_path()),
            (split.y_test.clone(), layout.y_test_path()),
        ];
        for (mut frame, path) in frames {
            save_dataset(&mut frame, &path)?;
        }

        let mut manifest = Manifest {
            created_at: String::new(),
            version: String::new(),
            schema: self.config.schema.clone(),
            target: self.config.target.clone(),
            id_columns: self.config.id_columns.clone(),
            bins: self.config.bins.clone(),
            encoders,
            scaler_file,
            feature_columns: column_names(&split.x_train),
            split_seed: self.config.split.seed,
            test_size: self.config.split.test_size,
        };
        manifest.stamp();
        let path = manifest.save(layout)?;
        info!("Manifest written to {}", path.display());
        Ok(manifest)
    }

    /// Read a previously prepared split back from the artifact root.
    ///
    /// A split drawn with different split settings is still returned, with a
    /// warning; callers compare via [`Manifest::split_matches`].
    pub fn load_cached(&self, layout: &ArtifactLayout) -> Result<PreparedData> {
        let manifest = Manifest::load(layout)?;
        if !manifest.split_matches(&self.config.split) {
            warn!(
                "Cached split used seed {} / test size {}, configuration asks for seed {} / test size {}",
                manifest.split_seed, manifest.test_size, self.config.split.seed, self.config.split.test_size
            );
        }
        let split = TrainTestSplit {
            x_train: load_dataset(&layout.x_train_path())?,
            x_test: load_dataset(&layout.x_test_path())?,
            y_train: load_dataset(&layout.y_train_path())?,
            y_test: load_dataset(&layout.y_test_path())?,
        };
        info!(
            "Reusing prepared data from {} ({} train / {} test rows)",
            layout.root().display(),
            split.x_train.height(),
            split.x_test.height()
        );
        Ok(PreparedData {
            split,
            manifest,
            from_cache: true,
            stats: None,
        })
    }

    /// Load the input file and prepare it, or reuse the cached split.
    ///
    /// The cache is used when every split file and the manifest exist and
    /// `force_rebuild` is false.
    pub fn run(&self, input: &Path, layout: &ArtifactLayout, force_rebuild: bool) -> Result<PreparedData> {
        if !force_rebuild && layout.has_prepared_data() {
            return self.load_cached(layout);
        }
        let raw = load_dataset(input)?;
        self.prepare_frame(raw, layout)
    }
}
