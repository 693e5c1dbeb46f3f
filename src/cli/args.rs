//! Command-line argument definitions using clap

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::{ModelKind, PipelineConfig};

/// churnkit - Prepare data, train and serve a customer churn classifier
#[derive(Parser, Debug)]
#[command(name = "churnkit")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Pipeline configuration file (JSON). Built-in churn defaults apply when omitted.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Artifact root directory (split data, encoders, scaler, manifest, model)
    #[arg(short, long, global = true, default_value = "artifacts")]
    pub artifacts: PathBuf,

    /// Skip interactive confirmation prompts
    #[arg(long, global = true, default_value = "false")]
    pub no_confirm: bool,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Clean, transform and split a raw dataset, persisting the fitted transforms
    Prepare {
        /// Raw dataset (CSV or Parquet)
        #[arg(short, long)]
        input: PathBuf,

        /// Rebuild even if prepared data already exists
        #[arg(long, default_value = "false")]
        force: bool,

        /// Override the split seed
        #[arg(long)]
        seed: Option<u64>,
    },

    /// Train and evaluate a model, preparing the data first if needed
    Train {
        /// Raw dataset, required when no prepared data exists or with --force
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Model kind: random-forest or gradient-boosting
        #[arg(short, long)]
        model: Option<ModelKind>,

        /// Override the split seed and the model random state
        #[arg(long)]
        seed: Option<u64>,

        /// Rebuild prepared data before training
        #[arg(long, default_value = "false")]
        force: bool,
    },

    /// Predict churn for one JSON record
    Predict {
        /// Record as inline JSON, or @path to read it from a file
        #[arg(short, long)]
        record: String,
    },

    /// Answer newline-delimited JSON records from stdin, one prediction per line
    Serve {
        /// Per-request timeout in milliseconds
        #[arg(long, default_value = "5000")]
        timeout_ms: u64,
    },
}

impl Cli {
    /// Load the configuration file (or defaults) and apply command-line overrides
    pub fn resolve_config(&self) -> Result<PipelineConfig> {
        let mut config = match &self.config {
            Some(path) => PipelineConfig::from_json_file(path)
                .with_context(|| format!("Failed to load configuration from {}", path.display()))?,
            None => PipelineConfig::default(),
        };

        match &self.command {
            Commands::Prepare { seed, .. } => {
                if let Some(seed) = seed {
                    config.split.seed = *seed;
                }
            }
            Commands::Train { model, seed, .. } => {
                if let Some(kind) = model {
                    config.model.kind = *kind;
                }
                if let Some(seed) = seed {
                    config.split.seed = *seed;
                    config.model.random_state = *seed;
                }
            }
            Commands::Predict { .. } | Commands::Serve { .. } => {}
        }

        config.validate()?;
        Ok(config)
    }
}
