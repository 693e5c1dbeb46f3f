//! End-to-end workflows shared by the CLI and integration tests

use std::path::Path;

use anyhow::{Context, Result};
use log::info;

use crate::config::PipelineConfig;
use crate::model::{builder_for, EvaluationReport, ModelArtifact, ModelEvaluator, ModelTrainer};
use crate::pipeline::{ArtifactLayout, DataPipeline, PreparedData};

/// Result of a training run
#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub artifact: ModelArtifact,
    pub train_accuracy: f64,
    pub report: EvaluationReport,
}

/// Prepare (or reuse) the split under `layout`
pub fn prepare(
    config: &PipelineConfig,
    input: &Path,
    layout: &ArtifactLayout,
    force_rebuild: bool,
) -> Result<PreparedData> {
    DataPipeline::new(config)
        .run(input, layout, force_rebuild)
        .with_context(|| format!("Failed to prepare data from {}", input.display()))
}

/// Build, fit, evaluate and persist the configured model on a prepared split
pub fn train(
    config: &PipelineConfig,
    prepared: &PreparedData,
    layout: &ArtifactLayout,
) -> Result<TrainingOutcome> {
    let builder = builder_for(&config.model);
    info!("Building {} model", builder.name());

    let trainer = ModelTrainer::new();
    let (artifact, train_accuracy) = trainer
        .train(builder.build(), &prepared.split.x_train, &prepared.split.y_train)
        .context("Model training failed")?;

    let report = ModelEvaluator::new()
        .evaluate(&artifact, &prepared.split.x_test, &prepared.split.y_test)
        .context("Model evaluation failed")?;

    let model_path = layout.model_path();
    trainer
        .save_model(&artifact, &model_path)
        .with_context(|| format!("Failed to save model to {}", model_path.display()))?;

    Ok(TrainingOutcome {
        artifact,
        train_accuracy,
        report,
    })
}
