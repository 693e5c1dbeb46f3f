//! Held-out evaluation metrics

use log::info;
use polars::prelude::*;
use serde::{Deserialize, Serialize};

use super::{labels_from_frame, ModelArtifact, DECISION_THRESHOLD};
use crate::error::{ChurnError, Result};

/// Binary confusion counts, positive class = churn
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfusionMatrix {
    pub true_negative: usize,
    pub false_positive: usize,
    pub false_negative: usize,
    pub true_positive: usize,
}

impl ConfusionMatrix {
    pub fn from_labels(y_true: &[f64], y_pred: &[f64]) -> Self {
        let mut matrix = Self::default();
        for (&actual, &predicted) in y_true.iter().zip(y_pred.iter()) {
            match (actual >= DECISION_THRESHOLD, predicted >= DECISION_THRESHOLD) {
                (false, false) => matrix.true_negative += 1,
                (false, true) => matrix.false_positive += 1,
                (true, false) => matrix.false_negative += 1,
                (true, true) => matrix.true_positive += 1,
            }
        }
        matrix
    }

    pub fn total(&self) -> usize {
        self.true_negative + self.false_positive + self.false_negative + self.true_positive
    }
}

/// Classification metrics on a held-out split
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
    pub confusion_matrix: ConfusionMatrix,
}

fn ratio(numerator: usize, denominator: usize) -> f64 {
    if denominator == 0 {
        0.0
    } else {
        numerator as f64 / denominator as f64
    }
}

impl EvaluationReport {
    /// Metrics from a confusion matrix; zero denominators give 0.0
    pub fn from_confusion(cm: ConfusionMatrix) -> Self {
        let accuracy = ratio(cm.true_positive + cm.true_negative, cm.total());
        let precision = ratio(cm.true_positive, cm.true_positive + cm.false_positive);
        let recall = ratio(cm.true_positive, cm.true_positive + cm.false_negative);
        let f1 = if precision + recall == 0.0 {
            0.0
        } else {
            2.0 * precision * recall / (precision + recall)
        };

        Self {
            accuracy,
            precision,
            recall,
            f1,
            confusion_matrix: cm,
        }
    }
}

/// Scores a trained model on the test split
#[derive(Debug, Clone, Default)]
pub struct ModelEvaluator;

impl ModelEvaluator {
    pub fn new() -> Self {
        Self
    }

    pub fn evaluate(
        &self,
        model: &ModelArtifact,
        x_test: &DataFrame,
        y_test: &DataFrame,
    ) -> Result<EvaluationReport> {
        if x_test.height() != y_test.height() {
            return Err(ChurnError::InvalidRecord(format!(
                "test features have {} rows but labels have {}",
                x_test.height(),
                y_test.height()
            )));
        }

        let y_true = labels_from_frame(y_test, &model.target)?.to_vec();
        let x = model.feature_matrix(x_test)?;
        let y_pred = model.classifier.predict(&x)?.to_vec();

        let report = EvaluationReport::from_confusion(ConfusionMatrix::from_labels(&y_true, &y_pred));
        info!(
            "Test accuracy {:.4}, precision {:.4}, recall {:.4}, F1 {:.4}",
            report.accuracy, report.precision, report.recall, report.f1
        );
        Ok(report)
    }
}
