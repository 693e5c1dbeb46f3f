//! Gradient-boosted trees for binary log loss
//!
//! Starts from the log-odds of the positive rate and adds `learning_rate`
//! times a regression tree fitted to the residuals `y - p` each round.

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};

use super::tree::{RegressionTree, TreeParams};
use crate::config::ModelConfig;
use crate::error::{ChurnError, Result};

const PROBABILITY_EPS: f64 = 1e-6;

fn sigmoid(z: f64) -> f64 {
    1.0 / (1.0 + (-z).exp())
}

/// Boosted ensemble producing churn probabilities
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoosting {
    n_estimators: usize,
    learning_rate: f64,
    subsample: f64,
    params: TreeParams,
    random_state: u64,
    initial_log_odds: f64,
    trees: Vec<RegressionTree>,
}

impl GradientBoosting {
    pub fn new(config: &ModelConfig) -> Self {
        Self {
            n_estimators: config.n_estimators,
            learning_rate: config.learning_rate,
            subsample: config.subsample,
            params: TreeParams {
                max_depth: config.max_depth,
                min_samples_split: config.min_samples_split,
                min_samples_leaf: config.min_samples_leaf,
                max_features: None,
            },
            random_state: config.random_state,
            initial_log_odds: 0.0,
            trees: Vec::new(),
        }
    }

    pub fn is_fitted(&self) -> bool {
        !self.trees.is_empty()
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn fit(&mut self, x: &Array2<f64>, y: &Array1<f64>) -> Result<()> {
        let n_samples = x.nrows();
        if n_samples == 0 {
            return Err(ChurnError::InvalidRecord("cannot fit on an empty dataset".to_string()));
        }

        let positive_rate = y
            .mean()
            .unwrap_or(0.5)
            .clamp(PROBABILITY_EPS, 1.0 - PROBABILITY_EPS);
        self.initial_log_odds = (positive_rate / (1.0 - positive_rate)).ln();

        let mut log_odds = Array1::from_elem(n_samples, self.initial_log_odds);
        let mut rng = StdRng::seed_from_u64(self.random_state);
        let sample_size = ((n_samples as f64 * self.subsample).round() as usize).clamp(1, n_samples);
        let mut all_rows: Vec<usize> = (0..n_samples).collect();

        self.trees.clear();
        for _ in 0..self.n_estimators {
            let residuals: Vec<f64> = y
                .iter()
                .zip(log_odds.iter())
                .map(|(&target, &z)| target - sigmoid(z))
                .collect();

            let rows: &[usize] = if sample_size < n_samples {
                all_rows.shuffle(&mut rng);
                &all_rows[..sample_size]
            } else {
                &all_rows
            };

            let tree = RegressionTree::fit(x, &residuals, rows, &self.params, &mut rng)?;
            for (z, row) in log_odds.iter_mut().zip(x.outer_iter()) {
                *z += self.learning_rate * tree.predict_row(row);
            }
            self.trees.push(tree);
        }

        Ok(())
    }

    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if !self.is_fitted() {
            return Err(ChurnError::NotFitted("GradientBoosting"));
        }

        let probabilities: Vec<f64> = x
            .outer_iter()
            .map(|row| {
                let z = self.trees.iter().fold(self.initial_log_odds, |z, tree| {
                    z + self.learning_rate * tree.predict_row(row.view())
                });
                sigmoid(z)
            })
            .collect();
        Ok(Array1::from_vec(probabilities))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data() -> (Array2<f64>, Array1<f64>) {
        let n = 60;
        let x = Array2::from_shape_fn((n, 2), |(i, j)| if j == 0 { (i % 20) as f64 } else { i as f64 });
        let y = Array1::from_shape_fn(n, |i| if i % 20 >= 12 { 1.0 } else { 0.0 });
        (x, y)
    }

    #[test]
    fn test_boosting_fits_training_data() {
        let (x, y) = data();
        let config = ModelConfig {
            n_estimators: 30,
            max_depth: 3,
            ..Default::default()
        };
        let mut model = GradientBoosting::new(&config);
        model.fit(&x, &y).unwrap();
        assert_eq!(model.n_trees(), 30);

        let proba = model.predict_proba(&x).unwrap();
        let correct = proba
            .iter()
            .zip(y.iter())
            .filter(|(&p, &t)| (p >= 0.5) == (t == 1.0))
            .count();
        assert_eq!(correct, 60);
    }

    #[test]
    fn test_initial_log_odds_matches_base_rate() {
        let x = Array2::from_shape_fn((4, 1), |(i, _)| i as f64);
        let y = Array1::from_vec(vec![0.0, 0.0, 0.0, 1.0]);
        let config = ModelConfig {
            n_estimators: 1,
            max_depth: 1,
            learning_rate: 0.0,
            ..Default::default()
        };
        let mut model = GradientBoosting::new(&config);
        model.fit(&x, &y).unwrap();
        let proba = model.predict_proba(&x).unwrap();
        assert!((proba[0] - 0.25).abs() < 1e-9);
    }

    #[test]
    fn test_subsampling_is_seeded() {
        let (x, y) = data();
        let config = ModelConfig {
            n_estimators: 5,
            max_depth: 2,
            subsample: 0.5,
            ..Default::default()
        };
        let mut a = GradientBoosting::new(&config);
        let mut b = GradientBoosting::new(&config);
        a.fit(&x, &y).unwrap();
        b.fit(&x, &y).unwrap();
        assert_eq!(a, b);
    }
}
