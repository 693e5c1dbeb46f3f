//! Random forest classifier
//!
//! Trees are grown in parallel with rayon. Tree `i` draws its bootstrap
//! sample and feature subsets from `StdRng::seed_from_u64(random_state + i)`,
//! so the fitted forest does not depend on thread scheduling.

use ndarray::{Array1, Array2};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::tree::{RegressionTree, TreeParams};
use crate::config::ModelConfig;
use crate::error::{ChurnError, Result};

/// Bagged ensemble of probability trees
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RandomForest {
    n_estimators: usize,
    params: TreeParams,
    random_state: u64,
    trees: Vec<RegressionTree>,
}

impl RandomForest {
    pub fn new(config: &ModelConfig) -> Self {
        Self {
            n_estimators: config.n_estimators,
            params: TreeParams {
                max_depth: config.max_depth,
                min_samples_split: config.min_samples_split,
                min_samples_leaf: config.min_samples_leaf,
                max_features: None,
            },
            random_state: config.random_state,
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

        // sqrt(n_features) candidates per split
        let mut params = self.params;
        params.max_features = Some(((x.ncols() as f64).sqrt().round() as usize).max(1));
        self.params = params;

        let labels = y.to_vec();
        let base_seed = self.random_state;

        let trees = (0..self.n_estimators)
            .into_par_iter()
            .map(|tree_idx| {
                let mut rng = StdRng::seed_from_u64(base_seed.wrapping_add(tree_idx as u64));
                let rows: Vec<usize> = (0..n_samples).map(|_| rng.gen_range(0..n_samples)).collect();
                RegressionTree::fit(x, &labels, &rows, &params, &mut rng)
            })
            .collect::<Result<Vec<_>>>()?;

        self.trees = trees;
        Ok(())
    }

    /// Mean of the trees' positive-class frequencies
    pub fn predict_proba(&self, x: &Array2<f64>) -> Result<Array1<f64>> {
        if !self.is_fitted() {
            return Err(ChurnError::NotFitted("RandomForest"));
        }

        let n_trees = self.trees.len() as f64;
        let probabilities: Vec<f64> = x
            .outer_iter()
            .map(|row| {
                self.trees
                    .iter()
                    .map(|tree| tree.predict_row(row.view()))
                    .sum::<f64>()
                    / n_trees
            })
            .collect();
        Ok(Array1::from_vec(probabilities))
    }
}
