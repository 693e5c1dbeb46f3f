//! Regression tree used as the base learner of both ensembles
//!
//! Splits minimise the squared error of the leaf means. For 0/1 labels the
//! leaf mean is the positive-class frequency, which is what the forest
//! averages; the boosting rounds fit the same tree to log-loss residuals.

use ndarray::{Array2, ArrayView1};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::error::{ChurnError, Result};

/// Tree node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TreeNode {
    Leaf {
        value: f64,
        n_samples: usize,
    },
    Split {
        feature: usize,
        /// Rows with `x[feature] <= threshold` go left
        threshold: f64,
        left: Box<TreeNode>,
        right: Box<TreeNode>,
    },
}

/// Growth limits for one tree
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    /// Features considered per split; all when `None`
    pub max_features: Option<usize>,
}

/// A fitted regression tree
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    root: TreeNode,
    n_features: usize,
}

struct Builder<'a> {
    x: &'a Array2<f64>,
    y: &'a [f64],
    params: &'a TreeParams,
    rng: &'a mut StdRng,
}

struct BestSplit {
    feature: usize,
    threshold: f64,
    gain: f64,
}

impl RegressionTree {
    /// Fit on the given rows of `x` (repeats allowed, as in a bootstrap sample)
    pub fn fit(
        x: &Array2<f64>,
        y: &[f64],
        rows: &[usize],
        params: &TreeParams,
        rng: &mut StdRng,
    ) -> Result<Self> {
        if x.nrows() != y.len() {
            return Err(ChurnError::InvalidRecord(format!(
                "feature matrix has {} rows but {} labels",
                x.nrows(),
                y.len()
            )));
        }
        if rows.is_empty() {
            return Err(ChurnError::InvalidRecord(
                "cannot fit a tree on zero rows".to_string(),
            ));
        }

        let mut rows = rows.to_vec();
        let mut builder = Builder { x, y, params, rng };
        let root = builder.grow(&mut rows, 0);
        Ok(Self {
            root,
            n_features: x.ncols(),
        })
    }

    pub fn n_features(&self) -> usize {
        self.n_features
    }

    pub fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        let mut node = &self.root;
        loop {
            match node {
                TreeNode::Leaf { value, .. } => return *value,
                TreeNode::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    node = if row[*feature] <= *threshold { &**left } else { &**right };
                }
            }
        }
    }

    pub fn depth(&self) -> usize {
        fn depth_of(node: &TreeNode) -> usize {
            match node {
                TreeNode::Leaf { .. } => 0,
                TreeNode::Split { left, right, .. } => 1 + depth_of(left).max(depth_of(right)),
            }
        }
        depth_of(&self.root)
    }
}

impl Builder<'_> {
    fn grow(&mut self, rows: &mut [usize], depth: usize) -> TreeNode {
        let n = rows.len();
        let mean = rows.iter().map(|&r| self.y[r]).sum::<f64>() / n as f64;
        let leaf = TreeNode::Leaf {
            value: mean,
            n_samples: n,
        };

        if depth >= self.params.max_depth
            || n < self.params.min_samples_split.max(2)
            || n < 2 * self.params.min_samples_leaf.max(1)
            || rows.iter().all(|&r| self.y[r] == self.y[rows[0]])
        {
            return leaf;
        }

        let Some(best) = self.best_split(rows) else {
            return leaf;
        };

        // Partition rows in place: left side first
        let mut boundary = 0;
        for i in 0..n {
            if self.x[[rows[i], best.feature]] <= best.threshold {
                rows.swap(i, boundary);
                boundary += 1;
            }
        }
        let (left_rows, right_rows) = rows.split_at_mut(boundary);

        let left = self.grow(left_rows, depth + 1);
        let right = self.grow(right_rows, depth + 1);
        TreeNode::Split {
            feature: best.feature,
            threshold: best.threshold,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    fn candidate_features(&mut self) -> Vec<usize> {
        let mut features: Vec<usize> = (0..self.x.ncols()).collect();
        if let Some(k) = self.params.max_features {
            if k < features.len() {
                features.shuffle(&mut *self.rng);
                features.truncate(k.max(1));
            }
        }
        features
    }

    /// Sweep each candidate feature in sorted order, scoring every cut by the
    /// reduction in squared error
    fn best_split(&mut self, rows: &[usize]) -> Option<BestSplit> {
        let n = rows.len();
        let min_leaf = self.params.min_samples_leaf.max(1);
        let total: f64 = rows.iter().map(|&r| self.y[r]).sum();
        let parent_score = total * total / n as f64;

        let mut best: Option<BestSplit> = None;
        let mut order: Vec<usize> = rows.to_vec();

        for feature in self.candidate_features() {
            let x = self.x;
            order.sort_by(|&a, &b| x[[a, feature]].total_cmp(&x[[b, feature]]));

            let mut left_sum = 0.0;
            for i in 0..n - 1 {
                left_sum += self.y[order[i]];
                let left_n = i + 1;
                let right_n = n - left_n;
                if left_n < min_leaf || right_n < min_leaf {
                    continue;
                }

                let current = x[[order[i], feature]];
                let next = x[[order[i + 1], feature]];
                if current == next {
                    continue;
                }

                let right_sum = total - left_sum;
                let gain = left_sum * left_sum / left_n as f64
                    + right_sum * right_sum / right_n as f64
                    - parent_score;

                if gain > 1e-12 && best.as_ref().map_or(true, |b| gain > b.gain) {
                    best = Some(BestSplit {
                        feature,
                        threshold: (current + next) / 2.0,
                        gain,
                    });
                }
            }
        }

        best
    }
}
