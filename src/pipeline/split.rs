//! Seeded train/test splitting

use polars::prelude::*;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

use super::columns::require_column;
use crate::error::{ChurnError, Result};

/// Feature and label partitions of a dataset
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
    pub x_train: DataFrame,
    pub x_test: DataFrame,
    pub y_train: DataFrame,
    pub y_test: DataFrame,
}

/// Number of test rows for `n` rows: `ceil(n * test_size)`
pub fn test_row_count(n: usize, test_size: f64) -> usize {
    (n as f64 * test_size).ceil() as usize
}

/// Shuffle row indices with a seeded RNG and cut off the test partition.
///
/// Both partitions are non-empty, disjoint, and together cover every row.
/// Feature frames exclude the target; label frames hold only the target.
pub fn train_test_split(
    df: &DataFrame,
    target: &str,
    test_size: f64,
    seed: u64,
) -> Result<TrainTestSplit> {
    if !(test_size > 0.0 && test_size < 1.0) {
        return Err(ChurnError::InvalidConfig(format!(
            "test_size must be in (0, 1), got {}",
            test_size
        )));
    }
    require_column(df, target)?;

    let n = df.height();
    let n_test = test_row_count(n, test_size);
    if n_test == 0 || n_test >= n {
        return Err(ChurnError::InvalidConfig(format!(
            "cannot split {} row(s) with test_size {}",
            n, test_size
        )));
    }

    let mut indices: Vec<IdxSize> = (0..n as IdxSize).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let (test_idx, train_idx) = indices.split_at(n_test);
    let train = df.take(&IdxCa::from_vec("idx".into(), train_idx.to_vec()))?;
    let test = df.take(&IdxCa::from_vec("idx".into(), test_idx.to_vec()))?;

    Ok(TrainTestSplit {
        x_train: train.drop(target)?,
        x_test: test.drop(target)?,
        y_train: train.select([target])?,
        y_test: test.select([target])?,
    })
}
