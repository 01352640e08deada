//! Expanding-window, time-ordered fold generation

use crate::error::{ForecastError, Result};
use std::ops::Range;

/// One train/test split; every train index precedes every test index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fold {
    /// Zero-based fold number
    pub index: usize,
    /// Training sample indices
    pub train: Range<usize>,
    /// Test sample indices
    pub test: Range<usize>,
}

/// Splits `n_samples` ordered samples into `n_splits` expanding folds
///
/// The samples are divided into `n_splits + 1` equal test-sized blocks
/// (any remainder goes to the first training block). Fold `k` trains on
/// everything before block `k + 1` and tests on that block, so training
/// ranges grow and nothing is shuffled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeSeriesSplit {
    n_splits: usize,
}

impl TimeSeriesSplit {
    /// Create a splitter producing `n_splits` folds
    pub fn new(n_splits: usize) -> Result<Self> {
        if n_splits < 2 {
            return Err(ForecastError::InvalidParameter(format!(
                "n_splits must be at least 2, got {}",
                n_splits
            )));
        }
        Ok(Self { n_splits })
    }

    /// Number of folds produced
    pub fn n_splits(&self) -> usize {
        self.n_splits
    }

    /// Generate the folds for `n_samples` samples
    pub fn split(&self, n_samples: usize) -> Result<Vec<Fold>> {
        let n_blocks = self.n_splits + 1;
        if n_samples < n_blocks {
            return Err(ForecastError::insufficient(
                n_blocks,
                n_samples,
                format!("{} time-ordered folds", self.n_splits),
            ));
        }

        let test_size = n_samples / n_blocks;
        let first_test = n_samples - self.n_splits * test_size;

        Ok((0..self.n_splits)
            .map(|index| {
                let test_start = first_test + index * test_size;
                Fold {
                    index,
                    train: 0..test_start,
                    test: test_start..test_start + test_size,
                }
            })
            .collect())
    }
}
