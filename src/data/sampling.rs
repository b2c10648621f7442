//! Seeded row sampling and train/test partitioning

use super::Dataset;
use crate::error::{InsightError, Result};
use rand::prelude::*;
use rand_xoshiro::Xoshiro256PlusPlus;
use tracing::debug;

impl Dataset {
    /// Deterministic subsample of `n` rows without replacement.
    ///
    /// Selected rows keep their original relative order. Asking for at least
    /// as many rows as the dataset holds returns a copy of the whole dataset.
    pub fn sample(&self, n: usize, seed: u64) -> Result<Dataset> {
        let height = self.height();
        if n >= height {
            return Ok(self.clone());
        }
        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        let indices = shuffled_prefix(height, n, &mut rng);
        debug!(rows = n, of = height, seed, "Sampling dataset");
        self.take_rows(&indices)
    }

    /// Split into `(train, test)` with `test_fraction` of the rows in test
    pub fn train_test_split(&self, test_fraction: f64, seed: u64) -> Result<(Dataset, Dataset)> {
        if !(0.0..1.0).contains(&test_fraction) {
            return Err(InsightError::ValidationError(format!(
                "test_fraction must be in [0, 1), got {}",
                test_fraction
            )));
        }
        let height = self.height();
        let n_test = ((height as f64) * test_fraction).round() as usize;

        let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
        let test_idx = shuffled_prefix(height, n_test, &mut rng);

        let mut in_test = vec![false; height];
        for &i in &test_idx {
            in_test[i] = true;
        }
        let train_idx: Vec<usize> = (0..height).filter(|&i| !in_test[i]).collect();

        Ok((self.take_rows(&train_idx)?, self.take_rows(&test_idx)?))
    }
}

fn shuffled_prefix(n: usize, k: usize, rng: &mut Xoshiro256PlusPlus) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..n).collect();
    indices.shuffle(rng);
    indices.truncate(k);
    indices.sort_unstable();
    indices
}
