//! Parallel processing utilities

use crate::error::{InsightError, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Configuration for parallel evaluation of independent work items
/// (grid points, feature pairs)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParallelConfig {
    /// Evaluate items on the rayon pool instead of sequentially
    pub enabled: bool,
    /// Number of threads (None = rayon's global pool)
    pub n_threads: Option<usize>,
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            n_threads: None,
        }
    }
}

impl ParallelConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Strictly sequential evaluation
    pub fn sequential() -> Self {
        Self {
            enabled: false,
            n_threads: None,
        }
    }

    /// Set number of threads
    pub fn with_threads(mut self, n: usize) -> Self {
        self.n_threads = Some(n.max(1));
        self
    }

    /// Get the number of threads to use
    pub fn num_threads(&self) -> usize {
        if !self.enabled {
            return 1;
        }
        self.n_threads.unwrap_or_else(rayon::current_num_threads)
    }

    /// Fallible map that preserves input order in the output, whichever
    /// thread evaluated each item. Stops at the first error.
    ///
    /// A call made from inside a rayon worker runs on that worker's pool,
    /// whatever `n_threads` says.
    pub fn try_map<T, U, F>(&self, items: &[T], f: F) -> Result<Vec<U>>
    where
        T: Sync,
        U: Send,
        F: Fn(&T) -> Result<U> + Send + Sync,
    {
        if !self.enabled || items.len() < 2 {
            return items.iter().map(f).collect();
        }

        match self.n_threads {
            None => items.par_iter().map(f).collect(),
            Some(_) if rayon::current_thread_index().is_some() => items.par_iter().map(f).collect(),
            Some(n) => {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(n)
                    .build()
                    .map_err(|e| InsightError::ComputationError(e.to_string()))?;
                pool.install(|| items.par_iter().map(f).collect())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_try_map_preserves_order() {
        let items: Vec<i32> = (0..1000).collect();
        let results = ParallelConfig::new()
            .with_threads(4)
            .try_map(&items, |x| Ok(x * 2))
            .unwrap();

        assert_eq!(results.len(), 1000);
        assert_eq!(results[0], 0);
        assert_eq!(results[500], 1000);
    }

    #[test]
    fn test_nested_try_map_reuses_outer_pool() {
        let outer = ParallelConfig::new().with_threads(2);
        let inner = ParallelConfig::new().with_threads(3);

        let results = outer
            .try_map(&[0, 1, 2, 3], |&i| {
                let sizes = inner.try_map(&[0, 1, 2], |_| Ok(rayon::current_num_threads()))?;
                Ok((i, sizes))
            })
            .unwrap();

        for (expected, (i, sizes)) in results.into_iter().enumerate() {
            assert_eq!(i, expected);
            assert_eq!(sizes, vec![2, 2, 2]);
        }
    }

    #[test]
    fn test_try_map_propagates_error() {
        let items = vec![1, 2, 3];
        let result: Result<Vec<i32>> = ParallelConfig::sequential().try_map(&items, |&x| {
            if x == 2 {
                Err(InsightError::ComputationError("boom".to_string()))
            } else {
                Ok(x)
            }
        });
        assert!(result.is_err());
    }

    #[test]
    fn test_parallel_config() {
        let config = ParallelConfig::new().with_threads(4);
        assert_eq!(config.n_threads, Some(4));
        assert_eq!(config.num_threads(), 4);
        assert_eq!(ParallelConfig::sequential().num_threads(), 1);
    }
}
