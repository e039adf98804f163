//! Deterministic utilities for reproducible training
//!
//! Provides an LCG-based RNG for shuffling, bootstrap resampling, and
//! feature subsampling, so identical seeds produce identical models
//! across platforms and runs.

use std::num::Wrapping;

/// Linear Congruential Generator for deterministic pseudo-randomness
/// Uses constants from Numerical Recipes (glibc)
#[derive(Clone, Debug)]
pub struct LcgRng {
    state: Wrapping<i64>,
}

impl LcgRng {
    // LCG constants (compatible with glibc)
    const MULTIPLIER: i64 = 1103515245;
    const INCREMENT: i64 = 12345;
    const MODULUS: i64 = 1 << 31;

    pub fn new(seed: i64) -> Self {
        // rem_euclid keeps the state in [0, MODULUS) for every seed,
        // including i64::MIN where abs() would overflow
        Self {
            state: Wrapping(seed.rem_euclid(Self::MODULUS)),
        }
    }

    /// Generate next random i64 in range [0, MODULUS)
    pub fn next_i64(&mut self) -> i64 {
        self.state = self.state * Wrapping(Self::MULTIPLIER) + Wrapping(Self::INCREMENT);
        (self.state.0 & (Self::MODULUS - 1)).abs()
    }

    /// Generate random index in range [0, len)
    pub fn next_index(&mut self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        (self.next_i64() % len as i64) as usize
    }

    /// Fisher-Yates shuffle in place
    pub fn shuffle<T>(&mut self, items: &mut [T]) {
        for i in (1..items.len()).rev() {
            let j = self.next_index(i + 1);
            items.swap(i, j);
        }
    }

    /// Draw `n` indices in [0, n) with replacement (one bootstrap sample)
    pub fn bootstrap_indices(&mut self, n: usize) -> Vec<usize> {
        (0..n).map(|_| self.next_index(n)).collect()
    }

    /// Pick `count` distinct values from [0, len) in ascending order
    pub fn sample_distinct(&mut self, len: usize, count: usize) -> Vec<usize> {
        let mut pool: Vec<usize> = (0..len).collect();
        self.shuffle(&mut pool);
        pool.truncate(count.min(len));
        pool.sort_unstable();
        pool
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lcg_determinism() {
        let mut rng1 = LcgRng::new(42);
        let mut rng2 = LcgRng::new(42);

        for _ in 0..100 {
            assert_eq!(rng1.next_i64(), rng2.next_i64());
        }
    }

    #[test]
    fn test_extreme_seeds_accepted() {
        for seed in [i64::MIN, i64::MIN + 1, -1, 0, i64::MAX] {
            let mut rng = LcgRng::new(seed);
            for _ in 0..10 {
                assert!(rng.next_i64() >= 0);
            }
        }

        let mut rng1 = LcgRng::new(i64::MIN);
        let mut rng2 = LcgRng::new(i64::MIN);
        assert_eq!(rng1.next_i64(), rng2.next_i64());
    }

    #[test]
    fn test_index_range() {
        let mut rng = LcgRng::new(42);
        for _ in 0..100 {
            assert!(rng.next_index(10) < 10);
        }
    }

    #[test]
    fn test_shuffle_determinism() {
        let mut items1: Vec<u32> = (0..50).collect();
        let mut items2 = items1.clone();

        LcgRng::new(7).shuffle(&mut items1);
        LcgRng::new(7).shuffle(&mut items2);

        assert_eq!(items1, items2);
    }

    #[test]
    fn test_bootstrap_shape() {
        let mut rng = LcgRng::new(42);
        let indices = rng.bootstrap_indices(100);

        assert_eq!(indices.len(), 100);
        assert!(indices.iter().all(|&i| i < 100));
    }

    #[test]
    fn test_sample_distinct() {
        let mut rng = LcgRng::new(42);
        let picked = rng.sample_distinct(10, 3);

        assert_eq!(picked.len(), 3);
        assert!(picked.windows(2).all(|w| w[0] < w[1]));
        assert!(picked.iter().all(|&i| i < 10));
    }
}
