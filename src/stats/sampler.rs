//! Reservoir sampling (Algorithm L, Li 1994)
//!
//! Maintains a uniform random sample of fixed size `k` over a stream of
//! unknown length in O(k) memory. Unlike the naive algorithm, Algorithm L
//! skips ahead by a geometrically distributed count between replacements,
//! so the per-element cost is O(1) amortized and most elements are never
//! touched at all.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

pub struct ReservoirSampler<T> {
    capacity: usize,
    reservoir: Vec<T>,
    /// Elements offered so far.
    seen: u64,
    /// Current value of the W statistic.
    w: f64,
    /// Stream index of the next element to admit.
    next_index: u64,
    rng: StdRng,
}

impl<T> ReservoirSampler<T> {
    pub fn new(capacity: usize) -> Self {
        Self::with_rng(capacity, StdRng::from_entropy())
    }

    /// Deterministic sampler for tests.
    pub fn with_seed(capacity: usize, seed: u64) -> Self {
        Self::with_rng(capacity, StdRng::seed_from_u64(seed))
    }

    fn with_rng(capacity: usize, rng: StdRng) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            reservoir: Vec::with_capacity(capacity),
            seen: 0,
            w: 0.0,
            next_index: 0,
            rng,
        }
    }

    /// Offer one element from the stream.
    pub fn add(&mut self, item: T) {
        self.seen += 1;

        // Phase 1: fill the reservoir directly.
        if self.reservoir.len() < self.capacity {
            self.reservoir.push(item);
            if self.reservoir.len() == self.capacity {
                self.w = self.random_unit().powf(1.0 / self.capacity as f64);
                self.advance_skip();
            }
            return;
        }

        // Phase 2: replace only at the precomputed skip index.
        if self.seen == self.next_index {
            let slot = self.rng.gen_range(0..self.capacity);
            self.reservoir[slot] = item;
            self.w *= self.random_unit().powf(1.0 / self.capacity as f64);
            self.advance_skip();
        }
    }

    /// Compute the next admission index. `ln_1p(-w)` keeps the denominator
    /// stable when `w` is close to zero.
    fn advance_skip(&mut self) {
        let skip = (self.random_unit().ln() / (-self.w).ln_1p()).floor() as u64;
        self.next_index = self.seen + skip + 1;
    }

    /// Uniform draw in (0, 1]; never exactly zero so `ln` stays finite.
    fn random_unit(&mut self) -> f64 {
        let x: f64 = self.rng.gen();
        x.max(f64::MIN_POSITIVE)
    }

    pub fn samples(&self) -> &[T] {
        &self.reservoir
    }

    pub fn into_samples(self) -> Vec<T> {
        self.reservoir
    }

    pub fn seen(&self) -> u64 {
        self.seen
    }

    pub fn is_full(&self) -> bool {
        self.reservoir.len() == self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fills_below_capacity() {
        let mut sampler = ReservoirSampler::with_seed(10, 1);
        for i in 0..5 {
            sampler.add(i);
        }
        assert_eq!(sampler.samples(), &[0, 1, 2, 3, 4]);
        assert!(!sampler.is_full());
    }

    #[test]
    fn test_capacity_bound_holds() {
        let mut sampler = ReservoirSampler::with_seed(100, 2);
        for i in 0..100_000u64 {
            sampler.add(i);
        }
        assert_eq!(sampler.samples().len(), 100);
        assert_eq!(sampler.seen(), 100_000);
    }

    #[test]
    fn test_samples_come_from_stream() {
        let mut sampler = ReservoirSampler::with_seed(50, 3);
        for i in 0..10_000u64 {
            sampler.add(i);
        }
        for &s in sampler.samples() {
            assert!(s < 10_000);
        }
    }

    #[test]
    fn test_sampling_is_roughly_uniform() {
        // Sample 1k of 100k elements; the sample mean should land near the
        // stream mean. With a seeded RNG this is deterministic.
        let mut sampler = ReservoirSampler::with_seed(1000, 4);
        let n = 100_000u64;
        for i in 0..n {
            sampler.add(i);
        }
        let mean: f64 =
            sampler.samples().iter().map(|&v| v as f64).sum::<f64>() / 1000.0;
        let expected = (n - 1) as f64 / 2.0;
        let deviation = (mean - expected).abs() / expected;
        assert!(deviation < 0.10, "sample mean {mean}, expected {expected}");
    }

    #[test]
    fn test_later_elements_get_admitted() {
        let mut sampler = ReservoirSampler::with_seed(100, 5);
        for i in 0..50_000u64 {
            sampler.add(i);
        }
        let late = sampler.samples().iter().filter(|&&v| v >= 25_000).count();
        assert!(late > 20, "only {late} samples from the second half");
    }

    #[test]
    fn test_zero_capacity_clamped() {
        let mut sampler = ReservoirSampler::with_seed(0, 6);
        sampler.add(1);
        sampler.add(2);
        assert_eq!(sampler.samples().len(), 1);
    }
}
