//! Latency sampling with memory bounded by the sample target.

use rand::Rng;

/// Default number of latency samples per operation kind.
pub const DEFAULT_SAMPLE_TARGET: u64 = 20_000;

/// Decides per task whether its latency is recorded.
///
/// Each task is sampled independently with probability
/// `target / total_tasks`, so the expected number of samples is `target`
/// regardless of the task count. The actual count varies around the target.
#[derive(Debug, Clone, Copy)]
pub struct LatencySampler {
    total_tasks: u64,
    target: u64,
}

impl LatencySampler {
    pub fn new(total_tasks: u64, target: u64) -> Self {
        Self {
            total_tasks,
            target,
        }
    }

    pub fn should_sample<R: Rng + ?Sized>(&self, rng: &mut R) -> bool {
        if self.target >= self.total_tasks {
            return true;
        }
        if self.target == 0 {
            return false;
        }
        rng.gen_range(0..self.total_tasks) < self.target
    }

    pub fn target(&self) -> u64 {
        self.target
    }

    /// Capacity of the per-kind sample channels and sample sets.
    pub fn capacity(&self) -> usize {
        (self.target.min(self.total_tasks) as usize)
            .saturating_mul(2)
            .max(1)
    }
}

/// Bounded collection of latency samples in nanoseconds for one operation kind.
#[derive(Debug, Clone, Default)]
pub struct SampleSet {
    samples: Vec<u64>,
    capacity: usize,
    dropped: u64,
}

impl SampleSet {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            samples: Vec::with_capacity(capacity),
            capacity,
            dropped: 0,
        }
    }

    /// Build a set holding exactly `samples`.
    pub fn from_samples(samples: Vec<u64>) -> Self {
        let capacity = samples.len();
        Self {
            samples,
            capacity,
            dropped: 0,
        }
    }

    /// Append a sample. Returns false and counts a drop once the set is full.
    pub fn push(&mut self, nanos: u64) -> bool {
        if self.samples.len() >= self.capacity {
            self.dropped += 1;
            return false;
        }
        self.samples.push(nanos);
        true
    }

    pub fn samples(&self) -> &[u64] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn dropped(&self) -> u64 {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_expected_sample_count() {
        let sampler = LatencySampler::new(1_000_000, DEFAULT_SAMPLE_TARGET);

        for seed in 0..3 {
            let mut rng = StdRng::seed_from_u64(seed);
            let count = (0..1_000_000)
                .filter(|_| sampler.should_sample(&mut rng))
                .count() as f64;
            let target = DEFAULT_SAMPLE_TARGET as f64;
            assert!(
                (count - target).abs() < target * 0.15,
                "seed {}: {} samples",
                seed,
                count
            );
        }
    }

    #[test]
    fn test_small_domain_samples_everything() {
        let sampler = LatencySampler::new(10, 20);
        let mut rng = StdRng::seed_from_u64(1);
        assert!((0..10).all(|_| sampler.should_sample(&mut rng)));
        assert_eq!(sampler.capacity(), 20);
    }

    #[test]
    fn test_capacity_is_twice_the_reachable_samples() {
        assert_eq!(LatencySampler::new(1_000_000, DEFAULT_SAMPLE_TARGET).capacity(), 40_000);
        assert_eq!(LatencySampler::new(15_000, DEFAULT_SAMPLE_TARGET).capacity(), 30_000);
    }

    #[test]
    fn test_zero_target_samples_nothing() {
        let sampler = LatencySampler::new(1000, 0);
        let mut rng = StdRng::seed_from_u64(1);
        assert!((0..1000).all(|_| !sampler.should_sample(&mut rng)));
        assert_eq!(sampler.capacity(), 1);
    }

    #[test]
    fn test_sample_set_is_bounded() {
        let mut set = SampleSet::with_capacity(2);
        assert!(set.push(1));
        assert!(set.push(2));
        assert!(!set.push(3));
        assert_eq!(set.samples(), &[1, 2]);
        assert_eq!(set.dropped(), 1);
    }
}
