//! Sampling policies for high-frequency backup triggers

/// Decides whether one occurrence of a high-frequency event is acted on
pub trait Sampler: Send + Sync {
    fn sample(&mut self) -> bool;
}

/// Samples each occurrence independently with probability `rate`
pub struct RandomSampler {
    rate: f64,
    rng: fastrand::Rng,
}

impl RandomSampler {
    pub fn new(rate: f64) -> Self {
        Self {
            rate: rate.clamp(0.0, 1.0),
            rng: fastrand::Rng::new(),
        }
    }

    /// Deterministic sampler for reproducible runs
    pub fn seeded(rate: f64, seed: u64) -> Self {
        Self {
            rate: rate.clamp(0.0, 1.0),
            rng: fastrand::Rng::with_seed(seed),
        }
    }

    pub fn rate(&self) -> f64 {
        self.rate
    }
}

impl Sampler for RandomSampler {
    fn sample(&mut self) -> bool {
        self.rng.f64() < self.rate
    }
}

/// Always or never samples
pub struct FixedSampler(pub bool);

impl Sampler for FixedSampler {
    fn sample(&mut self) -> bool {
        self.0
    }
}

/// Samples every `n`th occurrence
pub struct EveryNth {
    n: u64,
    seen: u64,
}

impl EveryNth {
    pub fn new(n: u64) -> Self {
        Self { n: n.max(1), seen: 0 }
    }
}

impl Sampler for EveryNth {
    fn sample(&mut self) -> bool {
        self.seen += 1;
        self.seen % self.n == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_sampler_is_a_minority() {
        let mut sampler = RandomSampler::seeded(0.1, 1234);
        let hits = (0..10_000).filter(|_| sampler.sample()).count();
        assert!(hits > 500 && hits < 1500, "hits = {}", hits);
    }

    #[test]
    fn test_seeded_samplers_agree() {
        let mut a = RandomSampler::seeded(0.1, 99);
        let mut b = RandomSampler::seeded(0.1, 99);
        let left: Vec<bool> = (0..200).map(|_| a.sample()).collect();
        let right: Vec<bool> = (0..200).map(|_| b.sample()).collect();
        assert_eq!(left, right);
    }

    #[test]
    fn test_rate_is_clamped() {
        assert_eq!(RandomSampler::new(3.0).rate(), 1.0);
        let mut never = RandomSampler::seeded(-1.0, 5);
        assert!((0..1000).all(|_| !never.sample()));
    }

    #[test]
    fn test_every_nth() {
        let mut sampler = EveryNth::new(10);
        let hits: Vec<usize> = (1..=30).filter(|_| sampler.sample()).collect();
        assert_eq!(hits, vec![10, 20, 30]);
        assert!(FixedSampler(true).sample());
        assert!(!FixedSampler(false).sample());
    }
}
