//! Seedable random source owned by a model session.

use rand::rngs::StdRng;
use rand::distributions::Standard;
use rand::{Rng, RngCore, SeedableRng};

/// Random source injected into every stochastic evaluation.
///
/// Implements [RngCore], so it can be passed to any `rand` or `rand_distr`
/// distribution directly.
///
/// # Example
/// ```
/// use phylogen::random::RandomSource;
///
/// let mut a = RandomSource::seeded(42);
/// let mut b = RandomSource::seeded(42);
/// assert_eq!(a.uniform(), b.uniform());
/// ```
#[derive(Debug, Clone)]
pub struct RandomSource {
    rng: StdRng,
    seed: Option<u64>,
}

impl RandomSource {
    /// Creates a source with a fixed seed.
    pub fn seeded(seed: u64) -> Self {
        RandomSource {
            rng: StdRng::seed_from_u64(seed),
            seed: Some(seed),
        }
    }

    /// Creates a source seeded from operating system entropy.
    pub fn from_entropy() -> Self {
        RandomSource {
            rng: StdRng::from_entropy(),
            seed: None,
        }
    }

    /// Restarts the stream from `seed`.
    pub fn set_seed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
        self.seed = Some(seed);
    }

    /// Seed the stream was last (re)started from, if any.
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    /// Draws a uniform number in `[0, 1)`.
    pub fn uniform(&mut self) -> f64 {
        self.rng.sample(Standard)
    }

    /// Draws a uniform index in `0..upper`.
    ///
    /// # Panics
    /// Panics if `upper` is zero.
    pub fn index(&mut self, upper: usize) -> usize {
        self.rng.gen_range(0..upper)
    }
}

impl RngCore for RandomSource {
    fn next_u32(&mut self) -> u32 {
        self.rng.next_u32()
    }

    fn next_u64(&mut self) -> u64 {
        self.rng.next_u64()
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        self.rng.fill_bytes(dest)
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
        self.rng.try_fill_bytes(dest)
    }
}
