use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Seed used for the shipped synthetic model.
pub const DEFAULT_SEED: u64 = 42;

/// Deterministic weight-initialization stream.
///
/// Wraps a seeded ChaCha8 RNG so that model construction never touches
/// ambient global randomness. Layers draw from the stream in a fixed
/// order; two contexts built from the same seed yield bit-identical
/// weights.
pub struct InitContext {
    rng: ChaCha8Rng,
}

impl InitContext {
    /// Creates a context from a fixed seed.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Draws `n` weights from `U(-b, b)` with `b = 1/sqrt(fan_in)`.
    ///
    /// Draws are performed in f64 and truncated to f32 so the stream
    /// consumption per weight is fixed.
    pub fn uniform_fan_in(&mut self, n: usize, fan_in: usize) -> Vec<f32> {
        let bound = 1.0 / (fan_in as f64).sqrt();
        (0..n)
            .map(|_| self.rng.gen_range(-bound..bound) as f32)
            .collect()
    }
}
