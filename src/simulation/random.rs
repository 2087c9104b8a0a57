//! Injectable random sources for the perturbation step.

use rand::prelude::*;

/// Source of normalized samples.
///
/// `next_signed` yields values in `[-1, 1]`; a sample of `-1` moves a metric
/// by exactly `-max_delta`. `next_unit` yields values in `[0, 1)` and drives
/// the probabilistic parts of the engine (noise alerts).
pub trait RandomSource: Send + Sync {
    fn next_signed(&mut self) -> f64;
    fn next_unit(&mut self) -> f64;

    /// Pick an index in `0..len`. `len` must be non-zero.
    fn pick(&mut self, len: usize) -> usize {
        let idx = (self.next_unit() * len as f64) as usize;
        idx.min(len.saturating_sub(1))
    }
}

/// `StdRng`-backed source, reproducible when seeded.
#[derive(Debug, Clone)]
pub struct SeededRandom {
    rng: StdRng,
}

impl SeededRandom {
    pub fn new(seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        Self { rng }
    }
}

impl RandomSource for SeededRandom {
    fn next_signed(&mut self) -> f64 {
        self.rng.gen_range(-1.0..=1.0)
    }

    fn next_unit(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

/// Replays a fixed list of signed samples, cycling when exhausted.
///
/// `next_unit` maps the same stream onto `[0, 1]` via `(v + 1) / 2`.
#[derive(Debug, Clone)]
pub struct ScriptedRandom {
    values: Vec<f64>,
    pos: usize,
}

impl ScriptedRandom {
    pub fn new(values: Vec<f64>) -> Self {
        Self { values, pos: 0 }
    }

    /// Every sample equal to `value`.
    pub fn constant(value: f64) -> Self {
        Self::new(vec![value])
    }

    fn next_raw(&mut self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let v = self.values[self.pos % self.values.len()];
        self.pos += 1;
        v.clamp(-1.0, 1.0)
    }
}

impl RandomSource for ScriptedRandom {
    fn next_signed(&mut self) -> f64 {
        self.next_raw()
    }

    fn next_unit(&mut self) -> f64 {
        (self.next_raw() + 1.0) / 2.0
    }
}
