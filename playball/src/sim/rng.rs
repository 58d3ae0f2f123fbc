// Injectable randomness for the simulation.

use std::collections::VecDeque;

use rand::rngs::{StdRng, ThreadRng};
use rand::{Rng, SeedableRng};

/// Source of uniform draws in `[0, 1)`.
///
/// Every probability gate in the engine takes one fresh draw from this
/// source, so a scripted implementation fully determines a game.
pub trait RandomSource {
    fn uniform(&mut self) -> f64;

    /// Roll against a percentage. Values at or below zero never fire,
    /// values at or above 100 always do.
    fn chance(&mut self, percent: f64) -> bool {
        self.uniform() * 100.0 < percent
    }
}

impl<T: RandomSource + ?Sized> RandomSource for &mut T {
    fn uniform(&mut self) -> f64 {
        (**self).uniform()
    }
}

/// Adapter from any `rand::Rng` to `RandomSource`.
#[derive(Debug, Clone)]
pub struct RngSource<R: Rng> {
    rng: R,
}

impl<R: Rng> RngSource<R> {
    pub fn new(rng: R) -> Self {
        RngSource { rng }
    }
}

impl RngSource<ThreadRng> {
    /// Process-wide entropy. Games are not reproducible.
    pub fn thread() -> Self {
        RngSource::new(rand::thread_rng())
    }
}

impl RngSource<StdRng> {
    /// Reproducible generator: the same seed replays the same game.
    pub fn seeded(seed: u64) -> Self {
        RngSource::new(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> RandomSource for RngSource<R> {
    fn uniform(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }
}

/// Replays a fixed sequence of draws, then repeats `fallback` forever.
#[derive(Debug, Clone)]
pub struct ScriptedRandom {
    values: VecDeque<f64>,
    fallback: f64,
}

impl ScriptedRandom {
    pub fn new(values: impl IntoIterator<Item = f64>, fallback: f64) -> Self {
        ScriptedRandom {
            values: values.into_iter().collect(),
            fallback,
        }
    }

    /// A source that always returns `value`.
    pub fn constant(value: f64) -> Self {
        ScriptedRandom::new([], value)
    }

    /// Draws still queued before the fallback kicks in.
    pub fn remaining(&self) -> usize {
        self.values.len()
    }
}

impl RandomSource for ScriptedRandom {
    fn uniform(&mut self) -> f64 {
        self.values.pop_front().unwrap_or(self.fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scripted_values_then_fallback() {
        let mut rng = ScriptedRandom::new([0.1, 0.2], 0.9);
        assert_eq!(rng.uniform(), 0.1);
        assert_eq!(rng.remaining(), 1);
        assert_eq!(rng.uniform(), 0.2);
        assert_eq!(rng.uniform(), 0.9);
        assert_eq!(rng.uniform(), 0.9);
    }

    #[test]
    fn chance_edges() {
        let mut rng = ScriptedRandom::constant(0.0);
        assert!(!rng.chance(0.0));
        assert!(!rng.chance(-10.0));
        assert!(rng.chance(0.5));

        let mut rng = ScriptedRandom::constant(0.999);
        assert!(rng.chance(100.0));
        assert!(!rng.chance(99.0));
    }

    #[test]
    fn seeded_sources_replay() {
        let mut a = RngSource::seeded(42);
        let mut b = RngSource::seeded(42);
        for _ in 0..32 {
            let x = a.uniform();
            assert!((0.0..1.0).contains(&x));
            assert_eq!(x, b.uniform());
        }
    }

    #[test]
    fn mutable_reference_is_a_source() {
        fn draw<R: RandomSource>(mut r: R) -> f64 {
            r.uniform()
        }
        let mut rng = ScriptedRandom::new([0.25], 0.5);
        assert_eq!(draw(&mut rng), 0.25);
        assert_eq!(rng.uniform(), 0.5);
    }
}
