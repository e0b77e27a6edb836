//! Random index sources used to pick the next ball.

use rand::{
    Rng, SeedableRng, TryRngCore,
    rngs::{OsRng, StdRng},
};
use tracing::warn;

/// Produces uniformly distributed indices into the remaining pool.
pub trait DrawSource: Send {
    /// Return an index in `0..k`.
    ///
    /// Panics when `k == 0`: the engine never draws from an empty pool.
    fn pick_index(&mut self, k: usize) -> usize;
}

/// Draws from the operating system's cryptographic generator, degrading to the
/// thread-local PRNG when the OS source fails.
#[derive(Debug, Default)]
pub struct SystemDrawSource {
    fallback_reported: bool,
}

impl SystemDrawSource {
    /// Create a new system-backed draw source.
    pub fn new() -> Self {
        Self::default()
    }
}

impl DrawSource for SystemDrawSource {
    fn pick_index(&mut self, k: usize) -> usize {
        assert!(k > 0, "cannot draw from an empty pool");

        let mut os = OsRng;
        match uniform_below(k as u64, || os.try_next_u64()) {
            Ok(index) => index as usize,
            Err(err) => {
                if !self.fallback_reported {
                    warn!(error = %err, "OS random source unavailable; using thread RNG");
                    self.fallback_reported = true;
                }
                rand::rng().random_range(0..k)
            }
        }
    }
}

/// Deterministic source for reproducible games and tests.
#[derive(Debug, Clone)]
pub struct SeededDrawSource {
    rng: StdRng,
}

impl SeededDrawSource {
    /// Seed a new deterministic source.
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl DrawSource for SeededDrawSource {
    fn pick_index(&mut self, k: usize) -> usize {
        assert!(k > 0, "cannot draw from an empty pool");
        self.rng.random_range(0..k)
    }
}

/// Map raw 64-bit words onto `0..bound` without modulo bias.
///
/// Words at or above the largest multiple of `bound` are rejected and redrawn.
fn uniform_below<E>(bound: u64, mut next: impl FnMut() -> Result<u64, E>) -> Result<u64, E> {
    let limit = u64::MAX - (u64::MAX % bound);
    loop {
        let word = next()?;
        if word < limit {
            return Ok(word % bound);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;

    use super::*;

    #[test]
    fn system_source_stays_in_range() {
        let mut source = SystemDrawSource::new();
        for k in 1..=90 {
            assert!(source.pick_index(k) < k);
        }
        assert_eq!(source.pick_index(1), 0);
    }

    #[test]
    fn seeded_sources_repeat_their_sequence() {
        let mut a = SeededDrawSource::new(7);
        let mut b = SeededDrawSource::new(7);
        let left: Vec<_> = (1..=90).rev().map(|k| a.pick_index(k)).collect();
        let right: Vec<_> = (1..=90).rev().map(|k| b.pick_index(k)).collect();
        assert_eq!(left, right);
    }

    #[test]
    #[should_panic(expected = "empty pool")]
    fn empty_pool_is_a_logic_error() {
        SeededDrawSource::new(1).pick_index(0);
    }

    #[test]
    fn rejects_words_in_the_biased_tail() {
        // u64::MAX is divisible by 3, so u64::MAX itself is the first rejected word.
        let mut words = vec![u64::MAX, 5].into_iter();
        let index = uniform_below::<Infallible>(3, || Ok(words.next().unwrap_or(0))).unwrap();
        assert_eq!(index, 2);
        assert_eq!(words.next(), None);
    }

    #[test]
    fn errors_from_the_word_source_propagate() {
        let result = uniform_below(10, || Err::<u64, &str>("no entropy"));
        assert_eq!(result, Err("no entropy"));
    }
}
