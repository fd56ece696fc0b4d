//! Sweep policies
//!
//! Decide, per admission, whether the limiter should purge expired entries
//! from its store before counting.

use std::fmt::Debug;
use std::sync::atomic::{AtomicU64, Ordering};

use rand::Rng;

pub trait SweepPolicy: Send + Sync + Debug {
    fn should_sweep(&self) -> bool;
}

/// Sweep with a fixed probability on each admission.
#[derive(Debug, Clone, Copy)]
pub struct RandomSweep {
    probability: f64,
}

impl RandomSweep {
    /// `probability` is clamped to `[0, 1]`.
    pub fn new(probability: f64) -> Self {
        let probability = if probability.is_nan() {
            0.0
        } else {
            probability.clamp(0.0, 1.0)
        };
        Self { probability }
    }

    pub fn probability(&self) -> f64 {
        self.probability
    }
}

impl Default for RandomSweep {
    fn default() -> Self {
        Self::new(0.1)
    }
}

impl SweepPolicy for RandomSweep {
    fn should_sweep(&self) -> bool {
        rand::thread_rng().gen_bool(self.probability)
    }
}

/// Sweep on every n-th admission.
#[derive(Debug)]
pub struct EveryNthCall {
    n: u64,
    calls: AtomicU64,
}

impl EveryNthCall {
    /// `n` of zero is treated as one.
    pub fn new(n: u64) -> Self {
        Self {
            n: n.max(1),
            calls: AtomicU64::new(0),
        }
    }
}

impl SweepPolicy for EveryNthCall {
    fn should_sweep(&self) -> bool {
        let call = self.calls.fetch_add(1, Ordering::Relaxed) + 1;
        call % self.n == 0
    }
}

/// Never sweep inline (pair with `RateLimiter::spawn_sweeper`).
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverSweep;

impl SweepPolicy for NeverSweep {
    fn should_sweep(&self) -> bool {
        false
    }
}
