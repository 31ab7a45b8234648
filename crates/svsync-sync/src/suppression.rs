//! Timer draws for the sync state machine.
//!
//! When a node learns that a peer is behind, it waits a random
//! suppression delay before replying. The delay comes from
//!
//! ```text
//! d = c * (1 - exp(k * (v - c) / c)),   v ~ U[0, c]
//! ```
//!
//! where `c` is the maximum suppression time and `k` the curve steepness.
//! The density of `d` is `1 / (k * (c - d))`: thin near zero and rising
//! toward `c`. Among many nodes that saw the same outdated vector, only a
//! handful draw a delay close to the earliest one. The first reply reaches
//! everyone else while their timers are still pending, so the number of
//! replies per event stays roughly constant as the group grows.

use std::time::Duration;

use rand::Rng;

/// Draw a suppression delay in `[0, max]`.
pub fn suppression_delay<R: Rng>(max: Duration, curve: f64, rng: &mut R) -> Duration {
    let c = max.as_secs_f64();
    if c <= 0.0 {
        return Duration::ZERO;
    }
    let v = rng.gen_range(0.0..=c);
    let d = c * (1.0 - (curve * (v - c) / c).exp());
    Duration::from_secs_f64(d.clamp(0.0, c))
}

/// `period` scaled by a uniform factor in `[1 - jitter, 1 + jitter]`.
pub fn jittered<R: Rng>(period: Duration, jitter: f64, rng: &mut R) -> Duration {
    if jitter <= 0.0 {
        return period;
    }
    let factor = rng.gen_range((1.0 - jitter)..=(1.0 + jitter));
    period.mul_f64(factor.max(0.0))
}

/// Uniform startup delay in `[min, max]`.
pub fn startup_delay<R: Rng>(min: Duration, max: Duration, rng: &mut R) -> Duration {
    if min >= max {
        return min;
    }
    rng.gen_range(min..=max)
}
