//! Configuration for the sync core and the fetcher.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use svsync_core::SecurityOptions;

use crate::error::{Result, SyncError};

/// How a node turns its version vector into outgoing sync interests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncInterestMode {
    /// One interest carrying the whole vector.
    Full,
    /// Every entry, split into interests of at most `max_entries` entries.
    Fragmented { max_entries: usize },
    /// One interest with the `recent` most recently updated entries plus
    /// `random` entries sampled from the rest.
    RecentRandom { recent: usize, random: usize },
    /// One interest with the `recent` most recently updated entries plus
    /// the next `bucket_size` entries of a rotating cursor over the rest.
    Bucket {
        bucket_size: usize,
        recent: usize,
        globally_ordered: bool,
    },
}

impl Default for SyncInterestMode {
    fn default() -> Self {
        SyncInterestMode::Fragmented { max_entries: 80 }
    }
}

/// Configuration for [`SyncCore`](crate::SyncCore).
#[derive(Debug, Clone)]
pub struct SyncConfig {
    /// Base period between mandatory sync interests.
    pub retx_period: Duration,
    /// Fractional jitter applied to `retx_period` (0.25 = ±25%).
    pub retx_jitter: f64,
    /// Delay before sending after a local publish.
    pub publish_delay: Duration,
    /// Lower bound of the randomized startup delay.
    pub startup_delay_min: Duration,
    /// Upper bound of the randomized startup delay.
    pub startup_delay_max: Duration,
    /// Longest a node waits before answering an outdated vector.
    pub max_suppression_time: Duration,
    /// Steepness of the suppression delay curve.
    pub suppression_curve: f64,
    /// Lifetime of outgoing sync interests.
    pub sync_interest_lifetime: Duration,
    /// Subset or fragmentation policy for outgoing vectors.
    pub interest_mode: SyncInterestMode,
    /// Signing and validation of sync interests.
    pub security: SecurityOptions,
    /// Identifier for log output, usually drawn from an [`InstanceCounter`].
    pub instance_id: u64,
    /// Seed for timer jitter and subset sampling; entropy when `None`.
    pub rng_seed: Option<u64>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            retx_period: Duration::from_secs(30),
            retx_jitter: 0.25,
            publish_delay: Duration::from_millis(1),
            startup_delay_min: Duration::from_millis(100),
            startup_delay_max: Duration::from_secs(100),
            max_suppression_time: Duration::from_millis(500),
            suppression_curve: 7.0,
            sync_interest_lifetime: Duration::from_secs(1),
            interest_mode: SyncInterestMode::default(),
            security: SecurityOptions::default(),
            instance_id: 0,
            rng_seed: None,
        }
    }
}

impl SyncConfig {
    /// Reject values the state machine cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.retx_period.is_zero() {
            return Err(SyncError::InvalidConfig("retx_period must be non-zero".into()));
        }
        if !(0.0..1.0).contains(&self.retx_jitter) {
            return Err(SyncError::InvalidConfig(
                "retx_jitter must be in [0, 1)".into(),
            ));
        }
        if self.startup_delay_min > self.startup_delay_max {
            return Err(SyncError::InvalidConfig(
                "startup_delay_min exceeds startup_delay_max".into(),
            ));
        }
        if !(self.suppression_curve > 0.0) {
            return Err(SyncError::InvalidConfig(
                "suppression_curve must be positive".into(),
            ));
        }
        if let SyncInterestMode::Fragmented { max_entries: 0 } = self.interest_mode {
            return Err(SyncError::InvalidConfig(
                "fragment size must be non-zero".into(),
            ));
        }
        Ok(())
    }
}

/// Configuration for [`Fetcher`](crate::Fetcher).
#[derive(Debug, Clone)]
pub struct FetcherConfig {
    /// Maximum number of requests in flight at once.
    pub window_size: usize,
    /// Extra attempts after data fails validation.
    pub validation_retries: u32,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            window_size: 10,
            validation_retries: SecurityOptions::default().retries_on_validation_fail,
        }
    }
}

/// Hands out instance identifiers to sync cores built by one context.
#[derive(Debug, Default)]
pub struct InstanceCounter(AtomicU64);

impl InstanceCounter {
    /// Create a counter starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Take the next identifier.
    pub fn next(&self) -> u64 {
        self.0.fetch_add(1, Ordering::Relaxed)
    }
}
