//! Core fixed-window limiter store.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use tracing::{debug, trace};

use super::counter::WindowCounter;
use super::identity::Identity;
use crate::error::{Result, TurnstileError};

/// Default number of requests admitted per window.
const DEFAULT_LIMIT: u64 = 20;
/// Default window length.
const DEFAULT_WINDOW: Duration = Duration::from_secs(5);
/// Default number of whole windows an expired counter is kept before eviction.
const DEFAULT_RETENTION_WINDOWS: u32 = 1;

/// Configuration for a [`LimiterStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LimiterConfig {
    /// Maximum requests admitted per window
    pub limit: u64,
    /// Length of a fixed window
    pub window: Duration,
    /// When false, every request is admitted and no state is kept
    pub enabled: bool,
    /// How many windows a counter must sit expired before a sweep evicts it
    pub retention_windows: u32,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            limit: DEFAULT_LIMIT,
            window: DEFAULT_WINDOW,
            enabled: true,
            retention_windows: DEFAULT_RETENTION_WINDOWS,
        }
    }
}

impl LimiterConfig {
    /// Create an enabled configuration with the given limit and window.
    pub fn new(limit: u64, window: Duration) -> Self {
        Self {
            limit,
            window,
            ..Self::default()
        }
    }

    /// A configuration that admits everything.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    /// Reject configurations that could never make a sensible decision.
    pub fn validate(&self) -> Result<()> {
        if self.limit == 0 {
            return Err(TurnstileError::Config(
                "rate limit must allow at least one request per window".to_string(),
            ));
        }
        if self.window.is_zero() {
            return Err(TurnstileError::Config(
                "rate limit window must be longer than zero".to_string(),
            ));
        }
        if Instant::now().checked_add(self.window).is_none() {
            return Err(TurnstileError::Config(format!(
                "rate limit window of {}s is too long",
                self.window.as_secs()
            )));
        }
        Ok(())
    }

    /// How long a counter must have been expired before it may be evicted.
    pub fn retention(&self) -> Duration {
        self.window.saturating_mul(self.retention_windows)
    }
}

/// Outcome of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    /// The request may proceed.
    Admit,
    /// The request is over the limit for the current window.
    Deny {
        /// Time remaining until the window resets
        retry_after: Duration,
    },
}

impl Decision {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Decision::Admit)
    }

    /// The retry hint, zero for admitted requests.
    pub fn retry_after(&self) -> Duration {
        match self {
            Decision::Admit => Duration::ZERO,
            Decision::Deny { retry_after } => *retry_after,
        }
    }
}

/// The process-local store of fixed-window counters, one per identity.
///
/// This struct is thread-safe and meant to be shared behind an `Arc`. The
/// map is sharded, so callers with different identities mostly contend on
/// different locks; all work for one identity happens under its entry lock.
#[derive(Debug)]
pub struct LimiterStore {
    /// Counters indexed by caller identity
    counters: DashMap<Identity, WindowCounter>,
    /// Immutable configuration
    config: LimiterConfig,
}

impl LimiterStore {
    /// Create a new store, failing if the configuration is invalid.
    pub fn new(config: LimiterConfig) -> Result<Self> {
        config.validate()?;

        Ok(Self {
            counters: DashMap::new(),
            config,
        })
    }

    /// Decide whether a request from `identity` observed at `now` is admitted.
    ///
    /// Every call counts, including denied ones. An expired window is reset
    /// to start at `now` before the request is counted against it.
    pub fn allow(&self, identity: &Identity, now: Instant) -> Decision {
        if !self.config.enabled {
            return Decision::Admit;
        }

        let LimiterConfig { limit, window, .. } = self.config;

        let mut counter = self.counters.entry(identity.clone()).or_insert_with(|| {
            debug!(identity = %identity, limit, window = ?window, "Creating new window counter");
            WindowCounter::new(now)
        });

        if counter.roll_over(now, window) {
            trace!(identity = %identity, "Window expired, starting a new one");
        }

        if counter.record(limit) {
            trace!(identity = %identity, count = counter.count(), "Request admitted");
            Decision::Admit
        } else {
            Decision::Deny {
                retry_after: counter.remaining_window(now, window),
            }
        }
    }

    /// [`allow`](Self::allow) at the current instant.
    pub fn allow_now(&self, identity: &Identity) -> Decision {
        self.allow(identity, Instant::now())
    }

    /// Evict counters that have been expired for at least the retention period.
    ///
    /// Returns the number of counters removed. Shards are locked one at a
    /// time, so concurrent `allow` calls only wait on the shard being swept.
    pub fn sweep(&self, now: Instant) -> usize {
        let window = self.config.window;
        let retention = self.config.retention();
        let before = self.counters.len();

        self.counters.retain(|_, counter| {
            !(counter.is_expired(now, window) && counter.expired_for(now, window) >= retention)
        });

        before.saturating_sub(self.counters.len())
    }

    /// Get the current count for an identity.
    ///
    /// Returns `None` if no counter exists for the identity.
    pub fn counter_value(&self, identity: &Identity) -> Option<u64> {
        self.counters.get(identity).map(|c| c.count())
    }

    /// Get the number of tracked identities.
    pub fn counter_count(&self) -> usize {
        self.counters.len()
    }

    /// Clear all counters.
    ///
    /// This is primarily useful for testing.
    pub fn clear(&self) {
        self.counters.clear();
    }

    pub fn config(&self) -> &LimiterConfig {
        &self.config
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }
}
