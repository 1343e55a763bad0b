//! Per-identity fixed-window counter.

use std::time::{Duration, Instant};

/// Request count for one identity within the current fixed window.
///
/// The counter has no synchronisation of its own. It is only ever touched
/// through [`LimiterStore`](super::LimiterStore), which holds the entry lock
/// for the whole read-check-increment sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowCounter {
    /// Requests observed since `window_start`
    count: u64,
    /// When the current window began
    window_start: Instant,
}

impl WindowCounter {
    /// Create an empty counter whose window starts at `now`.
    pub fn new(now: Instant) -> Self {
        Self {
            count: 0,
            window_start: now,
        }
    }

    /// Whether the window has fully elapsed at `now`.
    pub fn is_expired(&self, now: Instant, window: Duration) -> bool {
        now.saturating_duration_since(self.window_start) >= window
    }

    /// Start a fresh window at `now` if the current one has elapsed.
    ///
    /// Returns `true` when a rollover happened.
    pub fn roll_over(&mut self, now: Instant, window: Duration) -> bool {
        if self.is_expired(now, window) {
            self.count = 0;
            self.window_start = now;
            true
        } else {
            false
        }
    }

    /// Count one request against `limit` and report whether it fits.
    ///
    /// The stored count saturates at `limit + 1`; past that point the exact
    /// magnitude no longer changes any decision.
    pub fn record(&mut self, limit: u64) -> bool {
        let ceiling = limit.saturating_add(1);
        if self.count < ceiling {
            self.count += 1;
        }
        self.count <= limit
    }

    /// Time left until this window resets, measured from `now`.
    pub fn remaining_window(&self, now: Instant, window: Duration) -> Duration {
        window.saturating_sub(now.saturating_duration_since(self.window_start))
    }

    /// Time elapsed since the window ended, or zero if it is still open.
    pub fn expired_for(&self, now: Instant, window: Duration) -> Duration {
        now.saturating_duration_since(self.window_start).saturating_sub(window)
    }

    /// Get the current count.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Get the start of the current window.
    pub fn window_start(&self) -> Instant {
        self.window_start
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(5);

    #[test]
    fn test_new_counter_is_empty() {
        let now = Instant::now();
        let counter = WindowCounter::new(now);

        assert_eq!(counter.count(), 0);
        assert_eq!(counter.window_start(), now);
        assert!(!counter.is_expired(now, WINDOW));
    }

    #[test]
    fn test_record_within_limit() {
        let mut counter = WindowCounter::new(Instant::now());

        for _ in 0..3 {
            assert!(counter.record(3));
        }
        assert_eq!(counter.count(), 3);

        // The 4th request is the first one over the limit
        assert!(!counter.record(3));
    }

    #[test]
    fn test_record_saturates_past_limit() {
        let mut counter = WindowCounter::new(Instant::now());

        for _ in 0..100 {
            counter.record(2);
        }

        assert_eq!(counter.count(), 3);
        assert!(!counter.record(2));
    }

    #[test]
    fn test_record_at_u64_max_limit() {
        let mut counter = WindowCounter::new(Instant::now());
        assert!(counter.record(u64::MAX));
    }

    #[test]
    fn test_expiry_boundary_is_inclusive() {
        let start = Instant::now();
        let counter = WindowCounter::new(start);

        assert!(!counter.is_expired(start + WINDOW - Duration::from_millis(1), WINDOW));
        assert!(counter.is_expired(start + WINDOW, WINDOW));
    }

    #[test]
    fn test_roll_over_resets_count_and_start() {
        let start = Instant::now();
        let mut counter = WindowCounter::new(start);
        counter.record(10);
        counter.record(10);

        assert!(!counter.roll_over(start + Duration::from_secs(1), WINDOW));
        assert_eq!(counter.count(), 2);

        let later = start + WINDOW + Duration::from_secs(1);
        assert!(counter.roll_over(later, WINDOW));
        assert_eq!(counter.count(), 0);
        assert_eq!(counter.window_start(), later);
    }

    #[test]
    fn test_remaining_window() {
        let start = Instant::now();
        let counter = WindowCounter::new(start);

        assert_eq!(counter.remaining_window(start, WINDOW), WINDOW);
        assert_eq!(
            counter.remaining_window(start + Duration::from_secs(2), WINDOW),
            Duration::from_secs(3)
        );
        assert_eq!(counter.remaining_window(start + WINDOW * 2, WINDOW), Duration::ZERO);
    }

    #[test]
    fn test_window_arithmetic_never_overflows() {
        let start = Instant::now();
        let huge = Duration::from_secs(u64::MAX);
        let mut counter = WindowCounter::new(start);

        assert!(counter.record(1));
        assert!(!counter.record(1));
        assert!(!counter.roll_over(start + Duration::from_secs(1), huge));

        let later = start + Duration::from_secs(1);
        assert_eq!(counter.remaining_window(later, huge), huge - Duration::from_secs(1));
        assert_eq!(counter.expired_for(later, huge), Duration::ZERO);
    }

    #[test]
    fn test_expired_for() {
        let start = Instant::now();
        let counter = WindowCounter::new(start);

        assert_eq!(counter.expired_for(start + Duration::from_secs(1), WINDOW), Duration::ZERO);
        assert_eq!(
            counter.expired_for(start + WINDOW + Duration::from_secs(7), WINDOW),
            Duration::from_secs(7)
        );
    }
}
