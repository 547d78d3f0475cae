//! Fixed-window admission limiter.
//!
//! Each identifier owns at most one [`RateLimitEntry`]. The first request of
//! a window opens it with `count = 1`; later requests increment until the
//! quota is reached, after which requests are denied without touching the
//! counter. A window that straddles a boundary can therefore admit up to
//! twice the quota in a short interval.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::clock::{Clock, SystemClock};
use crate::rate_limit_config::RateLimitPolicy;

/// Counter state for one identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitEntry {
    pub count: u32,
    pub reset_at: Instant,
}

impl RateLimitEntry {
    fn is_live(&self, now: Instant) -> bool {
        now < self.reset_at
    }
}

/// Read-only view of a live entry.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct RateLimitStatus {
    pub limit: u32,
    pub count: u32,
    pub remaining: u32,
    #[serde(with = "humantime_serde")]
    pub reset_after: Duration,
}

pub struct RateLimiter<C: Clock = SystemClock> {
    entries: DashMap<String, RateLimitEntry>,
    clock: C,
}

impl RateLimiter<SystemClock> {
    pub fn new() -> Self {
        Self::with_clock(SystemClock)
    }
}

impl Default for RateLimiter<SystemClock> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C: Clock> RateLimiter<C> {
    pub fn with_clock(clock: C) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    /// Count a request against `identifier` and report whether it is admitted.
    ///
    /// The entry is locked for the whole check-then-increment, so concurrent
    /// callers on the same identifier never overshoot the quota. Blank
    /// identifiers are always denied and never stored.
    pub fn check_and_consume(&self, identifier: &str, policy: &RateLimitPolicy) -> bool {
        let identifier = identifier.trim();
        if identifier.is_empty() {
            warn!("Denying request with empty rate limit identifier");
            return false;
        }

        let now = self.clock.now();
        let Some(reset_at) = now.checked_add(policy.window()) else {
            warn!(identifier = %identifier, "Rate limit window end is not representable");
            return false;
        };
        let fresh = RateLimitEntry { count: 1, reset_at };

        match self.entries.entry(identifier.to_string()) {
            Entry::Vacant(slot) => {
                slot.insert(fresh);
                true
            }
            Entry::Occupied(mut slot) => {
                let entry = slot.get_mut();
                if !entry.is_live(now) {
                    *entry = fresh;
                    true
                } else if entry.count < policy.max_requests() {
                    entry.count += 1;
                    true
                } else {
                    debug!(
                        identifier = %identifier,
                        count = entry.count,
                        limit = policy.max_requests(),
                        "Rate limit reached"
                    );
                    false
                }
            }
        }
    }

    /// Inspect the live entry for `identifier` without counting a request.
    pub fn peek(&self, identifier: &str, policy: &RateLimitPolicy) -> Option<RateLimitStatus> {
        let now = self.clock.now();
        let entry = *self.entries.get(identifier.trim())?;
        if !entry.is_live(now) {
            return None;
        }

        Some(RateLimitStatus {
            limit: policy.max_requests(),
            count: entry.count,
            remaining: policy.max_requests().saturating_sub(entry.count),
            reset_after: entry.reset_at.saturating_duration_since(now),
        })
    }

    /// Time until the window for `identifier` closes, if one is live.
    pub fn retry_after(&self, identifier: &str) -> Option<Duration> {
        let now = self.clock.now();
        let entry = *self.entries.get(identifier.trim())?;
        if entry.is_live(now) {
            Some(entry.reset_at.saturating_duration_since(now))
        } else {
            None
        }
    }

    /// Remove every entry whose window has closed. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = self.clock.now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| entry.is_live(now));
        let removed = before.saturating_sub(self.entries.len());

        if removed > 0 {
            debug!(removed, remaining = self.entries.len(), "Swept expired rate limit entries");
        }
        removed
    }

    /// Drop the entry for `identifier`, returning whether one existed.
    pub fn reset(&self, identifier: &str) -> bool {
        self.entries.remove(identifier.trim()).is_some()
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn limiter() -> (RateLimiter<ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        (RateLimiter::with_clock(clock.clone()), clock)
    }

    fn policy(max: u32, secs: u64) -> RateLimitPolicy {
        RateLimitPolicy::new(max, Duration::from_secs(secs)).unwrap()
    }

    #[test]
    fn test_admits_up_to_quota_then_denies() {
        let (limiter, _) = limiter();
        let policy = policy(3, 60);

        for _ in 0..3 {
            assert!(limiter.check_and_consume("10.0.0.1", &policy));
        }
        assert!(!limiter.check_and_consume("10.0.0.1", &policy));
    }

    #[test]
    fn test_denial_does_not_increment() {
        let (limiter, _) = limiter();
        let policy = policy(2, 60);

        limiter.check_and_consume("a", &policy);
        limiter.check_and_consume("a", &policy);
        for _ in 0..5 {
            assert!(!limiter.check_and_consume("a", &policy));
        }

        let status = limiter.peek("a", &policy).unwrap();
        assert_eq!(status.count, 2);
        assert_eq!(status.remaining, 0);
    }

    #[test]
    fn test_storefront_lookup_scenario() {
        let (limiter, clock) = limiter();
        let policy = policy(10, 60);
        let ip = "203.0.113.5";

        for _ in 0..10 {
            assert!(limiter.check_and_consume(ip, &policy));
        }

        clock.advance(Duration::from_secs(30));
        assert!(!limiter.check_and_consume(ip, &policy));

        clock.advance(Duration::from_secs(31));
        assert!(limiter.check_and_consume(ip, &policy));
        assert_eq!(limiter.peek(ip, &policy).unwrap().count, 1);
    }

    #[test]
    fn test_window_closes_exactly_at_reset() {
        let (limiter, clock) = limiter();
        let policy = policy(1, 60);

        assert!(limiter.check_and_consume("a", &policy));
        clock.advance(Duration::from_secs(59));
        assert!(!limiter.check_and_consume("a", &policy));
        clock.advance(Duration::from_secs(1));
        assert!(limiter.check_and_consume("a", &policy));
    }

    #[test]
    fn test_identifiers_are_independent() {
        let (limiter, _) = limiter();
        let policy = policy(1, 60);

        assert!(limiter.check_and_consume("a", &policy));
        assert!(!limiter.check_and_consume("a", &policy));
        assert!(limiter.check_and_consume("b", &policy));
    }

    #[test]
    fn test_empty_identifier_always_denied() {
        let (limiter, _) = limiter();
        let policy = policy(10, 60);

        assert!(!limiter.check_and_consume("", &policy));
        assert!(!limiter.check_and_consume("   ", &policy));
        assert!(limiter.is_empty());
    }

    #[test]
    fn test_boundary_burst_admits_twice_the_quota() {
        // Fixed windows reset the counter wholesale at the boundary.
        let (limiter, clock) = limiter();
        let policy = policy(5, 60);

        assert!(limiter.check_and_consume("a", &policy));
        clock.advance(Duration::from_secs(59));
        for _ in 0..4 {
            assert!(limiter.check_and_consume("a", &policy));
        }
        clock.advance(Duration::from_secs(1));
        for _ in 0..5 {
            assert!(limiter.check_and_consume("a", &policy));
        }
        assert!(!limiter.check_and_consume("a", &policy));
    }

    #[test]
    fn test_peek_does_not_mutate() {
        let (limiter, clock) = limiter();
        let policy = policy(3, 60);

        assert!(limiter.peek("a", &policy).is_none());
        limiter.check_and_consume("a", &policy);
        clock.advance(Duration::from_secs(20));

        let first = limiter.peek("a", &policy).unwrap();
        let second = limiter.peek("a", &policy).unwrap();
        assert_eq!(first, second);
        assert_eq!(first.count, 1);
        assert_eq!(first.remaining, 2);
        assert_eq!(first.reset_after, Duration::from_secs(40));
    }

    #[test]
    fn test_peek_absent_after_expiry() {
        let (limiter, clock) = limiter();
        let policy = policy(3, 60);

        limiter.check_and_consume("a", &policy);
        clock.advance(Duration::from_secs(60));
        assert!(limiter.peek("a", &policy).is_none());
        assert!(limiter.retry_after("a").is_none());
    }

    #[test]
    fn test_sweep_removes_only_expired() {
        let (limiter, clock) = limiter();
        let short = policy(10, 10);
        let long = policy(10, 120);

        limiter.check_and_consume("short", &short);
        limiter.check_and_consume("long", &long);
        clock.advance(Duration::from_secs(30));

        assert_eq!(limiter.sweep(), 1);
        assert_eq!(limiter.len(), 1);
        assert!(limiter.peek("long", &long).is_some());
    }

    #[test]
    fn test_sweep_is_idempotent() {
        let (limiter, clock) = limiter();
        let policy = policy(2, 60);

        limiter.check_and_consume("expired", &policy);
        clock.advance(Duration::from_secs(45));
        limiter.check_and_consume("live", &policy);
        limiter.check_and_consume("live", &policy);
        clock.advance(Duration::from_secs(15));

        assert_eq!(limiter.sweep(), 1);
        let after_first = limiter.peek("live", &policy);
        assert_eq!(limiter.sweep(), 0);
        assert_eq!(limiter.peek("live", &policy), after_first);
        assert!(!limiter.check_and_consume("live", &policy));
        assert!(limiter.check_and_consume("expired", &policy));
    }

    #[test]
    fn test_reset_removes_entry() {
        let (limiter, _) = limiter();
        let policy = policy(1, 60);

        limiter.check_and_consume("a", &policy);
        assert!(limiter.reset("a"));
        assert!(!limiter.reset("a"));
        assert!(limiter.check_and_consume("a", &policy));
    }

    #[test]
    fn test_concurrent_calls_never_exceed_quota() {
        let limiter = Arc::new(RateLimiter::with_clock(ManualClock::new()));
        let policy = policy(10, 60);
        let admitted = Arc::new(AtomicU32::new(0));

        std::thread::scope(|scope| {
            for _ in 0..32 {
                let limiter = Arc::clone(&limiter);
                let admitted = Arc::clone(&admitted);
                scope.spawn(move || {
                    for _ in 0..8 {
                        if limiter.check_and_consume("198.51.100.7", &policy) {
                            admitted.fetch_add(1, Ordering::SeqCst);
                        }
                    }
                });
            }
        });

        assert_eq!(admitted.load(Ordering::SeqCst), 10);
    }
}
