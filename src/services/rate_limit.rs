// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! In-process fixed-window rate limiter.
//!
//! Each key gets a counter and a window end. The first request for a key, or
//! the first one after its window has passed, opens a new window. Windows do
//! not slide: a burst straddling a boundary can admit up to twice the limit
//! in a short span.
//!
//! The limiter knows nothing about HTTP or identity; callers choose keys such
//! as `"login:203.0.113.7"`. In a multi-instance deployment each instance
//! counts separately.

use crate::time_utils::{Clock, SystemClock};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Admission quota for one class of endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub max_requests: u32,
    pub window_ms: i64,
}

/// Login, registration and refresh: 5 per minute.
pub const AUTH_RATE_LIMIT: RateLimitPolicy = RateLimitPolicy {
    max_requests: 5,
    window_ms: 60_000,
};

/// General authenticated API: 60 per minute.
pub const API_RATE_LIMIT: RateLimitPolicy = RateLimitPolicy {
    max_requests: 60,
    window_ms: 60_000,
};

/// Transcript extraction (costly upstream call): 10 per minute.
pub const AI_RATE_LIMIT: RateLimitPolicy = RateLimitPolicy {
    max_requests: 10,
    window_ms: 60_000,
};

/// Outcome of a single [`RateLimiter::check`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub remaining: u32,
    pub reset_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy)]
struct RateLimitEntry {
    count: u32,
    reset_at_ms: i64,
}

/// Per-key fixed-window counters.
pub struct RateLimiter {
    entries: DashMap<String, RateLimitEntry>,
    clock: Arc<dyn Clock>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter {
    /// Limiter driven by wall-clock time.
    pub fn new() -> Self {
        Self::with_clock(Arc::new(SystemClock))
    }

    pub fn with_clock(clock: Arc<dyn Clock>) -> Self {
        Self {
            entries: DashMap::new(),
            clock,
        }
    }

    /// Count one request against `key`.
    ///
    /// Read, check and increment happen under the entry's shard lock, so
    /// concurrent callers of the same key never observe a partial update.
    /// Rejected requests do not consume quota.
    pub fn check(&self, key: &str, policy: RateLimitPolicy) -> RateLimitDecision {
        let now_ms = self.clock.now().timestamp_millis();
        let new_window = RateLimitEntry {
            count: 1,
            reset_at_ms: now_ms + policy.window_ms,
        };

        let mut opened = false;
        let mut entry = self.entries.entry(key.to_string()).or_insert_with(|| {
            opened = true;
            new_window
        });

        if !opened && now_ms > entry.reset_at_ms {
            *entry = new_window;
            opened = true;
        }

        if opened {
            return RateLimitDecision {
                allowed: true,
                remaining: policy.max_requests.saturating_sub(1),
                reset_at: to_datetime(entry.reset_at_ms),
            };
        }

        if entry.count >= policy.max_requests {
            return RateLimitDecision {
                allowed: false,
                remaining: 0,
                reset_at: to_datetime(entry.reset_at_ms),
            };
        }

        entry.count += 1;
        RateLimitDecision {
            allowed: true,
            remaining: policy.max_requests - entry.count,
            reset_at: to_datetime(entry.reset_at_ms),
        }
    }

    /// Drop every entry whose window has passed. Returns how many were dropped.
    pub fn sweep(&self) -> usize {
        let now_ms = self.clock.now().timestamp_millis();
        let before = self.entries.len();
        self.entries.retain(|_, entry| now_ms <= entry.reset_at_ms);
        before.saturating_sub(self.entries.len())
    }

    /// Number of tracked keys.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Run [`sweep`](Self::sweep) every `period` on the Tokio runtime.
    pub fn spawn_sweeper(self: Arc<Self>, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await; // first tick completes immediately

            loop {
                ticker.tick().await;
                let removed = self.sweep();
                if removed > 0 {
                    tracing::debug!(removed, remaining = self.len(), "Swept rate limit entries");
                }
            }
        })
    }
}

fn to_datetime(ms: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(ms).unwrap_or_else(Utc::now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::time_utils::ManualClock;
    use chrono::TimeZone;

    const POLICY: RateLimitPolicy = RateLimitPolicy {
        max_requests: 3,
        window_ms: 60_000,
    };

    fn limiter() -> (RateLimiter, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(
            Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap(),
        ));
        (RateLimiter::with_clock(clock.clone()), clock)
    }

    #[test]
    fn test_window_admits_max_then_rejects() {
        let (limiter, _) = limiter();

        let remaining: Vec<u32> = (0..3)
            .map(|_| {
                let d = limiter.check("login:1.2.3.4", POLICY);
                assert!(d.allowed);
                d.remaining
            })
            .collect();
        assert_eq!(remaining, vec![2, 1, 0]);

        let fourth = limiter.check("login:1.2.3.4", POLICY);
        assert!(!fourth.allowed);
        assert_eq!(fourth.remaining, 0);
    }

    #[test]
    fn test_new_window_after_expiry() {
        let (limiter, clock) = limiter();
        let first = limiter.check("k", POLICY);
        for _ in 0..3 {
            limiter.check("k", POLICY);
        }
        assert!(!limiter.check("k", POLICY).allowed);

        // The window end itself still belongs to the old window
        clock.advance_ms(POLICY.window_ms);
        assert!(!limiter.check("k", POLICY).allowed);

        clock.advance_ms(1);
        let fresh = limiter.check("k", POLICY);
        assert!(fresh.allowed);
        assert_eq!(fresh.remaining, 2);
        assert!(fresh.reset_at > first.reset_at);
    }

    #[test]
    fn test_keys_are_isolated() {
        let (limiter, _) = limiter();
        for _ in 0..3 {
            assert!(limiter.check("login:a", POLICY).allowed);
        }
        assert!(!limiter.check("login:a", POLICY).allowed);

        let other = limiter.check("login:b", POLICY);
        assert!(other.allowed);
        assert_eq!(other.remaining, 2);
    }

    #[test]
    fn test_rejection_keeps_reset_time() {
        let (limiter, clock) = limiter();
        let first = limiter.check("k", POLICY);
        limiter.check("k", POLICY);
        limiter.check("k", POLICY);

        clock.advance_ms(10_000);
        let rejected = limiter.check("k", POLICY);
        assert!(!rejected.allowed);
        assert_eq!(rejected.reset_at, first.reset_at);
    }

    #[test]
    fn test_boundary_burst_is_fixed_window() {
        let (limiter, clock) = limiter();
        limiter.check("k", POLICY);
        clock.advance_ms(POLICY.window_ms - 1);
        assert!(limiter.check("k", POLICY).allowed);
        assert!(limiter.check("k", POLICY).allowed);

        clock.advance_ms(2);
        for _ in 0..3 {
            assert!(limiter.check("k", POLICY).allowed);
        }
    }

    #[test]
    fn test_sweep_removes_only_expired() {
        let (limiter, clock) = limiter();
        limiter.check("old", POLICY);
        clock.advance_ms(30_000);
        limiter.check("new", POLICY);

        clock.advance_ms(30_001);
        assert_eq!(limiter.sweep(), 1);
        assert_eq!(limiter.len(), 1);

        // Surviving entry keeps its count
        limiter.check("new", POLICY);
        assert_eq!(limiter.check("new", POLICY).remaining, 0);
    }

    #[test]
    fn test_concurrent_checks_never_over_admit() {
        let limiter = Arc::new(RateLimiter::new());
        let policy = RateLimitPolicy {
            max_requests: 50,
            window_ms: 60_000,
        };

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = limiter.clone();
                std::thread::spawn(move || {
                    (0..25)
                        .filter(|_| limiter.check("shared", policy).allowed)
                        .count()
                })
            })
            .collect();

        let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(admitted, 50);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_task_runs() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let limiter = Arc::new(RateLimiter::with_clock(clock.clone()));
        limiter.check("k", POLICY);
        clock.advance_ms(POLICY.window_ms + 1);

        let handle = limiter.clone().spawn_sweeper(Duration::from_secs(60));
        tokio::time::sleep(Duration::from_secs(61)).await;

        assert!(limiter.is_empty());
        handle.abort();
    }
}
