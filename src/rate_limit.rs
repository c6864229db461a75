//! Per-caller fixed-window admission gate.
//!
//! Runs before tier selection side effects and credit checks so abusive
//! callers are rejected cheaply. Entries live in an interior mutex'd map;
//! windows reset lazily on next access, and a coarse background sweep bounds
//! memory by dropping entries whose window has already expired.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::config::RateLimitConfig;

/// Outcome of one admission check.
#[derive(Debug, Clone, Copy)]
pub struct Admission {
    pub allowed: bool,
    /// Admissions left in the current window.
    pub remaining: u32,
    /// Time until the current window resets.
    pub reset_in: Duration,
}

struct WindowEntry {
    count: u32,
    window_reset_at: Instant,
}

/// Sliding-window admission gate, independent of tiers and credits.
pub struct RateLimiter {
    /// `std::sync::Mutex` (not tokio) — never held across an `.await` point.
    entries: Mutex<HashMap<Uuid, WindowEntry>>,
    window: Duration,
    ceiling: u32,
    sweep_interval: Duration,
}

impl RateLimiter {
    pub fn new(config: &RateLimitConfig) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            window: config.window(),
            ceiling: config.ceiling.max(1),
            sweep_interval: config.sweep_interval(),
        }
    }

    /// Admit or reject one request from `caller_id`.
    ///
    /// First touch, or any touch after the window has elapsed, reinitializes
    /// the entry with count 1 and admits. Within a live window the count never
    /// exceeds the ceiling.
    pub fn admit(&self, caller_id: Uuid) -> Admission {
        let now = Instant::now();
        let mut guard = self.entries.lock().unwrap_or_else(|e| e.into_inner());

        match guard.get_mut(&caller_id) {
            Some(entry) if now < entry.window_reset_at => {
                if entry.count < self.ceiling {
                    entry.count += 1;
                    Admission {
                        allowed: true,
                        remaining: self.ceiling - entry.count,
                        reset_in: entry.window_reset_at - now,
                    }
                } else {
                    Admission {
                        allowed: false,
                        remaining: 0,
                        reset_in: entry.window_reset_at - now,
                    }
                }
            }
            _ => {
                guard.insert(
                    caller_id,
                    WindowEntry {
                        count: 1,
                        window_reset_at: now + self.window,
                    },
                );
                Admission {
                    allowed: true,
                    remaining: self.ceiling - 1,
                    reset_in: self.window,
                }
            }
        }
    }

    /// Drop entries whose window has already expired. Returns how many were
    /// removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut guard = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        let before = guard.len();
        guard.retain(|_, entry| now < entry.window_reset_at);
        before - guard.len()
    }

    /// Number of callers currently tracked.
    pub fn len(&self) -> usize {
        self.entries.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Spawn the background sweep task. The interval is independent of and
    /// coarser than the window length.
    pub fn spawn_sweeper(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let limiter = Arc::clone(self);
        let interval = self.sweep_interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await; // first tick completes immediately
            loop {
                ticker.tick().await;
                let removed = limiter.sweep();
                if removed > 0 {
                    tracing::debug!(removed, "rate limit sweep dropped expired windows");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(window_ms: u64, ceiling: u32) -> RateLimitConfig {
        RateLimitConfig {
            window_ms,
            ceiling,
            sweep_interval_ms: 300_000,
        }
    }

    #[test]
    fn first_admit_leaves_ceiling_minus_one() {
        let limiter = RateLimiter::new(&config(60_000, 10));
        let admission = limiter.admit(Uuid::new_v4());
        assert!(admission.allowed);
        assert_eq!(admission.remaining, 9);
    }

    #[test]
    fn ceiling_plus_one_rejects_with_reset_time() {
        let limiter = RateLimiter::new(&config(60_000, 10));
        let caller = Uuid::new_v4();

        for _ in 0..10 {
            assert!(limiter.admit(caller).allowed);
        }
        let denied = limiter.admit(caller);
        assert!(!denied.allowed);
        assert_eq!(denied.remaining, 0);
        assert!(denied.reset_in > Duration::ZERO);
    }

    #[test]
    fn window_expiry_resets_the_entry() {
        let limiter = RateLimiter::new(&config(30, 10));
        let caller = Uuid::new_v4();

        for _ in 0..10 {
            limiter.admit(caller);
        }
        assert!(!limiter.admit(caller).allowed);

        std::thread::sleep(Duration::from_millis(40));
        let admission = limiter.admit(caller);
        assert!(admission.allowed);
        assert_eq!(admission.remaining, 9);
    }

    #[test]
    fn callers_are_independent() {
        let limiter = RateLimiter::new(&config(60_000, 1));
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();

        assert!(limiter.admit(a).allowed);
        assert!(!limiter.admit(a).allowed);
        assert!(limiter.admit(b).allowed);
    }

    #[test]
    fn sweep_drops_only_expired_windows() {
        let limiter = RateLimiter::new(&config(30, 10));
        let expired = Uuid::new_v4();
        limiter.admit(expired);

        std::thread::sleep(Duration::from_millis(40));
        let live = Uuid::new_v4();
        limiter.admit(live);

        assert_eq!(limiter.sweep(), 1);
        assert_eq!(limiter.len(), 1);
    }

    #[test]
    fn concurrent_admits_never_exceed_ceiling() {
        let limiter = Arc::new(RateLimiter::new(&config(60_000, 10)));
        let caller = Uuid::new_v4();

        let handles: Vec<_> = (0..40)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                std::thread::spawn(move || limiter.admit(caller).allowed)
            })
            .collect();

        let admitted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|allowed| *allowed)
            .count();
        assert_eq!(admitted, 10);
    }
}
