//! Per-client fixed-window rate limiting
//!
//! Each client key owns a counter and the instant its window closes. The
//! first request after the window closes starts a fresh window with a count
//! of one; there is no sliding or carry-over between windows.
//!
//! State is process-local and lost on restart. A stale entry is reset lazily
//! on the client's next request; entries nobody returns for are swept out
//! by `check` once per window, or on demand by
//! [`FixedWindowLimiter::purge_expired`].

mod clock;

pub use clock::{Clock, SystemClock};

#[cfg(any(test, feature = "test-helpers"))]
pub use clock::MockClock;

use crate::config::RateLimitSettings;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Window length and ceiling for the limiter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitConfig {
    pub window: Duration,
    pub max_requests: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_secs(3600),
            max_requests: 100,
        }
    }
}

impl From<&RateLimitSettings> for RateLimitConfig {
    fn from(settings: &RateLimitSettings) -> Self {
        Self {
            window: Duration::from_secs(settings.window_secs),
            max_requests: settings.max_requests,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct WindowState {
    count: u32,
    reset_at: Instant,
}

struct Windows {
    entries: HashMap<String, WindowState>,
    last_sweep: Instant,
}

impl Windows {
    /// Drop closed windows at most once per `interval`
    fn sweep(&mut self, now: Instant, interval: Duration) -> usize {
        if now.saturating_duration_since(self.last_sweep) < interval {
            return 0;
        }
        self.last_sweep = now;
        self.purge(now)
    }

    fn purge(&mut self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries.retain(|_, state| now <= state.reset_at);
        before - self.entries.len()
    }
}

/// Outcome of one admission check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Admitted,
    /// Rejected; the client's window closes after `retry_after`
    Rejected { retry_after: Duration },
}

impl Admission {
    pub fn is_admitted(&self) -> bool {
        matches!(self, Admission::Admitted)
    }

    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Admission::Admitted => None,
            Admission::Rejected { retry_after } => Some(*retry_after),
        }
    }
}

/// Fixed-window counter keyed by client.
///
/// Keys come from request headers, so the map is swept of closed windows
/// once per window length; it only holds clients seen in the last two
/// windows.
pub struct FixedWindowLimiter<C: Clock = SystemClock> {
    config: RateLimitConfig,
    clock: C,
    windows: Mutex<Windows>,
}

impl FixedWindowLimiter<SystemClock> {
    pub fn new(config: RateLimitConfig) -> Self {
        Self::with_clock(config, SystemClock)
    }
}

impl<C: Clock> FixedWindowLimiter<C> {
    pub fn with_clock(config: RateLimitConfig, clock: C) -> Self {
        let last_sweep = clock.now();
        Self {
            config,
            clock,
            windows: Mutex::new(Windows {
                entries: HashMap::new(),
                last_sweep,
            }),
        }
    }

    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    /// Decide whether a request from `client` may proceed.
    pub fn admit(&self, client: &str) -> bool {
        self.check(client).is_admitted()
    }

    /// Like [`admit`](Self::admit), but a rejection carries the time left
    /// in the client's current window.
    ///
    /// The read-modify-write happens under one lock, so concurrent calls for
    /// the same key never lose an increment.
    pub fn check(&self, client: &str) -> Admission {
        let now = self.clock.now();
        let mut windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        windows.sweep(now, self.config.window);

        match windows.entries.get_mut(client) {
            Some(state) if now <= state.reset_at => {
                if state.count < self.config.max_requests {
                    state.count += 1;
                    Admission::Admitted
                } else {
                    Admission::Rejected {
                        retry_after: state.reset_at.saturating_duration_since(now),
                    }
                }
            }
            _ => {
                if self.config.max_requests == 0 {
                    return Admission::Rejected {
                        retry_after: self.config.window,
                    };
                }
                windows.entries.insert(
                    client.to_string(),
                    WindowState {
                        count: 1,
                        reset_at: now + self.config.window,
                    },
                );
                Admission::Admitted
            }
        }
    }

    /// Requests counted for `client` in its current window
    pub fn current_count(&self, client: &str) -> u32 {
        let now = self.clock.now();
        let windows = self.windows.lock().unwrap_or_else(|e| e.into_inner());
        windows
            .entries
            .get(client)
            .filter(|state| now <= state.reset_at)
            .map(|state| state.count)
            .unwrap_or(0)
    }

    /// Number of client entries currently held, including stale ones
    pub fn tracked_clients(&self) -> usize {
        self.windows.lock().unwrap_or_else(|e| e.into_inner()).entries.len()
    }

    /// Drop entries whose window has closed; returns how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        self.windows.lock().unwrap_or_else(|e| e.into_inner()).purge(now)
    }
}
