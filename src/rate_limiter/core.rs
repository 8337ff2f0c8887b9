//! # Per-requester permit gate
//!
//! One [`RateLimiter`] exists per requester key. It hands out a fixed number
//! of permits per fixed window and refills to full at each boundary.
//!
//! ```text
//!     permits = 1, window = 60s, windows aligned to creation time
//!
//!     t=0     acquire ──► 🎫 → ✅   (0 left)
//!     t=5s    acquire ──► ❌
//!     t=59s   acquire ──► ❌
//!     t=60s   window rolls, refill to 1
//!     t=61s   acquire ──► 🎫 → ✅
//! ```
//!
//! ## Lock-free design
//!
//! The window index and the permits left in it share one `AtomicU64`, so a
//! window roll and the acquisition that triggers it are a single
//! compare-and-swap:
//!
//! ```text
//!     63            32 31             0
//!     ┌───────────────┬───────────────┐
//!     │ window index  │ permits left  │
//!     └───────────────┴───────────────┘
//! ```
//!
//! The index counts windows since the limiter's epoch and wraps at 32 bits.
//! A thread whose clock reading is older than the stored index uses the
//! stored window and never rolls it back. Nothing in here sleeps or blocks.

use super::{
    config::RateLimiterConfig,
    metrics::RateLimiterMetrics,
    utils::{current_time_ms, Backoff, CacheAligned},
};
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, trace};

/// Granularity of the last-access timestamp, in milliseconds.
///
/// The timestamp only feeds idle-key expiry, so it is refreshed at most this
/// often to keep the hot path to a single relaxed load.
pub(crate) const LAST_ACCESS_UPDATE_INTERVAL_MS: u64 = 100;

#[inline(always)]
const fn pack(window: u32, permits: u32) -> u64 {
    ((window as u64) << 32) | permits as u64
}

#[inline(always)]
const fn unpack(state: u64) -> (u32, u32) {
    ((state >> 32) as u32, state as u32)
}

/// `true` if window `now` comes after window `stored`, modulo wrap-around.
#[inline(always)]
fn is_later_window(now: u32, stored: u32) -> bool {
    (now.wrapping_sub(stored) as i32) > 0
}

/// Fixed-window permit counter for a single requester.
///
/// Share it through an `Arc`; every method takes `&self`.
///
/// ## Example
///
/// ```rust
/// use epistat::{RateLimiter, RateLimiterConfig};
///
/// let limiter = RateLimiter::with_config(RateLimiterConfig::per_minute(2));
///
/// assert!(limiter.try_acquire());
/// assert!(limiter.try_acquire());
/// assert!(!limiter.try_acquire()); // window exhausted
/// ```
pub struct RateLimiter {
    /// Packed window index and permits left, see the module docs.
    state: CacheAligned<AtomicU64>,

    /// Start of window 0, ms since epoch. Only [`RateLimiter::reset`] moves it.
    epoch_ms: AtomicU64,

    /// Last time the limiter was consulted (coarse, see
    /// [`LAST_ACCESS_UPDATE_INTERVAL_MS`]).
    last_access_ms: CacheAligned<AtomicU64>,

    consecutive_rejections: AtomicU32,

    permits_per_window: u32,
    window_ms: u64,

    total_acquired: AtomicU64,
    total_rejected: AtomicU64,
    window_resets: AtomicU64,
}

impl RateLimiter {
    /// Creates a limiter allowing `permits` acquisitions per `window`.
    ///
    /// # Panics
    ///
    /// Panics if `permits` is zero or above [`MAX_PERMITS`](crate::MAX_PERMITS),
    /// or `window` is shorter than a millisecond.
    #[inline]
    pub fn new(permits: u64, window: Duration) -> Self {
        Self::with_config(RateLimiterConfig::per_window(permits, window))
    }

    /// Creates a limiter from a configuration.
    ///
    /// # Panics
    ///
    /// Panics if the configuration is invalid (see
    /// [`RateLimiterConfig::validate`]). Use [`RateLimiter::try_with_config`]
    /// to handle that case.
    pub fn with_config(config: RateLimiterConfig) -> Self {
        match Self::try_with_config(config) {
            Ok(limiter) => limiter,
            Err(reason) => panic!("Invalid rate limiter configuration: {}", reason),
        }
    }

    /// Creates a limiter, returning an error for an invalid configuration.
    pub fn try_with_config(config: RateLimiterConfig) -> Result<Self, &'static str> {
        config.validate()?;
        Ok(Self::from_validated(&config))
    }

    /// Builds a limiter from a configuration the caller already validated.
    pub(crate) fn from_validated(config: &RateLimiterConfig) -> Self {
        let now_ms = current_time_ms();
        let permits = config.permits.min(u32::MAX as u64) as u32;

        Self {
            state: CacheAligned::new(AtomicU64::new(pack(0, permits))),
            epoch_ms: AtomicU64::new(now_ms),
            last_access_ms: CacheAligned::new(AtomicU64::new(now_ms)),
            consecutive_rejections: AtomicU32::new(0),
            permits_per_window: permits,
            window_ms: config.window_ms,
            total_acquired: AtomicU64::new(0),
            total_rejected: AtomicU64::new(0),
            window_resets: AtomicU64::new(0),
        }
    }

    /// Attempts to take one permit from the current window.
    ///
    /// Returns `true` and consumes a permit if one is left, `false` otherwise.
    /// Never blocks.
    ///
    /// ```text
    ///     try_acquire()
    ///
    ///     load state ──► later window? ──yes──► left = P (roll)
    ///         ▲               │no
    ///         │               ▼
    ///         │          left > 0 ? ──no──► ❌
    ///         │               │yes
    ///         │               ▼
    ///         └─ lost ── CAS (window, left - 1) ──won──► ✅
    /// ```
    #[inline]
    pub fn try_acquire(&self) -> bool {
        let now_ms = current_time_ms();
        self.touch(now_ms);
        self.try_acquire_at(now_ms)
    }

    fn try_acquire_at(&self, now_ms: u64) -> bool {
        let now_window = self.window_index(now_ms);
        let mut backoff = Backoff::new();
        let mut current = self.state.value.load(Ordering::Acquire);

        loop {
            let (stored_window, left) = unpack(current);
            let (window, left, rolled) = if is_later_window(now_window, stored_window) {
                (now_window, self.permits_per_window, true)
            } else {
                (stored_window, left, false)
            };

            if left == 0 {
                self.on_rejection();
                return false;
            }

            match self.state.value.compare_exchange_weak(
                current,
                pack(window, left - 1),
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => {
                    if rolled {
                        self.window_resets.fetch_add(1, Ordering::Relaxed);
                        trace!(
                            "Window rolled forward by {} period(s)",
                            window.wrapping_sub(stored_window)
                        );
                    }
                    self.on_acquisition();
                    return true;
                }
                Err(actual) => {
                    // Another acquisition or roll for this key won the race.
                    current = actual;
                    backoff.snooze();
                }
            }
        }
    }

    /// Index of the window containing `now_ms`, truncated to 32 bits.
    #[inline]
    fn window_index(&self, now_ms: u64) -> u32 {
        let epoch = self.epoch_ms.load(Ordering::Acquire);
        (now_ms.saturating_sub(epoch) / self.window_ms) as u32
    }

    #[inline]
    fn touch(&self, now_ms: u64) {
        let last = self.last_access_ms.value.load(Ordering::Relaxed);
        if now_ms.saturating_sub(last) > LAST_ACCESS_UPDATE_INTERVAL_MS {
            self.last_access_ms.value.store(now_ms, Ordering::Relaxed);
        }
    }

    #[inline]
    fn on_acquisition(&self) {
        self.total_acquired.fetch_add(1, Ordering::Relaxed);
        if self.consecutive_rejections.load(Ordering::Relaxed) > 0 {
            self.consecutive_rejections.store(0, Ordering::Relaxed);
        }
    }

    #[inline]
    fn on_rejection(&self) {
        self.total_rejected.fetch_add(1, Ordering::Relaxed);
        let streak = self.consecutive_rejections.fetch_add(1, Ordering::Relaxed) + 1;
        if streak % 10 == 0 {
            debug!("Requester throttled {} times in a row", streak);
        }
    }

    /// Permits left in the current window.
    #[inline]
    pub fn available_permits(&self) -> u64 {
        let now_window = self.window_index(current_time_ms());
        let (stored_window, left) = unpack(self.state.value.load(Ordering::Acquire));
        if is_later_window(now_window, stored_window) {
            self.permits_per_window as u64
        } else {
            left as u64
        }
    }

    /// Time left until the current window ends and permits are restored.
    ///
    /// ```rust
    /// use epistat::RateLimiter;
    /// use std::time::Duration;
    ///
    /// let limiter = RateLimiter::new(1, Duration::from_secs(60));
    /// limiter.try_acquire();
    /// assert!(limiter.time_until_reset() <= Duration::from_secs(60));
    /// ```
    pub fn time_until_reset(&self) -> Duration {
        let now_ms = current_time_ms();
        let epoch = self.epoch_ms.load(Ordering::Acquire);
        let elapsed = now_ms.saturating_sub(epoch);
        let into_window = elapsed % self.window_ms;
        Duration::from_millis(self.window_ms - into_window)
    }

    /// Returns `true` if the limiter has not been consulted for longer than
    /// `inactive_duration_ms`.
    #[inline]
    pub fn is_inactive(&self, inactive_duration_ms: u64) -> bool {
        let now_ms = current_time_ms();
        let last_ms = self.last_access_ms.value.load(Ordering::Relaxed);
        now_ms.saturating_sub(last_ms) > inactive_duration_ms
    }

    /// Window length in milliseconds.
    #[inline]
    pub fn window_ms(&self) -> u64 {
        self.window_ms
    }

    /// Permits granted per window.
    #[inline]
    pub fn permits_per_window(&self) -> u64 {
        self.permits_per_window as u64
    }

    /// Snapshot of the counters.
    pub fn metrics(&self) -> RateLimiterMetrics {
        RateLimiterMetrics {
            total_acquired: self.total_acquired.load(Ordering::Relaxed),
            total_rejected: self.total_rejected.load(Ordering::Relaxed),
            window_resets: self.window_resets.load(Ordering::Relaxed),
            available_permits: self.available_permits(),
            permits_per_window: self.permits_per_window as u64,
            consecutive_rejections: self.consecutive_rejections.load(Ordering::Relaxed),
        }
    }

    /// Starts a fresh window with all permits and clears the counters.
    ///
    /// Not atomic with respect to concurrent acquisitions on the same
    /// limiter.
    pub fn reset(&self) {
        let now_ms = current_time_ms();

        self.epoch_ms.store(now_ms, Ordering::Release);
        self.state
            .value
            .store(pack(0, self.permits_per_window), Ordering::Release);
        self.last_access_ms.value.store(now_ms, Ordering::Relaxed);
        self.consecutive_rejections.store(0, Ordering::Relaxed);
        self.total_acquired.store(0, Ordering::Relaxed);
        self.total_rejected.store(0, Ordering::Relaxed);
        self.window_resets.store(0, Ordering::Relaxed);
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("permits_per_window", &self.permits_per_window)
            .field("window_ms", &self.window_ms)
            .field("available_permits", &self.available_permits())
            .finish()
    }
}
