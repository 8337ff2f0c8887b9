//! # Throttle Configuration
//!
//! Settings for the per-requester permit gate. A limiter hands out a fixed
//! number of permits per fixed-length window, and resets to full at every
//! window boundary.
//!
//! ```text
//!     window_ms = 60_000, permits = 1
//!
//!     t=0s          t=60s         t=120s
//!     ├─────────────┼─────────────┼──────►
//!     │ [🎫] → [ ]  │ [🎫]        │ [🎫]
//!     │  ✅    ❌   │             │
//! ```

use std::time::Duration;

/// Window length used by [`RateLimiterConfig::default`]: one minute.
pub const DEFAULT_WINDOW_MS: u64 = 60_000;

/// Permits per window used by [`RateLimiterConfig::default`].
pub const DEFAULT_PERMITS: u64 = 1;

/// Largest accepted `permits` value. The remaining count shares one atomic
/// word with the window index, 32 bits each.
pub const MAX_PERMITS: u64 = u32::MAX as u64;

/// Configuration for a single requester's rate limiter.
///
/// The same configuration is used as a template for every key tracked by a
/// [`RateLimiterManager`](super::RateLimiterManager).
///
/// ## Examples
///
/// ```rust
/// use epistat::RateLimiterConfig;
/// use std::time::Duration;
///
/// // One request per minute (the default)
/// let config = RateLimiterConfig::default();
/// assert_eq!(config.permits, 1);
///
/// // Five requests per minute
/// let config = RateLimiterConfig::per_minute(5);
///
/// // Two requests every ten seconds
/// let config = RateLimiterConfig::per_window(2, Duration::from_secs(10));
/// assert_eq!(config.window_ms, 10_000);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimiterConfig {
    /// Number of successful acquisitions allowed in one window.
    pub permits: u64,

    /// Window length in milliseconds.
    pub window_ms: u64,
}

impl Default for RateLimiterConfig {
    /// One permit per minute.
    fn default() -> Self {
        Self {
            permits: DEFAULT_PERMITS,
            window_ms: DEFAULT_WINDOW_MS,
        }
    }
}

impl RateLimiterConfig {
    /// Creates a configuration with `permits` per `window_ms` milliseconds.
    pub fn new(permits: u64, window_ms: u64) -> Self {
        Self { permits, window_ms }
    }

    /// Creates a configuration allowing `permits` acquisitions per minute.
    pub fn per_minute(permits: u64) -> Self {
        Self::new(permits, 60_000)
    }

    /// Creates a configuration from a [`Duration`] window.
    ///
    /// Sub-millisecond precision is truncated.
    pub fn per_window(permits: u64, window: Duration) -> Self {
        Self::new(permits, window.as_millis().min(u64::MAX as u128) as u64)
    }

    /// Returns the window as a [`Duration`].
    pub fn window(&self) -> Duration {
        Duration::from_millis(self.window_ms)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error message if `permits` or `window_ms` is zero, or if
    /// `permits` exceeds [`MAX_PERMITS`].
    ///
    /// ```rust
    /// use epistat::RateLimiterConfig;
    ///
    /// assert!(RateLimiterConfig::new(0, 1000).validate().is_err());
    /// assert!(RateLimiterConfig::new(1, 0).validate().is_err());
    /// assert!(RateLimiterConfig::new(1, 1000).validate().is_ok());
    /// ```
    pub fn validate(&self) -> Result<(), &'static str> {
        if self.permits == 0 {
            return Err("permits must be greater than 0");
        }
        if self.permits > MAX_PERMITS {
            return Err("permits must fit in 32 bits");
        }
        if self.window_ms == 0 {
            return Err("window_ms must be greater than 0");
        }
        Ok(())
    }

    /// Human-readable cooldown description, e.g. `"1 minute"` or `"90 seconds"`.
    pub fn cooldown_description(&self) -> String {
        describe_window(self.window_ms)
    }
}

pub(crate) fn describe_window(window_ms: u64) -> String {
    let plural = |n: u64, unit: &str| {
        if n == 1 {
            format!("1 {}", unit)
        } else {
            format!("{} {}s", n, unit)
        }
    };

    if window_ms % 3_600_000 == 0 {
        plural(window_ms / 3_600_000, "hour")
    } else if window_ms % 60_000 == 0 {
        plural(window_ms / 60_000, "minute")
    } else if window_ms % 1000 == 0 {
        plural(window_ms / 1000, "second")
    } else {
        format!("{} ms", window_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_one_per_minute() {
        let config = RateLimiterConfig::default();
        assert_eq!(config.permits, 1);
        assert_eq!(config.window_ms, 60_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        assert!(RateLimiterConfig::new(0, 1000).validate().is_err());
        assert!(RateLimiterConfig::new(3, 0).validate().is_err());
        assert!(RateLimiterConfig::new(3, 1).validate().is_ok());
        assert!(RateLimiterConfig::new(MAX_PERMITS, 1).validate().is_ok());
        assert!(RateLimiterConfig::new(MAX_PERMITS + 1, 1).validate().is_err());
    }

    #[test]
    fn test_per_window_conversion() {
        let config = RateLimiterConfig::per_window(2, Duration::from_millis(1500));
        assert_eq!(config.window_ms, 1500);
        assert_eq!(config.window(), Duration::from_millis(1500));

        let config = RateLimiterConfig::per_minute(10);
        assert_eq!(config.window_ms, 60_000);
        assert_eq!(config.permits, 10);
    }

    #[test]
    fn test_cooldown_description() {
        assert_eq!(RateLimiterConfig::default().cooldown_description(), "1 minute");
        assert_eq!(RateLimiterConfig::new(1, 120_000).cooldown_description(), "2 minutes");
        assert_eq!(RateLimiterConfig::new(1, 90_000).cooldown_description(), "90 seconds");
        assert_eq!(RateLimiterConfig::new(1, 3_600_000).cooldown_description(), "1 hour");
        assert_eq!(RateLimiterConfig::new(1, 250).cooldown_description(), "250 ms");
    }
}
