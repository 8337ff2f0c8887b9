//! # Limiter metrics
//!
//! Point-in-time snapshot of one requester's limiter. Useful for logging
//! why a requester keeps getting throttled.

use std::fmt;

/// Snapshot of a single [`RateLimiter`](super::RateLimiter).
///
/// ```rust
/// use epistat::{RateLimiter, RateLimiterConfig};
///
/// let limiter = RateLimiter::with_config(RateLimiterConfig::default());
/// limiter.try_acquire();
/// limiter.try_acquire();
///
/// let metrics = limiter.metrics();
/// assert_eq!(metrics.total_acquired, 1);
/// assert_eq!(metrics.total_rejected, 1);
/// assert!(metrics.is_exhausted());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct RateLimiterMetrics {
    /// Successful acquisitions since creation.
    pub total_acquired: u64,

    /// Rejected acquisitions since creation.
    pub total_rejected: u64,

    /// Number of times the window rolled over and permits were restored.
    pub window_resets: u64,

    /// Permits left in the current window.
    pub available_permits: u64,

    /// Permits granted per window.
    pub permits_per_window: u64,

    /// Rejections since the last successful acquisition.
    pub consecutive_rejections: u32,
}

impl RateLimiterMetrics {
    /// Fraction of attempts that were granted, `1.0` when nothing was attempted.
    #[inline]
    pub fn success_rate(&self) -> f64 {
        let total = self.total_requests();
        if total == 0 {
            1.0
        } else {
            self.total_acquired as f64 / total as f64
        }
    }

    /// Fraction of attempts that were throttled.
    #[inline]
    pub fn rejection_rate(&self) -> f64 {
        1.0 - self.success_rate()
    }

    /// Total attempts, granted or not.
    #[inline]
    pub fn total_requests(&self) -> u64 {
        self.total_acquired + self.total_rejected
    }

    /// `true` when no permit is left in the current window.
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.available_permits == 0
    }

    /// Multi-line summary for logs.
    pub fn summary(&self) -> String {
        format!(
            "RateLimiter Metrics:\n\
             ├─ Permits: {}/{}\n\
             ├─ Acquired: {}\n\
             ├─ Rejected: {} ({:.2}%)\n\
             ├─ Consecutive Rejections: {}\n\
             └─ Window Resets: {}",
            self.available_permits,
            self.permits_per_window,
            self.total_acquired,
            self.total_rejected,
            self.rejection_rate() * 100.0,
            self.consecutive_rejections,
            self.window_resets,
        )
    }
}

impl fmt::Display for RateLimiterMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RateLimiterMetrics {
        RateLimiterMetrics {
            total_acquired: 3,
            total_rejected: 1,
            window_resets: 2,
            available_permits: 0,
            permits_per_window: 1,
            consecutive_rejections: 1,
        }
    }

    #[test]
    fn test_rates() {
        let metrics = sample();
        assert_eq!(metrics.total_requests(), 4);
        assert!((metrics.success_rate() - 0.75).abs() < f64::EPSILON);
        assert!((metrics.rejection_rate() - 0.25).abs() < f64::EPSILON);
        assert!(metrics.is_exhausted());
    }

    #[test]
    fn test_no_requests_is_full_success() {
        let metrics = RateLimiterMetrics {
            total_acquired: 0,
            total_rejected: 0,
            window_resets: 0,
            available_permits: 1,
            permits_per_window: 1,
            consecutive_rejections: 0,
        };
        assert_eq!(metrics.success_rate(), 1.0);
        assert!(!metrics.is_exhausted());
    }

    #[test]
    fn test_summary_contents() {
        let summary = sample().to_string();
        assert!(summary.contains("Permits: 0/1"));
        assert!(summary.contains("Rejected: 1 (25.00%)"));
        assert!(summary.contains("Window Resets: 2"));
    }
}
