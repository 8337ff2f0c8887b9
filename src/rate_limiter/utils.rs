//! # Timing and spin helpers
//!
//! Low-level pieces shared by the limiter: a monotonic millisecond clock,
//! a cache-line wrapper for hot atomics, and a bounded spin backoff used
//! when two threads race on the same key.

use std::sync::OnceLock;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

// Wall-clock epoch captured once, advanced by a monotonic Instant so that
// window arithmetic never goes backwards when the system clock jumps.
static START_TIME_BASE: OnceLock<(Instant, u64)> = OnceLock::new();

/// Spin-loop hint for the CPU.
#[inline(always)]
pub(crate) fn cpu_relax() {
    std::hint::spin_loop();
}

/// Current time in milliseconds since UNIX epoch, monotonic within the process.
///
/// ```rust
/// use epistat::current_time_ms;
///
/// let a = current_time_ms();
/// let b = current_time_ms();
/// assert!(b >= a);
/// ```
#[inline(always)]
pub fn current_time_ms() -> u64 {
    let (start, base_ms) = START_TIME_BASE.get_or_init(|| {
        let epoch_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;
        (Instant::now(), epoch_ms)
    });
    base_ms.saturating_add(start.elapsed().as_millis() as u64)
}

/// Pads a value to its own cache line so per-key counters touched by
/// different threads don't false-share.
#[cfg_attr(target_arch = "aarch64", repr(C, align(128)))]
#[cfg_attr(not(target_arch = "aarch64"), repr(C, align(64)))]
pub(crate) struct CacheAligned<T> {
    pub(crate) value: T,
}

impl<T> CacheAligned<T> {
    #[inline(always)]
    pub(crate) const fn new(value: T) -> Self {
        Self { value }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for CacheAligned<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.value.fmt(f)
    }
}

/// Exponential spin backoff for CAS retry loops.
///
/// ```text
///     step 0: spin 1
///     step 1: spin 2
///     step 2: spin 4
///     step 3: spin 8
///     step 4+: yield to the scheduler
/// ```
///
/// Never sleeps, so callers stay non-blocking.
#[derive(Debug, Clone)]
pub(crate) struct Backoff {
    step: u32,
}

impl Backoff {
    const SPIN_LIMIT: u32 = 4;

    pub(crate) fn new() -> Self {
        Self { step: 0 }
    }

    #[inline]
    pub(crate) fn snooze(&mut self) {
        if self.step < Self::SPIN_LIMIT {
            for _ in 0..(1u32 << self.step) {
                cpu_relax();
            }
            self.step += 1;
        } else {
            std::thread::yield_now();
        }
    }

    #[cfg(test)]
    pub(crate) fn is_spinning(&self) -> bool {
        self.step < Self::SPIN_LIMIT
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_line_size() {
        let align = std::mem::align_of::<CacheAligned<u64>>();
        assert!(align.is_power_of_two());
        assert!(align >= 64);
    }

    #[test]
    fn test_time_monotonicity() {
        let mut last = 0;
        for _ in 0..10 {
            let now = current_time_ms();
            assert!(now >= last);
            last = now;
            std::thread::sleep(std::time::Duration::from_millis(1));
        }
    }

    #[test]
    fn test_time_advances() {
        let before = current_time_ms();
        std::thread::sleep(std::time::Duration::from_millis(20));
        assert!(current_time_ms() >= before + 20);
    }

    #[test]
    fn test_backoff_progression() {
        let mut backoff = Backoff::new();
        assert!(backoff.is_spinning());
        for _ in 0..4 {
            backoff.snooze();
        }
        assert!(!backoff.is_spinning());

        // Stays in yield mode
        backoff.snooze();
        assert!(!backoff.is_spinning());
    }

    #[test]
    fn test_cache_aligned_debug() {
        let aligned = CacheAligned::new(42u64);
        assert_eq!(format!("{:?}", aligned), "42");
    }
}
