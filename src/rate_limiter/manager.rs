//! # Per-requester limiter store
//!
//! Maps each requester key (a user id, a chat id, an IP, anything hashable)
//! to its own [`RateLimiter`], created on first use.
//!
//! ```text
//!     requester 10001 ──┐
//!     requester 10002 ──┼──► RateLimiterManager ──► DashMap<K, Arc<RateLimiter>>
//!     requester 10003 ──┘                              ├─ 10001 → 🎫 0/1
//!                                                      ├─ 10002 → 🎫 1/1
//!                                                      └─ 10003 → 🎫 0/1
//! ```
//!
//! ## Key lifetime
//!
//! By default a key's limiter lives as long as the manager. That is an
//! unbounded-growth characteristic under many distinct requesters; opt into
//! idle expiry with [`RateLimiterManager::with_idle_expiry`] and either call
//! [`RateLimiterManager::cleanup`] yourself or start the cleanup thread.
//!
//! Expiry never drops a key that could still be throttled: the idle threshold
//! is raised to at least one full window, so a requester that exhausted its
//! permits cannot get a fresh limiter before its window is over.

use super::{
    config::RateLimiterConfig,
    core::{RateLimiter, LAST_ACCESS_UPDATE_INTERVAL_MS},
    metrics::RateLimiterMetrics,
};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::fmt;
use std::hash::Hash;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

/// Default interval between background cleanup passes (milliseconds).
pub(crate) const DEFAULT_CLEANUP_INTERVAL_MS: u64 = 60_000;

/// Keyed collection of rate limiters, one per requester.
///
/// Cloning is cheap and shares the underlying store.
///
/// ## Example
///
/// ```rust
/// use epistat::{RateLimiterConfig, RateLimiterManager};
///
/// let manager: RateLimiterManager<i64> = RateLimiterManager::new(RateLimiterConfig::default());
///
/// assert!(manager.try_acquire(10001));
/// assert!(!manager.try_acquire(10001)); // same user, same minute
/// assert!(manager.try_acquire(10002));  // different user
/// ```
pub struct RateLimiterManager<K = i64>
where
    K: Eq + Hash,
{
    limiters: Arc<DashMap<K, Arc<RateLimiter>, ahash::RandomState>>,

    /// Template for every per-key limiter; validated at construction.
    config: RateLimiterConfig,

    /// Idle threshold for expiry, `None` keeps keys forever.
    idle_expiry_ms: Option<u64>,

    cleanup_interval_ms: u64,

    total_created: Arc<AtomicU64>,
    total_evicted: Arc<AtomicU64>,
}

impl<K> Clone for RateLimiterManager<K>
where
    K: Eq + Hash,
{
    fn clone(&self) -> Self {
        Self {
            limiters: Arc::clone(&self.limiters),
            config: self.config.clone(),
            idle_expiry_ms: self.idle_expiry_ms,
            cleanup_interval_ms: self.cleanup_interval_ms,
            total_created: Arc::clone(&self.total_created),
            total_evicted: Arc::clone(&self.total_evicted),
        }
    }
}

impl<K> RateLimiterManager<K>
where
    K: Eq + Hash + fmt::Debug,
{
    /// Creates a manager that keeps every key for its whole lifetime.
    ///
    /// # Panics
    ///
    /// Panics if `config` is invalid. Use [`RateLimiterManager::try_new`] to
    /// handle that case.
    pub fn new(config: RateLimiterConfig) -> Self {
        match Self::try_new(config) {
            Ok(manager) => manager,
            Err(reason) => panic!("Invalid rate limiter configuration: {}", reason),
        }
    }

    /// Creates a manager, returning an error for an invalid configuration.
    pub fn try_new(config: RateLimiterConfig) -> Result<Self, &'static str> {
        config.validate()?;

        let num_shards = thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(8)
            .next_power_of_two()
            .clamp(4, 64);

        Ok(Self {
            limiters: Arc::new(DashMap::with_capacity_and_hasher_and_shard_amount(
                0,
                ahash::RandomState::new(),
                num_shards,
            )),
            config,
            idle_expiry_ms: None,
            cleanup_interval_ms: DEFAULT_CLEANUP_INTERVAL_MS,
            total_created: Arc::new(AtomicU64::new(0)),
            total_evicted: Arc::new(AtomicU64::new(0)),
        })
    }

    /// Creates a manager that forgets keys idle for longer than
    /// `idle_expiry_ms`.
    ///
    /// The effective threshold is never shorter than one window (plus the
    /// access-timestamp granularity).
    ///
    /// # Panics
    ///
    /// Panics if `config` is invalid.
    ///
    /// ```rust
    /// use epistat::{RateLimiterConfig, RateLimiterManager};
    ///
    /// let manager: RateLimiterManager<u64> = RateLimiterManager::with_idle_expiry(
    ///     RateLimiterConfig::default(),
    ///     30_000,   // cleanup pass every 30 seconds
    ///     600_000,  // forget users idle for 10 minutes
    /// );
    /// assert_eq!(manager.idle_expiry_ms(), Some(600_000));
    /// ```
    pub fn with_idle_expiry(
        config: RateLimiterConfig,
        cleanup_interval_ms: u64,
        idle_expiry_ms: u64,
    ) -> Self {
        let mut manager = Self::new(config);
        let floor = manager.config.window_ms + LAST_ACCESS_UPDATE_INTERVAL_MS;
        manager.idle_expiry_ms = Some(idle_expiry_ms.max(floor));
        manager.cleanup_interval_ms = cleanup_interval_ms.max(1);
        manager
    }

    /// The per-key configuration.
    pub fn config(&self) -> &RateLimiterConfig {
        &self.config
    }

    /// Effective idle threshold, `None` when keys never expire.
    pub fn idle_expiry_ms(&self) -> Option<u64> {
        self.idle_expiry_ms
    }

    /// Returns the limiter for `key`, creating it on first access.
    ///
    /// Concurrent first accesses for the same key all receive the same
    /// limiter.
    #[inline]
    pub fn get_limiter(&self, key: K) -> Arc<RateLimiter> {
        if let Some(limiter) = self.limiters.get(&key) {
            return Arc::clone(limiter.value());
        }

        match self.limiters.entry(key) {
            Entry::Occupied(occupied) => Arc::clone(occupied.get()),
            Entry::Vacant(vacant) => {
                debug!("Created rate limiter for requester {:?}", vacant.key());
                let limiter = Arc::new(RateLimiter::from_validated(&self.config));
                vacant.insert(Arc::clone(&limiter));
                self.total_created.fetch_add(1, Ordering::Relaxed);
                limiter
            }
        }
    }

    /// Attempts to take one permit for `key`. Never blocks.
    ///
    /// Returns `true` when the requester may proceed, `false` when it is
    /// throttled for the rest of the current window.
    #[inline]
    pub fn try_acquire(&self, key: K) -> bool {
        self.get_limiter(key).try_acquire()
    }

    /// Metrics for `key`, if it is tracked.
    pub fn metrics(&self, key: &K) -> Option<RateLimiterMetrics> {
        self.limiters.get(key).map(|limiter| limiter.metrics())
    }

    /// Time until `key` gets permits again; zero for untracked keys.
    pub fn time_until_reset(&self, key: &K) -> Duration {
        self.limiters
            .get(key)
            .map(|limiter| limiter.time_until_reset())
            .unwrap_or_default()
    }

    /// Number of keys currently tracked.
    #[inline]
    pub fn tracked_keys(&self) -> usize {
        self.limiters.len()
    }

    /// Removes limiters idle past the expiry threshold.
    ///
    /// Does nothing when idle expiry is not configured. Returns the number
    /// of removed keys.
    pub fn cleanup(&self) -> usize {
        let threshold = match self.idle_expiry_ms {
            Some(threshold) => threshold,
            None => return 0,
        };

        let mut removed = 0usize;
        self.limiters.retain(|key, limiter| {
            if limiter.is_inactive(threshold) {
                debug!("Evicting idle rate limiter for requester {:?}", key);
                removed += 1;
                false
            } else {
                true
            }
        });

        if removed > 0 {
            self.total_evicted
                .fetch_add(removed as u64, Ordering::Relaxed);
            self.limiters.shrink_to_fit();
            info!("Cleanup removed {} idle rate limiters", removed);
        }
        removed
    }

    /// Drops every tracked key.
    pub fn clear(&self) {
        let count = self.limiters.len();
        self.limiters.clear();
        self.total_evicted.fetch_add(count as u64, Ordering::Relaxed);
        info!("Cleared all {} rate limiters", count);
    }

    /// Store statistics.
    pub fn stats(&self) -> ManagerStats {
        ManagerStats {
            tracked_keys: self.tracked_keys(),
            total_created: self.total_created.load(Ordering::Relaxed),
            total_evicted: self.total_evicted.load(Ordering::Relaxed),
            idle_expiry_ms: self.idle_expiry_ms,
        }
    }
}

impl<K> RateLimiterManager<K>
where
    K: Eq + Hash + fmt::Debug + Send + Sync + 'static,
{
    /// Starts a background thread running [`cleanup`](Self::cleanup) every
    /// cleanup interval until a message is sent on the returned channel (or
    /// the sender is dropped).
    ///
    /// # Errors
    ///
    /// Returns the OS error if the thread cannot be spawned.
    ///
    /// ```rust
    /// use epistat::{RateLimiterConfig, RateLimiterManager};
    /// use std::sync::Arc;
    ///
    /// let manager = Arc::new(RateLimiterManager::<i64>::with_idle_expiry(
    ///     RateLimiterConfig::default(),
    ///     1_000,
    ///     600_000,
    /// ));
    /// let (handle, stop_tx) = manager.clone().start_stoppable_cleanup_thread().unwrap();
    ///
    /// stop_tx.send(()).unwrap();
    /// handle.join().unwrap();
    /// ```
    pub fn start_stoppable_cleanup_thread(
        self: Arc<Self>,
    ) -> io::Result<(thread::JoinHandle<()>, mpsc::Sender<()>)> {
        let (stop_tx, stop_rx) = mpsc::channel();
        let manager = self;

        let handle = thread::Builder::new()
            .name("epistat-limiter-cleanup".to_string())
            .spawn(move || {
                info!(
                    "Started limiter cleanup thread (interval: {}ms, idle expiry: {:?}ms)",
                    manager.cleanup_interval_ms, manager.idle_expiry_ms
                );

                loop {
                    match stop_rx.recv_timeout(Duration::from_millis(manager.cleanup_interval_ms)) {
                        Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => {
                            info!("Limiter cleanup thread stopping");
                            break;
                        }
                        Err(mpsc::RecvTimeoutError::Timeout) => {
                            manager.cleanup();
                        }
                    }
                }
            })?;

        Ok((handle, stop_tx))
    }
}

impl<K> fmt::Debug for RateLimiterManager<K>
where
    K: Eq + Hash,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiterManager")
            .field("tracked_keys", &self.limiters.len())
            .field("config", &self.config)
            .field("idle_expiry_ms", &self.idle_expiry_ms)
            .finish()
    }
}

/// Statistics for a [`RateLimiterManager`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerStats {
    /// Keys currently tracked.
    pub tracked_keys: usize,

    /// Limiters created since startup.
    pub total_created: u64,

    /// Limiters removed by cleanup or [`RateLimiterManager::clear`].
    pub total_evicted: u64,

    /// Effective idle threshold, `None` when keys never expire.
    pub idle_expiry_ms: Option<u64>,
}

impl ManagerStats {
    /// Human-readable summary.
    pub fn summary(&self) -> String {
        let expiry = match self.idle_expiry_ms {
            Some(ms) => format!("{}ms", ms),
            None => "never".to_string(),
        };
        format!(
            "Rate Limiter Store Stats:\n\
             ├─ Tracked Keys: {}\n\
             ├─ Total Created: {}\n\
             ├─ Total Evicted: {}\n\
             └─ Idle Expiry: {}",
            self.tracked_keys, self.total_created, self.total_evicted, expiry
        )
    }
}

impl fmt::Display for ManagerStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary())
    }
}
