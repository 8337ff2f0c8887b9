//! # Requester throttling
//!
//! Keeps one requester from hammering the upstream statistics source.
//!
//! ```text
//!     rate_limiter/
//!     ├── mod.rs          (module organization)
//!     ├── config.rs       (permits per window)
//!     ├── core.rs         (per-key fixed-window permit counter)
//!     ├── manager.rs      (key → limiter store, optional idle expiry)
//!     ├── metrics.rs      (per-key snapshot)
//!     └── utils.rs        (clock, cache padding, spin backoff)
//! ```
//!
//! ```text
//!     requester key
//!          │
//!          ▼
//!     ┌─────────┐
//!     │ Manager │ ◄── lazily creates one limiter per key
//!     └────┬────┘
//!          ▼
//!     ┌─────────┐
//!     │  Core   │ ◄── P permits per W-long window
//!     └─────────┘
//! ```

mod config;
mod core;
mod manager;
mod metrics;
mod utils;

pub use config::{RateLimiterConfig, DEFAULT_PERMITS, DEFAULT_WINDOW_MS, MAX_PERMITS};
pub use core::RateLimiter;
pub use manager::{ManagerStats, RateLimiterManager};
pub(crate) use manager::DEFAULT_CLEANUP_INTERVAL_MS;
pub use metrics::RateLimiterMetrics;
pub use utils::current_time_ms;
