//! # Epistat - Epidemic Statistics Lookup with Per-User Throttling
//!
//! Parses the nested area-statistics feed published by the 163.com epidemic
//! endpoint, finds the area a user asked about, and keeps each user to a fixed
//! number of reports per time window.
//!
//! ## What Does It Do?
//!
//! A chat bot receives "Hubei" from user 10001. Epistat:
//!
//! ```text
//!     1. decode the feed        {"data": "{\"areaTree\": [...]}"}   (JSON inside a JSON string)
//!     2. search the tree        China ─► Hubei ✅
//!     3. check the user's quota 🎫 1 permit per minute
//!     4. format the report      [Hubei] epidemic statistics ...
//! ```
//!
//! ## The Area Tree
//!
//! ```text
//!     China
//!     ├── Hubei           ◄── level 1, checked before any level 2 name
//!     │   ├── Wuhan
//!     │   └── Yichang
//!     └── Guangdong
//!         └── Shenzhen    ◄── found only if no shallower area matches
//! ```
//!
//! Names are compared exactly. The first root is searched; other roots are
//! ignored.
//!
//! ## Quick Start
//!
//! ### Just the lookup
//!
//! ```rust
//! use epistat::QueryPipeline;
//!
//! let body = br#"{"data":"{\"lastUpdateTime\":\"2022-03-01 09:00:00\",\"areaTree\":[{\"name\":\"China\",\"children\":[{\"name\":\"Hubei\",\"total\":{\"confirm\":68135}}]}]}"}"#;
//!
//! let result = QueryPipeline::new().query(body, "Hubei").unwrap();
//! assert_eq!(result.area.unwrap().total.confirmed, 68135);
//! ```
//!
//! ### The full request flow
//!
//! ```rust
//! use epistat::{EpidemicServiceBuilder, Reply, StaticPayload};
//!
//! let body = r#"{"data":"{\"areaTree\":[{\"name\":\"China\",\"children\":[{\"name\":\"Hubei\"}]}]}"}"#;
//!
//! let service = EpidemicServiceBuilder::new()
//!     .permits(1)
//!     .window_ms(60_000)
//!     .build::<_, i64>(StaticPayload::from(body));
//!
//! let reply = service.handle(10001, "Hubei");
//! assert!(reply.is_report());
//! println!("{}", reply);
//!
//! let reply = service.handle(10001, "Hubei");
//! assert!(matches!(reply, Reply::Throttled { .. }));
//! ```
//!
//! ## Architecture Overview
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │   Bot / HTTP handler    │
//!                    └──────────┬──────────────┘
//!                               │ handle(requester, city)
//!                    ┌──────────▼──────────────┐
//!                    │    EpidemicService      │
//!                    └──────────┬──────────────┘
//!                               │
//!          ┌────────────────────┼─────────────────────┐
//!          │                    │                     │
//!   ┌──────▼───────┐   ┌────────▼────────┐   ┌────────▼──────────┐
//!   │ PayloadSource│   │  QueryPipeline  │   │ RateLimiterManager│
//!   ├──────────────┤   ├─────────────────┤   ├───────────────────┤
//!   │ • fetch()    │   │ • parse_payload │   │ • per-key limiter │
//!   │              │   │ • find_area     │   │ • fixed windows   │
//!   └──────────────┘   └─────────────────┘   └───────────────────┘
//! ```
//!
//! ## Thread Safety
//!
//! Everything here is `Send + Sync`:
//! - `QueryPipeline` holds no state.
//! - `RateLimiterManager` shards its map and each limiter is lock-free.
//! - `EpidemicService` can be shared via `Arc<EpidemicService<_>>`.
//!
//! ## Examples
//!
//! See the `demos/` directory:
//! - `basic.rs` - Parsing and lookup
//! - `per_user_limiting.rs` - Several users hitting the service concurrently

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(
    missing_docs,
    rust_2018_idioms,
    unreachable_pub,
    missing_debug_implementations
)]
#![forbid(unsafe_code)]

mod area;
mod error;
mod payload;
mod pipeline;
mod rate_limiter;
mod report;
mod service;

// Public re-exports
pub use area::{
    find_area, find_area_path, AreaRecord, AreaTree, ExtendedStats, TodayStats, TotalStats,
};
pub use error::{FetchError, ParseError, QueryError};
pub use payload::{parse_payload, Payload};
pub use pipeline::{QueryPipeline, QueryResult};
pub use rate_limiter::{
    current_time_ms, ManagerStats, RateLimiter, RateLimiterConfig, RateLimiterManager,
    RateLimiterMetrics, DEFAULT_PERMITS, DEFAULT_WINDOW_MS, MAX_PERMITS,
};
pub use report::Report;
pub use service::{EpidemicService, PayloadSource, Reply, ServiceConfig, StaticPayload};

use std::fmt;
use std::hash::Hash;

/// A service wrapped in `Arc` for sharing between handler threads.
pub type SharedService<S, K = i64> = std::sync::Arc<EpidemicService<S, K>>;

/// Version information for the crate.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// The public endpoint the statistics payload is normally fetched from.
///
/// The crate does not fetch it; [`PayloadSource`] implementations do.
pub const DEFAULT_SOURCE_URL: &str = "https://c.m.163.com/ug/api/wuhan/app/data/list-total";

/// Prelude module for convenient imports.
///
/// ```rust
/// use epistat::prelude::*;
/// ```
pub mod prelude {
    //! Common imports for a bot or service handler.
    //!
    //! # Example
    //! ```rust
    //! use epistat::prelude::*;
    //!
    //! let config = RateLimiterConfig::per_minute(1);
    //! let manager: RateLimiterManager<i64> = RateLimiterManager::new(config);
    //! let pipeline = QueryPipeline::new();
    //! ```

    pub use crate::{
        AreaRecord, EpidemicService, EpidemicServiceBuilder, FetchError, ParseError,
        PayloadSource, QueryError, QueryPipeline, RateLimiterConfig, RateLimiterManager, Reply,
        Report, StaticPayload,
    };
}

/// Builder for an [`EpidemicService`].
///
/// Defaults to one report per user per minute, with users kept forever.
///
/// # Example
///
/// ```rust
/// use epistat::{EpidemicServiceBuilder, StaticPayload};
/// use std::time::Duration;
///
/// let service = EpidemicServiceBuilder::new()
///     .permits(3)
///     .window(Duration::from_secs(30))
///     .idle_expiry_ms(600_000)
///     .build::<_, u64>(StaticPayload::from("{}"));
///
/// assert_eq!(service.limiter().config().permits, 3);
///
/// // Or use try_build() for error handling
/// let result = EpidemicServiceBuilder::new()
///     .permits(0)
///     .try_build::<_, u64>(StaticPayload::from("{}"));
///
/// assert!(result.is_err());
/// ```
#[derive(Debug, Clone, Default)]
pub struct EpidemicServiceBuilder {
    config: ServiceConfig,
}

impl EpidemicServiceBuilder {
    /// Creates a builder with the default configuration.
    pub fn new() -> Self {
        Self {
            config: ServiceConfig::default(),
        }
    }

    /// Sets the number of reports each user gets per window (must be > 0).
    pub fn permits(mut self, permits: u64) -> Self {
        self.config.limiter.permits = permits;
        self
    }

    /// Sets the window length in milliseconds (must be > 0).
    pub fn window_ms(mut self, ms: u64) -> Self {
        self.config.limiter.window_ms = ms;
        self
    }

    /// Sets the window length. Sub-millisecond precision is truncated.
    pub fn window(mut self, window: std::time::Duration) -> Self {
        let permits = self.config.limiter.permits;
        self.config.limiter = RateLimiterConfig::per_window(permits, window);
        self
    }

    /// Forgets users idle for longer than `ms`.
    pub fn idle_expiry_ms(mut self, ms: u64) -> Self {
        self.config.idle_expiry_ms = Some(ms);
        self
    }

    /// Sets the interval of the cleanup thread, when one is started.
    pub fn cleanup_interval_ms(mut self, ms: u64) -> Self {
        self.config.cleanup_interval_ms = ms;
        self
    }

    /// The configuration built so far.
    pub fn config(&self) -> &ServiceConfig {
        &self.config
    }

    /// Builds the service.
    ///
    /// # Panics
    ///
    /// Panics if the configuration is invalid:
    /// - `permits` is 0
    /// - the window is 0
    /// - the cleanup interval or idle expiry is 0
    ///
    /// Use `try_build()` if you want to handle errors.
    pub fn build<S, K>(self, source: S) -> EpidemicService<S, K>
    where
        S: PayloadSource,
        K: Eq + Hash + fmt::Debug,
    {
        match self.try_build(source) {
            Ok(service) => service,
            Err(reason) => panic!("Invalid service configuration: {}", reason),
        }
    }

    /// Attempts to build the service, returning an error if invalid.
    pub fn try_build<S, K>(self, source: S) -> Result<EpidemicService<S, K>, &'static str>
    where
        S: PayloadSource,
        K: Eq + Hash + fmt::Debug,
    {
        EpidemicService::with_config(source, self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use std::time::Duration;

    const BODY: &str = r#"{"data":"{\"areaTree\":[{\"name\":\"China\",\"children\":[{\"name\":\"Hubei\"}]}]}"}"#;

    #[test]
    fn test_builder_defaults() {
        let builder = EpidemicServiceBuilder::default();
        assert_eq!(builder.config(), &ServiceConfig::default());

        let service = builder.build::<_, i64>(StaticPayload::from(BODY));
        assert_eq!(service.limiter().config().permits, 1);
        assert_eq!(service.limiter().config().window_ms, 60_000);
        assert_eq!(service.limiter().idle_expiry_ms(), None);
    }

    #[test]
    fn test_builder_chain() {
        let service = EpidemicServiceBuilder::new()
            .permits(5)
            .window(Duration::from_secs(2))
            .idle_expiry_ms(30_000)
            .cleanup_interval_ms(1_000)
            .build::<_, i64>(StaticPayload::from(BODY));

        assert_eq!(service.limiter().config().permits, 5);
        assert_eq!(service.limiter().config().window_ms, 2_000);
        assert_eq!(service.limiter().idle_expiry_ms(), Some(30_000));
    }

    #[test]
    fn test_builder_window_matches_config() {
        let huge = Duration::from_secs(u64::MAX);
        let builder = EpidemicServiceBuilder::new().permits(4).window(huge);

        assert_eq!(builder.config().limiter, RateLimiterConfig::per_window(4, huge));
        assert_eq!(builder.config().limiter.window_ms, u64::MAX);

        let builder = EpidemicServiceBuilder::new().window(Duration::from_micros(2_500));
        assert_eq!(builder.config().limiter.window_ms, 2);
    }

    #[test]
    fn test_builder_validation() {
        let result = EpidemicServiceBuilder::new()
            .window_ms(0)
            .try_build::<_, i64>(StaticPayload::from(BODY));
        assert!(result.is_err());
    }

    #[test]
    #[should_panic(expected = "Invalid service configuration")]
    fn test_builder_panics_on_invalid_config() {
        let _ = EpidemicServiceBuilder::new()
            .permits(0)
            .build::<_, i64>(StaticPayload::from(BODY));
    }

    #[test]
    fn test_shared_service() {
        let service: SharedService<StaticPayload> =
            Arc::new(EpidemicServiceBuilder::new().build(StaticPayload::from(BODY)));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let service = service.clone();
                thread::spawn(move || service.handle(42, "Hubei").is_report())
            })
            .collect();

        let granted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|granted| *granted)
            .count();
        assert_eq!(granted, 1);
    }

    #[test]
    fn test_prelude_imports() {
        use crate::prelude::*;

        let _pipeline = QueryPipeline::new();
        let _config = RateLimiterConfig::default();
        let _builder = EpidemicServiceBuilder::new();
    }

    #[test]
    fn test_constants() {
        assert!(!VERSION.is_empty());
        assert!(DEFAULT_SOURCE_URL.starts_with("https://"));
    }
}
