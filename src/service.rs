//! # Request handling
//!
//! Ties the pieces together for one user request:
//!
//! ```text
//!     handle(requester, city)
//!        │
//!        ├─ city blank? ─────────────────────────────► Reply::MissingCity
//!        │
//!        ├─ source.fetch() ─► pipeline.query() ─ err ─► Reply::Failed
//!        │
//!        ├─ area missing? ───────────────────────────► Reply::NotFound
//!        │
//!        └─ limiter.try_acquire(requester)
//!                 ├─ granted ────────────────────────► Reply::Report
//!                 └─ denied ─────────────────────────► Reply::Throttled
//! ```
//!
//! Only a request that would produce a report spends a permit. Errors and
//! unknown cities are answered for free.

use crate::error::{FetchError, QueryError};
use crate::pipeline::{QueryPipeline, QueryResult};
use crate::rate_limiter::{RateLimiterConfig, RateLimiterManager, DEFAULT_CLEANUP_INTERVAL_MS};
use crate::report::Report;
use std::fmt;
use std::hash::Hash;
use std::io;
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Supplies the raw statistics payload.
///
/// The crate ships no HTTP client; plug one in by implementing this trait or
/// by passing a closure.
///
/// ```rust
/// use epistat::{FetchError, PayloadSource};
///
/// let source = || -> Result<Vec<u8>, FetchError> { Err(FetchError::new("offline")) };
/// assert!(source.fetch().is_err());
/// ```
pub trait PayloadSource: Send + Sync {
    /// Returns the raw response body.
    fn fetch(&self) -> Result<Vec<u8>, FetchError>;
}

impl<F> PayloadSource for F
where
    F: Fn() -> Result<Vec<u8>, FetchError> + Send + Sync,
{
    fn fetch(&self) -> Result<Vec<u8>, FetchError> {
        self()
    }
}

/// A source that always returns the same bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaticPayload {
    body: Vec<u8>,
}

impl StaticPayload {
    /// Wraps a fixed response body.
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        Self { body: body.into() }
    }
}

impl PayloadSource for StaticPayload {
    fn fetch(&self) -> Result<Vec<u8>, FetchError> {
        Ok(self.body.clone())
    }
}

impl From<Vec<u8>> for StaticPayload {
    fn from(body: Vec<u8>) -> Self {
        Self::new(body)
    }
}

impl From<&str> for StaticPayload {
    fn from(body: &str) -> Self {
        Self::new(body)
    }
}

impl From<String> for StaticPayload {
    fn from(body: String) -> Self {
        Self::new(body)
    }
}

/// Service-level settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceConfig {
    /// Permits and window applied to every requester.
    pub limiter: RateLimiterConfig,

    /// Forget requesters idle this long; `None` keeps them forever.
    pub idle_expiry_ms: Option<u64>,

    /// How often the cleanup thread runs when idle expiry is enabled.
    pub cleanup_interval_ms: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            limiter: RateLimiterConfig::default(),
            idle_expiry_ms: None,
            cleanup_interval_ms: DEFAULT_CLEANUP_INTERVAL_MS,
        }
    }
}

impl ServiceConfig {
    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), &'static str> {
        self.limiter.validate()?;

        if self.cleanup_interval_ms == 0 {
            return Err("cleanup_interval_ms must be greater than 0");
        }

        if self.idle_expiry_ms == Some(0) {
            return Err("idle_expiry_ms must be greater than 0");
        }

        Ok(())
    }

    fn build_limiter<K>(&self) -> RateLimiterManager<K>
    where
        K: Eq + Hash + fmt::Debug,
    {
        match self.idle_expiry_ms {
            Some(expiry) => RateLimiterManager::with_idle_expiry(
                self.limiter.clone(),
                self.cleanup_interval_ms,
                expiry,
            ),
            None => RateLimiterManager::new(self.limiter.clone()),
        }
    }
}

/// What to tell the requester.
#[derive(Debug)]
pub enum Reply {
    /// The city argument was empty.
    MissingCity,

    /// Fetching or parsing the payload failed.
    Failed(QueryError),

    /// The payload has no area with that name.
    NotFound {
        /// The name as queried.
        city: String,
    },

    /// The requester used up its permits for the current window.
    Throttled {
        /// Human-readable window length, e.g. "1 minute".
        cooldown: String,
        /// Time until the requester's next window opens.
        retry_after: Duration,
    },

    /// The statistics for the requested area.
    Report(Report),
}

impl Reply {
    /// `true` for [`Reply::Report`].
    pub fn is_report(&self) -> bool {
        matches!(self, Reply::Report(_))
    }

    /// The report, if this reply carries one.
    pub fn report(&self) -> Option<&Report> {
        match self {
            Reply::Report(report) => Some(report),
            _ => None,
        }
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::MissingCity => write!(f, "You haven't entered a city name yet!"),
            Reply::Failed(err) => write!(f, "ERROR: {}", err),
            Reply::NotFound { city } => write!(f, "No epidemic data found for [{}].", city),
            Reply::Throttled { cooldown, .. } => write!(
                f,
                "You're doing that too often! (cooldown is {})",
                cooldown
            ),
            Reply::Report(report) => write!(f, "{}", report),
        }
    }
}

/// Answers city queries, one permit per report per requester and window.
///
/// ## Example
///
/// ```rust
/// use epistat::{EpidemicService, RateLimiterConfig, RateLimiterManager, Reply, StaticPayload};
///
/// let body = r#"{"data":"{\"areaTree\":[{\"name\":\"China\",\"children\":[{\"name\":\"Hubei\"}]}]}"}"#;
/// let service = EpidemicService::new(
///     StaticPayload::from(body),
///     RateLimiterManager::new(RateLimiterConfig::default()),
/// );
///
/// assert!(service.handle(10001, "Hubei").is_report());
/// assert!(matches!(service.handle(10001, "Hubei"), Reply::Throttled { .. }));
/// assert!(matches!(service.handle(10001, "Atlantis"), Reply::NotFound { .. }));
/// ```
pub struct EpidemicService<S, K = i64>
where
    K: Eq + Hash,
{
    source: S,
    pipeline: QueryPipeline,
    limiter: RateLimiterManager<K>,
}

impl<S, K> EpidemicService<S, K>
where
    S: PayloadSource,
    K: Eq + Hash + fmt::Debug,
{
    /// Creates a service around an existing limiter store.
    pub fn new(source: S, limiter: RateLimiterManager<K>) -> Self {
        Self {
            source,
            pipeline: QueryPipeline::new(),
            limiter,
        }
    }

    /// Creates a service from a [`ServiceConfig`].
    pub fn with_config(source: S, config: ServiceConfig) -> Result<Self, &'static str> {
        config.validate()?;
        Ok(Self::new(source, config.build_limiter()))
    }

    /// Fetches the payload and looks up `city`, without touching the limiter.
    pub fn query(&self, city: &str) -> Result<QueryResult, QueryError> {
        let raw = self.source.fetch()?;
        Ok(self.pipeline.query(&raw, city)?)
    }

    /// Handles one request from `requester` for `city`.
    pub fn handle(&self, requester: K, city: &str) -> Reply {
        let city = city.trim();
        if city.is_empty() {
            return Reply::MissingCity;
        }

        let result = match self.query(city) {
            Ok(result) => result,
            Err(err) => {
                warn!("Query for {:?} by {:?} failed: {}", city, requester, err);
                return Reply::Failed(err);
            }
        };

        let area = match result.area {
            Some(area) => area,
            None => {
                debug!("No data for {:?} (requested by {:?})", city, requester);
                return Reply::NotFound {
                    city: city.to_string(),
                };
            }
        };

        let limiter = self.limiter.get_limiter(requester);
        if !limiter.try_acquire() {
            debug!("Throttled report for {:?}", city);
            return Reply::Throttled {
                cooldown: self.limiter.config().cooldown_description(),
                retry_after: limiter.time_until_reset(),
            };
        }

        debug!("Serving report for {:?}", area.name);
        Reply::Report(Report::new(&area, &result.last_update_time))
    }

    /// The limiter store.
    pub fn limiter(&self) -> &RateLimiterManager<K> {
        &self.limiter
    }

    /// The payload source.
    pub fn source(&self) -> &S {
        &self.source
    }
}

impl<S, K> EpidemicService<S, K>
where
    S: PayloadSource,
    K: Eq + Hash + fmt::Debug + Send + Sync + 'static,
{
    /// Starts the limiter cleanup thread. See
    /// [`RateLimiterManager::start_stoppable_cleanup_thread`].
    pub fn start_cleanup_thread(&self) -> io::Result<(thread::JoinHandle<()>, mpsc::Sender<()>)> {
        if self.limiter.idle_expiry_ms().is_none() {
            info!("Starting cleanup thread for a limiter store without idle expiry");
        }
        Arc::new(self.limiter.clone()).start_stoppable_cleanup_thread()
    }
}

impl<S, K> fmt::Debug for EpidemicService<S, K>
where
    K: Eq + Hash,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EpidemicService")
            .field("pipeline", &self.pipeline)
            .field("limiter", &self.limiter)
            .finish_non_exhaustive()
    }
}
