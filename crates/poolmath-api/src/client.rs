// Pool Math HTTP client
//
// One client per pool. Each call to `fetch` performs at most one GET against
// the share endpoint; successful results are cached so that a second call
// inside the minimum request interval is served without touching the
// network.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;
use url::Url;

use crate::error::Error;
use crate::parse;
use crate::share::PoolIds;
use crate::snapshot::{FetchOutcome, Snapshot};
use crate::transport::{self, DEFAULT_BASE_URL, TransportConfig};

/// Minimum spacing between two network requests for the same pool.
pub const MIN_REQUEST_INTERVAL: Duration = Duration::from_secs(60);

struct CachedFetch {
    completed_at: Instant,
    snapshot: Arc<Snapshot>,
}

/// Rate-limited client for a single pool's share endpoint.
pub struct PoolMathClient {
    http: reqwest::Client,
    base_url: Url,
    ids: PoolIds,
    min_interval: Duration,
    throttle: Mutex<Option<CachedFetch>>,
}

impl PoolMathClient {
    /// Create a client against the public API from a `TransportConfig`.
    pub fn new(ids: PoolIds, transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        let base_url = Url::parse(DEFAULT_BASE_URL)?;
        Ok(Self::with_client(http, base_url, ids))
    }

    /// Create a client with a pre-built `reqwest::Client` and base URL.
    pub fn with_client(http: reqwest::Client, base_url: Url, ids: PoolIds) -> Self {
        Self {
            http,
            base_url,
            ids,
            min_interval: MIN_REQUEST_INTERVAL,
            throttle: Mutex::new(None),
        }
    }

    /// Override the minimum request interval.
    pub fn with_min_interval(mut self, min_interval: Duration) -> Self {
        self.min_interval = min_interval;
        self
    }

    pub fn ids(&self) -> &PoolIds {
        &self.ids
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// `{base}/share/pool?userId={user}&poolId={pool}`
    pub fn pool_url(&self) -> Result<Url, Error> {
        let mut url = transport::endpoint(&self.base_url, "share/pool")?;
        url.query_pairs_mut()
            .append_pair("userId", self.ids.user_id())
            .append_pair("poolId", self.ids.pool_id());
        Ok(url)
    }

    /// Fetch the latest snapshot, or the cached one if the previous
    /// successful request completed less than the minimum interval ago.
    ///
    /// Concurrent callers serialize on the throttle lock, so at most one
    /// request is in flight per client.
    pub async fn fetch(&self) -> Result<FetchOutcome, Error> {
        let mut throttle = self.throttle.lock().await;

        if let Some(cached) = throttle.as_ref() {
            let age = cached.completed_at.elapsed();
            if age < self.min_interval {
                debug!(
                    pool = %self.ids,
                    age_secs = age.as_secs(),
                    "serving cached snapshot (rate limited)"
                );
                return Ok(FetchOutcome::cached(Arc::clone(&cached.snapshot)));
            }
        }

        let url = self.pool_url()?;
        let body = transport::get_body(&self.http, url).await?;
        let snapshot = Arc::new(parse::parse_snapshot(&body)?);

        *throttle = Some(CachedFetch {
            completed_at: Instant::now(),
            snapshot: Arc::clone(&snapshot),
        });
        Ok(FetchOutcome::fresh(snapshot))
    }

    /// The snapshot from the last successful request, if any.
    pub async fn last_snapshot(&self) -> Option<Arc<Snapshot>> {
        self.throttle
            .lock()
            .await
            .as_ref()
            .map(|c| Arc::clone(&c.snapshot))
    }
}

impl std::fmt::Debug for PoolMathClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PoolMathClient")
            .field("base_url", &self.base_url.as_str())
            .field("ids", &self.ids)
            .field("min_interval", &self.min_interval)
            .finish_non_exhaustive()
    }
}
