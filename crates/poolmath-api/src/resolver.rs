// Share-link resolution
//
// Older Pool Math share links carry a single token. The share JSON endpoint
// maps that token to the owning user and pool, which is all the pool
// endpoint needs.

use tracing::{debug, info};
use url::Url;

use crate::error::Error;
use crate::models::ShareResponse;
use crate::share::{PoolIds, ShareId, ShareLink};
use crate::transport::{self, DEFAULT_BASE_URL, TransportConfig};

/// Resolves share links to canonical pool ids.
#[derive(Debug, Clone)]
pub struct ShareResolver {
    http: reqwest::Client,
    base_url: Url,
}

impl ShareResolver {
    pub fn new(transport: &TransportConfig) -> Result<Self, Error> {
        let http = transport.build_client()?;
        Ok(Self::with_client(http, Url::parse(DEFAULT_BASE_URL)?))
    }

    pub fn with_client(http: reqwest::Client, base_url: Url) -> Self {
        Self { http, base_url }
    }

    /// Resolve a link to pool ids. Links that already carry ids resolve
    /// without I/O.
    pub async fn resolve(&self, link: &ShareLink) -> Result<PoolIds, Error> {
        match link {
            ShareLink::Pool(ids) => Ok(ids.clone()),
            ShareLink::Token(share_id) => self.lookup(share_id).await,
        }
    }

    /// `GET {base}/share/{share_id}.json` and read `pools[0].pool.userId` / `.id`.
    pub async fn lookup(&self, share_id: &ShareId) -> Result<PoolIds, Error> {
        let url = transport::endpoint(&self.base_url, &format!("share/{share_id}.json"))?;
        let body = transport::get_body(&self.http, url).await?;

        let response: ShareResponse = serde_json::from_str(&body)
            .map_err(|e| Error::malformed(format!("share lookup: {e}")))?;
        let not_found = || Error::ShareNotFound {
            share_id: share_id.to_string(),
        };
        let pool = response.first_pool().ok_or_else(not_found)?;
        let (Some(user_id), Some(pool_id)) = (pool.user_id.as_deref(), pool.id.as_deref()) else {
            debug!(%share_id, "share lookup returned a pool without ids");
            return Err(not_found());
        };

        let ids = PoolIds::new(user_id, pool_id)?;
        info!(%share_id, pool = %ids, "resolved share link");
        Ok(ids)
    }
}
