// Shared transport configuration for building reqwest::Client instances.
//
// The pool client and the share resolver share timeout and user agent
// settings through this module, along with the single GET helper that
// classifies transport failures.

use std::time::Duration;

use tracing::debug;
use url::Url;

use crate::error::Error;

/// Public Pool Math API root.
pub const DEFAULT_BASE_URL: &str = "https://api.poolmathapp.com";

/// Default request timeout, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

/// Shared transport configuration for building HTTP clients.
#[derive(Debug, Clone)]
pub struct TransportConfig {
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: concat!("poolmath/", env!("CARGO_PKG_VERSION")).to_owned(),
        }
    }
}

impl TransportConfig {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Build a `reqwest::Client` from this config.
    pub fn build_client(&self) -> Result<reqwest::Client, Error> {
        reqwest::Client::builder()
            .timeout(self.timeout)
            .user_agent(&self.user_agent)
            .build()
            .map_err(|e| Error::Client(e.to_string()))
    }
}

/// Join `path` onto `base`, keeping any path prefix the base already has.
pub(crate) fn endpoint(base: &Url, path: &str) -> Result<Url, Error> {
    let base = base.as_str().trim_end_matches('/');
    Ok(Url::parse(&format!("{base}/{path}"))?)
}

/// Send a GET request and return the body of a 2xx response.
pub(crate) async fn get_body(http: &reqwest::Client, url: Url) -> Result<String, Error> {
    debug!("GET {}", url);

    let resp = http
        .get(url.clone())
        .send()
        .await
        .map_err(|e| Error::unreachable(&url, &e))?;

    let status = resp.status();
    debug!("GET {} returned {}", url, status);

    if !status.is_success() {
        return Err(Error::Http {
            status: status.as_u16(),
            url: url.to_string(),
        });
    }

    resp.text().await.map_err(|e| Error::unreachable(&url, &e))
}
