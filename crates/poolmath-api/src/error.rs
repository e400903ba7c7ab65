use std::fmt;

use serde::Serialize;
use thiserror::Error;

/// Top-level error type for the `poolmath-api` crate.
///
/// Splits into two families: configuration errors (a share link or
/// identifier that can never work, reported at setup) and fetch errors
/// (transient, retried on the next poll). `poolmath-core` maps these into
/// coordinator diagnostics.
#[derive(Debug, Error)]
pub enum Error {
    // ── Configuration ───────────────────────────────────────────────
    /// Share URL could not be parsed or is missing identifier segments.
    #[error("Invalid share URL '{url}': {reason}")]
    InvalidShareUrl { url: String, reason: String },

    /// A user, pool or share identifier failed validation.
    #[error("Invalid {field}: '{value}'")]
    InvalidIdentifier { field: &'static str, value: String },

    /// URL construction error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// The HTTP client could not be constructed.
    #[error("Failed to build HTTP client: {0}")]
    Client(String),

    // ── Transport ───────────────────────────────────────────────────
    /// Connection refused, DNS failure, timeout, or a broken response stream.
    #[error("Pool Math unreachable at {url}: {reason}")]
    Unreachable { url: String, reason: String },

    /// Non-success HTTP status.
    #[error("Pool Math returned HTTP {status} for {url}")]
    Http { status: u16, url: String },

    // ── Data ────────────────────────────────────────────────────────
    /// Body was not JSON, or did not have the expected pool structure.
    #[error("Malformed Pool Math response: {message}")]
    Malformed { message: String },

    /// The pool exists but nothing has been logged yet.
    #[error("No chemistry has been logged for this pool yet")]
    NoData,

    /// Share lookup returned a pool without a user or pool id.
    #[error("Share '{share_id}' did not resolve to a user and pool id")]
    ShareNotFound { share_id: String },
}

/// Classification of a failed fetch.
///
/// Rendered in the snake_case form used by diagnostics
/// (`network_unreachable`, `http_error(503)`, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchErrorKind {
    NetworkUnreachable,
    HttpError(u16),
    MalformedResponse,
    NoData,
}

impl fmt::Display for FetchErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NetworkUnreachable => f.write_str("network_unreachable"),
            Self::HttpError(status) => write!(f, "http_error({status})"),
            Self::MalformedResponse => f.write_str("malformed_response"),
            Self::NoData => f.write_str("no_data"),
        }
    }
}

impl Serialize for FetchErrorKind {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl Error {
    /// Map a `reqwest` transport failure for `url` into [`Error::Unreachable`].
    pub(crate) fn unreachable(url: &url::Url, err: &reqwest::Error) -> Self {
        let reason = if err.is_timeout() {
            "request timed out".to_owned()
        } else if err.is_connect() {
            format!("connection failed: {err}")
        } else {
            err.to_string()
        };
        Self::Unreachable {
            url: url.to_string(),
            reason,
        }
    }

    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        Self::Malformed {
            message: message.into(),
        }
    }

    /// The fetch failure kind, or `None` for configuration errors.
    pub fn fetch_kind(&self) -> Option<FetchErrorKind> {
        match self {
            Self::Unreachable { .. } => Some(FetchErrorKind::NetworkUnreachable),
            Self::Http { status, .. } => Some(FetchErrorKind::HttpError(*status)),
            Self::Malformed { .. } | Self::ShareNotFound { .. } => {
                Some(FetchErrorKind::MalformedResponse)
            }
            Self::NoData => Some(FetchErrorKind::NoData),
            Self::InvalidShareUrl { .. }
            | Self::InvalidIdentifier { .. }
            | Self::InvalidUrl(_)
            | Self::Client(_) => None,
        }
    }

    /// Returns `true` if retrying later can never help.
    pub fn is_configuration(&self) -> bool {
        self.fetch_kind().is_none()
    }

    /// Returns `true` if the next poll might succeed.
    pub fn is_transient(&self) -> bool {
        !self.is_configuration()
    }
}
