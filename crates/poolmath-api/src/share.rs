// ── Share links and pool identifiers ──
//
// Pool Math exposes a pool publicly through a share link. Modern links carry
// the user and pool ids; older ones carry a single share token that must be
// looked up (see `ShareResolver`). Parsing happens at configuration time so a
// bad link is rejected before any fetch is scheduled.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::Error;

const API_HOST: &str = "api.poolmathapp.com";
const TFP_HOST: &str = "troublefreepool.com";

fn is_valid_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
}

fn identifier(field: &'static str, value: &str) -> Result<String, Error> {
    let trimmed = value.trim();
    if is_valid_identifier(trimmed) {
        Ok(trimmed.to_owned())
    } else {
        Err(Error::InvalidIdentifier {
            field,
            value: value.to_owned(),
        })
    }
}

// ── PoolIds ─────────────────────────────────────────────────────────

/// The canonical identity of one pool: owning user plus pool id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PoolIds {
    user_id: String,
    pool_id: String,
}

impl PoolIds {
    /// Validate and build an id pair.
    pub fn new(user_id: &str, pool_id: &str) -> Result<Self, Error> {
        Ok(Self {
            user_id: identifier("user_id", user_id)?,
            pool_id: identifier("pool_id", pool_id)?,
        })
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn pool_id(&self) -> &str {
        &self.pool_id
    }

    /// Stable key used for entity unique ids and restore files.
    pub fn key(&self) -> String {
        format!("{}_{}", self.user_id, self.pool_id)
    }

    /// Human-facing page for this pool on troublefreepool.com.
    pub fn configuration_url(&self) -> String {
        format!("https://{TFP_HOST}/mypool/{}/{}", self.user_id, self.pool_id)
    }
}

impl fmt::Display for PoolIds {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.user_id, self.pool_id)
    }
}

// ── ShareId ─────────────────────────────────────────────────────────

/// Legacy single-token share identifier (e.g. `6WPG8yL`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ShareId(String);

impl ShareId {
    pub fn new(raw: &str) -> Result<Self, Error> {
        let token = raw.trim();
        let token = token.strip_prefix("share_id=").unwrap_or(token);
        let token = token.strip_suffix(".json").unwrap_or(token);
        identifier("share_id", token).map(Self)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ShareId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for ShareId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ShareId {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(&value)
    }
}

impl From<ShareId> for String {
    fn from(id: ShareId) -> Self {
        id.0
    }
}

// ── ShareLink ───────────────────────────────────────────────────────

/// A parsed Pool Math share link.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ShareLink {
    /// Single share token; needs a lookup to find the pool.
    Token(ShareId),
    /// Link that already names the user and pool.
    Pool(PoolIds),
}

impl ShareLink {
    /// Parse a share URL, an API pool URL, or a bare (legacy) share token.
    ///
    /// Accepted forms:
    /// - `https://api.poolmathapp.com/share/{token}` (optionally `.json`)
    /// - `https://api.poolmathapp.com/share/pool?userId={u}&poolId={p}`
    /// - `https://[www.]troublefreepool.com/mypool/{token}`
    /// - `https://[www.]troublefreepool.com/mypool/{user}/{pool}`
    /// - `6WPG8yL` or `share_id=6WPG8yL`
    pub fn parse(input: &str) -> Result<Self, Error> {
        let input = input.trim();
        if !input.contains("://") {
            return ShareId::new(input)
                .map(Self::Token)
                .map_err(|_| invalid(input, "expected a share URL or share token"));
        }

        let url = Url::parse(input).map_err(|e| invalid(input, &e.to_string()))?;
        if !matches!(url.scheme(), "https" | "http") {
            return Err(invalid(input, "unsupported URL scheme"));
        }

        let host = url.host_str().unwrap_or_default();
        let host = host.strip_prefix("www.").unwrap_or(host);
        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|seg| !seg.is_empty()).collect())
            .unwrap_or_default();

        match (host, segments.as_slice()) {
            (API_HOST, ["share", "pool"]) => {
                let mut user = None;
                let mut pool = None;
                for (key, value) in url.query_pairs() {
                    match key.as_ref() {
                        "userId" => user = Some(value.into_owned()),
                        "poolId" => pool = Some(value.into_owned()),
                        _ => {}
                    }
                }
                match (user, pool) {
                    (Some(user), Some(pool)) => PoolIds::new(&user, &pool)
                        .map(Self::Pool)
                        .map_err(|e| invalid(input, &e.to_string())),
                    _ => Err(invalid(input, "missing userId or poolId query parameter")),
                }
            }
            (API_HOST, ["share", token]) | (TFP_HOST, ["mypool", token]) => ShareId::new(token)
                .map(Self::Token)
                .map_err(|e| invalid(input, &e.to_string())),
            (TFP_HOST, ["mypool", user, pool]) => PoolIds::new(user, pool)
                .map(Self::Pool)
                .map_err(|e| invalid(input, &e.to_string())),
            (API_HOST | TFP_HOST, _) => Err(invalid(input, "missing identifier segment")),
            _ => Err(invalid(input, "not a Pool Math share link")),
        }
    }

    /// The share token, if this link still needs a lookup.
    pub fn share_id(&self) -> Option<&ShareId> {
        match self {
            Self::Token(id) => Some(id),
            Self::Pool(_) => None,
        }
    }

    /// The pool ids, if the link carries them directly.
    pub fn pool_ids(&self) -> Option<&PoolIds> {
        match self {
            Self::Pool(ids) => Some(ids),
            Self::Token(_) => None,
        }
    }
}

fn invalid(url: &str, reason: &str) -> Error {
    Error::InvalidShareUrl {
        url: url.to_owned(),
        reason: reason.to_owned(),
    }
}

/// Canonical URL form; parsing it yields an equal link.
impl fmt::Display for ShareLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token(id) => write!(f, "https://{API_HOST}/share/{id}"),
            Self::Pool(ids) => f.write_str(&ids.configuration_url()),
        }
    }
}

impl FromStr for ShareLink {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
