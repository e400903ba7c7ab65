// Pool Math wire types
//
// Both the pool endpoint and the share lookup return the same envelope:
// `{ "pools": [ { "pool": { ... } } ] }`. Only the first pool is used. The
// pool object is loosely structured; measurement keys, tracking flags and
// target fields all live side by side, so everything not modelled explicitly
// lands in `extra`.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

// ── Envelope ─────────────────────────────────────────────────────────

/// Top-level response from `share/pool` and `share/{id}.json`.
#[derive(Debug, Deserialize)]
pub struct ShareResponse {
    #[serde(default)]
    pub pools: Vec<PoolEnvelope>,
}

impl ShareResponse {
    /// The first pool object, if any.
    pub fn first_pool(&self) -> Option<&PoolPayload> {
        self.pools.first().and_then(|p| p.pool.as_ref())
    }
}

#[derive(Debug, Deserialize)]
pub struct PoolEnvelope {
    #[serde(default)]
    pub pool: Option<PoolPayload>,
}

// ── Pool ─────────────────────────────────────────────────────────────

/// The pool object inside the envelope.
///
/// Ids have been observed both as strings and as numbers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolPayload {
    #[serde(default, deserialize_with = "string_or_number")]
    pub id: Option<String>,
    #[serde(default, rename = "userId", deserialize_with = "string_or_number")]
    pub user_id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    /// Log entries, most recent first.
    #[serde(default)]
    pub logs: Option<Vec<Map<String, Value>>>,
    /// Latest value per code with `{code}Ts` timestamps.
    #[serde(default)]
    pub overview: Option<Map<String, Value>>,
    /// Tracking flags, target fields and everything else.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PoolPayload {
    /// `Some(false)` only when the pool explicitly disables `flag`.
    pub fn flag(&self, flag: &str) -> Option<bool> {
        self.extra.get(flag).and_then(Value::as_bool)
    }
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        _ => Ok(None),
    }
}
