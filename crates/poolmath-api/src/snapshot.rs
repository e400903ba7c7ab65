// ── Parsed fetch results ──
//
// A `Snapshot` is what one successful fetch produces: the latest log entry,
// split into per-code readings, plus whatever target overrides the pool
// publishes. Snapshots are immutable and shared via `Arc`.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::codes::MeasurementCode;

/// A measurement value as reported by Pool Math.
///
/// Numeric strings are normalized to `Number` during parsing; anything else
/// that is a string stays `Text`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MeasurementValue {
    Number(f64),
    Text(String),
}

impl MeasurementValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(_) => None,
        }
    }
}

impl fmt::Display for MeasurementValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => f.write_str(s),
        }
    }
}

impl From<f64> for MeasurementValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

/// One code's value together with the time it was logged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementReading {
    pub code: MeasurementCode,
    pub value: MeasurementValue,
    pub timestamp: DateTime<Utc>,
}

/// Target range published on the pool for a single code.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetOverride {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub target: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
}

impl TargetOverride {
    pub fn is_empty(&self) -> bool {
        self.target.is_none() && self.min.is_none() && self.max.is_none()
    }
}

/// Identity fields the payload reports about its pool.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolInfo {
    pub pool_id: Option<String>,
    pub user_id: Option<String>,
    pub name: Option<String>,
}

/// The parsed content of one successful fetch.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    pub pool: PoolInfo,
    /// Timestamp of the log entry the readings were taken from.
    pub timestamp: DateTime<Utc>,
    pub readings: BTreeMap<MeasurementCode, MeasurementReading>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub targets: BTreeMap<MeasurementCode, TargetOverride>,
    /// Raw response body, kept for diagnostics.
    #[serde(skip)]
    pub raw: serde_json::Value,
}

impl Snapshot {
    pub fn reading(&self, code: MeasurementCode) -> Option<&MeasurementReading> {
        self.readings.get(&code)
    }

    pub fn value(&self, code: MeasurementCode) -> Option<&MeasurementValue> {
        self.readings.get(&code).map(|r| &r.value)
    }

    /// Numeric value of `code`, if present and numeric.
    pub fn number(&self, code: MeasurementCode) -> Option<f64> {
        self.value(code).and_then(MeasurementValue::as_number)
    }

    pub fn target(&self, code: MeasurementCode) -> Option<&TargetOverride> {
        self.targets.get(&code)
    }

    pub fn codes(&self) -> impl Iterator<Item = MeasurementCode> + '_ {
        self.readings.keys().copied()
    }
}

/// Whether a fetch went to the network or was served from the throttle cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FetchSource {
    Fresh,
    Cached,
}

/// A successful fetch result.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub snapshot: Arc<Snapshot>,
    pub source: FetchSource,
}

impl FetchOutcome {
    pub fn fresh(snapshot: Arc<Snapshot>) -> Self {
        Self {
            snapshot,
            source: FetchSource::Fresh,
        }
    }

    pub fn cached(snapshot: Arc<Snapshot>) -> Self {
        Self {
            snapshot,
            source: FetchSource::Cached,
        }
    }

    pub fn is_cached(&self) -> bool {
        self.source == FetchSource::Cached
    }
}
