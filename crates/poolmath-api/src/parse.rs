// ── Payload extraction ──
//
// Turns a raw response body into a `Snapshot`. The latest log entry wins;
// pools that only publish an `overview` are read from there instead, with a
// timestamp per code. A snapshot is all-or-nothing: a single unusable value
// for a known code rejects the whole payload.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::Deserialize;
use serde_json::{Map, Value};

use crate::codes::MeasurementCode;
use crate::error::Error;
use crate::models::{PoolPayload, ShareResponse};
use crate::snapshot::{MeasurementReading, MeasurementValue, PoolInfo, Snapshot, TargetOverride};

/// Epoch values above this are taken to be milliseconds.
const EPOCH_MILLIS_THRESHOLD: f64 = 1e11;

/// Parse a pool response body into a snapshot.
pub fn parse_snapshot(body: &str) -> Result<Snapshot, Error> {
    let raw: Value =
        serde_json::from_str(body).map_err(|e| Error::malformed(format!("invalid JSON: {e}")))?;
    let response = ShareResponse::deserialize(&raw)
        .map_err(|e| Error::malformed(format!("unexpected structure: {e}")))?;
    let pool = response
        .first_pool()
        .ok_or_else(|| Error::malformed("missing pools[0].pool"))?;

    let (timestamp, mut readings) = if let Some(logs) = &pool.logs {
        let entry = latest_entry(logs)?;
        let ts = entry_timestamp(entry)?;
        (ts, readings_from_entry(entry, ts)?)
    } else if let Some(overview) = &pool.overview {
        readings_from_overview(overview)?
    } else {
        return Err(Error::malformed("pool has neither logs nor overview"));
    };

    readings.retain(|code, _| is_tracked(pool, *code));
    if readings.is_empty() {
        return Err(Error::NoData);
    }

    Ok(Snapshot {
        pool: PoolInfo {
            pool_id: pool.id.clone(),
            user_id: pool.user_id.clone(),
            name: pool.name.clone(),
        },
        timestamp,
        readings,
        targets: target_overrides(pool),
        raw,
    })
}

/// Parse an RFC 3339 string or a Unix epoch (number or numeric string).
pub fn parse_timestamp(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => n.as_f64().and_then(from_epoch),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
                return Some(Utc.from_utc_datetime(&naive));
            }
            s.parse::<f64>().ok().and_then(from_epoch)
        }
        _ => None,
    }
}

#[allow(clippy::cast_possible_truncation, clippy::as_conversions)]
fn from_epoch(secs: f64) -> Option<DateTime<Utc>> {
    if !secs.is_finite() || secs < 0.0 {
        return None;
    }
    let millis = if secs > EPOCH_MILLIS_THRESHOLD {
        secs
    } else {
        secs * 1000.0
    };
    DateTime::from_timestamp_millis(millis.round() as i64)
}

// ── Log entries ─────────────────────────────────────────────────────

/// Greatest `ts` wins; on a tie the earlier entry (more recent by API order) is kept.
fn latest_entry(logs: &[Map<String, Value>]) -> Result<&Map<String, Value>, Error> {
    let mut latest: Option<(&Map<String, Value>, DateTime<Utc>)> = None;
    for entry in logs {
        let ts = entry_timestamp(entry)?;
        match latest {
            Some((_, best)) if ts <= best => {}
            _ => latest = Some((entry, ts)),
        }
    }
    latest.map(|(entry, _)| entry).ok_or(Error::NoData)
}

fn entry_timestamp(entry: &Map<String, Value>) -> Result<DateTime<Utc>, Error> {
    let raw = entry
        .get("ts")
        .ok_or_else(|| Error::malformed("log entry without ts"))?;
    parse_timestamp(raw).ok_or_else(|| Error::malformed(format!("unparseable log timestamp {raw}")))
}

fn readings_from_entry(
    entry: &Map<String, Value>,
    ts: DateTime<Utc>,
) -> Result<BTreeMap<MeasurementCode, MeasurementReading>, Error> {
    let mut readings = BTreeMap::new();
    for code in MeasurementCode::observed() {
        let Some((_, raw)) = lookup(entry, code) else {
            continue;
        };
        if let Some(value) = convert_value(code, raw)? {
            readings.insert(
                code,
                MeasurementReading {
                    code,
                    value,
                    timestamp: ts,
                },
            );
        }
    }
    Ok(readings)
}

// ── Overview ────────────────────────────────────────────────────────

fn readings_from_overview(
    overview: &Map<String, Value>,
) -> Result<(DateTime<Utc>, BTreeMap<MeasurementCode, MeasurementReading>), Error> {
    let fallback = overview.get("ts").and_then(parse_timestamp);
    let mut readings = BTreeMap::new();
    let mut newest: Option<DateTime<Utc>> = None;

    for code in MeasurementCode::observed() {
        let Some((name, raw)) = lookup(overview, code) else {
            continue;
        };
        let Some(value) = convert_value(code, raw)? else {
            continue;
        };
        let timestamp = overview
            .get(&format!("{name}Ts"))
            .and_then(parse_timestamp)
            .or(fallback)
            .ok_or_else(|| Error::malformed(format!("overview value {name} has no timestamp")))?;
        newest = Some(newest.map_or(timestamp, |n| n.max(timestamp)));
        readings.insert(
            code,
            MeasurementReading {
                code,
                value,
                timestamp,
            },
        );
    }

    match newest {
        Some(ts) => Ok((ts, readings)),
        None => Err(Error::NoData),
    }
}

// ── Values ──────────────────────────────────────────────────────────

/// First wire name of `code` present in `map`, with its value.
fn lookup<'a>(map: &'a Map<String, Value>, code: MeasurementCode) -> Option<(&'static str, &'a Value)> {
    code.wire_names()
        .iter()
        .find_map(|name| map.get(*name).map(|v| (*name, v)))
}

/// `Ok(None)` means the value is absent.
fn convert_value(code: MeasurementCode, raw: &Value) -> Result<Option<MeasurementValue>, Error> {
    match raw {
        Value::Null => Ok(None),
        Value::Number(n) => n
            .as_f64()
            .map(|n| Some(MeasurementValue::Number(n)))
            .ok_or_else(|| Error::malformed(format!("{code} is not representable as f64"))),
        Value::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            match trimmed.parse::<f64>() {
                Ok(n) if n.is_finite() => Ok(Some(MeasurementValue::Number(n))),
                _ => Ok(Some(MeasurementValue::Text(s.clone()))),
            }
        }
        Value::Bool(_) | Value::Array(_) | Value::Object(_) => Err(Error::malformed(format!(
            "{code} has unsupported value {raw}"
        ))),
    }
}

fn number(raw: &Value) -> Option<f64> {
    match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

// ── Pool-level fields ───────────────────────────────────────────────

fn is_tracked(pool: &PoolPayload, code: MeasurementCode) -> bool {
    code.tracking_flag()
        .is_none_or(|flag| pool.flag(flag) != Some(false))
}

fn target_overrides(pool: &PoolPayload) -> BTreeMap<MeasurementCode, TargetOverride> {
    MeasurementCode::observed()
        .filter_map(|code| {
            let field = |suffix: &str| {
                pool.extra
                    .get(&format!("{}{suffix}", code.as_str()))
                    .and_then(number)
            };
            let target = TargetOverride {
                target: field("Target"),
                min: field("Min"),
                max: field("Max"),
            };
            (!target.is_empty()).then_some((code, target))
        })
        .collect()
}
