// ── Diagnostics ──
//
// Point-in-time health report for one coordinator, safe to paste into a
// bug report: identifying keys are redacted wherever they appear.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::coordinator::{Coordinator, CoordinatorState, FailureRecord, SnapshotSource};
use crate::entity::EntityView;

/// Replacement for redacted values.
pub const REDACTED: &str = "**REDACTED**";

/// Keys whose values never leave the process unredacted.
pub const REDACT_KEYS: &[&str] = &[
    "user_id",
    "pool_id",
    "userId",
    "id",
    "email",
    "name",
    "configuration_url",
];

/// Full diagnostics report.
#[derive(Debug, Clone, Serialize)]
pub struct Diagnostics {
    pub entry: EntryDiagnostics,
    pub coordinator: CoordinatorDiagnostics,
}

/// How the pool is configured.
#[derive(Debug, Clone, Serialize)]
pub struct EntryDiagnostics {
    pub title: String,
    pub identity: Value,
    pub temperature_unit: String,
    pub target: String,
    pub timeout_secs: u64,
}

/// How polling is going.
#[derive(Debug, Clone, Serialize)]
pub struct CoordinatorDiagnostics {
    pub state: CoordinatorState,
    pub last_update_success: bool,
    pub last_success: Option<DateTime<Utc>>,
    pub last_exception: Option<Arc<FailureRecord>>,
    pub update_interval_secs: u64,
    pub entity_count: usize,
    pub entities: Vec<Arc<EntityView>>,
    /// Last raw payload, redacted.
    pub data: Option<Value>,
}

pub(crate) fn collect<S: SnapshotSource>(coordinator: &Coordinator<S>) -> Diagnostics {
    let source = coordinator.source();
    let registry = coordinator.registry();
    let identity = serde_json::to_value(&source.identity).unwrap_or(Value::Null);
    let secrets: Vec<&str> = source
        .require_ids()
        .map(|ids| vec![ids.user_id(), ids.pool_id()])
        .unwrap_or_default();

    Diagnostics {
        entry: EntryDiagnostics {
            title: REDACTED.to_owned(),
            identity: redact(&identity),
            temperature_unit: source.temperature_unit.to_string(),
            target: source.target.to_string(),
            timeout_secs: source.timeout.as_secs(),
        },
        coordinator: CoordinatorDiagnostics {
            state: coordinator.current_state(),
            last_update_success: coordinator.is_available(),
            last_success: coordinator.last_success(),
            last_exception: coordinator
                .last_failure()
                .map(|failure| Arc::new(redact_failure(&failure, &secrets))),
            update_interval_secs: coordinator.poll_interval().as_secs(),
            entity_count: registry.len(),
            entities: registry
                .views()
                .iter()
                .map(|v| Arc::new(redact_view(v)))
                .collect(),
            data: coordinator.last_snapshot().map(|s| redact(&s.raw)),
        },
    }
}

fn redact_view(view: &EntityView) -> EntityView {
    EntityView {
        unique_id: REDACTED.to_owned(),
        name: REDACTED.to_owned(),
        ..view.clone()
    }
}

/// Error messages quote request URLs, which carry the pool's ids.
fn redact_failure(failure: &FailureRecord, secrets: &[&str]) -> FailureRecord {
    FailureRecord {
        message: redact_text(&failure.message, secrets),
        ..failure.clone()
    }
}

fn redact_text(text: &str, secrets: &[&str]) -> String {
    secrets
        .iter()
        .filter(|s| !s.is_empty())
        .fold(text.to_owned(), |text, secret| text.replace(secret, REDACTED))
}

/// Copy `value` with every [`REDACT_KEYS`] entry replaced, at any depth.
pub fn redact(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| {
                    let v = if REDACT_KEYS.contains(&k.as_str()) {
                        Value::String(REDACTED.to_owned())
                    } else {
                        redact(v)
                    };
                    (k.clone(), v)
                })
                .collect(),
        ),
        Value::Array(items) => Value::Array(items.iter().map(redact).collect()),
        other => other.clone(),
    }
}
