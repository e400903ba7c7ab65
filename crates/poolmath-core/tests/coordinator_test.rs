#![allow(clippy::unwrap_used)]
// End-to-end tests: coordinator + real client against a wiremock server.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use pretty_assertions::assert_eq;
use serde_json::json;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use poolmath_api::{FetchErrorKind, FetchSource, MeasurementCode, MeasurementValue, PoolIds, PoolMathClient};
use poolmath_core::{
    Coordinator, JsonFileStore, MemoryRestoreStore, PoolIdentity, PoolSource, RefreshOutcome,
    RestoreStore, TemperatureUnit,
};

// ── Helpers ─────────────────────────────────────────────────────────

fn source() -> PoolSource {
    PoolSource::new(
        "Backyard",
        PoolIdentity::Ids(PoolIds::new("user-1", "pool-1").unwrap()),
    )
}

fn client(server: &MockServer) -> PoolMathClient {
    PoolMathClient::with_client(
        reqwest::Client::new(),
        Url::parse(&server.uri()).unwrap(),
        PoolIds::new("user-1", "pool-1").unwrap(),
    )
    .with_min_interval(Duration::ZERO)
}

fn pool_mock() -> wiremock::MockBuilder {
    Mock::given(method("GET"))
        .and(path("/share/pool"))
        .and(query_param("userId", "user-1"))
        .and(query_param("poolId", "pool-1"))
}

fn body(logs: serde_json::Value) -> serde_json::Value {
    json!({"pools": [{"pool": {"id": "pool-1", "userId": "user-1", "name": "Backyard", "logs": logs}}]})
}

fn number(coord: &Coordinator, code: MeasurementCode) -> Option<f64> {
    coord
        .registry()
        .get(code)
        .and_then(|e| e.value().and_then(MeasurementValue::as_number))
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_first_refresh_populates_entities() {
    let server = MockServer::start().await;
    pool_mock()
        .respond_with(ResponseTemplate::new(200).set_body_json(body(json!([
            {"fc": "3.5", "cc": "0.5", "ph": "7.6", "ts": "2024-01-01T10:00:00Z"}
        ]))))
        .mount(&server)
        .await;

    let coord = Coordinator::new(source(), client(&server), Arc::new(MemoryRestoreStore::new())).unwrap();
    let outcome = coord.refresh().await;
    assert_eq!(outcome, RefreshOutcome::Applied(FetchSource::Fresh));

    let at: DateTime<Utc> = "2024-01-01T10:00:00Z".parse().unwrap();
    assert_eq!(number(&coord, MeasurementCode::FreeChlorine), Some(3.5));
    assert_eq!(number(&coord, MeasurementCode::CombinedChlorine), Some(0.5));
    assert_eq!(number(&coord, MeasurementCode::TotalChlorine), Some(4.0));
    assert_eq!(number(&coord, MeasurementCode::Ph), Some(7.6));
    for code in coord.registry().codes() {
        assert_eq!(coord.registry().get(code).unwrap().last_updated(), Some(at));
    }
    assert!(coord.is_available());
}

#[tokio::test]
async fn test_empty_log_keeps_values_and_marks_unavailable() {
    let server = MockServer::start().await;
    pool_mock()
        .respond_with(ResponseTemplate::new(200).set_body_json(body(json!([
            {"fc": 4, "ts": "2024-01-01T10:00:00Z"}
        ]))))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    pool_mock()
        .respond_with(ResponseTemplate::new(200).set_body_json(body(json!([]))))
        .mount(&server)
        .await;

    let coord = Coordinator::new(source(), client(&server), Arc::new(MemoryRestoreStore::new())).unwrap();
    coord.refresh().await;
    let outcome = coord.refresh().await;

    assert!(matches!(
        outcome,
        RefreshOutcome::Failed { kind: Some(FetchErrorKind::NoData), .. }
    ));
    assert!(!coord.is_available());
    assert_eq!(number(&coord, MeasurementCode::FreeChlorine), Some(4.0));
    assert!(coord.registry().views().iter().all(|v| !v.available));
}

#[tokio::test]
async fn test_server_error_is_recorded_for_diagnostics() {
    let server = MockServer::start().await;
    pool_mock()
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let coord = Coordinator::new(source(), client(&server), Arc::new(MemoryRestoreStore::new())).unwrap();
    coord.refresh().await;

    let diag = coord.diagnostics();
    assert!(!diag.coordinator.last_update_success);
    let failure = diag.coordinator.last_exception.unwrap();
    assert_eq!(failure.kind, Some(FetchErrorKind::HttpError(503)));
    assert!(diag.coordinator.data.is_none());
}

#[tokio::test]
async fn test_diagnostics_redact_payload() {
    let server = MockServer::start().await;
    pool_mock()
        .respond_with(ResponseTemplate::new(200).set_body_json(body(json!([
            {"ph": 7.4, "ts": "2024-01-01T10:00:00Z"}
        ]))))
        .mount(&server)
        .await;

    let coord = Coordinator::new(source(), client(&server), Arc::new(MemoryRestoreStore::new())).unwrap();
    coord.refresh().await;

    let diag = serde_json::to_value(coord.diagnostics()).unwrap();
    let pool = &diag["coordinator"]["data"]["pools"][0]["pool"];
    assert_eq!(pool["id"], "**REDACTED**");
    assert_eq!(pool["userId"], "**REDACTED**");
    assert_eq!(pool["logs"][0]["ph"], 7.4);
    assert_eq!(diag["entry"]["identity"]["ids"]["user_id"], "**REDACTED**");
    assert_eq!(diag["coordinator"]["update_interval_secs"], 480);
}

#[tokio::test]
async fn test_diagnostics_redact_failure_message() {
    let server = MockServer::start().await;
    pool_mock()
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let coord = Coordinator::new(source(), client(&server), Arc::new(MemoryRestoreStore::new())).unwrap();
    coord.refresh().await;

    let text = serde_json::to_string(&coord.diagnostics()).unwrap();
    assert!(text.contains("http_error(503)"), "{text}");
    assert!(!text.contains("user-1"), "{text}");
    assert!(!text.contains("pool-1"), "{text}");
    assert!(text.contains("userId=**REDACTED**"), "{text}");
}

#[tokio::test]
async fn test_rate_limited_fetch_is_applied() {
    let server = MockServer::start().await;
    pool_mock()
        .respond_with(ResponseTemplate::new(200).set_body_json(body(json!([
            {"fc": "3.5", "ts": "2024-01-01T10:00:00Z"}
        ]))))
        .expect(1)
        .mount(&server)
        .await;

    let throttled = PoolMathClient::with_client(
        reqwest::Client::new(),
        Url::parse(&server.uri()).unwrap(),
        PoolIds::new("user-1", "pool-1").unwrap(),
    );
    let coord = Coordinator::new(source(), throttled, Arc::new(MemoryRestoreStore::new())).unwrap();

    assert_eq!(coord.refresh().await, RefreshOutcome::Applied(FetchSource::Fresh));
    assert_eq!(coord.refresh().await, RefreshOutcome::Applied(FetchSource::Cached));
    assert!(coord.is_available());
    assert!(coord.last_failure().is_none());
    assert_eq!(number(&coord, MeasurementCode::FreeChlorine), Some(3.5));
    assert_eq!(server.received_requests().await.unwrap().len(), 1);
}

#[tokio::test]
async fn test_restart_restores_before_fetch() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;
    pool_mock()
        .respond_with(ResponseTemplate::new(200).set_body_json(body(json!([
            {"salt": 3200, "waterTemp": 86, "ts": "2024-01-01T10:00:00Z"}
        ]))))
        .expect(1)
        .mount(&server)
        .await;

    let store: Arc<dyn RestoreStore> = Arc::new(JsonFileStore::new(dir.path()));
    let first = Coordinator::new(source(), client(&server), Arc::clone(&store)).unwrap();
    first.refresh().await;
    first.shutdown().await;

    // Second instance with a Celsius source; no network request is made.
    let celsius = source().with_temperature_unit(TemperatureUnit::Celsius);
    let second = Coordinator::new(celsius, client(&server), store).unwrap();
    assert_eq!(second.restore_state(), 2);

    let salt = second.registry().view(MeasurementCode::Salt).unwrap();
    assert!(salt.restored);
    assert_eq!(salt.value, Some(MeasurementValue::Number(3200.0)));
    let temp = second.registry().view(MeasurementCode::WaterTemperature).unwrap();
    assert_eq!(temp.value, Some(MeasurementValue::Number(30.0)));
    assert_eq!(temp.unit.as_deref(), Some("°C"));
}

#[tokio::test]
async fn test_entity_stream_sees_refresh() {
    let server = MockServer::start().await;
    pool_mock()
        .respond_with(ResponseTemplate::new(200).set_body_json(body(json!([
            {"cya": 40, "ts": "2024-01-01T10:00:00Z"}
        ]))))
        .mount(&server)
        .await;

    let coord = Coordinator::new(source(), client(&server), Arc::new(MemoryRestoreStore::new())).unwrap();
    let mut stream = coord.entities();
    assert!(stream.current().is_empty());

    coord.refresh().await;
    let views = stream.latest();
    assert_eq!(views.len(), 1);
    assert_eq!(views[0].name, "Backyard CYA");
    assert_eq!(views[0].unique_id, "poolmath_user-1_pool-1_cya");
    assert!(stream.changed().await.is_some());
}
