#![allow(clippy::unwrap_used)]
// Integration tests for `PoolMathClient` and `ShareResolver` using wiremock.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

use poolmath_api::{
    Error, FetchErrorKind, FetchSource, MeasurementCode, PoolIds, PoolMathClient, ShareId,
    ShareLink, ShareResolver,
};

// ── Helpers ─────────────────────────────────────────────────────────

async fn setup() -> (MockServer, PoolMathClient) {
    let server = MockServer::start().await;
    let base_url = Url::parse(&server.uri()).unwrap();
    let client = PoolMathClient::with_client(
        reqwest::Client::new(),
        base_url,
        PoolIds::new("user-1", "pool-1").unwrap(),
    );
    (server, client)
}

fn pool_mock() -> wiremock::MockBuilder {
    Mock::given(method("GET"))
        .and(path("/share/pool"))
        .and(query_param("userId", "user-1"))
        .and(query_param("poolId", "pool-1"))
}

fn pool_body() -> serde_json::Value {
    json!({
        "pools": [{
            "pool": {
                "id": "pool-1",
                "userId": "user-1",
                "name": "Backyard",
                "logs": [
                    {"fc": "3.5", "cc": "0.5", "ph": "7.6", "ts": "2024-01-01T10:00:00Z"}
                ]
            }
        }]
    })
}

// ── Fetch ───────────────────────────────────────────────────────────

#[tokio::test]
async fn test_fetch_success() {
    let (server, client) = setup().await;

    pool_mock()
        .respond_with(ResponseTemplate::new(200).set_body_json(pool_body()))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = client.fetch().await.unwrap();
    assert_eq!(outcome.source, FetchSource::Fresh);

    let snapshot = outcome.snapshot;
    assert_eq!(snapshot.number(MeasurementCode::FreeChlorine), Some(3.5));
    assert_eq!(snapshot.number(MeasurementCode::CombinedChlorine), Some(0.5));
    assert_eq!(snapshot.number(MeasurementCode::Ph), Some(7.6));
    assert_eq!(snapshot.pool.name.as_deref(), Some("Backyard"));
    assert_eq!(snapshot.raw, pool_body());
}

#[tokio::test]
async fn test_second_fetch_within_interval_is_cached() {
    let (server, client) = setup().await;

    pool_mock()
        .respond_with(ResponseTemplate::new(200).set_body_json(pool_body()))
        .expect(1)
        .mount(&server)
        .await;

    let first = client.fetch().await.unwrap();
    let second = client.fetch().await.unwrap();

    assert_eq!(second.source, FetchSource::Cached);
    assert!(Arc::ptr_eq(&first.snapshot, &second.snapshot));
    assert!(Arc::ptr_eq(
        &client.last_snapshot().await.unwrap(),
        &first.snapshot
    ));
}

#[tokio::test]
async fn test_fetch_after_interval_hits_network() {
    let (server, client) = setup().await;
    let client = client.with_min_interval(Duration::ZERO);

    pool_mock()
        .respond_with(ResponseTemplate::new(200).set_body_json(pool_body()))
        .expect(2)
        .mount(&server)
        .await;

    client.fetch().await.unwrap();
    let second = client.fetch().await.unwrap();
    assert_eq!(second.source, FetchSource::Fresh);
}

#[tokio::test]
async fn test_failed_fetch_is_not_cached() {
    let (server, client) = setup().await;

    pool_mock()
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    pool_mock()
        .respond_with(ResponseTemplate::new(200).set_body_json(pool_body()))
        .mount(&server)
        .await;

    let err = client.fetch().await.unwrap_err();
    assert!(
        matches!(err, Error::Http { status: 503, .. }),
        "expected Http error, got: {err:?}"
    );
    assert_eq!(err.fetch_kind(), Some(FetchErrorKind::HttpError(503)));

    let outcome = client.fetch().await.unwrap();
    assert_eq!(outcome.source, FetchSource::Fresh);
}

#[tokio::test]
async fn test_fetch_malformed_body() {
    let (server, client) = setup().await;

    pool_mock()
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = client.fetch().await.unwrap_err();
    assert_eq!(err.fetch_kind(), Some(FetchErrorKind::MalformedResponse));
}

#[tokio::test]
async fn test_fetch_empty_log_is_no_data() {
    let (server, client) = setup().await;

    pool_mock()
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"pools": [{"pool": {"id": "pool-1", "logs": []}}]})),
        )
        .mount(&server)
        .await;

    let err = client.fetch().await.unwrap_err();
    assert!(matches!(err, Error::NoData));
    assert_eq!(err.fetch_kind(), Some(FetchErrorKind::NoData));
}

#[tokio::test]
async fn test_fetch_unreachable() {
    let client = PoolMathClient::with_client(
        reqwest::Client::new(),
        Url::parse("http://127.0.0.1:1").unwrap(),
        PoolIds::new("user-1", "pool-1").unwrap(),
    );

    let err = client.fetch().await.unwrap_err();
    assert_eq!(err.fetch_kind(), Some(FetchErrorKind::NetworkUnreachable));
}

// ── Share lookup ────────────────────────────────────────────────────

#[tokio::test]
async fn test_lookup_share_id() {
    let server = MockServer::start().await;
    let resolver =
        ShareResolver::with_client(reqwest::Client::new(), Url::parse(&server.uri()).unwrap());

    Mock::given(method("GET"))
        .and(path("/share/6WPG8yL.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "pools": [{"pool": {"id": "pool-9", "userId": "user-9", "name": "Spa"}}]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let link = ShareLink::parse("share_id=6WPG8yL").unwrap();
    let ids = resolver.resolve(&link).await.unwrap();
    assert_eq!(ids, PoolIds::new("user-9", "pool-9").unwrap());
}

#[tokio::test]
async fn test_lookup_without_ids_is_share_not_found() {
    let server = MockServer::start().await;
    let resolver =
        ShareResolver::with_client(reqwest::Client::new(), Url::parse(&server.uri()).unwrap());

    Mock::given(method("GET"))
        .and(path("/share/abc.json"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"pools": [{"pool": {"name": "x"}}]})),
        )
        .mount(&server)
        .await;

    let err = resolver
        .lookup(&ShareId::new("abc").unwrap())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ShareNotFound { ref share_id } if share_id == "abc"));
}

#[tokio::test]
async fn test_resolve_pool_link_needs_no_request() {
    let server = MockServer::start().await;
    let resolver =
        ShareResolver::with_client(reqwest::Client::new(), Url::parse(&server.uri()).unwrap());

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let link = ShareLink::parse("https://troublefreepool.com/mypool/u1/p1").unwrap();
    let ids = resolver.resolve(&link).await.unwrap();
    assert_eq!(ids.pool_id(), "p1");
}
