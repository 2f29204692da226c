//! Both tiers against a real HTTP server.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tierfetch_fetch::{
    FallbackState, FetchError, Selection, Settled, TracingSink, TwoTierError, TwoTierFetch,
};
use wiremock::{MockServer, ResponseTemplate};

use crate::common::{
    ITEMS_PATH, expected_items, items_body, items_url, mount_items, mount_slow_then, mount_status,
    request_count, source_for,
};

const SLOW: Duration = Duration::from_secs(5);
const BOUND_MS: f64 = 200.0;

fn recording_sink() -> (Arc<Mutex<Vec<FetchError>>>, impl Fn(&FetchError)) {
    let reported = Arc::new(Mutex::new(Vec::new()));
    let sink = {
        let reported = Arc::clone(&reported);
        move |error: &FetchError| reported.lock().unwrap().push(error.clone())
    };
    (reported, sink)
}

#[tokio::test]
async fn test_fast_upstream_renders_on_first_tier() {
    let server = MockServer::start().await;
    mount_items(&server, Duration::ZERO).await;

    let fetch = TwoTierFetch::new(source_for(&server), items_url(&server), ITEMS_PATH, 2_000.0);
    let outcome = fetch.run(TracingSink).await.expect("run should succeed");

    assert!(!outcome.used_fallback());
    assert_eq!(outcome.raced, expected_items());
    assert_eq!(outcome.displayed, expected_items());
    assert_eq!(outcome.state, FallbackState::Final(Settled::Populated));
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn test_slow_upstream_is_repaired_by_client_retry() {
    let server = MockServer::start().await;
    mount_slow_then(
        &server,
        SLOW,
        ResponseTemplate::new(200).set_body_json(items_body()),
    )
    .await;

    let started = Instant::now();
    let fetch = TwoTierFetch::new(source_for(&server), items_url(&server), ITEMS_PATH, BOUND_MS);
    let outcome = fetch.run(TracingSink).await.expect("run should succeed");

    assert!(started.elapsed() < SLOW);
    assert!(outcome.used_fallback());
    assert!(outcome.raced.is_empty());
    assert_eq!(outcome.displayed, expected_items());
    assert_eq!(outcome.state, FallbackState::Final(Settled::Populated));
    assert_eq!(request_count(&server).await, 2);

    let selection = Selection::default();
    assert_eq!(selection.description(&outcome.displayed), Some("f1r5t p05t!"));
}

#[tokio::test]
async fn test_failed_retry_is_reported_and_leaves_placeholder() {
    let server = MockServer::start().await;
    mount_slow_then(&server, SLOW, ResponseTemplate::new(500)).await;

    let (reported, sink) = recording_sink();
    let fetch = TwoTierFetch::new(source_for(&server), items_url(&server), ITEMS_PATH, BOUND_MS);
    let outcome = fetch.run(sink).await.expect("first tier resolves with placeholder");

    assert!(outcome.displayed.is_empty());
    assert_eq!(outcome.state, FallbackState::Final(Settled::Errored));

    let reported = reported.lock().unwrap();
    assert_eq!(reported.len(), 1);
    assert!(matches!(reported[0], FetchError::Status { status: 500, .. }));
}

#[tokio::test]
async fn test_first_tier_error_is_not_replaced_by_placeholder() {
    let server = MockServer::start().await;
    mount_status(&server, 500).await;

    let (reported, sink) = recording_sink();
    let fetch = TwoTierFetch::new(source_for(&server), items_url(&server), ITEMS_PATH, 2_000.0);
    let err = fetch.run(sink).await.expect_err("500 should surface");

    assert!(matches!(
        err,
        TwoTierError::Fetch(FetchError::Status { status: 500, .. })
    ));
    assert!(reported.lock().unwrap().is_empty());
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn test_invalid_bound_makes_no_request() {
    let server = MockServer::start().await;
    mount_items(&server, Duration::ZERO).await;

    for bound in [0.0, -1.0, f64::NAN, f64::INFINITY] {
        let fetch = TwoTierFetch::new(source_for(&server), items_url(&server), ITEMS_PATH, bound);
        let err = fetch.run(TracingSink).await.expect_err("bound must be rejected");
        assert!(matches!(err, TwoTierError::InvalidArgument(_)));
    }
    assert_eq!(request_count(&server).await, 0);
}
