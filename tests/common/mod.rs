//! Shared test utilities and fixtures

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tierfetch_fetch::{HttpItemSource, Item, ItemList};
use url::Url;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const ITEMS_PATH: &str = "/api/talk2/items";
pub const SUBMIT_PATH: &str = "/api/talk3";

pub fn items_body() -> serde_json::Value {
    serde_json::json!([
        { "id": 1, "description": "f1r5t p05t!", "text": "first" },
        { "id": 2, "description": "secondarily", "text": "second" },
        { "id": 3, "description": "trifecta", "text": "third" },
    ])
}

pub fn expected_items() -> ItemList {
    ItemList::from(vec![
        Item::new(1, "f1r5t p05t!", "first"),
        Item::new(2, "secondarily", "second"),
        Item::new(3, "trifecta", "third"),
    ])
}

/// Source whose relative URLs resolve against the mock server.
pub fn source_for(server: &MockServer) -> Arc<HttpItemSource> {
    let origin = Url::parse(&server.uri()).expect("mock uri is a URL");
    Arc::new(HttpItemSource::new(Client::new()).with_origin(origin))
}

pub fn items_url(server: &MockServer) -> String {
    format!("{}{ITEMS_PATH}", server.uri())
}

/// Serve the item list after `delay`.
pub async fn mount_items(server: &MockServer, delay: Duration) {
    Mock::given(method("GET"))
        .and(path(ITEMS_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(items_body())
                .set_delay(delay),
        )
        .mount(server)
        .await;
}

/// First request is slow; every later one gets `then`.
pub async fn mount_slow_then(server: &MockServer, slow: Duration, then: ResponseTemplate) {
    Mock::given(method("GET"))
        .and(path(ITEMS_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(items_body())
                .set_delay(slow),
        )
        .up_to_n_times(1)
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(ITEMS_PATH))
        .respond_with(then)
        .mount(server)
        .await;
}

pub async fn mount_status(server: &MockServer, status: u16) {
    Mock::given(method("GET"))
        .and(path(ITEMS_PATH))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

pub async fn request_count(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .map(|requests| requests.len())
        .unwrap_or_default()
}
