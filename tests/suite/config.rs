//! Config-driven wiring: URLs and headers from a config file reach the wire.

use std::io::Write;
use std::time::Duration;

use tierfetch_config::TierfetchConfig;
use tierfetch_fetch::{RequestOptions, TracingSink, TwoTierFetch, fetch_items};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common::{ITEMS_PATH, expected_items, items_body, mount_items, source_for};

fn config_for(server: &MockServer, extra: &str) -> TierfetchConfig {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        "[source]\nbase_url = \"{uri}\"\nitems_path = \"{ITEMS_PATH}\"\nbound_ms = 2000\n{extra}\n[client]\norigin = \"{uri}\"\n",
        uri = server.uri()
    )
    .unwrap();
    TierfetchConfig::load_from(file.path()).unwrap()
}

fn options_for(config: &TierfetchConfig) -> RequestOptions {
    config
        .headers()
        .into_iter()
        .fold(RequestOptions::default(), |options, (name, value)| {
            options.with_header(name, value)
        })
}

#[tokio::test]
async fn test_config_urls_drive_two_tier_fetch() {
    let server = MockServer::start().await;
    mount_items(&server, Duration::ZERO).await;
    let config = config_for(&server, "");

    let source = source_for(&server);
    let bound = config.source.as_ref().and_then(|s| s.bound_ms).unwrap();
    let fetch = TwoTierFetch::new(source, config.items_url(), config.items_path(), bound as f64);
    let outcome = fetch.run(TracingSink).await.unwrap();

    assert_eq!(outcome.displayed, expected_items());
}

#[tokio::test]
async fn test_config_headers_are_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(ITEMS_PATH))
        .and(header("x-items-client", "tierfetch"))
        .respond_with(ResponseTemplate::new(200).set_body_json(items_body()))
        .expect(1)
        .mount(&server)
        .await;
    let config = config_for(&server, "[source.headers]\nx-items-client = \"tierfetch\"\n");

    let items = fetch_items(
        source_for(&server).as_ref(),
        &config.items_url(),
        &options_for(&config),
    )
    .await
    .unwrap();

    assert_eq!(items, expected_items());
}
