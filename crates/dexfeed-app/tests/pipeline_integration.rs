//! End-to-end pipeline tests against a local feed and a mocked lookup API.

mod common;
use common::MockFeed;

use dexfeed_app::{AppConfig, TrendPipeline};
use dexfeed_web::TrendSource;
use serde_json::json;
use tokio_tungstenite::tungstenite::Message;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config(feed_url: String, api: &MockServer) -> AppConfig {
    let mut config = AppConfig::default();
    config.feed.url = feed_url;
    config.feed.origin_url = format!("{}/", api.uri());
    config.feed.feed_host_url = format!("{}/", api.uri());
    config.feed.open_timeout_ms = 2_000;
    config.feed.receive_timeout_ms = 2_000;
    config.feed.close_timeout_ms = 500;
    config.feed.warmup_timeout_ms = 1_000;
    config.enrich.base_url = format!("{}/tokens/", api.uri());
    config.enrich.timeout_ms = 2_000;
    config
}

struct Identifiers {
    evm: String,
    pump: String,
    base58: String,
}

/// Binary pairs frame with an EVM address, a pump identifier (twice) and a
/// plain base-58 tail, separated by control bytes.
fn pairs_frame() -> (Vec<u8>, Identifiers) {
    let evm = format!("0x{}", "ab12".repeat(10));
    let pump = format!("{}pump", "7".repeat(39));
    let base58 = "9".repeat(44);

    let evm_token = format!("{}{}", "Q".repeat(30), evm);
    let pump_token = format!("{}V{}", "q".repeat(30), pump);
    let base58_token = format!("{}{}", "r".repeat(30), base58);

    let mut frame = b"\x00\x05pairs\x01".to_vec();
    for token in [&evm_token, &pump_token, &base58_token, &pump_token] {
        frame.extend_from_slice(token.as_bytes());
        frame.push(0x02);
    }

    (frame, Identifiers { evm, pump, base58 })
}

#[tokio::test]
async fn test_capture_extract_enrich() {
    let api = MockServer::start().await;
    let (frame, ids) = pairs_frame();

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).insert_header("set-cookie", "__cf_bm=abc; Path=/"))
        .expect(2)
        .mount(&api)
        .await;
    Mock::given(path(format!("/tokens/{}", ids.evm)))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({"pairs": [{"pairAddress": "evm-pair", "chainId": "base"}]})),
        )
        .mount(&api)
        .await;
    Mock::given(path(format!("/tokens/{}", ids.pump)))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"pairs": []})))
        .expect(1)
        .mount(&api)
        .await;
    Mock::given(path(format!("/tokens/{}", ids.base58)))
        .respond_with(ResponseTemplate::new(500))
        .mount(&api)
        .await;

    let feed = MockFeed::start(vec![
        Message::Text("{\"type\":\"stats\"}".to_string()),
        Message::Binary(frame),
    ])
    .await;

    let pipeline = TrendPipeline::new(config(feed.url(), &api)).unwrap();
    let report = pipeline.fetch("").await.unwrap();

    assert_eq!(
        serde_json::to_value(&report).unwrap(),
        json!({
            "data": [
                {"pairAddress": "evm-pair", "chainId": "base"},
                {"pairAddress": ids.pump, "Error": "No data Retrieved"},
                "Error: Status code 500"
            ]
        })
    );
}

#[tokio::test]
async fn test_feed_without_pairs_reports_no_tokens() {
    let api = MockServer::start().await;
    let feed = MockFeed::start(Vec::new()).await;

    let mut config = config(feed.url(), &api);
    config.feed.warmup_enabled = false;
    let pipeline = TrendPipeline::new(config).unwrap();

    let capture = pipeline.capture("").await.unwrap();
    assert_eq!(capture.attempts().len(), 3);
    assert!(capture.attempts().iter().all(|a| a.outcome == "no_data"));

    let report = pipeline.fetch("").await.unwrap();
    assert!(report.data.is_empty());
    assert_eq!(
        report.error.as_deref(),
        Some(
            "No token addresses extracted. WebSocket may be blocked (403) or returned no pairs. \
             Connection error: Unknown websocket error"
        )
    );
}

#[tokio::test]
async fn test_suffix_reaches_feed_and_source_trait() {
    let api = MockServer::start().await;
    let feed = MockFeed::start(vec![Message::Text(format!("pairs {}", "Z".repeat(70)))]).await;
    Mock::given(path(format!("/tokens/{}", "Z".repeat(44))))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"pairs": null})))
        .expect(1)
        .mount(&api)
        .await;

    let mut config = config(feed.url(), &api);
    config.feed.warmup_enabled = false;
    let pipeline = TrendPipeline::new(config).unwrap();

    let report = TrendSource::fetch(&pipeline, "?rankBy[key]=volume").await.unwrap();
    assert_eq!(report.len(), 1);
    assert_eq!(
        serde_json::to_value(&report.data[0]).unwrap(),
        json!({"pairAddress": "Z".repeat(44), "Error": "No data Retrieved"})
    );
}
