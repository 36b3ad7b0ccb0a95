//! StatusClient against a mock status endpoint.

mod common;

use std::sync::Arc;
use std::time::Duration;

use common::SAMPLE_JSON;
use cult_proto::client::StatusClient;
use cult_proto::error::FetchError;
use cult_proto::poller::PollScheduler;
use cult_proto::store::StatusStore;
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const STATUS_PATH: &str = "/stations/sefac315e7/status";

fn client_for(server: &MockServer) -> StatusClient {
    let http = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap();
    StatusClient::new(http, &server.uri(), "sefac315e7").unwrap()
}

#[tokio::test]
async fn test_fetch_decodes_sample_payload() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(STATUS_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(SAMPLE_JSON.as_bytes(), "application/json"),
        )
        .mount(&server)
        .await;

    let status = client_for(&server).fetch_status().await.unwrap();

    assert_eq!(status.status, "online");
    assert_eq!(status.source.kind, "live");
    assert_eq!(status.current_track.title, "Song A");
    assert_eq!(status.current_track.start_time, "2024-01-01T00:00:00Z");
    assert_eq!(status.current_track.artwork_url_large, "https://x/a.png");
    assert_eq!(status.history.len(), 1);
    assert_eq!(status.history[0].title, "Song B");
    assert_eq!(status.display_title(), "Playing: Song A");
}

#[tokio::test]
async fn test_request_carries_cache_buster() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(STATUS_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(SAMPLE_JSON.as_bytes(), "application/json"),
        )
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server).fetch_status().await.unwrap();

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    let has_buster = requests[0]
        .url
        .query_pairs()
        .any(|(k, v)| k == "v" && v.parse::<i64>().is_ok());
    assert!(has_buster, "missing v=<millis> in {}", requests[0].url);
}

#[tokio::test]
async fn test_missing_current_track_is_decode_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(STATUS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "status": "online",
            "source": { "type": "live" },
            "history": []
        })))
        .mount(&server)
        .await;

    let err = client_for(&server).fetch_status().await.unwrap_err();
    assert!(matches!(err, FetchError::Decode(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_http_error_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(STATUS_PATH))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = client_for(&server).fetch_status().await.unwrap_err();
    assert!(matches!(err, FetchError::Status(503)), "got {:?}", err);
}

#[tokio::test]
async fn test_unreachable_host_is_network_error() {
    // grab a free port, then close it so the connect is refused
    let port = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let client = StatusClient::new(
        reqwest::Client::new(),
        &format!("http://127.0.0.1:{}", port),
        "sefac315e7",
    )
    .unwrap();

    let err = client.fetch_status().await.unwrap_err();
    assert!(matches!(err, FetchError::Network(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_poller_publishes_fetched_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(STATUS_PATH))
        .respond_with(
            ResponseTemplate::new(200).set_body_raw(SAMPLE_JSON.as_bytes(), "application/json"),
        )
        .mount(&server)
        .await;

    let (publisher, store) = StatusStore::new();
    let mut rx = store.subscribe();
    let handle = PollScheduler::spawn(
        Arc::new(client_for(&server)),
        publisher,
        Duration::from_secs(30),
    );

    tokio::time::timeout(Duration::from_secs(5), rx.changed())
        .await
        .expect("no status within 5s")
        .unwrap();
    let latest = store.latest().unwrap();
    assert_eq!(latest.current_track.title, "Song A");

    handle.shutdown().await;
}
