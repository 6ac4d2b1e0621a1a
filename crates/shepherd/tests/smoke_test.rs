//! Smoke tests for Shepherd
//!
//! These verify the whole pipeline end to end: lines pushed over a real
//! ingest socket land in the store, reach live subscribers, and are visible
//! and acknowledgeable through the query surface.

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{header, Method, Request};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

use shepherd_api::{build_router, ApiState};
use shepherd_sources::{IngestSource, IngestSourceConfig};
use shepherd_store::RecordStore;
use shepherd_tap::Broadcaster;

/// Everything a running pipeline needs, bound to a free local port
struct Pipeline {
    store: Arc<RecordStore>,
    broadcaster: Arc<Broadcaster>,
    ingest_addr: String,
    cancel: CancellationToken,
}

impl Pipeline {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let store = Arc::new(RecordStore::with_capacity(1000));
        let broadcaster = Arc::new(Broadcaster::new());

        let config = IngestSourceConfig {
            id: "smoke_ingest".into(),
            address: "127.0.0.1".into(),
            port,
            ..Default::default()
        };
        let source = Arc::new(IngestSource::new(
            config,
            Arc::clone(&store),
            Arc::clone(&broadcaster),
        ));

        let cancel = CancellationToken::new();
        {
            let source = Arc::clone(&source);
            let cancel = cancel.clone();
            tokio::spawn(async move {
                let _ = source.run(cancel).await;
            });
        }

        // Wait for the listener to come up
        for _ in 0..100 {
            if source.is_running() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        Self {
            store,
            broadcaster,
            ingest_addr: format!("127.0.0.1:{port}"),
            cancel,
        }
    }

    fn api_state(&self) -> ApiState {
        ApiState {
            store: Arc::clone(&self.store),
            broadcaster: Arc::clone(&self.broadcaster),
            ping_interval: Duration::from_secs(30),
        }
    }

    async fn push_line(&self, stream: &mut TcpStream, raw_line: &str) {
        let message = json!({
            "timestamp": 1700000000.0,
            "raw_line": raw_line,
            "source": "smoke.log",
        });
        stream
            .write_all(format!("{message}\n").as_bytes())
            .await
            .unwrap();
        stream.flush().await.unwrap();
    }

    async fn wait_for_records(&self, n: usize) {
        for _ in 0..200 {
            if self.store.len() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("expected {n} records, have {}", self.store.len());
    }
}

async fn get_json(state: ApiState, uri: &str) -> Value {
    let response = build_router(state)
        .oneshot(
            Request::builder()
                .method(Method::GET)
                .uri(uri)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn post_json(state: ApiState, uri: &str, body: Value) -> Value {
    let response = build_router(state)
        .oneshot(
            Request::builder()
                .method(Method::POST)
                .uri(uri)
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn test_ingest_to_query_roundtrip() {
    let pipeline = Pipeline::start().await;

    let mut stream = TcpStream::connect(&pipeline.ingest_addr).await.unwrap();
    pipeline
        .push_line(
            &mut stream,
            r#"203.0.113.5 - - [10/Oct/2023:13:55:36 +0000] "GET /api/data HTTP/1.1" 404 512 "-" "curl/7.68.0""#,
        )
        .await;
    pipeline.wait_for_records(1).await;

    // Visible through /logs with parsed fields
    let body = get_json(pipeline.api_state(), "/logs").await;
    let logs = body["logs"].as_array().unwrap();
    assert_eq!(logs.len(), 1);
    assert_eq!(logs[0]["parsed"]["status_code"], 404);
    assert_eq!(logs[0]["parsed"]["client_ip"], "203.0.113.5");
    assert_eq!(logs[0]["parsed"]["user_agent"], "curl/7.68.0");
    let log_id = logs[0]["id"].as_str().unwrap().to_string();

    // Counted by /stats
    let stats = get_json(pipeline.api_state(), "/stats").await;
    assert_eq!(stats["total_logs"], 1);
    assert_eq!(stats["error_count"], 1);
    assert_eq!(stats["error_rate"], 1.0);

    // Acknowledgeable through /acknowledge
    let ack = post_json(
        pipeline.api_state(),
        "/acknowledge",
        json!({"log_id": log_id, "timestamp": 1700000100.0}),
    )
    .await;
    assert_eq!(ack["status"], "acknowledged");

    let record = pipeline.store.find_by_id(&log_id).unwrap();
    assert!(record.acknowledged);
    assert_eq!(record.acknowledged_at, Some(1700000100.0));

    pipeline.cancel.cancel();
}

#[tokio::test]
async fn test_live_subscriber_sees_ingested_records() {
    let pipeline = Pipeline::start().await;
    let (_id, mut rx) = pipeline.broadcaster.subscribe().unwrap();

    let mut stream = TcpStream::connect(&pipeline.ingest_addr).await.unwrap();
    for i in 0..3 {
        pipeline
            .push_line(&mut stream, &format!("10.0.0.1 line-{i}"))
            .await;
    }

    // Subscriber receives all three, in ingest order
    for i in 0..3 {
        let record = timeout(Duration::from_secs(2), rx.recv())
            .await
            .expect("timed out")
            .expect("channel closed");
        assert_eq!(record.raw_line, format!("10.0.0.1 line-{i}"));
    }

    pipeline.cancel.cancel();
}

#[tokio::test]
async fn test_late_subscriber_misses_earlier_records() {
    let pipeline = Pipeline::start().await;

    let mut stream = TcpStream::connect(&pipeline.ingest_addr).await.unwrap();
    pipeline.push_line(&mut stream, "10.0.0.1 early").await;
    pipeline.wait_for_records(1).await;

    // Subscribe after the first record; only later ones arrive live
    let (_id, mut rx) = pipeline.broadcaster.subscribe().unwrap();
    pipeline.push_line(&mut stream, "10.0.0.1 late").await;

    let record = timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out")
        .expect("channel closed");
    assert_eq!(record.raw_line, "10.0.0.1 late");

    // The early record is still queryable from the buffer
    let body = get_json(pipeline.api_state(), "/logs").await;
    assert_eq!(body["logs"].as_array().unwrap().len(), 2);

    pipeline.cancel.cancel();
}

#[tokio::test]
async fn test_agent_reconnect_gap_is_tolerated() {
    let pipeline = Pipeline::start().await;

    // First connection
    let mut stream = TcpStream::connect(&pipeline.ingest_addr).await.unwrap();
    pipeline.push_line(&mut stream, "10.0.0.1 before-drop").await;
    drop(stream);
    pipeline.wait_for_records(1).await;

    // Reconnect and continue; the server just keeps going
    let mut stream = TcpStream::connect(&pipeline.ingest_addr).await.unwrap();
    pipeline.push_line(&mut stream, "10.0.0.1 after-drop").await;
    pipeline.wait_for_records(2).await;

    let body = get_json(pipeline.api_state(), "/logs").await;
    let raw_lines: Vec<&str> = body["logs"]
        .as_array()
        .unwrap()
        .iter()
        .map(|l| l["raw_line"].as_str().unwrap())
        .collect();
    assert_eq!(raw_lines, ["10.0.0.1 before-drop", "10.0.0.1 after-drop"]);

    pipeline.cancel.cancel();
}
