//! Tests for the ingest TCP source

use std::io;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

use shepherd_store::RecordStore;
use shepherd_tap::Broadcaster;

use super::*;

/// Wrap a raw log line in a wire-format ingest message
fn ingest_line(raw_line: &str) -> String {
    format!(
        "{}\n",
        serde_json::json!({
            "timestamp": 1700000000.0,
            "raw_line": raw_line,
            "source": "test.log",
        })
    )
}

/// Poll until `predicate` holds or a deadline passes
async fn wait_for(predicate: impl Fn() -> bool) {
    for _ in 0..200 {
        if predicate() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!("condition not reached within deadline");
}

/// Running source plus its collaborators, bound to a free local port
struct Harness {
    store: Arc<RecordStore>,
    broadcaster: Arc<Broadcaster>,
    source: Arc<IngestSource>,
    addr: String,
    cancel: CancellationToken,
    handle: tokio::task::JoinHandle<()>,
}

impl Harness {
    async fn start() -> Self {
        Self::start_with(|_| {}).await
    }

    async fn start_with(tweak: impl FnOnce(&mut IngestSourceConfig)) -> Self {
        // Grab a free port, then hand it to the source
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        drop(listener);

        let mut config = IngestSourceConfig {
            id: "test_ingest".into(),
            address: "127.0.0.1".into(),
            port,
            ..Default::default()
        };
        tweak(&mut config);

        let store = Arc::new(RecordStore::new());
        let broadcaster = Arc::new(Broadcaster::new());
        let source = Arc::new(IngestSource::new(
            config,
            Arc::clone(&store),
            Arc::clone(&broadcaster),
        ));

        let cancel = CancellationToken::new();
        let handle = {
            let source = Arc::clone(&source);
            let cancel = cancel.clone();
            tokio::spawn(async move {
                let _ = source.run(cancel).await;
            })
        };

        let harness = Self {
            store,
            broadcaster,
            source,
            addr: format!("127.0.0.1:{port}"),
            cancel,
            handle,
        };

        // Wait until the listener accepts
        wait_for(|| harness.source.is_running()).await;

        harness
    }

    async fn connect(&self) -> TcpStream {
        TcpStream::connect(&self.addr).await.unwrap()
    }

    async fn shutdown(self) {
        self.cancel.cancel();
        let _ = tokio::time::timeout(Duration::from_secs(1), self.handle).await;
    }
}

#[test]
fn test_config_defaults() {
    let config = IngestSourceConfig::default();

    assert_eq!(config.port, 9999);
    assert_eq!(config.address, "0.0.0.0");
    assert_eq!(config.max_line_length, 64 * 1024);
    assert!(config.nodelay);
    assert!(config.keepalive);
    assert!(config.connection_timeout.is_zero());
}

#[test]
fn test_config_with_port() {
    let config = IngestSourceConfig::with_port(19999);
    assert_eq!(config.port, 19999);
}

#[test]
fn test_config_bind_address() {
    let config = IngestSourceConfig {
        address: "127.0.0.1".into(),
        port: 19999,
        ..Default::default()
    };
    assert_eq!(config.bind_address(), "127.0.0.1:19999");
}

#[test]
fn test_metrics_tracking() {
    let metrics = IngestSourceMetrics::new();

    metrics.base.connection_opened();
    metrics.line_read();
    metrics.line_read();
    metrics.line_malformed();
    metrics.line_oversized();
    metrics.base.message_received(128);
    metrics.base.record_stored();

    let snapshot = metrics.snapshot();
    assert_eq!(snapshot.connections_total, 1);
    assert_eq!(snapshot.lines_read, 2);
    assert_eq!(snapshot.lines_malformed, 1);
    assert_eq!(snapshot.lines_oversized, 1);
    assert_eq!(snapshot.messages_received, 1);
    assert_eq!(snapshot.bytes_received, 128);
    assert_eq!(snapshot.records_stored, 1);
    assert_eq!(snapshot.errors, 2); // malformed + oversized both count
}

#[test]
fn test_error_display() {
    let bind_err = IngestSourceError::Bind {
        address: "0.0.0.0:9999".into(),
        source: io::Error::new(io::ErrorKind::AddrInUse, "address in use"),
    };
    assert!(bind_err.to_string().contains("0.0.0.0:9999"));
}

#[test]
fn test_is_connection_reset() {
    assert!(is_connection_reset(&io::Error::new(
        io::ErrorKind::ConnectionReset,
        "reset"
    )));
    assert!(is_connection_reset(&io::Error::new(
        io::ErrorKind::BrokenPipe,
        "broken"
    )));
    assert!(!is_connection_reset(&io::Error::new(
        io::ErrorKind::Other,
        "other"
    )));
}

// ============================================================================
// End-to-end over a real socket
// ============================================================================

#[tokio::test]
async fn test_valid_line_is_stored_and_broadcast() {
    let harness = Harness::start().await;
    let (_sub_id, mut rx) = harness.broadcaster.subscribe().unwrap();

    let mut stream = harness.connect().await;
    let line = ingest_line(
        r#"203.0.113.5 - - [10/Oct/2023:13:55:36 +0000] "GET /api/data HTTP/1.1" 404 512 "-" "curl/7.68.0""#,
    );
    stream.write_all(line.as_bytes()).await.unwrap();
    stream.flush().await.unwrap();

    // Broadcast arrives once the line is processed
    let record = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for broadcast")
        .expect("channel closed");

    assert_eq!(record.parsed.status_code, 404);
    assert_eq!(record.parsed.client_ip, "203.0.113.5");
    assert_eq!(record.parsed.method, "GET");
    assert_eq!(record.parsed.path, "/api/data");
    assert_eq!(record.parsed.response_size, 512);
    assert_eq!(record.parsed.user_agent, "curl/7.68.0");

    // Stored with the same id
    assert_eq!(harness.store.len(), 1);
    assert!(harness.store.find_by_id(&record.id).is_some());

    harness.shutdown().await;
}

#[tokio::test]
async fn test_malformed_line_skipped_connection_survives() {
    let harness = Harness::start().await;

    let mut stream = harness.connect().await;
    stream.write_all(b"this is not json\n").await.unwrap();
    stream
        .write_all(ingest_line("1.2.3.4 ok").as_bytes())
        .await
        .unwrap();
    stream.flush().await.unwrap();

    wait_for(|| harness.store.len() == 1).await;

    // Only the valid line landed; the connection processed both
    let snapshot = harness.store.snapshot(10);
    assert_eq!(snapshot[0].raw_line, "1.2.3.4 ok");
    assert_eq!(harness.source.metrics().snapshot().lines_malformed, 1);

    harness.shutdown().await;
}

#[tokio::test]
async fn test_partial_final_line_discarded() {
    let harness = Harness::start().await;

    let mut stream = harness.connect().await;
    stream
        .write_all(ingest_line("1.2.3.4 first").as_bytes())
        .await
        .unwrap();
    // No trailing newline on the second message
    let partial = r#"{"timestamp": 2.0, "raw_line": "1.2.3.4 second", "source": "t"}"#;
    stream.write_all(partial.as_bytes()).await.unwrap();
    stream.flush().await.unwrap();
    drop(stream);

    wait_for(|| harness.store.len() >= 1).await;
    tokio::time::sleep(Duration::from_millis(100)).await;

    // The unterminated fragment never becomes a record
    assert_eq!(harness.store.len(), 1);
    assert_eq!(harness.store.snapshot(10)[0].raw_line, "1.2.3.4 first");

    harness.shutdown().await;
}

#[tokio::test]
async fn test_oversized_line_dropped() {
    let harness = Harness::start_with(|config| {
        config.max_line_length = 256;
    })
    .await;

    let mut stream = harness.connect().await;
    let huge = format!(
        "{{\"timestamp\": 1.0, \"raw_line\": \"{}\", \"source\": \"t\"}}\n",
        "x".repeat(1024)
    );
    stream.write_all(huge.as_bytes()).await.unwrap();
    stream
        .write_all(ingest_line("1.2.3.4 after").as_bytes())
        .await
        .unwrap();
    stream.flush().await.unwrap();

    wait_for(|| harness.store.len() == 1).await;

    // The oversized line was consumed without breaking framing
    assert_eq!(harness.store.snapshot(10)[0].raw_line, "1.2.3.4 after");
    assert_eq!(harness.source.metrics().snapshot().lines_oversized, 1);

    harness.shutdown().await;
}

#[tokio::test]
async fn test_concurrent_connections_preserve_per_connection_order() {
    let harness = Harness::start().await;

    let mut tasks = Vec::new();
    for conn in 0..2 {
        let addr = harness.addr.clone();
        tasks.push(tokio::spawn(async move {
            let mut stream = TcpStream::connect(&addr).await.unwrap();
            for i in 0..50 {
                let line = ingest_line(&format!("10.0.0.{conn} c{conn}-{i:02}"));
                stream.write_all(line.as_bytes()).await.unwrap();
            }
            stream.flush().await.unwrap();
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }

    wait_for(|| harness.store.len() == 100).await;

    let snapshot = harness.store.snapshot(200);
    assert_eq!(snapshot.len(), 100);

    // Each connection's lines appear in its own send order
    for conn in 0..2 {
        let marker = format!("c{conn}-");
        let own: Vec<&str> = snapshot
            .iter()
            .filter(|r| r.raw_line.contains(&marker))
            .map(|r| r.raw_line.as_str())
            .collect();
        assert_eq!(own.len(), 50);
        let mut sorted = own.clone();
        sorted.sort();
        assert_eq!(own, sorted);
    }

    harness.shutdown().await;
}

#[tokio::test]
async fn test_cancellation_stops_source() {
    let harness = Harness::start().await;
    assert!(harness.source.is_running());
    harness.shutdown().await;
}
