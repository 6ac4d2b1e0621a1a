//! Shepherd API - HTTP query and subscription surface
//!
//! Thin axum server over the record store and broadcaster:
//!
//! - `GET /` - service info (version, subscribers, buffer fill)
//! - `GET /logs?limit=N` - recent records, newest-last
//! - `GET /stats` - aggregate counts and error rate
//! - `POST /acknowledge` - mark a record acknowledged
//! - `GET /health` - liveness check
//! - `GET /ws` - WebSocket subscription: the server pushes every broadcast
//!   record as a JSON text frame plus periodic pings
//!
//! There is no business logic here; every endpoint delegates to the store or
//! the broadcaster. Lookup misses surface as structured `not_found` bodies,
//! not HTTP errors.

mod handlers;
mod state;
mod ws;

use std::sync::Arc;

use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use shepherd_store::RecordStore;
use shepherd_tap::Broadcaster;

pub use state::ApiState;

use handlers::{acknowledge, get_stats, health_check, recent_logs, root_info};
use ws::ws_upgrade;

/// Default API port
const DEFAULT_PORT: u16 = 8000;

/// API server configuration
#[derive(Debug, Clone)]
pub struct ApiServerConfig {
    /// Bind address (e.g., "0.0.0.0")
    pub address: String,

    /// Listen port
    pub port: u16,

    /// WebSocket ping interval
    pub ping_interval: std::time::Duration,
}

impl Default for ApiServerConfig {
    fn default() -> Self {
        Self {
            address: "0.0.0.0".into(),
            port: DEFAULT_PORT,
            ping_interval: std::time::Duration::from_secs(30),
        }
    }
}

impl ApiServerConfig {
    /// Create config with custom port
    pub fn with_port(port: u16) -> Self {
        Self {
            port,
            ..Default::default()
        }
    }

    /// Get the socket address to bind to
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.address, self.port)
    }
}

/// API server errors
#[derive(Debug, thiserror::Error)]
pub enum ApiServerError {
    /// Failed to bind to address
    #[error("failed to bind to {address}: {source}")]
    Bind {
        address: String,
        #[source]
        source: std::io::Error,
    },

    /// Server error
    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// HTTP server for queries and WebSocket subscriptions
pub struct ApiServer {
    config: ApiServerConfig,
    state: ApiState,
}

impl ApiServer {
    /// Create a new API server
    pub fn new(
        config: ApiServerConfig,
        store: Arc<RecordStore>,
        broadcaster: Arc<Broadcaster>,
    ) -> Self {
        Self {
            state: ApiState {
                store,
                broadcaster,
                ping_interval: config.ping_interval,
            },
            config,
        }
    }

    /// Run the server until cancelled
    pub async fn run(self, cancel: CancellationToken) -> Result<(), ApiServerError> {
        let bind_addr = self.config.bind_address();

        let listener = TcpListener::bind(&bind_addr)
            .await
            .map_err(|e| ApiServerError::Bind {
                address: bind_addr.clone(),
                source: e,
            })?;

        tracing::info!(address = %bind_addr, "API server listening");

        let app = build_router(self.state);

        axum::serve(listener, app)
            .with_graceful_shutdown(async move { cancel.cancelled().await })
            .await?;

        tracing::info!("API server stopped");

        Ok(())
    }
}

/// Build the axum router
pub fn build_router(state: ApiState) -> Router {
    Router::new()
        .route("/", get(root_info))
        .route("/logs", get(recent_logs))
        .route("/stats", get(get_stats))
        .route("/acknowledge", post(acknowledge))
        .route("/health", get(health_check))
        .route("/ws", get(ws_upgrade))
        .with_state(state)
}
