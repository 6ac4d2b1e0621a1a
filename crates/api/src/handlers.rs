//! Query route handlers
//!
//! Thin delegation to the record store; response shapes follow the wire
//! contract of the original service (`logs`/`stats`/`acknowledge` keys).

use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use shepherd_protocol::LogRecord;
use shepherd_store::AckOutcome;

use crate::state::ApiState;

/// Default number of records returned by `GET /logs`
const DEFAULT_LOGS_LIMIT: usize = 100;

/// Query parameters for `GET /logs`
#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    /// Maximum number of records to return
    pub limit: Option<usize>,
}

/// Response body for `GET /logs`
#[derive(Debug, Serialize)]
pub struct LogsResponse {
    pub logs: Vec<LogRecord>,
}

/// Response body for `GET /stats`
#[derive(Debug, Serialize)]
pub struct StatsResponse {
    pub total_logs: usize,
    pub error_count: usize,
    pub success_count: usize,
    pub error_rate: f64,
}

/// Request body for `POST /acknowledge`
#[derive(Debug, Deserialize)]
pub struct AcknowledgeRequest {
    pub log_id: String,
    pub timestamp: f64,
}

/// Response body for `POST /acknowledge`
#[derive(Debug, Serialize)]
pub struct AcknowledgeResponse {
    pub status: &'static str,
    pub log_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

/// Response body for `GET /`
#[derive(Debug, Serialize)]
pub struct InfoResponse {
    pub service: &'static str,
    pub version: &'static str,
    pub active_subscribers: usize,
    pub buffer_len: usize,
    pub buffer_capacity: usize,
}

/// GET / - basic service info
pub async fn root_info(State(state): State<ApiState>) -> Json<InfoResponse> {
    Json(InfoResponse {
        service: "shepherd",
        version: env!("CARGO_PKG_VERSION"),
        active_subscribers: state.broadcaster.subscriber_count(),
        buffer_len: state.store.len(),
        buffer_capacity: state.store.capacity(),
    })
}

/// GET /logs?limit=N - recent records in insertion order
pub async fn recent_logs(
    State(state): State<ApiState>,
    Query(query): Query<LogsQuery>,
) -> Json<LogsResponse> {
    let limit = query.limit.unwrap_or(DEFAULT_LOGS_LIMIT);
    Json(LogsResponse {
        logs: state.store.snapshot(limit),
    })
}

/// GET /stats - aggregate statistics
pub async fn get_stats(State(state): State<ApiState>) -> Json<StatsResponse> {
    let stats = state.store.stats();
    Json(StatsResponse {
        total_logs: stats.total,
        error_count: stats.error_count,
        success_count: stats.success_count,
        error_rate: stats.error_rate,
    })
}

/// POST /acknowledge - mark a record acknowledged
///
/// An unknown (or already evicted) id is a structured `not_found` result,
/// not an HTTP error.
pub async fn acknowledge(
    State(state): State<ApiState>,
    Json(request): Json<AcknowledgeRequest>,
) -> Json<AcknowledgeResponse> {
    let response = match state.store.acknowledge(&request.log_id, request.timestamp) {
        AckOutcome::Acknowledged => AcknowledgeResponse {
            status: "acknowledged",
            log_id: request.log_id,
            message: None,
        },
        AckOutcome::NotFound => AcknowledgeResponse {
            status: "not_found",
            log_id: request.log_id,
            message: Some("log entry not found"),
        },
    };
    Json(response)
}

/// GET /health - liveness check
pub async fn health_check() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}
