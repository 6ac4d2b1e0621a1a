//! WebSocket subscription endpoint
//!
//! Each `/ws` connection becomes one broadcaster subscription. The server
//! pushes every broadcast record as a JSON text frame and sends periodic
//! pings to keep the connection alive; nothing the client sends carries
//! application meaning (pongs and stray frames are drained and ignored).
//!
//! Teardown paths all converge on a single unsubscribe: client close frame,
//! transport error, failed send, or broadcaster shutdown.

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::Response;
use futures_util::{SinkExt, StreamExt};
use tracing::{debug, warn};

use crate::state::ApiState;

/// GET /ws - upgrade to a live record stream
pub async fn ws_upgrade(ws: WebSocketUpgrade, State(state): State<ApiState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Drive one subscriber connection until it ends
async fn handle_socket(socket: WebSocket, state: ApiState) {
    let (mut sink, mut stream) = socket.split();

    let (subscriber_id, mut records) = match state.broadcaster.subscribe() {
        Ok(subscription) => subscription,
        Err(e) => {
            warn!(error = %e, "rejecting subscriber");
            let _ = sink.send(Message::Close(None)).await;
            return;
        }
    };

    debug!(
        subscriber_id,
        total = state.broadcaster.subscriber_count(),
        "websocket subscriber connected"
    );

    let mut ping_timer = tokio::time::interval(state.ping_interval);

    loop {
        tokio::select! {
            // Record from the broadcaster
            record = records.recv() => {
                match record {
                    Some(record) => {
                        let text = match serde_json::to_string(&*record) {
                            Ok(text) => text,
                            Err(e) => {
                                // Records always serialize; treat failure as a bug, not a disconnect
                                warn!(error = %e, "failed to serialize record");
                                continue;
                            }
                        };
                        if sink.send(Message::Text(text.into())).await.is_err() {
                            break;
                        }
                    }
                    // Subscriber was pruned (failed send) or broadcaster dropped
                    None => break,
                }
            }

            // Liveness ping
            _ = ping_timer.tick() => {
                if sink.send(Message::Ping(Vec::new().into())).await.is_err() {
                    break;
                }
            }

            // Inbound frames: only close matters
            frame = stream.next() => {
                match frame {
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(_)) => break,
                }
            }
        }
    }

    state.broadcaster.unsubscribe(subscriber_id);
    debug!(
        subscriber_id,
        total = state.broadcaster.subscriber_count(),
        "websocket subscriber disconnected"
    );
}
