use axum::{
    body::Bytes,
    extract::{ws::Message, ws::WebSocket, State, WebSocketUpgrade},
    response::IntoResponse,
};
use futures_util::{SinkExt, StreamExt};
use parley_core::types::ConnId;
use parley_protocol::{ClientEvent, ServerEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::app::AppState;
use crate::ws::{message, send};

/// Axum handler — upgrades HTTP to WebSocket at GET /ws.
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| run_connection(socket, state))
}

/// Tracks when the peer last sent anything. A successful ping write only
/// proves the kernel buffered it, so pongs (or any other frame) are the
/// signal that the link is alive.
struct Liveness {
    last_seen: Instant,
    timeout: Duration,
}

impl Liveness {
    fn new(now: Instant, timeout: Duration) -> Self {
        Self {
            last_seen: now,
            timeout,
        }
    }

    fn touch(&mut self, now: Instant) {
        self.last_seen = now;
    }

    fn expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last_seen) > self.timeout
    }
}

/// Per-connection event loop — lives for the entire WS session.
///
/// Reads client frames into the engine and drains the connection's outbox
/// into the socket. Whatever ends the loop, the engine sees a disconnect.
async fn run_connection(socket: WebSocket, state: Arc<AppState>) {
    let conn_id = ConnId::new();
    info!(conn_id = %conn_id, "new WS connection");

    let gateway = &state.config.gateway;
    let (mut tx, mut rx) = socket.split();
    let (outbox, mut inbox) = mpsc::channel::<ServerEvent>(gateway.client_queue.max(1));
    state.engine.attach(conn_id.clone(), outbox);

    let period = gateway.heartbeat_interval();
    let mut liveness = Liveness::new(Instant::now(), gateway.peer_timeout());
    let mut tick = tokio::time::interval_at(Instant::now() + period, period);
    tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            msg = rx.next() => {
                if let Some(Ok(_)) = msg {
                    liveness.touch(Instant::now());
                }
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        let result = message::handle(&conn_id, text.as_str(), &state.engine);
                        if let Err(e) = result {
                            if e.is_protocol() {
                                debug!(conn_id = %conn_id, error = %e, "event dropped");
                            } else {
                                warn!(conn_id = %conn_id, error = %e, "closing connection");
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        debug!(conn_id = %conn_id, error = %e, "WS read failed");
                        break;
                    }
                    _ => {}
                }
            }

            event = inbox.recv() => {
                match event {
                    Some(event) => {
                        if let Err(e) = send::json(&conn_id, &mut tx, &event).await {
                            debug!(conn_id = %conn_id, error = %e, "WS write failed");
                            break;
                        }
                    }
                    // engine detached us
                    None => break,
                }
            }

            now = tick.tick() => {
                if liveness.expired(now) {
                    let silent = now.saturating_duration_since(liveness.last_seen);
                    warn!(conn_id = %conn_id, ?silent, "peer stopped answering pings");
                    break;
                }
                if tx.send(Message::Ping(Bytes::new())).await.is_err() {
                    break;
                }
            }

            _ = state.shutdown.cancelled() => break,
        }
    }

    // Disconnect is accepted in every phase.
    let _ = state.engine.handle(&conn_id, ClientEvent::Disconnect);
    let _ = tx.close().await;
    info!(conn_id = %conn_id, "WS connection closed");
}
