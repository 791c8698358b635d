use axum::extract::ws::{Message, WebSocket};
use futures_util::SinkExt;
use parley_core::error::{ParleyError, Result};
use parley_core::types::ConnId;

pub type WsSink = futures_util::stream::SplitSink<WebSocket, Message>;

/// Serialize any value to JSON and send it over the WS connection.
pub async fn json<T: serde::Serialize>(
    conn_id: &ConnId,
    tx: &mut WsSink,
    payload: &T,
) -> Result<()> {
    let json = serde_json::to_string(payload)?;
    tx.send(Message::Text(json.into()))
        .await
        .map_err(|e| ParleyError::Transport {
            conn: conn_id.to_string(),
            reason: e.to_string(),
        })
}
