use parley_core::config::MAX_PAYLOAD_BYTES;
use parley_core::error::{ParleyError, Result};
use parley_core::types::ConnId;
use parley_protocol::ClientEvent;
use tracing::{debug, warn};

use crate::engine::BroadcastEngine;

/// Process one inbound WS text frame.
///
/// Malformed frames and events the engine rejects come back as protocol
/// errors; anything else means the connection should close.
pub fn handle(conn_id: &ConnId, text: &str, engine: &BroadcastEngine) -> Result<()> {
    if text.len() > MAX_PAYLOAD_BYTES {
        return Err(ParleyError::PayloadTooLarge {
            size: text.len(),
            max: MAX_PAYLOAD_BYTES,
        });
    }

    let event: ClientEvent = serde_json::from_str(text).map_err(|e| {
        warn!(conn_id = %conn_id, error = %e, "malformed frame");
        ParleyError::Protocol(format!("malformed frame: {e}"))
    })?;

    debug!(conn_id = %conn_id, event = event.name(), "inbound event");
    engine.handle(conn_id, event)
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_core::config::ChatConfig;
    use parley_protocol::ServerEvent;
    use tokio::sync::mpsc;

    fn attached() -> (BroadcastEngine, ConnId, mpsc::Receiver<ServerEvent>) {
        let engine = BroadcastEngine::new(&ChatConfig::default());
        let conn = ConnId::from("c1");
        let (tx, rx) = mpsc::channel(16);
        engine.attach(conn.clone(), tx);
        (engine, conn, rx)
    }

    #[test]
    fn join_frame_reaches_engine() {
        let (engine, conn, mut rx) = attached();
        handle(&conn, r#"{"event":"join","payload":"Alice"}"#, &engine).unwrap();
        assert_eq!(engine.online_count(), 1);
        assert!(matches!(rx.try_recv(), Ok(ServerEvent::ChatHistory(_))));
    }

    #[test]
    fn garbage_is_a_protocol_error() {
        let (engine, conn, _rx) = attached();
        let err = handle(&conn, "not json", &engine).unwrap_err();
        assert!(err.is_protocol());
    }

    #[test]
    fn wire_disconnect_is_ignored() {
        let (engine, conn, _rx) = attached();
        handle(&conn, r#"{"event":"join","payload":"Alice"}"#, &engine).unwrap();
        let err = handle(&conn, r#"{"event":"disconnect"}"#, &engine).unwrap_err();
        assert!(err.is_protocol());
        assert_eq!(engine.online_count(), 1);
    }

    #[test]
    fn oversized_frame_is_fatal() {
        let (engine, conn, _rx) = attached();
        let text = "x".repeat(MAX_PAYLOAD_BYTES + 1);
        let err = handle(&conn, &text, &engine).unwrap_err();
        assert!(!err.is_protocol());
        assert_eq!(err.code(), "PAYLOAD_TOO_LARGE");
    }
}
