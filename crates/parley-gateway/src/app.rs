use axum::{http::Method, routing::get, Router};
use parley_core::config::ParleyConfig;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};

use crate::engine::BroadcastEngine;

/// Central shared state — passed as Arc<AppState> to all Axum handlers.
pub struct AppState {
    pub config: ParleyConfig,
    pub engine: BroadcastEngine,
    /// Cancelled on shutdown; every WS loop watches it.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(config: ParleyConfig) -> Self {
        let engine = BroadcastEngine::new(&config.chat);
        Self {
            config,
            engine,
            shutdown: CancellationToken::new(),
        }
    }
}

/// Assemble the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST]);

    Router::new()
        .route("/health", get(crate::http::health::health_handler))
        .route("/ws", get(crate::ws::connection::ws_handler))
        .with_state(state)
        .layer(cors)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::{SinkExt, StreamExt};
    use serde_json::{json, Value};
    use std::time::Duration;
    use tokio::net::TcpStream;
    use tokio_tungstenite::{tungstenite::Message, MaybeTlsStream, WebSocketStream};

    type Client = WebSocketStream<MaybeTlsStream<TcpStream>>;

    async fn serve() -> (Arc<AppState>, String) {
        serve_with(ParleyConfig::default()).await
    }

    async fn serve_with(config: ParleyConfig) -> (Arc<AppState>, String) {
        let state = Arc::new(AppState::new(config));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let router = build_router(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        (state, format!("ws://{addr}/ws"))
    }

    async fn emit(client: &mut Client, event: &str, payload: Value) {
        let frame = json!({ "event": event, "payload": payload }).to_string();
        client.send(Message::Text(frame.into())).await.unwrap();
    }

    /// Next server event as `(name, payload)`, skipping control frames.
    async fn next_event(client: &mut Client) -> (String, Value) {
        loop {
            let msg = tokio::time::timeout(Duration::from_secs(5), client.next())
                .await
                .expect("timed out waiting for event")
                .expect("stream ended")
                .expect("read failed");
            if let Message::Text(text) = msg {
                let value: Value = serde_json::from_str(text.as_str()).unwrap();
                return (
                    value["event"].as_str().unwrap().to_string(),
                    value["payload"].clone(),
                );
            }
        }
    }

    async fn expect(client: &mut Client, event: &str, payload: Value) {
        assert_eq!(next_event(client).await, (event.to_string(), payload));
    }

    #[tokio::test]
    async fn two_clients_chat_over_websocket() {
        let (state, url) = serve().await;

        let (mut bob, _) = tokio_tungstenite::connect_async(&url).await.unwrap();
        emit(&mut bob, "join", json!("Bob")).await;
        expect(&mut bob, "chat-history", json!([])).await;
        expect(&mut bob, "user-joined", json!("Bob")).await;
        expect(&mut bob, "update-online-count", json!(1)).await;

        let (mut ana, _) = tokio_tungstenite::connect_async(&url).await.unwrap();
        emit(&mut ana, "join", json!("Ana")).await;
        expect(&mut ana, "chat-history", json!([])).await;
        expect(&mut ana, "user-joined", json!("Ana")).await;
        expect(&mut ana, "update-online-count", json!(2)).await;
        expect(&mut bob, "user-joined", json!("Ana")).await;
        expect(&mut bob, "update-online-count", json!(2)).await;

        emit(&mut bob, "send-message", json!("hi")).await;
        for client in [&mut bob, &mut ana] {
            let (event, payload) = next_event(client).await;
            assert_eq!(event, "new-message");
            assert_eq!(payload["username"], "Bob");
            assert_eq!(payload["text"], "hi");
        }

        emit(&mut ana, "typing", json!(true)).await;
        expect(
            &mut bob,
            "user-typing",
            json!({ "username": "Ana", "isTyping": true }),
        )
        .await;

        ana.close(None).await.unwrap();
        expect(&mut bob, "user-left", json!("Ana")).await;
        expect(&mut bob, "update-online-count", json!(1)).await;
        assert_eq!(state.engine.history().len(), 1);
    }

    #[tokio::test]
    async fn events_before_join_are_ignored() {
        let (state, url) = serve().await;

        let (mut eve, _) = tokio_tungstenite::connect_async(&url).await.unwrap();
        emit(&mut eve, "send-message", json!("sneaky")).await;
        emit(&mut eve, "join", json!("Eve")).await;

        // the early message never made it into history
        expect(&mut eve, "chat-history", json!([])).await;
        expect(&mut eve, "user-joined", json!("Eve")).await;
        expect(&mut eve, "update-online-count", json!(1)).await;
        assert!(state.engine.history().is_empty());
    }

    #[tokio::test]
    async fn silent_peer_is_dropped_after_missed_heartbeats() {
        let mut config = ParleyConfig::default();
        config.gateway.heartbeat_interval_ms = 200;
        let (state, url) = serve_with(config).await;

        let (mut bob, _) = tokio_tungstenite::connect_async(&url).await.unwrap();
        emit(&mut bob, "join", json!("Bob")).await;
        expect(&mut bob, "chat-history", json!([])).await;
        expect(&mut bob, "user-joined", json!("Bob")).await;
        expect(&mut bob, "update-online-count", json!(1)).await;

        // Ana joins, then never reads again, so her pongs never go out.
        let (mut ana, _) = tokio_tungstenite::connect_async(&url).await.unwrap();
        emit(&mut ana, "join", json!("Ana")).await;
        expect(&mut bob, "user-joined", json!("Ana")).await;
        expect(&mut bob, "update-online-count", json!(2)).await;

        // Bob keeps reading and answering pings; only Ana times out.
        expect(&mut bob, "user-left", json!("Ana")).await;
        expect(&mut bob, "update-online-count", json!(1)).await;
        assert_eq!(state.engine.online_count(), 1);
        drop(ana);
    }
}
