use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use parley_core::config::ChatConfig;
use parley_core::error::{ParleyError, Result};
use parley_core::types::{ChatMessage, ConnId, MessageId};
use parley_protocol::{ClientEvent, ServerEvent};
use parley_sessions::{HistoryBuffer, SessionRegistry};
use tokio::sync::mpsc::{self, error::TrySendError};
use tracing::{debug, info, warn};

/// Outbound queue of one connection. The transport task drains it into the socket.
pub type Outbox = mpsc::Sender<ServerEvent>;

/// Lifecycle position of a connection, derived from engine state.
enum Phase {
    /// Not attached: never connected, or already disconnected.
    Detached,
    Connected,
    Joined,
}

enum Recipients<'a> {
    One(&'a ConnId),
    AllExcept(&'a ConnId),
    All,
}

impl Recipients<'_> {
    fn includes(&self, conn: &ConnId) -> bool {
        match self {
            Recipients::One(target) => *target == conn,
            Recipients::AllExcept(sender) => *sender != conn,
            Recipients::All => true,
        }
    }
}

/// Everything the engine mutates. Guarded by a single lock so registry,
/// history and fan-out order can never interleave between connections.
struct EngineState {
    registry: SessionRegistry,
    history: HistoryBuffer,
    outboxes: HashMap<ConnId, Outbox>,
    last_id: Option<MessageId>,
}

/// Session and broadcast engine for the chat relay.
///
/// Created once at startup and shared through `AppState`. Every inbound event
/// is handled to completion under one lock, and outbound events are queued
/// before the lock is released. Each recipient therefore sees broadcasts in
/// exactly the order the engine issued them.
///
/// Queuing never blocks: a recipient whose queue is full loses that event and
/// the rest of the fan-out carries on.
pub struct BroadcastEngine {
    state: Mutex<EngineState>,
    limits: ChatConfig,
}

impl BroadcastEngine {
    pub fn new(config: &ChatConfig) -> Self {
        Self {
            state: Mutex::new(EngineState {
                registry: SessionRegistry::new(),
                history: HistoryBuffer::new(config.history_limit),
                outboxes: HashMap::new(),
                last_id: None,
            }),
            limits: config.clone(),
        }
    }

    fn lock(&self) -> MutexGuard<'_, EngineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// A new transport link is open. It receives broadcasts from now on but
    /// is not a participant until it joins.
    pub fn attach(&self, conn: ConnId, outbox: Outbox) {
        let mut state = self.lock();
        if state.outboxes.insert(conn.clone(), outbox).is_some() {
            warn!(conn_id = %conn, "connection attached twice; replacing outbox");
        }
        debug!(conn_id = %conn, connections = state.outboxes.len(), "connection attached");
    }

    /// Apply one inbound event from `conn`.
    ///
    /// Protocol errors (see [`ParleyError::is_protocol`]) mean the event was
    /// dropped; the connection stays usable.
    pub fn handle(&self, conn: &ConnId, event: ClientEvent) -> Result<()> {
        let mut state = self.lock();
        match (state.phase(conn), event) {
            (_, ClientEvent::Disconnect) => {
                state.disconnect(conn);
                Ok(())
            }
            (Phase::Detached, event) => Err(ParleyError::Protocol(format!(
                "{} from detached connection",
                event.name()
            ))),
            (Phase::Connected, ClientEvent::Join(name)) => {
                let result = self.check_name(&name).and_then(|name| state.join(conn, name));
                if let Err(ref e) = result {
                    state.deliver(Recipients::One(conn), &ServerEvent::error(e));
                }
                result
            }
            (Phase::Connected, event) => Err(ParleyError::Protocol(format!(
                "{} before join",
                event.name()
            ))),
            (Phase::Joined, ClientEvent::Join(_)) => {
                let err = ParleyError::AlreadyJoined {
                    conn: conn.to_string(),
                };
                state.deliver(Recipients::One(conn), &ServerEvent::error(&err));
                Err(err)
            }
            (Phase::Joined, ClientEvent::SendMessage(text)) => {
                self.check_text(&text)?;
                state.send_message(conn, text)
            }
            (Phase::Joined, ClientEvent::Typing(is_typing)) => state.typing(conn, is_typing),
        }
    }

    /// Detach every connection. Dropping the outboxes ends each transport
    /// task's write loop.
    pub fn shutdown(&self) -> usize {
        let mut state = self.lock();
        let detached = state.outboxes.len();
        state.outboxes.clear();
        info!(detached, online = state.registry.count(), "broadcast engine shut down");
        detached
    }

    /// Number of joined participants.
    pub fn online_count(&self) -> usize {
        self.lock().registry.count()
    }

    /// Number of attached connections, joined or not.
    pub fn connection_count(&self) -> usize {
        self.lock().outboxes.len()
    }

    pub fn history(&self) -> Vec<ChatMessage> {
        self.lock().history.snapshot()
    }

    pub fn history_len(&self) -> usize {
        self.lock().history.len()
    }

    fn check_name<'a>(&self, name: &'a str) -> Result<&'a str> {
        let name = name.trim();
        if name.chars().count() > self.limits.max_name_chars {
            return Err(ParleyError::InvalidName(format!(
                "display name longer than {} characters",
                self.limits.max_name_chars
            )));
        }
        Ok(name)
    }

    fn check_text(&self, text: &str) -> Result<()> {
        if text.trim().is_empty() {
            return Err(ParleyError::Protocol("empty message".to_string()));
        }
        if text.chars().count() > self.limits.max_message_chars {
            return Err(ParleyError::Protocol(format!(
                "message longer than {} characters",
                self.limits.max_message_chars
            )));
        }
        Ok(())
    }
}

impl EngineState {
    fn phase(&self, conn: &ConnId) -> Phase {
        if !self.outboxes.contains_key(conn) {
            return Phase::Detached;
        }
        if self.registry.contains(conn) {
            Phase::Joined
        } else {
            Phase::Connected
        }
    }

    fn join(&mut self, conn: &ConnId, name: &str) -> Result<()> {
        self.registry.register(conn, name)?;

        if !self.history.is_empty() {
            debug!(conn_id = %conn, replayed = self.history.len(), "replaying history");
        }
        let history = ServerEvent::ChatHistory(self.history.snapshot());
        self.deliver(Recipients::One(conn), &history);
        self.deliver(Recipients::All, &ServerEvent::UserJoined(name.to_string()));
        self.deliver(
            Recipients::All,
            &ServerEvent::UpdateOnlineCount(self.registry.count()),
        );

        info!(
            conn_id = %conn,
            username = %name,
            online = self.registry.count(),
            "joined the chat"
        );
        Ok(())
    }

    fn send_message(&mut self, conn: &ConnId, text: String) -> Result<()> {
        let author = self.registry.lookup(conn)?.to_string();
        let now = Utc::now();
        let id = MessageId::next(self.last_id, now);
        self.last_id = Some(id);

        let message = ChatMessage::new(id, author, text, now);
        self.history.append(message.clone());
        let delivered = self.deliver(Recipients::All, &ServerEvent::NewMessage(message));

        debug!(conn_id = %conn, message_id = %id, delivered, "message broadcast");
        Ok(())
    }

    fn typing(&self, conn: &ConnId, is_typing: bool) -> Result<()> {
        let author = self.registry.lookup(conn)?;
        let event = ServerEvent::typing(author, is_typing);
        self.deliver(Recipients::AllExcept(conn), &event);
        Ok(())
    }

    fn disconnect(&mut self, conn: &ConnId) {
        self.outboxes.remove(conn);
        match self.registry.unregister(conn) {
            Ok(name) => {
                self.deliver(Recipients::All, &ServerEvent::UserLeft(name.clone()));
                self.deliver(
                    Recipients::All,
                    &ServerEvent::UpdateOnlineCount(self.registry.count()),
                );
                info!(
                    conn_id = %conn,
                    username = %name,
                    online = self.registry.count(),
                    "left the chat"
                );
            }
            Err(_) => debug!(conn_id = %conn, "disconnected before joining"),
        }
    }

    /// Queue `event` for every matching recipient. Returns how many accepted it.
    fn deliver(&self, to: Recipients<'_>, event: &ServerEvent) -> usize {
        let mut delivered = 0;
        for (conn, outbox) in self.outboxes.iter().filter(|(c, _)| to.includes(c)) {
            match outbox.try_send(event.clone()) {
                Ok(()) => delivered += 1,
                Err(TrySendError::Full(_)) => {
                    let err = ParleyError::Transport {
                        conn: conn.to_string(),
                        reason: "outbound queue full".to_string(),
                    };
                    warn!(event = event.name(), error = %err, "slow consumer; event dropped");
                }
                Err(TrySendError::Closed(_)) => {
                    debug!(conn_id = %conn, event = event.name(), "outbox closed; event dropped");
                }
            }
        }
        delivered
    }
}
