use std::collections::HashMap;

use parley_core::types::ConnId;
use tracing::debug;

use crate::error::{Result, SessionError};

/// Live participants: connection → display name.
///
/// Not synchronised; the broadcast engine owns it behind its lock.
/// Participants are told apart by connection, so two connections may share
/// a display name.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    participants: HashMap<ConnId, String>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a participant for `conn`.
    ///
    /// A second join from the same connection is rejected and the existing
    /// name is kept.
    pub fn register(&mut self, conn: &ConnId, name: &str) -> Result<()> {
        if name.trim().is_empty() {
            return Err(SessionError::EmptyName);
        }
        if self.participants.contains_key(conn) {
            return Err(SessionError::AlreadyRegistered {
                conn: conn.to_string(),
            });
        }
        self.participants.insert(conn.clone(), name.to_string());
        debug!(conn_id = %conn, username = %name, "participant registered");
        Ok(())
    }

    pub fn lookup(&self, conn: &ConnId) -> Result<&str> {
        self.participants
            .get(conn)
            .map(String::as_str)
            .ok_or_else(|| SessionError::NotFound {
                conn: conn.to_string(),
            })
    }

    /// Remove `conn`, returning the name it joined with.
    pub fn unregister(&mut self, conn: &ConnId) -> Result<String> {
        self.participants
            .remove(conn)
            .ok_or_else(|| SessionError::NotFound {
                conn: conn.to_string(),
            })
    }

    pub fn count(&self) -> usize {
        self.participants.len()
    }

    pub fn contains(&self, conn: &ConnId) -> bool {
        self.participants.contains_key(conn)
    }
}
