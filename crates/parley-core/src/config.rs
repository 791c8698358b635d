use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 8000;
pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_HISTORY_LIMIT: usize = 50;
pub const DEFAULT_CLIENT_QUEUE: usize = 256; // outbound events buffered per connection
pub const MAX_PAYLOAD_BYTES: usize = 16 * 1024; // hard cap per inbound frame
pub const HEARTBEAT_INTERVAL_SECS: u64 = 30; // server ping cadence
pub const PEER_TIMEOUT_HEARTBEATS: u32 = 2; // silent heartbeats before a peer counts as dead

/// Top-level config (parley.toml + PARLEY_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParleyConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub chat: ChatConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Capacity of each connection's outbound queue. A recipient that falls
    /// this far behind starts losing events.
    #[serde(default = "default_client_queue")]
    pub client_queue: usize,
    /// Ping cadence. A peer silent for `PEER_TIMEOUT_HEARTBEATS` intervals
    /// is disconnected.
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
}

impl GatewayConfig {
    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms.max(1))
    }

    /// How long a connection may go without any inbound frame.
    pub fn peer_timeout(&self) -> Duration {
        self.heartbeat_interval() * PEER_TIMEOUT_HEARTBEATS
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: DEFAULT_BIND.to_string(),
            client_queue: DEFAULT_CLIENT_QUEUE,
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Messages retained for replay to new joiners.
    #[serde(default = "default_history_limit")]
    pub history_limit: usize,
    #[serde(default = "default_max_message_chars")]
    pub max_message_chars: usize,
    #[serde(default = "default_max_name_chars")]
    pub max_name_chars: usize,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            history_limit: DEFAULT_HISTORY_LIMIT,
            max_message_chars: default_max_message_chars(),
            max_name_chars: default_max_name_chars(),
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_client_queue() -> usize {
    DEFAULT_CLIENT_QUEUE
}
fn default_heartbeat_interval_ms() -> u64 {
    HEARTBEAT_INTERVAL_SECS * 1000
}
fn default_history_limit() -> usize {
    DEFAULT_HISTORY_LIMIT
}
fn default_max_message_chars() -> usize {
    2000
}
fn default_max_name_chars() -> usize {
    64
}

impl ParleyConfig {
    /// Load config from a TOML file with env var overrides.
    ///
    /// Precedence, lowest first:
    ///   1. built-in defaults
    ///   2. explicit path argument, else ~/.parley/parley.toml
    ///   3. PARLEY_* variables (`__` separates sections: PARLEY_GATEWAY__PORT)
    ///   4. bare PORT, as set by most hosting platforms
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        Self::figment(&path)
            .extract()
            .map_err(|e| crate::error::ParleyError::Config(e.to_string()))
    }

    fn figment(path: &str) -> Figment {
        Figment::from(Serialized::defaults(ParleyConfig::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("PARLEY_").split("__"))
            .merge(Env::raw().only(&["PORT"]).map(|_| "gateway.port".into()))
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.parley/parley.toml", home)
}
