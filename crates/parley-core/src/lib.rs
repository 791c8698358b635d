pub mod config;
pub mod error;
pub mod types;

pub use error::{ParleyError, Result};
pub use types::{ChatMessage, ConnId, MessageId};
