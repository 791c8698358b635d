pub mod events;
pub mod names;

pub use events::{ClientEvent, ErrorShape, ServerEvent, TypingPayload};
