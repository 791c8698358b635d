// Event names on the wire — must match the browser client.

// client → server
pub const JOIN: &str = "join";
pub const SEND_MESSAGE: &str = "send-message";
pub const TYPING: &str = "typing";

// server → client
pub const CHAT_HISTORY: &str = "chat-history";
pub const NEW_MESSAGE: &str = "new-message";
pub const USER_JOINED: &str = "user-joined";
pub const USER_LEFT: &str = "user-left";
pub const UPDATE_ONLINE_COUNT: &str = "update-online-count";
pub const USER_TYPING: &str = "user-typing";
pub const ERROR: &str = "error";
