pub mod error;
pub mod history;
pub mod registry;

pub use error::SessionError;
pub use history::HistoryBuffer;
pub use registry::SessionRegistry;
