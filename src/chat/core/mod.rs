//! Core chat types, identifiers, and configuration.

pub mod config;
pub mod errors;
pub mod ids;
pub mod message;
pub mod session;
pub mod time;

pub use config::{AppConfig, ProviderConfig, ServerConfig, StorageBackend, StorageConfig};
pub use errors::{ChatError, ChatResult};
pub use ids::{MessageId, SessionId};
pub use message::{Message, MessageSource, Role};
pub use session::{ChatSession, DEFAULT_TITLE, sorted_by_recent, title_from};
