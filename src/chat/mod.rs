//! Chat sessions: core types, persistence, session store, and turn control.
//!
//! Layering, leaves first:
//! - [`storage`]: whole-blob get/set under a string key.
//! - [`store`]: the authoritative session list and active selection.
//! - [`conversation`]: one user turn and its generated reply.

pub mod conversation;
pub mod core;
pub mod storage;
pub mod store;

pub use conversation::{ConversationController, TurnOutcome, TurnRejection};
pub use core::{
    AppConfig, ChatError, ChatResult, ChatSession, Message, MessageId, MessageSource, Role,
    SessionId,
};
pub use storage::{MemoryPersistence, PersistenceAdapter, SqliteSlotStore, open_adapter};
pub use store::SessionStore;
