//! Conversation turns against the session store.

pub mod controller;
pub mod history;

pub use controller::{ConversationController, TurnOutcome, TurnRejection};
pub use history::build_history;
