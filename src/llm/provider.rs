//! Generation provider abstraction.

use std::future::Future;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::chat::core::message::{Message, MessageSource, Role};

/// Fixed reply used when the provider call fails.
pub const APOLOGY_TEXT: &str =
    "The financial intelligence bridge is experiencing latency. Please try again shortly.";

/// Fixed reply used when the provider answers without any text.
pub const EMPTY_REPLY_TEXT: &str = "I apologize, I'm unable to process that request right now.";

/// Boxed future type for generation calls.
pub type GenerateFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Role tag understood by the provider.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryRole {
    /// User turn.
    User,
    /// Model turn.
    Model,
}

impl HistoryRole {
    /// Wire form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Model => "model",
        }
    }
}

impl From<Role> for HistoryRole {
    fn from(role: Role) -> Self {
        match role {
            Role::User => Self::User,
            Role::Assistant => Self::Model,
        }
    }
}

/// One prior turn as sent to the provider.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Who produced the text.
    pub role: HistoryRole,
    /// Turn text.
    pub text: String,
}

impl From<&Message> for HistoryEntry {
    fn from(message: &Message) -> Self {
        Self {
            role: message.role.into(),
            text: message.content.clone(),
        }
    }
}

/// Best-effort provider reply.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Generation {
    /// Reply text.
    pub text: String,
    /// Grounding citations in provider order.
    pub sources: Vec<MessageSource>,
}

impl Generation {
    /// The fixed failure reply with no sources.
    #[must_use]
    pub fn apology() -> Self {
        Self {
            text: APOLOGY_TEXT.to_string(),
            sources: Vec::new(),
        }
    }
}

/// External text generator.
///
/// Implementations must not fail: any internal error is downgraded to
/// [`Generation::apology`].
pub trait GenerationProvider: Send + Sync {
    /// Generate a reply to `prompt` given the full running `history`.
    fn generate<'a>(
        &'a self,
        prompt: &'a str,
        history: &'a [HistoryEntry],
    ) -> GenerateFuture<'a, Generation>;
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assistant_maps_to_model() {
        let reply = Message::assistant("Yields are flat.", Vec::new());
        let entry = HistoryEntry::from(&reply);
        assert_eq!(entry.role, HistoryRole::Model);
        assert_eq!(entry.role.as_str(), "model");
        assert_eq!(entry.text, "Yields are flat.");

        let question = Message::user("Yields?");
        assert_eq!(HistoryEntry::from(&question).role, HistoryRole::User);
    }

    #[test]
    fn test_apology_has_no_sources() {
        let apology = Generation::apology();
        assert_eq!(apology.text, APOLOGY_TEXT);
        assert!(apology.sources.is_empty());
    }
}
