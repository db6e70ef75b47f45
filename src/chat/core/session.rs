//! Chat session model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chat::core::ids::SessionId;
use crate::chat::core::message::{Message, Role};
use crate::chat::core::time::{self, iso_millis};

/// Title given to sessions that have not received a user message yet.
pub const DEFAULT_TITLE: &str = "New Chat";

/// Title shown in listings when a session title is empty.
pub const UNTITLED_LABEL: &str = "Draft Analysis";

/// Number of characters of the first user message used as the title.
pub const TITLE_CHARS: usize = 30;

/// One persisted conversation thread.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    /// Unique identifier.
    pub id: SessionId,
    /// Display title.
    pub title: String,
    /// Messages in insertion order.
    pub messages: Vec<Message>,
    /// Last mutation time.
    #[serde(with = "iso_millis")]
    pub updated_at: DateTime<Utc>,
}

impl ChatSession {
    /// Create an empty session titled "New Chat".
    #[must_use]
    pub fn new() -> Self {
        Self::with_id(SessionId::new())
    }

    /// Create an empty session with a given identifier.
    #[must_use]
    pub fn with_id(id: SessionId) -> Self {
        Self {
            id,
            title: DEFAULT_TITLE.to_string(),
            messages: Vec::new(),
            updated_at: time::now(),
        }
    }

    /// Transient placeholder used when the active id does not resolve.
    ///
    /// Never stored or persisted.
    #[must_use]
    pub fn fallback() -> Self {
        Self::with_id(SessionId::fallback())
    }

    /// Whether the session still carries the default title.
    #[must_use]
    pub fn has_default_title(&self) -> bool {
        self.title == DEFAULT_TITLE
    }

    /// Title for listings, substituting a label for empty titles.
    #[must_use]
    pub fn display_title(&self) -> &str {
        if self.title.is_empty() {
            UNTITLED_LABEL
        } else {
            &self.title
        }
    }

    /// Append a message and refresh `updated_at`.
    ///
    /// The first user message replaces the default title with its first
    /// 30 characters.
    pub fn push(&mut self, message: Message) {
        if self.has_default_title() && message.role == Role::User {
            self.title = title_from(&message.content);
        }
        self.messages.push(message);
        self.updated_at = time::now();
    }
}

impl Default for ChatSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Derive a session title from user text: its first 30 characters, no ellipsis.
#[must_use]
pub fn title_from(text: &str) -> String {
    text.chars().take(TITLE_CHARS).collect()
}

/// Sessions ordered for display: most recently updated first.
///
/// Ties keep their stored order.
#[must_use]
pub fn sorted_by_recent(sessions: &[ChatSession]) -> Vec<ChatSession> {
    let mut sorted = sessions.to_vec();
    sorted.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
    sorted
}
