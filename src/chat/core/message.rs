//! Chat message model.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::chat::core::ids::MessageId;
use crate::chat::core::time::{self, iso_millis};

/// Number of characters shown for a source title before it is elided.
pub const SOURCE_TITLE_CHARS: usize = 30;

/// Author of a message.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// User input.
    User,
    /// Generated reply.
    Assistant,
}

impl Role {
    /// Stable string form for storage.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            _ => Err(value.to_string()),
        }
    }
}

/// A grounding citation attached to a generated reply.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct MessageSource {
    /// Page title.
    pub title: String,
    /// Page address.
    pub uri: String,
}

impl MessageSource {
    /// Build a source, keeping it only when both fields are non-empty.
    #[must_use]
    pub fn new(title: impl Into<String>, uri: impl Into<String>) -> Option<Self> {
        let title = title.into();
        let uri = uri.into();
        if title.is_empty() || uri.is_empty() {
            return None;
        }
        Some(Self { title, uri })
    }

    /// Title shortened for compact display (first 30 characters, then `...`).
    #[must_use]
    pub fn short_title(&self) -> String {
        if self.title.chars().count() <= SOURCE_TITLE_CHARS {
            return self.title.clone();
        }
        let mut short: String = self.title.chars().take(SOURCE_TITLE_CHARS).collect();
        short.push_str("...");
        short
    }
}

/// A single message in a chat session. Immutable once created.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Unique identifier.
    pub id: MessageId,
    /// Author of the message.
    pub role: Role,
    /// Text payload.
    pub content: String,
    /// Creation time.
    #[serde(with = "iso_millis")]
    pub timestamp: DateTime<Utc>,
    /// Grounding citations; absent rather than empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sources: Option<Vec<MessageSource>>,
}

impl Message {
    /// Build a user message stamped now.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: MessageId::new(),
            role: Role::User,
            content: content.into(),
            timestamp: time::now(),
            sources: None,
        }
    }

    /// Build an assistant message stamped now.
    ///
    /// An empty source list is stored as "no sources".
    #[must_use]
    pub fn assistant(content: impl Into<String>, sources: Vec<MessageSource>) -> Self {
        Self {
            id: MessageId::new(),
            role: Role::Assistant,
            content: content.into(),
            timestamp: time::now(),
            sources: if sources.is_empty() {
                None
            } else {
                Some(sources)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_requires_title_and_uri() {
        assert!(MessageSource::new("Reuters", "https://reuters.com").is_some());
        assert!(MessageSource::new("", "https://reuters.com").is_none());
        assert!(MessageSource::new("Reuters", "").is_none());
    }

    #[test]
    fn test_short_title() {
        let short = MessageSource::new("Fed", "https://fed.gov").unwrap_or_else(|| MessageSource {
            title: String::new(),
            uri: String::new(),
        });
        assert_eq!(short.short_title(), "Fed");

        let long = MessageSource {
            title: "Markets rally as inflation cools further in October".to_string(),
            uri: "https://example.com".to_string(),
        };
        assert_eq!(long.short_title(), "Markets rally as inflation coo...");
    }

    #[test]
    fn test_assistant_without_sources_has_none() {
        let msg = Message::assistant("hello", Vec::new());
        assert_eq!(msg.role, Role::Assistant);
        assert!(msg.sources.is_none());

        let json = serde_json::to_string(&msg).unwrap_or_default();
        assert!(!json.contains("sources"));
    }

    #[test]
    fn test_wire_format_matches_browser_blob() {
        let raw = r#"{
            "id": "1718000000001",
            "role": "assistant",
            "content": "**S&P 500** is up.",
            "timestamp": "2024-06-10T06:13:20.001Z",
            "sources": [{"title": "Reuters", "uri": "https://reuters.com/markets"}]
        }"#;
        let parsed: Result<Message, _> = serde_json::from_str(raw);
        assert!(parsed.is_ok());
        let msg = parsed.unwrap_or_else(|_| Message::user(""));
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.id.as_str(), "1718000000001");
        assert_eq!(msg.sources.map(|s| s.len()), Some(1));
    }

    #[test]
    fn test_role_parse() {
        assert_eq!("user".parse::<Role>(), Ok(Role::User));
        assert_eq!("assistant".parse::<Role>(), Ok(Role::Assistant));
        assert!("model".parse::<Role>().is_err());
    }
}
