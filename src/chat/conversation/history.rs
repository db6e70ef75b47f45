//! Provider history built from a session transcript.

use crate::chat::core::message::Message;
use crate::llm::provider::HistoryEntry;

/// Map every message, in order, to a provider history entry.
#[must_use]
pub fn build_history(messages: &[Message]) -> Vec<HistoryEntry> {
    messages.iter().map(HistoryEntry::from).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::provider::HistoryRole;

    #[test]
    fn test_history_keeps_order_and_maps_roles() {
        let messages = vec![
            Message::user("Is gold up?"),
            Message::assistant("Gold is **up 1.2%**.", Vec::new()),
            Message::user("And silver?"),
        ];
        let history = build_history(&messages);
        let roles: Vec<HistoryRole> = history.iter().map(|h| h.role).collect();
        assert_eq!(
            roles,
            vec![HistoryRole::User, HistoryRole::Model, HistoryRole::User]
        );
        assert_eq!(history[2].text, "And silver?");
    }

    #[test]
    fn test_empty_transcript() {
        assert!(build_history(&[]).is_empty());
    }
}
