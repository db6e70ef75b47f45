//! Turn orchestration: user message, provider call, assistant message.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, info, warn};

use crate::chat::conversation::history::build_history;
use crate::chat::core::message::Message;
use crate::chat::core::session::ChatSession;
use crate::chat::store::SessionStore;
use crate::llm::provider::GenerationProvider;

/// Why a submission was not processed.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum TurnRejection {
    /// Input was empty or whitespace only.
    EmptyInput,
    /// Another turn is still waiting for its reply.
    Busy,
}

/// Result of [`ConversationController::submit_turn`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum TurnOutcome {
    /// Both messages were appended; carries the final session state.
    Completed(ChatSession),
    /// Nothing changed.
    Ignored(TurnRejection),
}

/// Clears the in-flight flag when the turn ends, whatever the path.
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Runs one conversational turn at a time against a session store.
pub struct ConversationController {
    store: Arc<SessionStore>,
    provider: Arc<dyn GenerationProvider>,
    in_flight: AtomicBool,
}

impl ConversationController {
    /// Create a controller over `store` using `provider` for replies.
    #[must_use]
    pub const fn new(store: Arc<SessionStore>, provider: Arc<dyn GenerationProvider>) -> Self {
        Self {
            store,
            provider,
            in_flight: AtomicBool::new(false),
        }
    }

    /// Whether a turn is waiting for its reply.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Append `user_text` to `session`, generate a reply, and append it.
    ///
    /// The session is written to the store twice: once with the user message
    /// so it shows immediately, once with the reply.
    pub async fn submit_turn(&self, session: ChatSession, user_text: &str) -> TurnOutcome {
        if user_text.trim().is_empty() {
            debug!(session_id = %session.id, "ignoring empty submission");
            return TurnOutcome::Ignored(TurnRejection::EmptyInput);
        }
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            warn!(session_id = %session.id, "turn already in flight, submission ignored");
            return TurnOutcome::Ignored(TurnRejection::Busy);
        }
        let _guard = InFlightGuard(&self.in_flight);

        let mut session = session;
        session.push(Message::user(user_text));
        self.store.update_session(session.clone()).await;

        let history = build_history(&session.messages);
        let generation = self.provider.generate(user_text, &history).await;

        let sources = generation.sources.len();
        session.push(Message::assistant(generation.text, generation.sources));
        self.store.update_session(session.clone()).await;

        info!(
            session_id = %session.id,
            messages = session.messages.len(),
            sources,
            "turn completed"
        );
        TurnOutcome::Completed(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chat::core::message::{MessageSource, Role};
    use crate::chat::core::session::DEFAULT_TITLE;
    use crate::chat::storage::persistence::{MemoryPersistence, PersistenceAdapter};
    use crate::chat::store::decode_sessions;
    use crate::llm::provider::testing::ScriptedProvider;
    use crate::llm::provider::{APOLOGY_TEXT, Generation, HistoryRole};
    use tokio::sync::Notify;

    const KEY: &str = "stoxara_sessions";

    async fn fixture(
        provider: Arc<ScriptedProvider>,
    ) -> (Arc<MemoryPersistence>, Arc<SessionStore>, ConversationController) {
        let adapter = Arc::new(MemoryPersistence::new());
        let dyn_adapter: Arc<dyn PersistenceAdapter> = adapter.clone();
        let store = Arc::new(SessionStore::load(dyn_adapter, KEY).await);
        let dyn_provider: Arc<dyn GenerationProvider> = provider;
        let controller = ConversationController::new(Arc::clone(&store), dyn_provider);
        (adapter, store, controller)
    }

    fn completed(outcome: TurnOutcome) -> ChatSession {
        match outcome {
            TurnOutcome::Completed(session) => session,
            TurnOutcome::Ignored(_) => ChatSession::fallback(),
        }
    }

    #[tokio::test]
    async fn test_turn_appends_user_and_reply() {
        let source = MessageSource::new("Markets wrap", "https://news.example/wrap");
        let provider = Arc::new(ScriptedProvider::replying(vec![Generation {
            text: "Equities are **higher**.".to_string(),
            sources: source.into_iter().collect(),
        }]));
        let (adapter, store, controller) = fixture(Arc::clone(&provider)).await;

        let session = store.active_session().await;
        let session = completed(
            controller
                .submit_turn(session, "What is the S&P 500 doing today?")
                .await,
        );

        assert_eq!(session.messages.len(), 2);
        assert_eq!(session.messages[0].role, Role::User);
        assert_eq!(session.messages[0].content, "What is the S&P 500 doing today?");
        assert_eq!(session.messages[1].role, Role::Assistant);
        assert_eq!(session.messages[1].content, "Equities are **higher**.");
        assert_eq!(session.messages[1].sources.as_ref().map(Vec::len), Some(1));
        assert_eq!(session.title, "What is the S&P 500 doing toda");

        assert_eq!(store.get(&session.id).await.as_ref(), Some(&session));
        let persisted = adapter
            .snapshot(KEY)
            .and_then(|raw| decode_sessions(&raw).ok())
            .unwrap_or_default();
        assert_eq!(persisted, vec![session]);
        assert!(!controller.is_busy());
    }

    #[tokio::test]
    async fn test_provider_failure_records_apology() {
        let provider = Arc::new(ScriptedProvider::replying(Vec::new()));
        let (_adapter, store, controller) = fixture(provider).await;

        let session = store.active_session().await;
        let session = completed(controller.submit_turn(session, "Oil price?").await);

        assert_eq!(session.messages.len(), 2);
        assert_eq!(session.messages[1].content, APOLOGY_TEXT);
        assert!(session.messages[1].sources.is_none());
    }

    #[tokio::test]
    async fn test_title_set_once() {
        let provider = Arc::new(ScriptedProvider::replying(Vec::new()));
        let (_adapter, store, controller) = fixture(provider).await;

        let session = store.active_session().await;
        assert_eq!(session.title, DEFAULT_TITLE);
        let session = completed(controller.submit_turn(session, "First question").await);
        let session = completed(controller.submit_turn(session, "Second question").await);

        assert_eq!(session.title, "First question");
        assert_eq!(session.messages.len(), 4);
    }

    #[tokio::test]
    async fn test_history_includes_new_user_turn() {
        let provider = Arc::new(ScriptedProvider::replying(vec![
            Generation {
                text: "Rates held.".to_string(),
                sources: Vec::new(),
            },
            Generation {
                text: "Next meeting in December.".to_string(),
                sources: Vec::new(),
            },
        ]));
        let (_adapter, store, controller) = fixture(Arc::clone(&provider)).await;

        let session = store.active_session().await;
        let session = completed(controller.submit_turn(session, "Fed decision?").await);
        completed(controller.submit_turn(session, "When next?").await);

        let calls = provider.calls();
        assert_eq!(calls.len(), 2);
        let (prompt, history) = &calls[1];
        assert_eq!(prompt, "When next?");
        let roles: Vec<HistoryRole> = history.iter().map(|h| h.role).collect();
        assert_eq!(
            roles,
            vec![HistoryRole::User, HistoryRole::Model, HistoryRole::User]
        );
        assert_eq!(history[1].text, "Rates held.");
        assert_eq!(history[2].text, "When next?");
    }

    #[tokio::test]
    async fn test_blank_input_ignored() {
        let provider = Arc::new(ScriptedProvider::replying(Vec::new()));
        let (_adapter, store, controller) = fixture(Arc::clone(&provider)).await;

        let session = store.active_session().await;
        let outcome = controller.submit_turn(session.clone(), "  \n\t ").await;

        assert_eq!(outcome, TurnOutcome::Ignored(TurnRejection::EmptyInput));
        assert!(provider.calls().is_empty());
        assert_eq!(store.active_session().await, session);
    }

    #[tokio::test]
    async fn test_second_submission_ignored_while_in_flight() {
        let gate = Arc::new(Notify::new());
        let provider = Arc::new(ScriptedProvider::gated(
            vec![Generation {
                text: "Done.".to_string(),
                sources: Vec::new(),
            }],
            Arc::clone(&gate),
        ));
        let (_adapter, store, controller) = fixture(Arc::clone(&provider)).await;
        let controller = Arc::new(controller);

        let session = store.active_session().await;
        let first = {
            let controller = Arc::clone(&controller);
            let session = session.clone();
            tokio::spawn(async move { controller.submit_turn(session, "first").await })
        };

        while provider.calls().is_empty() {
            tokio::task::yield_now().await;
        }
        assert!(controller.is_busy());

        // The optimistic write is visible while the reply is pending.
        let pending = store.get(&session.id).await.unwrap_or_default();
        assert_eq!(pending.messages.len(), 1);

        let second = controller.submit_turn(session.clone(), "second").await;
        assert_eq!(second, TurnOutcome::Ignored(TurnRejection::Busy));

        gate.notify_one();
        let first = first.await.ok().map(completed).unwrap_or_default();
        assert_eq!(first.messages.len(), 2);
        assert_eq!(first.messages[0].content, "first");
        assert_eq!(provider.calls().len(), 1);
        assert!(!controller.is_busy());
    }
}
