//! Authoritative in-memory session list with write-through persistence.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

use crate::chat::core::errors::{ChatError, ChatResult};
use crate::chat::core::ids::SessionId;
use crate::chat::core::session::{ChatSession, sorted_by_recent};
use crate::chat::storage::persistence::PersistenceAdapter;

/// Suffix of the slot that receives an unreadable blob before it is replaced.
pub const CORRUPT_SUFFIX: &str = ".corrupt";

struct StoreState {
    /// Insertion order, newest sessions first.
    sessions: Vec<ChatSession>,
    active_id: SessionId,
    /// A save failed and has not been retried successfully yet.
    dirty: bool,
}

/// Session list, active selection, and persistence synchronization.
///
/// Every mutation serializes the full list to the adapter while the state
/// lock is held, so saves land in mutation order. An empty list is never
/// saved.
pub struct SessionStore {
    adapter: Arc<dyn PersistenceAdapter>,
    key: String,
    state: Mutex<StoreState>,
}

impl SessionStore {
    /// Load the session list from `key`, creating a fresh session if nothing usable is stored.
    ///
    /// Never fails: unreadable or corrupt state is logged and treated as no history.
    pub async fn load(adapter: Arc<dyn PersistenceAdapter>, key: impl Into<String>) -> Self {
        let key = key.into();
        let sessions = match adapter.get(&key).await {
            Ok(Some(raw)) => match decode_sessions(&raw) {
                Ok(sessions) => sessions,
                Err(err) => {
                    error!(%key, "discarding unreadable session history: {err}");
                    let backup_key = format!("{key}{CORRUPT_SUFFIX}");
                    if let Err(backup_err) = adapter.set(&backup_key, raw).await {
                        warn!(%backup_key, "failed to back up corrupt history: {backup_err}");
                    }
                    Vec::new()
                }
            },
            Ok(None) => Vec::new(),
            Err(err) => {
                error!(%key, "failed to read session history: {err}");
                Vec::new()
            }
        };

        let active_id = sessions
            .first()
            .map_or_else(SessionId::fallback, |s| s.id.clone());
        let restored = sessions.len();
        let store = Self {
            adapter,
            key,
            state: Mutex::new(StoreState {
                sessions,
                active_id,
                dirty: false,
            }),
        };

        if restored == 0 {
            store.create_session().await;
        } else {
            info!(sessions = restored, "restored chat history");
        }
        store
    }

    /// Create an empty session, prepend it, and make it active.
    pub async fn create_session(&self) -> ChatSession {
        let mut state = self.state.lock().await;
        let mut session = ChatSession::new();
        while state.sessions.iter().any(|s| s.id == session.id) {
            session = ChatSession::new();
        }
        state.sessions.insert(0, session.clone());
        state.active_id = session.id.clone();
        debug!(session_id = %session.id, "created session");
        self.persist(&mut state).await;
        session
    }

    /// Replace the stored session that has the same id.
    ///
    /// Unknown ids are ignored.
    pub async fn update_session(&self, session: ChatSession) {
        let mut state = self.state.lock().await;
        let Some(slot) = state.sessions.iter_mut().find(|s| s.id == session.id) else {
            warn!(session_id = %session.id, "update for unknown session ignored");
            return;
        };
        *slot = session;
        self.persist(&mut state).await;
    }

    /// Remove a session.
    ///
    /// When the active session is removed, the first remaining session in list
    /// order becomes active, or a fresh session is created if none remain.
    pub async fn delete_session(&self, id: &SessionId) {
        let mut state = self.state.lock().await;
        let before = state.sessions.len();
        state.sessions.retain(|s| &s.id != id);
        if state.sessions.len() == before {
            debug!(session_id = %id, "delete for unknown session");
        }

        if &state.active_id == id {
            let next = state.sessions.first().map(|s| s.id.clone());
            match next {
                Some(next) => state.active_id = next,
                None => {
                    drop(state);
                    self.create_session().await;
                    return;
                }
            }
        }
        self.persist(&mut state).await;
    }

    /// Make `id` the active session. The id is not validated.
    pub async fn select_session(&self, id: SessionId) {
        let mut state = self.state.lock().await;
        debug!(session_id = %id, "selected session");
        state.active_id = id;
    }

    /// The active session, or a transient fallback when the active id does not resolve.
    pub async fn active_session(&self) -> ChatSession {
        let state = self.state.lock().await;
        state
            .sessions
            .iter()
            .find(|s| s.id == state.active_id)
            .cloned()
            .unwrap_or_else(ChatSession::fallback)
    }

    /// The active session id as selected, whether or not it resolves.
    pub async fn active_id(&self) -> SessionId {
        self.state.lock().await.active_id.clone()
    }

    /// Look up a session by id.
    pub async fn get(&self, id: &SessionId) -> Option<ChatSession> {
        let state = self.state.lock().await;
        state.sessions.iter().find(|s| &s.id == id).cloned()
    }

    /// All sessions in stored order (newest created first).
    pub async fn sessions(&self) -> Vec<ChatSession> {
        self.state.lock().await.sessions.clone()
    }

    /// All sessions ordered for display, most recently updated first.
    pub async fn sessions_by_recent(&self) -> Vec<ChatSession> {
        sorted_by_recent(&self.state.lock().await.sessions)
    }

    /// Number of stored sessions.
    pub async fn len(&self) -> usize {
        self.state.lock().await.sessions.len()
    }

    /// Whether the store holds no sessions.
    pub async fn is_empty(&self) -> bool {
        self.state.lock().await.sessions.is_empty()
    }

    /// Whether a save failed and has not been retried successfully.
    pub async fn has_pending_save(&self) -> bool {
        self.state.lock().await.dirty
    }

    /// Retry a failed save.
    ///
    /// # Errors
    /// Returns the storage error if the retry fails again.
    pub async fn flush(&self) -> ChatResult<()> {
        let mut state = self.state.lock().await;
        if !state.dirty || state.sessions.is_empty() {
            return Ok(());
        }
        self.save(&state.sessions).await?;
        state.dirty = false;
        info!("flushed pending session history");
        Ok(())
    }

    async fn persist(&self, state: &mut StoreState) {
        if state.sessions.is_empty() {
            return;
        }
        match self.save(&state.sessions).await {
            Ok(()) => state.dirty = false,
            Err(err) => {
                error!(key = %self.key, "failed to save session history: {err}");
                state.dirty = true;
            }
        }
    }

    async fn save(&self, sessions: &[ChatSession]) -> ChatResult<()> {
        let blob = serde_json::to_string(sessions)?;
        self.adapter.set(&self.key, blob).await
    }
}

/// Decode a persisted session list, dropping later duplicates of an id.
///
/// # Errors
/// Returns an error if the blob is not a JSON array of sessions.
pub fn decode_sessions(raw: &str) -> ChatResult<Vec<ChatSession>> {
    let sessions: Vec<ChatSession> =
        serde_json::from_str(raw).map_err(|err| ChatError::CorruptBlob(err.to_string()))?;
    let mut seen = HashSet::with_capacity(sessions.len());
    let total = sessions.len();
    let unique: Vec<ChatSession> = sessions
        .into_iter()
        .filter(|s| seen.insert(s.id.clone()))
        .collect();
    if unique.len() != total {
        warn!(dropped = total - unique.len(), "dropped duplicate session ids");
    }
    Ok(unique)
}
