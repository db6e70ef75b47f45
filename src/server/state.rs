//! Application state shared across all request handlers.

use std::path::PathBuf;
use std::sync::Arc;

use crate::chat::conversation::ConversationController;
use crate::chat::store::SessionStore;
use crate::llm::provider::GenerationProvider;

/// Shared application state.
pub struct AppState {
    /// Session list and active selection.
    pub store: Arc<SessionStore>,
    /// Turn runner over `store`.
    pub controller: ConversationController,
    /// Directory served for non-API paths.
    pub static_dir: PathBuf,
}

impl AppState {
    /// Wire a store and a provider into shared state.
    #[must_use]
    pub fn new(
        store: Arc<SessionStore>,
        provider: Arc<dyn GenerationProvider>,
        static_dir: impl Into<PathBuf>,
    ) -> Arc<Self> {
        let controller = ConversationController::new(Arc::clone(&store), provider);
        Arc::new(Self {
            store,
            controller,
            static_dir: static_dir.into(),
        })
    }
}
