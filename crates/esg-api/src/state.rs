//! Application state shared across all route handlers.

use std::sync::Arc;
use std::time::Instant;

use esg_chat::{DialogueRouter, IntentMatcher, QuestionIndex, RemoteDialogueClient};
use esg_core::{EsgConfig, KnowledgeBase};

/// Shared application state, passed to handlers via axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<EsgConfig>,
    pub knowledge: Arc<KnowledgeBase>,
    pub index: Arc<QuestionIndex>,
    pub router: Arc<DialogueRouter>,
    /// Server start time for uptime calculation.
    pub start_time: Instant,
}

impl AppState {
    /// Wire the index and dialogue router over one knowledge base.
    pub fn new(
        config: EsgConfig,
        knowledge: KnowledgeBase,
        remote: Arc<dyn RemoteDialogueClient>,
    ) -> Self {
        let knowledge = Arc::new(knowledge);
        let index = QuestionIndex::new(Arc::clone(&knowledge));
        let matcher = IntentMatcher::new(Arc::clone(&knowledge));
        let router = DialogueRouter::new(remote, matcher)
            .with_session_timeout(config.chat.session_timeout_minutes);
        Self {
            config: Arc::new(config),
            knowledge,
            index: Arc::new(index),
            router: Arc::new(router),
            start_time: Instant::now(),
        }
    }
}
