//! Dialogue router: remote NLU first, local rules as fallback.
//!
//! Owns every active session. A submission appends the user message,
//! releases the session lock for the remote call, then appends exactly one
//! assistant message. While a session awaits its reply, further
//! submissions to it are rejected with [`SubmitOutcome::Busy`]. If the
//! caller drops `submit` mid-call, the turn is closed with the local answer.
//! Idle sessions past the timeout are dropped whenever a session is opened
//! or submitted to.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Local;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use esg_core::{Message, UserProfile};

use crate::error::ChatError;
use crate::matcher::{IntentMatcher, MatchSource};
use crate::remote::{RemoteDialogueClient, RemoteReply};
use crate::session::{DialogueSession, SessionSummary};

/// Which component produced an assistant reply.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "rule")]
pub enum ReplySource {
    Remote,
    ExactMatch,
    KeywordRule(usize),
    Default,
}

impl From<MatchSource> for ReplySource {
    fn from(source: MatchSource) -> Self {
        match source {
            MatchSource::ExactMatch => ReplySource::ExactMatch,
            MatchSource::KeywordRule(i) => ReplySource::KeywordRule(i),
            MatchSource::Default => ReplySource::Default,
        }
    }
}

/// Result of [`DialogueRouter::submit`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// The turn completed; `reply` is the appended assistant message.
    Replied {
        session_id: Uuid,
        reply: Message,
        source: ReplySource,
    },
    /// Blank utterance; nothing was appended.
    Ignored { session_id: Option<Uuid> },
    /// The session is still awaiting a previous reply; nothing was appended.
    Busy { session_id: Uuid },
}

impl SubmitOutcome {
    pub fn session_id(&self) -> Option<Uuid> {
        match self {
            SubmitOutcome::Replied { session_id, .. } | SubmitOutcome::Busy { session_id } => {
                Some(*session_id)
            }
            SubmitOutcome::Ignored { session_id } => *session_id,
        }
    }
}

/// Idle time after which a session is dropped, unless overridden.
pub const DEFAULT_SESSION_TIMEOUT_MINUTES: u32 = 30;

/// Orchestrates remote and local answering over per-session transcripts.
pub struct DialogueRouter {
    remote: Arc<dyn RemoteDialogueClient>,
    matcher: IntentMatcher,
    sessions: Mutex<HashMap<Uuid, DialogueSession>>,
    session_timeout_secs: i64,
}

impl DialogueRouter {
    pub fn new(remote: Arc<dyn RemoteDialogueClient>, matcher: IntentMatcher) -> Self {
        Self {
            remote,
            matcher,
            sessions: Mutex::new(HashMap::new()),
            session_timeout_secs: i64::from(DEFAULT_SESSION_TIMEOUT_MINUTES) * 60,
        }
    }

    /// Set the idle timeout. 0 keeps sessions until they are closed.
    pub fn with_session_timeout(mut self, minutes: u32) -> Self {
        self.session_timeout_secs = i64::from(minutes) * 60;
        self
    }

    pub fn matcher(&self) -> &IntentMatcher {
        &self.matcher
    }

    /// Open a session seeded with the catalog greeting.
    pub fn open_session(&self, profile: Option<UserProfile>) -> DialogueSession {
        let session = DialogueSession::new(self.matcher.knowledge().greeting(), profile);
        info!(session_id = %session.id, "Dialogue session opened");
        let mut sessions = self.lock_sessions();
        self.evict_expired(&mut sessions);
        sessions.insert(session.id, session.clone());
        session
    }

    /// Submit one utterance.
    ///
    /// An absent, unknown or expired `session_id` opens a new session. Blank
    /// input is ignored. Never fails: remote errors fall back to the local
    /// matcher.
    pub async fn submit(&self, session_id: Option<Uuid>, utterance: &str) -> SubmitOutcome {
        if utterance.trim().is_empty() {
            debug!("Ignoring blank utterance");
            return SubmitOutcome::Ignored { session_id };
        }

        let sid = {
            let mut sessions = self.lock_sessions();
            self.evict_expired(&mut sessions);
            let sid = session_id
                .filter(|id| sessions.contains_key(id))
                .unwrap_or_else(Uuid::new_v4);
            let greeting = self.matcher.knowledge().greeting();
            let session = sessions
                .entry(sid)
                .or_insert_with(|| DialogueSession::with_id(sid, greeting, None));

            if session.is_awaiting_reply() {
                warn!(session_id = %sid, "Submission rejected: reply still pending");
                return SubmitOutcome::Busy { session_id: sid };
            }
            session.begin_turn(utterance);
            sid
        };

        let turn = PendingTurn {
            router: self,
            session_id: sid,
            utterance,
            finished: false,
        };

        let (text, source) = match self.remote.send(utterance).await {
            RemoteReply::Text(text) => (text, ReplySource::Remote),
            RemoteReply::NoAnswer => {
                debug!(session_id = %sid, "Remote NLU had no answer, using local rules");
                self.answer_locally(utterance)
            }
            RemoteReply::Failed(failure) => {
                warn!(
                    session_id = %sid,
                    kind = failure.kind(),
                    error = %failure,
                    "Remote NLU failed, using local rules"
                );
                self.answer_locally(utterance)
            }
        };

        let reply = turn.finish(text);

        info!(session_id = %sid, source = ?source, "Reply appended");
        SubmitOutcome::Replied {
            session_id: sid,
            reply,
            source,
        }
    }

    /// Snapshot of a session.
    pub fn session(&self, session_id: Uuid) -> Option<DialogueSession> {
        self.lock_sessions().get(&session_id).cloned()
    }

    /// Transcript of a session, oldest first.
    pub fn transcript(&self, session_id: Uuid) -> Result<Vec<Message>, ChatError> {
        self.lock_sessions()
            .get(&session_id)
            .map(|s| s.transcript.clone())
            .ok_or(ChatError::SessionNotFound(session_id))
    }

    pub fn list_sessions(&self) -> Vec<SessionSummary> {
        let sessions = self.lock_sessions();
        let mut ordered: Vec<&DialogueSession> = sessions.values().collect();
        ordered.sort_by_key(|s| s.started_at);
        ordered.into_iter().map(DialogueSession::summary).collect()
    }

    /// Close a session and drop its transcript.
    pub fn close_session(&self, session_id: Uuid) -> Result<(), ChatError> {
        match self.lock_sessions().remove(&session_id) {
            Some(_) => {
                info!(session_id = %session_id, "Dialogue session closed");
                Ok(())
            }
            None => Err(ChatError::SessionNotFound(session_id)),
        }
    }

    pub fn session_count(&self) -> usize {
        self.lock_sessions().len()
    }

    // -- Private helpers --

    fn answer_locally(&self, utterance: &str) -> (String, ReplySource) {
        let resolution = self.matcher.resolve(utterance);
        (resolution.text.to_string(), resolution.source.into())
    }

    /// Append the assistant reply that closes the pending turn.
    fn complete_turn(&self, session_id: Uuid, text: String) -> Message {
        match self.lock_sessions().get_mut(&session_id) {
            Some(session) => session.complete_turn(text),
            None => {
                debug!(session_id = %session_id, "Session closed before its reply arrived");
                Message::assistant(text)
            }
        }
    }

    fn evict_expired(&self, sessions: &mut HashMap<Uuid, DialogueSession>) {
        let now = Local::now().timestamp();
        let before = sessions.len();
        sessions.retain(|_, s| !s.is_expired(self.session_timeout_secs, now));
        let evicted = before - sessions.len();
        if evicted > 0 {
            info!(evicted, remaining = sessions.len(), "Expired dialogue sessions dropped");
        }
    }

    fn lock_sessions(&self) -> MutexGuard<'_, HashMap<Uuid, DialogueSession>> {
        self.sessions.lock().unwrap_or_else(|poisoned| {
            error!("Session lock poisoned, recovering");
            poisoned.into_inner()
        })
    }
}

// =============================================================================
// Pending turn
// =============================================================================

/// A turn whose user message is recorded but whose reply is not. Dropping it
/// unfinished (the `submit` future was cancelled) closes the turn with the
/// local answer so the session never stays `AwaitingReply`.
struct PendingTurn<'a> {
    router: &'a DialogueRouter,
    session_id: Uuid,
    utterance: &'a str,
    finished: bool,
}

impl PendingTurn<'_> {
    fn finish(mut self, text: String) -> Message {
        self.finished = true;
        self.router.complete_turn(self.session_id, text)
    }
}

impl Drop for PendingTurn<'_> {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        let (text, source) = self.router.answer_locally(self.utterance);
        warn!(
            session_id = %self.session_id,
            source = ?source,
            "Submission cancelled while awaiting the remote reply, answered locally"
        );
        self.router.complete_turn(self.session_id, text);
    }
}

// =============================================================================
// Tests
// =============================================================================
