//! Dialogue session state and transcript.
//!
//! A session owns its transcript exclusively. It alternates between
//! `Idle` and `AwaitingReply`; there is no terminal failure state.

use chrono::{DateTime, Local, TimeZone};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use esg_core::{Message, UserProfile};

/// Where a session is in its request/reply cycle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    #[default]
    Idle,
    AwaitingReply,
}

/// One user's conversation. Destroyed when closed; nothing is persisted.
#[derive(Clone, Debug)]
pub struct DialogueSession {
    pub id: Uuid,
    pub state: SessionState,
    pub transcript: Vec<Message>,
    pub profile: Option<UserProfile>,
    pub started_at: i64,
    pub last_message_at: i64,
}

impl DialogueSession {
    /// Fresh session whose transcript opens with `greeting`.
    pub fn new(greeting: &str, profile: Option<UserProfile>) -> Self {
        Self::with_id(Uuid::new_v4(), greeting, profile)
    }

    pub(crate) fn with_id(id: Uuid, greeting: &str, profile: Option<UserProfile>) -> Self {
        let now = Local::now().timestamp();
        Self {
            id,
            state: SessionState::Idle,
            transcript: vec![Message::assistant(greeting)],
            profile,
            started_at: now,
            last_message_at: now,
        }
    }

    pub fn is_awaiting_reply(&self) -> bool {
        self.state == SessionState::AwaitingReply
    }

    /// Record the user's utterance and wait for a reply.
    pub(crate) fn begin_turn(&mut self, utterance: &str) {
        self.transcript.push(Message::user(utterance));
        self.state = SessionState::AwaitingReply;
        self.last_message_at = Local::now().timestamp();
    }

    /// Record the assistant's reply and return to `Idle`.
    pub(crate) fn complete_turn(&mut self, reply: String) -> Message {
        let message = Message::assistant(reply);
        self.transcript.push(message.clone());
        self.state = SessionState::Idle;
        self.last_message_at = Local::now().timestamp();
        message
    }

    /// Whether the session has sat idle longer than `timeout_secs` as of
    /// `now`. A session awaiting its reply never expires; a timeout of 0
    /// disables expiry.
    pub fn is_expired(&self, timeout_secs: i64, now: i64) -> bool {
        timeout_secs > 0 && !self.is_awaiting_reply() && now - self.last_message_at > timeout_secs
    }

    /// Avatar initials for the session's user, `"U"` when anonymous.
    pub fn user_initials(&self) -> String {
        self.profile
            .as_ref()
            .map(UserProfile::initials)
            .unwrap_or_else(|| "U".to_string())
    }

    pub fn summary(&self) -> SessionSummary {
        SessionSummary {
            id: self.id,
            started_at: format_epoch(self.started_at),
            last_message_at: format_epoch(self.last_message_at),
            message_count: self.transcript.len(),
            state: self.state,
        }
    }
}

/// Listing entry for a session.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: Uuid,
    pub started_at: String,
    pub last_message_at: String,
    pub message_count: usize,
    pub state: SessionState,
}

/// Format epoch seconds as ISO 8601 string.
fn format_epoch(epoch: i64) -> String {
    chrono::Local
        .timestamp_opt(epoch, 0)
        .single()
        .map(|dt: DateTime<Local>| dt.to_rfc3339())
        .unwrap_or_else(|| epoch.to_string())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use esg_core::Role;

    const GREETING: &str = "Bonjour, je suis votre assistant ESG.";

    #[test]
    fn test_new_session_has_greeting() {
        let s = DialogueSession::new(GREETING, None);
        assert_ne!(s.id, Uuid::nil());
        assert_eq!(s.state, SessionState::Idle);
        assert_eq!(s.transcript.len(), 1);
        assert_eq!(s.transcript[0].role, Role::Assistant);
        assert_eq!(s.transcript[0].content, GREETING);
    }

    #[test]
    fn test_turn_cycle() {
        let mut s = DialogueSession::new(GREETING, None);
        s.begin_turn("Quel est notre taux d'absentéisme?");
        assert!(s.is_awaiting_reply());
        assert_eq!(s.transcript.last().unwrap().role, Role::User);

        let reply = s.complete_turn("4,2 %".to_string());
        assert_eq!(reply.role, Role::Assistant);
        assert_eq!(s.state, SessionState::Idle);
        assert_eq!(s.transcript.len(), 3);
        assert_eq!(s.transcript[1].content, "Quel est notre taux d'absentéisme?");
    }

    // ---- Expiry ----

    #[test]
    fn test_session_not_expired() {
        let s = DialogueSession::new(GREETING, None);
        assert!(!s.is_expired(30 * 60, Local::now().timestamp()));
    }

    #[test]
    fn test_session_expired() {
        let mut s = DialogueSession::new(GREETING, None);
        s.last_message_at = Local::now().timestamp() - 31 * 60; // 31 min ago
        assert!(s.is_expired(30 * 60, Local::now().timestamp()));
    }

    #[test]
    fn test_session_exactly_at_timeout() {
        let s = DialogueSession::new(GREETING, None);
        assert!(!s.is_expired(60, s.last_message_at + 60));
        assert!(s.is_expired(60, s.last_message_at + 61));
    }

    #[test]
    fn test_awaiting_session_never_expires() {
        let mut s = DialogueSession::new(GREETING, None);
        s.begin_turn("question");
        assert!(!s.is_expired(60, s.last_message_at + 3600));
    }

    #[test]
    fn test_zero_timeout_disables_expiry() {
        let s = DialogueSession::new(GREETING, None);
        assert!(!s.is_expired(0, s.last_message_at + 1_000_000));
    }

    #[test]
    fn test_user_initials() {
        let anonymous = DialogueSession::new(GREETING, None);
        assert_eq!(anonymous.user_initials(), "U");

        let profile = UserProfile {
            email: "marie.curie@example.fr".to_string(),
            first_name: Some("Marie".to_string()),
            last_name: Some("Curie".to_string()),
            company: Some("Radium SA".to_string()),
            role: "admin".to_string(),
        };
        let named = DialogueSession::new(GREETING, Some(profile));
        assert_eq!(named.user_initials(), "MC");
    }

    #[test]
    fn test_summary() {
        let mut s = DialogueSession::new(GREETING, None);
        s.begin_turn("question");
        let summary = s.summary();
        assert_eq!(summary.id, s.id);
        assert_eq!(summary.message_count, 2);
        assert_eq!(summary.state, SessionState::AwaitingReply);
        assert!(summary.started_at.contains('T'));
    }

    #[test]
    fn test_format_epoch_out_of_range() {
        assert_eq!(format_epoch(i64::MAX), i64::MAX.to_string());
    }
}
