//! Dialogue core for the ESG assistant.
//!
//! Local intent matching, the browsable question index, the remote NLU
//! client and the router that ties them into per-session transcripts.

pub mod error;
pub mod index;
pub mod matcher;
pub mod remote;
pub mod router;
pub mod session;

pub use error::ChatError;
pub use index::{build_view, QuestionIndex};
pub use matcher::{IntentMatcher, MatchSource, Resolution};
pub use remote::{OfflineClient, RemoteDialogueClient, RemoteFailure, RemoteReply, WebhookClient};
pub use router::{DialogueRouter, ReplySource, SubmitOutcome};
pub use session::{DialogueSession, SessionState, SessionSummary};
