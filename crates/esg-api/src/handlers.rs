//! Route handler functions for all API endpoints.
//!
//! Each handler extracts query/path parameters via axum extractors,
//! calls into the question index or dialogue router, and returns JSON.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use esg_chat::{ReplySource, SessionSummary, SubmitOutcome};
use esg_core::{CategoryGroup, Message, Question, UserProfile};

use crate::error::ApiError;
use crate::state::AppState;

// =============================================================================
// Request types
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct QuestionsParams {
    pub search: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OpenSessionRequest {
    #[serde(default)]
    pub profile: Option<UserProfile>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    #[serde(default)]
    pub session_id: Option<Uuid>,
}

// =============================================================================
// Response types
// =============================================================================

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
    pub question_count: usize,
    pub active_sessions: usize,
    pub nlu_enabled: bool,
    pub demo_mode: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct QuestionsResponse {
    pub categories: Vec<CategoryGroup>,
    /// Questions across all tabs after filtering.
    pub total: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionResponse {
    pub session_id: Uuid,
    pub initials: String,
    pub display_name: Option<String>,
    pub transcript: Vec<Message>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct SessionsResponse {
    pub sessions: Vec<SessionSummary>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MessagesResponse {
    pub session_id: Uuid,
    pub messages: Vec<Message>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChatResponse {
    pub session_id: Uuid,
    pub reply: Message,
    pub source: ReplySource,
}

// =============================================================================
// Handler functions
// =============================================================================

/// GET /health - health check.
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: state.start_time.elapsed().as_secs(),
        question_count: state.index.len(),
        active_sessions: state.router.session_count(),
        nlu_enabled: state.config.nlu.enabled,
        demo_mode: state.config.chat.demo_mode,
    })
}

/// GET /questions - catalog grouped by category then subcategory, filtered
/// by the optional `search` term.
pub async fn list_questions(
    State(state): State<AppState>,
    Query(params): Query<QuestionsParams>,
) -> Json<QuestionsResponse> {
    let term = params.search.unwrap_or_default();
    let categories = state.index.view(&term);
    let total = categories.iter().map(CategoryGroup::question_count).sum();
    Json(QuestionsResponse { categories, total })
}

/// GET /questions/{id}
pub async fn get_question(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Question>, ApiError> {
    state
        .index
        .question(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("question {} not found", id)))
}

/// POST /sessions - open a dialogue session seeded with the greeting.
pub async fn open_session(
    State(state): State<AppState>,
    Json(body): Json<OpenSessionRequest>,
) -> (StatusCode, Json<SessionResponse>) {
    let session = state.router.open_session(body.profile);
    let response = SessionResponse {
        session_id: session.id,
        initials: session.user_initials(),
        display_name: session.profile.as_ref().map(UserProfile::display_name),
        transcript: session.transcript,
    };
    (StatusCode::CREATED, Json(response))
}

/// GET /sessions
pub async fn list_sessions(State(state): State<AppState>) -> Json<SessionsResponse> {
    Json(SessionsResponse {
        sessions: state.router.list_sessions(),
    })
}

/// GET /sessions/{id}/messages
pub async fn session_messages(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<MessagesResponse>, ApiError> {
    let messages = state.router.transcript(id)?;
    Ok(Json(MessagesResponse {
        session_id: id,
        messages,
    }))
}

/// DELETE /sessions/{id}
pub async fn close_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    state.router.close_session(id)?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /chat - submit one utterance and return the single assistant reply.
pub async fn chat(
    State(state): State<AppState>,
    Json(body): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    match state.router.submit(body.session_id, &body.message).await {
        SubmitOutcome::Replied {
            session_id,
            reply,
            source,
        } => Ok(Json(ChatResponse {
            session_id,
            reply,
            source,
        })),
        SubmitOutcome::Ignored { .. } => {
            Err(ApiError::BadRequest("'message' must not be empty".to_string()))
        }
        SubmitOutcome::Busy { session_id } => Err(ApiError::Conflict(format!(
            "session {} is still waiting for a reply",
            session_id
        ))),
    }
}
