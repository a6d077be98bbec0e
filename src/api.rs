//! JSON HTTP endpoints used by the voting page.
//!
//! Every handler works on the current local date.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::GameError;
use crate::state::AppState;
use crate::types::*;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

impl IntoResponse for GameError {
    fn into_response(self) -> Response {
        let status = match &self {
            GameError::ExhaustedPool | GameError::AlreadyVoted { .. } => StatusCode::CONFLICT,
            GameError::InvalidVoter(_) | GameError::InvalidTarget(_) => StatusCode::BAD_REQUEST,
            GameError::NoQuestionToday(_) => StatusCode::NOT_FOUND,
            GameError::Storage(e) => {
                tracing::error!("Storage failure: {}", e);
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };

        let body = ErrorBody {
            error: self.kind().to_string(),
            message: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteRequest {
    pub voter: String,
    pub target: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoteResponse {
    pub recorded: bool,
    pub already_voted: bool,
    pub message: String,
}

/// Build the API router
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/today", get(today))
        .route("/api/vote", post(vote))
        .route("/api/results", get(results))
        .route("/api/players", get(players))
        .route("/api/history", get(history))
        .route("/api/admin/reset", post(reset))
        .with_state(state)
}

/// Today's question, chosen on first request of the day.
///
/// GET /api/today
pub async fn today(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ResolvedQuestion>, GameError> {
    Ok(Json(state.resolve_today(AppState::today()).await?))
}

/// Cast a vote for today.
///
/// POST /api/vote
///
/// A repeated vote is not an error for the page: it gets a 200 with
/// `already_voted` set.
pub async fn vote(
    State(state): State<Arc<AppState>>,
    Json(request): Json<VoteRequest>,
) -> Result<Json<VoteResponse>, GameError> {
    match state
        .cast_vote(AppState::today(), &request.voter, &request.target)
        .await
    {
        Ok(_) => Ok(Json(VoteResponse {
            recorded: true,
            already_voted: false,
            message: format!("Voted for {}", request.target.trim()),
        })),
        Err(e @ GameError::AlreadyVoted { .. }) => Ok(Json(VoteResponse {
            recorded: false,
            already_voted: true,
            message: e.to_string(),
        })),
        Err(e) => Err(e),
    }
}

/// Tally and breakdown for today.
///
/// GET /api/results
pub async fn results(State(state): State<Arc<AppState>>) -> Result<Json<DaySummary>, GameError> {
    Ok(Json(state.results(AppState::today()).await?))
}

/// GET /api/players
pub async fn players(State(state): State<Arc<AppState>>) -> Result<Json<Roster>, GameError> {
    Ok(Json(state.players().await?))
}

/// GET /api/history
pub async fn history(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<HistoryEntry>>, GameError> {
    Ok(Json(state.history().await?))
}

/// Clear votes and used questions.
///
/// POST /api/admin/reset
pub async fn reset(State(state): State<Arc<AppState>>) -> Response {
    match state.reset_game().await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => e.into_response(),
    }
}
