//! Poll HTTP Routes
//!
//! REST surface over the poll core: creation, listings, voting, and the
//! synchronous snapshot pull used on initial render.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::poll::{Poll, PollError, TallySnapshot};

use super::server::AppState;

// ==================
// Request/Response Types
// ==================

#[derive(Debug, Deserialize)]
pub struct CreatePollRequest {
    pub question: String,
    pub options: Vec<String>,
    pub duration_minutes: i64,
    #[serde(default)]
    pub creator_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VoteRequest {
    /// Opaque per-browser participant id minted by the identity provider
    pub voter_id: String,
    pub option_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Stable reason code, e.g. "already_voted" vs "poll_closed"
    pub code: String,
}

type ApiError = (StatusCode, Json<ErrorResponse>);

fn error_response(err: PollError) -> ApiError {
    let status = match &err {
        PollError::NotFound(_) => StatusCode::NOT_FOUND,
        PollError::PollClosed | PollError::AlreadyVoted => StatusCode::CONFLICT,
        PollError::InvalidOption(_) | PollError::InvalidArgument(_) => StatusCode::BAD_REQUEST,
        PollError::Transient => StatusCode::SERVICE_UNAVAILABLE,
        PollError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            error: err.to_string(),
            code: err.reason_code().to_string(),
        }),
    )
}

// ==================
// Poll Routes
// ==================

/// Create poll routes
pub fn poll_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/polls", post(create_poll_handler).get(list_open_handler))
        .route(
            "/polls/by-creator/{creator_id}",
            get(list_by_creator_handler),
        )
        .route("/polls/{id}/snapshot", get(snapshot_handler))
        .route("/polls/{id}/vote", post(vote_handler))
        .route("/admin/polls", get(admin_list_handler))
        .with_state(state)
}

// ==================
// Handlers
// ==================

/// Create a poll with a fixed option set and voting window
async fn create_poll_handler(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreatePollRequest>,
) -> Result<(StatusCode, Json<Poll>), ApiError> {
    let poll = state
        .store
        .create_poll(
            &request.question,
            request.options,
            request.duration_minutes,
            request.creator_id,
        )
        .await
        .map_err(error_response)?;

    Ok((StatusCode::CREATED, Json(poll)))
}

/// List polls open per the derived predicate
async fn list_open_handler(State(state): State<Arc<AppState>>) -> Json<Vec<Poll>> {
    Json(state.store.list_open(Utc::now()).await)
}

/// List polls created by the given opaque creator id
async fn list_by_creator_handler(
    State(state): State<Arc<AppState>>,
    Path(creator_id): Path<String>,
) -> Json<Vec<Poll>> {
    Json(state.store.list_by_creator(&creator_id).await)
}

/// Synchronous tally pull, used on initial render before a push arrives
async fn snapshot_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<TallySnapshot>, ApiError> {
    let snapshot = state
        .store
        .snapshot(id, Utc::now())
        .await
        .map_err(error_response)?;
    Ok(Json(snapshot))
}

/// Submit a vote; an accepted vote is fanned out to the poll's room
async fn vote_handler(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(request): Json<VoteRequest>,
) -> Result<Json<TallySnapshot>, ApiError> {
    if request.voter_id.trim().is_empty() {
        return Err(error_response(PollError::InvalidArgument(
            "voter_id must not be empty".into(),
        )));
    }

    let hub = Arc::clone(&state.hub);
    let snapshot = state
        .store
        .submit_vote(id, &request.voter_id, request.option_id, Utc::now(), |s| {
            hub.publish(s);
        })
        .await
        .map_err(error_response)?;

    Ok(Json(snapshot))
}

/// All polls, active and ended, behind the admin bearer-token predicate
async fn admin_list_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<Poll>>, ApiError> {
    if !is_admin_authorized(&headers, state.admin_token.as_deref()) {
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: "Admin authorization required".to_string(),
                code: "unauthorized".to_string(),
            }),
        ));
    }

    Ok(Json(state.store.list_all().await))
}

/// Boolean authorization predicate: the token is opaque here, its issuance
/// belongs to the identity provider. No configured token means no admin
/// surface at all.
fn is_admin_authorized(headers: &HeaderMap, admin_token: Option<&str>) -> bool {
    let Some(expected) = admin_token else {
        return false;
    };
    let Some(value) = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
    else {
        return false;
    };
    value
        .strip_prefix("Bearer ")
        .is_some_and(|token| token == expected)
}
