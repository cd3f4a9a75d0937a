use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use axum_valid::Valid;
use uuid::Uuid;

use crate::{
    dto::{
        auth::Identity,
        session::{
            CreateSessionRequest, FinalizeTaskRequest, ParticipantListResponse,
            SessionListQuery, SessionListResponse, SessionResponse, VoteListResponse,
            VoteRequest, VotesQuery,
        },
    },
    error::AppError,
    services::session_service,
    state::SharedState,
};

/// Routes for session lifecycle, membership, and voting.
pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/sessions", post(create_session).get(list_sessions))
        .route("/sessions/{id}", get(get_session))
        .route("/sessions/{id}/votes", get(get_votes))
        .route("/sessions/{id}/participants", get(get_participants))
        .route("/sessions/{id}/join", post(join_session))
        .route("/sessions/{id}/vote", post(cast_vote).put(change_vote))
        .route("/sessions/{id}/finalize", post(finalize_task))
        .route("/sessions/{id}/end", post(end_session))
}

/// Open a new estimation session over a project's tasks.
#[utoipa::path(
    post,
    path = "/sessions",
    tag = "session",
    request_body = CreateSessionRequest,
    responses(
        (status = 200, description = "Session created", body = SessionResponse),
        (status = 400, description = "Empty or duplicated task queue")
    )
)]
pub async fn create_session(
    State(state): State<SharedState>,
    identity: Identity,
    Valid(Json(payload)): Valid<Json<CreateSessionRequest>>,
) -> Result<Json<SessionResponse>, AppError> {
    let session = session_service::create_session(&state, &identity, payload).await?;
    Ok(Json(session))
}

/// List a project's sessions, most recent first.
#[utoipa::path(
    get,
    path = "/sessions",
    tag = "session",
    params(SessionListQuery),
    responses((status = 200, description = "Sessions of the project", body = SessionListResponse))
)]
pub async fn list_sessions(
    State(state): State<SharedState>,
    _identity: Identity,
    Query(query): Query<SessionListQuery>,
) -> Result<Json<SessionListResponse>, AppError> {
    let listing = session_service::list_sessions(&state, query.project_id).await?;
    Ok(Json(listing))
}

/// Authoritative session snapshot.
#[utoipa::path(
    get,
    path = "/sessions/{id}",
    tag = "session",
    params(("id" = Uuid, Path, description = "Session identifier")),
    responses(
        (status = 200, description = "Session state", body = SessionResponse),
        (status = 403, description = "Caller never joined the session"),
        (status = 404, description = "Unknown session")
    )
)]
pub async fn get_session(
    State(state): State<SharedState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionResponse>, AppError> {
    let session = session_service::get_session(&state, identity.user_id, id).await?;
    Ok(Json(session))
}

/// Votes for a task of the session, with the aggregated tally.
#[utoipa::path(
    get,
    path = "/sessions/{id}/votes",
    tag = "session",
    params(("id" = Uuid, Path, description = "Session identifier"), VotesQuery),
    responses(
        (status = 200, description = "Votes for the task", body = VoteListResponse),
        (status = 403, description = "Caller never joined the session")
    )
)]
pub async fn get_votes(
    State(state): State<SharedState>,
    identity: Identity,
    Path(id): Path<Uuid>,
    Query(query): Query<VotesQuery>,
) -> Result<Json<VoteListResponse>, AppError> {
    let votes = session_service::get_votes(&state, identity.user_id, id, query.task_id).await?;
    Ok(Json(votes))
}

/// Roster of the session's participants.
#[utoipa::path(
    get,
    path = "/sessions/{id}/participants",
    tag = "session",
    params(("id" = Uuid, Path, description = "Session identifier")),
    responses(
        (status = 200, description = "Participants in join order", body = ParticipantListResponse),
        (status = 403, description = "Caller never joined the session")
    )
)]
pub async fn get_participants(
    State(state): State<SharedState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<Json<ParticipantListResponse>, AppError> {
    let roster = session_service::get_participants(&state, identity.user_id, id).await?;
    Ok(Json(roster))
}

/// Join the session. Re-joining is a silent no-op.
#[utoipa::path(
    post,
    path = "/sessions/{id}/join",
    tag = "session",
    params(("id" = Uuid, Path, description = "Session identifier")),
    responses(
        (status = 200, description = "Joined (or already a participant)"),
        (status = 409, description = "Session has ended")
    )
)]
pub async fn join_session(
    State(state): State<SharedState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<(), AppError> {
    session_service::join_session(&state, &identity, id).await?;
    Ok(())
}

/// Cast a first vote on the current task.
#[utoipa::path(
    post,
    path = "/sessions/{id}/vote",
    tag = "session",
    params(("id" = Uuid, Path, description = "Session identifier")),
    request_body = VoteRequest,
    responses(
        (status = 200, description = "Vote recorded"),
        (status = 400, description = "Value outside the estimation deck"),
        (status = 403, description = "Caller never joined the session"),
        (status = 409, description = "Vote already cast, or session ended")
    )
)]
pub async fn cast_vote(
    State(state): State<SharedState>,
    identity: Identity,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<VoteRequest>>,
) -> Result<(), AppError> {
    session_service::cast_vote(&state, &identity, id, payload.story_points).await?;
    Ok(())
}

/// Overwrite an existing vote on the current task.
#[utoipa::path(
    put,
    path = "/sessions/{id}/vote",
    tag = "session",
    params(("id" = Uuid, Path, description = "Session identifier")),
    request_body = VoteRequest,
    responses(
        (status = 200, description = "Vote changed"),
        (status = 400, description = "Value outside the estimation deck"),
        (status = 409, description = "No vote to change, or session ended")
    )
)]
pub async fn change_vote(
    State(state): State<SharedState>,
    identity: Identity,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<VoteRequest>>,
) -> Result<(), AppError> {
    session_service::change_vote(&state, &identity, id, payload.story_points).await?;
    Ok(())
}

/// Commit the final estimate for the current task and advance the queue.
#[utoipa::path(
    post,
    path = "/sessions/{id}/finalize",
    tag = "session",
    params(("id" = Uuid, Path, description = "Session identifier")),
    request_body = FinalizeTaskRequest,
    responses(
        (status = 200, description = "Task finalized"),
        (status = 400, description = "Missing or non-positive final estimate"),
        (status = 403, description = "Caller is not the session owner"),
        (status = 409, description = "Session has ended")
    )
)]
pub async fn finalize_task(
    State(state): State<SharedState>,
    identity: Identity,
    Path(id): Path<Uuid>,
    Valid(Json(payload)): Valid<Json<FinalizeTaskRequest>>,
) -> Result<(), AppError> {
    session_service::finalize_task(&state, &identity, id, payload.final_story_points).await?;
    Ok(())
}

/// End the session early, regardless of the cursor position.
#[utoipa::path(
    post,
    path = "/sessions/{id}/end",
    tag = "session",
    params(("id" = Uuid, Path, description = "Session identifier")),
    responses(
        (status = 200, description = "Session ended"),
        (status = 403, description = "Caller is not the session owner"),
        (status = 409, description = "Session has already ended")
    )
)]
pub async fn end_session(
    State(state): State<SharedState>,
    identity: Identity,
    Path(id): Path<Uuid>,
) -> Result<(), AppError> {
    session_service::end_session(&state, &identity, id).await?;
    Ok(())
}
