use utoipa::OpenApi;

#[derive(OpenApi)]
/// Aggregated OpenAPI specification for the Planning Poker backend.
#[openapi(
    paths(
        crate::routes::health::healthcheck,
        crate::routes::session::create_session,
        crate::routes::session::list_sessions,
        crate::routes::session::get_session,
        crate::routes::session::get_votes,
        crate::routes::session::get_participants,
        crate::routes::session::join_session,
        crate::routes::session::cast_vote,
        crate::routes::session::change_vote,
        crate::routes::session::finalize_task,
        crate::routes::session::end_session,
        crate::routes::sse::channel_stream,
    ),
    components(
        schemas(
            crate::dto::health::HealthResponse,
            crate::dto::session::CreateSessionRequest,
            crate::dto::session::SessionResponse,
            crate::dto::session::SessionListResponse,
            crate::dto::session::SessionSummary,
            crate::dto::session::VoteRequest,
            crate::dto::session::FinalizeTaskRequest,
            crate::dto::session::VoteListResponse,
            crate::dto::session::VoteRow,
            crate::dto::session::TallyBucket,
            crate::dto::session::ParticipantListResponse,
            crate::dto::session::ParticipantRow,
            crate::dto::sse::VoteEvent,
            crate::dto::sse::MemberJoinedEvent,
            crate::dto::sse::TaskFinalizedEvent,
            crate::dto::sse::SessionEndedEvent,
            crate::dao::models::SessionStatus,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "session", description = "Planning Poker session operations"),
        (name = "sse", description = "Server-sent events channels"),
    )
)]
pub struct ApiDoc;
