use std::convert::Infallible;

use axum::{
    Router,
    extract::{Path, State},
    response::sse::Sse,
    routing::get,
};
use futures::Stream;
use tracing::info;

use crate::{
    dto::auth::Identity,
    error::AppError,
    services::{
        session_service,
        sse_service::{self, ChannelGuard},
    },
    state::{SharedState, hub::channel_session},
};

/// Stream a session's realtime events to a connected client.
///
/// The channel name is `planning-poker-<session id>`. Events are hints to
/// re-fetch authoritative state; the stream dropping never affects
/// correctness.
#[utoipa::path(
    get,
    path = "/channels/{channel}",
    tag = "sse",
    params(("channel" = String, Path, description = "Channel name, `planning-poker-<session id>`")),
    responses(
        (status = 200, description = "Session event stream", content_type = "text/event-stream", body = String),
        (status = 404, description = "Unknown channel or session")
    )
)]
pub async fn channel_stream(
    State(state): State<SharedState>,
    _identity: Identity,
    Path(channel): Path<String>,
) -> Result<Sse<impl Stream<Item = Result<axum::response::sse::Event, Infallible>>>, AppError> {
    let session_id = channel_session(&channel)
        .ok_or_else(|| AppError::NotFound(format!("unknown channel `{channel}`")))?;

    // The session must exist, otherwise typos would accumulate channels
    // nobody ever publishes to.
    if !session_service::session_exists(&state, session_id).await? {
        return Err(AppError::NotFound(format!(
            "session `{session_id}` not found"
        )));
    }

    let receiver = sse_service::subscribe(&state, &channel);
    info!(%channel, "new session event stream");
    Ok(sse_service::to_sse_stream(
        receiver,
        ChannelGuard::new(state, channel),
    ))
}

/// Configure the SSE endpoints.
pub fn router() -> Router<SharedState> {
    Router::<SharedState>::new().route("/channels/{channel}", get(channel_stream))
}
