//! Typed broadcast helpers. Every helper runs strictly after the
//! corresponding store mutation has committed, and none of them can fail
//! from the caller's point of view: a broadcast problem is logged and
//! swallowed because subscribers re-fetch authoritative state anyway.

use serde::Serialize;
use tracing::warn;
use uuid::Uuid;

use crate::{
    dto::sse::{
        EVENT_MEMBER_JOINED, EVENT_SESSION_ENDED, EVENT_TASK_FINALIZED, EVENT_VOTE,
        MemberJoinedEvent, ServerEvent, SessionEndedEvent, TaskFinalizedEvent, VoteEvent,
    },
    state::{SharedState, session_channel},
};

/// Announce a cast or changed vote on the session channel.
pub fn broadcast_vote(
    state: &SharedState,
    session_id: Uuid,
    user_id: Uuid,
    task_id: Uuid,
    story_points: Option<u8>,
) {
    let payload = VoteEvent {
        user_id,
        task_id,
        story_points,
    };
    send_session_event(state, session_id, EVENT_VOTE, &payload);
}

/// Announce a first-time join on the session channel.
pub fn broadcast_member_joined(
    state: &SharedState,
    session_id: Uuid,
    user_id: Uuid,
    display_name: &str,
) {
    let payload = MemberJoinedEvent {
        user_id,
        display_name: display_name.to_owned(),
    };
    send_session_event(state, session_id, EVENT_MEMBER_JOINED, &payload);
}

/// Announce a finalized task and the new cursor position (`None` when the
/// session ended with it).
pub fn broadcast_task_finalized(
    state: &SharedState,
    session_id: Uuid,
    task_id: Uuid,
    final_story_points: u32,
    next_task_index: Option<usize>,
) {
    let payload = TaskFinalizedEvent {
        task_id,
        final_story_points,
        next_task_index,
    };
    send_session_event(state, session_id, EVENT_TASK_FINALIZED, &payload);
}

/// Announce the session end.
pub fn broadcast_session_ended(state: &SharedState, session_id: Uuid) {
    let payload = SessionEndedEvent { session_id };
    send_session_event(state, session_id, EVENT_SESSION_ENDED, &payload);
}

fn send_session_event(
    state: &SharedState,
    session_id: Uuid,
    event: &str,
    payload: &impl Serialize,
) {
    match ServerEvent::json(Some(event.to_string()), payload) {
        Ok(event) => state.channels().broadcast(&session_channel(session_id), event),
        Err(err) => warn!(event, error = %err, "failed to serialize session event payload"),
    }
}
