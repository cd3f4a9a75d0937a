use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::ToSchema;
use uuid::Uuid;

/// Name of the event announcing a cast or changed vote.
pub const EVENT_VOTE: &str = "vote";
/// Name of the event announcing a first-time join.
pub const EVENT_MEMBER_JOINED: &str = "member-joined";
/// Name of the event announcing a finalized task.
pub const EVENT_TASK_FINALIZED: &str = "task-finalized";
/// Name of the event announcing the session end.
pub const EVENT_SESSION_ENDED: &str = "session-ended";

#[derive(Clone, Debug)]
/// Dispatched payload carried across a session's broadcast channel.
///
/// Events are hints: subscribers re-fetch authoritative state when one
/// arrives. The payload fields exist for UI responsiveness only.
pub struct ServerEvent {
    /// Event name, one of the `EVENT_*` constants.
    pub event: Option<String>,
    /// JSON payload.
    pub data: String,
}

impl ServerEvent {
    /// Build an event from an already serialized payload.
    pub fn new(event: Option<String>, data: String) -> Self {
        Self { event, data }
    }

    /// Convenience wrapper that serialises `payload` into the data field.
    pub fn json<E, T>(event: E, payload: &T) -> serde_json::Result<Self>
    where
        E: Into<Option<String>>,
        T: Serialize,
    {
        Ok(Self {
            event: event.into(),
            data: serde_json::to_string(payload)?,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
/// Broadcast when a participant casts or changes a vote.
pub struct VoteEvent {
    /// Voter identity.
    pub user_id: Uuid,
    /// Task the vote targets.
    pub task_id: Uuid,
    /// Voted value; `null` is a pass.
    #[serde(default)]
    pub story_points: Option<u8>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
/// Broadcast when a user joins the session for the first time.
pub struct MemberJoinedEvent {
    /// New participant identity.
    pub user_id: Uuid,
    /// Display name captured at join time.
    pub display_name: String,
}

#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
/// Broadcast when the owner finalizes the current task.
pub struct TaskFinalizedEvent {
    /// Finalized task.
    pub task_id: Uuid,
    /// Estimate committed to the task record.
    pub final_story_points: u32,
    /// Cursor position after the advance; omitted when the session ended.
    #[serde(default)]
    pub next_task_index: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
/// Broadcast when the owner ends the session.
pub struct SessionEndedEvent {
    /// Session that ended.
    pub session_id: Uuid,
}
