use serde::{Deserialize, Serialize};
use std::time::SystemTime;
use utoipa::ToSchema;
use uuid::Uuid;

/// Lifecycle status of an estimation session. The transition is one-way:
/// an ended session never becomes active again.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// The session accepts joins, votes, and finalization.
    Active,
    /// Terminal state; every mutating operation is rejected.
    Ended,
}

/// Aggregate session entity persisted by the storage layer.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionEntity {
    /// Primary key of the session.
    pub id: Uuid,
    /// Project the estimated tasks belong to. Fixed at creation.
    pub project_id: Uuid,
    /// User who created the session and holds finalize/end authority.
    pub created_by: Uuid,
    /// Ordered estimation queue, fixed at creation.
    pub task_ids: Vec<Uuid>,
    /// Zero-based cursor into `task_ids`; monotonically non-decreasing
    /// while the session is active.
    pub current_task_index: usize,
    /// Lifecycle status.
    pub status: SessionStatus,
    /// Creation timestamp for auditing/debugging.
    pub created_at: SystemTime,
    /// Last time the session entity was updated.
    pub updated_at: SystemTime,
}

/// Membership record for a user who joined a session.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ParticipantEntity {
    /// Session the user joined.
    pub session_id: Uuid,
    /// Identity of the participant, supplied by the auth collaborator.
    pub user_id: Uuid,
    /// Display name captured at join time.
    pub display_name: String,
    /// When the user first joined.
    pub joined_at: SystemTime,
}

/// A single vote, unique per `(session_id, task_id, user_id)`.
///
/// Revotes overwrite the row in place; `created_at` is preserved and
/// `updated_at` moves forward.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VoteEntity {
    /// Session the vote belongs to.
    pub session_id: Uuid,
    /// Task the vote targets (the session's current task at vote time).
    pub task_id: Uuid,
    /// Voter identity.
    pub user_id: Uuid,
    /// Chosen value from the estimation deck; `None` is an explicit pass.
    pub story_points: Option<u8>,
    /// When the first vote for this key was cast.
    pub created_at: SystemTime,
    /// When the vote was last overwritten.
    pub updated_at: SystemTime,
}

/// Summary row returned when listing a project's sessions.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SessionListItemEntity {
    /// Primary key of the session.
    pub id: Uuid,
    /// Project the session belongs to.
    pub project_id: Uuid,
    /// Session owner.
    pub created_by: Uuid,
    /// Number of tasks in the estimation queue.
    pub task_count: usize,
    /// Lifecycle status.
    pub status: SessionStatus,
    /// Creation timestamp.
    pub created_at: SystemTime,
}

impl From<SessionEntity> for SessionListItemEntity {
    fn from(entity: SessionEntity) -> Self {
        Self {
            id: entity.id,
            project_id: entity.project_id,
            created_by: entity.created_by,
            task_count: entity.task_ids.len(),
            status: entity.status,
            created_at: entity.created_at,
        }
    }
}
