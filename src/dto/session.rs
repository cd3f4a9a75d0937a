use serde::{Deserialize, Serialize};
use serde_with::skip_serializing_none;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::{
    dao::models::{ParticipantEntity, SessionEntity, SessionListItemEntity, SessionStatus},
    dto::{format_system_time, validation::validate_task_queue},
    state::consensus,
};

/// Payload used to open a new estimation session over a project's tasks.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateSessionRequest {
    /// Project whose tasks are being estimated.
    pub project_id: Uuid,
    /// Ordered estimation queue; fixed for the session lifetime.
    pub task_ids: Vec<Uuid>,
}

impl Validate for CreateSessionRequest {
    fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();

        if let Err(e) = validate_task_queue(&self.task_ids) {
            errors.add("task_ids", e);
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }
}

/// Vote payload. `story_points` may be `null` (or omitted) for an explicit
/// pass; otherwise the value must belong to the configured deck, which the
/// service checks before any write.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct VoteRequest {
    /// Chosen deck value, or `null` to pass.
    #[serde(default)]
    pub story_points: Option<u8>,
}

/// Payload for committing a final estimate on the current task.
#[derive(Debug, Deserialize, ToSchema, Validate)]
pub struct FinalizeTaskRequest {
    /// Owner override. When omitted, the service derives the estimate from
    /// unanimous non-pass votes. Not bound to the deck, but must be
    /// strictly positive.
    #[serde(default)]
    #[validate(range(min = 1))]
    pub final_story_points: Option<u32>,
}

/// Query selecting the task whose votes are requested.
#[derive(Debug, Deserialize, IntoParams)]
pub struct VotesQuery {
    /// Task to list votes for; defaults to the session's current task.
    pub task_id: Option<Uuid>,
}

/// Query filtering the session listing by project.
#[derive(Debug, Deserialize, IntoParams)]
pub struct SessionListQuery {
    /// Project whose sessions are listed.
    pub project_id: Uuid,
}

/// Authoritative session snapshot returned to clients.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SessionResponse {
    /// Session id.
    pub id: Uuid,
    /// Owning project.
    pub project_id: Uuid,
    /// Session owner with finalize/end authority.
    pub created_by: Uuid,
    /// Ordered estimation queue.
    pub task_ids: Vec<Uuid>,
    /// Cursor into `task_ids`.
    pub current_task_index: usize,
    /// Lifecycle status.
    pub status: SessionStatus,
    /// Creation timestamp (RFC3339).
    pub created_at: String,
    /// Last update timestamp (RFC3339).
    pub updated_at: String,
}

impl SessionResponse {
    /// Task currently under estimation, while the session is active.
    pub fn current_task_id(&self) -> Option<Uuid> {
        if self.status != SessionStatus::Active {
            return None;
        }
        self.task_ids.get(self.current_task_index).copied()
    }
}

impl From<SessionEntity> for SessionResponse {
    fn from(entity: SessionEntity) -> Self {
        Self {
            id: entity.id,
            project_id: entity.project_id,
            created_by: entity.created_by,
            task_ids: entity.task_ids,
            current_task_index: entity.current_task_index,
            status: entity.status,
            created_at: format_system_time(entity.created_at),
            updated_at: format_system_time(entity.updated_at),
        }
    }
}

/// Summary row in the project session listing.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionSummary {
    /// Session id.
    pub id: Uuid,
    /// Owning project.
    pub project_id: Uuid,
    /// Session owner.
    pub created_by: Uuid,
    /// Number of tasks in the queue.
    pub task_count: usize,
    /// Lifecycle status.
    pub status: SessionStatus,
    /// Creation timestamp (RFC3339).
    pub created_at: String,
}

impl From<SessionListItemEntity> for SessionSummary {
    fn from(entity: SessionListItemEntity) -> Self {
        Self {
            id: entity.id,
            project_id: entity.project_id,
            created_by: entity.created_by,
            task_count: entity.task_count,
            status: entity.status,
            created_at: format_system_time(entity.created_at),
        }
    }
}

/// Listing of a project's sessions.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SessionListResponse {
    /// Sessions, most recent first.
    pub sessions: Vec<SessionSummary>,
}

/// One recorded vote joined with the voter's display fields.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct VoteRow {
    /// Voter identity.
    pub user_id: Uuid,
    /// Voter display name from the membership record.
    pub display_name: String,
    /// Voted value; `null` is an explicit pass.
    pub story_points: Option<u8>,
    /// Last update timestamp (RFC3339).
    pub updated_at: String,
}

/// Distribution bucket used on the reveal display.
#[skip_serializing_none]
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TallyBucket {
    /// Voted value; omitted for the pass bucket.
    #[serde(default)]
    pub story_points: Option<u8>,
    /// Number of votes holding the value.
    pub count: usize,
}

/// Votes recorded for one task of a session.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VoteListResponse {
    /// Task the votes belong to.
    pub task_id: Uuid,
    /// Individual votes in cast order.
    pub votes: Vec<VoteRow>,
    /// Aggregated distribution, ascending with passes last.
    pub tally: Vec<TallyBucket>,
}

impl VoteListResponse {
    /// Assemble the response from vote rows, deriving the tally.
    pub fn new(task_id: Uuid, votes: Vec<VoteRow>) -> Self {
        let tally = consensus::tally(votes.iter().map(|vote| vote.story_points))
            .into_iter()
            .map(|(story_points, count)| TallyBucket {
                story_points,
                count,
            })
            .collect();
        Self {
            task_id,
            votes,
            tally,
        }
    }
}

/// A user who joined the session.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ParticipantRow {
    /// Participant identity.
    pub user_id: Uuid,
    /// Display name captured at join time.
    pub display_name: String,
    /// First join timestamp (RFC3339).
    pub joined_at: String,
}

impl From<ParticipantEntity> for ParticipantRow {
    fn from(entity: ParticipantEntity) -> Self {
        Self {
            user_id: entity.user_id,
            display_name: entity.display_name,
            joined_at: format_system_time(entity.joined_at),
        }
    }
}

/// Roster of a session's participants in join order.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ParticipantListResponse {
    /// Participants in join order.
    pub participants: Vec<ParticipantRow>,
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;

    #[test]
    fn current_task_follows_cursor_and_status() {
        let tasks = vec![Uuid::new_v4(), Uuid::new_v4()];
        let now = SystemTime::now();
        let entity = SessionEntity {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            created_by: Uuid::new_v4(),
            task_ids: tasks.clone(),
            current_task_index: 1,
            status: SessionStatus::Active,
            created_at: now,
            updated_at: now,
        };

        let mut response = SessionResponse::from(entity);
        assert_eq!(response.current_task_id(), Some(tasks[1]));

        response.status = SessionStatus::Ended;
        assert_eq!(response.current_task_id(), None);
    }

    #[test]
    fn vote_list_response_tallies_votes() {
        let task_id = Uuid::new_v4();
        let row = |points| VoteRow {
            user_id: Uuid::new_v4(),
            display_name: "voter".into(),
            story_points: points,
            updated_at: "2026-01-01T00:00:00Z".into(),
        };

        let response =
            VoteListResponse::new(task_id, vec![row(Some(5)), row(Some(5)), row(None)]);

        assert_eq!(response.tally.len(), 2);
        assert_eq!(response.tally[0].story_points, Some(5));
        assert_eq!(response.tally[0].count, 2);
        assert_eq!(response.tally[1].story_points, None);
        assert_eq!(response.tally[1].count, 1);
    }
}
