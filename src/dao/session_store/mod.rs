pub mod memory;
#[cfg(feature = "mongo-store")]
pub mod mongodb;

use crate::dao::models::{ParticipantEntity, SessionEntity, SessionListItemEntity, VoteEntity};
use crate::dao::storage::StorageResult;
use futures::future::BoxFuture;
use uuid::Uuid;

/// Abstraction over the persistence layer for sessions, participants, and
/// votes. The stores are the single source of truth; every mutation the
/// service layer performs goes through one of these methods.
pub trait SessionStore: Send + Sync {
    /// Persist a freshly created session.
    fn insert_session(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Replace a session document (cursor advance, status change).
    fn update_session(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// Look a session up by id.
    fn find_session(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>>;
    /// List session summaries for a project, most recent first.
    fn list_sessions(
        &self,
        project_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<SessionListItemEntity>>>;
    /// Insert a participant if absent. Returns `true` when a record was
    /// created, `false` when the user had already joined.
    fn add_participant(
        &self,
        participant: ParticipantEntity,
    ) -> BoxFuture<'static, StorageResult<bool>>;
    /// All participants of a session in join order.
    fn list_participants(
        &self,
        session_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<ParticipantEntity>>>;
    /// Look up the vote for a `(session, task, user)` key.
    fn find_vote(
        &self,
        session_id: Uuid,
        task_id: Uuid,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<VoteEntity>>>;
    /// Insert or overwrite the vote row for its unique key. The unique key
    /// is what serializes concurrent writes from the same user into a
    /// last-write-wins overwrite; `created_at` of an existing row survives.
    fn upsert_vote(&self, vote: VoteEntity) -> BoxFuture<'static, StorageResult<()>>;
    /// All votes recorded for a task within a session.
    fn list_votes(
        &self,
        session_id: Uuid,
        task_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<VoteEntity>>>;
    /// Cheap connectivity probe used by the supervisor and the healthcheck.
    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>>;
    /// Attempt to re-establish a lost backend connection.
    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>>;
}
