//! In-memory storage backend. Backs the test suite and lets the server run
//! without a database; data does not survive a restart.

use dashmap::DashMap;
use futures::future::BoxFuture;
use uuid::Uuid;

use crate::dao::{
    models::{ParticipantEntity, SessionEntity, SessionListItemEntity, VoteEntity},
    session_store::SessionStore,
    storage::StorageResult,
};

/// Process-local implementation of [`SessionStore`].
///
/// Concurrent vote upserts for the same `(session, task, user)` key are
/// serialized by the underlying map shard lock, mirroring the unique index
/// the MongoDB backend relies on.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: DashMap<Uuid, SessionEntity>,
    participants: DashMap<Uuid, Vec<ParticipantEntity>>,
    votes: DashMap<(Uuid, Uuid, Uuid), VoteEntity>,
}

impl MemorySessionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemorySessionStore {
    fn insert_session(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.sessions.insert(session.id, session);
        Box::pin(async { Ok(()) })
    }

    fn update_session(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<()>> {
        self.sessions.insert(session.id, session);
        Box::pin(async { Ok(()) })
    }

    fn find_session(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>> {
        let found = self.sessions.get(&id).map(|entry| entry.value().clone());
        Box::pin(async move { Ok(found) })
    }

    fn list_sessions(
        &self,
        project_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<SessionListItemEntity>>> {
        let mut items: Vec<SessionListItemEntity> = self
            .sessions
            .iter()
            .filter(|entry| entry.value().project_id == project_id)
            .map(|entry| entry.value().clone().into())
            .collect();
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Box::pin(async move { Ok(items) })
    }

    fn add_participant(
        &self,
        participant: ParticipantEntity,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let mut roster = self.participants.entry(participant.session_id).or_default();
        let inserted = if roster
            .iter()
            .any(|existing| existing.user_id == participant.user_id)
        {
            false
        } else {
            roster.push(participant);
            true
        };
        Box::pin(async move { Ok(inserted) })
    }

    fn list_participants(
        &self,
        session_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<ParticipantEntity>>> {
        let roster = self
            .participants
            .get(&session_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default();
        Box::pin(async move { Ok(roster) })
    }

    fn find_vote(
        &self,
        session_id: Uuid,
        task_id: Uuid,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<VoteEntity>>> {
        let found = self
            .votes
            .get(&(session_id, task_id, user_id))
            .map(|entry| entry.value().clone());
        Box::pin(async move { Ok(found) })
    }

    fn upsert_vote(&self, vote: VoteEntity) -> BoxFuture<'static, StorageResult<()>> {
        let key = (vote.session_id, vote.task_id, vote.user_id);
        self.votes
            .entry(key)
            .and_modify(|existing| {
                // Overwrite in place: the original created_at survives a revote.
                existing.story_points = vote.story_points;
                existing.updated_at = vote.updated_at;
            })
            .or_insert(vote);
        Box::pin(async { Ok(()) })
    }

    fn list_votes(
        &self,
        session_id: Uuid,
        task_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<VoteEntity>>> {
        let mut rows: Vec<VoteEntity> = self
            .votes
            .iter()
            .filter(|entry| {
                let (vote_session, vote_task, _) = *entry.key();
                vote_session == session_id && vote_task == task_id
            })
            .map(|entry| entry.value().clone())
            .collect();
        rows.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        Box::pin(async move { Ok(rows) })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        Box::pin(async { Ok(()) })
    }
}
