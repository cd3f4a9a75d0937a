use std::sync::Arc;

use futures::{TryStreamExt, future::BoxFuture};
use mongodb::{
    Client, Collection, Database,
    bson::{DateTime, doc},
    error::{ErrorKind, WriteFailure},
    options::IndexOptions,
};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    config::MongoConfig,
    connection::establish_connection,
    error::{MongoDaoError, MongoResult},
    models::{
        MongoParticipantDocument, MongoSessionDocument, MongoVoteDocument, doc_id, uuid_as_binary,
    },
};
use crate::dao::{
    models::{ParticipantEntity, SessionEntity, SessionListItemEntity, VoteEntity},
    session_store::SessionStore,
    storage::StorageResult,
    task_board::TaskBoard,
};

const SESSION_COLLECTION: &str = "sessions";
const PARTICIPANT_COLLECTION: &str = "session_participants";
const VOTE_COLLECTION: &str = "session_votes";
const TASK_COLLECTION: &str = "tasks";

/// Duplicate-key error code raised when a unique index rejects an insert.
const DUPLICATE_KEY_CODE: i32 = 11000;

/// MongoDB implementation of [`SessionStore`] and [`TaskBoard`].
#[derive(Clone)]
pub struct MongoSessionStore {
    inner: Arc<MongoInner>,
}

struct MongoInner {
    state: RwLock<MongoState>,
    config: MongoConfig,
}

struct MongoState {
    client: Client,
    database: Database,
}

impl MongoInner {
    async fn ping(&self) -> MongoResult<()> {
        let database = {
            let guard = self.state.read().await;
            guard.database.clone()
        };

        database
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|source| MongoDaoError::HealthPing { source })?;
        Ok(())
    }

    async fn reconnect(&self) -> MongoResult<()> {
        let (client, database) =
            establish_connection(&self.config.options, &self.config.database_name).await?;
        let mut guard = self.state.write().await;
        guard.client = client;
        guard.database = database;
        Ok(())
    }
}

impl MongoSessionStore {
    /// Establish a connection to MongoDB and ensure indexes are present.
    pub async fn connect(config: MongoConfig) -> MongoResult<Self> {
        let (client, database) =
            establish_connection(&config.options, &config.database_name).await?;

        let inner = Arc::new(MongoInner {
            state: RwLock::new(MongoState { client, database }),
            config,
        });

        let store = Self { inner };
        store.ensure_indexes().await?;
        Ok(store)
    }

    /// Create the unique indexes the vote and participant semantics rely on.
    ///
    /// The `(session_id, task_id, user_id)` unique index is what serializes
    /// concurrent votes from one user into a single overwritten row.
    async fn ensure_indexes(&self) -> MongoResult<()> {
        let database = self.database().await;

        let participant_index = mongodb::IndexModel::builder()
            .keys(doc! {"session_id": 1, "user_id": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("participant_membership_idx".to_owned()))
                    .unique(Some(true))
                    .build(),
            )
            .build();
        database
            .collection::<MongoParticipantDocument>(PARTICIPANT_COLLECTION)
            .create_index(participant_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: PARTICIPANT_COLLECTION,
                index: "session_id,user_id",
                source,
            })?;

        let vote_index = mongodb::IndexModel::builder()
            .keys(doc! {"session_id": 1, "task_id": 1, "user_id": 1})
            .options(
                IndexOptions::builder()
                    .name(Some("vote_key_idx".to_owned()))
                    .unique(Some(true))
                    .build(),
            )
            .build();
        database
            .collection::<MongoVoteDocument>(VOTE_COLLECTION)
            .create_index(vote_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: VOTE_COLLECTION,
                index: "session_id,task_id,user_id",
                source,
            })?;

        let session_index = mongodb::IndexModel::builder()
            .keys(doc! {"project_id": 1, "created_at": -1})
            .options(
                IndexOptions::builder()
                    .name(Some("session_project_idx".to_owned()))
                    .build(),
            )
            .build();
        database
            .collection::<MongoSessionDocument>(SESSION_COLLECTION)
            .create_index(session_index)
            .await
            .map_err(|source| MongoDaoError::EnsureIndex {
                collection: SESSION_COLLECTION,
                index: "project_id,created_at",
                source,
            })?;

        Ok(())
    }

    async fn database(&self) -> Database {
        let guard = self.inner.state.read().await;
        guard.database.clone()
    }

    async fn session_collection(&self) -> Collection<MongoSessionDocument> {
        self.database().await.collection(SESSION_COLLECTION)
    }

    async fn participant_collection(&self) -> Collection<MongoParticipantDocument> {
        self.database().await.collection(PARTICIPANT_COLLECTION)
    }

    async fn vote_collection(&self) -> Collection<MongoVoteDocument> {
        self.database().await.collection(VOTE_COLLECTION)
    }

    async fn save_session(&self, session: SessionEntity) -> MongoResult<()> {
        let id = session.id;
        let document: MongoSessionDocument = session.into();
        self.session_collection()
            .await
            .replace_one(doc_id(id), &document)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::SaveSession { id, source })?;
        Ok(())
    }

    async fn insert_participant(&self, participant: ParticipantEntity) -> MongoResult<bool> {
        let session_id = participant.session_id;
        let document: MongoParticipantDocument = participant.into();

        match self
            .participant_collection()
            .await
            .insert_one(&document)
            .await
        {
            Ok(_) => Ok(true),
            // The unique membership index turns a re-join into a no-op.
            Err(err) if is_duplicate_key(&err) => Ok(false),
            Err(source) => Err(MongoDaoError::Participant { session_id, source }),
        }
    }

    async fn write_vote(&self, vote: VoteEntity) -> MongoResult<()> {
        let session_id = vote.session_id;
        let filter = doc! {
            "session_id": uuid_as_binary(vote.session_id),
            "task_id": uuid_as_binary(vote.task_id),
            "user_id": uuid_as_binary(vote.user_id),
        };
        let story_points = vote
            .story_points
            .map(i32::from)
            .map_or(mongodb::bson::Bson::Null, mongodb::bson::Bson::from);
        let update = doc! {
            "$set": {
                "story_points": story_points,
                "updated_at": DateTime::from_system_time(vote.updated_at),
            },
            "$setOnInsert": {
                "created_at": DateTime::from_system_time(vote.created_at),
            },
        };

        self.vote_collection()
            .await
            .update_one(filter, update)
            .upsert(true)
            .await
            .map_err(|source| MongoDaoError::Vote { session_id, source })?;
        Ok(())
    }
}

fn is_duplicate_key(err: &mongodb::error::Error) -> bool {
    match err.kind.as_ref() {
        ErrorKind::Write(WriteFailure::WriteError(write_error)) => {
            write_error.code == DUPLICATE_KEY_CODE
        }
        _ => false,
    }
}

impl SessionStore for MongoSessionStore {
    fn insert_session(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.save_session(session).await?) })
    }

    fn update_session(&self, session: SessionEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.save_session(session).await?) })
    }

    fn find_session(&self, id: Uuid) -> BoxFuture<'static, StorageResult<Option<SessionEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let document = store
                .session_collection()
                .await
                .find_one(doc_id(id))
                .await
                .map_err(|source| MongoDaoError::LoadSession { id, source })?;
            Ok(document.map(Into::into))
        })
    }

    fn list_sessions(
        &self,
        project_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<SessionListItemEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let cursor = store
                .session_collection()
                .await
                .find(doc! {"project_id": uuid_as_binary(project_id)})
                .sort(doc! {"created_at": -1})
                .await
                .map_err(|source| MongoDaoError::ListSessions { project_id, source })?;

            let documents: Vec<MongoSessionDocument> = cursor
                .try_collect()
                .await
                .map_err(|source| MongoDaoError::ListSessions { project_id, source })?;

            Ok(documents
                .into_iter()
                .map(|doc| SessionEntity::from(doc).into())
                .collect())
        })
    }

    fn add_participant(
        &self,
        participant: ParticipantEntity,
    ) -> BoxFuture<'static, StorageResult<bool>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.insert_participant(participant).await?) })
    }

    fn list_participants(
        &self,
        session_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<ParticipantEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let cursor = store
                .participant_collection()
                .await
                .find(doc! {"session_id": uuid_as_binary(session_id)})
                .sort(doc! {"joined_at": 1})
                .await
                .map_err(|source| MongoDaoError::Participant { session_id, source })?;

            let documents: Vec<MongoParticipantDocument> = cursor
                .try_collect()
                .await
                .map_err(|source| MongoDaoError::Participant { session_id, source })?;

            Ok(documents.into_iter().map(Into::into).collect())
        })
    }

    fn find_vote(
        &self,
        session_id: Uuid,
        task_id: Uuid,
        user_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Option<VoteEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let document = store
                .vote_collection()
                .await
                .find_one(doc! {
                    "session_id": uuid_as_binary(session_id),
                    "task_id": uuid_as_binary(task_id),
                    "user_id": uuid_as_binary(user_id),
                })
                .await
                .map_err(|source| MongoDaoError::Vote { session_id, source })?;
            Ok(document.map(Into::into))
        })
    }

    fn upsert_vote(&self, vote: VoteEntity) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move { Ok(store.write_vote(vote).await?) })
    }

    fn list_votes(
        &self,
        session_id: Uuid,
        task_id: Uuid,
    ) -> BoxFuture<'static, StorageResult<Vec<VoteEntity>>> {
        let store = self.clone();
        Box::pin(async move {
            let cursor = store
                .vote_collection()
                .await
                .find(doc! {
                    "session_id": uuid_as_binary(session_id),
                    "task_id": uuid_as_binary(task_id),
                })
                .sort(doc! {"created_at": 1})
                .await
                .map_err(|source| MongoDaoError::Vote { session_id, source })?;

            let documents: Vec<MongoVoteDocument> = cursor
                .try_collect()
                .await
                .map_err(|source| MongoDaoError::Vote { session_id, source })?;

            Ok(documents.into_iter().map(Into::into).collect())
        })
    }

    fn health_check(&self) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.ping().await?) })
    }

    fn try_reconnect(&self) -> BoxFuture<'static, StorageResult<()>> {
        let inner = self.inner.clone();
        Box::pin(async move { Ok(inner.reconnect().await?) })
    }
}

impl TaskBoard for MongoSessionStore {
    fn set_story_points(
        &self,
        task_id: Uuid,
        story_points: u32,
    ) -> BoxFuture<'static, StorageResult<()>> {
        let store = self.clone();
        Box::pin(async move {
            let collection = store
                .database()
                .await
                .collection::<mongodb::bson::Document>(TASK_COLLECTION);
            collection
                .update_one(
                    doc_id(task_id),
                    doc! {"$set": {
                        "story_points": story_points,
                        "updated_at": DateTime::now(),
                    }},
                )
                .await
                .map_err(|source| MongoDaoError::TaskEstimate { task_id, source })?;
            Ok(())
        })
    }
}
