use mongodb::bson::{Binary, DateTime, Document, doc, spec::BinarySubtype};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::dao::models::{ParticipantEntity, SessionEntity, SessionStatus, VoteEntity};

/// Session document as stored in the `sessions` collection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoSessionDocument {
    #[serde(rename = "_id")]
    id: Uuid,
    project_id: Uuid,
    created_by: Uuid,
    task_ids: Vec<Uuid>,
    current_task_index: usize,
    status: SessionStatus,
    created_at: DateTime,
    updated_at: DateTime,
}

impl From<SessionEntity> for MongoSessionDocument {
    fn from(value: SessionEntity) -> Self {
        Self {
            id: value.id,
            project_id: value.project_id,
            created_by: value.created_by,
            task_ids: value.task_ids,
            current_task_index: value.current_task_index,
            status: value.status,
            created_at: DateTime::from_system_time(value.created_at),
            updated_at: DateTime::from_system_time(value.updated_at),
        }
    }
}

impl From<MongoSessionDocument> for SessionEntity {
    fn from(value: MongoSessionDocument) -> Self {
        Self {
            id: value.id,
            project_id: value.project_id,
            created_by: value.created_by,
            task_ids: value.task_ids,
            current_task_index: value.current_task_index,
            status: value.status,
            created_at: value.created_at.to_system_time(),
            updated_at: value.updated_at.to_system_time(),
        }
    }
}

/// Membership document in the `session_participants` collection, unique per
/// `(session_id, user_id)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoParticipantDocument {
    pub session_id: Uuid,
    pub user_id: Uuid,
    display_name: String,
    joined_at: DateTime,
}

impl From<ParticipantEntity> for MongoParticipantDocument {
    fn from(value: ParticipantEntity) -> Self {
        Self {
            session_id: value.session_id,
            user_id: value.user_id,
            display_name: value.display_name,
            joined_at: DateTime::from_system_time(value.joined_at),
        }
    }
}

impl From<MongoParticipantDocument> for ParticipantEntity {
    fn from(value: MongoParticipantDocument) -> Self {
        Self {
            session_id: value.session_id,
            user_id: value.user_id,
            display_name: value.display_name,
            joined_at: value.joined_at.to_system_time(),
        }
    }
}

/// Vote document in the `session_votes` collection, unique per
/// `(session_id, task_id, user_id)`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoVoteDocument {
    pub session_id: Uuid,
    pub task_id: Uuid,
    pub user_id: Uuid,
    story_points: Option<u8>,
    created_at: DateTime,
    updated_at: DateTime,
}

impl From<VoteEntity> for MongoVoteDocument {
    fn from(value: VoteEntity) -> Self {
        Self {
            session_id: value.session_id,
            task_id: value.task_id,
            user_id: value.user_id,
            story_points: value.story_points,
            created_at: DateTime::from_system_time(value.created_at),
            updated_at: DateTime::from_system_time(value.updated_at),
        }
    }
}

impl From<MongoVoteDocument> for VoteEntity {
    fn from(value: MongoVoteDocument) -> Self {
        Self {
            session_id: value.session_id,
            task_id: value.task_id,
            user_id: value.user_id,
            story_points: value.story_points,
            created_at: value.created_at.to_system_time(),
            updated_at: value.updated_at.to_system_time(),
        }
    }
}

/// Encode a UUID the way the driver stores `uuid::Uuid` fields so query
/// filters match serialized documents.
pub fn uuid_as_binary(id: Uuid) -> Binary {
    Binary {
        subtype: BinarySubtype::Uuid,
        bytes: id.into_bytes().to_vec(),
    }
}

/// Filter document selecting a record by `_id`.
pub fn doc_id(id: Uuid) -> Document {
    doc! {"_id": uuid_as_binary(id)}
}
