//! Orchestration of every session operation: load the authoritative record,
//! run the pure guards, perform the single store mutation, then broadcast.
//! No session data is cached in process; the stores are the source of truth.

use std::collections::HashMap;
use std::time::SystemTime;

use uuid::Uuid;

use crate::{
    dao::models::{ParticipantEntity, SessionEntity, SessionStatus, VoteEntity},
    dto::{
        auth::Identity,
        session::{
            CreateSessionRequest, ParticipantListResponse, ParticipantRow, SessionListResponse,
            SessionResponse, VoteListResponse, VoteRow,
        },
    },
    error::ServiceError,
    services::events,
    state::{
        SharedState,
        machine::{self, Advance, SessionError, SessionMachine},
    },
};

/// Open a new estimation session over an ordered task queue.
///
/// The creator becomes the owner and is enrolled as the first participant,
/// so a freshly created session is immediately readable by its owner.
pub async fn create_session(
    state: &SharedState,
    identity: &Identity,
    request: CreateSessionRequest,
) -> Result<SessionResponse, ServiceError> {
    let store = state.require_session_store().await?;

    let now = SystemTime::now();
    let session = SessionEntity {
        id: Uuid::new_v4(),
        project_id: request.project_id,
        created_by: identity.user_id,
        task_ids: request.task_ids,
        current_task_index: 0,
        status: SessionStatus::Active,
        created_at: now,
        updated_at: now,
    };

    store.insert_session(session.clone()).await?;
    store
        .add_participant(ParticipantEntity {
            session_id: session.id,
            user_id: identity.user_id,
            display_name: identity.display_name.clone(),
            joined_at: now,
        })
        .await?;

    events::broadcast_member_joined(state, session.id, identity.user_id, &identity.display_name);

    Ok(session.into())
}

/// List a project's sessions, most recent first.
pub async fn list_sessions(
    state: &SharedState,
    project_id: Uuid,
) -> Result<SessionListResponse, ServiceError> {
    let store = state.require_session_store().await?;
    let sessions = store
        .list_sessions(project_id)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    Ok(SessionListResponse { sessions })
}

/// Authoritative session snapshot for a participant.
pub async fn get_session(
    state: &SharedState,
    user_id: Uuid,
    session_id: Uuid,
) -> Result<SessionResponse, ServiceError> {
    let store = state.require_session_store().await?;
    let session = load_session(state, session_id).await?;
    ensure_participant(store.as_ref(), session_id, user_id).await?;
    Ok(session.into())
}

/// Votes for one task of a session, joined with the voters' display names.
///
/// Without an explicit `task_id` the session's current task is used, which
/// requires the session to still be active.
pub async fn get_votes(
    state: &SharedState,
    user_id: Uuid,
    session_id: Uuid,
    task_id: Option<Uuid>,
) -> Result<VoteListResponse, ServiceError> {
    let store = state.require_session_store().await?;
    let session = load_session(state, session_id).await?;
    ensure_participant(store.as_ref(), session_id, user_id).await?;

    let task_id = match task_id {
        Some(requested) => {
            if !session.task_ids.contains(&requested) {
                return Err(ServiceError::NotFound(format!(
                    "task `{requested}` is not part of session `{session_id}`"
                )));
            }
            requested
        }
        None => SessionMachine::new(&session).current_task()?,
    };

    let participants = store.list_participants(session_id).await?;
    let names: HashMap<Uuid, String> = participants
        .into_iter()
        .map(|participant| (participant.user_id, participant.display_name))
        .collect();

    let votes = store
        .list_votes(session_id, task_id)
        .await?
        .into_iter()
        .map(|vote| VoteRow {
            user_id: vote.user_id,
            display_name: names
                .get(&vote.user_id)
                .cloned()
                .unwrap_or_else(|| "unknown".into()),
            story_points: vote.story_points,
            updated_at: crate::dto::format_system_time(vote.updated_at),
        })
        .collect();

    Ok(VoteListResponse::new(task_id, votes))
}

/// Roster of the session's participants in join order.
pub async fn get_participants(
    state: &SharedState,
    user_id: Uuid,
    session_id: Uuid,
) -> Result<ParticipantListResponse, ServiceError> {
    let store = state.require_session_store().await?;
    load_session(state, session_id).await?;
    ensure_participant(store.as_ref(), session_id, user_id).await?;

    let participants = store
        .list_participants(session_id)
        .await?
        .into_iter()
        .map(ParticipantRow::from)
        .collect();
    Ok(ParticipantListResponse { participants })
}

/// Enroll the caller into the session. Idempotent: re-joining succeeds
/// silently and only the first join produces a `member-joined` broadcast.
pub async fn join_session(
    state: &SharedState,
    identity: &Identity,
    session_id: Uuid,
) -> Result<(), ServiceError> {
    let store = state.require_session_store().await?;
    let session = load_session(state, session_id).await?;
    SessionMachine::new(&session).ensure_active()?;

    let inserted = store
        .add_participant(ParticipantEntity {
            session_id,
            user_id: identity.user_id,
            display_name: identity.display_name.clone(),
            joined_at: SystemTime::now(),
        })
        .await?;

    if inserted {
        events::broadcast_member_joined(state, session_id, identity.user_id, &identity.display_name);
    }

    Ok(())
}

/// Cast the caller's first vote on the session's current task.
pub async fn cast_vote(
    state: &SharedState,
    identity: &Identity,
    session_id: Uuid,
    story_points: Option<u8>,
) -> Result<(), ServiceError> {
    machine::validate_story_points(state.config().deck(), story_points)?;

    let store = state.require_session_store().await?;
    let session = load_session(state, session_id).await?;
    let machine = SessionMachine::new(&session);

    let current_task = machine.current_task()?;
    let is_participant = is_participant(store.as_ref(), session_id, identity.user_id).await?;
    let existing = store
        .find_vote(session_id, current_task, identity.user_id)
        .await?;
    let task_id = machine.accept_vote(is_participant, existing.as_ref())?;

    write_vote(state, session_id, task_id, identity.user_id, story_points, existing).await
}

/// Overwrite the caller's existing vote on the session's current task.
pub async fn change_vote(
    state: &SharedState,
    identity: &Identity,
    session_id: Uuid,
    story_points: Option<u8>,
) -> Result<(), ServiceError> {
    machine::validate_story_points(state.config().deck(), story_points)?;

    let store = state.require_session_store().await?;
    let session = load_session(state, session_id).await?;
    let machine = SessionMachine::new(&session);

    let current_task = machine.current_task()?;
    let is_participant = is_participant(store.as_ref(), session_id, identity.user_id).await?;
    let existing = store
        .find_vote(session_id, current_task, identity.user_id)
        .await?;
    let task_id = machine.accept_revote(is_participant, existing.as_ref())?;

    write_vote(state, session_id, task_id, identity.user_id, story_points, existing).await
}

/// Commit a final estimate for the current task and advance the queue, or
/// end the session when the last task was finalized. Owner only.
///
/// Finalize does not snapshot or lock the vote rows: a vote racing this
/// call lands as a historical row for the finalized task and cannot alter
/// the committed estimate.
pub async fn finalize_task(
    state: &SharedState,
    identity: &Identity,
    session_id: Uuid,
    final_story_points: Option<u32>,
) -> Result<(), ServiceError> {
    let store = state.require_session_store().await?;
    let board = state.require_task_board().await?;

    let mut session = load_session(state, session_id).await?;
    let machine = SessionMachine::new(&session);
    machine.ensure_active()?;
    machine.authorize_owner(identity.user_id)?;
    let task_id = machine.current_task()?;

    let estimate = match final_story_points {
        Some(value) => {
            machine::validate_final_estimate(value)?;
            value
        }
        None => {
            let votes = store.list_votes(session_id, task_id).await?;
            machine::derive_estimate(&votes).ok_or(SessionError::InvalidStoryPoints {
                reason: "votes are split; an explicit final estimate is required".into(),
            })?
        }
    };

    let advance = machine.advance();

    board.set_story_points(task_id, estimate).await?;

    let next_task_index = match advance {
        Advance::Next(index) => {
            session.current_task_index = index;
            Some(index)
        }
        Advance::Ended => {
            session.status = SessionStatus::Ended;
            None
        }
    };
    session.updated_at = SystemTime::now();
    store.update_session(session).await?;

    events::broadcast_task_finalized(state, session_id, task_id, estimate, next_task_index);

    Ok(())
}

/// End the session unconditionally, independent of the cursor position.
/// Owner only.
pub async fn end_session(
    state: &SharedState,
    identity: &Identity,
    session_id: Uuid,
) -> Result<(), ServiceError> {
    let store = state.require_session_store().await?;

    let mut session = load_session(state, session_id).await?;
    let machine = SessionMachine::new(&session);
    machine.ensure_active()?;
    machine.authorize_owner(identity.user_id)?;

    session.status = SessionStatus::Ended;
    session.updated_at = SystemTime::now();
    store.update_session(session).await?;

    events::broadcast_session_ended(state, session_id);

    Ok(())
}

/// Whether a session exists. Used by the channel route before it parks a
/// subscriber on the session's broadcast channel.
pub async fn session_exists(state: &SharedState, session_id: Uuid) -> Result<bool, ServiceError> {
    let store = state.require_session_store().await?;
    Ok(store.find_session(session_id).await?.is_some())
}

async fn load_session(
    state: &SharedState,
    session_id: Uuid,
) -> Result<SessionEntity, ServiceError> {
    let store = state.require_session_store().await?;
    store
        .find_session(session_id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("session `{session_id}` not found")))
}

async fn is_participant(
    store: &dyn crate::dao::session_store::SessionStore,
    session_id: Uuid,
    user_id: Uuid,
) -> Result<bool, ServiceError> {
    let participants = store.list_participants(session_id).await?;
    Ok(participants
        .iter()
        .any(|participant| participant.user_id == user_id))
}

async fn ensure_participant(
    store: &dyn crate::dao::session_store::SessionStore,
    session_id: Uuid,
    user_id: Uuid,
) -> Result<(), ServiceError> {
    if is_participant(store, session_id, user_id).await? {
        Ok(())
    } else {
        Err(SessionError::NotParticipant.into())
    }
}

async fn write_vote(
    state: &SharedState,
    session_id: Uuid,
    task_id: Uuid,
    user_id: Uuid,
    story_points: Option<u8>,
    existing: Option<VoteEntity>,
) -> Result<(), ServiceError> {
    let store = state.require_session_store().await?;
    let now = SystemTime::now();
    store
        .upsert_vote(VoteEntity {
            session_id,
            task_id,
            user_id,
            story_points,
            created_at: existing.map(|vote| vote.created_at).unwrap_or(now),
            updated_at: now,
        })
        .await?;

    events::broadcast_vote(state, session_id, user_id, task_id, story_points);

    Ok(())
}
