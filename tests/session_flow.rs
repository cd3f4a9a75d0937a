//! End-to-end exercises of the session operations over the in-memory
//! backend: lifecycle, membership, voting, consensus, finalization, and
//! the broadcasts each operation produces.

use std::sync::Arc;

use tokio::sync::broadcast::Receiver;
use uuid::Uuid;

use planning_poker_back::{
    config::AppConfig,
    dao::{
        models::SessionStatus, session_store::memory::MemorySessionStore,
        task_board::MemoryTaskBoard,
    },
    dto::{
        auth::Identity,
        session::CreateSessionRequest,
        sse::ServerEvent,
    },
    error::ServiceError,
    services::session_service,
    state::{AppState, SharedState, consensus, session_channel},
};

struct Harness {
    state: SharedState,
    board: Arc<MemoryTaskBoard>,
}

fn identity(name: &str) -> Identity {
    Identity {
        user_id: Uuid::new_v4(),
        display_name: name.into(),
    }
}

async fn harness() -> Harness {
    let state = AppState::new(AppConfig::default());
    let store = Arc::new(MemorySessionStore::new());
    let board = Arc::new(MemoryTaskBoard::new());
    state.install_backend(store, board.clone()).await;
    Harness { state, board }
}

async fn create_session(
    harness: &Harness,
    owner: &Identity,
    task_count: usize,
) -> (Uuid, Vec<Uuid>) {
    let task_ids: Vec<Uuid> = (0..task_count).map(|_| Uuid::new_v4()).collect();
    let session = session_service::create_session(
        &harness.state,
        owner,
        CreateSessionRequest {
            project_id: Uuid::new_v4(),
            task_ids: task_ids.clone(),
        },
    )
    .await
    .unwrap();
    (session.id, task_ids)
}

fn subscribe(harness: &Harness, session_id: Uuid) -> Receiver<ServerEvent> {
    harness
        .state
        .channels()
        .subscribe(&session_channel(session_id))
}

fn drain(receiver: &mut Receiver<ServerEvent>) -> Vec<ServerEvent> {
    let mut events = Vec::new();
    while let Ok(event) = receiver.try_recv() {
        events.push(event);
    }
    events
}

async fn all_voted_now(harness: &Harness, viewer: &Identity, session_id: Uuid) -> bool {
    let roster = session_service::get_participants(&harness.state, viewer.user_id, session_id)
        .await
        .unwrap();
    let votes = session_service::get_votes(&harness.state, viewer.user_id, session_id, None)
        .await
        .unwrap();

    let participant_ids: Vec<Uuid> = roster
        .participants
        .iter()
        .map(|participant| participant.user_id)
        .collect();
    let voter_ids: Vec<Uuid> = votes.votes.iter().map(|vote| vote.user_id).collect();
    consensus::all_voted(participant_ids.iter(), voter_ids.iter())
}

#[tokio::test]
async fn full_two_task_estimation_scenario() {
    let harness = harness().await;
    let owner = identity("Olivia");
    let voter = identity("Uma");

    let (session_id, task_ids) = create_session(&harness, &owner, 2).await;
    session_service::join_session(&harness.state, &voter, session_id)
        .await
        .unwrap();

    // Owner votes 5 on T1: one of two participants has voted.
    session_service::cast_vote(&harness.state, &owner, session_id, Some(5))
        .await
        .unwrap();
    assert!(!all_voted_now(&harness, &owner, session_id).await);

    // The second participant votes 8: consensus reached, results reveal.
    session_service::cast_vote(&harness.state, &voter, session_id, Some(8))
        .await
        .unwrap();
    assert!(all_voted_now(&harness, &owner, session_id).await);

    // Owner finalizes T1 at 5: the external task record gets the estimate
    // and the cursor advances while the session stays active.
    session_service::finalize_task(&harness.state, &owner, session_id, Some(5))
        .await
        .unwrap();
    assert_eq!(harness.board.story_points(task_ids[0]), Some(5));

    let session = session_service::get_session(&harness.state, owner.user_id, session_id)
        .await
        .unwrap();
    assert_eq!(session.current_task_index, 1);
    assert_eq!(session.status, SessionStatus::Active);

    // Owner terminates early on T2.
    session_service::end_session(&harness.state, &owner, session_id)
        .await
        .unwrap();
    let session = session_service::get_session(&harness.state, owner.user_id, session_id)
        .await
        .unwrap();
    assert_eq!(session.status, SessionStatus::Ended);

    // Any further vote is rejected as a terminal-state violation.
    let err = session_service::cast_vote(&harness.state, &voter, session_id, Some(3))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidState(_)));
}

#[tokio::test]
async fn join_is_idempotent_and_broadcasts_once() {
    let harness = harness().await;
    let owner = identity("owner");
    let voter = identity("late joiner");
    let (session_id, _) = create_session(&harness, &owner, 1).await;

    let mut receiver = subscribe(&harness, session_id);

    session_service::join_session(&harness.state, &voter, session_id)
        .await
        .unwrap();
    session_service::join_session(&harness.state, &voter, session_id)
        .await
        .unwrap();

    let roster = session_service::get_participants(&harness.state, voter.user_id, session_id)
        .await
        .unwrap();
    // Owner (auto-enrolled at creation) plus the voter, exactly once.
    assert_eq!(roster.participants.len(), 2);

    let events = drain(&mut receiver);
    let joins: Vec<_> = events
        .iter()
        .filter(|event| event.event.as_deref() == Some("member-joined"))
        .collect();
    assert_eq!(joins.len(), 1);
}

#[tokio::test]
async fn one_vote_row_per_user_with_last_write_wins() {
    let harness = harness().await;
    let owner = identity("owner");
    let (session_id, _) = create_session(&harness, &owner, 1).await;

    session_service::cast_vote(&harness.state, &owner, session_id, Some(3))
        .await
        .unwrap();
    session_service::change_vote(&harness.state, &owner, session_id, Some(8))
        .await
        .unwrap();
    session_service::change_vote(&harness.state, &owner, session_id, None)
        .await
        .unwrap();

    let votes = session_service::get_votes(&harness.state, owner.user_id, session_id, None)
        .await
        .unwrap();
    assert_eq!(votes.votes.len(), 1);
    assert_eq!(votes.votes[0].story_points, None);
}

#[tokio::test]
async fn vote_and_change_vote_enforce_the_wrong_operation_errors() {
    let harness = harness().await;
    let owner = identity("owner");
    let (session_id, _) = create_session(&harness, &owner, 1).await;

    // Nothing to change before the first vote.
    let err = session_service::change_vote(&harness.state, &owner, session_id, Some(5))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidState(_)));

    session_service::cast_vote(&harness.state, &owner, session_id, Some(5))
        .await
        .unwrap();

    // A second first-vote must be redirected to change vote.
    let err = session_service::cast_vote(&harness.state, &owner, session_id, Some(8))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidState(_)));
}

#[tokio::test]
async fn non_participants_cannot_vote_or_read() {
    let harness = harness().await;
    let owner = identity("owner");
    let stranger = identity("stranger");
    let (session_id, _) = create_session(&harness, &owner, 1).await;

    let err = session_service::cast_vote(&harness.state, &stranger, session_id, Some(5))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));

    let err = session_service::get_session(&harness.state, stranger.user_id, session_id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));

    // Joining fixes both.
    session_service::join_session(&harness.state, &stranger, session_id)
        .await
        .unwrap();
    session_service::cast_vote(&harness.state, &stranger, session_id, Some(5))
        .await
        .unwrap();
}

#[tokio::test]
async fn off_deck_values_are_rejected_before_any_write() {
    let harness = harness().await;
    let owner = identity("owner");
    let (session_id, _) = create_session(&harness, &owner, 1).await;

    let mut receiver = subscribe(&harness, session_id);

    let err = session_service::cast_vote(&harness.state, &owner, session_id, Some(4))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInput(_)));

    let votes = session_service::get_votes(&harness.state, owner.user_id, session_id, None)
        .await
        .unwrap();
    assert!(votes.votes.is_empty());
    assert!(drain(&mut receiver).is_empty());
}

#[tokio::test]
async fn pass_votes_count_toward_consensus() {
    let harness = harness().await;
    let owner = identity("owner");
    let voter = identity("voter");
    let (session_id, _) = create_session(&harness, &owner, 1).await;
    session_service::join_session(&harness.state, &voter, session_id)
        .await
        .unwrap();

    session_service::cast_vote(&harness.state, &owner, session_id, Some(13))
        .await
        .unwrap();
    assert!(!all_voted_now(&harness, &owner, session_id).await);

    // An explicit pass is a terminal choice, not an absent vote.
    session_service::cast_vote(&harness.state, &voter, session_id, None)
        .await
        .unwrap();
    assert!(all_voted_now(&harness, &owner, session_id).await);
}

#[tokio::test]
async fn finalize_is_owner_only_and_leaves_no_trace_on_rejection() {
    let harness = harness().await;
    let owner = identity("owner");
    let voter = identity("voter");
    let (session_id, task_ids) = create_session(&harness, &owner, 2).await;
    session_service::join_session(&harness.state, &voter, session_id)
        .await
        .unwrap();

    let mut receiver = subscribe(&harness, session_id);

    let err = session_service::finalize_task(&harness.state, &voter, session_id, Some(5))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));

    // No estimate written, no cursor movement, no broadcast.
    assert_eq!(harness.board.story_points(task_ids[0]), None);
    let session = session_service::get_session(&harness.state, owner.user_id, session_id)
        .await
        .unwrap();
    assert_eq!(session.current_task_index, 0);
    assert!(drain(&mut receiver).is_empty());

    let err = session_service::end_session(&harness.state, &voter, session_id)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Forbidden(_)));
}

#[tokio::test]
async fn finalize_advances_then_ends_on_the_last_task() {
    let harness = harness().await;
    let owner = identity("owner");
    let (session_id, task_ids) = create_session(&harness, &owner, 2).await;

    let mut receiver = subscribe(&harness, session_id);

    session_service::finalize_task(&harness.state, &owner, session_id, Some(3))
        .await
        .unwrap();
    let session = session_service::get_session(&harness.state, owner.user_id, session_id)
        .await
        .unwrap();
    assert_eq!(session.status, SessionStatus::Active);
    assert_eq!(session.current_task_index, 1);

    session_service::finalize_task(&harness.state, &owner, session_id, Some(8))
        .await
        .unwrap();
    let session = session_service::get_session(&harness.state, owner.user_id, session_id)
        .await
        .unwrap();
    assert_eq!(session.status, SessionStatus::Ended);
    assert_eq!(session.current_task_index, 1);

    assert_eq!(harness.board.story_points(task_ids[0]), Some(3));
    assert_eq!(harness.board.story_points(task_ids[1]), Some(8));

    // The finalize events carry the next cursor, null on the last one.
    let events = drain(&mut receiver);
    let payloads: Vec<serde_json::Value> = events
        .iter()
        .filter(|event| event.event.as_deref() == Some("task-finalized"))
        .map(|event| serde_json::from_str(&event.data).unwrap())
        .collect();
    assert_eq!(payloads.len(), 2);
    assert_eq!(payloads[0]["next_task_index"], 1);
    assert_eq!(payloads[0]["final_story_points"], 3);
    assert!(payloads[1].get("next_task_index").is_none());

    // The cursor is frozen now.
    let err = session_service::finalize_task(&harness.state, &owner, session_id, Some(1))
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidState(_)));
}

#[tokio::test]
async fn finalize_without_override_requires_unanimity() {
    let harness = harness().await;
    let owner = identity("owner");
    let voter = identity("voter");
    let (session_id, task_ids) = create_session(&harness, &owner, 2).await;
    session_service::join_session(&harness.state, &voter, session_id)
        .await
        .unwrap();

    // Split votes: the owner must supply an explicit estimate.
    session_service::cast_vote(&harness.state, &owner, session_id, Some(5))
        .await
        .unwrap();
    session_service::cast_vote(&harness.state, &voter, session_id, Some(8))
        .await
        .unwrap();
    let err = session_service::finalize_task(&harness.state, &owner, session_id, None)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::InvalidInput(_)));

    session_service::finalize_task(&harness.state, &owner, session_id, Some(13))
        .await
        .unwrap();
    assert_eq!(harness.board.story_points(task_ids[0]), Some(13));

    // Unanimous non-pass votes on the next task derive the estimate.
    session_service::cast_vote(&harness.state, &owner, session_id, Some(2))
        .await
        .unwrap();
    session_service::cast_vote(&harness.state, &voter, session_id, Some(2))
        .await
        .unwrap();
    session_service::finalize_task(&harness.state, &owner, session_id, None)
        .await
        .unwrap();
    assert_eq!(harness.board.story_points(task_ids[1]), Some(2));
}

#[tokio::test]
async fn ended_sessions_reject_every_mutation() {
    let harness = harness().await;
    let owner = identity("owner");
    let voter = identity("voter");
    let (session_id, _) = create_session(&harness, &owner, 1).await;
    session_service::join_session(&harness.state, &voter, session_id)
        .await
        .unwrap();
    session_service::cast_vote(&harness.state, &voter, session_id, Some(5))
        .await
        .unwrap();

    session_service::end_session(&harness.state, &owner, session_id)
        .await
        .unwrap();

    let vote = session_service::cast_vote(&harness.state, &voter, session_id, Some(5)).await;
    let change = session_service::change_vote(&harness.state, &voter, session_id, Some(8)).await;
    let finalize =
        session_service::finalize_task(&harness.state, &owner, session_id, Some(5)).await;
    let end = session_service::end_session(&harness.state, &owner, session_id).await;

    for result in [vote, change, finalize, end] {
        assert!(matches!(result.unwrap_err(), ServiceError::InvalidState(_)));
    }
}

#[tokio::test]
async fn vote_broadcast_carries_the_payload_hint() {
    let harness = harness().await;
    let owner = identity("owner");
    let (session_id, task_ids) = create_session(&harness, &owner, 1).await;

    let mut receiver = subscribe(&harness, session_id);
    session_service::cast_vote(&harness.state, &owner, session_id, Some(8))
        .await
        .unwrap();

    let events = drain(&mut receiver);
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].event.as_deref(), Some("vote"));

    let payload: serde_json::Value = serde_json::from_str(&events[0].data).unwrap();
    assert_eq!(payload["user_id"], owner.user_id.to_string());
    assert_eq!(payload["task_id"], task_ids[0].to_string());
    assert_eq!(payload["story_points"], 8);
}

#[tokio::test]
async fn votes_are_scoped_to_their_task_across_advances() {
    let harness = harness().await;
    let owner = identity("owner");
    let (session_id, task_ids) = create_session(&harness, &owner, 2).await;

    session_service::cast_vote(&harness.state, &owner, session_id, Some(5))
        .await
        .unwrap();
    session_service::finalize_task(&harness.state, &owner, session_id, Some(5))
        .await
        .unwrap();

    // The new current task starts with a clean slate; the old task's vote
    // is still retrievable explicitly.
    let current = session_service::get_votes(&harness.state, owner.user_id, session_id, None)
        .await
        .unwrap();
    assert_eq!(current.task_id, task_ids[1]);
    assert!(current.votes.is_empty());

    let first = session_service::get_votes(
        &harness.state,
        owner.user_id,
        session_id,
        Some(task_ids[0]),
    )
    .await
    .unwrap();
    assert_eq!(first.votes.len(), 1);
    assert_eq!(first.votes[0].story_points, Some(5));
}
