//! Pure transition guards for the session lifecycle. Services load the
//! session record plus the facts an operation depends on (membership, the
//! existing vote row) and let these guards decide; the store write happens
//! only after a guard accepts.

use thiserror::Error;
use uuid::Uuid;

use crate::dao::models::{SessionEntity, SessionStatus, VoteEntity};

/// Rejections produced by the session state machine.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Mutating call against a session whose status is `Ended`.
    #[error("session has ended")]
    SessionEnded,
    /// Finalize/end attempted by someone other than the session owner.
    #[error("only the session owner may perform this operation")]
    NotAuthorized,
    /// Vote or read attempted by a user who never joined.
    #[error("user has not joined this session")]
    NotParticipant,
    /// First-vote operation while a vote row already exists.
    #[error("a vote was already cast for this task; use change vote")]
    DuplicateVote,
    /// Change-vote operation without an existing vote row.
    #[error("no vote exists for this task yet")]
    NoExistingVote,
    /// Story-points value rejected before any store write.
    #[error("invalid story points: {reason}")]
    InvalidStoryPoints {
        /// What made the value unacceptable.
        reason: String,
    },
    /// The stored cursor does not address a task; the record is corrupt.
    #[error("session cursor {index} out of range for {len} tasks")]
    CursorOutOfRange {
        /// Stored cursor value.
        index: usize,
        /// Length of the task queue.
        len: usize,
    },
}

/// Outcome of finalizing the current task.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Advance {
    /// The cursor moves to the given index and the session stays active.
    Next(usize),
    /// The last task was finalized; the session transitions to `Ended`.
    Ended,
}

/// Guard layer over a loaded session record.
pub struct SessionMachine<'a> {
    session: &'a SessionEntity,
}

impl<'a> SessionMachine<'a> {
    /// Wrap a session record.
    pub fn new(session: &'a SessionEntity) -> Self {
        Self { session }
    }

    /// Reject any mutating operation once the session has ended.
    pub fn ensure_active(&self) -> Result<(), SessionError> {
        match self.session.status {
            SessionStatus::Active => Ok(()),
            SessionStatus::Ended => Err(SessionError::SessionEnded),
        }
    }

    /// Reject callers other than the session owner.
    pub fn authorize_owner(&self, user_id: Uuid) -> Result<(), SessionError> {
        if self.session.created_by == user_id {
            Ok(())
        } else {
            Err(SessionError::NotAuthorized)
        }
    }

    /// Task currently under estimation. Only meaningful while active.
    pub fn current_task(&self) -> Result<Uuid, SessionError> {
        self.ensure_active()?;
        self.session
            .task_ids
            .get(self.session.current_task_index)
            .copied()
            .ok_or(SessionError::CursorOutOfRange {
                index: self.session.current_task_index,
                len: self.session.task_ids.len(),
            })
    }

    /// Validate a first vote: the caller must be a participant and must not
    /// already hold a vote row for the current task. Returns the task the
    /// vote targets.
    pub fn accept_vote(
        &self,
        is_participant: bool,
        existing: Option<&VoteEntity>,
    ) -> Result<Uuid, SessionError> {
        let task_id = self.current_task()?;
        if !is_participant {
            return Err(SessionError::NotParticipant);
        }
        if existing.is_some() {
            return Err(SessionError::DuplicateVote);
        }
        Ok(task_id)
    }

    /// Validate a revote: the caller must be a participant with an existing
    /// vote row for the current task. Returns the task the vote targets.
    pub fn accept_revote(
        &self,
        is_participant: bool,
        existing: Option<&VoteEntity>,
    ) -> Result<Uuid, SessionError> {
        let task_id = self.current_task()?;
        if !is_participant {
            return Err(SessionError::NotParticipant);
        }
        if existing.is_none() {
            return Err(SessionError::NoExistingVote);
        }
        Ok(task_id)
    }

    /// Where finalizing the current task moves the session.
    pub fn advance(&self) -> Advance {
        let last_index = self.session.task_ids.len().saturating_sub(1);
        if self.session.current_task_index >= last_index {
            Advance::Ended
        } else {
            Advance::Next(self.session.current_task_index + 1)
        }
    }
}

/// Check a vote value against the configured estimation deck. A `None`
/// (pass) is always acceptable.
pub fn validate_story_points(deck: &[u8], value: Option<u8>) -> Result<(), SessionError> {
    match value {
        None => Ok(()),
        Some(points) if deck.contains(&points) => Ok(()),
        Some(points) => Err(SessionError::InvalidStoryPoints {
            reason: format!("{points} is not part of the estimation deck"),
        }),
    }
}

/// Check the owner's final estimate. Validated independently of the deck:
/// the owner may commit any strictly positive integer.
pub fn validate_final_estimate(value: u32) -> Result<(), SessionError> {
    if value == 0 {
        return Err(SessionError::InvalidStoryPoints {
            reason: "final estimate must be a positive integer".into(),
        });
    }
    Ok(())
}

/// Derive the estimate to commit when the owner finalizes without an
/// explicit override: usable only when every non-pass vote agrees on one
/// value.
pub fn derive_estimate(votes: &[VoteEntity]) -> Option<u32> {
    let mut agreed: Option<u8> = None;
    for vote in votes {
        match (vote.story_points, agreed) {
            (None, _) => continue,
            (Some(points), None) => agreed = Some(points),
            (Some(points), Some(current)) if points == current => continue,
            (Some(_), Some(_)) => return None,
        }
    }
    agreed.map(u32::from)
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use super::*;

    fn session_with(task_count: usize, cursor: usize, status: SessionStatus) -> SessionEntity {
        let now = SystemTime::now();
        SessionEntity {
            id: Uuid::new_v4(),
            project_id: Uuid::new_v4(),
            created_by: Uuid::new_v4(),
            task_ids: (0..task_count).map(|_| Uuid::new_v4()).collect(),
            current_task_index: cursor,
            status,
            created_at: now,
            updated_at: now,
        }
    }

    fn vote_row(session: &SessionEntity, user_id: Uuid, points: Option<u8>) -> VoteEntity {
        let now = SystemTime::now();
        VoteEntity {
            session_id: session.id,
            task_id: session.task_ids[session.current_task_index],
            user_id,
            story_points: points,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn ended_session_rejects_everything() {
        let session = session_with(2, 1, SessionStatus::Ended);
        let machine = SessionMachine::new(&session);

        assert_eq!(machine.ensure_active(), Err(SessionError::SessionEnded));
        assert_eq!(machine.current_task(), Err(SessionError::SessionEnded));
        assert_eq!(
            machine.accept_vote(true, None),
            Err(SessionError::SessionEnded)
        );
        assert_eq!(
            machine.accept_revote(true, None),
            Err(SessionError::SessionEnded)
        );
    }

    #[test]
    fn only_owner_passes_authorization() {
        let session = session_with(1, 0, SessionStatus::Active);
        let machine = SessionMachine::new(&session);

        assert!(machine.authorize_owner(session.created_by).is_ok());
        assert_eq!(
            machine.authorize_owner(Uuid::new_v4()),
            Err(SessionError::NotAuthorized)
        );
    }

    #[test]
    fn vote_requires_membership_and_no_prior_vote() {
        let session = session_with(2, 0, SessionStatus::Active);
        let machine = SessionMachine::new(&session);
        let voter = Uuid::new_v4();
        let existing = vote_row(&session, voter, Some(5));

        assert_eq!(
            machine.accept_vote(false, None),
            Err(SessionError::NotParticipant)
        );
        assert_eq!(
            machine.accept_vote(true, Some(&existing)),
            Err(SessionError::DuplicateVote)
        );
        assert_eq!(machine.accept_vote(true, None), Ok(session.task_ids[0]));
    }

    #[test]
    fn revote_requires_existing_row() {
        let session = session_with(2, 1, SessionStatus::Active);
        let machine = SessionMachine::new(&session);
        let existing = vote_row(&session, Uuid::new_v4(), None);

        assert_eq!(
            machine.accept_revote(true, None),
            Err(SessionError::NoExistingVote)
        );
        assert_eq!(
            machine.accept_revote(false, Some(&existing)),
            Err(SessionError::NotParticipant)
        );
        assert_eq!(
            machine.accept_revote(true, Some(&existing)),
            Ok(session.task_ids[1])
        );
    }

    #[test]
    fn advance_moves_cursor_until_last_task() {
        let session = session_with(3, 0, SessionStatus::Active);
        assert_eq!(SessionMachine::new(&session).advance(), Advance::Next(1));

        let session = session_with(3, 2, SessionStatus::Active);
        assert_eq!(SessionMachine::new(&session).advance(), Advance::Ended);

        let session = session_with(1, 0, SessionStatus::Active);
        assert_eq!(SessionMachine::new(&session).advance(), Advance::Ended);
    }

    #[test]
    fn corrupt_cursor_is_reported() {
        let mut session = session_with(2, 0, SessionStatus::Active);
        session.current_task_index = 5;
        let machine = SessionMachine::new(&session);

        assert_eq!(
            machine.current_task(),
            Err(SessionError::CursorOutOfRange { index: 5, len: 2 })
        );
    }

    #[test]
    fn deck_validation_accepts_members_and_pass() {
        let deck = [1, 2, 3, 5, 8, 13, 21];

        assert!(validate_story_points(&deck, None).is_ok());
        assert!(validate_story_points(&deck, Some(8)).is_ok());
        assert!(matches!(
            validate_story_points(&deck, Some(4)),
            Err(SessionError::InvalidStoryPoints { .. })
        ));
    }

    #[test]
    fn final_estimate_must_be_positive_but_not_deck_bound() {
        assert!(validate_final_estimate(4).is_ok());
        assert!(validate_final_estimate(100).is_ok());
        assert!(matches!(
            validate_final_estimate(0),
            Err(SessionError::InvalidStoryPoints { .. })
        ));
    }

    #[test]
    fn estimate_derivation_requires_unanimous_non_pass_votes() {
        let session = session_with(1, 0, SessionStatus::Active);
        let unanimous = vec![
            vote_row(&session, Uuid::new_v4(), Some(5)),
            vote_row(&session, Uuid::new_v4(), None),
            vote_row(&session, Uuid::new_v4(), Some(5)),
        ];
        assert_eq!(derive_estimate(&unanimous), Some(5));

        let split = vec![
            vote_row(&session, Uuid::new_v4(), Some(5)),
            vote_row(&session, Uuid::new_v4(), Some(8)),
        ];
        assert_eq!(derive_estimate(&split), None);

        let all_pass = vec![vote_row(&session, Uuid::new_v4(), None)];
        assert_eq!(derive_estimate(&all_pass), None);
    }
}
