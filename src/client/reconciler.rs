//! Pure reconciliation core. [`SessionView`] is the only owner of local,
//! session-scoped UI state (my selection, reveal, the owner's estimate
//! draft). It merges two inputs: pushed channel events, which only yield
//! re-fetch instructions, and authoritative fetches, which replace state.
//! All merging is keyed by `(session id, current task id)` so stale or
//! duplicated inputs are discarded instead of corrupting the view.

use indexmap::IndexMap;
use uuid::Uuid;

use crate::{
    dto::{
        session::{ParticipantListResponse, ParticipantRow, SessionResponse, VoteListResponse,
            VoteRow},
        sse::{
            EVENT_MEMBER_JOINED, EVENT_SESSION_ENDED, EVENT_TASK_FINALIZED, EVENT_VOTE,
            MemberJoinedEvent, SessionEndedEvent, TaskFinalizedEvent, VoteEvent,
        },
    },
    state::consensus,
};

use super::transport::RawEvent;

/// Typed session event decoded from a raw channel frame.
#[derive(Debug, Clone)]
pub enum ChannelEvent {
    /// A participant cast or changed a vote.
    Vote(VoteEvent),
    /// A user joined for the first time.
    MemberJoined(MemberJoinedEvent),
    /// The owner finalized a task.
    TaskFinalized(TaskFinalizedEvent),
    /// The owner ended the session.
    SessionEnded(SessionEndedEvent),
}

impl ChannelEvent {
    /// Decode a raw frame; unknown names and malformed payloads yield
    /// `None` and are ignored by the reconciler.
    pub fn parse(raw: &RawEvent) -> Option<Self> {
        match raw.name.as_deref()? {
            EVENT_VOTE => serde_json::from_str(&raw.data).ok().map(Self::Vote),
            EVENT_MEMBER_JOINED => serde_json::from_str(&raw.data).ok().map(Self::MemberJoined),
            EVENT_TASK_FINALIZED => serde_json::from_str(&raw.data).ok().map(Self::TaskFinalized),
            EVENT_SESSION_ENDED => serde_json::from_str(&raw.data).ok().map(Self::SessionEnded),
            _ => None,
        }
    }
}

/// Which authoritative fetches an input asks for. Events never carry state
/// into the view directly; they only raise these flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Refetch {
    /// Re-fetch the session snapshot.
    pub session: bool,
    /// Re-fetch the votes for the current task.
    pub votes: bool,
    /// Re-fetch the participant roster.
    pub participants: bool,
}

impl Refetch {
    /// Nothing to fetch.
    pub fn none() -> Self {
        Self::default()
    }

    /// Fetch everything (used after connect/reconnect, when an unknown
    /// number of events was missed).
    pub fn all() -> Self {
        Self {
            session: true,
            votes: true,
            participants: true,
        }
    }

    /// Whether any flag is raised.
    pub fn is_empty(&self) -> bool {
        !(self.session || self.votes || self.participants)
    }

    /// Union of two instruction sets.
    pub fn merge(self, other: Self) -> Self {
        Self {
            session: self.session || other.session,
            votes: self.votes || other.votes,
            participants: self.participants || other.participants,
        }
    }
}

/// Transient UI notice raised by an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// Someone joined the session.
    MemberJoined {
        /// Display name of the new participant.
        display_name: String,
    },
    /// The session ended; the view is now read-only.
    SessionEnded,
}

/// Result of applying one input to the view.
#[derive(Debug, Default)]
pub struct EventOutcome {
    /// Fetches the caller should run against the authoritative API.
    pub refetch: Refetch,
    /// Notice to surface, if any.
    pub notice: Option<Notice>,
}

/// Connectivity of the push channel. Purely informative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionStatus {
    /// Not connected yet.
    #[default]
    Connecting,
    /// Receiving events.
    Connected,
    /// Lost; the transport retries in the background.
    Disconnected,
}

/// A vote in flight, remembered so a server rejection can restore the
/// previous selection.
#[derive(Debug, Clone, Copy)]
struct PendingVote {
    previous: Option<Option<u8>>,
}

/// Local reconciled state for one session, scoped to the authenticated
/// user.
pub struct SessionView {
    user_id: Uuid,
    session: Option<SessionResponse>,
    participants: Vec<ParticipantRow>,
    votes: IndexMap<Uuid, VoteRow>,
    /// Value the local user picked, including an explicit pass
    /// (`Some(None)`); `None` while nothing is selected.
    my_selection: Option<Option<u8>>,
    pending_vote: Option<PendingVote>,
    final_points_draft: Option<u32>,
    connection: ConnectionStatus,
    notices: Vec<Notice>,
}

impl SessionView {
    /// Empty view for the given authenticated user.
    pub fn new(user_id: Uuid) -> Self {
        Self {
            user_id,
            session: None,
            participants: Vec::new(),
            votes: IndexMap::new(),
            my_selection: None,
            pending_vote: None,
            final_points_draft: None,
            connection: ConnectionStatus::default(),
            notices: Vec::new(),
        }
    }

    /// Authenticated user the view belongs to.
    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    /// Last authoritative session snapshot.
    pub fn session(&self) -> Option<&SessionResponse> {
        self.session.as_ref()
    }

    /// Task currently under estimation, while the session is active.
    pub fn current_task_id(&self) -> Option<Uuid> {
        self.session.as_ref().and_then(SessionResponse::current_task_id)
    }

    /// Participant roster from the last authoritative fetch.
    pub fn participants(&self) -> &[ParticipantRow] {
        &self.participants
    }

    /// Votes for the current task from the last authoritative fetch, in
    /// cast order.
    pub fn votes(&self) -> impl Iterator<Item = &VoteRow> {
        self.votes.values()
    }

    /// The local user's selected value, including an explicit pass.
    pub fn my_selection(&self) -> Option<Option<u8>> {
        self.my_selection
    }

    /// The owner's draft for the final estimate input.
    pub fn final_points_draft(&self) -> Option<u32> {
        self.final_points_draft
    }

    /// Update the owner's estimate draft.
    pub fn set_final_points_draft(&mut self, value: Option<u32>) {
        self.final_points_draft = value;
    }

    /// Push-channel connectivity, for a UI indicator only.
    pub fn connection(&self) -> ConnectionStatus {
        self.connection
    }

    /// Drain accumulated notices for display.
    pub fn take_notices(&mut self) -> Vec<Notice> {
        std::mem::take(&mut self.notices)
    }

    /// Whether results are revealed: recomputed locally from the fetched
    /// roster and votes, never taken from a push payload. Changing a vote
    /// after reveal simply recomputes this and may keep it `true` while
    /// values shift.
    pub fn revealed(&self) -> bool {
        consensus::all_voted(
            self.participants.iter().map(|participant| &participant.user_id),
            self.votes.keys(),
        )
    }

    /// Record an optimistic selection before the vote request is sent.
    /// Returns immediately; [`confirm_vote`](Self::confirm_vote) or
    /// [`rollback_vote`](Self::rollback_vote) settles it.
    pub fn begin_vote(&mut self, story_points: Option<u8>) {
        // Re-applying the same optimistic value keeps the original
        // rollback point.
        if self.pending_vote.is_none() {
            self.pending_vote = Some(PendingVote {
                previous: self.my_selection,
            });
        }
        self.my_selection = Some(story_points);
    }

    /// The server accepted the in-flight vote.
    pub fn confirm_vote(&mut self) {
        self.pending_vote = None;
    }

    /// The server rejected the in-flight vote; restore the previous
    /// selection so the UI never silently keeps a failed vote.
    pub fn rollback_vote(&mut self) {
        if let Some(pending) = self.pending_vote.take() {
            self.my_selection = pending.previous;
        }
    }

    /// Merge an authoritative session snapshot. A change of session or of
    /// the current task clears the task-scoped local state and asks for a
    /// vote re-fetch.
    pub fn ingest_session(&mut self, session: SessionResponse) -> Refetch {
        let previous_key = self.reconciliation_key();
        let next_key = Self::key_of(&session);

        self.session = Some(session);

        if previous_key == Some(next_key) {
            return Refetch::none();
        }

        self.clear_task_state();
        Refetch {
            session: false,
            votes: self.current_task_id().is_some(),
            participants: previous_key.map(|(id, _)| id) != Some(next_key.0),
        }
    }

    /// Merge an authoritative vote fetch. Fetches for a task that is no
    /// longer current are stale and discarded.
    pub fn ingest_votes(&mut self, response: VoteListResponse) {
        let Some(session) = &self.session else {
            return;
        };

        let acceptable = match session.current_task_id() {
            Some(current) => response.task_id == current,
            // Ended session: the view is read-only and shows whichever
            // task was explicitly fetched.
            None => session.task_ids.contains(&response.task_id),
        };
        if !acceptable {
            return;
        }

        self.votes = response
            .votes
            .into_iter()
            .map(|vote| (vote.user_id, vote))
            .collect();

        // With no operation in flight the server is the truth for the
        // local selection too (covers refresh and multi-device voting).
        if self.pending_vote.is_none() {
            self.my_selection = self
                .votes
                .get(&self.user_id)
                .map(|vote| vote.story_points);
        }
    }

    /// Merge an authoritative roster fetch.
    pub fn ingest_participants(&mut self, response: ParticipantListResponse) {
        self.participants = response.participants;
    }

    /// Apply a pushed channel event. Events are hints: the outcome tells
    /// the caller what to re-fetch, and applying the same event twice (or
    /// out of order) is harmless.
    pub fn apply_event(&mut self, event: &ChannelEvent) -> EventOutcome {
        match event {
            ChannelEvent::Vote(vote) => {
                let mut refetch = Refetch {
                    votes: true,
                    ..Refetch::none()
                };
                match self.current_task_id() {
                    Some(current) if current == vote.task_id => {
                        // Our own vote echoing back (same client or another
                        // device): reflect it without waiting for the fetch.
                        if vote.user_id == self.user_id && self.pending_vote.is_none() {
                            self.my_selection = Some(vote.story_points);
                        }
                    }
                    _ => {
                        // Vote for a task we do not believe is current: our
                        // session snapshot is stale.
                        refetch.session = true;
                    }
                }
                EventOutcome {
                    refetch,
                    notice: None,
                }
            }
            ChannelEvent::MemberJoined(joined) => EventOutcome {
                refetch: Refetch {
                    session: true,
                    participants: true,
                    ..Refetch::none()
                },
                notice: Some(Notice::MemberJoined {
                    display_name: joined.display_name.clone(),
                }),
            },
            ChannelEvent::TaskFinalized(_) => {
                // The cursor moved server-side; drop task-scoped state now
                // and let the fetches rebuild the view.
                self.clear_task_state();
                EventOutcome {
                    refetch: Refetch {
                        session: true,
                        votes: true,
                        ..Refetch::none()
                    },
                    notice: None,
                }
            }
            ChannelEvent::SessionEnded(_) => {
                self.pending_vote = None;
                self.final_points_draft = None;
                EventOutcome {
                    refetch: Refetch {
                        session: true,
                        ..Refetch::none()
                    },
                    notice: Some(Notice::SessionEnded),
                }
            }
        }
    }

    /// Record a connectivity change. A fresh connection asks for a full
    /// resync because any number of events may have been missed.
    pub fn apply_connection(&mut self, connected: bool) -> Refetch {
        let was = self.connection;
        self.connection = if connected {
            ConnectionStatus::Connected
        } else {
            ConnectionStatus::Disconnected
        };

        if connected && was != ConnectionStatus::Connected {
            Refetch::all()
        } else {
            Refetch::none()
        }
    }

    /// Queue a notice for the UI.
    pub fn push_notice(&mut self, notice: Notice) {
        self.notices.push(notice);
    }

    /// Merge key: session id plus the cursor's task, independent of the
    /// lifecycle status so ending a session keeps its last reveal visible.
    fn reconciliation_key(&self) -> Option<(Uuid, Option<Uuid>)> {
        self.session.as_ref().map(Self::key_of)
    }

    fn key_of(session: &SessionResponse) -> (Uuid, Option<Uuid>) {
        (
            session.id,
            session.task_ids.get(session.current_task_index).copied(),
        )
    }

    fn clear_task_state(&mut self) {
        self.votes.clear();
        self.my_selection = None;
        self.pending_vote = None;
        self.final_points_draft = None;
    }
}

#[cfg(test)]
mod tests {
    use crate::dao::models::SessionStatus;
    use crate::dto::session::{TallyBucket, VoteListResponse};

    use super::*;

    fn session_snapshot(
        id: Uuid,
        task_ids: Vec<Uuid>,
        cursor: usize,
        status: SessionStatus,
    ) -> SessionResponse {
        SessionResponse {
            id,
            project_id: Uuid::new_v4(),
            created_by: Uuid::new_v4(),
            task_ids,
            current_task_index: cursor,
            status,
            created_at: "2026-08-01T00:00:00Z".into(),
            updated_at: "2026-08-01T00:00:00Z".into(),
        }
    }

    fn vote_row(user_id: Uuid, points: Option<u8>) -> VoteRow {
        VoteRow {
            user_id,
            display_name: "voter".into(),
            story_points: points,
            updated_at: "2026-08-01T00:00:00Z".into(),
        }
    }

    fn votes_response(task_id: Uuid, rows: Vec<VoteRow>) -> VoteListResponse {
        VoteListResponse {
            task_id,
            votes: rows,
            tally: Vec::<TallyBucket>::new(),
        }
    }

    fn roster(user_ids: &[Uuid]) -> ParticipantListResponse {
        ParticipantListResponse {
            participants: user_ids
                .iter()
                .map(|user_id| ParticipantRow {
                    user_id: *user_id,
                    display_name: "someone".into(),
                    joined_at: "2026-08-01T00:00:00Z".into(),
                })
                .collect(),
        }
    }

    fn seeded_view() -> (SessionView, SessionResponse) {
        let me = Uuid::new_v4();
        let mut view = SessionView::new(me);
        let session = session_snapshot(
            Uuid::new_v4(),
            vec![Uuid::new_v4(), Uuid::new_v4()],
            0,
            SessionStatus::Active,
        );
        view.ingest_session(session.clone());
        (view, session)
    }

    #[test]
    fn first_session_ingest_requests_votes_and_participants() {
        let mut view = SessionView::new(Uuid::new_v4());
        let session = session_snapshot(
            Uuid::new_v4(),
            vec![Uuid::new_v4()],
            0,
            SessionStatus::Active,
        );

        let refetch = view.ingest_session(session);
        assert!(refetch.votes);
        assert!(refetch.participants);
    }

    #[test]
    fn re_ingesting_the_same_snapshot_is_a_no_op() {
        let (mut view, session) = seeded_view();
        view.begin_vote(Some(5));
        view.confirm_vote();

        let refetch = view.ingest_session(session);
        assert!(refetch.is_empty());
        assert_eq!(view.my_selection(), Some(Some(5)));
    }

    #[test]
    fn task_change_clears_selection_draft_and_votes() {
        let (mut view, mut session) = seeded_view();
        let task = view.current_task_id().unwrap();
        view.ingest_votes(votes_response(task, vec![vote_row(view.user_id(), Some(8))]));
        view.begin_vote(Some(8));
        view.confirm_vote();
        view.set_final_points_draft(Some(8));

        session.current_task_index = 1;
        let refetch = view.ingest_session(session);

        assert!(refetch.votes);
        assert!(!refetch.participants);
        assert_eq!(view.my_selection(), None);
        assert_eq!(view.final_points_draft(), None);
        assert_eq!(view.votes().count(), 0);
    }

    #[test]
    fn stale_vote_fetch_for_previous_task_is_discarded() {
        let (mut view, mut session) = seeded_view();
        let old_task = session.task_ids[0];

        session.current_task_index = 1;
        view.ingest_session(session);

        view.ingest_votes(votes_response(old_task, vec![vote_row(Uuid::new_v4(), Some(3))]));
        assert_eq!(view.votes().count(), 0);
    }

    #[test]
    fn authoritative_votes_set_my_selection_when_idle() {
        let (mut view, _session) = seeded_view();
        let task = view.current_task_id().unwrap();

        view.ingest_votes(votes_response(task, vec![vote_row(view.user_id(), None)]));
        // A pass vote is still a selection.
        assert_eq!(view.my_selection(), Some(None));
    }

    #[test]
    fn own_vote_event_sets_selection_idempotently() {
        let (mut view, _session) = seeded_view();
        let task = view.current_task_id().unwrap();
        let event = ChannelEvent::Vote(VoteEvent {
            user_id: view.user_id(),
            task_id: task,
            story_points: Some(13),
        });

        let outcome = view.apply_event(&event);
        assert!(outcome.refetch.votes);
        assert!(!outcome.refetch.session);
        assert_eq!(view.my_selection(), Some(Some(13)));

        // Duplicate delivery: same result, still just a votes re-fetch.
        let outcome = view.apply_event(&event);
        assert!(outcome.refetch.votes);
        assert_eq!(view.my_selection(), Some(Some(13)));
    }

    #[test]
    fn foreign_vote_event_does_not_touch_selection() {
        let (mut view, _session) = seeded_view();
        let task = view.current_task_id().unwrap();
        view.begin_vote(Some(5));
        view.confirm_vote();

        let outcome = view.apply_event(&ChannelEvent::Vote(VoteEvent {
            user_id: Uuid::new_v4(),
            task_id: task,
            story_points: Some(21),
        }));

        assert!(outcome.refetch.votes);
        assert_eq!(view.my_selection(), Some(Some(5)));
    }

    #[test]
    fn vote_event_for_unknown_task_asks_for_session_resync() {
        let (mut view, _session) = seeded_view();

        let outcome = view.apply_event(&ChannelEvent::Vote(VoteEvent {
            user_id: Uuid::new_v4(),
            task_id: Uuid::new_v4(),
            story_points: Some(2),
        }));

        assert!(outcome.refetch.session);
        assert!(outcome.refetch.votes);
    }

    #[test]
    fn vote_event_does_not_clobber_in_flight_selection() {
        let (mut view, _session) = seeded_view();
        let task = view.current_task_id().unwrap();

        view.begin_vote(Some(3));
        // An older value echoes back from another tab while ours is in
        // flight; the optimistic pick must survive.
        view.apply_event(&ChannelEvent::Vote(VoteEvent {
            user_id: view.user_id(),
            task_id: task,
            story_points: Some(1),
        }));

        assert_eq!(view.my_selection(), Some(Some(3)));
    }

    #[test]
    fn rejected_vote_rolls_back_to_previous_selection() {
        let (mut view, _session) = seeded_view();

        view.begin_vote(Some(5));
        view.confirm_vote();
        view.begin_vote(Some(8));
        view.rollback_vote();

        assert_eq!(view.my_selection(), Some(Some(5)));
    }

    #[test]
    fn member_joined_raises_notice_and_refetches_roster() {
        let (mut view, _session) = seeded_view();

        let outcome = view.apply_event(&ChannelEvent::MemberJoined(MemberJoinedEvent {
            user_id: Uuid::new_v4(),
            display_name: "Grace".into(),
        }));

        assert!(outcome.refetch.participants);
        assert!(outcome.refetch.session);
        assert_eq!(
            outcome.notice,
            Some(Notice::MemberJoined {
                display_name: "Grace".into()
            })
        );
    }

    #[test]
    fn task_finalized_clears_state_and_refetches() {
        let (mut view, _session) = seeded_view();
        let task = view.current_task_id().unwrap();
        view.ingest_votes(votes_response(task, vec![vote_row(view.user_id(), Some(5))]));
        view.set_final_points_draft(Some(5));

        let outcome = view.apply_event(&ChannelEvent::TaskFinalized(TaskFinalizedEvent {
            task_id: task,
            final_story_points: 5,
            next_task_index: Some(1),
        }));

        assert!(outcome.refetch.session);
        assert!(outcome.refetch.votes);
        assert_eq!(view.my_selection(), None);
        assert_eq!(view.final_points_draft(), None);
        assert_eq!(view.votes().count(), 0);
    }

    #[test]
    fn session_ended_raises_terminal_notice() {
        let (mut view, _session) = seeded_view();

        let outcome = view.apply_event(&ChannelEvent::SessionEnded(SessionEndedEvent {
            session_id: view.session().unwrap().id,
        }));

        assert!(outcome.refetch.session);
        assert_eq!(outcome.notice, Some(Notice::SessionEnded));
    }

    #[test]
    fn reveal_is_recomputed_from_fetched_state() {
        let (mut view, _session) = seeded_view();
        let task = view.current_task_id().unwrap();
        let me = view.user_id();
        let other = Uuid::new_v4();

        view.ingest_participants(roster(&[me, other]));
        view.ingest_votes(votes_response(task, vec![vote_row(me, Some(5))]));
        assert!(!view.revealed());

        // The other participant passes; a pass still counts as voted.
        view.ingest_votes(votes_response(
            task,
            vec![vote_row(me, Some(5)), vote_row(other, None)],
        ));
        assert!(view.revealed());
    }

    #[test]
    fn reveal_stays_after_post_reveal_revote() {
        let (mut view, _session) = seeded_view();
        let task = view.current_task_id().unwrap();
        let me = view.user_id();
        let other = Uuid::new_v4();
        view.ingest_participants(roster(&[me, other]));
        view.ingest_votes(votes_response(
            task,
            vec![vote_row(me, Some(5)), vote_row(other, Some(8))],
        ));
        assert!(view.revealed());

        // A post-reveal revote shifts a value; results stay visible.
        view.ingest_votes(votes_response(
            task,
            vec![vote_row(me, Some(5)), vote_row(other, Some(13))],
        ));
        assert!(view.revealed());
    }

    #[test]
    fn reconnect_requests_full_resync_once() {
        let (mut view, _session) = seeded_view();

        assert_eq!(view.apply_connection(true), Refetch::all());
        assert_eq!(view.connection(), ConnectionStatus::Connected);
        // Repeated connected signals do not re-trigger the resync.
        assert!(view.apply_connection(true).is_empty());

        assert!(view.apply_connection(false).is_empty());
        assert_eq!(view.connection(), ConnectionStatus::Disconnected);
        assert_eq!(view.apply_connection(true), Refetch::all());
    }

    #[test]
    fn unknown_and_malformed_events_are_ignored() {
        assert!(ChannelEvent::parse(&RawEvent {
            name: Some("something-else".into()),
            data: "{}".into(),
        })
        .is_none());
        assert!(ChannelEvent::parse(&RawEvent {
            name: Some(EVENT_VOTE.into()),
            data: "not json".into(),
        })
        .is_none());
        assert!(ChannelEvent::parse(&RawEvent {
            name: None,
            data: "keep-alive".into(),
        })
        .is_none());
    }

    #[test]
    fn vote_event_round_trips_through_parse() {
        let task = Uuid::new_v4();
        let user = Uuid::new_v4();
        let raw = RawEvent {
            name: Some(EVENT_VOTE.into()),
            data: format!(r#"{{"user_id":"{user}","task_id":"{task}","story_points":null}}"#),
        };

        match ChannelEvent::parse(&raw) {
            Some(ChannelEvent::Vote(event)) => {
                assert_eq!(event.user_id, user);
                assert_eq!(event.task_id, task);
                assert_eq!(event.story_points, None);
            }
            other => panic!("expected vote event, got {other:?}"),
        }
    }

    #[test]
    fn ending_the_session_keeps_the_last_reveal_visible() {
        let (mut view, mut session) = seeded_view();
        let task = view.current_task_id().unwrap();
        let me = view.user_id();
        let other = Uuid::new_v4();
        view.ingest_participants(roster(&[me, other]));
        view.ingest_votes(votes_response(
            task,
            vec![vote_row(me, Some(5)), vote_row(other, Some(8))],
        ));
        assert!(view.revealed());

        // The owner ends the session; the refreshed snapshot keeps the
        // same cursor, so the fetched votes survive read-only.
        view.apply_event(&ChannelEvent::SessionEnded(SessionEndedEvent {
            session_id: session.id,
        }));
        session.status = SessionStatus::Ended;
        let refetch = view.ingest_session(session);

        assert!(refetch.is_empty());
        assert_eq!(view.votes().count(), 2);
        assert!(view.revealed());
    }

    #[test]
    fn ended_session_accepts_explicit_task_votes() {
        let me = Uuid::new_v4();
        let mut view = SessionView::new(me);
        let tasks = vec![Uuid::new_v4(), Uuid::new_v4()];
        view.ingest_session(session_snapshot(
            Uuid::new_v4(),
            tasks.clone(),
            1,
            SessionStatus::Ended,
        ));

        view.ingest_votes(votes_response(tasks[1], vec![vote_row(me, Some(5))]));
        assert_eq!(view.votes().count(), 1);

        // A task from another session is still rejected.
        view.ingest_votes(votes_response(Uuid::new_v4(), vec![vote_row(me, Some(8))]));
        assert_eq!(view.votes().count(), 1);
    }
}
