//! Async driver around [`SessionView`]: runs the optimistic mutations with
//! rollback, pumps channel signals into the view, and executes the
//! re-fetch instructions the view emits.

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tokio_stream::{StreamExt, wrappers::UnboundedReceiverStream};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::state::session_channel;

use super::{
    api::{ClientError, SessionApi},
    reconciler::{ChannelEvent, Refetch, SessionView},
    transport::{ChannelSignal, EventSubscriber, Subscription},
};

/// Client handle for one estimation session.
///
/// All state lives in the inner [`SessionView`]; this type only sequences
/// API calls around it and never becomes a second source of truth.
pub struct SessionClient {
    api: Arc<dyn SessionApi>,
    session_id: Uuid,
    view: Mutex<SessionView>,
}

impl SessionClient {
    /// Build a client for `session_id` acting as `user_id`.
    pub fn new(api: Arc<dyn SessionApi>, session_id: Uuid, user_id: Uuid) -> Arc<Self> {
        Arc::new(Self {
            api,
            session_id,
            view: Mutex::new(SessionView::new(user_id)),
        })
    }

    /// Read access to the reconciled view.
    pub async fn with_view<R>(&self, read: impl FnOnce(&SessionView) -> R) -> R {
        let view = self.view.lock().await;
        read(&view)
    }

    /// Mutable access to the view's UI-only state (estimate draft,
    /// notices).
    pub async fn with_view_mut<R>(&self, update: impl FnOnce(&mut SessionView) -> R) -> R {
        let mut view = self.view.lock().await;
        update(&mut view)
    }

    /// Join the session (idempotent) and load the initial state.
    pub async fn join(&self) -> Result<(), ClientError> {
        self.api.join(self.session_id).await?;
        self.run_refetch(Refetch::all()).await;
        Ok(())
    }

    /// Force a full re-fetch of the authoritative state.
    pub async fn refresh(&self) {
        self.run_refetch(Refetch::all()).await;
    }

    /// Cast a first vote, optimistically reflecting it locally and rolling
    /// back if the server rejects it.
    pub async fn vote(&self, story_points: Option<u8>) -> Result<(), ClientError> {
        self.submit_vote(story_points, false).await
    }

    /// Change an existing vote with the same optimistic handling.
    pub async fn change_vote(&self, story_points: Option<u8>) -> Result<(), ClientError> {
        self.submit_vote(story_points, true).await
    }

    /// Finalize the current task (owner only), then resync.
    pub async fn finalize(&self, final_story_points: Option<u32>) -> Result<(), ClientError> {
        self.api
            .finalize(self.session_id, final_story_points)
            .await?;
        self.run_refetch(Refetch::all()).await;
        Ok(())
    }

    /// End the session early (owner only), then resync.
    pub async fn end(&self) -> Result<(), ClientError> {
        self.api.end(self.session_id).await?;
        self.run_refetch(Refetch {
            session: true,
            ..Refetch::none()
        })
        .await;
        Ok(())
    }

    /// Subscribe to the session's push channel and keep the view
    /// reconciled until the returned subscription is dropped.
    pub fn attach(self: &Arc<Self>, subscriber: &dyn EventSubscriber) -> Subscription {
        let (signal_tx, signal_rx) = mpsc::unbounded_channel::<ChannelSignal>();

        let subscription = subscriber.subscribe(
            &session_channel(self.session_id),
            Box::new(move |signal| {
                let _ = signal_tx.send(signal);
            }),
        );

        let client = Arc::clone(self);
        let pump = tokio::spawn(async move {
            let mut signals = UnboundedReceiverStream::new(signal_rx);
            while let Some(signal) = signals.next().await {
                client.handle_signal(signal).await;
            }
        });

        subscription.also(pump)
    }

    /// Apply one channel signal to the view and run whatever re-fetches it
    /// asks for.
    pub async fn handle_signal(&self, signal: ChannelSignal) {
        let refetch = {
            let mut view = self.view.lock().await;
            match signal {
                ChannelSignal::Connected => view.apply_connection(true),
                ChannelSignal::Disconnected { reason } => {
                    if let Some(reason) = reason {
                        debug!(%reason, "session channel disconnected");
                    }
                    view.apply_connection(false)
                }
                ChannelSignal::Event(raw) => match ChannelEvent::parse(&raw) {
                    Some(event) => {
                        let outcome = view.apply_event(&event);
                        if let Some(notice) = outcome.notice {
                            view.push_notice(notice);
                        }
                        outcome.refetch
                    }
                    None => Refetch::none(),
                },
            }
        };

        self.run_refetch(refetch).await;
    }

    async fn submit_vote(&self, story_points: Option<u8>, change: bool) -> Result<(), ClientError> {
        {
            let mut view = self.view.lock().await;
            view.begin_vote(story_points);
        }

        let result = if change {
            self.api.change_vote(self.session_id, story_points).await
        } else {
            self.api.vote(self.session_id, story_points).await
        };

        let mut view = self.view.lock().await;
        match &result {
            Ok(()) => view.confirm_vote(),
            // Both refusals and transport failures leave no durable vote we
            // can rely on; restore the previous selection either way.
            Err(_) => view.rollback_vote(),
        }
        drop(view);

        result
    }

    /// Execute re-fetch instructions, feeding results back into the view.
    /// Fetch failures are logged and dropped: the next broadcast (or the
    /// reconnect resync) will trigger another attempt.
    async fn run_refetch(&self, refetch: Refetch) {
        if refetch.is_empty() {
            return;
        }

        let mut pending = refetch;

        if pending.session {
            match self.api.get_session(self.session_id).await {
                Ok(session) => {
                    let mut view = self.view.lock().await;
                    let follow_up = view.ingest_session(session);
                    pending = pending.merge(follow_up);
                }
                Err(err) => warn!(error = %err, "session re-fetch failed"),
            }
        }

        if pending.participants {
            match self.api.get_participants(self.session_id).await {
                Ok(roster) => {
                    let mut view = self.view.lock().await;
                    view.ingest_participants(roster);
                }
                Err(err) => warn!(error = %err, "participant re-fetch failed"),
            }
        }

        if pending.votes {
            let task_id = {
                let view = self.view.lock().await;
                view.current_task_id()
            };
            // Nothing to fetch when the session has ended or is unknown.
            let Some(task_id) = task_id else { return };

            match self.api.get_votes(self.session_id, Some(task_id)).await {
                Ok(votes) => {
                    let mut view = self.view.lock().await;
                    view.ingest_votes(votes);
                }
                Err(err) => warn!(error = %err, "vote re-fetch failed"),
            }
        }
    }
}
