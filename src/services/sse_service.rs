use std::{convert::Infallible, time::Duration};

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::Stream;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::info;

use crate::state::SharedState;

/// Subscribe to a session's broadcast channel.
pub fn subscribe(state: &SharedState, channel: &str) -> broadcast::Receiver<crate::dto::sse::ServerEvent> {
    state.channels().subscribe(channel)
}

/// Keeps the hub tidy: when the response stream is dropped because the
/// client went away, the channel entry is pruned if it has no subscribers
/// left.
pub struct ChannelGuard {
    state: SharedState,
    channel: String,
}

impl ChannelGuard {
    /// Tie a guard to the channel a stream serves.
    pub fn new(state: SharedState, channel: String) -> Self {
        Self { state, channel }
    }
}

impl Drop for ChannelGuard {
    fn drop(&mut self) {
        info!(channel = %self.channel, "session event stream disconnected");
        self.state.channels().prune(&self.channel);
    }
}

/// Convert a broadcast receiver into an SSE response, forwarding events
/// until the client disconnects.
pub fn to_sse_stream(
    mut receiver: broadcast::Receiver<crate::dto::sse::ServerEvent>,
    guard: ChannelGuard,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = async_stream::stream! {
        // Owned by the stream so cleanup runs exactly when axum drops it.
        let _guard = guard;
        loop {
            match receiver.recv().await {
                Ok(payload) => {
                    let mut event = Event::default().data(payload.data);
                    if let Some(name) = payload.event {
                        event = event.event(name);
                    }
                    yield Ok(event);
                }
                Err(RecvError::Closed) => break,
                Err(RecvError::Lagged(_)) => {
                    // Dropped events are only hints; the client re-fetches
                    // on the next one it receives.
                    continue;
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
