use dashmap::DashMap;
use tokio::sync::broadcast;
use uuid::Uuid;

use crate::dto::sse::ServerEvent;

/// Prefix of the logical channel carrying a session's events.
pub const CHANNEL_PREFIX: &str = "planning-poker-";

/// Name of the broadcast channel for a session.
pub fn session_channel(session_id: Uuid) -> String {
    format!("{CHANNEL_PREFIX}{session_id}")
}

/// Extract the session id from a channel name, if it is one of ours.
pub fn channel_session(channel: &str) -> Option<Uuid> {
    channel
        .strip_prefix(CHANNEL_PREFIX)
        .and_then(|raw| Uuid::parse_str(raw).ok())
}

/// Fan-out hub holding one broadcast channel per subscribed session.
///
/// Channels are created lazily on first subscribe and pruned once the last
/// subscriber is gone; broadcasting into a channel nobody listens to is a
/// no-op. Delivery is best effort and never reported back to the caller
/// that triggered the event.
pub struct ChannelHub {
    channels: DashMap<String, broadcast::Sender<ServerEvent>>,
    capacity: usize,
}

impl ChannelHub {
    /// Construct a hub whose per-channel buffers hold `capacity` events.
    pub fn new(capacity: usize) -> Self {
        Self {
            channels: DashMap::new(),
            capacity,
        }
    }

    /// Register a subscriber on a channel, creating the channel on demand.
    pub fn subscribe(&self, channel: &str) -> broadcast::Receiver<ServerEvent> {
        self.channels
            .entry(channel.to_owned())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Send an event to all current subscribers of a channel.
    pub fn broadcast(&self, channel: &str, event: ServerEvent) {
        let stale = match self.channels.get(channel) {
            Some(sender) => sender.send(event).is_err(),
            None => return,
        };

        if stale {
            self.prune(channel);
        }
    }

    /// Drop the channel entry when nobody is subscribed anymore.
    pub fn prune(&self, channel: &str) {
        self.channels
            .remove_if(channel, |_, sender| sender.receiver_count() == 0);
    }

    /// Number of live subscribers on a channel.
    pub fn subscriber_count(&self, channel: &str) -> usize {
        self.channels
            .get(channel)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }
}
