//! Push-channel transport abstraction. The reconciler only depends on the
//! [`EventSubscriber`] capability, so the SSE implementation here can be
//! swapped for any other push transport without touching reconciliation.

use std::time::Duration;

use futures::StreamExt;
use rand::Rng;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::dto::auth::{USER_ID_HEADER, USER_NAME_HEADER};

/// Raw event as carried by the wire transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    /// Event name, when the transport distinguishes one.
    pub name: Option<String>,
    /// Raw payload body.
    pub data: String,
}

/// Everything a subscription reports to its handler. Connection lifecycle
/// signals are informative only; correctness never depends on them.
#[derive(Debug, Clone)]
pub enum ChannelSignal {
    /// The channel is connected and delivering events.
    Connected,
    /// An event arrived.
    Event(RawEvent),
    /// The connection dropped; the subscriber keeps retrying on its own.
    Disconnected {
        /// Transport-level reason, when one is known.
        reason: Option<String>,
    },
}

/// Callback receiving channel signals.
pub type SignalHandler = Box<dyn Fn(ChannelSignal) + Send + Sync>;

/// Capability to subscribe to a named push channel.
pub trait EventSubscriber: Send + Sync {
    /// Start delivering the channel's signals to `on_signal` until the
    /// returned [`Subscription`] is dropped.
    fn subscribe(&self, channel: &str, on_signal: SignalHandler) -> Subscription;
}

/// Guard keeping a subscription alive; dropping it unsubscribes.
pub struct Subscription {
    tasks: Vec<JoinHandle<()>>,
}

impl Subscription {
    /// Subscription backed by a delivery task.
    pub fn from_task(handle: JoinHandle<()>) -> Self {
        Self {
            tasks: vec![handle],
        }
    }

    /// Subscription with no background work (synchronous test doubles).
    pub fn detached() -> Self {
        Self { tasks: Vec::new() }
    }

    /// Tie another task's lifetime to this subscription.
    pub fn also(mut self, handle: JoinHandle<()>) -> Self {
        self.tasks.push(handle);
        self
    }

    /// Explicitly stop delivery.
    pub fn unsubscribe(self) {}
}

impl Drop for Subscription {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}

/// Incremental parser for `text/event-stream` frames.
///
/// Feed it raw chunks as they arrive; it emits an event per blank-line
/// boundary and keeps incomplete frames buffered across chunks.
#[derive(Default)]
pub struct SseFrameParser {
    buffer: String,
    event_name: Option<String>,
    data_lines: Vec<String>,
}

impl SseFrameParser {
    /// Create an empty parser.
    pub fn new() -> Self {
        Self::default()
    }

    /// Consume a chunk and return every event completed by it.
    pub fn feed(&mut self, chunk: &str) -> Vec<RawEvent> {
        self.buffer.push_str(chunk);

        let mut events = Vec::new();
        while let Some(newline) = self.buffer.find('\n') {
            let line: String = self.buffer.drain(..=newline).collect();
            let line = line.trim_end_matches(['\n', '\r']);

            if line.is_empty() {
                if let Some(event) = self.flush() {
                    events.push(event);
                }
                continue;
            }

            // Comment lines (keep-alives) carry no field name.
            if line.starts_with(':') {
                continue;
            }

            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line, ""),
            };

            match field {
                "event" => self.event_name = Some(value.to_owned()),
                "data" => self.data_lines.push(value.to_owned()),
                // id/retry and unknown fields are irrelevant to reconciliation.
                _ => {}
            }
        }

        events
    }

    fn flush(&mut self) -> Option<RawEvent> {
        if self.event_name.is_none() && self.data_lines.is_empty() {
            return None;
        }
        let event = RawEvent {
            name: self.event_name.take(),
            data: self.data_lines.join("\n"),
        };
        self.data_lines.clear();
        Some(event)
    }
}

const RECONNECT_INITIAL: Duration = Duration::from_millis(500);
const RECONNECT_MAX: Duration = Duration::from_secs(15);
const RECONNECT_JITTER_MS: u64 = 250;

/// SSE implementation of [`EventSubscriber`] over the backend's
/// `/channels/{channel}` route.
pub struct SseSubscriber {
    http: reqwest::Client,
    base_url: String,
    user_id: Uuid,
    display_name: Option<String>,
}

impl SseSubscriber {
    /// Subscriber authenticating as `user_id` against `base_url`.
    pub fn new(base_url: impl Into<String>, user_id: Uuid, display_name: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            user_id,
            display_name,
        }
    }

    async fn run(self_: SseSubscriberTask, on_signal: SignalHandler) {
        let mut delay = RECONNECT_INITIAL;

        loop {
            let request = {
                let mut request = self_
                    .http
                    .get(&self_.url)
                    .header(USER_ID_HEADER, self_.user_id.to_string());
                if let Some(name) = &self_.display_name {
                    request = request.header(USER_NAME_HEADER, name);
                }
                request
            };

            match request.send().await {
                Ok(response) if response.status().is_success() => {
                    on_signal(ChannelSignal::Connected);
                    delay = RECONNECT_INITIAL;

                    let mut parser = SseFrameParser::new();
                    let mut body = response.bytes_stream();
                    let mut failure: Option<String> = None;

                    while let Some(chunk) = body.next().await {
                        match chunk {
                            Ok(bytes) => {
                                let text = String::from_utf8_lossy(&bytes);
                                for event in parser.feed(&text) {
                                    on_signal(ChannelSignal::Event(event));
                                }
                            }
                            Err(err) => {
                                failure = Some(err.to_string());
                                break;
                            }
                        }
                    }

                    debug!(url = %self_.url, "event stream closed; reconnecting");
                    on_signal(ChannelSignal::Disconnected { reason: failure });
                }
                Ok(response) => {
                    warn!(url = %self_.url, status = %response.status(), "event stream rejected");
                    on_signal(ChannelSignal::Disconnected {
                        reason: Some(format!("server answered {}", response.status())),
                    });
                }
                Err(err) => {
                    on_signal(ChannelSignal::Disconnected {
                        reason: Some(err.to_string()),
                    });
                }
            }

            // Jittered backoff so a fleet of clients does not thunder back in.
            let jitter = rand::rng().random_range(0..RECONNECT_JITTER_MS);
            sleep(delay + Duration::from_millis(jitter)).await;
            delay = (delay * 2).min(RECONNECT_MAX);
        }
    }
}

struct SseSubscriberTask {
    http: reqwest::Client,
    url: String,
    user_id: Uuid,
    display_name: Option<String>,
}

impl EventSubscriber for SseSubscriber {
    fn subscribe(&self, channel: &str, on_signal: SignalHandler) -> Subscription {
        let task = SseSubscriberTask {
            http: self.http.clone(),
            url: format!("{}/channels/{}", self.base_url, channel),
            user_id: self.user_id,
            display_name: self.display_name.clone(),
        };
        Subscription::from_task(tokio::spawn(Self::run(task, on_signal)))
    }
}
