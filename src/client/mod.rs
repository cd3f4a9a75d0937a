//! Client reconciliation layer, enabled by the `client` feature.
//!
//! Frontends and bots consume three pieces: an [`api::SessionApi`] for
//! authoritative state, a [`transport::EventSubscriber`] for the push
//! channel, and the [`reconciler::SessionView`] that merges the two. The
//! [`session_client::SessionClient`] driver wires them together for the
//! common case.

/// Authoritative-state API trait and HTTP implementation.
pub mod api;
/// Pure reconciliation core.
pub mod reconciler;
/// Async driver combining API, transport, and view.
pub mod session_client;
/// Push-channel transport abstraction and SSE implementation.
pub mod transport;

pub use api::{ClientError, HttpSessionApi, SessionApi};
pub use reconciler::{ChannelEvent, ConnectionStatus, Notice, Refetch, SessionView};
pub use session_client::SessionClient;
pub use transport::{ChannelSignal, EventSubscriber, SseSubscriber, Subscription};
