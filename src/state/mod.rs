/// Consensus detection shared by server and client readers.
pub mod consensus;
/// Per-session broadcast hub.
pub mod hub;
/// Pure session transition guards.
pub mod machine;

use std::sync::Arc;

use tokio::sync::{RwLock, watch};

use crate::{
    config::AppConfig,
    dao::{session_store::SessionStore, task_board::TaskBoard},
    error::ServiceError,
};

pub use self::hub::{ChannelHub, session_channel};

/// Cheaply clonable handle on the shared application state.
pub type SharedState = Arc<AppState>;

/// Events buffered per channel before slow subscribers start lagging.
const CHANNEL_CAPACITY: usize = 16;

/// Central application state holding the storage handles and the realtime
/// hub. Session data itself never lives here; the stores are the single
/// source of truth and request handlers stay stateless.
pub struct AppState {
    config: AppConfig,
    session_store: RwLock<Option<Arc<dyn SessionStore>>>,
    task_board: RwLock<Option<Arc<dyn TaskBoard>>>,
    channels: ChannelHub,
    degraded: watch::Sender<bool>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`].
    ///
    /// The application starts in degraded mode until a storage backend is
    /// installed.
    pub fn new(config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            config,
            session_store: RwLock::new(None),
            task_board: RwLock::new(None),
            channels: ChannelHub::new(CHANNEL_CAPACITY),
            degraded: degraded_tx,
        })
    }

    /// Immutable runtime configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Handle to the current session store, if one is installed.
    pub async fn session_store(&self) -> Option<Arc<dyn SessionStore>> {
        let guard = self.session_store.read().await;
        guard.as_ref().cloned()
    }

    /// Session store or a degraded-mode error.
    pub async fn require_session_store(&self) -> Result<Arc<dyn SessionStore>, ServiceError> {
        self.session_store().await.ok_or(ServiceError::Degraded)
    }

    /// Task board or a degraded-mode error.
    pub async fn require_task_board(&self) -> Result<Arc<dyn TaskBoard>, ServiceError> {
        let guard = self.task_board.read().await;
        guard.as_ref().cloned().ok_or(ServiceError::Degraded)
    }

    /// Install a storage backend pair and leave degraded mode.
    pub async fn install_backend(&self, store: Arc<dyn SessionStore>, board: Arc<dyn TaskBoard>) {
        {
            let mut guard = self.session_store.write().await;
            *guard = Some(store);
        }
        {
            let mut guard = self.task_board.write().await;
            *guard = Some(board);
        }
        self.update_degraded(false).await;
    }

    /// Remove the current backend and enter degraded mode.
    pub async fn clear_backend(&self) {
        {
            let mut guard = self.session_store.write().await;
            guard.take();
        }
        {
            let mut guard = self.task_board.write().await;
            guard.take();
        }
        self.update_degraded(true).await;
    }

    /// Whether the service currently runs without storage.
    pub async fn is_degraded(&self) -> bool {
        let guard = self.session_store.read().await;
        guard.is_none()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Broadcast the degraded flag when the value changes.
    pub async fn update_degraded(&self, value: bool) {
        let _ = self.degraded.send_if_modified(|current| {
            if *current == value {
                false
            } else {
                *current = value;
                true
            }
        });
    }

    /// Realtime fan-out hub keyed by session channel name.
    pub fn channels(&self) -> &ChannelHub {
        &self.channels
    }
}
