/// Domain types.
pub mod game;
/// Typed per-group access to the store.
pub mod game_state;
/// Setup phases.
pub mod lifecycle;
/// Per-group mutexes.
pub mod locks;

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{RwLock, watch};

use crate::{
    config::AppConfig,
    dao::kv_store::KeyValueStore,
    error::ServiceError,
    state::{
        game::{GroupId, UserId},
        game_state::GameStateManager,
        locks::GroupLocks,
    },
    transport::Transport,
};

/// State shared by every handler.
pub type SharedState = Arc<AppState>;

/// Setup conversation that has started but has no channel yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PendingInit {
    /// Administrator who asked for the setup.
    pub requested_by: UserId,
}

/// Central application state shared by every request handler.
pub struct AppState {
    store: RwLock<Option<Arc<dyn KeyValueStore>>>,
    transport: Arc<dyn Transport>,
    config: AppConfig,
    locks: GroupLocks,
    pending_inits: DashMap<GroupId, PendingInit>,
    degraded: watch::Sender<bool>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(transport: Arc<dyn Transport>, config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            store: RwLock::new(None),
            transport,
            config,
            locks: GroupLocks::new(),
            pending_inits: DashMap::new(),
            degraded: degraded_tx,
        })
    }

    /// Obtain a handle to the current store, if one is installed.
    pub async fn store(&self) -> Option<Arc<dyn KeyValueStore>> {
        let guard = self.store.read().await;
        guard.as_ref().cloned()
    }

    /// Install a new store implementation and leave degraded mode.
    pub async fn install_store(&self, store: Arc<dyn KeyValueStore>) {
        {
            let mut guard = self.store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current store and enter degraded mode.
    pub async fn clear_store(&self) {
        {
            let mut guard = self.store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub async fn is_degraded(&self) -> bool {
        let guard = self.store.read().await;
        guard.is_none()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Typed game state over the installed store, or [`ServiceError::Degraded`].
    pub async fn game_state(&self) -> Result<GameStateManager, ServiceError> {
        let store = self.store().await.ok_or(ServiceError::Degraded)?;
        Ok(GameStateManager::new(
            store,
            self.config.delete_attempts,
            self.config.delete_retry_delay,
        ))
    }

    /// Chat platform client.
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// Game settings.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Per-group mutexes serialising mutations.
    pub fn locks(&self) -> &GroupLocks {
        &self.locks
    }

    /// Setup conversations waiting for a channel, keyed by group.
    pub fn pending_inits(&self) -> &DashMap<GroupId, PendingInit> {
        &self.pending_inits
    }

    fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
    }
}
