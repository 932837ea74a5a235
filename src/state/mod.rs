//! Shared application state: configuration, row store slot, degraded flag and overlay handles.

mod sse;

use std::sync::Arc;

use tokio::sync::{RwLock, watch};

use crate::{
    config::AppConfig,
    dao::row_store::RowStore,
    error::ServiceError,
    overlay::{OverlayHandle, ScenePresenter},
};

pub use self::sse::SseHub;

/// State handle passed to handlers and tasks.
pub type SharedState = Arc<AppState>;

/// Overlay engine pieces owned by the overlay process.
pub struct OverlayParts {
    /// Renderer broadcast and scene replay.
    pub presenter: Arc<ScenePresenter>,
    /// Mailbox of the overlay actor.
    pub handle: OverlayHandle,
}

/// Central application state shared by the HTTP handlers and background tasks.
pub struct AppState {
    config: AppConfig,
    store: RwLock<Option<Arc<dyn RowStore>>>,
    degraded: watch::Sender<bool>,
    overlay: Option<OverlayParts>,
}

impl AppState {
    /// Construct a new [`AppState`] without an overlay engine (control process).
    ///
    /// The application starts in degraded mode until a row store is installed.
    pub fn new(config: AppConfig) -> SharedState {
        Arc::new(Self::build(config, None))
    }

    /// Construct a new [`AppState`] driving the given overlay engine.
    pub fn with_overlay(config: AppConfig, overlay: OverlayParts) -> SharedState {
        Arc::new(Self::build(config, Some(overlay)))
    }

    fn build(config: AppConfig, overlay: Option<OverlayParts>) -> Self {
        let (degraded_tx, _rx) = watch::channel(true);
        Self {
            config,
            store: RwLock::new(None),
            degraded: degraded_tx,
            overlay,
        }
    }

    /// Loaded configuration.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Obtain a handle to the current row store, if one is installed.
    pub async fn store(&self) -> Option<Arc<dyn RowStore>> {
        let guard = self.store.read().await;
        guard.as_ref().cloned()
    }

    /// Like [`AppState::store`], failing with [`ServiceError::Degraded`] when none is installed.
    pub async fn require_store(&self) -> Result<Arc<dyn RowStore>, ServiceError> {
        self.store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new row store implementation and leave degraded mode.
    pub async fn set_store(&self, store: Arc<dyn RowStore>) {
        {
            let mut guard = self.store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false);
    }

    /// Remove the current row store and enter degraded mode.
    pub async fn clear_store(&self) {
        {
            let mut guard = self.store.write().await;
            guard.take();
        }
        self.update_degraded(true);
    }

    /// Current degraded flag.
    pub fn is_degraded(&self) -> bool {
        *self.degraded.borrow()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Update and broadcast the degraded flag when the value changes.
    pub fn update_degraded(&self, value: bool) {
        self.degraded.send_if_modified(|current| {
            if *current == value {
                return false;
            }
            *current = value;
            true
        });
    }

    /// Overlay engine pieces, when this process runs one.
    pub fn overlay(&self) -> Result<&OverlayParts, ServiceError> {
        self.overlay
            .as_ref()
            .ok_or_else(|| ServiceError::InvalidState("no overlay engine in this process".into()))
    }
}
