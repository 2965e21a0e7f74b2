use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::config::Config;
use crate::editor::{SaveScheduler, SessionRegistry};
use crate::enhance::TextEnhancer;
use crate::export::UploadedSurfaces;
use crate::storage::DocumentStore;

/// How often idle sessions are looked for.
const IDLE_SWEEP_PERIOD: Duration = Duration::from_secs(60);

/// Shared application state injected into all route handlers via Axum extractors.
#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    /// PostgreSQL when `DATABASE_URL` is set, in-memory otherwise.
    pub store: Arc<dyn DocumentStore>,
    pub sessions: Arc<SessionRegistry>,
    pub saver: SaveScheduler,
    pub enhancer: Arc<dyn TextEnhancer>,
    /// Painted previews uploaded by the editor client; rasterizer for export.
    pub surfaces: Arc<UploadedSurfaces>,
}

impl AppState {
    pub fn new(
        config: Config,
        store: Arc<dyn DocumentStore>,
        enhancer: Arc<dyn TextEnhancer>,
    ) -> Self {
        let saver = SaveScheduler::new(store.clone(), config.save_quiet_period);
        Self {
            config,
            store,
            sessions: Arc::new(SessionRegistry::new()),
            saver,
            enhancer,
            surfaces: Arc::new(UploadedSurfaces::new()),
        }
    }

    /// Starts the background task that expires idle sessions and their uploaded surfaces.
    pub fn start_idle_sweep(&self) -> JoinHandle<()> {
        let sessions = self.sessions.clone();
        let surfaces = self.surfaces.clone();
        let idle = self.config.session_idle_timeout;

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(IDLE_SWEEP_PERIOD.min(idle));
            loop {
                interval.tick().await;
                for id in sessions.cleanup_idle(idle).await {
                    surfaces.discard(id).await;
                    debug!("Discarded preview surface of expired session {id}");
                }
            }
        })
    }
}
