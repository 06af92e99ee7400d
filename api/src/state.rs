use std::sync::Arc;
use std::time::Duration;

use crate::auth::Auth;
use crate::cache::CacheStore;
use crate::config::AppConfig;
use crate::db::DatabaseInterface;
use crate::services::blobstore::BlobStore;
use crate::services::event_bus::EventBus;
use crate::services::mailer::Mailer;
use crate::services::orchestrator::Orchestrator;
use crate::services::sse::EmitterRegistry;
use crate::services::status_updater::StatusUpdater;

pub struct AppState {
    pub config: AppConfig,
    pub auth: Auth,
    pub db: Arc<dyn DatabaseInterface>,
    pub originals_store: BlobStore,
    pub status_updater: Arc<StatusUpdater>,
    pub orchestrator: Arc<Orchestrator>,
    pub emitters: Arc<EmitterRegistry>,
    pub cache: CacheStore,
    pub mailer: Arc<dyn Mailer>,
}

impl AppState {
    pub fn new(config: AppConfig, db: Arc<dyn DatabaseInterface>, mailer: Arc<dyn Mailer>) -> Arc<Self> {
        let auth = Auth::new(&config.jwt_secret, config.jwt_issuer.clone(), config.jwt_expiration_ms);
        let originals_store = BlobStore::new(&config.storage_originals_path);
        let event_bus = Arc::new(EventBus::new(1024));
        let status_updater = Arc::new(StatusUpdater::new(db.clone(), event_bus.clone()));
        let orchestrator = Arc::new(Orchestrator::from_config(&config, status_updater.clone()));
        let emitters = Arc::new(EmitterRegistry::new(Duration::from_millis(config.sse_emitter_timeout_ms)));

        crate::services::sse::spawn_fanout(
            emitters.clone(),
            event_bus,
            Duration::from_millis(config.sse_heartbeat_interval_ms),
        );

        Arc::new(Self {
            config,
            auth,
            db,
            originals_store,
            status_updater,
            orchestrator,
            emitters,
            cache: CacheStore::new(),
            mailer,
        })
    }
}
