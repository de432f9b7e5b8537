use groundcheck::auth::{AuthService, CredentialScheme, SaltedSha256, SessionRegistry};
use groundcheck::config::{AppConfig, StoreBackend};
use groundcheck::error::AppError;
use groundcheck::storage::{InMemoryStore, PgStore, Stores};
use groundcheck::verification::{Clock, SystemClock};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Storage plus the collaborators every entry point shares.
pub(crate) struct Backend {
    pub(crate) stores: Stores,
    pub(crate) scheme: Arc<dyn CredentialScheme>,
    pub(crate) clock: Arc<dyn Clock>,
}

impl Backend {
    pub(crate) async fn open(config: &AppConfig) -> Result<Self, AppError> {
        let stores = match config.store {
            StoreBackend::Memory => {
                warn!("using the in-memory store; data and sessions are lost on exit");
                Stores::from_backend(Arc::new(InMemoryStore::default()))
            }
            StoreBackend::Postgres => {
                let store = PgStore::connect(&config.database).await?;
                store.ensure_schema().await?;
                info!("postgres store ready");
                Stores::from_backend(Arc::new(store))
            }
        };

        Ok(Self {
            stores,
            scheme: Arc::new(SaltedSha256),
            clock: Arc::new(SystemClock),
        })
    }

    pub(crate) fn auth_service(&self, config: &AppConfig) -> Arc<AuthService> {
        let sessions = Arc::new(SessionRegistry::new(
            self.stores.sessions.clone(),
            config.sessions.ttl(),
            self.clock.clone(),
        ));
        Arc::new(AuthService::new(
            self.stores.officers.clone(),
            self.scheme.clone(),
            sessions,
        ))
    }
}
