use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use stockroom_core::{Clock, SystemClock};
use stockroom_infra::audit_log::{AuditLog, AuditLogError, InMemoryAuditLog};
use stockroom_infra::store::{InMemoryVersionedStore, StoreError, VersionedStore};
use stockroom_infra::{ConcurrencyHarness, HarnessConfig, MutationEngine, StockError};

#[cfg(feature = "postgres")]
use stockroom_infra::audit_log::PostgresAuditLog;
#[cfg(feature = "postgres")]
use stockroom_infra::store::PostgresVersionedStore;

use crate::config::{AppConfig, Persistence};

/// Store handle with the backend erased.
pub type DynStore = Arc<dyn VersionedStore>;
/// Audit log handle with the backend erased.
pub type DynAuditLog = Arc<dyn AuditLog>;

pub type Engine = MutationEngine<DynStore, DynAuditLog>;
pub type Harness = ConcurrencyHarness<DynStore, DynAuditLog>;

#[derive(Debug, Error)]
pub enum ServicesError {
    #[error("postgres persistence requested but the `postgres` feature is not enabled")]
    PersistenceUnavailable,

    #[cfg(feature = "postgres")]
    #[error("failed to connect to postgres: {0}")]
    Connect(#[from] sqlx::Error),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    AuditLog(#[from] AuditLogError),

    #[error("startup seeding failed: {0}")]
    Seed(#[source] StockError),

    #[error("startup task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Shared application state handed to every handler.
pub struct AppServices {
    engine: Arc<Engine>,
    harness: Arc<Harness>,
    backend: &'static str,
}

impl AppServices {
    pub fn new(store: DynStore, log: DynAuditLog, config: &AppConfig, backend: &'static str) -> Self {
        Self::with_clock(store, log, Arc::new(SystemClock), config, backend)
    }

    pub fn with_clock(
        store: DynStore,
        log: DynAuditLog,
        clock: Arc<dyn Clock>,
        config: &AppConfig,
        backend: &'static str,
    ) -> Self {
        let engine = Arc::new(MutationEngine::with_clock(store, log, clock));
        let harness = Arc::new(ConcurrencyHarness::with_config(
            engine.clone(),
            HarnessConfig::default().with_max_workers(config.max_simulation_workers),
        ));
        Self {
            engine,
            harness,
            backend,
        }
    }

    /// In-memory services (dev/test).
    pub fn in_memory(config: &AppConfig) -> Self {
        Self::new(
            Arc::new(InMemoryVersionedStore::new()),
            Arc::new(InMemoryAuditLog::new()),
            config,
            "in_memory",
        )
    }

    pub fn engine(&self) -> Arc<Engine> {
        self.engine.clone()
    }

    pub fn harness(&self) -> Arc<Harness> {
        self.harness.clone()
    }

    pub fn backend(&self) -> &'static str {
        self.backend
    }
}

/// Wire stores according to `config` and seed them when asked to.
pub async fn build_services(config: &AppConfig) -> Result<AppServices, ServicesError> {
    let services = match &config.persistence {
        Persistence::InMemory => AppServices::in_memory(config),
        Persistence::Postgres { database_url } => build_persistent_services(config, database_url).await?,
    };

    if config.seed_on_startup {
        let engine = services.engine();
        let inserted = tokio::task::spawn_blocking(move || engine.seed_if_empty())
            .await?
            .map_err(ServicesError::Seed)?;
        info!(inserted, backend = services.backend(), "startup seeding finished");
    }

    Ok(services)
}

#[cfg(feature = "postgres")]
async fn build_persistent_services(
    config: &AppConfig,
    database_url: &str,
) -> Result<AppServices, ServicesError> {
    let pool = sqlx::PgPool::connect(database_url).await?;

    let store = PostgresVersionedStore::new(pool.clone())?;
    store.ensure_schema().await?;
    let log = PostgresAuditLog::new(pool)?;
    log.ensure_schema().await?;

    info!("using postgres stores");
    Ok(AppServices::new(Arc::new(store), Arc::new(log), config, "postgres"))
}

#[cfg(not(feature = "postgres"))]
async fn build_persistent_services(
    _config: &AppConfig,
    _database_url: &str,
) -> Result<AppServices, ServicesError> {
    tracing::warn!("USE_PERSISTENT_STORES=true but the postgres feature is not enabled");
    Err(ServicesError::PersistenceUnavailable)
}
