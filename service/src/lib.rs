use cache::{CachePolicy, CacheStore, LruCacheStore};
use config::Config;
use log::info;
use sea_orm::{ConnectOptions, Database, DatabaseConnection, DbErr};
use std::sync::Arc;
use tokio::time::Duration;

pub mod cache;
pub mod config;
pub mod logging;

/// The PostgreSQL schema every table lives in.
pub const DB_SCHEMA: &str = "pecha";

pub async fn init_database(config: &Config) -> Result<DatabaseConnection, DbErr> {
    info!(
        "Database pool config: max_connections={}, min_connections={}, \
         connect_timeout={}s, acquire_timeout={}s, idle_timeout={}s, max_lifetime={}s",
        config.db_max_connections,
        config.db_min_connections,
        config.db_connect_timeout_secs,
        config.db_acquire_timeout_secs,
        config.db_idle_timeout_secs,
        config.db_max_lifetime_secs,
    );

    let mut opt = ConnectOptions::new::<&str>(config.database_url());
    opt.max_connections(config.db_max_connections)
        .min_connections(config.db_min_connections)
        .connect_timeout(Duration::from_secs(config.db_connect_timeout_secs))
        .acquire_timeout(Duration::from_secs(config.db_acquire_timeout_secs))
        .idle_timeout(Duration::from_secs(config.db_idle_timeout_secs))
        .max_lifetime(Duration::from_secs(config.db_max_lifetime_secs))
        .sqlx_logging(true)
        .sqlx_logging_level(log::LevelFilter::Debug)
        .set_schema_search_path(DB_SCHEMA);

    Database::connect(opt).await
}

/// Builds the response cache described by `config`.
pub fn init_cache(config: &Config) -> Arc<dyn CacheStore> {
    info!(
        "Response cache: capacity={}, default_ttl={}s",
        config.cache_capacity, config.cache_ttl_secs
    );
    Arc::new(LruCacheStore::new(config.cache_capacity))
}

// Infrastructure shared by every request.
// Clone is required so it can be handed to the Router as State.
#[derive(Clone)]
pub struct AppState {
    pub database_connection: Arc<DatabaseConnection>,
    pub cache: Arc<dyn CacheStore>,
    pub cache_policy: CachePolicy,
    pub config: Config,
}

impl AppState {
    pub fn new(app_config: Config, db: &Arc<DatabaseConnection>) -> Self {
        let cache = init_cache(&app_config);
        Self::with_cache(app_config, db, cache)
    }

    pub fn with_cache(
        app_config: Config,
        db: &Arc<DatabaseConnection>,
        cache: Arc<dyn CacheStore>,
    ) -> Self {
        Self {
            database_connection: Arc::clone(db),
            cache,
            cache_policy: CachePolicy::from_config(&app_config),
            config: app_config,
        }
    }

    pub fn db_conn_ref(&self) -> &DatabaseConnection {
        self.database_connection.as_ref()
    }

    pub fn set_db_conn(&mut self, db: DatabaseConnection) {
        self.database_connection = Arc::new(db);
    }
}
