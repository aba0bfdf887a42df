use log::*;
use service::{config::Config, logging::Logger, AppState};
use std::sync::Arc;

#[tokio::main]
async fn main() {
    let config = Config::new();
    Logger::init_logger(&config as &Config);

    info!(
        "Starting pecha API [{}] in {:?} mode",
        env!("CARGO_PKG_VERSION"),
        config.runtime_env()
    );

    if config.jwt_secret().is_none() {
        warn!("JWT_SECRET is not set, every write endpoint will answer 401");
    }

    let db = match service::init_database(&config).await {
        Ok(db) => Arc::new(db),
        Err(e) => {
            error!("Failed to establish database connection: {e}");
            std::process::exit(1);
        }
    };

    let app_state = AppState::new(config, &db);

    if let Err(e) = web::init_server(app_state).await {
        error!("Server exited with an error: {e}");
        std::process::exit(1);
    }
}
