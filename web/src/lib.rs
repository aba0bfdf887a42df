use axum::http::{header, HeaderValue, Method};
use log::*;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::timeout::TimeoutLayer;

pub use error::{Error, Result};
pub use service::AppState;

mod controller;
mod error;
mod extractors;
mod middleware;
mod params;
pub mod router;

/// Builds the CORS policy from the configured origins. Origins that are not
/// valid header values are logged and skipped.
fn cors_layer(app_state: &AppState) -> CorsLayer {
    let origins: Vec<HeaderValue> = app_state
        .config
        .allowed_origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(err) => {
                warn!("Ignoring invalid allowed origin {origin:?}: {err}");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .allow_origin(origins)
}

pub async fn init_server(app_state: AppState) -> std::io::Result<()> {
    let host = app_state.config.interface.as_ref().map_or("127.0.0.1", |i| i.as_str());
    let address = format!("{host}:{}", app_state.config.port);

    info!(
        "Server starting... listening for connections on http://{address}{}",
        app_state.config.api_root
    );

    let cors = cors_layer(&app_state);
    let timeout = TimeoutLayer::new(app_state.config.request_timeout());
    let app = router::define_routes(app_state).layer(timeout).layer(cors);

    let listener = TcpListener::bind(&address).await?;
    axum::serve(listener, app).await
}
