use std::sync::Arc;
use std::time::Duration;

use axum::extract::DefaultBodyLimit;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

use gmv_core::{AppConfig, GmvError, SessionRegistry};
use gmv_extraction::GeminiExtractor;

mod handlers;
mod routes;
mod state;

use state::AppState;

#[tokio::main]
async fn main() -> Result<(), GmvError> {
    let directive: Directive = "gmv=info"
        .parse()
        .map_err(|e| GmvError::Config(format!("invalid log directive: {e}")))?;
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(directive))
        .init();

    let config = AppConfig::from_env();
    if !config.has_credential() {
        tracing::warn!("GEMINI_API_KEY is not set; every extraction will fail");
    }
    let host = config.server_host.clone();
    let port = config.server_port;
    let upload_limit = config.max_upload_bytes;

    let extractor = Arc::new(GeminiExtractor::new(&config)?);
    let registry = SessionRegistry::new(extractor);
    let idle = config.session_idle_timeout();
    let _sweeper = registry.spawn_sweeper(idle, (idle / 4).max(Duration::from_secs(1)));

    let state = AppState { config, registry };

    let app = routes::create_router()
        .with_state(state)
        .layer(DefaultBodyLimit::max(upload_limit))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr = format!("{host}:{port}");
    tracing::info!("GMV digest server listening on {addr}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
