use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use tracing::info;

use gmv_core::api_types::HealthResponse;

use crate::state::AppState;

const VERSION: &str = env!("CARGO_PKG_VERSION");

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    info!("Health check requested");

    let credential_configured = state.config.has_credential();
    let status = if credential_configured {
        "ok".to_string()
    } else {
        "degraded".to_string()
    };

    let response = HealthResponse {
        status,
        version: VERSION.to_string(),
        model: state.registry.model().to_string(),
        credential_configured,
        active_sessions: state.registry.len().await,
    };

    (StatusCode::OK, Json(response))
}
