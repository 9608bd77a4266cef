pub mod health;
pub mod sessions;
pub mod ui;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use gmv_core::api_types::ErrorResponse;
use gmv_core::GmvError;

pub(crate) fn status_for(err: &GmvError) -> StatusCode {
    match err {
        GmvError::InvalidFileType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        GmvError::NoImage => StatusCode::BAD_REQUEST,
        GmvError::ExtractionInFlight => StatusCode::CONFLICT,
        GmvError::SessionNotFound(_) => StatusCode::NOT_FOUND,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub(crate) fn error_response(err: &GmvError) -> Response {
    (
        status_for(err),
        Json(ErrorResponse {
            error: err.user_message(),
        }),
    )
        .into_response()
}
