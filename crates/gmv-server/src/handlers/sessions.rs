use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use gmv_core::api_types::{CopyResponse, CreateSessionResponse, ErrorResponse, UploadResponse};
use gmv_core::UploadedImage;

use super::error_response;
use crate::state::AppState;

const FILE_FIELD: &str = "file";

/// POST /api/sessions — start a fresh session (one per page load).
pub async fn create_session(State(state): State<AppState>) -> impl IntoResponse {
    let view = state.registry.create().await;
    (
        StatusCode::CREATED,
        Json(CreateSessionResponse {
            session_id: view.session_id,
            view,
        }),
    )
}

/// GET /api/sessions/{id}
pub async fn get_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    match state.registry.view(id).await {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(e) => error_response(&e),
    }
}

/// DELETE /api/sessions/{id} — sent by the page when it unloads.
pub async fn delete_session(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    match state.registry.remove(id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => error_response(&e),
    }
}

/// POST /api/sessions/{id}/image — multipart upload, field `file`.
///
/// Both the file picker and drag-and-drop land here. The preview payload is
/// only sent back in this response; session views carry a summary.
#[instrument(skip(state, multipart), fields(session_id = %id))]
pub async fn upload_image(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    mut multipart: Multipart,
) -> Response {
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                warn!(error = %e, "Malformed multipart upload");
                return bad_request(format!("Malformed upload: {e}"));
            }
        };

        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = field.file_name().map(str::to_string);
        let content_type = field.content_type().unwrap_or_default().to_string();
        let bytes = match field.bytes().await {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "Failed to read uploaded file");
                return bad_request(format!("Failed to read upload: {e}"));
            }
        };

        let image = match UploadedImage::from_upload(file_name.as_deref(), &content_type, &bytes) {
            Ok(image) => image,
            Err(e) => return error_response(&e),
        };

        info!(mime_type = %image.mime_type, bytes = image.byte_len, "Image uploaded");

        let preview_url = image.preview_url();
        return match state.registry.select_image(id, image).await {
            Ok(view) => (StatusCode::OK, Json(UploadResponse { preview_url, view })).into_response(),
            Err(e) => error_response(&e),
        };
    }

    bad_request(format!("Missing multipart field '{FILE_FIELD}'"))
}

/// POST /api/sessions/{id}/extract — Extract Data, Regenerate and Try Again.
/// Returns 202 with the session in `processing`; poll the session for the outcome.
#[instrument(skip(state), fields(session_id = %id))]
pub async fn trigger_extraction(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    match state.registry.trigger(id).await {
        Ok(pending) => {
            info!(seq = pending.ticket.seq, "Extraction triggered");
            (StatusCode::ACCEPTED, Json(pending.view)).into_response()
        }
        Err(e) => error_response(&e),
    }
}

/// POST /api/sessions/{id}/copy — returns the text for the clipboard and
/// starts the two-second acknowledgment.
pub async fn copy_result(State(state): State<AppState>, Path(id): Path<Uuid>) -> Response {
    match state.registry.copy(id).await {
        Ok((text, view)) => (StatusCode::OK, Json(CopyResponse { text, view })).into_response(),
        Err(e) => error_response(&e),
    }
}

fn bad_request(error: String) -> Response {
    (StatusCode::BAD_REQUEST, Json(ErrorResponse { error })).into_response()
}
