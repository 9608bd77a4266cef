use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::state::AppState;

pub fn create_router() -> Router<AppState> {
    Router::new()
        // Page
        .route("/", get(handlers::ui::index))
        // Health
        .route("/api/health", get(handlers::health::health_check))
        // Sessions
        .route("/api/sessions", post(handlers::sessions::create_session))
        .route(
            "/api/sessions/{id}",
            get(handlers::sessions::get_session).delete(handlers::sessions::delete_session),
        )
        .route("/api/sessions/{id}/image", post(handlers::sessions::upload_image))
        .route("/api/sessions/{id}/extract", post(handlers::sessions::trigger_extraction))
        .route("/api/sessions/{id}/copy", post(handlers::sessions::copy_result))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request, StatusCode};
    use axum::Router;
    use serde_json::Value;
    use tower::ServiceExt;

    use gmv_core::{AppConfig, Extractor, Result, SessionRegistry, UploadedImage, INVALID_FILE_TYPE_NOTICE};

    use super::create_router;
    use crate::state::AppState;

    const BOUNDARY: &str = "gmv-test-boundary";
    const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];

    struct EchoExtractor;

    #[async_trait]
    impl Extractor for EchoExtractor {
        async fn extract(&self, image: &UploadedImage) -> Result<String> {
            Ok(format!("**Total:** from {}", image.mime_type))
        }

        fn model(&self) -> &str {
            "echo"
        }
    }

    fn app() -> Router {
        let state = AppState {
            config: AppConfig::default(),
            registry: SessionRegistry::new(Arc::new(EchoExtractor)),
        };
        create_router().with_state(state)
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    fn request(method: &str, uri: &str) -> Request<Body> {
        Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    fn upload(id: &str, field: &str, file_name: &str, content_type: &str, bytes: &[u8]) -> Request<Body> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: {content_type}\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri(format!("/api/sessions/{id}/image"))
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn new_session(app: &Router) -> String {
        let (status, json) = send(app, request("POST", "/api/sessions")).await;
        assert_eq!(status, StatusCode::CREATED);
        json["session_id"].as_str().unwrap().to_string()
    }

    // ---------------------------------------------------------------------------
    // Upload
    // ---------------------------------------------------------------------------

    #[tokio::test]
    async fn upload_returns_preview_once() {
        let app = app();
        let id = new_session(&app).await;

        let (status, json) = send(&app, upload(&id, "file", "photo.png", "image/png", PNG)).await;
        assert_eq!(status, StatusCode::OK);
        assert!(json["preview_url"]
            .as_str()
            .unwrap()
            .starts_with("data:image/png;base64,"));
        assert_eq!(json["view"]["status"], "idle");
        assert_eq!(json["view"]["primary_action"]["enabled"], true);
        assert_eq!(json["view"]["image"]["file_name"], "photo.png");

        let (status, view) = send(&app, request("GET", &format!("/api/sessions/{id}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["image"]["mime_type"], "image/png");
        assert!(view["image"].get("preview_url").is_none());
    }

    #[tokio::test]
    async fn non_image_upload_is_rejected_without_state_change() {
        let app = app();
        let id = new_session(&app).await;
        send(&app, upload(&id, "file", "photo.png", "image/png", PNG)).await;

        let (status, json) = send(&app, upload(&id, "file", "notes.txt", "text/plain", b"hello")).await;
        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(json["error"], INVALID_FILE_TYPE_NOTICE);

        let (_, view) = send(&app, request("GET", &format!("/api/sessions/{id}"))).await;
        assert_eq!(view["status"], "idle");
        assert_eq!(view["image"]["file_name"], "photo.png");
    }

    #[tokio::test]
    async fn upload_without_file_field_is_bad_request() {
        let app = app();
        let id = new_session(&app).await;

        let (status, json) = send(&app, upload(&id, "attachment", "photo.png", "image/png", PNG)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(json["error"].as_str().unwrap().contains("'file'"));

        let (_, view) = send(&app, request("GET", &format!("/api/sessions/{id}"))).await;
        assert!(view["image"].is_null());
    }

    // ---------------------------------------------------------------------------
    // Extraction and copy
    // ---------------------------------------------------------------------------

    #[tokio::test]
    async fn extract_without_image_is_bad_request() {
        let app = app();
        let id = new_session(&app).await;

        let (status, _) = send(&app, request("POST", &format!("/api/sessions/{id}/extract"))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (_, view) = send(&app, request("GET", &format!("/api/sessions/{id}"))).await;
        assert_eq!(view["status"], "idle");
    }

    #[tokio::test]
    async fn extract_poll_and_copy() {
        let app = app();
        let id = new_session(&app).await;
        send(&app, upload(&id, "file", "photo.png", "image/png", PNG)).await;

        let (status, view) = send(&app, request("POST", &format!("/api/sessions/{id}/extract"))).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(view["status"], "processing");
        assert!(view["primary_action"].is_null());

        let mut view = Value::Null;
        for _ in 0..100 {
            tokio::task::yield_now().await;
            view = send(&app, request("GET", &format!("/api/sessions/{id}"))).await.1;
            if view["status"] != "processing" {
                break;
            }
        }
        assert_eq!(view["status"], "success");
        assert_eq!(view["result"], "**Total:** from image/png");
        assert_eq!(view["primary_action"]["label"], "Regenerate");

        let (status, json) = send(&app, request("POST", &format!("/api/sessions/{id}/copy"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["text"], "**Total:** from image/png");
        assert_eq!(json["view"]["copied"], true);
    }

    // ---------------------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------------------

    #[tokio::test]
    async fn unknown_and_deleted_sessions_are_not_found() {
        let app = app();
        let id = new_session(&app).await;

        let (status, _) = send(&app, request("DELETE", &format!("/api/sessions/{id}"))).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, json) = send(&app, request("GET", &format!("/api/sessions/{id}"))).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(json["error"].as_str().unwrap().starts_with("Session not found"));
    }

    #[tokio::test]
    async fn health_reports_degraded_without_credential() {
        let app = app();
        let (status, json) = send(&app, request("GET", "/api/health")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["status"], "degraded");
        assert_eq!(json["model"], "echo");
        assert_eq!(json["credential_configured"], false);
    }
}
