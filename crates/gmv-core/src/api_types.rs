use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::image::UploadedImage;
use crate::session::StatusKind;

// --- Health ---

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub model: String,
    pub credential_configured: bool,
    pub active_sessions: usize,
}

// --- Sessions ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Extract,
    Regenerate,
    TryAgain,
}

impl ActionKind {
    pub fn label(self) -> &'static str {
        match self {
            ActionKind::Extract => "Extract Data",
            ActionKind::Regenerate => "Regenerate",
            ActionKind::TryAgain => "Try Again",
        }
    }
}

/// The one state-dependent button. Every variant triggers an extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrimaryAction {
    pub kind: ActionKind,
    pub label: String,
    pub enabled: bool,
}

impl PrimaryAction {
    pub fn new(kind: ActionKind, enabled: bool) -> Self {
        Self {
            kind,
            label: kind.label().to_string(),
            enabled,
        }
    }
}

/// What the session view says about the held image. The payload itself is
/// only returned once, in [`UploadResponse`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageSummary {
    pub mime_type: String,
    pub file_name: Option<String>,
    pub byte_len: usize,
    pub acquired_at: DateTime<Utc>,
}

impl From<&UploadedImage> for ImageSummary {
    fn from(image: &UploadedImage) -> Self {
        Self {
            mime_type: image.mime_type.clone(),
            file_name: image.file_name.clone(),
            byte_len: image.byte_len,
            acquired_at: image.acquired_at,
        }
    }
}

/// Everything the page needs to render one session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub status: StatusKind,
    /// `None` while processing: nothing can be triggered until the request resolves.
    pub primary_action: Option<PrimaryAction>,
    pub result: Option<String>,
    pub error: Option<String>,
    pub copied: bool,
    pub image: Option<ImageSummary>,
    pub can_change_image: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CreateSessionResponse {
    pub session_id: Uuid,
    pub view: SessionView,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct UploadResponse {
    pub preview_url: String,
    pub view: SessionView,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CopyResponse {
    pub text: Option<String>,
    pub view: SessionView,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_summary_carries_acquisition_time() {
        let before = Utc::now();
        let image = UploadedImage::from_upload(
            Some("photo.png"),
            "image/png",
            &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A],
        )
        .unwrap();
        let summary = ImageSummary::from(&image);

        assert_eq!(summary.acquired_at, image.acquired_at);
        assert!(summary.acquired_at >= before);

        let json = serde_json::to_value(&summary).unwrap();
        let parsed: DateTime<Utc> = json["acquired_at"].as_str().unwrap().parse().unwrap();
        assert_eq!(parsed, image.acquired_at);
        assert!(json.get("preview_url").is_none());
    }
}
