use base64::{engine::general_purpose::STANDARD, Engine};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{GmvError, Result};

/// A user-supplied screenshot, normalized for transport to the model.
///
/// Immutable once built. Replacing the image means building a new one, which
/// also gets a new `id`; in-flight requests are fenced on that id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadedImage {
    pub id: Uuid,
    pub base64: String,
    pub mime_type: String,
    pub file_name: Option<String>,
    pub byte_len: usize,
    pub acquired_at: DateTime<Utc>,
}

impl UploadedImage {
    /// Accept an uploaded file.
    ///
    /// `declared_mime` is what the client claims (file picker or drop event).
    /// Anything outside `image/*` is rejected before the bytes are looked at.
    /// The stored MIME type comes from the content's magic bytes when they are
    /// recognised, otherwise the declared type is kept.
    pub fn from_upload(
        file_name: Option<&str>,
        declared_mime: &str,
        bytes: &[u8],
    ) -> Result<Self> {
        let declared = declared_mime.trim().to_ascii_lowercase();
        if !declared.starts_with("image/") {
            tracing::warn!(
                file_name = ?file_name,
                declared_mime = %declared_mime,
                "Rejected non-image upload"
            );
            return Err(GmvError::InvalidFileType(declared_mime.to_string()));
        }

        // Some formats the sniffer knows have no image/* type (farbfeld is
        // application/octet-stream); the held type must stay under image/.
        let mime_type = match sniff_mime(bytes).filter(|sniffed| sniffed.starts_with("image/")) {
            Some(sniffed) => {
                if sniffed != declared {
                    tracing::debug!(
                        declared = %declared,
                        sniffed = %sniffed,
                        "Declared MIME type differs from content"
                    );
                }
                sniffed.to_string()
            }
            None => declared,
        };

        let base64 = STANDARD.encode(bytes);

        tracing::info!(
            file_name = ?file_name,
            mime_type = %mime_type,
            bytes = bytes.len(),
            "Image acquired"
        );

        Ok(Self {
            id: Uuid::new_v4(),
            base64,
            mime_type,
            file_name: file_name.map(str::to_string),
            byte_len: bytes.len(),
            acquired_at: Utc::now(),
        })
    }

    /// `data:` URL embedding the same payload, renderable as-is by the page.
    /// Built on demand so the payload is held once.
    pub fn preview_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.base64)
    }
}

/// MIME type from the leading bytes, if they match a known image format.
pub fn sniff_mime(bytes: &[u8]) -> Option<&'static str> {
    image::guess_format(bytes).ok().map(|format| format.to_mime_type())
}
