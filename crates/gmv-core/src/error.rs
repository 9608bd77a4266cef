use thiserror::Error;
use uuid::Uuid;

/// Shown to the user whenever an extraction fails, whatever the cause.
pub const EXTRACTION_FAILED_MESSAGE: &str =
    "Failed to extract data from the image. Please try again.";

/// Shown when a non-image file is offered.
pub const INVALID_FILE_TYPE_NOTICE: &str = "Please upload an image file (PNG, JPG, WEBP).";

#[derive(Error, Debug)]
pub enum GmvError {
    #[error("Invalid file type: {0}")]
    InvalidFileType(String),

    #[error("No image selected")]
    NoImage,

    #[error("An extraction is already in progress")]
    ExtractionInFlight,

    #[error("Session not found: {0}")]
    SessionNotFound(Uuid),

    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl GmvError {
    /// Text that is safe to put in front of the user. Extraction causes stay in the logs.
    pub fn user_message(&self) -> String {
        match self {
            GmvError::InvalidFileType(_) => INVALID_FILE_TYPE_NOTICE.to_string(),
            GmvError::Extraction(_) | GmvError::Http(_) | GmvError::Json(_) => {
                EXTRACTION_FAILED_MESSAGE.to_string()
            }
            other => other.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, GmvError>;
