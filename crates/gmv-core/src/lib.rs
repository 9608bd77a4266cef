pub mod api_types;
pub mod config;
pub mod error;
pub mod extraction;
pub mod image;
pub mod prompt;
pub mod registry;
pub mod session;

pub use config::AppConfig;
pub use error::{GmvError, Result, EXTRACTION_FAILED_MESSAGE, INVALID_FILE_TYPE_NOTICE};
pub use extraction::Extractor;
pub use image::UploadedImage;
pub use registry::{PendingExtraction, SessionRegistry};
pub use session::{Completion, ExtractionStatus, ExtractionTicket, Session, StatusKind};
