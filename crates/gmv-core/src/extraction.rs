use async_trait::async_trait;

use crate::error::Result;
use crate::image::UploadedImage;

/// One multimodal request per call: image in, formatted summary text out.
///
/// Implementations must not retry or cache; every call is a fresh request.
/// Single-flight is the caller's job.
#[async_trait]
pub trait Extractor: Send + Sync {
    async fn extract(&self, image: &UploadedImage) -> Result<String>;

    /// Model identifier, for logs and the health endpoint.
    fn model(&self) -> &str;
}
