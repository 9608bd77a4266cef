//! Shared fixtures for the integration tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;

use gmv_core::{Extractor, GmvError, Result, UploadedImage};

pub const PNG_BYTES: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A, 0, 0, 0, 0x0D];

pub const SAMPLE_SUMMARY: &str = "**MTD As of Yesterday (12/1/25-12/14/25) Confirmed GMV:**\n\
**Total:** $1,204,332 (+4.2% MoM, -1.0% YoY)\n\
**Elite:** $402,110 (+6.8% MoM, +3.3% YoY)\n\
**Enterprise:** $611,900 (+2.1% MoM, -4.7% YoY)\n\
**Pro:** $190,322 (+5.5% MoM, +0.4% YoY)";

pub fn png(file_name: &str) -> UploadedImage {
    UploadedImage::from_upload(Some(file_name), "image/png", PNG_BYTES)
        .expect("PNG fixture must be accepted")
}

/// Answers each call with the next scripted outcome and records the image ids it saw.
#[derive(Default)]
pub struct ScriptedExtractor {
    outcomes: Mutex<VecDeque<std::result::Result<String, String>>>,
    seen: Mutex<Vec<uuid::Uuid>>,
}

impl ScriptedExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(self, text: &str) -> Self {
        self.outcomes.lock().unwrap().push_back(Ok(text.to_string()));
        self
    }

    pub fn fail(self, cause: &str) -> Self {
        self.outcomes.lock().unwrap().push_back(Err(cause.to_string()));
        self
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn seen(&self) -> Vec<uuid::Uuid> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl Extractor for ScriptedExtractor {
    async fn extract(&self, image: &UploadedImage) -> Result<String> {
        self.seen.lock().unwrap().push(image.id);
        let next = self.outcomes.lock().unwrap().pop_front();
        match next {
            Some(Ok(text)) => Ok(text),
            Some(Err(cause)) => Err(GmvError::Extraction(cause)),
            None => Err(GmvError::Internal("no scripted outcome left".into())),
        }
    }

    fn model(&self) -> &str {
        "scripted"
    }
}
