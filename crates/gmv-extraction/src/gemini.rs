use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use url::Url;

use gmv_core::config::AppConfig;
use gmv_core::error::{GmvError, Result};
use gmv_core::extraction::Extractor;
use gmv_core::image::UploadedImage;
use gmv_core::prompt::{EXTRACTION_PROMPT, NO_TEXT_FALLBACK, SYSTEM_INSTRUCTION, TEMPERATURE};

/// Screenshot-to-summary extraction through the Gemini `generateContent` API.
pub struct GeminiExtractor {
    client: reqwest::Client,
    api_key: String,
    model: String,
    endpoint: Url,
}

// ── generateContent request/response types ─────────────────────────────────

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest<'a> {
    system_instruction: SystemInstruction<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct SystemInstruction<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    role: &'a str,
    parts: Vec<RequestPart<'a>>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct RequestPart<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    text: Option<&'a str>,
}

impl<'a> RequestPart<'a> {
    fn text(text: &'a str) -> Self {
        Self {
            inline_data: None,
            text: Some(text),
        }
    }

    fn image(image: &'a UploadedImage) -> Self {
        Self {
            inline_data: Some(InlineData {
                mime_type: &image.mime_type,
                data: &image.base64,
            }),
            text: None,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData<'a> {
    mime_type: &'a str,
    data: &'a str,
}

#[derive(Debug, Serialize)]
struct GenerationConfig {
    temperature: f32,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    thought: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

// ── Implementation ─────────────────────────────────────────────────────────

impl GeminiExtractor {
    pub fn new(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            client: reqwest::Client::new(),
            api_key: config.gemini_api_key.clone(),
            model: config.gemini_model.clone(),
            endpoint: config.generate_content_url()?,
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    fn build_request(image: &UploadedImage) -> GenerateContentRequest<'_> {
        GenerateContentRequest {
            system_instruction: SystemInstruction {
                parts: vec![RequestPart::text(SYSTEM_INSTRUCTION)],
            },
            contents: vec![Content {
                role: "user",
                parts: vec![RequestPart::image(image), RequestPart::text(EXTRACTION_PROMPT)],
            }],
            generation_config: GenerationConfig {
                temperature: TEMPERATURE,
            },
        }
    }

    /// Text of the first candidate, thought parts excluded. Falls back to
    /// [`NO_TEXT_FALLBACK`] when the service produced nothing.
    fn response_text(response: &GenerateContentResponse) -> String {
        let text: String = response
            .candidates
            .first()
            .and_then(|candidate| candidate.content.as_ref())
            .map(|content| {
                content
                    .parts
                    .iter()
                    .filter(|part| !part.thought)
                    .filter_map(|part| part.text.as_deref())
                    .collect::<String>()
            })
            .unwrap_or_default();

        if text.is_empty() {
            tracing::warn!(
                candidates = response.candidates.len(),
                finish_reason = ?response.candidates.first().and_then(|c| c.finish_reason.as_deref()),
                block_reason = ?response
                    .prompt_feedback
                    .as_ref()
                    .and_then(|f| f.block_reason.as_deref()),
                "Model returned no text"
            );
            NO_TEXT_FALLBACK.to_string()
        } else {
            text
        }
    }

    fn decode_response(body: &str) -> Result<String> {
        let response: GenerateContentResponse = serde_json::from_str(body)?;
        Ok(Self::response_text(&response))
    }

    async fn call_gemini(&self, image: &UploadedImage) -> Result<String> {
        let request = Self::build_request(image);

        tracing::debug!(
            model = %self.model,
            mime_type = %image.mime_type,
            payload_len = image.base64.len(),
            "Sending extraction request to Gemini API"
        );

        let response = self
            .client
            .post(self.endpoint.clone())
            .header("x-goog-api-key", &self.api_key)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(GmvError::Extraction(format!(
                "Gemini API returned status {status}: {body}"
            )));
        }

        let text = Self::decode_response(&body)?;

        tracing::debug!(response_len = text.len(), "Received extraction response from Gemini API");

        Ok(text)
    }
}

#[async_trait]
impl Extractor for GeminiExtractor {
    async fn extract(&self, image: &UploadedImage) -> Result<String> {
        tracing::info!(
            image_id = %image.id,
            file_name = ?image.file_name,
            model = %self.model,
            "Starting GMV extraction"
        );
        self.call_gemini(image).await
    }

    fn model(&self) -> &str {
        &self.model
    }
}
