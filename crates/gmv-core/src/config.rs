use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{GmvError, Result};
use crate::prompt::DEFAULT_MODEL;

pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 25 * 1024 * 1024;
const DEFAULT_SESSION_IDLE_SECS: u64 = 30 * 60;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub gemini_api_key: String,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub server_host: String,
    pub server_port: u16,
    pub max_upload_bytes: usize,
    pub session_idle_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            gemini_api_key: String::new(),
            gemini_model: DEFAULT_MODEL.into(),
            gemini_base_url: DEFAULT_BASE_URL.into(),
            server_host: "0.0.0.0".into(),
            server_port: 8080,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            session_idle_secs: DEFAULT_SESSION_IDLE_SECS,
        }
    }
}

impl AppConfig {
    /// Read once at startup; everything downstream receives the value explicitly.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup. Unset or unparsable values fall back to defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            gemini_api_key: lookup("GEMINI_API_KEY")
                .or_else(|| lookup("API_KEY"))
                .unwrap_or_default(),
            gemini_model: lookup("GEMINI_MODEL").unwrap_or(defaults.gemini_model),
            gemini_base_url: lookup("GEMINI_BASE_URL").unwrap_or(defaults.gemini_base_url),
            server_host: lookup("SERVER_HOST").unwrap_or(defaults.server_host),
            server_port: lookup("SERVER_PORT")
                .and_then(|p| p.parse().ok())
                .unwrap_or(defaults.server_port),
            max_upload_bytes: lookup("MAX_UPLOAD_BYTES")
                .and_then(|b| b.parse().ok())
                .unwrap_or(defaults.max_upload_bytes),
            session_idle_secs: lookup("SESSION_IDLE_SECS")
                .and_then(|s| s.parse().ok())
                .filter(|secs| *secs > 0)
                .unwrap_or(defaults.session_idle_secs),
        }
    }

    pub fn session_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.session_idle_secs)
    }

    pub fn has_credential(&self) -> bool {
        !self.gemini_api_key.trim().is_empty()
    }

    pub fn generate_content_url(&self) -> Result<Url> {
        let base = Url::parse(&self.gemini_base_url).map_err(|e| {
            GmvError::Config(format!("invalid GEMINI_BASE_URL '{}': {e}", self.gemini_base_url))
        })?;
        let path = format!("v1beta/models/{}:generateContent", self.gemini_model);
        // A base without a trailing slash would have its last segment replaced by join.
        let base = if base.path().ends_with('/') {
            base
        } else {
            let mut with_slash = base.clone();
            with_slash.set_path(&format!("{}/", base.path()));
            with_slash
        };
        base.join(&path)
            .map_err(|e| GmvError::Config(format!("invalid model path '{path}': {e}")))
    }
}
