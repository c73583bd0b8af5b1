//! Sora (OpenAI) video generation adapter.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{sanitize_error_message, Result, VivifyError};
use crate::job::{ProviderKind, SubmissionRequest};
use crate::provider::adapter::{ProviderAdapter, ProviderJobState, ProviderSubmission};

const BASE_URL: &str = "https://api.openai.com/v1/videos";

/// Fixed output dimensions for image-to-video generation.
const VIDEO_SIZE: &str = "1280x720";

/// Fixed clip length in seconds.
const VIDEO_SECONDS: &str = "4";

/// Sora model variants.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SoraModel {
    /// Sora 2 - OpenAI's video generation model.
    #[default]
    Sora2,
}

impl SoraModel {
    /// Returns the API model identifier string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sora2 => "sora-2",
        }
    }
}

/// Builder for [`SoraAdapter`].
#[derive(Debug, Clone, Default)]
pub struct SoraAdapterBuilder {
    api_key: Option<String>,
    model: SoraModel,
}

impl SoraAdapterBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API key. Falls back to `OPENAI_API_KEY` env var.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Sets the Sora model variant.
    pub fn model(mut self, model: SoraModel) -> Self {
        self.model = model;
        self
    }

    /// Builds the adapter, resolving the API key.
    pub fn build(self) -> Result<SoraAdapter> {
        let api_key = self
            .api_key
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .ok_or_else(|| {
                VivifyError::Configuration("OPENAI_API_KEY not set and no API key provided".into())
            })?;

        Ok(SoraAdapter {
            client: reqwest::Client::new(),
            api_key,
            model: self.model,
        })
    }
}

/// Sora video generation adapter.
///
/// Submits the source image as a named multipart file part carrying its MIME
/// type so the backend does not treat it as an opaque octet stream.
#[derive(Debug)]
pub struct SoraAdapter {
    client: reqwest::Client,
    api_key: String,
    model: SoraModel,
}

impl SoraAdapter {
    /// Creates a new [`SoraAdapterBuilder`].
    pub fn builder() -> SoraAdapterBuilder {
        SoraAdapterBuilder::new()
    }

    fn parse_error(&self, status: u16, text: &str) -> VivifyError {
        let message = match serde_json::from_str::<OpenAiErrorResponse>(text) {
            Ok(body) => body.error.message,
            Err(_) => sanitize_error_message(text),
        };
        VivifyError::Upstream { status, message }
    }
}

#[async_trait]
impl ProviderAdapter for SoraAdapter {
    async fn submit(&self, request: &SubmissionRequest) -> Result<ProviderSubmission> {
        let part = Part::bytes(request.image.clone())
            .file_name(request.mime.filename())
            .mime_str(request.mime.as_str())?;
        let form = Form::new()
            .text("model", self.model.as_str())
            .text("prompt", request.prompt.clone())
            .text("size", VIDEO_SIZE)
            .text("seconds", VIDEO_SECONDS)
            .part("input_reference", part);

        let response = self
            .client
            .post(BASE_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(self.parse_error(status.as_u16(), &text));
        }

        let body: SoraSubmitResponse = response.json().await?;
        Ok(ProviderSubmission {
            id: body.id,
            raw_status: body.status,
        })
    }

    async fn fetch(&self, job_id: &str) -> Result<ProviderJobState> {
        let url = format!("{}/{}", BASE_URL, job_id);
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .send()
            .await?;

        let status = response.status();
        if status.as_u16() == 404 {
            return Err(VivifyError::NotFound(job_id.to_string()));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(self.parse_error(status.as_u16(), &text));
        }

        let body: Value = response.json().await?;
        let raw_status = body
            .get("status")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let error = read_error_message(&body);

        // The playable URL may sit at `video_url` or inside `output` depending
        // on the response shape; hand the whole body to the extractor rather
        // than guessing here.
        Ok(ProviderJobState {
            raw_status,
            output: Some(body),
            error,
        })
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::OpenAI
    }
}

/// The error may arrive as a bare string, an `{message}` object, or a
/// top-level `failure_reason`.
fn read_error_message(body: &Value) -> Option<String> {
    match body.get("error") {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Object(map)) => map
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string),
        _ => body
            .get("failure_reason")
            .and_then(Value::as_str)
            .map(str::to_string),
    }
}

// Response types

#[derive(Debug, Deserialize)]
struct SoraSubmitResponse {
    id: String,
    status: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorResponse {
    error: OpenAiErrorBody,
}

#[derive(Debug, Deserialize)]
struct OpenAiErrorBody {
    message: String,
}
