//! Replicate prediction adapter.

use async_trait::async_trait;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{sanitize_error_message, Result, VivifyError};
use crate::job::{ProviderKind, SubmissionRequest};
use crate::provider::adapter::{ProviderAdapter, ProviderJobState, ProviderSubmission};

const BASE_URL: &str = "https://api.replicate.com/v1/predictions";

/// Fallback model version used when none is configured.
const DEFAULT_VERSION: &str = "3f0457e4619daac51203dedb472816fd4af51f3149fa7a9e0b5ffcf1b8172438";

/// Default output resolution.
const DEFAULT_RESOLUTION: &str = "720p";

/// Default output aspect ratio.
const DEFAULT_ASPECT_RATIO: &str = "16:9";

/// Default output frame rate.
const DEFAULT_FPS: u32 = 24;

/// Default number of generated frames.
const DEFAULT_NUM_FRAMES: u32 = 81;

/// Reduces a configured model identifier to the bare version token.
///
/// Accepts either a bare version or a compound `owner/name:version`; only the
/// text after the last colon is what the predictions endpoint wants.
fn resolve_version(configured: &str) -> &str {
    match configured.rsplit_once(':') {
        Some((_, version)) => version,
        None => configured,
    }
}

/// Builder for [`ReplicateAdapter`].
#[derive(Debug, Clone, Default)]
pub struct ReplicateAdapterBuilder {
    api_token: Option<String>,
    model: Option<String>,
}

impl ReplicateAdapterBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the API token. Falls back to `REPLICATE_API_TOKEN` env var.
    pub fn api_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    /// Sets the model identifier, either a bare version token or a compound
    /// `owner/name:version`. Falls back to `REPLICATE_MODEL_VERSION` env var,
    /// then to a hard-coded default.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Builds the adapter, resolving the API token and model version.
    pub fn build(self) -> Result<ReplicateAdapter> {
        let api_token = self
            .api_token
            .or_else(|| std::env::var("REPLICATE_API_TOKEN").ok())
            .ok_or_else(|| {
                VivifyError::Configuration(
                    "REPLICATE_API_TOKEN not set and no API token provided".into(),
                )
            })?;

        let configured = self
            .model
            .or_else(|| std::env::var("REPLICATE_MODEL_VERSION").ok());
        let version = match configured.as_deref().map(str::trim).map(resolve_version) {
            Some(v) if !v.is_empty() => v.to_string(),
            _ => DEFAULT_VERSION.to_string(),
        };

        Ok(ReplicateAdapter {
            client: reqwest::Client::new(),
            api_token,
            version,
        })
    }
}

/// Replicate prediction adapter.
///
/// Inlines the source image as a base64 data URI and ships an explicit
/// parameter bundle; the prediction's `output` shape is model-dependent, so
/// it is forwarded untouched for the extractor to resolve.
#[derive(Debug)]
pub struct ReplicateAdapter {
    client: reqwest::Client,
    api_token: String,
    version: String,
}

impl ReplicateAdapter {
    /// Creates a new [`ReplicateAdapterBuilder`].
    pub fn builder() -> ReplicateAdapterBuilder {
        ReplicateAdapterBuilder::new()
    }

    fn data_uri(request: &SubmissionRequest) -> String {
        let encoded = base64::engine::general_purpose::STANDARD.encode(&request.image);
        format!("data:{};base64,{}", request.mime.as_str(), encoded)
    }

    fn parse_error(&self, status: u16, text: &str) -> VivifyError {
        let message = match serde_json::from_str::<ReplicateErrorResponse>(text) {
            Ok(body) => body.detail,
            Err(_) => sanitize_error_message(text),
        };
        VivifyError::Upstream { status, message }
    }
}

#[async_trait]
impl ProviderAdapter for ReplicateAdapter {
    async fn submit(&self, request: &SubmissionRequest) -> Result<ProviderSubmission> {
        let body = PredictionRequest {
            version: self.version.clone(),
            input: PredictionInput {
                image: Self::data_uri(request),
                prompt: request.prompt.clone(),
                resolution: DEFAULT_RESOLUTION.to_string(),
                aspect_ratio: DEFAULT_ASPECT_RATIO.to_string(),
                fps: DEFAULT_FPS,
                num_frames: DEFAULT_NUM_FRAMES,
            },
        };

        let response = self
            .client
            .post(BASE_URL)
            .header("Authorization", format!("Bearer {}", self.api_token))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(self.parse_error(status.as_u16(), &text));
        }

        let prediction: PredictionResponse = response.json().await?;
        Ok(ProviderSubmission {
            id: prediction.id,
            raw_status: prediction.status,
        })
    }

    async fn fetch(&self, job_id: &str) -> Result<ProviderJobState> {
        let url = format!("{}/{}", BASE_URL, job_id);
        let response = self
            .client
            .get(&url)
            .header("Authorization", format!("Bearer {}", self.api_token))
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

        let prediction: PredictionResponse = response.json().await?;
        let error = prediction.error_text();
        Ok(ProviderJobState {
            raw_status: prediction.status,
            output: prediction.output,
            error,
        })
    }

    fn kind(&self) -> ProviderKind {
        ProviderKind::Replicate
    }
}

// Request/Response types

#[derive(Debug, Serialize)]
struct PredictionRequest {
    version: String,
    input: PredictionInput,
}

#[derive(Debug, Serialize)]
struct PredictionInput {
    image: String,
    prompt: String,
    resolution: String,
    aspect_ratio: String,
    fps: u32,
    num_frames: u32,
}

#[derive(Debug, Deserialize)]
struct PredictionResponse {
    id: String,
    status: String,
    #[serde(default)]
    output: Option<Value>,
    #[serde(default)]
    error: Option<Value>,
}

impl PredictionResponse {
    /// The error field is usually a string or null, but nothing stops a model
    /// from returning something richer.
    fn error_text(&self) -> Option<String> {
        match &self.error {
            Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
            Some(Value::Null) | None => None,
            Some(Value::String(_)) => None,
            Some(other) => Some(other.to_string()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ReplicateErrorResponse {
    detail: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::ImageMime;

    #[test]
    fn test_resolve_version_compound() {
        assert_eq!(resolve_version("team/model:abcdef123"), "abcdef123");
        assert_eq!(
            resolve_version("stability-ai/stable-video-diffusion:3f0457e4"),
            "3f0457e4"
        );
    }

    #[test]
    fn test_resolve_version_bare_passthrough() {
        assert_eq!(resolve_version("abcdef123"), "abcdef123");
    }

    #[test]
    fn test_resolve_version_takes_last_colon() {
        assert_eq!(resolve_version("registry:team/model:v123"), "v123");
    }

    #[test]
    fn test_builder_with_explicit_token() {
        let adapter = ReplicateAdapterBuilder::new()
            .api_token("r8_test")
            .model("team/model:abcdef123")
            .build()
            .unwrap();
        assert_eq!(adapter.version, "abcdef123");
    }

    #[test]
    fn test_builder_without_token_fails() {
        std::env::remove_var("REPLICATE_API_TOKEN");
        let err = ReplicateAdapterBuilder::new().build().unwrap_err();
        assert!(matches!(err, VivifyError::Configuration(_)));
    }

    #[test]
    fn test_builder_falls_back_to_default_version() {
        std::env::remove_var("REPLICATE_MODEL_VERSION");
        let adapter = ReplicateAdapterBuilder::new()
            .api_token("r8_test")
            .build()
            .unwrap();
        assert_eq!(adapter.version, DEFAULT_VERSION);
    }

    #[test]
    fn test_builder_empty_version_falls_back() {
        let adapter = ReplicateAdapterBuilder::new()
            .api_token("r8_test")
            .model("team/model:")
            .build()
            .unwrap();
        assert_eq!(adapter.version, DEFAULT_VERSION);
    }

    #[test]
    fn test_data_uri_prefix() {
        let request = SubmissionRequest::new(vec![1, 2, 3], ImageMime::Jpeg, "waves");
        let uri = ReplicateAdapter::data_uri(&request);
        assert!(uri.starts_with("data:image/jpeg;base64,"));

        let request = SubmissionRequest::new(vec![1, 2, 3], ImageMime::Png, "waves");
        assert!(ReplicateAdapter::data_uri(&request).starts_with("data:image/png;base64,"));
    }

    #[test]
    fn test_request_serialization() {
        let body = PredictionRequest {
            version: "abcdef123".into(),
            input: PredictionInput {
                image: "data:image/png;base64,AQID".into(),
                prompt: "Ocean waves at sunset".into(),
                resolution: DEFAULT_RESOLUTION.into(),
                aspect_ratio: DEFAULT_ASPECT_RATIO.into(),
                fps: DEFAULT_FPS,
                num_frames: DEFAULT_NUM_FRAMES,
            },
        };
        let json = serde_json::to_value(&body).unwrap();

        assert_eq!(json["version"], "abcdef123");
        assert_eq!(json["input"]["prompt"], "Ocean waves at sunset");
        assert_eq!(json["input"]["resolution"], "720p");
        assert_eq!(json["input"]["aspect_ratio"], "16:9");
        assert_eq!(json["input"]["fps"], 24);
        assert_eq!(json["input"]["num_frames"], 81);
    }

    #[test]
    fn test_response_deserialization_string_output() {
        let json = r#"{
            "id": "pred-abc",
            "status": "succeeded",
            "output": "https://replicate.delivery/pbxt/clip.mp4",
            "error": null
        }"#;
        let resp: PredictionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.id, "pred-abc");
        assert_eq!(resp.status, "succeeded");
        assert_eq!(
            resp.output.as_ref().unwrap().as_str(),
            Some("https://replicate.delivery/pbxt/clip.mp4")
        );
        assert_eq!(resp.error_text(), None);
    }

    #[test]
    fn test_response_deserialization_array_output() {
        let json = r#"{
            "id": "pred-def",
            "status": "succeeded",
            "output": ["https://replicate.delivery/pbxt/out-0.mp4"]
        }"#;
        let resp: PredictionResponse = serde_json::from_str(json).unwrap();
        assert!(resp.output.unwrap().is_array());
    }

    #[test]
    fn test_response_deserialization_starting() {
        let json = r#"{"id": "pred-ghi", "status": "starting"}"#;
        let resp: PredictionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.status, "starting");
        assert!(resp.output.is_none());
        assert_eq!(resp.error_text(), None);
    }

    #[test]
    fn test_error_text_variants() {
        let json = r#"{"id": "p", "status": "failed", "error": "CUDA out of memory"}"#;
        let resp: PredictionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.error_text().as_deref(), Some("CUDA out of memory"));

        let json = r#"{"id": "p", "status": "failed", "error": ""}"#;
        let resp: PredictionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.error_text(), None);

        let json = r#"{"id": "p", "status": "failed", "error": {"code": 137}}"#;
        let resp: PredictionResponse = serde_json::from_str(json).unwrap();
        assert_eq!(resp.error_text().as_deref(), Some(r#"{"code":137}"#));
    }

    #[test]
    fn test_parse_error_detail_extraction() {
        let adapter = ReplicateAdapterBuilder::new()
            .api_token("r8_test")
            .build()
            .unwrap();

        let err = adapter.parse_error(422, r#"{"detail": "Invalid version or not permitted"}"#);
        match err {
            VivifyError::Upstream { status, message } => {
                assert_eq!(status, 422);
                assert_eq!(message, "Invalid version or not permitted");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let err = adapter.parse_error(500, "upstream exploded");
        match err {
            VivifyError::Upstream { status, message } => {
                assert_eq!(status, 500);
                assert_eq!(message, "upstream exploded");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
