//! Provider adapter contract.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::Result;
use crate::job::{ProviderKind, SubmissionRequest};

/// A submission acknowledged by a backend.
#[derive(Debug, Clone)]
pub struct ProviderSubmission {
    /// Backend-assigned job id.
    pub id: String,
    /// The backend's own status vocabulary, not yet normalized.
    pub raw_status: String,
}

/// A job's current state as one backend reports it.
#[derive(Debug, Clone, Default)]
pub struct ProviderJobState {
    /// The backend's own status vocabulary, not yet normalized.
    pub raw_status: String,
    /// The backend's raw output value; its shape is the backend's business.
    pub output: Option<Value>,
    /// The backend's error text, if it reported one.
    pub error: Option<String>,
}

/// Trait for backend-specific submission and state fetching.
///
/// Everything backend-specific (request shaping, auth headers, status
/// vocabulary, result encoding) stays behind this boundary. Callers only
/// ever see the normalized job contract, so adapters remain swappable
/// without touching polling logic.
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Submits a generation request, returning the backend's job id and raw
    /// status.
    async fn submit(&self, request: &SubmissionRequest) -> Result<ProviderSubmission>;

    /// Fetches the current raw state of a previously submitted job.
    async fn fetch(&self, job_id: &str) -> Result<ProviderJobState>;

    /// Returns the kind of this provider.
    fn kind(&self) -> ProviderKind;

    /// Returns the name of this provider for display.
    fn name(&self) -> &str {
        match self.kind() {
            ProviderKind::OpenAI => "Sora (OpenAI)",
            ProviderKind::Replicate => "Replicate",
        }
    }
}
