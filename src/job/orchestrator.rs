//! Uniform job submission and polling over a configured provider adapter.

use std::sync::Arc;

use crate::error::{Result, VivifyError};
use crate::job::extract::extract_video_url;
use crate::job::status::normalize;
use crate::job::types::{JobStatus, PollSnapshot, ProviderKind, SubmissionRequest, SubmitReceipt};
use crate::provider::ProviderAdapter;

/// Maximum accepted input image payload.
const MAX_IMAGE_BYTES: usize = 10 * 1024 * 1024;

/// Minimum prompt length after trimming.
const MIN_PROMPT_LEN: usize = 3;

/// Fallback error text when a failed backend supplies none.
const FALLBACK_ERROR: &str = "Prediction failed";

/// Submits and polls generation jobs against one configured provider.
///
/// The adapter is chosen once at construction; nothing outside the adapter
/// boundary ever branches on provider identity or raw status strings. The
/// orchestrator holds no per-job state, so it is safe to invoke concurrently
/// for independent job ids.
#[derive(Clone)]
pub struct JobOrchestrator {
    adapter: Arc<dyn ProviderAdapter>,
}

impl JobOrchestrator {
    /// Creates an orchestrator bound to the given adapter.
    pub fn new(adapter: Arc<dyn ProviderAdapter>) -> Self {
        Self { adapter }
    }

    /// Returns the provider this orchestrator submits to.
    pub fn provider(&self) -> ProviderKind {
        self.adapter.kind()
    }

    /// Validates and submits a generation request.
    ///
    /// Input faults are rejected before any network call is made.
    pub async fn submit(&self, request: &SubmissionRequest) -> Result<SubmitReceipt> {
        let prompt = request.prompt.trim();
        if prompt.is_empty() {
            return Err(VivifyError::Validation("prompt is required".into()));
        }
        if prompt.len() < MIN_PROMPT_LEN {
            return Err(VivifyError::Validation("prompt is too short".into()));
        }
        if request.image.is_empty() {
            return Err(VivifyError::Validation("image is required".into()));
        }
        if request.image.len() > MAX_IMAGE_BYTES {
            return Err(VivifyError::Validation("image is too large (max 10MB)".into()));
        }

        let submission = self.adapter.submit(request).await?;
        tracing::debug!(
            job_id = %submission.id,
            raw_status = %submission.raw_status,
            provider = %self.adapter.kind(),
            "submitted generation job"
        );

        Ok(SubmitReceipt {
            id: submission.id,
            status: normalize(&submission.raw_status),
        })
    }

    /// Fetches a job's current state and folds it into the normalized contract.
    ///
    /// A job whose backend reports success but whose output yields no playable
    /// URL is surfaced as still processing; the caller must never be handed a
    /// success with nothing to play.
    pub async fn poll(&self, job_id: &str) -> Result<PollSnapshot> {
        let state = self.adapter.fetch(job_id).await?;
        let status = normalize(&state.raw_status);

        match status {
            JobStatus::Succeeded => {
                let result_url = state.output.as_ref().and_then(|o| extract_video_url(o));
                match result_url {
                    Some(url) => Ok(PollSnapshot {
                        id: job_id.to_string(),
                        status: JobStatus::Succeeded,
                        result_url: Some(url),
                        error: None,
                    }),
                    None => {
                        tracing::debug!(
                            job_id,
                            raw_status = %state.raw_status,
                            "succeeded without an extractable result, treating as still processing"
                        );
                        Ok(PollSnapshot {
                            id: job_id.to_string(),
                            status: JobStatus::Processing,
                            result_url: None,
                            error: None,
                        })
                    }
                }
            }
            JobStatus::Failed | JobStatus::Canceled => {
                let error = state
                    .error
                    .filter(|e| !e.trim().is_empty())
                    .unwrap_or_else(|| FALLBACK_ERROR.to_string());
                Ok(PollSnapshot {
                    id: job_id.to_string(),
                    status,
                    result_url: None,
                    error: Some(error),
                })
            }
            other => Ok(PollSnapshot {
                id: job_id.to_string(),
                status: other,
                result_url: None,
                error: None,
            }),
        }
    }
}
