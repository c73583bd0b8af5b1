//! Core types for the normalized job lifecycle.

use serde::{Deserialize, Serialize};

/// Backend a job belongs to. Set at submission, immutable afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Sora-style video API (OpenAI).
    OpenAI,
    /// Replicate-style prediction API.
    Replicate,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OpenAI => write!(f, "openai"),
            Self::Replicate => write!(f, "replicate"),
        }
    }
}

/// Normalized job status: the only status vocabulary the rest of the
/// system ever branches on.
///
/// Raw backend strings stop at the normalizer; an unrecognized one is carried
/// verbatim in [`JobStatus::Other`] and treated as non-terminal, so callers
/// can detect vocabulary drift instead of having it silently coerced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    /// Accepted by the backend, not yet started.
    Queued,
    /// Generation in progress.
    Processing,
    /// Generation finished with a playable result.
    Succeeded,
    /// Generation failed.
    Failed,
    /// Generation canceled before completion.
    Canceled,
    /// Unrecognized backend status, passed through unchanged. Non-terminal.
    #[serde(untagged)]
    Other(String),
}

impl JobStatus {
    /// Returns true if this status ends a job's lifecycle and stops polling.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed | Self::Canceled)
    }
}

impl std::fmt::Display for JobStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Queued => write!(f, "queued"),
            Self::Processing => write!(f, "processing"),
            Self::Succeeded => write!(f, "succeeded"),
            Self::Failed => write!(f, "failed"),
            Self::Canceled => write!(f, "canceled"),
            Self::Other(raw) => write!(f, "{raw}"),
        }
    }
}

/// Accepted input image MIME types.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageMime {
    /// `image/png`
    #[default]
    Png,
    /// `image/jpeg`
    Jpeg,
    /// `image/webp`
    Webp,
}

impl ImageMime {
    /// Maps a MIME string onto the accepted set, defaulting anything
    /// unrecognized to PNG the way the lenient backends do.
    pub fn from_mime_type(mime: &str) -> Self {
        match mime {
            "image/jpeg" => Self::Jpeg,
            "image/webp" => Self::Webp,
            _ => Self::Png,
        }
    }

    /// Infers the MIME type from a file extension, e.g. `"jpg"`.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "png" => Some(Self::Png),
            "jpg" | "jpeg" => Some(Self::Jpeg),
            "webp" => Some(Self::Webp),
            _ => None,
        }
    }

    /// Returns the MIME string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Png => "image/png",
            Self::Jpeg => "image/jpeg",
            Self::Webp => "image/webp",
        }
    }

    /// Default filename for a multipart upload of this type, so backends do
    /// not treat the part as an opaque octet stream.
    pub fn filename(&self) -> &'static str {
        match self {
            Self::Png => "image.png",
            Self::Jpeg => "image.jpg",
            Self::Webp => "image.webp",
        }
    }
}

/// A request to animate a still image.
///
/// Ephemeral: exists only for the duration of one submit call and is never
/// persisted.
#[derive(Debug, Clone)]
pub struct SubmissionRequest {
    /// Raw image bytes.
    pub image: Vec<u8>,
    /// Image MIME type.
    pub mime: ImageMime,
    /// Motion prompt describing the desired animation.
    pub prompt: String,
}

impl SubmissionRequest {
    /// Creates a new request.
    pub fn new(image: Vec<u8>, mime: ImageMime, prompt: impl Into<String>) -> Self {
        Self {
            image,
            mime,
            prompt: prompt.into(),
        }
    }
}

/// Outcome of a submission surfaced to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitReceipt {
    /// Backend-assigned job id.
    pub id: String,
    /// Normalized status at submission time.
    pub status: JobStatus,
}

/// Outcome of a single poll surfaced to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PollSnapshot {
    /// Backend-assigned job id.
    pub id: String,
    /// Normalized status at poll time.
    pub status: JobStatus,
    /// Playable video URL, present only once the job is resolvable.
    pub result_url: Option<String>,
    /// Backend error text, present only for failed or canceled jobs.
    pub error: Option<String>,
}

/// The normalized record of one generation request's lifecycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Backend-assigned opaque id. Immutable once assigned.
    pub id: String,
    /// Provider that owns this job. Immutable; adapters are never mixed for
    /// a single job id.
    pub provider: ProviderKind,
    /// Latest normalized status. Always trusts the most recent poll.
    pub status: JobStatus,
    /// Playable video URL. Write-once: a later poll never re-derives or
    /// overwrites it.
    pub result_url: Option<String>,
    /// Backend error text for failed or canceled jobs.
    pub error: Option<String>,
}

impl Job {
    /// Creates a job record from a submission receipt.
    pub fn from_receipt(provider: ProviderKind, receipt: &SubmitReceipt) -> Self {
        Self {
            id: receipt.id.clone(),
            provider,
            status: receipt.status.clone(),
            result_url: None,
            error: None,
        }
    }

    /// Folds a later poll into the record.
    ///
    /// The id and provider never change, and a resolved `result_url` is kept
    /// as-is even if a later snapshot carries a different one.
    pub fn apply(&mut self, snapshot: &PollSnapshot) {
        self.status = snapshot.status.clone();
        if self.result_url.is_none() {
            self.result_url = snapshot.result_url.clone();
        }
        self.error = snapshot.error.clone();
    }
}
