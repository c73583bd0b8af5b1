//! Backend status vocabulary normalization.

use crate::job::types::JobStatus;

/// Maps a backend's raw status string onto the normalized set.
///
/// Case-insensitive. The two backends use disjoint but overlapping
/// vocabularies (`starting` vs `queued`, `completed` vs `succeeded`); callers
/// must only ever branch on the normalized value so adapters stay swappable.
/// An unrecognized status passes through unchanged as [`JobStatus::Other`].
pub fn normalize(raw: &str) -> JobStatus {
    match raw.to_ascii_lowercase().as_str() {
        "starting" | "processing" | "queued" | "in_progress" => JobStatus::Processing,
        "succeeded" | "completed" => JobStatus::Succeeded,
        "failed" => JobStatus::Failed,
        "canceled" | "cancelled" => JobStatus::Canceled,
        _ => JobStatus::Other(raw.to_string()),
    }
}
