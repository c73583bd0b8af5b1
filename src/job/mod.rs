//! Normalized job lifecycle: types, status vocabulary, result extraction,
//! orchestration, and the client-side polling loop.

mod extract;
mod orchestrator;
mod poller;
mod status;
mod types;

pub use extract::extract_video_url;
pub use orchestrator::JobOrchestrator;
pub use poller::{FlowState, FlowUpdate, PollingLoop};
pub use status::normalize;
pub use types::{
    ImageMime, Job, JobStatus, PollSnapshot, ProviderKind, SubmissionRequest, SubmitReceipt,
};
