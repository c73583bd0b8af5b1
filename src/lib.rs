#![warn(missing_docs)]
//! Vivify - turn a still image and a motion prompt into a generated video.
//!
//! Generation is delegated to one of two interchangeable asynchronous job
//! backends (a Sora-style video API or a Replicate-style prediction API).
//! Their divergent submission payloads, status vocabularies, and result
//! encodings are normalized behind one uniform [`Job`] contract, and a
//! cancellable client-side polling loop drives the job until the video is
//! playable or the flow errors out.
//!
//! # Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//! use vivify::{ImageMime, JobOrchestrator, PollingLoop, SoraAdapter, SubmissionRequest};
//!
//! #[tokio::main]
//! async fn main() -> vivify::Result<()> {
//!     let adapter = SoraAdapter::builder().build()?;
//!     let orchestrator = JobOrchestrator::new(Arc::new(adapter));
//!
//!     let image = std::fs::read("photo.png")?;
//!     let request = SubmissionRequest::new(image, ImageMime::Png, "slow cinematic zoom");
//!
//!     let job = PollingLoop::new()
//!         .run(&orchestrator, &request, &CancellationToken::new(), |update| {
//!             eprintln!("{}", update.message);
//!         })
//!         .await?;
//!
//!     println!("{}", job.result_url.unwrap_or_default());
//!     Ok(())
//! }
//! ```
//!
//! # Features
//!
//! - `openai`: Sora-style adapter (default)
//! - `replicate`: Replicate-style adapter (default)
//! - `cli`: command-line interface

mod error;
pub mod job;
pub mod provider;

pub use error::{Result, VivifyError};
pub use job::{
    extract_video_url, normalize, FlowState, FlowUpdate, ImageMime, Job, JobOrchestrator,
    JobStatus, PollSnapshot, PollingLoop, ProviderKind, SubmissionRequest, SubmitReceipt,
};
pub use provider::{ProviderAdapter, ProviderJobState, ProviderSubmission};

#[cfg(feature = "openai")]
pub use provider::providers::{SoraAdapter, SoraAdapterBuilder, SoraModel};

#[cfg(feature = "replicate")]
pub use provider::providers::{ReplicateAdapter, ReplicateAdapterBuilder};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::error::{Result, VivifyError};
    pub use crate::job::{
        ImageMime, Job, JobOrchestrator, JobStatus, PollingLoop, SubmissionRequest,
    };
    pub use crate::provider::ProviderAdapter;

    #[cfg(feature = "openai")]
    pub use crate::provider::providers::SoraAdapter;

    #[cfg(feature = "replicate")]
    pub use crate::provider::providers::ReplicateAdapter;
}
