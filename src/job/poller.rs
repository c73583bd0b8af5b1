//! Client-side polling loop driving one generation flow to a terminal state.

use std::time::Duration;

use tokio::time::{sleep, Instant};
use tokio_util::sync::CancellationToken;

use crate::error::{Result, VivifyError};
use crate::job::orchestrator::JobOrchestrator;
use crate::job::types::{Job, JobStatus, SubmissionRequest};

/// Default delay between consecutive polls.
const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Default wall-clock ceiling for one flow, measured from submission.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// User-facing message when the ceiling is exceeded.
const TIMEOUT_MESSAGE: &str = "Timed out. Please try again.";

/// Fallback message when a terminal failure carries no backend text.
const GENERIC_FAILURE: &str = "Generation failed";

/// States of one generation flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    /// Image and prompt are being submitted.
    Uploading,
    /// The backend accepted the job.
    Submitted,
    /// Waiting on the backend, polling on a fixed cadence.
    Polling,
    /// A playable video URL is available. Terminal.
    Resolved,
    /// The flow ended without a playable result. Terminal.
    Errored,
}

/// A state transition surfaced to the caller while the flow runs.
#[derive(Debug, Clone)]
pub struct FlowUpdate {
    /// The state the flow just entered.
    pub state: FlowState,
    /// Human-readable status text for display.
    pub message: String,
}

impl FlowUpdate {
    fn new(state: FlowState, message: impl Into<String>) -> Self {
        Self {
            state,
            message: message.into(),
        }
    }
}

/// Drives repeated polls on a fixed cadence until a terminal state, a
/// timeout, or cancellation.
///
/// The loop is cooperative: it suspends between polls, performs one network
/// round trip per iteration, and issues no intra-tick retries; the next
/// scheduled iteration is the retry cadence. Cancellation is raced against
/// both the sleep and the in-flight request, so an abandoned session's
/// eventual response can never leak into a later session's state.
pub struct PollingLoop {
    interval: Duration,
    timeout: Duration,
}

impl Default for PollingLoop {
    fn default() -> Self {
        Self {
            interval: DEFAULT_POLL_INTERVAL,
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

impl PollingLoop {
    /// Creates a loop with the default 2-second cadence and 2-minute ceiling.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the delay between consecutive polls.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Sets the wall-clock ceiling for the whole flow.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Submits the request and polls until the job resolves, fails, times
    /// out, or is canceled.
    ///
    /// Backend-terminal outcomes return `Ok`: the [`Job`] carries either a
    /// resolved URL or the failure text. Transport faults, validation
    /// failures, timeout, and cancellation return the error that ended the
    /// flow. Each state transition is handed to `observer` as it happens; no
    /// further polling occurs after a terminal state.
    pub async fn run<F>(
        &self,
        orchestrator: &JobOrchestrator,
        request: &SubmissionRequest,
        cancel: &CancellationToken,
        mut observer: F,
    ) -> Result<Job>
    where
        F: FnMut(FlowUpdate),
    {
        let started = Instant::now();
        observer(FlowUpdate::new(FlowState::Uploading, "Uploading image..."));

        let submitted = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(VivifyError::Canceled),
            result = orchestrator.submit(request) => result,
        };
        let receipt = match submitted {
            Ok(receipt) => receipt,
            Err(e) => {
                observer(FlowUpdate::new(FlowState::Errored, e.to_string()));
                return Err(e);
            }
        };

        let mut job = Job::from_receipt(orchestrator.provider(), &receipt);
        observer(FlowUpdate::new(FlowState::Submitted, "Generating video..."));

        loop {
            if started.elapsed() > self.timeout {
                observer(FlowUpdate::new(FlowState::Errored, TIMEOUT_MESSAGE));
                return Err(VivifyError::Timeout(self.timeout));
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(VivifyError::Canceled),
                _ = sleep(self.interval) => {}
            }

            let polled = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(VivifyError::Canceled),
                result = orchestrator.poll(&job.id) => result,
            };
            let snapshot = match polled {
                Ok(snapshot) => snapshot,
                Err(e) => {
                    observer(FlowUpdate::new(FlowState::Errored, e.to_string()));
                    return Err(e);
                }
            };

            job.apply(&snapshot);

            if matches!(job.status, JobStatus::Succeeded) && job.result_url.is_some() {
                observer(FlowUpdate::new(FlowState::Resolved, "Video ready"));
                tracing::debug!(job_id = %job.id, "generation flow resolved");
                return Ok(job);
            }
            if matches!(job.status, JobStatus::Failed | JobStatus::Canceled) {
                let message = job.error.clone().unwrap_or_else(|| GENERIC_FAILURE.into());
                observer(FlowUpdate::new(FlowState::Errored, message));
                return Ok(job);
            }

            tracing::debug!(
                job_id = %job.id,
                status = %job.status,
                elapsed_secs = started.elapsed().as_secs(),
                "polling generation job"
            );
            observer(FlowUpdate::new(
                FlowState::Polling,
                format!("Status: {}...", job.status),
            ));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::types::{ImageMime, ProviderKind};
    use crate::provider::{ProviderAdapter, ProviderJobState, ProviderSubmission};
    use async_trait::async_trait;
    use serde_json::json;
    use std::collections::VecDeque;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    /// Replays scripted states; the last one repeats forever.
    struct ScriptedAdapter {
        states: Mutex<VecDeque<ProviderJobState>>,
        submit_calls: AtomicUsize,
    }

    impl ScriptedAdapter {
        fn with_states(states: Vec<ProviderJobState>) -> Self {
            assert!(!states.is_empty());
            Self {
                states: Mutex::new(states.into()),
                submit_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ProviderAdapter for ScriptedAdapter {
        async fn submit(&self, _request: &SubmissionRequest) -> crate::Result<ProviderSubmission> {
            self.submit_calls.fetch_add(1, Ordering::SeqCst);
            Ok(ProviderSubmission {
                id: "job-1".into(),
                raw_status: "starting".into(),
            })
        }

        async fn fetch(&self, _job_id: &str) -> crate::Result<ProviderJobState> {
            let mut states = self.states.lock().unwrap();
            if states.len() > 1 {
                Ok(states.pop_front().unwrap())
            } else {
                Ok(states.front().unwrap().clone())
            }
        }

        fn kind(&self) -> ProviderKind {
            ProviderKind::Replicate
        }
    }

    fn processing() -> ProviderJobState {
        ProviderJobState {
            raw_status: "processing".into(),
            output: None,
            error: None,
        }
    }

    fn request() -> SubmissionRequest {
        SubmissionRequest::new(vec![0u8; 16], ImageMime::Png, "slow cinematic zoom")
    }

    fn harness(states: Vec<ProviderJobState>) -> (JobOrchestrator, Arc<ScriptedAdapter>) {
        let adapter = Arc::new(ScriptedAdapter::with_states(states));
        (JobOrchestrator::new(adapter.clone()), adapter)
    }

    #[tokio::test(start_paused = true)]
    async fn test_resolves_on_succeeded_with_url() {
        let (orch, _) = harness(vec![
            processing(),
            ProviderJobState {
                raw_status: "succeeded".into(),
                output: Some(json!("https://cdn.example/clip.mp4")),
                error: None,
            },
        ]);

        let mut states = Vec::new();
        let job = PollingLoop::new()
            .run(&orch, &request(), &CancellationToken::new(), |update| {
                states.push(update.state);
            })
            .await
            .unwrap();

        assert_eq!(job.status, JobStatus::Succeeded);
        assert_eq!(job.result_url.as_deref(), Some("https://cdn.example/clip.mp4"));
        assert_eq!(
            states,
            vec![
                FlowState::Uploading,
                FlowState::Submitted,
                FlowState::Polling,
                FlowState::Resolved
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_errors_on_failed_status() {
        let (orch, _) = harness(vec![ProviderJobState {
            raw_status: "failed".into(),
            output: None,
            error: Some("NSFW content detected".into()),
        }]);

        let mut last = None;
        let job = PollingLoop::new()
            .run(&orch, &request(), &CancellationToken::new(), |update| {
                last = Some(update);
            })
            .await
            .unwrap();

        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error.as_deref(), Some("NSFW content detected"));
        let last = last.unwrap();
        assert_eq!(last.state, FlowState::Errored);
        assert_eq!(last.message, "NSFW content detected");
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_while_non_terminal() {
        let (orch, _) = harness(vec![processing()]);

        let mut last = None;
        let err = PollingLoop::new()
            .run(&orch, &request(), &CancellationToken::new(), |update| {
                last = Some(update);
            })
            .await
            .unwrap_err();

        assert!(matches!(err, VivifyError::Timeout(_)));
        let last = last.unwrap();
        assert_eq!(last.state, FlowState::Errored);
        assert_eq!(last.message, "Timed out. Please try again.");
    }

    #[tokio::test(start_paused = true)]
    async fn test_times_out_on_succeeded_without_result() {
        // Raw success with no extractable output never resolves; the ceiling
        // ends the flow instead of a broken player.
        let (orch, _) = harness(vec![ProviderJobState {
            raw_status: "succeeded".into(),
            output: Some(json!({"progress": 100})),
            error: None,
        }]);

        let mut saw_succeeded = false;
        let err = PollingLoop::new()
            .run(&orch, &request(), &CancellationToken::new(), |update| {
                saw_succeeded |= update.state == FlowState::Resolved;
            })
            .await
            .unwrap_err();

        assert!(matches!(err, VivifyError::Timeout(_)));
        assert!(!saw_succeeded);
    }

    #[tokio::test(start_paused = true)]
    async fn test_canceled_before_submit_never_calls_adapter() {
        let (orch, adapter) = harness(vec![processing()]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = PollingLoop::new()
            .run(&orch, &request(), &cancel, |_| {})
            .await
            .unwrap_err();

        assert!(matches!(err, VivifyError::Canceled));
        assert_eq!(adapter.submit_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_canceled_mid_flow_stops_polling() {
        let (orch, _) = harness(vec![processing()]);
        let cancel = CancellationToken::new();

        let polls_seen = Arc::new(AtomicUsize::new(0));
        let counter = polls_seen.clone();
        let canceller = cancel.clone();
        let handle = tokio::spawn({
            let orch = orch.clone();
            async move {
                PollingLoop::new()
                    .run(&orch, &request(), &canceller, move |update| {
                        if update.state == FlowState::Polling {
                            counter.fetch_add(1, Ordering::SeqCst);
                        }
                    })
                    .await
            }
        });

        // Let a few polls happen, then abandon the session.
        tokio::time::sleep(Duration::from_secs(7)).await;
        cancel.cancel();
        let result = handle.await.unwrap();

        assert!(matches!(result, Err(VivifyError::Canceled)));
        let seen = polls_seen.load(Ordering::SeqCst);
        assert!(seen >= 1, "expected at least one poll before cancel");
        assert!(seen <= 4, "polling must stop after cancellation");
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_transport_fault_ends_flow() {
        struct FaultyAdapter;

        #[async_trait]
        impl ProviderAdapter for FaultyAdapter {
            async fn submit(
                &self,
                _request: &SubmissionRequest,
            ) -> crate::Result<ProviderSubmission> {
                Ok(ProviderSubmission {
                    id: "job-1".into(),
                    raw_status: "queued".into(),
                })
            }

            async fn fetch(&self, _job_id: &str) -> crate::Result<ProviderJobState> {
                Err(VivifyError::Upstream {
                    status: 500,
                    message: "internal".into(),
                })
            }

            fn kind(&self) -> ProviderKind {
                ProviderKind::OpenAI
            }
        }

        let orch = JobOrchestrator::new(Arc::new(FaultyAdapter));
        let mut last = None;
        let err = PollingLoop::new()
            .run(&orch, &request(), &CancellationToken::new(), |update| {
                last = Some(update);
            })
            .await
            .unwrap_err();

        assert!(matches!(err, VivifyError::Upstream { status: 500, .. }));
        assert_eq!(last.unwrap().state, FlowState::Errored);
    }
}
