//! Progress reporting and cancellation support for the job pipeline.
//!
//! Progress is persisted on the job record at fixed checkpoints; the same
//! checkpoints are also emitted to an optional in-process [`ProgressReporter`].
//!
//! # Example
//!
//! ```rust,ignore
//! use canvas_profiler::{CancellationToken, JobProcessor};
//!
//! let token = CancellationToken::new();
//! let processor = JobProcessor::builder()
//!     .stores(stores)
//!     .cancellation_token(token.clone())
//!     .on_progress(|update| {
//!         println!("[{}] {:?} {}%", update.job_id, update.stage, update.progress);
//!     })
//!     .build()?;
//!
//! tokio::spawn(async move { processor.run_poller().await });
//! // later
//! token.cancel();
//! ```

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::Notify;

/// Checkpoints of a profiling job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStage {
    /// Job claimed and marked running
    Claimed,
    /// Dataset downloaded and parsed
    Loaded,
    /// Profile computed
    Profiled,
    /// Profile stored and job completed
    Completed,
    /// Job failed; progress is left where it stopped
    Failed,
}

impl JobStage {
    /// Returns a human-readable name for the stage.
    pub fn display_name(&self) -> &'static str {
        match self {
            Self::Claimed => "Claimed",
            Self::Loaded => "Dataset Loaded",
            Self::Profiled => "Profile Computed",
            Self::Completed => "Completed",
            Self::Failed => "Failed",
        }
    }

    /// Persisted progress for this checkpoint.
    pub fn progress(&self) -> Option<u8> {
        match self {
            Self::Claimed => Some(10),
            Self::Loaded => Some(50),
            Self::Profiled => Some(80),
            Self::Completed => Some(100),
            Self::Failed => None,
        }
    }
}

/// A progress update for one job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobProgress {
    pub job_id: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,

    pub stage: JobStage,

    /// Progress on the job record (0 - 100)
    pub progress: u8,

    /// Human-readable message describing current activity
    pub message: String,
}

impl JobProgress {
    /// Creates an update at a checkpoint.
    pub fn new(
        job_id: impl Into<String>,
        version_id: Option<String>,
        stage: JobStage,
        message: impl Into<String>,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            version_id,
            stage,
            progress: stage.progress().unwrap_or(0),
            message: message.into(),
        }
    }

    /// Creates a failed update; `progress` is where the job stopped.
    pub fn failed(
        job_id: impl Into<String>,
        version_id: Option<String>,
        progress: u8,
        message: impl Into<String>,
    ) -> Self {
        Self {
            job_id: job_id.into(),
            version_id,
            stage: JobStage::Failed,
            progress,
            message: message.into(),
        }
    }
}

/// Trait for receiving progress updates from the job processor.
///
/// Implementations must be `Send + Sync`; updates are emitted from the
/// poller task.
pub trait ProgressReporter: Send + Sync {
    /// Called at every job checkpoint. Should not block.
    fn report(&self, update: JobProgress);
}

/// Wrapper that implements [`ProgressReporter`] using a closure.
pub struct ClosureProgressReporter<F>
where
    F: Fn(JobProgress) + Send + Sync,
{
    callback: F,
}

impl<F> ClosureProgressReporter<F>
where
    F: Fn(JobProgress) + Send + Sync,
{
    /// Creates a new closure-based progress reporter.
    pub fn new(callback: F) -> Self {
        Self { callback }
    }
}

impl<F> ProgressReporter for ClosureProgressReporter<F>
where
    F: Fn(JobProgress) + Send + Sync,
{
    fn report(&self, update: JobProgress) {
        (self.callback)(update);
    }
}

#[derive(Debug, Default)]
struct CancellationState {
    cancelled: AtomicBool,
    notify: Notify,
}

/// Token for stopping the poller.
///
/// Clones share state. The poller checks the flag at the top of each sweep
/// and awaits [`cancelled()`](Self::cancelled) during the inter-sweep sleep,
/// so cancellation never interrupts a job in progress.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    state: Arc<CancellationState>,
}

static_assertions::assert_impl_all!(CancellationToken: Send, Sync);
static_assertions::assert_impl_all!(JobProgress: Send, Sync);

impl CancellationToken {
    /// Creates a new cancellation token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation. Safe to call from any thread or task.
    pub fn cancel(&self) {
        self.state.cancelled.store(true, Ordering::SeqCst);
        self.state.notify.notify_waiters();
    }

    /// Check if cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.state.cancelled.load(Ordering::SeqCst)
    }

    /// Resolves once [`cancel()`](Self::cancel) has been called.
    pub async fn cancelled(&self) {
        loop {
            // Registered before the check so a concurrent cancel is not missed.
            let notified = self.state.notify.notified();
            if self.is_cancelled() {
                return;
            }
            notified.await;
        }
    }
}
