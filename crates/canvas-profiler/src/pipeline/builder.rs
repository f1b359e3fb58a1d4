//! Job processor and its builder.
//!
//! The [`JobProcessor`] owns everything a worker needs: the stores, the
//! profiling configuration, an optional progress reporter and the
//! cancellation token observed by the poller.

use std::sync::Arc;

use crate::config::ProfilerConfig;
use crate::error::{ProfilerError, Result};
use crate::pipeline::progress::{
    CancellationToken, ClosureProgressReporter, JobProgress, ProgressReporter,
};
use crate::profiler::DataProfiler;
use crate::storage::StoreContext;

/// Drives profiling jobs through their lifecycle.
///
/// Use [`JobProcessor::builder()`] to create one.
///
/// # Example
///
/// ```rust,ignore
/// use canvas_profiler::{JobProcessor, ProfilerConfig};
/// use canvas_profiler::storage::InMemoryStores;
///
/// let stores = InMemoryStores::new();
/// let processor = JobProcessor::builder()
///     .stores(stores.context())
///     .config(ProfilerConfig::default())
///     .build()?;
///
/// let summary = processor.run_sweep().await?;
/// ```
#[derive(Clone)]
pub struct JobProcessor {
    pub(crate) stores: StoreContext,
    pub(crate) config: ProfilerConfig,
    pub(crate) profiler: DataProfiler,
    pub(crate) progress_reporter: Option<Arc<dyn ProgressReporter>>,
    pub(crate) cancellation_token: CancellationToken,
}

static_assertions::assert_impl_all!(JobProcessor: Send, Sync);

impl JobProcessor {
    /// Create a new builder.
    pub fn builder() -> JobProcessorBuilder {
        JobProcessorBuilder::default()
    }

    pub fn config(&self) -> &ProfilerConfig {
        &self.config
    }

    pub fn stores(&self) -> &StoreContext {
        &self.stores
    }

    pub fn cancellation_token(&self) -> &CancellationToken {
        &self.cancellation_token
    }

    /// Check if cancellation has been requested.
    pub(crate) fn check_cancelled(&self) -> Result<()> {
        if self.cancellation_token.is_cancelled() {
            return Err(ProfilerError::Cancelled);
        }
        Ok(())
    }

    /// Report progress if a reporter is configured.
    pub(crate) fn report_progress(&self, update: JobProgress) {
        if let Some(reporter) = &self.progress_reporter {
            reporter.report(update);
        }
    }
}

/// Builder for creating a [`JobProcessor`] instance.
#[derive(Default)]
pub struct JobProcessorBuilder {
    config: Option<ProfilerConfig>,
    stores: Option<StoreContext>,
    progress_reporter: Option<Arc<dyn ProgressReporter>>,
    cancellation_token: Option<CancellationToken>,
}

// Ensure JobProcessorBuilder is Send (can be moved into a spawned task)
static_assertions::assert_impl_all!(JobProcessorBuilder: Send);

impl JobProcessorBuilder {
    /// Set the profiling configuration.
    pub fn config(mut self, config: ProfilerConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the stores the processor reads from and writes to. Required.
    pub fn stores(mut self, stores: StoreContext) -> Self {
        self.stores = Some(stores);
        self
    }

    /// Set a progress reporter for receiving job checkpoints.
    pub fn progress_reporter(mut self, reporter: Arc<dyn ProgressReporter>) -> Self {
        self.progress_reporter = Some(reporter);
        self
    }

    /// Set a progress callback closure.
    pub fn on_progress<F>(mut self, callback: F) -> Self
    where
        F: Fn(JobProgress) + Send + Sync + 'static,
    {
        self.progress_reporter = Some(Arc::new(ClosureProgressReporter::new(callback)));
        self
    }

    /// Set a cancellation token for stopping the poller.
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.cancellation_token = Some(token);
        self
    }

    /// Build the processor.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or no stores were set.
    pub fn build(self) -> Result<JobProcessor> {
        let config = self.config.unwrap_or_default();
        config.validate()?;

        let stores = self
            .stores
            .ok_or_else(|| ProfilerError::InvalidConfig("stores must be set".to_string()))?;

        Ok(JobProcessor {
            profiler: DataProfiler::new(config.clone()),
            config,
            stores,
            progress_reporter: self.progress_reporter,
            cancellation_token: self.cancellation_token.unwrap_or_default(),
        })
    }
}
