//! Single-job execution: claim, load, profile, persist.

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::error::{ProfilerError, Result, ResultExt};
use crate::loader::{DatasetLoader, FileType};
use crate::pipeline::JobProcessor;
use crate::pipeline::progress::{JobProgress, JobStage};
use crate::types::{Job, JobType, ProfileRecord};

/// What happened to one job during a sweep.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum JobOutcome {
    Completed {
        row_count: usize,
        column_count: usize,
    },
    Failed {
        error_code: String,
        message: String,
    },
    /// Another worker claimed the job first.
    Skipped,
}

/// Tally of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SweepSummary {
    pub selected: usize,
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
}

impl SweepSummary {
    fn record(&mut self, outcome: &JobOutcome) {
        match outcome {
            JobOutcome::Completed { .. } => self.completed += 1,
            JobOutcome::Failed { .. } => self.failed += 1,
            JobOutcome::Skipped => self.skipped += 1,
        }
    }
}

impl JobProcessor {
    /// Select up to `jobs_per_sweep` queued profile jobs and process them
    /// one after another. A failing job never stops the sweep.
    pub async fn run_sweep(&self) -> Result<SweepSummary> {
        let jobs = self
            .stores
            .jobs
            .list_queued(JobType::Profile, self.config.jobs_per_sweep)
            .await
            .context("Failed to list queued jobs")?;

        let mut summary = SweepSummary {
            selected: jobs.len(),
            ..SweepSummary::default()
        };

        for job in &jobs {
            match self.process_job(job).await {
                Ok(outcome) => summary.record(&outcome),
                Err(e) => {
                    error!(job_id = %job.id, "Job bookkeeping failed: {}", e);
                    summary.failed += 1;
                }
            }
        }

        Ok(summary)
    }

    /// Process one job by id, the synchronous entry point for a known job.
    pub async fn process_job_by_id(&self, job_id: &str) -> Result<JobOutcome> {
        let job = self
            .stores
            .jobs
            .get(job_id)
            .await?
            .ok_or_else(|| ProfilerError::JobNotFound(job_id.to_string()))?;
        self.process_job(&job).await
    }

    /// Claim and run one job.
    ///
    /// Processing failures are persisted on the job and version and returned
    /// as [`JobOutcome::Failed`]; `Err` means the stores themselves failed.
    pub async fn process_job(&self, job: &Job) -> Result<JobOutcome> {
        let claim_progress = JobStage::Claimed.progress().unwrap_or(10);
        let Some(claimed) = self.stores.jobs.claim(&job.id, claim_progress).await? else {
            debug!(job_id = %job.id, "Job already claimed elsewhere, skipping");
            return Ok(JobOutcome::Skipped);
        };

        let version_id = claimed.payload.version_id.clone();
        info!(job_id = %claimed.id, version_id = ?version_id, "Processing profile job");
        self.report_progress(JobProgress::new(
            &claimed.id,
            version_id.clone(),
            JobStage::Claimed,
            "Job claimed",
        ));

        let result = match self.run_claimed(&claimed).await {
            Ok(shape) => self.stores.jobs.complete(&claimed.id).await.map(|()| shape),
            Err(e) => Err(e),
        };

        match result {
            Ok((row_count, column_count)) => {
                info!(
                    job_id = %claimed.id,
                    "Profile job completed ({} rows, {} columns)",
                    row_count,
                    column_count
                );
                self.report_progress(JobProgress::new(
                    &claimed.id,
                    version_id,
                    JobStage::Completed,
                    "Profile stored",
                ));
                Ok(JobOutcome::Completed {
                    row_count,
                    column_count,
                })
            }
            Err(e) => {
                error!(job_id = %claimed.id, "Profile job failed: {}", e);
                self.record_failure(&claimed, version_id.as_deref(), &e).await;
                Ok(JobOutcome::Failed {
                    error_code: e.error_code().to_string(),
                    message: e.to_string(),
                })
            }
        }
    }

    /// Everything after the claim; returns the stored shape.
    async fn run_claimed(&self, job: &Job) -> Result<(usize, usize)> {
        let version_id = job.payload.version_id.as_deref().ok_or_else(|| {
            ProfilerError::MissingJobPayloadField {
                job_id: job.id.clone(),
                field: "version_id".to_string(),
            }
        })?;

        let version = self
            .stores
            .versions
            .get(version_id)
            .await?
            .ok_or_else(|| ProfilerError::DatasetVersionNotFound(version_id.to_string()))?;

        self.stores.versions.mark_profiling(version_id).await?;

        let storage_path = version
            .storage_path
            .as_deref()
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| ProfilerError::MissingStoragePath(version_id.to_string()))?;
        let file_type = FileType::resolve(version.file_type.as_deref(), storage_path)?;

        let bytes = self
            .stores
            .objects
            .download(&self.config.datasets_bucket, storage_path)
            .await
            .context(format!("Failed to download '{storage_path}'"))?;

        let loader = DatasetLoader::new(&self.config);
        let loaded =
            tokio::task::spawn_blocking(move || loader.load(bytes, file_type)).await??;
        self.checkpoint(job, version_id, JobStage::Loaded, "Dataset loaded")
            .await?;

        let profiler = self.profiler.clone();
        let profile = tokio::task::spawn_blocking(move || profiler.profile(&loaded)).await??;
        self.checkpoint(job, version_id, JobStage::Profiled, "Profile computed")
            .await?;

        let row_count = profile.stats.row_count;
        let column_count = profile.stats.column_count;

        self.stores
            .profiles
            .upsert(ProfileRecord::from_profile(version_id, profile))
            .await
            .context("Failed to store profile")?;
        self.stores
            .versions
            .mark_ready(version_id, row_count, column_count)
            .await?;

        Ok((row_count, column_count))
    }

    async fn checkpoint(
        &self,
        job: &Job,
        version_id: &str,
        stage: JobStage,
        message: &str,
    ) -> Result<()> {
        if let Some(progress) = stage.progress() {
            self.stores.jobs.update_progress(&job.id, progress).await?;
        }
        self.report_progress(JobProgress::new(
            &job.id,
            Some(version_id.to_string()),
            stage,
            message,
        ));
        Ok(())
    }

    /// Mark the job failed and, when known, the version errored.
    ///
    /// Store failures here are logged only; the sweep must go on.
    async fn record_failure(&self, job: &Job, version_id: Option<&str>, err: &ProfilerError) {
        let message = err.to_string();
        let progress = self
            .stores
            .jobs
            .get(&job.id)
            .await
            .ok()
            .flatten()
            .map(|j| j.progress)
            .unwrap_or(job.progress);

        if let Err(e) = self.stores.jobs.fail(&job.id, &message).await {
            warn!(job_id = %job.id, "Could not mark job failed: {}", e);
        }
        if let Some(version_id) = version_id
            && let Err(e) = self.stores.versions.mark_error(version_id, &message).await
        {
            warn!(job_id = %job.id, version_id, "Could not mark version errored: {}", e);
        }

        self.report_progress(JobProgress::failed(
            &job.id,
            version_id.map(str::to_string),
            progress,
            message,
        ));
    }
}
