//! In-memory store implementations for tests, demos and embedding.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;

use crate::error::{ProfilerError, Result};
use crate::types::{
    DatasetVersion, Job, JobStatus, JobType, ProfileRecord, VersionStatus,
};

use super::{JobStore, ObjectStore, ProfileStore, VersionStore};

/// Objects keyed by `(bucket, path)`.
#[derive(Clone, Default)]
pub struct InMemoryObjectStore {
    objects: Arc<RwLock<HashMap<(String, String), Vec<u8>>>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, bucket: &str, path: &str, bytes: impl Into<Vec<u8>>) {
        self.objects
            .write()
            .insert((bucket.to_string(), path.to_string()), bytes.into());
    }

    pub fn len(&self) -> usize {
        self.objects.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.read().is_empty()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn download(&self, bucket: &str, path: &str) -> Result<Vec<u8>> {
        self.objects
            .read()
            .get(&(bucket.to_string(), path.to_string()))
            .cloned()
            .ok_or_else(|| ProfilerError::Storage(format!("object not found: {bucket}/{path}")))
    }

    async fn upload(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<()> {
        self.put(bucket, path, bytes);
        Ok(())
    }
}

#[derive(Default)]
struct JobTable {
    jobs: HashMap<String, Job>,
    /// Every progress value written per job, in order.
    progress_history: HashMap<String, Vec<u8>>,
}

/// Job records with a recorded progress history per job.
#[derive(Clone, Default)]
pub struct InMemoryJobStore {
    table: Arc<RwLock<JobTable>>,
}

impl InMemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, job: Job) {
        self.table.write().jobs.insert(job.id.clone(), job);
    }

    /// Progress values written for `job_id`, starting with the claim.
    pub fn progress_history(&self, job_id: &str) -> Vec<u8> {
        self.table
            .read()
            .progress_history
            .get(job_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn snapshot(&self, job_id: &str) -> Option<Job> {
        self.table.read().jobs.get(job_id).cloned()
    }

    /// True when no job is queued or running.
    pub fn all_terminal(&self) -> bool {
        self.table
            .read()
            .jobs
            .values()
            .all(|j| j.status.is_terminal())
    }

    fn modify<F>(&self, job_id: &str, f: F) -> Result<()>
    where
        F: FnOnce(&mut Job),
    {
        let mut table = self.table.write();
        let job = table
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| ProfilerError::JobNotFound(job_id.to_string()))?;
        f(job);
        let progress = job.progress;
        table
            .progress_history
            .entry(job_id.to_string())
            .or_default()
            .push(progress);
        Ok(())
    }
}

#[async_trait]
impl JobStore for InMemoryJobStore {
    async fn list_queued(&self, job_type: JobType, limit: usize) -> Result<Vec<Job>> {
        let table = self.table.read();
        let mut queued: Vec<Job> = table
            .jobs
            .values()
            .filter(|j| j.status == JobStatus::Queued && j.job_type == job_type)
            .cloned()
            .collect();
        queued.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        queued.truncate(limit);
        Ok(queued)
    }

    async fn get(&self, job_id: &str) -> Result<Option<Job>> {
        Ok(self.snapshot(job_id))
    }

    async fn claim(&self, job_id: &str, progress: u8) -> Result<Option<Job>> {
        let mut table = self.table.write();
        let job = table
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| ProfilerError::JobNotFound(job_id.to_string()))?;
        if job.status != JobStatus::Queued {
            return Ok(None);
        }

        job.status = JobStatus::Running;
        job.progress = progress;
        job.started_at = Some(Utc::now());
        let claimed = job.clone();
        table
            .progress_history
            .entry(job_id.to_string())
            .or_default()
            .push(progress);
        Ok(Some(claimed))
    }

    async fn update_progress(&self, job_id: &str, progress: u8) -> Result<()> {
        self.modify(job_id, |job| job.progress = job.progress.max(progress))
    }

    async fn complete(&self, job_id: &str) -> Result<()> {
        self.modify(job_id, |job| {
            job.status = JobStatus::Completed;
            job.progress = 100;
            job.completed_at = Some(Utc::now());
        })
    }

    async fn fail(&self, job_id: &str, error_message: &str) -> Result<()> {
        let mut table = self.table.write();
        let job = table
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| ProfilerError::JobNotFound(job_id.to_string()))?;
        job.status = JobStatus::Failed;
        job.error_message = Some(error_message.to_string());
        job.completed_at = Some(Utc::now());
        Ok(())
    }
}

/// Dataset version records.
#[derive(Clone, Default)]
pub struct InMemoryVersionStore {
    versions: Arc<RwLock<HashMap<String, DatasetVersion>>>,
}

impl InMemoryVersionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, version: DatasetVersion) {
        self.versions.write().insert(version.id.clone(), version);
    }

    pub fn snapshot(&self, version_id: &str) -> Option<DatasetVersion> {
        self.versions.read().get(version_id).cloned()
    }

    fn modify<F>(&self, version_id: &str, f: F) -> Result<()>
    where
        F: FnOnce(&mut DatasetVersion),
    {
        let mut versions = self.versions.write();
        let version = versions
            .get_mut(version_id)
            .ok_or_else(|| ProfilerError::DatasetVersionNotFound(version_id.to_string()))?;
        f(version);
        Ok(())
    }
}

#[async_trait]
impl VersionStore for InMemoryVersionStore {
    async fn get(&self, version_id: &str) -> Result<Option<DatasetVersion>> {
        Ok(self.snapshot(version_id))
    }

    async fn mark_profiling(&self, version_id: &str) -> Result<()> {
        self.modify(version_id, |v| v.status = VersionStatus::Profiling)
    }

    async fn mark_ready(
        &self,
        version_id: &str,
        row_count: usize,
        column_count: usize,
    ) -> Result<()> {
        self.modify(version_id, |v| {
            v.row_count = Some(row_count);
            v.column_count = Some(column_count);
            v.status = VersionStatus::Ready;
            v.error_message = None;
        })
    }

    async fn mark_error(&self, version_id: &str, error_message: &str) -> Result<()> {
        self.modify(version_id, |v| {
            v.status = VersionStatus::Error;
            v.error_message = Some(error_message.to_string());
        })
    }
}

/// Profile records keyed by version id.
#[derive(Clone, Default)]
pub struct InMemoryProfileStore {
    profiles: Arc<RwLock<HashMap<String, ProfileRecord>>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.profiles.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.read().is_empty()
    }

    pub fn snapshot(&self, version_id: &str) -> Option<ProfileRecord> {
        self.profiles.read().get(version_id).cloned()
    }

    pub fn all(&self) -> Vec<ProfileRecord> {
        self.profiles.read().values().cloned().collect()
    }
}

#[async_trait]
impl ProfileStore for InMemoryProfileStore {
    async fn upsert(&self, record: ProfileRecord) -> Result<()> {
        self.profiles
            .write()
            .insert(record.version_id.clone(), record);
        Ok(())
    }

    async fn get(&self, version_id: &str) -> Result<Option<ProfileRecord>> {
        Ok(self.snapshot(version_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[tokio::test]
    async fn test_object_round_trip() {
        let store = InMemoryObjectStore::new();
        store
            .upload("datasets", "a/b.csv", b"x\n1\n".to_vec(), "text/csv")
            .await
            .unwrap();
        assert_eq!(store.download("datasets", "a/b.csv").await.unwrap(), b"x\n1\n");

        let err = store.download("datasets", "missing.csv").await.unwrap_err();
        assert_eq!(err.error_code(), "STORAGE_ERROR");
    }

    #[tokio::test]
    async fn test_list_queued_oldest_first_with_limit() {
        let store = InMemoryJobStore::new();
        let now = Utc::now();
        for (id, age) in [("new", 1), ("old", 30), ("mid", 10)] {
            let mut job = Job::queued_profile(id, "v");
            job.created_at = now - Duration::seconds(age);
            store.insert(job);
        }
        let mut done = Job::queued_profile("done", "v");
        done.status = JobStatus::Completed;
        done.created_at = now - Duration::seconds(100);
        store.insert(done);

        let queued = store.list_queued(JobType::Profile, 2).await.unwrap();
        let ids: Vec<_> = queued.iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids, vec!["old", "mid"]);
    }

    #[tokio::test]
    async fn test_claim_is_compare_and_swap() {
        let store = InMemoryJobStore::new();
        store.insert(Job::queued_profile("j1", "v1"));

        let first = store.claim("j1", 10).await.unwrap().unwrap();
        assert_eq!(first.status, JobStatus::Running);
        assert_eq!(first.progress, 10);
        assert!(first.started_at.is_some());

        assert!(store.claim("j1", 10).await.unwrap().is_none());
        assert!(matches!(
            store.claim("nope", 10).await,
            Err(ProfilerError::JobNotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_progress_history_and_completion() {
        let store = InMemoryJobStore::new();
        store.insert(Job::queued_profile("j1", "v1"));
        store.claim("j1", 10).await.unwrap();
        store.update_progress("j1", 50).await.unwrap();
        store.update_progress("j1", 80).await.unwrap();
        store.complete("j1").await.unwrap();

        assert_eq!(store.progress_history("j1"), vec![10, 50, 80, 100]);
        let job = store.snapshot("j1").unwrap();
        assert_eq!(job.status, JobStatus::Completed);
        assert!(job.completed_at.is_some());
        assert!(store.all_terminal());
    }

    #[tokio::test]
    async fn test_progress_never_decreases() {
        let store = InMemoryJobStore::new();
        store.insert(Job::queued_profile("j1", "v1"));
        store.claim("j1", 10).await.unwrap();
        store.update_progress("j1", 50).await.unwrap();
        store.update_progress("j1", 20).await.unwrap();
        assert_eq!(store.snapshot("j1").unwrap().progress, 50);
    }

    #[tokio::test]
    async fn test_fail_records_message() {
        let store = InMemoryJobStore::new();
        store.insert(Job::queued_profile("j1", "v1"));
        store.claim("j1", 10).await.unwrap();
        store.fail("j1", "boom").await.unwrap();

        let job = store.snapshot("j1").unwrap();
        assert_eq!(job.status, JobStatus::Failed);
        assert_eq!(job.error_message.as_deref(), Some("boom"));
        assert_eq!(store.progress_history("j1"), vec![10]);
    }

    #[tokio::test]
    async fn test_version_lifecycle() {
        let store = InMemoryVersionStore::new();
        store.insert(DatasetVersion::uploaded("v1", "d1", "d1/v1.csv", None));

        store.mark_profiling("v1").await.unwrap();
        assert_eq!(store.snapshot("v1").unwrap().status, VersionStatus::Profiling);

        store.mark_error("v1", "bad file").await.unwrap();
        store.mark_ready("v1", 10, 3).await.unwrap();
        let version = store.snapshot("v1").unwrap();
        assert_eq!(version.status, VersionStatus::Ready);
        assert_eq!(version.row_count, Some(10));
        assert_eq!(version.column_count, Some(3));
        assert!(version.error_message.is_none());

        assert!(matches!(
            store.mark_profiling("missing").await,
            Err(ProfilerError::DatasetVersionNotFound(_))
        ));
    }
}
