//! Storage boundaries used by the job pipeline.
//!
//! The worker talks to four collaborators: an object store holding the raw
//! dataset files, and record stores for jobs, dataset versions and profiles.
//! Each is an `async_trait` so backends can be swapped; [`StoreContext`]
//! bundles one of each and is passed explicitly to whoever needs them.
//!
//! # Example
//!
//! ```rust,ignore
//! use canvas_profiler::storage::InMemoryStores;
//!
//! let stores = InMemoryStores::new();
//! stores.objects.put("datasets", "d1/v1.csv", bytes);
//! let context = stores.context();
//! ```

mod local;
mod memory;

#[cfg(feature = "http-store")]
mod http;

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::Result;
use crate::types::{DatasetVersion, Job, JobType, ProfileRecord};

#[cfg(feature = "http-store")]
pub use http::HttpObjectStore;
pub use local::LocalObjectStore;
pub use memory::{InMemoryJobStore, InMemoryObjectStore, InMemoryProfileStore, InMemoryVersionStore};

/// Blob storage holding uploaded dataset files.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Fetch the object at `bucket/path`.
    async fn download(&self, bucket: &str, path: &str) -> Result<Vec<u8>>;

    /// Store `bytes` at `bucket/path`, replacing any existing object.
    async fn upload(&self, bucket: &str, path: &str, bytes: Vec<u8>, content_type: &str)
    -> Result<()>;
}

/// Job records. Only the poller mutates them.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Up to `limit` queued jobs of `job_type`, oldest first.
    async fn list_queued(&self, job_type: JobType, limit: usize) -> Result<Vec<Job>>;

    async fn get(&self, job_id: &str) -> Result<Option<Job>>;

    /// Atomically move a job from `queued` to `running` with the given
    /// progress and a start timestamp.
    ///
    /// Returns `None` when the job is no longer queued (another worker won).
    async fn claim(&self, job_id: &str, progress: u8) -> Result<Option<Job>>;

    async fn update_progress(&self, job_id: &str, progress: u8) -> Result<()>;

    /// Mark the job `completed` with progress 100.
    async fn complete(&self, job_id: &str) -> Result<()>;

    /// Mark the job `failed` with the given message.
    async fn fail(&self, job_id: &str, error_message: &str) -> Result<()>;
}

/// Dataset version records.
#[async_trait]
pub trait VersionStore: Send + Sync {
    async fn get(&self, version_id: &str) -> Result<Option<DatasetVersion>>;

    async fn mark_profiling(&self, version_id: &str) -> Result<()>;

    /// Record the profiled shape, set `ready` and clear any previous error.
    async fn mark_ready(&self, version_id: &str, row_count: usize, column_count: usize)
    -> Result<()>;

    async fn mark_error(&self, version_id: &str, error_message: &str) -> Result<()>;
}

/// Profile records, one per dataset version.
#[async_trait]
pub trait ProfileStore: Send + Sync {
    /// Insert or replace the profile keyed by `record.version_id`.
    async fn upsert(&self, record: ProfileRecord) -> Result<()>;

    async fn get(&self, version_id: &str) -> Result<Option<ProfileRecord>>;
}

/// The stores a worker needs, constructed once at startup.
#[derive(Clone)]
pub struct StoreContext {
    pub objects: Arc<dyn ObjectStore>,
    pub jobs: Arc<dyn JobStore>,
    pub versions: Arc<dyn VersionStore>,
    pub profiles: Arc<dyn ProfileStore>,
}

static_assertions::assert_impl_all!(StoreContext: Send, Sync);

impl StoreContext {
    pub fn new(
        objects: Arc<dyn ObjectStore>,
        jobs: Arc<dyn JobStore>,
        versions: Arc<dyn VersionStore>,
        profiles: Arc<dyn ProfileStore>,
    ) -> Self {
        Self {
            objects,
            jobs,
            versions,
            profiles,
        }
    }

    /// Replace the object store, keeping the record stores.
    pub fn with_objects(mut self, objects: Arc<dyn ObjectStore>) -> Self {
        self.objects = objects;
        self
    }
}

/// In-memory stores plus typed handles for seeding and inspection.
#[derive(Clone, Default)]
pub struct InMemoryStores {
    pub objects: InMemoryObjectStore,
    pub jobs: InMemoryJobStore,
    pub versions: InMemoryVersionStore,
    pub profiles: InMemoryProfileStore,
}

impl InMemoryStores {
    pub fn new() -> Self {
        Self::default()
    }

    /// A [`StoreContext`] sharing state with these handles.
    pub fn context(&self) -> StoreContext {
        StoreContext::new(
            Arc::new(self.objects.clone()),
            Arc::new(self.jobs.clone()),
            Arc::new(self.versions.clone()),
            Arc::new(self.profiles.clone()),
        )
    }
}
