//! Dataset Profiling Engine and Job Worker
//!
//! Computes reproducible statistical profiles of tabular files and drives
//! that computation through a polling job pipeline, built with Rust and Polars.
//!
//! # Overview
//!
//! - **Loading**: CSV, TSV, JSON/NDJSON, Parquet and Excel, with head sampling
//!   for oversized files
//! - **Profiling**: semantic type inference, per-column statistics, top-value
//!   tables, Pearson correlations and missing-value analysis
//! - **Warnings**: data-quality findings derived from the statistics
//! - **Charts**: Vega-Lite shaped chart descriptors for exploratory views
//! - **Job Pipeline**: claims queued jobs, persists progress and results,
//!   isolates per-job failures, stops cooperatively on cancellation
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use canvas_profiler::{DataProfiler, FileType, ProfilerConfig};
//!
//! let bytes = std::fs::read("data.csv")?;
//! let profile = DataProfiler::new(ProfilerConfig::default())
//!     .profile_bytes(bytes, FileType::Csv)?;
//!
//! println!("{} rows, {} warnings", profile.stats.row_count, profile.warnings.len());
//! ```
//!
//! # Running the Worker
//!
//! ```rust,ignore
//! use canvas_profiler::{CancellationToken, JobProcessor, ProfilerConfig};
//! use canvas_profiler::storage::InMemoryStores;
//!
//! let stores = InMemoryStores::new();
//! let token = CancellationToken::new();
//!
//! let processor = JobProcessor::builder()
//!     .stores(stores.context())
//!     .config(ProfilerConfig::from_env()?)
//!     .cancellation_token(token.clone())
//!     .on_progress(|update| {
//!         println!("[{}] {}%", update.job_id, update.progress);
//!     })
//!     .build()?;
//!
//! processor.run_poller().await?;
//! ```

pub mod charts;
pub mod config;
pub mod error;
pub mod loader;
pub mod pipeline;
pub mod profiler;
pub mod quality;
pub mod storage;
pub mod types;
pub mod utils;

// Re-exports for convenient access
pub use charts::ChartGenerator;
pub use config::{ConfigValidationError, ProfilerConfig, ProfilerConfigBuilder};
pub use error::{ProfilerError, Result as ProfilerResult, ResultExt};
pub use loader::{DatasetLoader, FileType, LoadedDataset};
pub use pipeline::{
    CancellationToken, ClosureProgressReporter, JobOutcome, JobProcessor, JobProcessorBuilder,
    JobProgress, JobStage, ProgressReporter, SweepSummary,
};
pub use profiler::DataProfiler;
pub use quality::DataQualityAnalyzer;
pub use storage::{InMemoryStores, StoreContext};
pub use types::{
    ChartSpec, ColumnProfile, ColumnStats, CorrelationMatrix, DatasetProfile, DatasetVersion, Job,
    JobStatus, MissingReport, ProfileRecord, SemanticType, Severity, VersionStatus, Warning,
    WarningCode,
};
