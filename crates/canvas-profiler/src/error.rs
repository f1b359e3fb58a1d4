//! Custom error types for the profiling engine and job worker.
//!
//! This module provides the error hierarchy using `thiserror`. Errors are
//! serializable so a job's failure can be stored or returned to a caller as a
//! `{code, message}` pair.
//!
//! Non-fatal degradations (a histogram that could not be built, a correlation
//! matrix that came out non-finite) are *not* errors: they are recorded inside
//! the profile as [`Computation::Degraded`](crate::types::Computation).

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

/// The main error type for profiling and job processing.
#[derive(Error, Debug)]
pub enum ProfilerError {
    /// The poller was asked to stop.
    #[error("Profiling cancelled")]
    Cancelled,

    /// The file type could not be resolved to a supported reader.
    #[error("Unsupported file type: {0}")]
    UnsupportedFileType(String),

    /// A dataset version has no storage path to download from.
    #[error("Dataset version '{0}' has no storage path")]
    MissingStoragePath(String),

    /// The dataset version referenced by a job does not exist.
    #[error("Dataset version '{0}' not found")]
    DatasetVersionNotFound(String),

    /// The job record does not exist.
    #[error("Job '{0}' not found")]
    JobNotFound(String),

    /// The job payload lacks a required field.
    #[error("Job '{job_id}' payload is missing field '{field}'")]
    MissingJobPayloadField { job_id: String, field: String },

    /// Catch-all for failures while running a job.
    #[error("Job processing failed: {0}")]
    JobProcessingFailed(String),

    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Object store or record store failure.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Spreadsheet could not be opened or parsed.
    #[error("Excel error: {0}")]
    Excel(String),

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP request error (only with the "http-store" feature).
    #[cfg(feature = "http-store")]
    #[error("HTTP request error: {0}")]
    HttpRequest(#[from] reqwest::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ProfilerError>,
    },
}

impl ProfilerError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ProfilerError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Stable error code, persisted alongside job failures.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Cancelled => "CANCELLED",
            Self::UnsupportedFileType(_) => "UNSUPPORTED_FILE_TYPE",
            Self::MissingStoragePath(_) => "MISSING_STORAGE_PATH",
            Self::DatasetVersionNotFound(_) => "DATASET_VERSION_NOT_FOUND",
            Self::JobNotFound(_) => "JOB_NOT_FOUND",
            Self::MissingJobPayloadField { .. } => "MISSING_JOB_PAYLOAD_FIELD",
            Self::JobProcessingFailed(_) => "JOB_PROCESSING_FAILED",
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::Storage(_) => "STORAGE_ERROR",
            Self::Excel(_) => "EXCEL_ERROR",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            #[cfg(feature = "http-store")]
            Self::HttpRequest(_) => "HTTP_REQUEST_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }

    /// Check if this error represents a cancellation.
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::WithContext { source, .. } => source.is_cancelled(),
            _ => false,
        }
    }
}

/// Errors are serialized as a struct with `code` and `message` fields.
impl Serialize for ProfilerError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("ProfilerError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

impl From<calamine::Error> for ProfilerError {
    fn from(err: calamine::Error) -> Self {
        ProfilerError::Excel(err.to_string())
    }
}

impl From<tokio::task::JoinError> for ProfilerError {
    fn from(err: tokio::task::JoinError) -> Self {
        ProfilerError::JobProcessingFailed(format!("worker task failed: {err}"))
    }
}

/// Result type alias for profiler operations.
pub type Result<T> = std::result::Result<T, ProfilerError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| ProfilerError::Polars(e).with_context(context))
    }
}
