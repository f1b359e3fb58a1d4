//! Job pipeline module.
//!
//! Contains the job processor, the single-job executor, the polling loop and
//! progress reporting.

mod builder;
mod executor;
mod poller;
pub mod progress;

pub use builder::{JobProcessor, JobProcessorBuilder};
pub use executor::{JobOutcome, SweepSummary};
pub use progress::{
    CancellationToken, ClosureProgressReporter, JobProgress, JobStage, ProgressReporter,
};
