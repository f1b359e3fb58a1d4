//! Data quality warnings.
//!
//! Rules run over the finished column profiles and correlation matrix and
//! produce [`Warning`](crate::types::Warning)s; they never fail.

mod analyzer;

pub use analyzer::DataQualityAnalyzer;
