//! Configuration types for the profiler and job worker.
//!
//! This module provides configuration options using the builder pattern, plus
//! [`ProfilerConfig::from_env`] for deployments that configure the worker
//! through environment variables.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for profiling runs and the polling worker.
///
/// Use [`ProfilerConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use canvas_profiler::config::ProfilerConfig;
///
/// let config = ProfilerConfig::builder()
///     .max_file_size_mb(100)
///     .head_sample_size(2_000)
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProfilerConfig {
    /// Row count above which statistics are computed on a seeded random sample.
    /// Default: 50000
    pub max_sample_size: usize,

    /// Number of leading rows read when a file exceeds `max_file_size_mb`.
    /// Default: 5000
    pub head_sample_size: usize,

    /// Raw byte size threshold, in megabytes, that triggers head sampling.
    /// Default: 200
    pub max_file_size_mb: u64,

    /// Seed for the statistics sample.
    /// Default: 42
    pub sample_seed: u64,

    /// Object store bucket holding uploaded datasets.
    /// Default: "datasets"
    pub datasets_bucket: String,

    /// Time between poller sweeps.
    /// Default: 5 seconds
    #[serde(with = "duration_secs")]
    pub poll_interval: Duration,

    /// Maximum number of queued jobs claimed per sweep.
    /// Default: 5
    pub jobs_per_sweep: usize,

    /// Number of entries kept in a column's top-values table.
    /// Default: 20
    pub top_values_limit: usize,

    /// Number of equal-width histogram bins for numeric columns.
    /// Default: 50
    pub histogram_bins: usize,

    /// Number of leading rows stored with the profile as sample data.
    /// Default: 10
    pub sample_rows: usize,
}

impl Default for ProfilerConfig {
    fn default() -> Self {
        Self {
            max_sample_size: 50_000,
            head_sample_size: 5_000,
            max_file_size_mb: 200,
            sample_seed: 42,
            datasets_bucket: "datasets".to_string(),
            poll_interval: Duration::from_secs(5),
            jobs_per_sweep: 5,
            top_values_limit: 20,
            histogram_bins: 50,
            sample_rows: 10,
        }
    }
}

impl ProfilerConfig {
    /// Create a new configuration builder.
    pub fn builder() -> ProfilerConfigBuilder {
        ProfilerConfigBuilder::default()
    }

    /// Build a configuration from environment variables, falling back to the
    /// defaults for anything unset.
    ///
    /// Recognised variables: `MAX_SAMPLE_SIZE`, `HEAD_SAMPLE_SIZE`,
    /// `MAX_FILE_SIZE_MB`, `SAMPLE_SEED`, `SUPABASE_DATASETS_BUCKET`,
    /// `POLL_INTERVAL_SECS`, `JOBS_PER_SWEEP`.
    pub fn from_env() -> Result<Self, ConfigValidationError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigValidationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        fn parse<T: std::str::FromStr>(
            key: &str,
            raw: Option<String>,
        ) -> Result<Option<T>, ConfigValidationError> {
            match raw {
                None => Ok(None),
                Some(value) => value.trim().parse::<T>().map(Some).map_err(|_| {
                    ConfigValidationError::InvalidEnvValue {
                        key: key.to_string(),
                        value,
                    }
                }),
            }
        }

        let mut builder = Self::builder();
        if let Some(v) = parse("MAX_SAMPLE_SIZE", lookup("MAX_SAMPLE_SIZE"))? {
            builder = builder.max_sample_size(v);
        }
        if let Some(v) = parse("HEAD_SAMPLE_SIZE", lookup("HEAD_SAMPLE_SIZE"))? {
            builder = builder.head_sample_size(v);
        }
        if let Some(v) = parse("MAX_FILE_SIZE_MB", lookup("MAX_FILE_SIZE_MB"))? {
            builder = builder.max_file_size_mb(v);
        }
        if let Some(v) = parse("SAMPLE_SEED", lookup("SAMPLE_SEED"))? {
            builder = builder.sample_seed(v);
        }
        if let Some(bucket) = lookup("SUPABASE_DATASETS_BUCKET") {
            builder = builder.datasets_bucket(bucket);
        }
        if let Some(v) = parse::<u64>("POLL_INTERVAL_SECS", lookup("POLL_INTERVAL_SECS"))? {
            builder = builder.poll_interval(Duration::from_secs(v));
        }
        if let Some(v) = parse("JOBS_PER_SWEEP", lookup("JOBS_PER_SWEEP"))? {
            builder = builder.jobs_per_sweep(v);
        }
        builder.build()
    }

    /// Size threshold in bytes above which a file is head-sampled.
    pub fn max_file_size_bytes(&self) -> u64 {
        self.max_file_size_mb.saturating_mul(1024 * 1024)
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let positive = [
            ("max_sample_size", self.max_sample_size),
            ("head_sample_size", self.head_sample_size),
            ("jobs_per_sweep", self.jobs_per_sweep),
            ("top_values_limit", self.top_values_limit),
            ("histogram_bins", self.histogram_bins),
        ];
        for (field, value) in positive {
            if value == 0 {
                return Err(ConfigValidationError::MustBePositive(field.to_string()));
            }
        }

        if self.max_file_size_mb == 0 {
            return Err(ConfigValidationError::MustBePositive(
                "max_file_size_mb".to_string(),
            ));
        }

        if self.datasets_bucket.trim().is_empty() {
            return Err(ConfigValidationError::EmptyBucket);
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid value for '{0}' (must be greater than zero)")]
    MustBePositive(String),

    #[error("Datasets bucket name must not be empty")]
    EmptyBucket,

    #[error("Invalid value '{value}' for environment variable {key}")]
    InvalidEnvValue { key: String, value: String },
}

impl From<ConfigValidationError> for crate::error::ProfilerError {
    fn from(err: ConfigValidationError) -> Self {
        crate::error::ProfilerError::InvalidConfig(err.to_string())
    }
}

/// Builder for [`ProfilerConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct ProfilerConfigBuilder {
    max_sample_size: Option<usize>,
    head_sample_size: Option<usize>,
    max_file_size_mb: Option<u64>,
    sample_seed: Option<u64>,
    datasets_bucket: Option<String>,
    poll_interval: Option<Duration>,
    jobs_per_sweep: Option<usize>,
    top_values_limit: Option<usize>,
    histogram_bins: Option<usize>,
    sample_rows: Option<usize>,
}

impl ProfilerConfigBuilder {
    /// Set the row count above which statistics use a random sample.
    pub fn max_sample_size(mut self, rows: usize) -> Self {
        self.max_sample_size = Some(rows);
        self
    }

    /// Set the number of rows read from files over the size threshold.
    pub fn head_sample_size(mut self, rows: usize) -> Self {
        self.head_sample_size = Some(rows);
        self
    }

    /// Set the size threshold (in megabytes) that triggers head sampling.
    pub fn max_file_size_mb(mut self, megabytes: u64) -> Self {
        self.max_file_size_mb = Some(megabytes);
        self
    }

    /// Set the seed of the statistics sample.
    pub fn sample_seed(mut self, seed: u64) -> Self {
        self.sample_seed = Some(seed);
        self
    }

    /// Set the bucket that uploaded datasets live in.
    pub fn datasets_bucket(mut self, bucket: impl Into<String>) -> Self {
        self.datasets_bucket = Some(bucket.into());
        self
    }

    /// Set the delay between poller sweeps.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = Some(interval);
        self
    }

    /// Set how many queued jobs one sweep may claim.
    pub fn jobs_per_sweep(mut self, jobs: usize) -> Self {
        self.jobs_per_sweep = Some(jobs);
        self
    }

    /// Set the size of the top-values table.
    pub fn top_values_limit(mut self, limit: usize) -> Self {
        self.top_values_limit = Some(limit);
        self
    }

    /// Set the number of histogram bins.
    pub fn histogram_bins(mut self, bins: usize) -> Self {
        self.histogram_bins = Some(bins);
        self
    }

    /// Set how many rows are stored as sample data.
    pub fn sample_rows(mut self, rows: usize) -> Self {
        self.sample_rows = Some(rows);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `ProfilerConfig` or an error if validation fails.
    pub fn build(self) -> Result<ProfilerConfig, ConfigValidationError> {
        let defaults = ProfilerConfig::default();
        let config = ProfilerConfig {
            max_sample_size: self.max_sample_size.unwrap_or(defaults.max_sample_size),
            head_sample_size: self.head_sample_size.unwrap_or(defaults.head_sample_size),
            max_file_size_mb: self.max_file_size_mb.unwrap_or(defaults.max_file_size_mb),
            sample_seed: self.sample_seed.unwrap_or(defaults.sample_seed),
            datasets_bucket: self.datasets_bucket.unwrap_or(defaults.datasets_bucket),
            poll_interval: self.poll_interval.unwrap_or(defaults.poll_interval),
            jobs_per_sweep: self.jobs_per_sweep.unwrap_or(defaults.jobs_per_sweep),
            top_values_limit: self.top_values_limit.unwrap_or(defaults.top_values_limit),
            histogram_bins: self.histogram_bins.unwrap_or(defaults.histogram_bins),
            sample_rows: self.sample_rows.unwrap_or(defaults.sample_rows),
        };

        config.validate()?;
        Ok(config)
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(value.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        if !secs.is_finite() || secs < 0.0 {
            return Err(serde::de::Error::custom("poll_interval must be a non-negative number"));
        }
        Ok(Duration::from_secs_f64(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config() {
        let config = ProfilerConfig::default();
        assert_eq!(config.max_sample_size, 50_000);
        assert_eq!(config.head_sample_size, 5_000);
        assert_eq!(config.max_file_size_mb, 200);
        assert_eq!(config.sample_seed, 42);
        assert_eq!(config.poll_interval, Duration::from_secs(5));
        assert_eq!(config.jobs_per_sweep, 5);
        assert_eq!(config.histogram_bins, 50);
        assert_eq!(config.top_values_limit, 20);
    }

    #[test]
    fn test_builder_defaults_match_default() {
        let config = ProfilerConfig::builder().build().unwrap();
        assert_eq!(config, ProfilerConfig::default());
    }

    #[test]
    fn test_builder_custom_values() {
        let config = ProfilerConfig::builder()
            .max_sample_size(1_000)
            .head_sample_size(10)
            .max_file_size_mb(1)
            .sample_seed(7)
            .poll_interval(Duration::from_millis(250))
            .build()
            .unwrap();

        assert_eq!(config.max_sample_size, 1_000);
        assert_eq!(config.head_sample_size, 10);
        assert_eq!(config.max_file_size_bytes(), 1024 * 1024);
        assert_eq!(config.sample_seed, 7);
        assert_eq!(config.poll_interval, Duration::from_millis(250));
    }

    #[test]
    fn test_validation_rejects_zero_bins() {
        let result = ProfilerConfig::builder().histogram_bins(0).build();
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::MustBePositive(field) if field == "histogram_bins"
        ));
    }

    #[test]
    fn test_validation_rejects_empty_bucket() {
        let result = ProfilerConfig::builder().datasets_bucket("  ").build();
        assert!(matches!(result.unwrap_err(), ConfigValidationError::EmptyBucket));
    }

    #[test]
    fn test_from_lookup_reads_overrides() {
        let vars: HashMap<&str, &str> = [
            ("MAX_SAMPLE_SIZE", "1000"),
            ("HEAD_SAMPLE_SIZE", "50"),
            ("SUPABASE_DATASETS_BUCKET", "uploads"),
            ("POLL_INTERVAL_SECS", "2"),
        ]
        .into_iter()
        .collect();

        let config =
            ProfilerConfig::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();

        assert_eq!(config.max_sample_size, 1000);
        assert_eq!(config.head_sample_size, 50);
        assert_eq!(config.datasets_bucket, "uploads");
        assert_eq!(config.poll_interval, Duration::from_secs(2));
        assert_eq!(config.max_file_size_mb, 200);
    }

    #[test]
    fn test_from_lookup_rejects_garbage() {
        let result = ProfilerConfig::from_lookup(|key| {
            (key == "MAX_FILE_SIZE_MB").then(|| "lots".to_string())
        });
        assert!(matches!(
            result.unwrap_err(),
            ConfigValidationError::InvalidEnvValue { key, .. } if key == "MAX_FILE_SIZE_MB"
        ));
    }

    #[test]
    fn test_config_from_json() {
        let json = r#"{
            "max_sample_size": 2000,
            "head_sample_size": 100,
            "poll_interval": 0.5
        }"#;

        let config: ProfilerConfig = serde_json::from_str(json).expect("Should deserialize");

        assert_eq!(config.max_sample_size, 2000);
        assert_eq!(config.head_sample_size, 100);
        assert_eq!(config.poll_interval, Duration::from_millis(500));
        assert_eq!(config.datasets_bucket, "datasets");
    }
}
