use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Column-level profile types
// ============================================================================

/// Semantic type assigned to a column by type inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SemanticType {
    Numeric,
    Categorical,
    Boolean,
    Datetime,
    Id,
    Text,
}

impl SemanticType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Numeric => "numeric",
            Self::Categorical => "categorical",
            Self::Boolean => "boolean",
            Self::Datetime => "datetime",
            Self::Id => "id",
            Self::Text => "text",
        }
    }

    /// Types whose profile carries a top-values table.
    pub fn has_top_values(&self) -> bool {
        matches!(self, Self::Categorical | Self::Id | Self::Text)
    }
}

impl std::fmt::Display for SemanticType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

/// Outcome of a best-effort computation.
///
/// A degraded computation never fails the profile; it is recorded with the
/// reason and consumers treat the value as absent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Computation<T> {
    Computed { value: T },
    Degraded { reason: String },
}

impl<T> Computation<T> {
    pub fn degraded(reason: impl Into<String>) -> Self {
        Self::Degraded {
            reason: reason.into(),
        }
    }

    pub fn value(&self) -> Option<&T> {
        match self {
            Self::Computed { value } => Some(value),
            Self::Degraded { .. } => None,
        }
    }

    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Degraded { .. })
    }
}

/// Equal-width histogram: `bins` holds the edges, one more than `counts`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Histogram {
    pub bins: Vec<f64>,
    pub counts: Vec<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericColumnStats {
    pub mean: f64,
    /// Sample standard deviation (ddof = 1); absent for a single value.
    pub std: Option<f64>,
    pub min: f64,
    pub max: f64,
    pub median: f64,
    pub p1: f64,
    pub p5: f64,
    pub q1: f64,
    pub q3: f64,
    pub p95: f64,
    pub p99: f64,
    pub histogram: Computation<Histogram>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopValue {
    pub value: String,
    pub count: u64,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CategoricalColumnStats {
    pub top_values: Vec<TopValue>,
}

/// Type-specific payload of a column profile. Exactly one variant applies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ColumnStats {
    Numeric(NumericColumnStats),
    Categorical(CategoricalColumnStats),
    /// Base counts only (boolean, datetime, or a numeric column with no values).
    Basic,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnProfile {
    pub name: String,
    pub dtype: String,
    pub inferred_type: SemanticType,
    pub count: usize,
    pub missing_count: usize,
    pub missing_percentage: f64,
    pub unique_count: usize,
    pub unique_percentage: f64,
    pub stats: ColumnStats,
}

impl ColumnProfile {
    pub fn numeric_stats(&self) -> Option<&NumericColumnStats> {
        match &self.stats {
            ColumnStats::Numeric(stats) => Some(stats),
            _ => None,
        }
    }

    pub fn top_values(&self) -> Option<&[TopValue]> {
        match &self.stats {
            ColumnStats::Categorical(stats) => Some(&stats.top_values),
            _ => None,
        }
    }

    pub fn histogram(&self) -> Option<&Histogram> {
        self.numeric_stats().and_then(|s| s.histogram.value())
    }
}

// ============================================================================
// Dataset-level profile types
// ============================================================================

/// Pearson correlation over numeric columns.
///
/// `pearson` is empty when fewer than two numeric columns exist or when the
/// computation degraded. Cells involving a zero-variance column are `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrelationMatrix {
    pub columns: Vec<String>,
    pub pearson: Vec<Vec<Option<f64>>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degraded: Option<String>,
}

impl CorrelationMatrix {
    pub fn empty(columns: Vec<String>) -> Self {
        Self {
            columns,
            pearson: Vec::new(),
            degraded: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pearson.is_empty()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.pearson.get(row).and_then(|r| r.get(col)).copied().flatten()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingColumn {
    pub column: String,
    pub count: usize,
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MissingReport {
    pub total_missing: usize,
    pub total_missing_percentage: f64,
    pub columns_with_missing: Vec<MissingColumn>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarningCode {
    HighMissing,
    ConstantColumn,
    HighCardinality,
    HighCorrelation,
    Sampling,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Med,
    High,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Med => "med",
            Self::High => "high",
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Warning {
    pub code: WarningCode,
    pub severity: Severity,
    pub message: String,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartSection {
    Summary,
    Distributions,
    Outliers,
    Categoricals,
    Correlations,
}

/// Inline data of a chart descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartData {
    pub values: Vec<serde_json::Value>,
}

/// Declarative, Vega-Lite shaped description of one chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartDescriptor {
    #[serde(rename = "$schema")]
    pub schema: String,
    pub data: ChartData,
    pub mark: serde_json::Value,
    pub encoding: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    pub key: String,
    pub title: String,
    pub section: ChartSection,
    pub spec: ChartDescriptor,
}

/// Schema entry stored alongside the profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchemaColumn {
    pub name: String,
    pub inferred_type: SemanticType,
    pub null_frac: f64,
    pub unique_frac: f64,
    pub sample_values: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetStats {
    /// Rows in the loaded table (after head sampling, before the statistics sample).
    pub row_count: usize,
    pub column_count: usize,
    pub memory_est_mb: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileMeta {
    pub profiled_at: DateTime<Utc>,
    pub processing_time_ms: u64,
    /// Rows the statistics were computed on.
    pub sample_size: usize,
    /// Whether the loader read only the head of an oversized file.
    pub sampled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sampling_note: Option<String>,
    /// Whether statistics used a seeded random sample of the loaded table.
    pub statistics_sampled: bool,
}

/// Complete profile of one dataset version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetProfile {
    pub schema: Vec<SchemaColumn>,
    pub stats: DatasetStats,
    pub columns: Vec<ColumnProfile>,
    pub correlations: CorrelationMatrix,
    pub missing: MissingReport,
    pub warnings: Vec<Warning>,
    pub charts: Vec<ChartSpec>,
    pub sample_data: Vec<serde_json::Map<String, serde_json::Value>>,
    pub meta: ProfileMeta,
}

impl DatasetProfile {
    pub fn column(&self, name: &str) -> Option<&ColumnProfile> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn warnings_with_code(&self, code: WarningCode) -> impl Iterator<Item = &Warning> {
        self.warnings.iter().filter(move |w| w.code == code)
    }
}

// ============================================================================
// Job and dataset-version records
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    Profile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Running,
    Completed,
    Failed,
}

impl JobStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobPayload {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub job_type: JobType,
    pub status: JobStatus,
    pub progress: u8,
    pub payload: JobPayload,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl Job {
    /// A freshly queued profiling job for one dataset version.
    pub fn queued_profile(id: impl Into<String>, version_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            job_type: JobType::Profile,
            status: JobStatus::Queued,
            progress: 0,
            payload: JobPayload {
                version_id: Some(version_id.into()),
            },
            error_message: None,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionStatus {
    Uploaded,
    Profiling,
    Ready,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetVersion {
    pub id: String,
    pub dataset_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<String>,
    pub version_number: u32,
    #[serde(default)]
    pub row_count: Option<usize>,
    #[serde(default)]
    pub column_count: Option<usize>,
    pub status: VersionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl DatasetVersion {
    /// A newly uploaded, not yet profiled, version.
    pub fn uploaded(
        id: impl Into<String>,
        dataset_id: impl Into<String>,
        storage_path: impl Into<String>,
        file_type: Option<String>,
    ) -> Self {
        Self {
            id: id.into(),
            dataset_id: dataset_id.into(),
            storage_path: Some(storage_path.into()),
            file_type,
            version_number: 1,
            row_count: None,
            column_count: None,
            status: VersionStatus::Uploaded,
            error_message: None,
            created_at: Utc::now(),
        }
    }
}

/// Statistics half of a persisted profile record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileStatistics {
    pub stats: DatasetStats,
    pub columns: Vec<ColumnProfile>,
    pub charts: Vec<ChartSpec>,
    pub meta: ProfileMeta,
}

/// Row persisted in the profile record store, keyed by version id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileRecord {
    pub version_id: String,
    pub schema_info: Vec<SchemaColumn>,
    pub statistics: ProfileStatistics,
    pub correlations: CorrelationMatrix,
    pub missing_values: MissingReport,
    pub warnings: Vec<Warning>,
    pub sample_data: Vec<serde_json::Map<String, serde_json::Value>>,
    pub computed_at: DateTime<Utc>,
}

impl ProfileRecord {
    pub fn from_profile(version_id: impl Into<String>, profile: DatasetProfile) -> Self {
        let computed_at = profile.meta.profiled_at;
        Self {
            version_id: version_id.into(),
            schema_info: profile.schema,
            statistics: ProfileStatistics {
                stats: profile.stats,
                columns: profile.columns,
                charts: profile.charts,
                meta: profile.meta,
            },
            correlations: profile.correlations,
            missing_values: profile.missing,
            warnings: profile.warnings,
            sample_data: profile.sample_data,
            computed_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_semantic_type_json_values() {
        let expectations = [
            (SemanticType::Numeric, "\"numeric\""),
            (SemanticType::Categorical, "\"categorical\""),
            (SemanticType::Boolean, "\"boolean\""),
            (SemanticType::Datetime, "\"datetime\""),
            (SemanticType::Id, "\"id\""),
            (SemanticType::Text, "\"text\""),
        ];
        for (ty, expected) in expectations {
            assert_eq!(serde_json::to_string(&ty).unwrap(), expected);
            assert_eq!(format!("\"{ty}\""), expected);
        }
    }

    #[test]
    fn test_warning_wire_format() {
        let warning = Warning {
            code: WarningCode::HighMissing,
            severity: Severity::Med,
            message: "Column 'age' has 35% missing values".to_string(),
            columns: vec!["age".to_string()],
        };
        let json = serde_json::to_value(&warning).unwrap();
        assert_eq!(json["code"], "HIGH_MISSING");
        assert_eq!(json["severity"], "med");
    }

    #[test]
    fn test_column_stats_is_tagged() {
        let stats = ColumnStats::Categorical(CategoricalColumnStats {
            top_values: vec![TopValue {
                value: "a".to_string(),
                count: 3,
                percentage: 60.0,
            }],
        });
        let json = serde_json::to_value(&stats).unwrap();
        assert_eq!(json["kind"], "categorical");
        assert_eq!(json["top_values"][0]["value"], "a");

        let basic = serde_json::to_value(ColumnStats::Basic).unwrap();
        assert_eq!(basic["kind"], "basic");
    }

    #[test]
    fn test_degraded_computation_has_no_value() {
        let hist: Computation<Histogram> = Computation::degraded("single value");
        assert!(hist.is_degraded());
        assert!(hist.value().is_none());
        let json = serde_json::to_value(&hist).unwrap();
        assert_eq!(json["status"], "degraded");
        assert_eq!(json["reason"], "single value");
    }

    #[test]
    fn test_correlation_matrix_get_handles_undefined_cells() {
        let matrix = CorrelationMatrix {
            columns: vec!["a".to_string(), "b".to_string()],
            pearson: vec![vec![Some(1.0), None], vec![None, None]],
            degraded: None,
        };
        assert_eq!(matrix.get(0, 0), Some(1.0));
        assert_eq!(matrix.get(0, 1), None);
        assert_eq!(matrix.get(5, 5), None);
        let json = serde_json::to_string(&matrix).unwrap();
        assert!(json.contains("null"));
        assert!(!json.contains("degraded"));
    }

    #[test]
    fn test_job_status_terminal() {
        assert!(!JobStatus::Queued.is_terminal());
        assert!(!JobStatus::Running.is_terminal());
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
    }

    #[test]
    fn test_queued_profile_job() {
        let job = Job::queued_profile("job-1", "v-1");
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.progress, 0);
        assert_eq!(job.payload.version_id.as_deref(), Some("v-1"));
        assert!(job.started_at.is_none());
    }

    #[test]
    fn test_job_payload_missing_version_deserializes() {
        let payload: JobPayload = serde_json::from_str("{}").unwrap();
        assert!(payload.version_id.is_none());
    }
}
