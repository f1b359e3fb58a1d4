//! Data profiling module for dataset analysis.
//!
//! This module turns a loaded table into a [`DatasetProfile`]:
//! - Type inference for columns
//! - Per-column statistics and top-value tables
//! - Pearson correlation over numeric columns
//! - Missing-value analysis
//! - Warnings and chart descriptors over the results

mod correlation;
mod missing;
mod statistics;
mod type_inference;

use std::time::Instant;

use chrono::Utc;
use polars::prelude::*;
use rand::prelude::*;
use tracing::debug;

use crate::charts::ChartGenerator;
use crate::config::ProfilerConfig;
use crate::error::{Result, ResultExt};
use crate::loader::{DatasetLoader, FileType, LoadedDataset};
use crate::quality::DataQualityAnalyzer;
use crate::types::{
    CategoricalColumnStats, ColumnProfile, ColumnStats, DatasetProfile, DatasetStats,
    ProfileMeta, SchemaColumn, SemanticType,
};
use crate::utils::{
    any_value_to_json, collect_sample_values, estimated_size_mb, numeric_column_names,
    numeric_values, percentage, round_to,
};

pub(crate) use correlation::correlation_matrix;
pub(crate) use missing::analyze_missing;
pub(crate) use statistics::{numeric_stats, top_values};
pub(crate) use type_inference::infer_semantic_type;

/// Values shown per column in the stored schema.
const SCHEMA_SAMPLE_VALUES: usize = 3;

/// Data profiler for analyzing dataset structure and characteristics.
#[derive(Debug, Clone)]
pub struct DataProfiler {
    config: ProfilerConfig,
}

impl DataProfiler {
    pub fn new(config: ProfilerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProfilerConfig {
        &self.config
    }

    /// Load raw bytes and profile them in one step.
    pub fn profile_bytes(&self, bytes: Vec<u8>, file_type: FileType) -> Result<DatasetProfile> {
        let loaded = DatasetLoader::new(&self.config).load(bytes, file_type)?;
        self.profile(&loaded)
    }

    /// Profile a loaded dataset.
    ///
    /// Tables above `max_sample_size` rows are profiled on a seeded uniform
    /// sample; stored row/column counts always describe the loaded table.
    pub fn profile(&self, loaded: &LoadedDataset) -> Result<DatasetProfile> {
        let started = Instant::now();
        let df = &loaded.df;

        let (sample, statistics_sampled) =
            statistics_sample(df, self.config.max_sample_size, self.config.sample_seed)
                .context("Failed to draw statistics sample")?;
        debug!(
            "Profiling {} columns over {} rows (sampled: {})",
            sample.width(),
            sample.height(),
            statistics_sampled
        );

        let mut columns = Vec::with_capacity(sample.width());
        let mut schema = Vec::with_capacity(sample.width());
        for column in sample.get_columns() {
            let series = column.as_materialized_series();
            let profile = self
                .profile_column(series, sample.height())
                .context(format!("Failed to profile column '{}'", series.name()))?;
            schema.push(SchemaColumn {
                name: profile.name.clone(),
                inferred_type: profile.inferred_type,
                null_frac: round_to(profile.missing_percentage / 100.0, 4),
                unique_frac: round_to(profile.unique_percentage / 100.0, 4),
                sample_values: collect_sample_values(series, SCHEMA_SAMPLE_VALUES),
            });
            columns.push(profile);
        }

        let correlations = correlation_matrix(&sample, &numeric_column_names(&sample));
        let missing = analyze_missing(&sample);
        let warnings = DataQualityAnalyzer::identify_warnings(
            &columns,
            &correlations,
            loaded.note.as_deref().filter(|_| loaded.sampled),
        );
        let charts = ChartGenerator::generate(&columns, &correlations);
        let sample_data = sample_rows(df, self.config.sample_rows)
            .context("Failed to collect sample rows")?;

        Ok(DatasetProfile {
            schema,
            stats: DatasetStats {
                row_count: df.height(),
                column_count: df.width(),
                memory_est_mb: estimated_size_mb(df),
            },
            columns,
            correlations,
            missing,
            warnings,
            charts,
            sample_data,
            meta: ProfileMeta {
                profiled_at: Utc::now(),
                processing_time_ms: started.elapsed().as_millis() as u64,
                sample_size: sample.height(),
                sampled: loaded.sampled,
                sampling_note: loaded.note.clone(),
                statistics_sampled,
            },
        })
    }

    fn profile_column(&self, series: &Series, row_count: usize) -> PolarsResult<ColumnProfile> {
        // `count` includes nulls and null is one distinct value of its own.
        let count = series.len();
        let missing_count = series.null_count();
        let unique_count = series.n_unique()?;
        let inferred_type = infer_semantic_type(series.dtype(), unique_count, row_count);

        let stats = match inferred_type {
            SemanticType::Numeric => {
                let values = numeric_values(series)?;
                numeric_stats(&values, self.config.histogram_bins)
                    .map(ColumnStats::Numeric)
                    .unwrap_or(ColumnStats::Basic)
            }
            t if t.has_top_values() => ColumnStats::Categorical(CategoricalColumnStats {
                top_values: top_values(series, row_count, self.config.top_values_limit)?,
            }),
            _ => ColumnStats::Basic,
        };

        Ok(ColumnProfile {
            name: series.name().to_string(),
            dtype: series.dtype().to_string(),
            inferred_type,
            count,
            missing_count,
            missing_percentage: percentage(missing_count, row_count),
            unique_count,
            unique_percentage: percentage(unique_count, row_count),
            stats,
        })
    }
}

/// Seeded uniform sample of `max_rows` rows, kept in table order.
///
/// Returns the table unchanged when it is already small enough.
fn statistics_sample(
    df: &DataFrame,
    max_rows: usize,
    seed: u64,
) -> PolarsResult<(DataFrame, bool)> {
    if df.height() <= max_rows {
        return Ok((df.clone(), false));
    }

    let mut rng = StdRng::seed_from_u64(seed);
    let indices: Vec<usize> = (0..df.height()).collect();
    let mut chosen: Vec<IdxSize> = indices
        .choose_multiple(&mut rng, max_rows)
        .map(|&i| i as IdxSize)
        .collect();
    chosen.sort_unstable();

    let idx = IdxCa::from_vec("idx".into(), chosen);
    Ok((df.take(&idx)?, true))
}

/// First `n` rows as JSON objects keyed by column name.
fn sample_rows(
    df: &DataFrame,
    n: usize,
) -> PolarsResult<Vec<serde_json::Map<String, serde_json::Value>>> {
    let head = df.head(Some(n));
    let mut rows = Vec::with_capacity(head.height());
    for i in 0..head.height() {
        let mut row = serde_json::Map::new();
        for column in head.get_columns() {
            row.insert(column.name().to_string(), any_value_to_json(&column.get(i)?));
        }
        rows.push(row);
    }
    Ok(rows)
}
