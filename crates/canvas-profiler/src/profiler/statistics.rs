//! Statistical analysis functions for column profiling.

use polars::prelude::*;

use crate::types::{Computation, Histogram, NumericColumnStats, TopValue};
use crate::utils::{any_value_to_string, percentage};

/// Descriptive statistics over the non-null values of a numeric column.
///
/// Returns `None` when there are no values.
pub(crate) fn numeric_stats(values: &[f64], bins: usize) -> Option<NumericColumnStats> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let min = sorted[0];
    let max = sorted[sorted.len() - 1];

    Some(NumericColumnStats {
        mean: calculate_mean(values),
        std: calculate_std(values),
        min,
        max,
        median: quantile(&sorted, 0.5),
        p1: quantile(&sorted, 0.01),
        p5: quantile(&sorted, 0.05),
        q1: quantile(&sorted, 0.25),
        q3: quantile(&sorted, 0.75),
        p95: quantile(&sorted, 0.95),
        p99: quantile(&sorted, 0.99),
        histogram: histogram(values, bins, min, max),
    })
}

pub(crate) fn calculate_mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (ddof = 1). Undefined below two values.
pub(crate) fn calculate_std(values: &[f64]) -> Option<f64> {
    let n = values.len();
    if n < 2 {
        return None;
    }

    let mean = calculate_mean(values);
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1) as f64;

    Some(variance.sqrt())
}

/// Quantile with linear interpolation between closest ranks.
///
/// `sorted` must be ascending and non-empty.
pub(crate) fn quantile(sorted: &[f64], q: f64) -> f64 {
    let pos = q * (sorted.len() - 1) as f64;
    let lower = pos.floor() as usize;
    let upper = pos.ceil() as usize;
    if lower == upper {
        return sorted[lower];
    }
    let weight = pos - lower as f64;
    sorted[lower] + (sorted[upper] - sorted[lower]) * weight
}

/// Equal-width histogram; the last bin includes the maximum.
pub(crate) fn histogram(values: &[f64], bins: usize, min: f64, max: f64) -> Computation<Histogram> {
    if bins == 0 {
        return Computation::degraded("histogram requires at least one bin");
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Computation::degraded("column contains non-finite values");
    }
    if min == max {
        return Computation::degraded("column has a single distinct value");
    }

    let width = (max - min) / bins as f64;
    let mut counts = vec![0u64; bins];
    for v in values {
        let idx = (((v - min) / width) as usize).min(bins - 1);
        counts[idx] += 1;
    }

    let mut edges: Vec<f64> = (0..bins).map(|i| min + width * i as f64).collect();
    edges.push(max);

    Computation::Computed {
        value: Histogram {
            bins: edges,
            counts,
        },
    }
}

/// Most frequent values of a column.
///
/// Ordered by count descending then value ascending. Percentages are of
/// `total_rows`, so nulls count toward the denominator.
pub(crate) fn top_values(
    series: &Series,
    total_rows: usize,
    limit: usize,
) -> PolarsResult<Vec<TopValue>> {
    let non_null = series.drop_nulls();
    if non_null.is_empty() {
        return Ok(Vec::new());
    }

    let value_counts_df = non_null.value_counts(true, false, "count".into(), false)?;
    let values_col = value_counts_df.column(non_null.name())?;
    let counts_col = value_counts_df.column("count")?.cast(&DataType::UInt64)?;
    let counts = counts_col.u64()?;

    let mut entries = Vec::with_capacity(value_counts_df.height());
    for (idx, count) in counts.into_iter().enumerate() {
        let value = any_value_to_string(&values_col.get(idx)?);
        entries.push((value, count.unwrap_or(0)));
    }

    entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    entries.truncate(limit);

    Ok(entries
        .into_iter()
        .map(|(value, count)| TopValue {
            value,
            count,
            percentage: percentage(count as usize, total_rows),
        })
        .collect())
}
