//! Missing-value analysis.

use polars::prelude::*;

use crate::types::{MissingColumn, MissingReport};
use crate::utils::percentage;

/// Per-column and aggregate null counts.
///
/// Only columns with at least one null are listed, most missing first.
pub(crate) fn analyze_missing(df: &DataFrame) -> MissingReport {
    let rows = df.height();
    let mut columns_with_missing: Vec<MissingColumn> = df
        .get_columns()
        .iter()
        .filter(|c| c.null_count() > 0)
        .map(|c| MissingColumn {
            column: c.name().to_string(),
            count: c.null_count(),
            percentage: percentage(c.null_count(), rows),
        })
        .collect();

    // Stable sort keeps table order among equal counts.
    columns_with_missing.sort_by(|a, b| b.count.cmp(&a.count));

    let total_missing: usize = columns_with_missing.iter().map(|c| c.count).sum();

    MissingReport {
        total_missing,
        total_missing_percentage: percentage(total_missing, rows * df.width()),
        columns_with_missing,
    }
}
