//! Pearson correlation over numeric columns.
//!
//! Nulls are replaced with 0 before correlating. Cells that involve a
//! zero-variance column have no defined coefficient and are left as `None`.

use polars::prelude::*;
use tracing::warn;

use crate::types::CorrelationMatrix;
use crate::utils::round_to;

/// Correlate the given numeric columns of `df`.
///
/// Never fails: a numerical problem degrades to an empty matrix carrying the
/// reason.
pub(crate) fn correlation_matrix(df: &DataFrame, numeric_columns: &[String]) -> CorrelationMatrix {
    if numeric_columns.len() < 2 {
        return CorrelationMatrix::empty(numeric_columns.to_vec());
    }

    match pearson_matrix(df, numeric_columns) {
        Ok(pearson) => CorrelationMatrix {
            columns: numeric_columns.to_vec(),
            pearson,
            degraded: None,
        },
        Err(reason) => {
            warn!("Correlation matrix degraded: {}", reason);
            CorrelationMatrix {
                columns: numeric_columns.to_vec(),
                pearson: Vec::new(),
                degraded: Some(reason),
            }
        }
    }
}

fn pearson_matrix(
    df: &DataFrame,
    numeric_columns: &[String],
) -> std::result::Result<Vec<Vec<Option<f64>>>, String> {
    let mut columns = Vec::with_capacity(numeric_columns.len());
    for name in numeric_columns {
        let values = zero_filled(df, name).map_err(|e| e.to_string())?;
        if values.iter().any(|v| !v.is_finite()) {
            return Err(format!("column '{name}' contains non-finite values"));
        }
        columns.push(values);
    }

    let centered: Vec<(Vec<f64>, f64)> = columns
        .iter()
        .map(|values| {
            let mean = if values.is_empty() {
                0.0
            } else {
                values.iter().sum::<f64>() / values.len() as f64
            };
            let deviations: Vec<f64> = values.iter().map(|v| v - mean).collect();
            let sum_sq = deviations.iter().map(|d| d * d).sum::<f64>();
            (deviations, sum_sq)
        })
        .collect();

    let n = centered.len();
    let mut matrix = vec![vec![None; n]; n];
    for i in 0..n {
        for j in i..n {
            let value = coefficient(&centered[i], &centered[j], i == j);
            matrix[i][j] = value;
            matrix[j][i] = value;
        }
    }

    Ok(matrix)
}

fn coefficient(a: &(Vec<f64>, f64), b: &(Vec<f64>, f64), diagonal: bool) -> Option<f64> {
    let (dev_a, ss_a) = a;
    let (dev_b, ss_b) = b;
    if *ss_a == 0.0 || *ss_b == 0.0 {
        return None;
    }
    if diagonal {
        return Some(1.0);
    }

    let cov: f64 = dev_a.iter().zip(dev_b).map(|(x, y)| x * y).sum();
    let r = (cov / (ss_a.sqrt() * ss_b.sqrt())).clamp(-1.0, 1.0);
    Some(round_to(r, 4))
}

fn zero_filled(df: &DataFrame, name: &str) -> PolarsResult<Vec<f64>> {
    let casted = df.column(name)?.cast(&DataType::Float64)?;
    Ok(casted
        .f64()?
        .into_iter()
        .map(|v| v.unwrap_or(0.0))
        .collect())
}
