//! Shared utilities for the profiling engine.
//!
//! Dtype classification, value stringification and rounding helpers used by
//! the profiler, loader and chart generator.

use polars::prelude::*;

// =============================================================================
// Data Type Utilities
// =============================================================================

/// Storage category of a column, before semantic inference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DtypeCategory {
    /// Integer or floating point numbers
    Numeric,
    /// Date, datetime or time types
    Datetime,
    /// Boolean type
    Boolean,
    /// String/text type
    String,
    /// Other/unknown types
    Other,
}

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Check if a DataType is a datetime type.
#[inline]
pub fn is_datetime_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Datetime(_, _) | DataType::Date | DataType::Time
    )
}

/// Get the category of a DataType.
pub fn get_dtype_category(dtype: &DataType) -> DtypeCategory {
    if is_numeric_dtype(dtype) {
        DtypeCategory::Numeric
    } else if is_datetime_dtype(dtype) {
        DtypeCategory::Datetime
    } else if matches!(dtype, DataType::Boolean) {
        DtypeCategory::Boolean
    } else if matches!(dtype, DataType::String | DataType::Categorical(_, _)) {
        DtypeCategory::String
    } else {
        DtypeCategory::Other
    }
}

/// Names of the columns with numeric storage, in table order.
pub fn numeric_column_names(df: &DataFrame) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|c| is_numeric_dtype(c.dtype()))
        .map(|c| c.name().to_string())
        .collect()
}

// =============================================================================
// Value Conversion Utilities
// =============================================================================

/// Stringify a single value without the quoting `Display` adds to strings.
pub fn any_value_to_string(value: &AnyValue) -> String {
    match value {
        AnyValue::String(s) => (*s).to_string(),
        AnyValue::StringOwned(s) => s.to_string(),
        AnyValue::Null => String::new(),
        other => other.to_string(),
    }
}

/// Convert a single value into JSON for sample rows.
///
/// Non-finite floats become `null`; temporal values are emitted as strings.
pub fn any_value_to_json(value: &AnyValue) -> serde_json::Value {
    use serde_json::Value;

    match value {
        AnyValue::Null => Value::Null,
        AnyValue::Boolean(b) => Value::Bool(*b),
        AnyValue::Int8(v) => Value::from(*v),
        AnyValue::Int16(v) => Value::from(*v),
        AnyValue::Int32(v) => Value::from(*v),
        AnyValue::Int64(v) => Value::from(*v),
        AnyValue::UInt8(v) => Value::from(*v),
        AnyValue::UInt16(v) => Value::from(*v),
        AnyValue::UInt32(v) => Value::from(*v),
        AnyValue::UInt64(v) => Value::from(*v),
        AnyValue::Float32(v) => float_to_json(f64::from(*v)),
        AnyValue::Float64(v) => float_to_json(*v),
        other => Value::String(any_value_to_string(other)),
    }
}

fn float_to_json(value: f64) -> serde_json::Value {
    serde_json::Number::from_f64(value)
        .map(serde_json::Value::Number)
        .unwrap_or(serde_json::Value::Null)
}

/// Non-null values of a numeric column as `f64`.
pub fn numeric_values(series: &Series) -> PolarsResult<Vec<f64>> {
    let casted = series.cast(&DataType::Float64)?;
    Ok(casted.f64()?.into_iter().flatten().collect())
}

/// First `max_samples` non-null values of a column, stringified.
pub fn collect_sample_values(series: &Series, max_samples: usize) -> Vec<String> {
    let non_null = series.drop_nulls();
    let sample_size = std::cmp::min(max_samples, non_null.len());
    let mut samples = Vec::with_capacity(sample_size);

    for i in 0..sample_size {
        if let Ok(val) = non_null.get(i) {
            samples.push(any_value_to_string(&val));
        }
    }

    samples
}

// =============================================================================
// Numeric Utilities
// =============================================================================

/// Round to a fixed number of decimals.
#[inline]
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// `part / whole * 100`, rounded to 2 decimals; 0 when `whole` is 0.
#[inline]
pub fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        round_to(part as f64 / whole as f64 * 100.0, 2)
    }
}

/// In-memory size estimate of a table, in megabytes (2 decimals).
pub fn estimated_size_mb(df: &DataFrame) -> f64 {
    round_to(df.estimated_size() as f64 / (1024.0 * 1024.0), 2)
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_numeric_dtype() {
        assert!(is_numeric_dtype(&DataType::Int64));
        assert!(is_numeric_dtype(&DataType::Float64));
        assert!(!is_numeric_dtype(&DataType::String));
        assert!(!is_numeric_dtype(&DataType::Boolean));
    }

    #[test]
    fn test_dtype_category() {
        assert_eq!(get_dtype_category(&DataType::UInt8), DtypeCategory::Numeric);
        assert_eq!(get_dtype_category(&DataType::Date), DtypeCategory::Datetime);
        assert_eq!(
            get_dtype_category(&DataType::Datetime(TimeUnit::Milliseconds, None)),
            DtypeCategory::Datetime
        );
        assert_eq!(
            get_dtype_category(&DataType::Boolean),
            DtypeCategory::Boolean
        );
        assert_eq!(get_dtype_category(&DataType::String), DtypeCategory::String);
        assert_eq!(get_dtype_category(&DataType::Null), DtypeCategory::Other);
    }

    #[test]
    fn test_numeric_column_names_keeps_order() {
        let df = df! {
            "b" => [1.0, 2.0],
            "name" => ["x", "y"],
            "a" => [1i64, 2],
        }
        .unwrap();
        assert_eq!(numeric_column_names(&df), vec!["b", "a"]);
    }

    #[test]
    fn test_any_value_to_string_unquotes() {
        assert_eq!(any_value_to_string(&AnyValue::String("abc")), "abc");
        assert_eq!(any_value_to_string(&AnyValue::Int64(7)), "7");
        assert_eq!(any_value_to_string(&AnyValue::Boolean(true)), "true");
    }

    #[test]
    fn test_any_value_to_json() {
        assert_eq!(any_value_to_json(&AnyValue::Null), serde_json::Value::Null);
        assert_eq!(any_value_to_json(&AnyValue::Int32(3)), serde_json::json!(3));
        assert_eq!(
            any_value_to_json(&AnyValue::Float64(f64::NAN)),
            serde_json::Value::Null
        );
        assert_eq!(
            any_value_to_json(&AnyValue::String("hi")),
            serde_json::json!("hi")
        );
    }

    #[test]
    fn test_numeric_values_skips_nulls() {
        let series = Series::new("v".into(), &[Some(1i64), None, Some(3)]);
        assert_eq!(numeric_values(&series).unwrap(), vec![1.0, 3.0]);
    }

    #[test]
    fn test_collect_sample_values() {
        let series = Series::new("test".into(), &[Some("a"), None, Some("b"), Some("c")]);
        assert_eq!(collect_sample_values(&series, 5), vec!["a", "b", "c"]);
        assert_eq!(collect_sample_values(&series, 2), vec!["a", "b"]);
    }

    #[test]
    fn test_percentage_and_rounding() {
        assert_eq!(percentage(1, 3), 33.33);
        assert_eq!(percentage(5, 0), 0.0);
        assert_eq!(round_to(0.123456, 4), 0.1235);
    }
}
