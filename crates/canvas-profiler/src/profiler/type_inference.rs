//! Semantic type inference for column analysis.

use polars::prelude::*;

use crate::types::SemanticType;
use crate::utils::{DtypeCategory, get_dtype_category};

/// Numeric columns with fewer distinct values than this may be categorical.
const NUMERIC_CATEGORICAL_MAX_UNIQUE: usize = 20;
/// ...and only when the distinct ratio is also below this.
const NUMERIC_CATEGORICAL_MAX_RATIO: f64 = 0.05;
/// String columns above this distinct ratio are identifiers.
const ID_MIN_RATIO: f64 = 0.9;
/// String columns with fewer distinct values than this are categorical.
const STRING_CATEGORICAL_MAX_UNIQUE: usize = 50;

/// Classify a column from its storage dtype and distinct-value counts.
///
/// `row_count` is the number of rows the counts were taken over.
pub(crate) fn infer_semantic_type(
    dtype: &DataType,
    unique_count: usize,
    row_count: usize,
) -> SemanticType {
    let unique_ratio = if row_count == 0 {
        0.0
    } else {
        unique_count as f64 / row_count as f64
    };

    match get_dtype_category(dtype) {
        DtypeCategory::Numeric => {
            if unique_count < NUMERIC_CATEGORICAL_MAX_UNIQUE
                && unique_ratio < NUMERIC_CATEGORICAL_MAX_RATIO
            {
                SemanticType::Categorical
            } else {
                SemanticType::Numeric
            }
        }
        DtypeCategory::Boolean => SemanticType::Boolean,
        DtypeCategory::Datetime => SemanticType::Datetime,
        DtypeCategory::String => {
            if unique_ratio > ID_MIN_RATIO {
                SemanticType::Id
            } else if unique_count < STRING_CATEGORICAL_MAX_UNIQUE {
                SemanticType::Categorical
            } else {
                SemanticType::Text
            }
        }
        DtypeCategory::Other => SemanticType::Text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_numeric_with_many_values() {
        assert_eq!(
            infer_semantic_type(&DataType::Float64, 100, 100),
            SemanticType::Numeric
        );
    }

    #[test]
    fn test_low_cardinality_numeric_is_categorical() {
        // 3 distinct over 1000 rows: ratio 0.003
        assert_eq!(
            infer_semantic_type(&DataType::Int64, 3, 1000),
            SemanticType::Categorical
        );
    }

    #[test]
    fn test_small_numeric_table_stays_numeric() {
        // 3 distinct over 10 rows: ratio 0.3 keeps it numeric
        assert_eq!(
            infer_semantic_type(&DataType::Int64, 3, 10),
            SemanticType::Numeric
        );
    }

    #[test]
    fn test_boolean_and_datetime() {
        assert_eq!(
            infer_semantic_type(&DataType::Boolean, 2, 10),
            SemanticType::Boolean
        );
        assert_eq!(
            infer_semantic_type(&DataType::Date, 10, 10),
            SemanticType::Datetime
        );
        assert_eq!(
            infer_semantic_type(&DataType::Datetime(TimeUnit::Microseconds, None), 1, 10),
            SemanticType::Datetime
        );
    }

    #[test]
    fn test_string_precedence() {
        assert_eq!(
            infer_semantic_type(&DataType::String, 95, 100),
            SemanticType::Id
        );
        assert_eq!(
            infer_semantic_type(&DataType::String, 10, 100),
            SemanticType::Categorical
        );
        assert_eq!(
            infer_semantic_type(&DataType::String, 60, 100),
            SemanticType::Text
        );
    }

    #[test]
    fn test_other_dtype_is_text() {
        assert_eq!(
            infer_semantic_type(&DataType::Null, 0, 10),
            SemanticType::Text
        );
    }

    #[test]
    fn test_empty_table_does_not_divide_by_zero() {
        assert_eq!(
            infer_semantic_type(&DataType::String, 0, 0),
            SemanticType::Categorical
        );
    }
}
