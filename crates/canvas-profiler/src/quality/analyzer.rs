use crate::types::{
    ColumnProfile, CorrelationMatrix, SemanticType, Severity, Warning, WarningCode,
};

const MISSING_MED_PCT: f64 = 30.0;
const MISSING_HIGH_PCT: f64 = 50.0;
const HIGH_CARDINALITY_PCT: f64 = 90.0;
const HIGH_CORRELATION_ABS: f64 = 0.95;

/// Rule engine turning computed statistics into data-quality warnings.
pub struct DataQualityAnalyzer;

impl DataQualityAnalyzer {
    /// Evaluate every rule; all matching rules fire.
    ///
    /// Column rules run column by column in table order, then correlation
    /// pairs, then the sampling notice.
    pub fn identify_warnings(
        columns: &[ColumnProfile],
        correlations: &CorrelationMatrix,
        sampling_note: Option<&str>,
    ) -> Vec<Warning> {
        let mut warnings = Vec::new();

        for column in columns {
            warnings.extend(Self::analyze_column(column));
        }

        warnings.extend(Self::analyze_correlations(correlations));

        if let Some(note) = sampling_note {
            warnings.push(Warning {
                code: WarningCode::Sampling,
                severity: Severity::Med,
                message: format!("Profile {note}"),
                columns: Vec::new(),
            });
        }

        warnings
    }

    fn analyze_column(column: &ColumnProfile) -> Vec<Warning> {
        let mut warnings = Vec::new();

        if column.missing_percentage > MISSING_MED_PCT {
            let severity = if column.missing_percentage > MISSING_HIGH_PCT {
                Severity::High
            } else {
                Severity::Med
            };
            warnings.push(Warning {
                code: WarningCode::HighMissing,
                severity,
                message: format!(
                    "Column '{}' has {}% missing values",
                    column.name, column.missing_percentage
                ),
                columns: vec![column.name.clone()],
            });
        }

        if column.unique_count == 1 {
            warnings.push(Warning {
                code: WarningCode::ConstantColumn,
                severity: Severity::Med,
                message: format!("Column '{}' is constant (single value)", column.name),
                columns: vec![column.name.clone()],
            });
        }

        if column.inferred_type == SemanticType::Categorical
            && column.unique_percentage > HIGH_CARDINALITY_PCT
        {
            warnings.push(Warning {
                code: WarningCode::HighCardinality,
                severity: Severity::Low,
                message: format!(
                    "Column '{}' has high cardinality ({} unique values)",
                    column.name, column.unique_count
                ),
                columns: vec![column.name.clone()],
            });
        }

        warnings
    }

    fn analyze_correlations(correlations: &CorrelationMatrix) -> Vec<Warning> {
        let mut warnings = Vec::new();
        let n = correlations.columns.len();

        for i in 0..n {
            for j in (i + 1)..n {
                let Some(r) = correlations.get(i, j) else {
                    continue;
                };
                if r.abs() > HIGH_CORRELATION_ABS {
                    let (a, b) = (&correlations.columns[i], &correlations.columns[j]);
                    warnings.push(Warning {
                        code: WarningCode::HighCorrelation,
                        severity: Severity::Med,
                        message: format!("High correlation ({r:.2}) between '{a}' and '{b}'"),
                        columns: vec![a.clone(), b.clone()],
                    });
                }
            }
        }

        warnings
    }
}
