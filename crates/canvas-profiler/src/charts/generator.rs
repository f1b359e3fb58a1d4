use serde_json::{Value, json};

use crate::types::{
    ChartData, ChartDescriptor, ChartSection, ChartSpec, ColumnProfile, CorrelationMatrix,
    Histogram, SemanticType, TopValue,
};

const VEGA_LITE_SCHEMA: &str = "https://vega.github.io/schema/vega-lite/v5.json";

const MAX_MISSING_BARS: usize = 15;
const MAX_HISTOGRAMS: usize = 6;
const MAX_BOX_PLOTS: usize = 4;
const MAX_CATEGORY_CHARTS: usize = 4;
const MAX_CATEGORY_BARS: usize = 10;

/// Builds Vega-Lite shaped chart descriptors from a finished profile.
pub struct ChartGenerator;

impl ChartGenerator {
    /// Charts in their fixed order: summary, distributions, outliers,
    /// categoricals, correlations.
    pub fn generate(columns: &[ColumnProfile], correlations: &CorrelationMatrix) -> Vec<ChartSpec> {
        let mut charts = vec![
            ChartSpec {
                key: "column_types".to_string(),
                title: "Column Types Distribution".to_string(),
                section: ChartSection::Summary,
                spec: Self::type_distribution_spec(columns),
            },
            ChartSpec {
                key: "missing_values".to_string(),
                title: "Missing Values by Column".to_string(),
                section: ChartSection::Summary,
                spec: Self::missing_bar_spec(columns),
            },
        ];

        let numeric: Vec<&ColumnProfile> = columns
            .iter()
            .filter(|c| c.inferred_type == SemanticType::Numeric)
            .collect();

        for col in numeric.iter().take(MAX_HISTOGRAMS) {
            if let Some(histogram) = col.histogram() {
                charts.push(ChartSpec {
                    key: format!("dist_{}", col.name),
                    title: format!("Distribution of {}", col.name),
                    section: ChartSection::Distributions,
                    spec: Self::histogram_spec(&col.name, histogram),
                });
            }
        }

        for col in numeric.iter().take(MAX_BOX_PLOTS) {
            charts.push(ChartSpec {
                key: format!("box_{}", col.name),
                title: format!("{} Box Plot", col.name),
                section: ChartSection::Outliers,
                spec: Self::box_spec(&col.name),
            });
        }

        let categorical = columns
            .iter()
            .filter(|c| c.inferred_type == SemanticType::Categorical)
            .take(MAX_CATEGORY_CHARTS);
        for col in categorical {
            if let Some(top) = col.top_values().filter(|t| !t.is_empty()) {
                charts.push(ChartSpec {
                    key: format!("cat_{}", col.name),
                    title: format!("{} Distribution", col.name),
                    section: ChartSection::Categoricals,
                    spec: Self::category_bar_spec(top),
                });
            }
        }

        if correlations.pearson.len() >= 2 {
            charts.push(ChartSpec {
                key: "correlation_matrix".to_string(),
                title: "Correlation Matrix".to_string(),
                section: ChartSection::Correlations,
                spec: Self::correlation_heatmap_spec(correlations),
            });
        }

        charts
    }

    fn descriptor(values: Vec<Value>, mark: Value, encoding: Value) -> ChartDescriptor {
        ChartDescriptor {
            schema: VEGA_LITE_SCHEMA.to_string(),
            data: ChartData { values },
            mark,
            encoding,
            title: None,
        }
    }

    fn type_distribution_spec(columns: &[ColumnProfile]) -> ChartDescriptor {
        // First-appearance order keeps the output deterministic.
        let mut counts: Vec<(SemanticType, usize)> = Vec::new();
        for col in columns {
            match counts.iter_mut().find(|(t, _)| *t == col.inferred_type) {
                Some((_, n)) => *n += 1,
                None => counts.push((col.inferred_type, 1)),
            }
        }

        let values = counts
            .into_iter()
            .map(|(t, n)| json!({ "type": t.as_str(), "count": n }))
            .collect();

        Self::descriptor(
            values,
            json!("arc"),
            json!({
                "theta": { "field": "count", "type": "quantitative" },
                "color": { "field": "type", "type": "nominal" },
            }),
        )
    }

    fn missing_bar_spec(columns: &[ColumnProfile]) -> ChartDescriptor {
        let mut missing: Vec<&ColumnProfile> = columns
            .iter()
            .filter(|c| c.missing_percentage > 0.0)
            .collect();
        missing.sort_by(|a, b| b.missing_percentage.total_cmp(&a.missing_percentage));

        let values = missing
            .into_iter()
            .take(MAX_MISSING_BARS)
            .map(|c| json!({ "column": c.name, "missing": c.missing_percentage }))
            .collect();

        Self::descriptor(
            values,
            json!("bar"),
            json!({
                "x": { "field": "missing", "type": "quantitative", "title": "Missing %" },
                "y": { "field": "column", "type": "nominal", "sort": "-x" },
            }),
        )
    }

    fn histogram_spec(name: &str, histogram: &Histogram) -> ChartDescriptor {
        let values = histogram
            .counts
            .iter()
            .zip(histogram.bins.windows(2))
            .map(|(count, edges)| {
                json!({ "bin_start": edges[0], "bin_end": edges[1], "count": count })
            })
            .collect();

        Self::descriptor(
            values,
            json!("bar"),
            json!({
                "x": { "field": "bin_start", "type": "quantitative", "title": name },
                "x2": { "field": "bin_end" },
                "y": { "field": "count", "type": "quantitative" },
            }),
        )
    }

    fn box_spec(name: &str) -> ChartDescriptor {
        let mut descriptor = Self::descriptor(
            vec![json!({ "col": name })],
            json!({ "type": "boxplot", "extent": "min-max" }),
            json!({ "y": { "field": "col", "type": "nominal" } }),
        );
        descriptor.title = Some(format!("{name} Distribution"));
        descriptor
    }

    fn category_bar_spec(top_values: &[TopValue]) -> ChartDescriptor {
        let values = top_values
            .iter()
            .take(MAX_CATEGORY_BARS)
            .map(|v| json!({ "value": v.value, "count": v.count }))
            .collect();

        Self::descriptor(
            values,
            json!("bar"),
            json!({
                "x": { "field": "count", "type": "quantitative" },
                "y": { "field": "value", "type": "nominal", "sort": "-x" },
            }),
        )
    }

    fn correlation_heatmap_spec(correlations: &CorrelationMatrix) -> ChartDescriptor {
        let n = correlations.columns.len();
        let mut values = Vec::with_capacity(n * n);
        for (i, var1) in correlations.columns.iter().enumerate() {
            for (j, var2) in correlations.columns.iter().enumerate() {
                values.push(json!({
                    "var1": var1,
                    "var2": var2,
                    "correlation": correlations.get(i, j),
                }));
            }
        }

        Self::descriptor(
            values,
            json!("rect"),
            json!({
                "x": { "field": "var1", "type": "nominal" },
                "y": { "field": "var2", "type": "nominal" },
                "color": {
                    "field": "correlation",
                    "type": "quantitative",
                    "scale": { "scheme": "redblue", "domain": [-1, 1] },
                },
            }),
        )
    }
}
