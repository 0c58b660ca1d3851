use serde::Serialize;

use crate::data::model::{ClassDistribution, Dataset, CLASS_COLUMN, POSITIVE};

/// Default number of correlated features reported.
pub const DEFAULT_TOP_FEATURES: usize = 10;
/// Columns missing more than this share of values are flagged as sparse.
pub const SPARSE_THRESHOLD: f64 = 0.5;
/// Default number of faulty records sampled.
pub const FAULTY_SAMPLE: usize = 10;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureCorrelation {
    pub feature: String,
    /// Absolute Pearson correlation with the binary label, `0` when undefined.
    pub correlation: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColumnMissing {
    pub column: String,
    pub ratio: f64,
}

/// Non-label columns whose first non-null value parses as a number.
pub fn numeric_columns(dataset: &Dataset) -> Vec<String> {
    dataset
        .columns
        .iter()
        .filter(|col| col.as_str() != CLASS_COLUMN)
        .filter(|col| {
            dataset
                .column_values(col)
                .find(|c| !c.is_null())
                .and_then(|c| c.as_f64())
                .is_some()
        })
        .cloned()
        .collect()
}

/// Pearson correlation; `NaN` when either side has zero variance.
pub fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    let n = xs.len().min(ys.len()) as f64;
    let (mut sx, mut sy, mut sxy, mut sx2, mut sy2) = (0.0, 0.0, 0.0, 0.0, 0.0);
    for (&x, &y) in xs.iter().zip(ys) {
        sx += x;
        sy += y;
        sxy += x * y;
        sx2 += x * x;
        sy2 += y * y;
    }
    (n * sxy - sx * sy) / ((n * sx2 - sx * sx) * (n * sy2 - sy * sy)).sqrt()
}

/// Absolute correlation of every numeric column with the label (`pos` = 1),
/// strongest first. Unparseable or missing readings count as 0.
pub fn feature_correlations(dataset: &Dataset) -> Vec<FeatureCorrelation> {
    let labels: Vec<f64> = dataset
        .column_values(CLASS_COLUMN)
        .map(|c| if c.as_text() == Some(POSITIVE) { 1.0 } else { 0.0 })
        .collect();

    let mut out: Vec<FeatureCorrelation> = numeric_columns(dataset)
        .into_iter()
        .map(|feature| {
            let values: Vec<f64> = dataset
                .column_values(&feature)
                .map(|c| c.as_f64().unwrap_or(0.0))
                .collect();
            let r = pearson(&values, &labels).abs();
            FeatureCorrelation {
                feature,
                correlation: if r.is_finite() { r } else { 0.0 },
            }
        })
        .collect();

    out.sort_by(|a, b| b.correlation.total_cmp(&a.correlation));
    out
}

/// Share of null values per column, in column order.
pub fn missing_ratio(dataset: &Dataset) -> Vec<ColumnMissing> {
    let total = dataset.len().max(1) as f64;
    dataset
        .columns
        .iter()
        .map(|col| {
            let missing = dataset.column_values(col).filter(|c| c.is_null()).count();
            ColumnMissing {
                column: col.clone(),
                ratio: missing as f64 / total,
            }
        })
        .collect()
}

/// Columns whose missing ratio exceeds `threshold`.
pub fn sparse_columns(dataset: &Dataset, threshold: f64) -> Vec<String> {
    missing_ratio(dataset)
        .into_iter()
        .filter(|m| m.ratio > threshold)
        .map(|m| m.column)
        .collect()
}

/// Row indices of the first `limit` faulty records.
pub fn faulty_sample(dataset: &Dataset, limit: usize) -> Vec<usize> {
    dataset
        .column_values(CLASS_COLUMN)
        .enumerate()
        .filter(|(_, c)| c.as_text() == Some(POSITIVE))
        .map(|(i, _)| i)
        .take(limit)
        .collect()
}

// ---------------------------------------------------------------------------
// DatasetSummary
// ---------------------------------------------------------------------------

/// Descriptive statistics computed locally, before any service call.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatasetSummary {
    pub rows: usize,
    pub columns: usize,
    pub class_distribution: ClassDistribution,
    pub top_features: Vec<FeatureCorrelation>,
    pub sparse_columns: Vec<String>,
    pub faulty_sample: Vec<usize>,
}

impl DatasetSummary {
    pub fn from_dataset(dataset: &Dataset, top_n: usize) -> Self {
        let mut top_features = feature_correlations(dataset);
        top_features.truncate(top_n);
        DatasetSummary {
            rows: dataset.len(),
            columns: dataset.columns.len(),
            class_distribution: dataset.class_distribution(),
            top_features,
            sparse_columns: sparse_columns(dataset, SPARSE_THRESHOLD),
            faulty_sample: faulty_sample(dataset, FAULTY_SAMPLE),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IngestConfig;
    use crate::data::ingest::ingest_str;

    fn dataset(text: &str) -> Dataset {
        ingest_str(text, &IngestConfig::default()).unwrap().dataset
    }

    #[test]
    fn numeric_columns_skip_label_and_text() {
        let ds = dataset("s1,name,s2,class\nna,a,3,pos\n1.5,b,x,neg\n");
        assert_eq!(numeric_columns(&ds), vec!["s1", "s2"]);
    }

    #[test]
    fn correlations_rank_the_signal_first() {
        let ds = dataset(
            "noise,signal,flat,class\n\
             1,10,5,pos\n\
             2,0,5,neg\n\
             2,9,5,pos\n\
             1,1,5,neg\n",
        );
        let corr = feature_correlations(&ds);
        assert_eq!(corr[0].feature, "signal");
        assert!(corr[0].correlation > 0.9);
        let flat = corr.iter().find(|c| c.feature == "flat").unwrap();
        assert_eq!(flat.correlation, 0.0);
    }

    #[test]
    fn pearson_of_perfect_line_is_one() {
        let r = pearson(&[1.0, 2.0, 3.0], &[2.0, 4.0, 6.0]);
        assert!((r - 1.0).abs() < 1e-12);
        assert!(pearson(&[1.0, 1.0], &[0.0, 1.0]).is_nan());
    }

    #[test]
    fn sparse_columns_use_strict_threshold() {
        let ds = dataset("a,b,c,class\n1,na,na,pos\n2,2,na,neg\n");
        assert_eq!(sparse_columns(&ds, SPARSE_THRESHOLD), vec!["c"]);
        let ratios = missing_ratio(&ds);
        assert_eq!(ratios[1], ColumnMissing { column: "b".into(), ratio: 0.5 });
    }

    #[test]
    fn summary_bundles_distribution_and_faulty_rows() {
        let ds = dataset("s1,class\n1,neg\n2,pos\n3,neg\n4,pos\n");
        let summary = DatasetSummary::from_dataset(&ds, 1);
        assert_eq!(summary.rows, 4);
        assert_eq!(summary.class_distribution.faulty, 2);
        assert_eq!(summary.faulty_sample, vec![1, 3]);
        assert_eq!(summary.top_features.len(), 1);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["classDistribution"]["Faulty"], 2);
    }
}
