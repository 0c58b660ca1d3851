use std::collections::HashMap;

use log::{debug, info};
use serde::Serialize;

use super::model::{Cell, Dataset, CLASS_COLUMN, NEGATIVE, POSITIVE};
use crate::config::IngestConfig;
use crate::error::IngestError;

const POSITIVE_TOKENS: [&str; 4] = ["1", "positive", "true", "pos"];
const NEGATIVE_TOKENS: [&str; 4] = ["0", "negative", "false", "neg"];
const REPORTED_LIMIT: usize = 10;

// ---------------------------------------------------------------------------
// Discovery
// ---------------------------------------------------------------------------

/// Which discovery rule picked the label column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiscoveryRule {
    /// Header name matches one of the configured label names.
    NameMatch,
    /// Header's leading values contain `pos` / `neg`.
    TokenHeader,
    /// Header's values look binary (`pos`/`neg` further down, or only 0/1).
    ValueScan,
    /// Nothing matched; the last column was taken.
    LastColumn,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LabelSource {
    pub header: String,
    pub rule: DiscoveryRule,
}

/// Find the label column. Rules are tried in order and the first hit wins:
///
/// 1. header name: exact `class`, then any exact label name, then any
///    header containing a label name (all case-insensitive);
/// 2. first header whose first `token_sample` non-null values include
///    `pos` / `neg`;
/// 3. first header whose first `value_scan_sample` non-null values include
///    `pos` / `neg`, or consist only of `0` / `1`;
/// 4. the last header, if it holds a value in its first `fallback_rows` rows.
pub fn discover_label_column(
    dataset: &Dataset,
    config: &IngestConfig,
) -> Result<LabelSource, IngestError> {
    let found = |header: &String, rule| LabelSource {
        header: header.clone(),
        rule,
    };

    if let Some(h) = match_by_name(&dataset.columns, &config.label_names) {
        return Ok(found(h, DiscoveryRule::NameMatch));
    }

    if let Some(h) = dataset.columns.iter().find(|h| {
        dataset
            .sample_non_null(h, config.token_sample)
            .into_iter()
            .any(is_pos_neg)
    }) {
        return Ok(found(h, DiscoveryRule::TokenHeader));
    }

    if let Some(h) = dataset.columns.iter().find(|h| {
        let sample = dataset.sample_non_null(h, config.value_scan_sample);
        sample.iter().copied().any(is_pos_neg)
            || (!sample.is_empty() && sample.iter().copied().all(is_binary_digit))
    }) {
        return Ok(found(h, DiscoveryRule::ValueScan));
    }

    if let Some(last) = dataset.columns.last() {
        let has_value = dataset
            .column_values(last)
            .take(config.fallback_rows)
            .any(|c| !c.is_null());
        if has_value {
            info!("Using last column as class: {last}");
            return Ok(found(last, DiscoveryRule::LastColumn));
        }
    }

    Err(IngestError::TargetColumnNotFound {
        headers: dataset
            .columns
            .iter()
            .take(REPORTED_LIMIT)
            .cloned()
            .collect(),
        truncated: dataset.columns.len() > REPORTED_LIMIT,
    })
}

fn match_by_name<'a>(headers: &'a [String], names: &[String]) -> Option<&'a String> {
    let lowered: Vec<String> = names.iter().map(|n| n.to_lowercase()).collect();

    headers
        .iter()
        .find(|h| h.eq_ignore_ascii_case(CLASS_COLUMN))
        .or_else(|| {
            headers
                .iter()
                .find(|h| lowered.iter().any(|n| h.to_lowercase() == *n))
        })
        .or_else(|| {
            headers
                .iter()
                .find(|h| lowered.iter().any(|n| h.to_lowercase().contains(n.as_str())))
        })
}

fn is_pos_neg(cell: &Cell) -> bool {
    cell.is_token(POSITIVE) || cell.is_token(NEGATIVE)
}

fn is_binary_digit(cell: &Cell) -> bool {
    match cell {
        Cell::Number(v) => *v == 0.0 || *v == 1.0,
        Cell::Text(s) => s == "0" || s == "1",
        Cell::Null => false,
    }
}

/// Move the label column's values to `class`. The source column is removed,
/// not duplicated.
pub fn relocate_label(dataset: &mut Dataset, header: &str) {
    if header == CLASS_COLUMN {
        return;
    }
    for record in &mut dataset.records {
        let value = record.remove(header).unwrap_or_default();
        record.insert(CLASS_COLUMN.to_string(), value);
    }
    dataset.columns.retain(|c| c != header);
    if !dataset.has_column(CLASS_COLUMN) {
        dataset.columns.push(CLASS_COLUMN.to_string());
    }
    debug!("Relocated label column {header} -> {CLASS_COLUMN}");
}

// ---------------------------------------------------------------------------
// Normalisation
// ---------------------------------------------------------------------------

/// How `class` values were turned into `pos` / `neg`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum LabelMapping {
    /// Recognised tokens were mapped; `residual` lists distinct values that
    /// matched no token and were left unchanged.
    Known { residual: Vec<Cell> },
    /// No recognised token: the most frequent value became `neg`, the second
    /// most frequent `pos`. Values beyond those two are left in `unmapped`.
    Frequency {
        negative: Cell,
        positive: Cell,
        unmapped: Vec<Cell>,
    },
}

/// Map a known token to its canonical label. Strings compare
/// case-insensitively, numbers by value.
fn canonical_label(cell: &Cell) -> Option<&'static str> {
    match cell {
        Cell::Text(s) => {
            let lower = s.to_lowercase();
            if POSITIVE_TOKENS.contains(&lower.as_str()) {
                Some(POSITIVE)
            } else if NEGATIVE_TOKENS.contains(&lower.as_str()) {
                Some(NEGATIVE)
            } else {
                None
            }
        }
        Cell::Number(v) if *v == 1.0 => Some(POSITIVE),
        Cell::Number(v) if *v == 0.0 => Some(NEGATIVE),
        _ => None,
    }
}

/// Distinct non-null `class` values with their counts, in first-seen order.
fn value_counts(dataset: &Dataset) -> Vec<(Cell, usize)> {
    let mut index: HashMap<&Cell, usize> = HashMap::new();
    let mut counts: Vec<(Cell, usize)> = Vec::new();
    for cell in dataset.column_values(CLASS_COLUMN).filter(|c| !c.is_null()) {
        match index.get(cell) {
            Some(&i) => counts[i].1 += 1,
            None => {
                index.insert(cell, counts.len());
                counts.push((cell.clone(), 1));
            }
        }
    }
    counts
}

/// Rewrite every `class` value to `pos` / `neg`.
///
/// Values not covered by the chosen mapping are left as they are, so
/// callers must tolerate a residual non-binary label.
pub fn normalize_labels(dataset: &mut Dataset) -> Result<LabelMapping, IngestError> {
    let counts = value_counts(dataset);
    debug!(
        "Class column unique values: {:?}",
        counts.iter().map(|(c, _)| c.to_string()).collect::<Vec<_>>()
    );

    if counts.iter().any(|(c, _)| canonical_label(c).is_some()) {
        for record in &mut dataset.records {
            if let Some(cell) = record.get_mut(CLASS_COLUMN) {
                if let Some(label) = canonical_label(cell) {
                    *cell = Cell::from(label);
                }
            }
        }
        let residual: Vec<Cell> = counts
            .into_iter()
            .map(|(c, _)| c)
            .filter(|c| canonical_label(c).is_none())
            .collect();
        return Ok(LabelMapping::Known { residual });
    }

    info!("No obvious class values found, attempting binary classification");
    let mut ranked = counts;
    // Stable: ties keep first-seen order.
    ranked.sort_by(|a, b| b.1.cmp(&a.1));

    let mut ranked = ranked.into_iter().map(|(c, _)| c);
    let (negative, positive) = match (ranked.next(), ranked.next()) {
        (Some(n), Some(p)) => (n, p),
        (only, _) => {
            return Err(IngestError::UnresolvableBinaryLabel {
                values: only.iter().map(|c| c.to_string()).collect(),
            })
        }
    };
    let unmapped: Vec<Cell> = ranked.collect();

    for record in &mut dataset.records {
        if let Some(cell) = record.get_mut(CLASS_COLUMN) {
            if *cell == negative {
                *cell = Cell::from(NEGATIVE);
            } else if *cell == positive {
                *cell = Cell::from(POSITIVE);
            }
        }
    }
    info!("Mapped {negative} -> {NEGATIVE}, {positive} -> {POSITIVE}");

    Ok(LabelMapping::Frequency {
        negative,
        positive,
        unmapped,
    })
}

/// Outcome of label discovery plus normalisation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabelResolution {
    pub source: LabelSource,
    pub mapping: LabelMapping,
}

/// Discover the label column, move it to `class` and normalise its values.
pub fn resolve_label(
    dataset: &mut Dataset,
    config: &IngestConfig,
) -> Result<LabelResolution, IngestError> {
    let source = discover_label_column(dataset, config)?;
    relocate_label(dataset, &source.header);
    let mapping = normalize_labels(dataset)?;
    Ok(LabelResolution { source, mapping })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::Record;

    fn dataset(columns: &[&str], rows: &[&[&str]]) -> Dataset {
        let records = rows
            .iter()
            .map(|row| {
                columns
                    .iter()
                    .zip(row.iter())
                    .map(|(c, v)| {
                        let cell = if v.is_empty() { Cell::Null } else { Cell::from(*v) };
                        (c.to_string(), cell)
                    })
                    .collect::<Record>()
            })
            .collect();
        Dataset::new(columns.iter().map(|c| c.to_string()).collect(), records)
    }

    fn discover(ds: &Dataset) -> Result<LabelSource, IngestError> {
        discover_label_column(ds, &IngestConfig::default())
    }

    fn classes(ds: &Dataset) -> Vec<String> {
        ds.column_values(CLASS_COLUMN).map(|c| c.to_string()).collect()
    }

    #[test]
    fn name_match_prefers_exact_class_then_substring() {
        let ds = dataset(&["fault_code", "Class"], &[&["a", "pos"]]);
        let src = discover(&ds).unwrap();
        assert_eq!(src.header, "Class");
        assert_eq!(src.rule, DiscoveryRule::NameMatch);

        let ds = dataset(&["s1", "machine_status"], &[&["1", "ok"]]);
        assert_eq!(discover(&ds).unwrap().header, "machine_status");
    }

    #[test]
    fn token_header_found_in_leading_values() {
        let ds = dataset(&["s1", "outcome"], &[&["3", ""], &["4", "NEG"]]);
        let src = discover(&ds).unwrap();
        assert_eq!(src.header, "outcome");
        assert_eq!(src.rule, DiscoveryRule::TokenHeader);
    }

    #[test]
    fn value_scan_sees_tokens_beyond_the_token_sample() {
        let mut rows: Vec<Vec<&str>> = (0..15).map(|_| vec!["7", "x"]).collect();
        rows.push(vec!["8", "pos"]);
        let rows: Vec<&[&str]> = rows.iter().map(|r| r.as_slice()).collect();
        let ds = dataset(&["s1", "outcome"], &rows);
        let src = discover(&ds).unwrap();
        assert_eq!(src.header, "outcome");
        assert_eq!(src.rule, DiscoveryRule::ValueScan);
    }

    #[test]
    fn name_match_wins_over_leading_tokens() {
        let ds = dataset(&["outcome", "status"], &[&["pos", "ok"], &["neg", "fail"]]);
        let src = discover(&ds).unwrap();
        assert_eq!(src.header, "status");
        assert_eq!(src.rule, DiscoveryRule::NameMatch);
    }

    #[test]
    fn value_scan_stops_after_its_sample() {
        let tags: Vec<String> = (0..100).map(|i| format!("z{i}")).collect();
        let mut rows: Vec<Vec<&str>> = tags.iter().map(|t| vec!["7", t.as_str()]).collect();
        rows.push(vec!["7", "pos"]);
        let rows: Vec<&[&str]> = rows.iter().map(|r| r.as_slice()).collect();
        let ds = dataset(&["a", "b"], &rows);
        let src = discover(&ds).unwrap();
        assert_eq!(src.header, "b");
        assert_eq!(src.rule, DiscoveryRule::LastColumn);
    }

    #[test]
    fn value_scan_requires_binary_digits_only() {
        let ds = dataset(&["x", "y", "result"], &[&["1", "1", "1"], &["2", "0", "0"], &["3", "5", "1"]]);
        let src = discover(&ds).unwrap();
        assert_eq!(src.header, "result");
        assert_eq!(src.rule, DiscoveryRule::ValueScan);
    }

    #[test]
    fn last_column_fallback_needs_a_leading_value() {
        let ds = dataset(&["a", "b"], &[&["x", "y"]]);
        let src = discover(&ds).unwrap();
        assert_eq!(src.header, "b");
        assert_eq!(src.rule, DiscoveryRule::LastColumn);

        let mut rows: Vec<Vec<&str>> = (0..10).map(|_| vec!["x", ""]).collect();
        rows.push(vec!["x", "late"]);
        let rows: Vec<&[&str]> = rows.iter().map(|r| r.as_slice()).collect();
        let ds = dataset(&["a", "b"], &rows);
        match discover(&ds).unwrap_err() {
            IngestError::TargetColumnNotFound { headers, truncated } => {
                assert_eq!(headers, vec!["a", "b"]);
                assert!(!truncated);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn not_found_lists_at_most_ten_headers() {
        let cols: Vec<String> = (0..12).map(|i| format!("c{i}")).collect();
        let col_refs: Vec<&str> = cols.iter().map(|s| s.as_str()).collect();
        let ds = dataset(&col_refs, &[&["x"]]);
        let err = discover(&ds).unwrap_err();
        assert!(err.to_string().ends_with("c9..."));
    }

    #[test]
    fn relocate_renames_instead_of_copying() {
        let mut ds = dataset(&["target", "s1"], &[&["pos", "1"]]);
        relocate_label(&mut ds, "target");
        assert_eq!(ds.columns, vec!["s1", "class"]);
        assert!(!ds.records[0].contains_key("target"));
        assert_eq!(ds.records[0]["class"], Cell::from("pos"));
    }

    #[test]
    fn known_tokens_map_and_residuals_survive() {
        let mut ds = dataset(
            &["class"],
            &[&["TRUE"], &["negative"], &["1"], &["0"], &["maybe"], &[""]],
        );
        let mapping = normalize_labels(&mut ds).unwrap();
        assert_eq!(classes(&ds), vec!["pos", "neg", "pos", "neg", "maybe", "<null>"]);
        assert_eq!(
            mapping,
            LabelMapping::Known {
                residual: vec![Cell::from("maybe")]
            }
        );
    }

    #[test]
    fn numeric_labels_match_by_value() {
        let mut ds = Dataset::new(
            vec!["class".into()],
            [1.0, 0.0, 2.0]
                .iter()
                .map(|v| Record::from([("class".to_string(), Cell::Number(*v))]))
                .collect(),
        );
        normalize_labels(&mut ds).unwrap();
        assert_eq!(classes(&ds), vec!["pos", "neg", "2"]);
    }

    #[test]
    fn frequency_fallback_maps_top_two_and_breaks_ties_by_first_seen() {
        let mut ds = dataset(&["class"], &[&["b"], &["a"], &["a"], &["b"], &["c"]]);
        let mapping = normalize_labels(&mut ds).unwrap();
        assert_eq!(classes(&ds), vec!["neg", "pos", "pos", "neg", "c"]);
        assert_eq!(
            mapping,
            LabelMapping::Frequency {
                negative: Cell::from("b"),
                positive: Cell::from("a"),
                unmapped: vec![Cell::from("c")],
            }
        );
    }

    #[test]
    fn single_value_is_unresolvable() {
        let mut ds = dataset(&["class"], &[&["X"], &["X"]]);
        match normalize_labels(&mut ds).unwrap_err() {
            IngestError::UnresolvableBinaryLabel { values } => assert_eq!(values, vec!["X"]),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn resolve_is_idempotent_on_normalised_data() {
        let mut ds = dataset(&["s1", "class"], &[&["1", "pos"], &["2", "neg"]]);
        let before = ds.clone();
        let res = resolve_label(&mut ds, &IngestConfig::default()).unwrap();
        assert_eq!(ds, before);
        assert_eq!(res.source.header, "class");
        assert_eq!(res.mapping, LabelMapping::Known { residual: vec![] });
    }
}
