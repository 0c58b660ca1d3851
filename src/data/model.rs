use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Canonical name of the label column after ingestion.
pub const CLASS_COLUMN: &str = "class";
/// Label token for a faulty record.
pub const POSITIVE: &str = "pos";
/// Label token for a normal record.
pub const NEGATIVE: &str = "neg";

// ---------------------------------------------------------------------------
// Cell – a single raw value
// ---------------------------------------------------------------------------

/// A raw cell value. CSV input only ever produces `Text` and `Null`;
/// `Number` comes from JSON datasets or programmatic construction.
/// Distinct-value sets and frequency counts need `Ord` + `Hash`.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum Cell {
    #[default]
    Null,
    Number(f64),
    Text(String),
}

// -- Manual Eq/Ord/Hash so Cell can key BTreeMap / HashMap (NaN equals itself) --

impl PartialEq for Cell {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == std::cmp::Ordering::Equal
    }
}

impl Eq for Cell {}

impl PartialOrd for Cell {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Cell {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        use std::cmp::Ordering;
        fn discriminant(c: &Cell) -> u8 {
            match c {
                Cell::Null => 0,
                Cell::Number(_) => 1,
                Cell::Text(_) => 2,
            }
        }
        match (self, other) {
            (Cell::Null, Cell::Null) => Ordering::Equal,
            (Cell::Number(a), Cell::Number(b)) => a.total_cmp(b),
            (Cell::Text(a), Cell::Text(b)) => a.cmp(b),
            _ => discriminant(self).cmp(&discriminant(other)),
        }
    }
}

impl std::hash::Hash for Cell {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        std::mem::discriminant(self).hash(state);
        match self {
            Cell::Text(s) => s.hash(state),
            Cell::Number(f) => f.to_bits().hash(state),
            Cell::Null => {}
        }
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(s) => write!(f, "{s}"),
            Cell::Number(v) => write!(f, "{v}"),
            Cell::Null => write!(f, "<null>"),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Cell::Number(v)
    }
}

impl Cell {
    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Cell::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Numeric interpretation for downstream statistics. Text is parsed
    /// after trimming; `Null` and unparseable text give `None`.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Number(v) => Some(*v),
            Cell::Text(s) => s.trim().parse::<f64>().ok(),
            Cell::Null => None,
        }
    }

    /// Case-insensitive token comparison; only `Text` cells can match.
    pub fn is_token(&self, token: &str) -> bool {
        self.as_text()
            .is_some_and(|s| s.eq_ignore_ascii_case(token))
    }
}

// ---------------------------------------------------------------------------
// Record / Dataset
// ---------------------------------------------------------------------------

/// One row of the source file: column name → value.
pub type Record = BTreeMap<String, Cell>;

/// The fully materialised dataset. `columns` keeps header order,
/// `records` keeps file row order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub columns: Vec<String>,
    pub records: Vec<Record>,
}

impl Dataset {
    pub fn new(columns: Vec<String>, records: Vec<Record>) -> Self {
        Dataset { columns, records }
    }

    /// Number of records.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the dataset has no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.columns.iter().any(|c| c == name)
    }

    /// Values of one column in row order. Records lacking the key read as `Null`.
    pub fn column_values<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Cell> + 'a {
        static NULL: Cell = Cell::Null;
        self.records
            .iter()
            .map(move |rec| rec.get(name).unwrap_or(&NULL))
    }

    /// The first `limit` non-null values of a column.
    pub fn sample_non_null<'a>(&'a self, name: &'a str, limit: usize) -> Vec<&'a Cell> {
        self.column_values(name)
            .filter(|c| !c.is_null())
            .take(limit)
            .collect()
    }

    /// Normal/Faulty counts over the `class` column.
    pub fn class_distribution(&self) -> ClassDistribution {
        let faulty = self
            .column_values(CLASS_COLUMN)
            .filter(|c| c.as_text() == Some(POSITIVE))
            .count();
        ClassDistribution {
            normal: self.len() - faulty,
            faulty,
        }
    }
}

// ---------------------------------------------------------------------------
// ClassDistribution
// ---------------------------------------------------------------------------

/// Derived label counts. Anything that is not `pos` (including residual
/// unmapped labels) is counted as Normal, so `total()` always equals the
/// dataset size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ClassDistribution {
    #[serde(rename = "Normal")]
    pub normal: usize,
    #[serde(rename = "Faulty")]
    pub faulty: usize,
}

impl ClassDistribution {
    pub fn total(&self) -> usize {
        self.normal + self.faulty
    }

    /// Share of faulty records in `[0, 1]`; zero for an empty dataset.
    pub fn faulty_ratio(&self) -> f64 {
        if self.total() == 0 {
            0.0
        } else {
            self.faulty as f64 / self.total() as f64
        }
    }
}
