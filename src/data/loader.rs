use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;

use log::{debug, warn};
use serde::Serialize;
use serde_json::Value as JsonValue;

use super::model::{Cell, Dataset, Record};
use crate::config::IngestConfig;
use crate::error::IngestError;

// ---------------------------------------------------------------------------
// Parse diagnostics
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DiagnosticKind {
    /// Unterminated quoted field.
    Quotes,
    /// Delimiter cannot be used to split the input.
    Delimiter,
    /// Input is not valid UTF-8.
    Encoding,
    /// A row has more or fewer fields than the header.
    FieldMismatch,
}

impl DiagnosticKind {
    /// Critical diagnostics abort ingestion; the rest are only logged.
    pub fn is_critical(self) -> bool {
        !matches!(self, DiagnosticKind::FieldMismatch)
    }
}

/// One problem reported while splitting the input into fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParseDiagnostic {
    pub kind: DiagnosticKind,
    /// 1-based line number, when known.
    pub line: Option<u64>,
    pub message: String,
}

impl ParseDiagnostic {
    fn new(kind: DiagnosticKind, line: Option<u64>, message: impl Into<String>) -> Self {
        ParseDiagnostic {
            kind,
            line,
            message: message.into(),
        }
    }
}

impl fmt::Display for ParseDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.line {
            Some(line) => write!(f, "{} (line {line})", self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Output of the parse stage, before any label handling.
#[derive(Debug, Clone)]
pub struct ParsedTable {
    pub dataset: Dataset,
    /// Non-critical diagnostics; critical ones are returned as errors.
    pub diagnostics: Vec<ParseDiagnostic>,
    /// Rows dropped because every cell was null.
    pub dropped_rows: usize,
}

// ---------------------------------------------------------------------------
// Public entry-point
// ---------------------------------------------------------------------------

/// Load a tabular file.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv` / `.txt` – delimited text with a header row
/// * `.tsv`          – same, tab-delimited
/// * `.json`         – `[{ "col": value, ... }, ...]`
pub fn load_file(path: &Path, config: &IngestConfig) -> Result<ParsedTable, IngestError> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let bytes = match ext.as_str() {
        "csv" | "txt" | "tsv" | "json" => std::fs::read(path).map_err(|source| IngestError::Io {
            path: path.to_path_buf(),
            source,
        })?,
        other => return Err(IngestError::UnsupportedExtension(other.to_string())),
    };
    debug!("Read {} bytes from {}", bytes.len(), path.display());

    let text = String::from_utf8(bytes).map_err(|e| {
        IngestError::MalformedDelimiter(ParseDiagnostic::new(
            DiagnosticKind::Encoding,
            None,
            format!("invalid UTF-8 at byte {}", e.utf8_error().valid_up_to()),
        ))
    })?;

    match ext.as_str() {
        "json" => parse_json_str(&text, config),
        "tsv" => {
            let tsv = IngestConfig {
                delimiter: '\t',
                ..config.clone()
            };
            parse_csv_str(&text, &tsv)
        }
        _ => parse_csv_str(&text, config),
    }
}

// ---------------------------------------------------------------------------
// CSV loader
// ---------------------------------------------------------------------------

/// Parse delimited text with a header row.
///
/// Header names and cells are trimmed, null tokens become [`Cell::Null`],
/// every other cell stays text. Rows that end up entirely null are dropped.
pub fn parse_csv_str(text: &str, config: &IngestConfig) -> Result<ParsedTable, IngestError> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let delimiter = match u8::try_from(config.delimiter) {
        Ok(b) if b.is_ascii() && b != b'"' && b != b'\n' && b != b'\r' => b,
        _ => {
            return Err(IngestError::MalformedDelimiter(ParseDiagnostic::new(
                DiagnosticKind::Delimiter,
                None,
                format!("unusable delimiter {:?}", config.delimiter),
            )))
        }
    };

    if let Some(line) = unterminated_quote_line(text, delimiter) {
        return Err(IngestError::MalformedDelimiter(ParseDiagnostic::new(
            DiagnosticKind::Quotes,
            Some(line),
            "Quoted field unterminated",
        )));
    }

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .flexible(true)
        .has_headers(true)
        .from_reader(text.as_bytes());

    let headers = dedupe_headers(
        reader
            .headers()
            .map_err(csv_diagnostic)?
            .iter()
            .map(|h| h.trim().to_string())
            .collect(),
    );

    let mut records = Vec::new();
    let mut diagnostics = Vec::new();
    let mut dropped_rows = 0;

    for result in reader.records() {
        let row = result.map_err(csv_diagnostic)?;
        let line = row.position().map(|p| p.line());

        let record: Record = headers
            .iter()
            .enumerate()
            .map(|(idx, name)| (name.clone(), text_cell(row.get(idx).unwrap_or(""), config)))
            .collect();

        if is_blank(&record) {
            dropped_rows += 1;
            continue;
        }

        if row.len() != headers.len() {
            let diag = ParseDiagnostic::new(
                DiagnosticKind::FieldMismatch,
                line,
                format!(
                    "expected {} fields but parsed {}",
                    headers.len(),
                    row.len()
                ),
            );
            warn!("CSV parsing diagnostic: {diag}");
            diagnostics.push(diag);
        }
        records.push(record);
    }

    finish(headers, records, diagnostics, dropped_rows)
}

fn text_cell(raw: &str, config: &IngestConfig) -> Cell {
    let trimmed = raw.trim();
    if config.is_null_token(trimmed) {
        Cell::Null
    } else {
        Cell::Text(trimmed.to_string())
    }
}

fn is_blank(record: &Record) -> bool {
    record.values().all(Cell::is_null)
}

fn finish(
    columns: Vec<String>,
    records: Vec<Record>,
    diagnostics: Vec<ParseDiagnostic>,
    dropped_rows: usize,
) -> Result<ParsedTable, IngestError> {
    if records.is_empty() {
        return Err(IngestError::EmptyFile);
    }
    debug!(
        "Parsed {} records x {} columns ({dropped_rows} blank rows dropped)",
        records.len(),
        columns.len()
    );
    Ok(ParsedTable {
        dataset: Dataset::new(columns, records),
        diagnostics,
        dropped_rows,
    })
}

/// Column names handed out so far. A repeated name gets `_1`, `_2`, ...
/// so no column is shadowed.
#[derive(Default)]
struct ColumnNames {
    taken: HashSet<String>,
}

impl ColumnNames {
    fn claim(&mut self, name: &str) -> String {
        let mut candidate = name.to_string();
        let mut n = 0;
        while self.taken.contains(&candidate) {
            n += 1;
            candidate = format!("{name}_{n}");
        }
        self.taken.insert(candidate.clone());
        candidate
    }
}

fn dedupe_headers(headers: Vec<String>) -> Vec<String> {
    let mut names = ColumnNames::default();
    headers.iter().map(|h| names.claim(h)).collect()
}

/// Line on which a quoted field opens without ever closing, if any.
/// Quotes only open a field at its start; `""` inside a quoted field is an
/// escaped quote.
fn unterminated_quote_line(text: &str, delimiter: u8) -> Option<u64> {
    let bytes = text.as_bytes();
    let mut line: u64 = 1;
    let mut opened_at = 0;
    let mut in_quotes = false;
    let mut at_field_start = true;
    let mut i = 0;

    while i < bytes.len() {
        let b = bytes[i];
        if in_quotes {
            if b == b'"' {
                if bytes.get(i + 1) == Some(&b'"') {
                    i += 1;
                } else {
                    in_quotes = false;
                }
            } else if b == b'\n' {
                line += 1;
            }
        } else if b == b'"' && at_field_start {
            in_quotes = true;
            opened_at = line;
        } else if b == b'\n' {
            line += 1;
        }
        at_field_start = !in_quotes && (b == delimiter || b == b'\n' || b == b'\r');
        i += 1;
    }

    in_quotes.then_some(opened_at)
}

fn csv_diagnostic(err: csv::Error) -> IngestError {
    let line = err.position().map(|p| p.line());
    let kind = match err.kind() {
        csv::ErrorKind::Utf8 { .. } => DiagnosticKind::Encoding,
        _ => DiagnosticKind::Delimiter,
    };
    IngestError::MalformedDelimiter(ParseDiagnostic::new(kind, line, err.to_string()))
}

// ---------------------------------------------------------------------------
// JSON loader
// ---------------------------------------------------------------------------

/// Records-oriented JSON (`df.to_json(orient='records')`):
///
/// ```json
/// [
///   { "aa_000": 2.31, "ab_001": "na", "class": "neg" },
///   ...
/// ]
/// ```
///
/// Column order is the order in which keys are first seen.
pub fn parse_json_str(text: &str, config: &IngestConfig) -> Result<ParsedTable, IngestError> {
    let root: JsonValue =
        serde_json::from_str(text).map_err(|e| IngestError::InvalidJson(e.to_string()))?;
    let rows = root
        .as_array()
        .ok_or_else(|| IngestError::InvalidJson("expected top-level JSON array".to_string()))?;

    let mut columns: Vec<String> = Vec::new();
    let mut names = ColumnNames::default();
    // (trimmed key, nth occurrence within a row) -> column name
    let mut slots: HashMap<(String, usize), String> = HashMap::new();
    let mut raw: Vec<Record> = Vec::with_capacity(rows.len());

    for (i, row) in rows.iter().enumerate() {
        let obj = row
            .as_object()
            .ok_or_else(|| IngestError::InvalidJson(format!("row {i} is not a JSON object")))?;

        let mut seen: HashMap<&str, usize> = HashMap::new();
        let mut record = Record::new();
        for (key, val) in obj {
            let key = key.trim();
            let nth = seen.entry(key).or_insert(0);
            let slot = (key.to_string(), *nth);
            *nth += 1;

            let column = match slots.get(&slot) {
                Some(column) => column.clone(),
                None => {
                    let column = names.claim(key);
                    columns.push(column.clone());
                    slots.insert(slot, column.clone());
                    column
                }
            };
            record.insert(column, json_to_cell(val, config));
        }
        raw.push(record);
    }

    // Fill keys absent from earlier rows so all records share one column set.
    let mut records = Vec::with_capacity(raw.len());
    let mut dropped_rows = 0;
    for mut record in raw {
        for col in &columns {
            record.entry(col.clone()).or_insert(Cell::Null);
        }
        if is_blank(&record) {
            dropped_rows += 1;
        } else {
            records.push(record);
        }
    }

    finish(columns, records, Vec::new(), dropped_rows)
}

fn json_to_cell(val: &JsonValue, config: &IngestConfig) -> Cell {
    match val {
        JsonValue::Null => Cell::Null,
        JsonValue::String(s) => text_cell(s, config),
        JsonValue::Number(n) => n
            .as_f64()
            .map(Cell::Number)
            .unwrap_or_else(|| Cell::Text(n.to_string())),
        JsonValue::Bool(b) => Cell::Text(b.to_string()),
        other => Cell::Text(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn parse(text: &str) -> ParsedTable {
        parse_csv_str(text, &IngestConfig::default()).unwrap()
    }

    #[test]
    fn trims_headers_and_cells_and_nulls_na() {
        let table = parse(" a , b \n 1 , NA \n  , x\n");
        let ds = &table.dataset;
        assert_eq!(ds.columns, vec!["a", "b"]);
        assert_eq!(ds.records[0]["a"], Cell::from("1"));
        assert_eq!(ds.records[0]["b"], Cell::Null);
        assert_eq!(ds.records[1]["a"], Cell::Null);
        assert_eq!(ds.records[1]["b"], Cell::from("x"));
    }

    #[test]
    fn drops_rows_that_are_entirely_blank() {
        let table = parse("a,b\n1,2\n , \nna,NA\n3,4\n");
        assert_eq!(table.dataset.len(), 2);
        assert_eq!(table.dropped_rows, 2);
    }

    #[test]
    fn header_only_file_is_empty() {
        let err = parse_csv_str("a,b\n", &IngestConfig::default()).unwrap_err();
        assert!(matches!(err, IngestError::EmptyFile));
        let err = parse_csv_str("a,b\n,\n", &IngestConfig::default()).unwrap_err();
        assert!(matches!(err, IngestError::EmptyFile));
    }

    #[test]
    fn field_count_mismatch_is_not_fatal() {
        let table = parse("a,b,c\n1,2\n4,5,6,7\n");
        assert_eq!(table.dataset.len(), 2);
        assert_eq!(table.dataset.records[0]["c"], Cell::Null);
        assert_eq!(table.diagnostics.len(), 2);
        assert!(table
            .diagnostics
            .iter()
            .all(|d| d.kind == DiagnosticKind::FieldMismatch && !d.kind.is_critical()));
    }

    #[test]
    fn unterminated_quote_aborts() {
        let err = parse_csv_str("a,b\n1,\"open\n2,3\n", &IngestConfig::default()).unwrap_err();
        match err {
            IngestError::MalformedDelimiter(diag) => {
                assert_eq!(diag.kind, DiagnosticKind::Quotes);
                assert_eq!(diag.line, Some(2));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn escaped_and_embedded_quotes_are_fine() {
        let table = parse("a,b\n\"say \"\"hi\"\"\",2\nx\"y,3\n");
        assert_eq!(table.dataset.records[0]["a"], Cell::from("say \"hi\""));
        assert_eq!(table.dataset.records[1]["a"], Cell::from("x\"y"));
    }

    #[test]
    fn non_ascii_delimiter_is_critical() {
        let cfg = IngestConfig {
            delimiter: '→',
            ..IngestConfig::default()
        };
        let err = parse_csv_str("a→b\n1→2\n", &cfg).unwrap_err();
        assert!(matches!(
            err,
            IngestError::MalformedDelimiter(ParseDiagnostic { kind: DiagnosticKind::Delimiter, .. })
        ));
    }

    #[test]
    fn duplicate_headers_are_suffixed() {
        assert_eq!(
            dedupe_headers(vec!["a".into(), "a".into(), "b".into(), "a".into()]),
            vec!["a", "a_1", "b", "a_2"]
        );
    }

    #[test]
    fn json_records_keep_key_order_and_types() {
        let table = parse_json_str(
            r#"[{"s1": 1.5, "flag": true, "class": "pos"}, {"s1": null, "class": " NA "}, {"s1": 2, "extra": "x"}]"#,
            &IngestConfig::default(),
        )
        .unwrap();
        let ds = &table.dataset;
        assert_eq!(ds.columns, vec!["s1", "flag", "class", "extra"]);
        assert_eq!(ds.records[0]["s1"], Cell::Number(1.5));
        assert_eq!(ds.records[0]["flag"], Cell::from("true"));
        assert_eq!(ds.records[0]["extra"], Cell::Null);
        assert_eq!(ds.len(), 2);
        assert_eq!(table.dropped_rows, 1);
    }

    #[test]
    fn json_keys_that_trim_alike_stay_separate_columns() {
        let table = parse_json_str(
            r#"[{"a": 1, " a ": 2, "class": "pos"}, {"a": 3, "a ": 4, "class": "neg"}]"#,
            &IngestConfig::default(),
        )
        .unwrap();
        let ds = &table.dataset;
        assert_eq!(ds.columns, vec!["a", "a_1", "class"]);
        assert_eq!(ds.records[0]["a"], Cell::Number(1.0));
        assert_eq!(ds.records[0]["a_1"], Cell::Number(2.0));
        assert_eq!(ds.records[1]["a"], Cell::Number(3.0));
        assert_eq!(ds.records[1]["a_1"], Cell::Number(4.0));
    }

    #[test]
    fn whitespace_only_line_is_dropped_without_diagnostic() {
        let table = parse("a,b\n1,2\n   \n3,4\n");
        assert_eq!(table.dataset.len(), 2);
        assert_eq!(table.dropped_rows, 1);
        assert!(table.diagnostics.is_empty());
    }

    #[test]
    fn load_file_dispatches_by_extension() {
        let dir = tempfile::tempdir().unwrap();

        let tsv = dir.path().join("data.tsv");
        std::fs::File::create(&tsv)
            .unwrap()
            .write_all(b"a\tb\n1\t2\n")
            .unwrap();
        let table = load_file(&tsv, &IngestConfig::default()).unwrap();
        assert_eq!(table.dataset.columns, vec!["a", "b"]);

        let xlsx = dir.path().join("data.xlsx");
        std::fs::write(&xlsx, b"").unwrap();
        assert!(matches!(
            load_file(&xlsx, &IngestConfig::default()),
            Err(IngestError::UnsupportedExtension(ext)) if ext == "xlsx"
        ));

        let bad = dir.path().join("bad.csv");
        std::fs::write(&bad, [b'a', b'\n', 0xff, b'\n']).unwrap();
        assert!(matches!(
            load_file(&bad, &IngestConfig::default()),
            Err(IngestError::MalformedDelimiter(ParseDiagnostic { kind: DiagnosticKind::Encoding, .. }))
        ));
    }
}
