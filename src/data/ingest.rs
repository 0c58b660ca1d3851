use std::path::Path;

use log::info;
use serde::Serialize;

use super::label::{resolve_label, LabelResolution};
use super::loader::{self, ParseDiagnostic, ParsedTable};
use super::model::Dataset;
use crate::config::IngestConfig;
use crate::error::IngestError;

/// A dataset ready for display or upload, with a record of how it got there.
#[derive(Debug, Clone, Serialize)]
pub struct IngestOutcome {
    pub dataset: Dataset,
    pub label: LabelResolution,
    /// Non-critical parse diagnostics.
    pub diagnostics: Vec<ParseDiagnostic>,
    pub dropped_rows: usize,
}

/// Parse CSV text and normalise its label column.
pub fn ingest_str(text: &str, config: &IngestConfig) -> Result<IngestOutcome, IngestError> {
    finish(loader::parse_csv_str(text, config)?, config)
}

/// Load a file (format chosen by extension) and normalise its label column.
pub fn ingest_file(path: &Path, config: &IngestConfig) -> Result<IngestOutcome, IngestError> {
    let outcome = finish(loader::load_file(path, config)?, config)?;
    info!(
        "Ingested {} records from {} (label from '{}')",
        outcome.dataset.len(),
        path.display(),
        outcome.label.source.header
    );
    Ok(outcome)
}

fn finish(table: ParsedTable, config: &IngestConfig) -> Result<IngestOutcome, IngestError> {
    let ParsedTable {
        mut dataset,
        diagnostics,
        dropped_rows,
    } = table;
    let label = resolve_label(&mut dataset, config)?;
    Ok(IngestOutcome {
        dataset,
        label,
        diagnostics,
        dropped_rows,
    })
}
