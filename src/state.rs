use std::path::Path;

use log::{error, info};
use serde::Serialize;

use crate::analysis::client::{AnalysisClient, AnalysisKind};
use crate::analysis::report::AnalysisResult;
use crate::analysis::summary::{DatasetSummary, DEFAULT_TOP_FEATURES};
use crate::config::IngestConfig;
use crate::data::ingest::{ingest_file, ingest_str, IngestOutcome};
use crate::error::{IngestError, SessionError};

// ---------------------------------------------------------------------------
// Status line
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StatusKind {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Status {
    pub kind: StatusKind,
    pub message: String,
}

impl Status {
    fn new(kind: StatusKind, message: impl Into<String>) -> Self {
        Status {
            kind,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// Session state
// ---------------------------------------------------------------------------

/// Everything one upload session owns, independent of rendering.
///
/// A failed ingestion or analysis leaves the previous dataset and result
/// in place; only the status line changes.
pub struct Session {
    config: IngestConfig,

    /// Number of correlated features kept in the summary.
    pub top_features: usize,

    /// Ingested dataset (None until a file loads successfully).
    pub ingested: Option<IngestOutcome>,

    /// Local statistics for `ingested`.
    pub summary: Option<DatasetSummary>,

    /// Last analysis service result for the current dataset.
    pub result: Option<AnalysisResult>,

    /// Status / error message for the user.
    pub status: Option<Status>,

    /// Whether an ingestion or analysis is in flight.
    busy: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self::new(IngestConfig::default())
    }
}

impl Session {
    pub fn new(config: IngestConfig) -> Self {
        Self {
            config,
            top_features: DEFAULT_TOP_FEATURES,
            ingested: None,
            summary: None,
            result: None,
            status: None,
            busy: false,
        }
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Mark an externally driven operation (e.g. an upload awaiting the
    /// reader) as in flight.
    pub fn set_busy(&mut self, busy: bool) {
        self.busy = busy;
    }

    /// Ingest CSV text.
    pub fn load_str(&mut self, text: &str) -> Result<&IngestOutcome, SessionError> {
        self.ingest_with(|cfg| ingest_str(text, cfg))
    }

    /// Ingest a file, format chosen by extension.
    pub fn load_file(&mut self, path: &Path) -> Result<&IngestOutcome, SessionError> {
        self.ingest_with(|cfg| ingest_file(path, cfg))
    }

    fn ingest_with<F>(&mut self, ingest: F) -> Result<&IngestOutcome, SessionError>
    where
        F: FnOnce(&IngestConfig) -> Result<IngestOutcome, IngestError>,
    {
        if self.busy {
            return Err(SessionError::Busy);
        }
        self.busy = true;
        let outcome = ingest(&self.config);
        self.busy = false;

        match outcome {
            Ok(outcome) => {
                let summary = DatasetSummary::from_dataset(&outcome.dataset, self.top_features);
                self.status = Some(Status::new(
                    StatusKind::Success,
                    format!("Loaded {} records", outcome.dataset.len()),
                ));
                self.summary = Some(summary);
                self.result = None;
                let stored: &IngestOutcome = self.ingested.insert(outcome);
                Ok(stored)
            }
            Err(e) => {
                error!("Ingestion failed: {e}");
                self.status = Some(Status::new(StatusKind::Error, e.to_string()));
                Err(e.into())
            }
        }
    }

    /// Send the current dataset to the analysis service and keep the result.
    pub fn run_analysis(
        &mut self,
        client: &AnalysisClient,
        kind: AnalysisKind,
    ) -> Result<&AnalysisResult, SessionError> {
        if self.busy {
            return Err(SessionError::Busy);
        }
        let Some(ingested) = &self.ingested else {
            self.status = Some(Status::new(
                StatusKind::Error,
                SessionError::NoDataset.to_string(),
            ));
            return Err(SessionError::NoDataset);
        };

        self.busy = true;
        self.status = Some(Status::new(StatusKind::Info, kind.progress_message()));
        let outcome = client.run(kind, &ingested.dataset);
        self.busy = false;

        match outcome {
            Ok(result) => Ok(self.set_result(result)),
            Err(e) => {
                error!("Analysis failed: {e}");
                self.status = Some(Status::new(StatusKind::Error, format!("Error: {e}")));
                Err(e.into())
            }
        }
    }

    /// Store a result obtained elsewhere.
    pub fn set_result(&mut self, result: AnalysisResult) -> &AnalysisResult {
        let message = match &result {
            AnalysisResult::Anomalies(_) => "Anomaly detection completed successfully",
            AnalysisResult::Classification(_) => "Fault classification completed successfully",
            AnalysisResult::RootCause(_) => "Root cause analysis completed successfully",
        };
        info!("{message}");
        self.status = Some(Status::new(StatusKind::Success, message));
        self.result.insert(result)
    }

    /// Drop everything from the current session.
    pub fn reset(&mut self) {
        self.ingested = None;
        self.summary = None;
        self.result = None;
        self.status = None;
        self.busy = false;
    }
}
