use std::path::PathBuf;

use thiserror::Error;

use crate::data::loader::ParseDiagnostic;

// ---------------------------------------------------------------------------
// Ingestion errors
// ---------------------------------------------------------------------------

/// Everything that can abort one ingestion attempt.
///
/// All variants are recoverable: the caller shows the message and keeps
/// whatever state it had before the attempt.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("No valid data rows found in file")]
    EmptyFile,

    #[error(
        "Could not identify target column. Please ensure the file has a column with \
         \"pos\"/\"neg\" or \"0\"/\"1\" values. Found columns: {}{}",
        headers.join(", "),
        if *truncated { "..." } else { "" }
    )]
    TargetColumnNotFound { headers: Vec<String>, truncated: bool },

    #[error(
        "Unable to identify binary classification in target column. Found values: {}",
        values.join(", ")
    )]
    UnresolvableBinaryLabel { values: Vec<String> },

    #[error("Error parsing CSV file: {0}")]
    MalformedDelimiter(ParseDiagnostic),

    #[error("Unsupported file extension: .{0}")]
    UnsupportedExtension(String),

    #[error("Invalid JSON dataset: {0}")]
    InvalidJson(String),

    #[error("reading {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Configuration errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },
}

// ---------------------------------------------------------------------------
// Analysis service errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("analysis service returned {status}: {message}")]
    Service { status: u16, message: String },

    #[error("unexpected response from analysis service: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("serialising dataset for upload: {0}")]
    Encode(#[from] csv::Error),
}

// ---------------------------------------------------------------------------
// Session errors
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("another operation is still in progress")]
    Busy,

    #[error("Please upload a CSV file first")]
    NoDataset,

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Client(#[from] ClientError),
}
