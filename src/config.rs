use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

// ---------------------------------------------------------------------------
// Ingestion settings
// ---------------------------------------------------------------------------

/// Knobs for parsing and label discovery. Defaults reproduce the
/// dashboard's upload behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Field delimiter. Must be a single ASCII character.
    pub delimiter: char,
    /// Cell values (compared case-insensitively after trimming) read as null.
    pub null_tokens: Vec<String>,
    /// Header names that mark a label column (substring, case-insensitive).
    pub label_names: Vec<String>,
    /// Non-null cells inspected when looking for `pos`/`neg` headers.
    pub token_sample: usize,
    /// Non-null cells inspected by the value scan.
    pub value_scan_sample: usize,
    /// Leading rows that must hold a value for the last-column fallback.
    pub fallback_rows: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            delimiter: ',',
            null_tokens: vec!["na".to_string()],
            label_names: ["class", "target", "label", "failure", "fault", "status"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            token_sample: 10,
            value_scan_sample: 100,
            fallback_rows: 10,
        }
    }
}

impl IngestConfig {
    pub fn is_null_token(&self, trimmed: &str) -> bool {
        trimmed.is_empty()
            || self
                .null_tokens
                .iter()
                .any(|t| t.eq_ignore_ascii_case(trimmed))
    }
}

// ---------------------------------------------------------------------------
// Analysis service settings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServiceConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5000".to_string(),
            timeout_secs: 120,
        }
    }
}

impl ServiceConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

// ---------------------------------------------------------------------------
// Top-level config file
// ---------------------------------------------------------------------------

/// Contents of the optional TOML config file:
///
/// ```toml
/// [ingest]
/// delimiter = ";"
/// null_tokens = ["na", "n/a"]
///
/// [service]
/// base_url = "http://analysis.local:5000"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub ingest: IngestConfig,
    pub service: ServiceConfig,
}

impl Config {
    pub fn from_toml_str(text: &str, origin: &Path) -> Result<Self, ConfigError> {
        toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&text, path)
    }
}
