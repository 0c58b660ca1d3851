use log::{debug, info};
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::report::AnalysisResult;
use crate::config::ServiceConfig;
use crate::data::export::to_csv_bytes;
use crate::data::model::Dataset;
use crate::error::ClientError;

/// Which analysis the service should run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, clap::ValueEnum)]
pub enum AnalysisKind {
    Anomalies,
    Classification,
    RootCause,
}

impl AnalysisKind {
    pub fn progress_message(self) -> &'static str {
        match self {
            AnalysisKind::Anomalies => "Detecting anomalies using Z-Score analysis...",
            AnalysisKind::Classification => "Classifying faults using Random Forest...",
            AnalysisKind::RootCause => {
                "Identifying root cause sensors using feature importance..."
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
}

/// Blocking client for the external analysis service.
///
/// Every upload sends the normalised dataset as a multipart `file` part,
/// so the service always sees a `class` column holding `pos` / `neg`.
pub struct AnalysisClient {
    http: Client,
    base_url: String,
}

impl AnalysisClient {
    pub fn new(config: &ServiceConfig) -> Result<Self, ClientError> {
        let http = Client::builder().timeout(config.timeout()).build()?;
        Ok(AnalysisClient {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// `GET /api/health`; returns the service's JSON body as-is.
    pub fn health(&self) -> Result<serde_json::Value, ClientError> {
        let resp = self.http.get(self.url("/api/health")).send()?;
        decode(resp)
    }

    pub fn detect_anomalies(&self, dataset: &Dataset) -> Result<AnalysisResult, ClientError> {
        self.upload("/api/detect-anomalies", dataset)
    }

    pub fn classify_faults(&self, dataset: &Dataset) -> Result<AnalysisResult, ClientError> {
        self.upload("/api/classify-faults", dataset)
    }

    /// Root-cause analysis needs a trained model, so classification runs first.
    pub fn root_cause(&self, dataset: &Dataset) -> Result<AnalysisResult, ClientError> {
        self.classify_faults(dataset)?;
        let resp = self.http.post(self.url("/api/root-cause")).send()?;
        decode(resp)
    }

    pub fn run(&self, kind: AnalysisKind, dataset: &Dataset) -> Result<AnalysisResult, ClientError> {
        info!("{}", kind.progress_message());
        match kind {
            AnalysisKind::Anomalies => self.detect_anomalies(dataset),
            AnalysisKind::Classification => self.classify_faults(dataset),
            AnalysisKind::RootCause => self.root_cause(dataset),
        }
    }

    fn upload(&self, path: &str, dataset: &Dataset) -> Result<AnalysisResult, ClientError> {
        let bytes = to_csv_bytes(dataset)?;
        debug!("Uploading {} bytes to {path}", bytes.len());
        let part = Part::bytes(bytes)
            .file_name("upload.csv")
            .mime_str("text/csv")?;
        let form = Form::new().part("file", part);
        let resp = self.http.post(self.url(path)).multipart(form).send()?;
        decode(resp)
    }
}

fn decode<T: DeserializeOwned>(resp: Response) -> Result<T, ClientError> {
    let status = resp.status().as_u16();
    let body = resp.text()?;
    decode_body(status, &body)
}

/// Turn a status code and body into a typed value, surfacing the service's
/// `error` field on failure.
fn decode_body<T: DeserializeOwned>(status: u16, body: &str) -> Result<T, ClientError> {
    if !(200..300).contains(&status) {
        let message = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|b| b.error)
            .unwrap_or_else(|| body.trim().to_string());
        return Err(ClientError::Service { status, message });
    }
    Ok(serde_json::from_str(body)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_body_decodes_to_result() {
        let result: AnalysisResult = decode_body(
            200,
            r#"{"type":"rootcause","data":{"topSensors":[{"name":"aa_000","importance":0.2}]}}"#,
        )
        .unwrap();
        assert!(matches!(result, AnalysisResult::RootCause(r) if r.top_sensors.len() == 1));
    }

    #[test]
    fn error_body_surfaces_service_message() {
        let err = decode_body::<AnalysisResult>(400, r#"{"error": "No file uploaded"}"#).unwrap_err();
        match err {
            ClientError::Service { status, message } => {
                assert_eq!(status, 400);
                assert_eq!(message, "No file uploaded");
            }
            other => panic!("unexpected error: {other:?}"),
        }

        let err = decode_body::<AnalysisResult>(502, "Bad Gateway\n").unwrap_err();
        assert_eq!(err.to_string(), "analysis service returned 502: Bad Gateway");
    }

    #[test]
    fn malformed_success_body_is_a_decode_error() {
        let err = decode_body::<AnalysisResult>(200, r#"{"type":"anomalies"}"#).unwrap_err();
        assert!(matches!(err, ClientError::Decode(_)));
    }

    #[test]
    fn base_url_trailing_slash_is_ignored() {
        let client = AnalysisClient::new(&ServiceConfig {
            base_url: "http://localhost:5000/".into(),
            timeout_secs: 5,
        })
        .unwrap();
        assert_eq!(client.url("/api/health"), "http://localhost:5000/api/health");
    }
}
