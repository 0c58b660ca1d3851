use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Analysis service results
// ---------------------------------------------------------------------------

/// One result from the analysis service. On the wire this is
/// `{"type": "anomalies" | "classification" | "rootcause", "data": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "lowercase")]
pub enum AnalysisResult {
    Anomalies(AnomalyReport),
    Classification(ClassificationReport),
    #[serde(rename = "rootcause")]
    RootCause(RootCauseReport),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnomalyReport {
    pub total_samples: u64,
    pub anomalies: u64,
    /// Percentage, as sent by the service.
    pub anomaly_rate: f64,
    pub critical_anomalies: u64,
    pub major_anomalies: u64,
    pub minor_anomalies: u64,
}

/// Metric values are percentages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassificationReport {
    pub accuracy: f64,
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    /// Predicted class name → record count.
    #[serde(default)]
    pub classes: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RootCauseReport {
    pub top_sensors: Vec<SensorImportance>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorImportance {
    pub name: String,
    pub importance: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl SensorImportance {
    pub fn level(&self) -> ImportanceLevel {
        ImportanceLevel::from_importance(self.importance)
    }
}

/// Severity bucket for a feature-importance score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum ImportanceLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl ImportanceLevel {
    pub fn from_importance(importance: f64) -> Self {
        if importance > 0.12 {
            ImportanceLevel::Critical
        } else if importance > 0.08 {
            ImportanceLevel::High
        } else if importance > 0.05 {
            ImportanceLevel::Medium
        } else {
            ImportanceLevel::Low
        }
    }
}

impl fmt::Display for ImportanceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ImportanceLevel::Low => "Low",
            ImportanceLevel::Medium => "Medium",
            ImportanceLevel::High => "High",
            ImportanceLevel::Critical => "Critical",
        };
        f.write_str(label)
    }
}

// ---------------------------------------------------------------------------
// Text rendering
// ---------------------------------------------------------------------------

impl fmt::Display for AnalysisResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisResult::Anomalies(r) => {
                writeln!(f, "Anomaly Detection Results")?;
                writeln!(f, "  Total samples:      {}", r.total_samples)?;
                writeln!(f, "  Anomalies found:    {}", r.anomalies)?;
                writeln!(f, "  Anomaly rate:       {}%", r.anomaly_rate)?;
                writeln!(f, "  Critical anomalies: {}", r.critical_anomalies)?;
                writeln!(f, "  Major anomalies:    {}", r.major_anomalies)?;
                write!(f, "  Minor anomalies:    {}", r.minor_anomalies)
            }
            AnalysisResult::Classification(r) => {
                writeln!(f, "Fault Classification Results")?;
                writeln!(f, "  Accuracy:  {}%", r.accuracy)?;
                writeln!(f, "  Precision: {}%", r.precision)?;
                writeln!(f, "  Recall:    {}%", r.recall)?;
                write!(f, "  F1 score:  {}%", r.f1_score)?;
                for (name, count) in &r.classes {
                    write!(f, "\n  {name}: {count}")?;
                }
                Ok(())
            }
            AnalysisResult::RootCause(r) => {
                write!(f, "Root Cause Sensors")?;
                for (rank, sensor) in r.top_sensors.iter().enumerate() {
                    write!(
                        f,
                        "\n  {:>2}. {:<12} {:.3} [{}]",
                        rank + 1,
                        sensor.name,
                        sensor.importance,
                        sensor.level()
                    )?;
                    if let Some(desc) = &sensor.description {
                        write!(f, " {desc}")?;
                    }
                }
                Ok(())
            }
        }
    }
}
