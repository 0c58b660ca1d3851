use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::{info, warn};

use fault_lens::analysis::client::{AnalysisClient, AnalysisKind};
use fault_lens::config::Config;
use fault_lens::state::Session;

#[derive(Parser)]
#[command(name = "fault-lens")]
#[command(about = "Ingest vehicle sensor data and summarise fault labels")]
#[command(version)]
struct Cli {
    /// Sensor data file (.csv, .tsv, .txt or .json)
    file: PathBuf,

    /// TOML config file with [ingest] and [service] tables
    #[arg(long)]
    config: Option<PathBuf>,

    /// Field delimiter (overrides the config file)
    #[arg(long)]
    delimiter: Option<char>,

    /// Number of correlated features to report
    #[arg(long, default_value_t = 10)]
    top: usize,

    /// Print the summary (and any analysis result) as JSON
    #[arg(long)]
    json: bool,

    /// Run an analysis on the external service after ingestion
    #[arg(long, value_enum)]
    analysis: Option<AnalysisKind>,

    /// Analysis service base URL (overrides the config file)
    #[arg(long)]
    service: Option<String>,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };
    if let Some(d) = cli.delimiter {
        config.ingest.delimiter = d;
    }
    if let Some(url) = cli.service {
        config.service.base_url = url;
    }

    let mut session = Session::new(config.ingest.clone());
    session.top_features = cli.top;

    let outcome = session
        .load_file(&cli.file)
        .with_context(|| format!("ingesting {}", cli.file.display()))?;
    for diag in &outcome.diagnostics {
        warn!("{diag}");
    }
    info!(
        "Label column '{}' resolved by {:?}",
        outcome.label.source.header, outcome.label.source.rule
    );

    if let Some(kind) = cli.analysis {
        let client = AnalysisClient::new(&config.service).context("building HTTP client")?;
        session
            .run_analysis(&client, kind)
            .context("running analysis")?;
    }

    let summary = session
        .summary
        .as_ref()
        .context("summary missing after successful load")?;

    if cli.json {
        let out = serde_json::json!({
            "summary": summary,
            "result": session.result,
        });
        println!("{}", serde_json::to_string_pretty(&out)?);
        return Ok(());
    }

    let dist = summary.class_distribution;
    println!("File:     {}", cli.file.display());
    println!("Records:  {} ({} columns)", summary.rows, summary.columns);
    println!(
        "Classes:  Normal {}  Faulty {}  ({:.1}% faulty)",
        dist.normal,
        dist.faulty,
        dist.faulty_ratio() * 100.0
    );
    if !summary.sparse_columns.is_empty() {
        println!("Sparse:   {}", summary.sparse_columns.join(", "));
    }
    println!("Top features by |correlation| with class:");
    for (rank, f) in summary.top_features.iter().enumerate() {
        println!("  {:>2}. {:<16} {:.4}", rank + 1, f.feature, f.correlation);
    }
    if let Some(result) = &session.result {
        println!();
        println!("{result}");
    }

    Ok(())
}
