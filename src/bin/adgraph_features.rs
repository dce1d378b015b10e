//! AdGraph Feature Extraction Binary
//!
//! Builds the page graph of one recorded timeline and writes its feature
//! table and diagnostics.
//!
//! ## Configuration
//!
//! Environment variables:
//! - `ADGRAPH_TIMELINE`: path to the `{url, timeline}` JSON document (required)
//! - `ADGRAPH_OUTPUT_DIR`: output directory (default: `.`)
//! - `ADGRAPH_KATZ_*`, `ADGRAPH_*_HOPS`: feature configuration, see `FeatureConfig::from_env`
//! - `RUST_LOG`: Log level filter (default: info)
//! - `LOG_FORMAT`: "json" for structured logs, "pretty" for development (default: json)
//!
//! ## Outputs
//!
//! - `features.csv`: one row per request node
//! - `visualization.json`: nodes and links for rendering
//! - `diagnostics.json`: counts, phase timings, hashes
//! - `unresolved.json`: events with unresolved references
//!
//! ## Usage
//!
//! ```bash
//! ADGRAPH_TIMELINE=page.json ADGRAPH_OUTPUT_DIR=out cargo run --bin adgraph_features
//! ```

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Serialize;
use tracing::{info, warn};
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use adgraph_kernel::{
    build_graph, DiagnosticsSummary, FeatureConfig, FeatureExtractor, FeatureRecord, PageTimeline,
};

/// Initialize the tracing subscriber with JSON or pretty format
fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_else(|_| "json".to_string());

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "adgraph_features=info,adgraph_kernel=info".into());

    if log_format == "pretty" {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_span_events(FmtSpan::CLOSE)
            )
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_current_span(true)
                    .with_span_events(FmtSpan::CLOSE)
                    .flatten_event(true)
            )
            .init();
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), Box<dyn std::error::Error>> {
    let writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(writer, value)?;
    Ok(())
}

fn write_features(path: &Path, records: &[FeatureRecord]) -> Result<(), Box<dyn std::error::Error>> {
    let mut writer = csv::Writer::from_path(path)?;
    writer.write_record(FeatureRecord::column_names())?;
    for record in records {
        let row = record.flatten().into_iter().map(|(_, value)| match value {
            serde_json::Value::String(s) => s,
            other => other.to_string(),
        });
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();

    let version = env!("CARGO_PKG_VERSION");
    info!(
        version = version,
        schema = adgraph_kernel::ADGRAPH_SCHEMA_VERSION,
        "Starting AdGraph feature extraction"
    );

    let timeline_path = match std::env::var("ADGRAPH_TIMELINE") {
        Ok(p) if !p.is_empty() => PathBuf::from(p),
        _ => {
            tracing::error!("ADGRAPH_TIMELINE not set");
            return Err("ADGRAPH_TIMELINE is required".into());
        }
    };
    let output_dir = PathBuf::from(
        std::env::var("ADGRAPH_OUTPUT_DIR").unwrap_or_else(|_| ".".to_string()),
    );
    fs::create_dir_all(&output_dir)?;

    let config = FeatureConfig::from_env()?;
    info!(
        params_hash = %config.params_hash(),
        ascendant_hops = config.ascendant_hops,
        descendant_hops = config.descendant_hops,
        "Feature configuration loaded"
    );

    let start = Instant::now();
    let input = fs::read_to_string(&timeline_path)?;
    let timeline = PageTimeline::from_json_str(&input)?;
    info!(
        path = %timeline_path.display(),
        url = %timeline.url,
        events = timeline.events.len(),
        "Timeline parsed"
    );

    let (mut graph, report) = build_graph(&timeline)?;
    if !report.unresolved.is_empty() {
        warn!(unresolved = report.unresolved.len(), "Some events could not be resolved");
    }
    if !report.dangling.is_empty() {
        info!(dangling = report.dangling.len(), "Some events referenced absent targets");
    }

    let extractor = FeatureExtractor::new(config);
    let records = extractor.extract_all(&mut graph)?;

    write_features(&output_dir.join("features.csv"), &records)?;
    write_json(&output_dir.join("visualization.json"), &graph.visualization())?;
    write_json(&output_dir.join("unresolved.json"), &report.unresolved)?;
    let summary = DiagnosticsSummary::collect(&graph, &report, extractor.config());
    write_json(&output_dir.join("diagnostics.json"), &summary)?;

    info!(
        records = records.len(),
        nodes = summary.nodes,
        edges = summary.edges,
        latency_ms = start.elapsed().as_millis() as u64,
        output = %output_dir.display(),
        "Feature extraction complete"
    );
    Ok(())
}
