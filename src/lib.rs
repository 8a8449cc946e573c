//! Offline tcpdump text analysis: parse capture lines, aggregate traffic,
//! flag busy hosts and ports, and bin suspicious hosts per second.

use std::fs::File;
use std::io::{self, BufRead, BufReader, ErrorKind};
use std::path::Path;

use tracing::{debug, info};

pub mod config;
pub mod detection;
pub mod error;
pub mod export;
pub mod models;
pub mod parser;
pub mod report;
pub mod stats;
pub mod timeseries;

pub use config::Config;
pub use detection::{DetectionSummary, SuspiciousActivity, TrafficAnalyzer};
pub use error::{AnalysisError, Result};
pub use models::domain::{PacketRecord, Protocol};
pub use parser::LineParser;
pub use stats::{Counter, TrafficStats};
pub use timeseries::TrafficSeries;

/// Everything derived from one capture.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub config: Config,
    pub stats: TrafficStats,
    pub summary: DetectionSummary,
    pub series: TrafficSeries,
}

impl Analysis {
    pub fn suspicious_activities(&self) -> Vec<SuspiciousActivity> {
        TrafficAnalyzer::new(self.config).detect_suspicious_traffic(&self.summary)
    }
}

/// Reads a capture file and runs the whole pipeline.
///
/// Lines that are not valid UTF-8 are decoded lossily rather than aborting.
pub fn analyze_file(path: &Path, config: Config) -> Result<Analysis> {
    let not_found = |source| AnalysisError::InputNotFound {
        path: path.to_path_buf(),
        source,
    };
    let file = File::open(path).map_err(not_found)?;
    if !file.metadata().map_err(not_found)?.is_file() {
        return Err(not_found(io::Error::new(ErrorKind::InvalidInput, "not a regular file")));
    }

    let parser = LineParser::new();
    let mut stats = TrafficStats::new();
    let mut lines = 0usize;
    for chunk in BufReader::new(file).split(b'\n') {
        let chunk = chunk?;
        lines += 1;
        if let Some(record) = parser.parse_line(&String::from_utf8_lossy(&chunk)) {
            stats.update(record);
        }
    }
    debug!(lines, accepted = stats.total_packets, "capture read");

    Ok(finish(stats, config))
}

/// Runs the pipeline over in-memory lines.
pub fn analyze_lines<I, S>(lines: I, config: Config) -> Analysis
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let parser = LineParser::new();
    let mut stats = TrafficStats::new();
    stats.extend(lines.into_iter().filter_map(|line| parser.parse_line(line.as_ref())));
    finish(stats, config)
}

fn finish(stats: TrafficStats, config: Config) -> Analysis {
    let summary = TrafficAnalyzer::new(config).summarize(&stats);
    let series = timeseries::bin_by_second(
        &stats.records,
        &summary.top_suspicious_source_addresses(),
        &summary.top_suspicious_destination_addresses(),
    );
    info!(
        packets = stats.total_packets,
        suspicious_sources = summary.suspicious_sources.len(),
        suspicious_destinations = summary.suspicious_destinations.len(),
        "analysis finished"
    );

    Analysis {
        config,
        stats,
        summary,
        series,
    }
}
