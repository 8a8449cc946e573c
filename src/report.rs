// Markdown and HTML rendering of an analysis.
//
// The HTML report is the Markdown report run through pulldown-cmark.

use std::fmt::{Display, Write as _};
use std::fs;
use std::path::{Path, PathBuf};

use pulldown_cmark::{html, Options, Parser};
use tracing::info;

use crate::error::Result;
use crate::timeseries::AddressSeries;
use crate::Analysis;

pub const MARKDOWN_REPORT: &str = "rapport_detection.md";
pub const HTML_REPORT: &str = "rapport_detection.html";
const TITLE: &str = "Network Traffic Detection Report";

enum Body {
    Table { headers: [&'static str; 2], rows: Vec<[String; 2]> },
    Empty(String),
    Series(Vec<(String, Vec<[String; 2]>)>),
}

struct Section {
    title: String,
    body: Body,
}

fn table<K: Display>(headers: [&'static str; 2], entries: &[(K, u64)], empty: &str) -> Body {
    if entries.is_empty() {
        return Body::Empty(empty.to_string());
    }
    Body::Table {
        headers,
        rows: entries.iter().map(|(key, count)| [key.to_string(), count.to_string()]).collect(),
    }
}

fn series_body(series: &[AddressSeries], empty: &str) -> Body {
    let active: Vec<_> = series
        .iter()
        .filter(|s| !s.buckets.is_empty())
        .map(|s| {
            let rows: Vec<[String; 2]> = s
                .buckets
                .iter()
                .map(|(sec, count)| [sec.to_string(), count.to_string()])
                .collect();
            (s.address.clone(), rows)
        })
        .collect();
    if active.is_empty() {
        Body::Empty(empty.to_string())
    } else {
        Body::Series(active)
    }
}

fn sections(analysis: &Analysis) -> Vec<Section> {
    let summary = &analysis.summary;
    let stats = &analysis.stats;
    let threshold = analysis.config.suspicious_packet_threshold;
    let port_threshold = analysis.config.port_frequency_threshold;
    let protocols: Vec<_> = stats.protocol_counts.iter().map(|(p, c)| (*p, c)).collect();

    vec![
        Section {
            title: "Protocol Distribution".into(),
            body: table(["Protocol", "Packets"], &protocols, "No packets recognized."),
        },
        Section {
            title: "Top 10 Destinations by Traffic Volume".into(),
            body: table(
                ["Destination", "Packets"],
                &summary.top_destinations,
                "No destinations recorded.",
            ),
        },
        Section {
            title: "Top 10 Source Ports".into(),
            body: table(
                ["Source Port", "Packets"],
                &summary.top_source_ports,
                "No source ports recorded.",
            ),
        },
        Section {
            title: "Top 10 Destination Ports".into(),
            body: table(
                ["Destination Port", "Packets"],
                &summary.top_destination_ports,
                "No destination ports recorded.",
            ),
        },
        Section {
            title: format!("Suspicious Source Addresses (> {threshold} packets)"),
            body: table(
                ["Source", "Packets"],
                &crate::detection::rank(summary.suspicious_sources.clone(), usize::MAX),
                "No suspicious source address detected.",
            ),
        },
        Section {
            title: format!("Suspicious Destination Addresses (> {threshold} packets)"),
            body: table(
                ["Destination", "Packets"],
                &crate::detection::rank(summary.suspicious_destinations.clone(), usize::MAX),
                "No suspicious destination address detected.",
            ),
        },
        Section {
            title: format!("Suspicious Source Ports (> {port_threshold} packets)"),
            body: table(
                ["Source Port", "Packets"],
                &crate::detection::rank(summary.suspicious_source_ports.clone(), usize::MAX),
                "No suspicious source port detected.",
            ),
        },
        Section {
            title: format!("Suspicious Destination Ports (> {port_threshold} packets)"),
            body: table(
                ["Destination Port", "Packets"],
                &crate::detection::rank(summary.suspicious_destination_ports.clone(), usize::MAX),
                "No suspicious destination port detected.",
            ),
        },
        Section {
            title: "Sending Activity - Top 10 Suspicious Sources".into(),
            body: series_body(&analysis.series.sent, "No suspicious source to chart."),
        },
        Section {
            title: "Receiving Activity - Top 10 Suspicious Destinations".into(),
            body: series_body(&analysis.series.received, "No suspicious destination to chart."),
        },
    ]
}

pub fn render_markdown(analysis: &Analysis) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# {TITLE}\n");
    let _ = writeln!(
        out,
        "**Total packets processed:** {}\n",
        analysis.stats.total_packets
    );
    let _ = writeln!(out, "**Total bytes:** {}", analysis.stats.total_bytes);

    for section in sections(analysis) {
        let _ = writeln!(out, "\n## {}\n", section.title);
        match section.body {
            Body::Empty(text) => {
                let _ = writeln!(out, "{text}");
            }
            Body::Table { headers, rows } => markdown_table(&mut out, headers, &rows),
            Body::Series(series) => {
                for (address, rows) in series {
                    let _ = writeln!(out, "### {address}\n");
                    markdown_table(&mut out, ["Second", "Packets"], &rows);
                    out.push('\n');
                }
            }
        }
    }
    out
}

fn markdown_table(out: &mut String, headers: [&str; 2], rows: &[[String; 2]]) {
    let _ = writeln!(out, "| {} | {} |", headers[0], headers[1]);
    let _ = writeln!(out, "|:---|---:|");
    for [key, count] in rows {
        let _ = writeln!(out, "| {key} | {count} |");
    }
}

/// The Markdown report converted to a standalone HTML5 document.
pub fn render_html(analysis: &Analysis) -> String {
    let markdown = render_markdown(analysis);
    let mut body = String::new();
    html::push_html(&mut body, Parser::new_ext(&markdown, Options::ENABLE_TABLES));

    format!(
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n    <meta charset=\"UTF-8\">\n    \
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1.0\">\n    \
         <title>{TITLE}</title>\n</head>\n<body>\n{body}</body>\n</html>\n"
    )
}

/// Writes the Markdown report, and the HTML one when asked, into `out_dir`.
pub fn write_reports(analysis: &Analysis, out_dir: &Path, html: bool) -> Result<Vec<PathBuf>> {
    let mut written = Vec::new();

    let markdown_path = out_dir.join(MARKDOWN_REPORT);
    fs::write(&markdown_path, render_markdown(analysis))?;
    info!(path = %markdown_path.display(), "markdown report written");
    written.push(markdown_path);

    if html {
        let html_path = out_dir.join(HTML_REPORT);
        fs::write(&html_path, render_html(analysis))?;
        info!(path = %html_path.display(), "html report written");
        written.push(html_path);
    }
    Ok(written)
}
