use std::error::Error;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::Parser;
use tracing::{info, warn};

use dumpscan::config::{Config, DEFAULT_CONFIG_PATH};
use dumpscan::export::{self, JSON_EXPORT};
use dumpscan::{analyze_file, report};

/// Analyze a tcpdump text capture and report busy hosts and ports.
#[derive(Parser, Debug)]
#[command(name = "dumpscan", version, about)]
struct Cli {
    /// Capture file (tcpdump text output). Prompted for when omitted.
    capture: Option<PathBuf>,

    /// Markdown document whose YAML front matter holds the thresholds
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    /// Packets per address above which it is flagged
    #[arg(long)]
    packet_threshold: Option<u64>,

    /// Packets per port above which it is flagged
    #[arg(long)]
    port_threshold: Option<u64>,

    /// Directory receiving reports and exports
    #[arg(short, long, default_value = ".")]
    out_dir: PathBuf,

    /// CSV sheet whose first eight columns are refreshed
    #[arg(long, default_value = export::CSV_EXPORT)]
    csv: PathBuf,

    /// Skip the HTML report
    #[arg(long, default_value_t = false)]
    no_html: bool,

    /// Skip the JSON and CSV exports
    #[arg(long, default_value_t = false)]
    no_export: bool,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "dumpscan=info".into()),
        )
        .with_target(false)
        .init();

    dotenv::dotenv().ok();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = Config::load(&cli.config)?
        .with_overrides(cli.packet_threshold, cli.port_threshold);
    info!(
        packet_threshold = config.suspicious_packet_threshold,
        port_threshold = config.port_frequency_threshold,
        "thresholds loaded"
    );

    let capture = match cli.capture {
        Some(path) => path,
        None => prompt_capture_path()?,
    };

    let analysis = analyze_file(&capture, config)?;
    println!("Analysis complete. Total packets processed: {}", analysis.stats.total_packets);

    for activity in analysis.suspicious_activities() {
        warn!(
            "Suspicious Activity Detected: {} {} - {} packets (threshold {})",
            activity.activity_type, activity.source, activity.count, activity.threshold
        );
    }

    std::fs::create_dir_all(&cli.out_dir)?;
    for path in report::write_reports(&analysis, &cli.out_dir, !cli.no_html)? {
        println!("Report written to '{}'.", path.display());
    }

    if !cli.no_export {
        export::write_json(&analysis.stats.records, &cli.out_dir.join(JSON_EXPORT))?;
        let csv_path = if cli.csv.is_absolute() {
            cli.csv.clone()
        } else {
            cli.out_dir.join(&cli.csv)
        };
        export::merge_csv(&analysis.stats.records, &csv_path)?;
        println!("CSV sheet updated: '{}'.", csv_path.display());
    }
    Ok(())
}

fn prompt_capture_path() -> io::Result<PathBuf> {
    print!("Enter the capture file to analyze: ");
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(PathBuf::from(line.trim()))
}
