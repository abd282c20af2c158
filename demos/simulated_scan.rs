// Demo: acquire from the simulated backend in 1-second files
//
// Runs the complete pipeline without DAQ hardware attached:
// 1. Create the simulated backend through the session
// 2. Scan for a fixed duration
// 3. Inspect what landed in the data directory
//
// Usage: cargo run --example simulated_scan -- --duration 5

use anyhow::Result;
use aquabat_daq::{monitor, DaqSource, ScanSession, SessionConfig};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "simulated_scan")]
#[command(about = "Scan the simulated backend into chunked CSV files")]
struct Args {
    /// Duration to scan in seconds
    #[arg(short, long, default_value = "5")]
    duration: u64,

    /// Data directory
    #[arg(long, default_value = "./data")]
    data_directory: PathBuf,

    /// File duration in seconds
    #[arg(long, default_value = "1")]
    file_duration: u64,

    /// Number of channels
    #[arg(short, long, default_value = "2")]
    channels: u16,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(Level::INFO)
        .init();

    let args = Args::parse();

    let config = SessionConfig {
        channels: args.channels,
        sample_rate: 1000,
        file_duration_secs: args.file_duration,
        data_directory: args.data_directory.clone(),
        source: DaqSource::Simulated,
        ..SessionConfig::default()
    };

    info!("Scanning for {} seconds into {}", args.duration, args.data_directory.display());

    let session = ScanSession::new(config);
    session.start().await?;

    sleep(Duration::from_secs(args.duration)).await;

    let stats = session.stop().await?;

    info!(
        "Done: {} rows across {} file(s) in {:.1}s",
        stats.rows_written, stats.files_written, stats.duration_secs
    );

    if let Some(newest) = aquabat_daq::newest_complete_file(&args.data_directory)? {
        for summary in monitor::summarize_file(&newest, args.channels)? {
            info!(
                "chan {}: n={} min={:+.4} max={:+.4} rms={:.4}",
                summary.channel, summary.samples, summary.min, summary.max, summary.rms
            );
        }
    }

    Ok(())
}
