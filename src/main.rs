use std::path::PathBuf;

use anyhow::Result;
use aquabat_daq::{Config, DaqSource, ScanSession, SessionConfig};
use clap::Parser;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "aquabat-scan")]
#[command(about = "Continuous analog input scan with chunked CSV output")]
struct Args {
    /// Directory where csv data will be stored
    #[arg(long = "data-directory")]
    data_directory: Option<PathBuf>,

    /// Number of channels to acquire
    #[arg(short, long)]
    channels: Option<u16>,

    /// Sample rate in Hz
    #[arg(long = "fs", alias = "sample-rate")]
    sample_rate: Option<u32>,

    /// File duration in seconds
    #[arg(long = "file-duration")]
    file_duration: Option<u64>,

    /// Config file (optional; flags override its values)
    #[arg(long, default_value = "config/aquabat")]
    config: String,

    /// Index of the DAQ device in the inventory
    #[arg(long = "device-index")]
    device_index: Option<usize>,

    /// List available DAQ devices and exit
    #[arg(long = "list-devices")]
    list_devices: bool,

    /// Use the simulated backend instead of hardware
    #[arg(long)]
    simulate: bool,

    /// Print debug messages
    #[arg(short, long)]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_max_level(if args.debug { Level::DEBUG } else { Level::INFO })
        .init();

    if args.list_devices {
        return list_devices();
    }

    let cfg = Config::load(&args.config)?;

    let simulate = args.simulate || cfg.device.simulate;
    let source = if simulate {
        DaqSource::Simulated
    } else {
        DaqSource::Uldaq {
            descriptor_index: args.device_index.unwrap_or(cfg.device.descriptor_index),
            range_index: cfg.device.range_index,
        }
    };

    let session_config = SessionConfig {
        channels: args.channels.unwrap_or(cfg.acquisition.channels),
        sample_rate: args.sample_rate.unwrap_or(cfg.acquisition.sample_rate),
        file_duration_secs: args.file_duration.unwrap_or(cfg.acquisition.file_duration_secs),
        data_directory: args
            .data_directory
            .unwrap_or_else(|| PathBuf::from(&cfg.acquisition.data_directory)),
        source,
        ..SessionConfig::default()
    };

    info!("AQUABAT DAQ");
    info!("Session: {}", session_config.session_id);
    info!(
        "Channels: 0-{}, rate: {} Hz, file duration: {}s",
        session_config.channels.saturating_sub(1),
        session_config.sample_rate,
        session_config.file_duration_secs
    );
    info!("Data directory: {}", session_config.data_directory.display());

    let session = ScanSession::new(session_config);
    session.start().await?;

    info!("Scanning. Press Ctrl+C to stop.");
    tokio::signal::ctrl_c().await?;

    let stats = session.stop().await?;

    info!(
        "Acquired {} rows into {} file(s) over {:.1}s",
        stats.rows_written, stats.files_written, stats.duration_secs
    );
    println!("\n\tExiting...\n");

    Ok(())
}

#[cfg(feature = "hardware")]
fn list_devices() -> Result<()> {
    let devices = aquabat_daq::daq::uldaq::list_devices()?;
    if devices.is_empty() {
        println!("No DAQ devices found");
        return Ok(());
    }
    println!("Found {} DAQ device(s):", devices.len());
    for (i, d) in devices.iter().enumerate() {
        println!("  [{}] {} ({})", i, d.product_name, d.unique_id);
    }
    Ok(())
}

#[cfg(not(feature = "hardware"))]
fn list_devices() -> Result<()> {
    anyhow::bail!("device inventory requires building with the `hardware` feature")
}
