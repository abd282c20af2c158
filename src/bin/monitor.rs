use std::path::PathBuf;

use anyhow::Result;
use aquabat_daq::monitor::{self, MonitorOptions};
use aquabat_daq::Config;
use clap::Parser;
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "aquabat-monitor")]
#[command(about = "Live terminal display of the newest scan data file")]
struct Args {
    /// Directory where csv data from the DAQ buffer is stored
    #[arg(long = "data-directory")]
    data_directory: Option<PathBuf>,

    /// Number of channels to display
    #[arg(short, long)]
    channels: Option<u16>,

    /// Apptick/Display update rate in Hz
    #[arg(short = 't', long)]
    apptick: Option<f64>,

    /// Clear the terminal and redraw in place
    #[arg(short, long)]
    fullscreen: bool,

    /// Config file (optional; flags override its values)
    #[arg(long, default_value = "config/aquabat")]
    config: String,

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

    let cfg = Config::load(&args.config)?;

    let data_directory = args
        .data_directory
        .unwrap_or_else(|| PathBuf::from(&cfg.acquisition.data_directory));
    let options = MonitorOptions {
        channels: args.channels.unwrap_or(cfg.acquisition.channels),
        apptick_hz: args.apptick.unwrap_or(cfg.monitor.apptick_hz),
        fullscreen: args.fullscreen,
    };

    info!(
        "Monitoring {} ({} channels at {} Hz apptick)",
        data_directory.display(),
        options.channels,
        options.apptick_hz
    );

    monitor::run(&data_directory, options).await
}
