// Terminal monitor for live scan data
//
// Re-drives the acquisition read path: every apptick it picks the newest
// complete data file in the directory and redraws per-channel summaries
// in place. Stands in for the original fullscreen plot display.

use std::io::Write;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use crate::writer::newest_complete_file;

/// Summary statistics for one channel column of a data file.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSummary {
    pub channel: u16,
    pub samples: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub rms: f64,
}

impl ChannelSummary {
    pub fn from_samples(channel: u16, data: &[f64]) -> Self {
        let samples = data.len();
        if samples == 0 {
            return Self {
                channel,
                samples: 0,
                min: 0.0,
                max: 0.0,
                mean: 0.0,
                rms: 0.0,
            };
        }

        let mut min = f64::INFINITY;
        let mut max = f64::NEG_INFINITY;
        let mut sum = 0.0;
        let mut sum_sq = 0.0;
        for &v in data {
            min = min.min(v);
            max = max.max(v);
            sum += v;
            sum_sq += v * v;
        }

        Self {
            channel,
            samples,
            min,
            max,
            mean: sum / samples as f64,
            rms: (sum_sq / samples as f64).sqrt(),
        }
    }
}

/// Read one channel's column from a data file as a voltage timeseries.
pub fn read_channel(path: impl AsRef<Path>, channel: u16) -> Result<Vec<f64>> {
    let columns = read_all(path, channel + 1)?;
    Ok(columns.into_iter().nth(channel as usize).unwrap_or_default())
}

/// Read the first `channels` columns of a data file, one Vec per channel.
///
/// Rows with fewer columns than requested are rejected: the writer always
/// emits one column per scanned channel.
pub fn read_all(path: impl AsRef<Path>, channels: u16) -> Result<Vec<Vec<f64>>> {
    let path = path.as_ref();
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .from_path(path)
        .with_context(|| format!("Failed to open data file {:?}", path))?;

    let mut columns: Vec<Vec<f64>> = vec![Vec::new(); channels as usize];

    for (row, record) in reader.records().enumerate() {
        let record = record.context("Failed to read CSV row")?;
        if record.len() < channels as usize {
            anyhow::bail!(
                "Row {} of {:?} has {} column(s), expected at least {}",
                row,
                path,
                record.len(),
                channels
            );
        }
        for (ch, field) in record.iter().take(channels as usize).enumerate() {
            let value: f64 = field
                .trim()
                .parse()
                .with_context(|| format!("Bad value {:?} at row {} of {:?}", field, row, path))?;
            columns[ch].push(value);
        }
    }

    Ok(columns)
}

/// Summarize every channel column of a data file.
pub fn summarize_file(path: impl AsRef<Path>, channels: u16) -> Result<Vec<ChannelSummary>> {
    let columns = read_all(path, channels)?;
    Ok(columns
        .iter()
        .enumerate()
        .map(|(ch, data)| ChannelSummary::from_samples(ch as u16, data))
        .collect())
}

/// Configuration for the monitor loop
#[derive(Debug, Clone)]
pub struct MonitorOptions {
    pub channels: u16,
    /// Display refresh rate in Hz
    pub apptick_hz: f64,
    /// Clear the whole terminal before the first draw
    pub fullscreen: bool,
}

/// Tail the data directory, redrawing per-channel summaries every apptick
/// until Ctrl-C.
pub async fn run(data_dir: impl AsRef<Path>, options: MonitorOptions) -> Result<()> {
    let data_dir = data_dir.as_ref();
    let tick = Duration::from_secs_f64(1.0 / options.apptick_hz.max(0.001));
    let mut interval = tokio::time::interval(tick);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut stdout = std::io::stdout();
    if options.fullscreen {
        // Clear screen and home the cursor
        write!(stdout, "\x1b[2J\x1b[1;1H")?;
        stdout.flush()?;
    }

    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = tokio::signal::ctrl_c() => break,
        }

        let current = match newest_complete_file(data_dir)? {
            Some(path) => path,
            None => {
                debug!("No complete data file in {} yet", data_dir.display());
                continue;
            }
        };

        let summaries = match summarize_file(&current, options.channels) {
            Ok(summaries) => summaries,
            Err(e) => {
                // The file can rotate underneath us; try again next tick.
                warn!("Skipping {}: {}", current.display(), e);
                continue;
            }
        };

        draw(&mut stdout, &current, &summaries)?;
    }

    println!("\n\tExiting...\n");

    Ok(())
}

fn draw(out: &mut impl Write, current: &Path, summaries: &[ChannelSummary]) -> Result<()> {
    // Reset the cursor, then clear each line as it is rewritten
    write!(out, "\x1b[1;1H")?;
    writeln!(out, "\x1b[2KPlease enter CTRL + C to terminate the process\n\x1b[2K")?;
    writeln!(out, "\x1b[2Kcurrent file: {}", current.display())?;
    writeln!(out, "\x1b[2K")?;
    for s in summaries {
        writeln!(
            out,
            "\x1b[2Kchan = {} : n={:6}  min={:+.6}  max={:+.6}  mean={:+.6}  rms={:.6}",
            s.channel, s.samples, s.min, s.max, s.mean, s.rms
        )?;
    }
    out.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_of_constant_signal() {
        let data = vec![0.5; 100];
        let s = ChannelSummary::from_samples(0, &data);
        assert_eq!(s.samples, 100);
        assert_eq!(s.min, 0.5);
        assert_eq!(s.max, 0.5);
        assert!((s.mean - 0.5).abs() < 1e-12);
        assert!((s.rms - 0.5).abs() < 1e-12);
    }

    #[test]
    fn summary_of_symmetric_signal() {
        let data = vec![-1.0, 1.0, -1.0, 1.0];
        let s = ChannelSummary::from_samples(3, &data);
        assert_eq!(s.channel, 3);
        assert_eq!(s.min, -1.0);
        assert_eq!(s.max, 1.0);
        assert!(s.mean.abs() < 1e-12);
        assert!((s.rms - 1.0).abs() < 1e-12);
    }

    #[test]
    fn summary_of_empty_column() {
        let s = ChannelSummary::from_samples(0, &[]);
        assert_eq!(s.samples, 0);
        assert_eq!(s.min, 0.0);
        assert_eq!(s.rms, 0.0);
    }
}
