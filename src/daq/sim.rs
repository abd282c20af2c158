// Simulated acquisition backend
//
// Generates a per-channel sine wave so the full pipeline (backend ->
// chunked writer -> monitor) can run without DAQ hardware attached.

use std::f64::consts::TAU;
use std::time::Duration;

use anyhow::{bail, Result};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::backend::{DaqBackend, DaqBackendConfig, ScanFrame};

/// Base tone frequency for channel 0; each further channel is one octave up.
const BASE_TONE_HZ: f64 = 10.0;

pub struct SimulatedBackend {
    config: DaqBackendConfig,
    task: Option<JoinHandle<()>>,
    stop_tx: Option<mpsc::Sender<()>>,
}

impl SimulatedBackend {
    pub fn new(config: DaqBackendConfig) -> Self {
        Self {
            config,
            task: None,
            stop_tx: None,
        }
    }

    /// One interleaved scan batch starting at sample index `start`.
    fn generate_batch(config: &DaqBackendConfig, start: u64, scans: usize) -> Vec<f64> {
        let mut samples = Vec::with_capacity(scans * config.channels as usize);
        for scan in 0..scans as u64 {
            let t = (start + scan) as f64 / config.sample_rate as f64;
            for ch in 0..config.channels {
                let tone = BASE_TONE_HZ * f64::from(ch + 1);
                let amplitude = 1.0 / f64::from(ch + 1);
                samples.push(amplitude * (TAU * tone * t).sin());
            }
        }
        samples
    }
}

#[async_trait::async_trait]
impl DaqBackend for SimulatedBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<ScanFrame>> {
        if self.is_scanning() {
            bail!("Already scanning");
        }

        info!(
            "Starting simulated scan ({} channels at {} Hz)",
            self.config.channels, self.config.sample_rate
        );

        let (frame_tx, frame_rx) = mpsc::channel(100);
        let (stop_tx, mut stop_rx) = mpsc::channel::<()>(1);
        let config = self.config.clone();

        let task = tokio::spawn(async move {
            let poll_interval = Duration::from_millis(config.poll_interval_ms);
            let scans_per_poll = (config.sample_rate as u64 * config.poll_interval_ms
                / 1000)
                .max(1) as usize;

            let mut interval = tokio::time::interval(poll_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

            let mut total_scans: u64 = 0;
            loop {
                tokio::select! {
                    _ = interval.tick() => {}
                    _ = stop_rx.recv() => break,
                }

                let samples = Self::generate_batch(&config, total_scans, scans_per_poll);
                total_scans += scans_per_poll as u64;

                let frame = ScanFrame {
                    samples,
                    channels: config.channels,
                    sample_rate: config.sample_rate,
                    timestamp_ms: total_scans * 1000 / config.sample_rate as u64,
                    total_count: total_scans * config.channels as u64,
                };

                // Drop the frame rather than stall the sample clock.
                if let Err(e) = frame_tx.try_send(frame) {
                    warn!("Dropping simulated frame: {}", e);
                }
            }
        });

        self.task = Some(task);
        self.stop_tx = Some(stop_tx);

        Ok(frame_rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if !self.is_scanning() {
            return Ok(());
        }

        info!("Stopping simulated scan");

        if let Some(stop_tx) = self.stop_tx.take() {
            let _ = stop_tx.send(()).await;
        }
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }

        Ok(())
    }

    fn is_scanning(&self) -> bool {
        self.task.is_some()
    }

    fn name(&self) -> &str {
        "simulated"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_is_interleaved_by_channel() {
        let config = DaqBackendConfig {
            channels: 2,
            sample_rate: 1000,
            ..DaqBackendConfig::default()
        };

        let samples = SimulatedBackend::generate_batch(&config, 0, 4);
        assert_eq!(samples.len(), 8);

        // t = 0: all channels read zero crossing
        assert!(samples[0].abs() < 1e-12);
        assert!(samples[1].abs() < 1e-12);

        // channel 1 runs at twice the tone of channel 0 with half amplitude
        let t = 1.0 / 1000.0;
        assert!((samples[2] - (TAU * 10.0 * t).sin()).abs() < 1e-12);
        assert!((samples[3] - 0.5 * (TAU * 20.0 * t).sin()).abs() < 1e-12);
    }

    #[test]
    fn batch_continues_across_polls() {
        let config = DaqBackendConfig {
            channels: 1,
            sample_rate: 1000,
            ..DaqBackendConfig::default()
        };

        let first = SimulatedBackend::generate_batch(&config, 0, 100);
        let second = SimulatedBackend::generate_batch(&config, 100, 1);
        let contiguous = SimulatedBackend::generate_batch(&config, 0, 101);
        assert_eq!(first[99], contiguous[99]);
        assert_eq!(second[0], contiguous[100]);
    }

    #[tokio::test]
    async fn start_stop_produces_frames() {
        let mut backend = SimulatedBackend::new(DaqBackendConfig {
            channels: 2,
            sample_rate: 1000,
            poll_interval_ms: 10,
            ..DaqBackendConfig::default()
        });

        assert!(!backend.is_scanning());
        let mut rx = backend.start().await.unwrap();
        assert!(backend.is_scanning());

        let frame = rx.recv().await.unwrap();
        assert_eq!(frame.channels, 2);
        assert_eq!(frame.scan_count(), 10);

        backend.stop().await.unwrap();
        assert!(!backend.is_scanning());

        // Double start after stop works
        let _rx = backend.start().await.unwrap();
        backend.stop().await.unwrap();
    }

    #[tokio::test]
    async fn double_start_fails() {
        let mut backend = SimulatedBackend::new(DaqBackendConfig::default());
        let _rx = backend.start().await.unwrap();
        assert!(backend.start().await.is_err());
        backend.stop().await.unwrap();
    }
}
