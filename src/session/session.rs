use std::fs::File;
use std::io::BufWriter;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use super::config::SessionConfig;
use super::stats::SessionStats;
use crate::daq::{DaqBackendConfig, DaqBackendFactory};
use crate::writer::{ChunkConfig, ChunkMetadata, ChunkedWriter};

/// A scan session that manages acquisition, chunked file output,
/// and summary statistics.
pub struct ScanSession {
    /// Session configuration
    config: SessionConfig,

    /// When the session was created
    started_at: chrono::DateTime<chrono::Utc>,

    /// Whether the scan is currently active
    is_scanning: Arc<AtomicBool>,

    /// Number of scans (CSV rows) forwarded to the writer
    rows_written: Arc<AtomicUsize>,

    /// Number of files finalized by the writer
    files_written: Arc<AtomicUsize>,

    /// Handle for the acquisition task
    scan_task_handle: Arc<Mutex<Option<JoinHandle<()>>>>,

    /// Handle for the writer task
    writer_task_handle: Arc<Mutex<Option<JoinHandle<Result<Vec<ChunkMetadata>>>>>>,
}

/// On-disk summary written next to the data files when a session stops.
#[derive(Debug, Serialize)]
struct SessionSummary<'a> {
    config: &'a SessionConfig,
    stats: &'a SessionStats,
    files: Vec<String>,
}

impl ScanSession {
    pub fn new(config: SessionConfig) -> Self {
        info!("Creating scan session: {}", config.session_id);

        Self {
            config,
            started_at: Utc::now(),
            is_scanning: Arc::new(AtomicBool::new(false)),
            rows_written: Arc::new(AtomicUsize::new(0)),
            files_written: Arc::new(AtomicUsize::new(0)),
            scan_task_handle: Arc::new(Mutex::new(None)),
            writer_task_handle: Arc::new(Mutex::new(None)),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Start acquiring
    pub async fn start(&self) -> Result<()> {
        if self.is_scanning.load(Ordering::SeqCst) {
            warn!("Scan already started");
            return Ok(());
        }

        info!("Starting scan session: {}", self.config.session_id);

        let backend_config = DaqBackendConfig {
            channels: self.config.channels,
            sample_rate: self.config.sample_rate,
            poll_interval_ms: 100,
            buffer_duration_secs: self.config.file_duration_secs,
        };

        let mut backend = DaqBackendFactory::create(self.config.source.clone(), backend_config)
            .context("Failed to create acquisition backend")?;

        let mut frame_rx = backend
            .start()
            .await
            .context("Failed to start acquisition")?;

        info!("Backend started: {}", backend.name());
        self.is_scanning.store(true, Ordering::SeqCst);

        let chunk_config = ChunkConfig {
            file_duration_secs: self.config.file_duration_secs,
            data_dir: self.config.data_directory.clone(),
        };
        let mut writer = ChunkedWriter::new(chunk_config)?;

        let (chunk_tx, chunk_rx) = mpsc::channel(100);

        // Acquisition task: forward frames to the writer, keep counters
        // current, and shut the backend down once the flag drops.
        let is_scanning = Arc::clone(&self.is_scanning);
        let rows_written = Arc::clone(&self.rows_written);

        let scan_task = tokio::spawn(async move {
            info!("Acquisition task started");

            while let Some(frame) = frame_rx.recv().await {
                if !is_scanning.load(Ordering::SeqCst) {
                    break;
                }

                rows_written.fetch_add(frame.scan_count(), Ordering::SeqCst);

                if let Err(e) = chunk_tx.send(frame).await {
                    error!("Failed to forward frame to writer: {}", e);
                    break;
                }
            }

            info!("Acquisition task stopped");

            if let Err(e) = backend.stop().await {
                error!("Failed to stop backend: {}", e);
            }

            // chunk_tx drops here, closing the writer's channel.
        });

        {
            let mut handle = self.scan_task_handle.lock().await;
            *handle = Some(scan_task);
        }

        let writer_task = tokio::spawn(async move { writer.record(chunk_rx).await });

        {
            let mut handle = self.writer_task_handle.lock().await;
            *handle = Some(writer_task);
        }

        info!("Scan session started successfully");

        Ok(())
    }

    /// Stop acquiring, finalize the last data file, and write the session
    /// summary JSON next to the data files.
    pub async fn stop(&self) -> Result<SessionStats> {
        if !self.is_scanning.load(Ordering::SeqCst) {
            warn!("Scan not active");
            return Ok(self.stats());
        }

        info!("Stopping scan session: {}", self.config.session_id);

        // Signal the acquisition task to finish
        self.is_scanning.store(false, Ordering::SeqCst);

        {
            let mut handle = self.scan_task_handle.lock().await;
            if let Some(task) = handle.take() {
                if let Err(e) = task.await {
                    error!("Acquisition task panicked: {}", e);
                }
            }
        }

        let metadata = {
            let mut handle = self.writer_task_handle.lock().await;
            match handle.take() {
                Some(task) => task.await.context("Writer task panicked")??,
                None => Vec::new(),
            }
        };

        self.files_written.store(metadata.len(), Ordering::SeqCst);

        let stats = self.stats();
        self.write_summary(&stats, &metadata)?;

        info!(
            "Scan session stopped: {} file(s), {} rows",
            stats.files_written, stats.rows_written
        );

        Ok(stats)
    }

    /// Current session statistics
    pub fn stats(&self) -> SessionStats {
        let duration = Utc::now().signed_duration_since(self.started_at);

        SessionStats {
            is_scanning: self.is_scanning.load(Ordering::SeqCst),
            started_at: self.started_at,
            duration_secs: duration.num_milliseconds() as f64 / 1000.0,
            files_written: self.files_written.load(Ordering::SeqCst),
            rows_written: self.rows_written.load(Ordering::SeqCst),
        }
    }

    fn write_summary(&self, stats: &SessionStats, metadata: &[ChunkMetadata]) -> Result<()> {
        let summary = SessionSummary {
            config: &self.config,
            stats,
            files: metadata
                .iter()
                .map(|m| m.file_path.display().to_string())
                .collect(),
        };

        let path = self
            .config
            .data_directory
            .join(format!("session-{}.json", self.config.session_id));
        let file = File::create(&path)
            .with_context(|| format!("Failed to create session summary {:?}", path))?;
        serde_json::to_writer_pretty(BufWriter::new(file), &summary)
            .context("Failed to write session summary")?;

        info!("Session summary written to {}", path.display());

        Ok(())
    }
}
