use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::daq::ScanFrame;

/// Chunk configuration
#[derive(Debug, Clone)]
pub struct ChunkConfig {
    /// Seconds of data per file before rotating (default: 1)
    pub file_duration_secs: u64,
    /// Directory the data files are written into
    pub data_dir: PathBuf,
}

impl ChunkConfig {
    pub fn new(data_dir: PathBuf) -> Self {
        Self {
            file_duration_secs: 1,
            data_dir,
        }
    }
}

/// Metadata for a single data file
#[derive(Debug, Clone)]
pub struct ChunkMetadata {
    /// Chunk number (0-indexed)
    pub chunk_index: usize,
    /// Path of the written file
    pub file_path: PathBuf,
    /// Start time in milliseconds since the scan started
    pub start_ms: u64,
    /// End time in milliseconds since the scan started
    pub end_ms: u64,
    /// Number of channels (CSV columns)
    pub channels: u16,
    /// Number of scans written (CSV rows)
    pub row_count: usize,
}

/// Chunked CSV writer
///
/// Receives scan frames from a backend and persists them as comma-separated
/// text files, rotating to a new file every `file_duration_secs`. Files are
/// named by the Unix epoch time of the chunk's start so that lexicographic
/// order is chronological order; the monitor relies on that to find the
/// newest complete file.
pub struct ChunkedWriter {
    config: ChunkConfig,
    current_chunk: Option<ChunkWriter>,
    chunk_index: usize,
    epoch_start: f64,
}

impl ChunkedWriter {
    pub fn new(config: ChunkConfig) -> Result<Self> {
        fs::create_dir_all(&config.data_dir)
            .context("Failed to create data directory")?;

        info!(
            "Chunked writer initialized: {} ({}s per file)",
            config.data_dir.display(),
            config.file_duration_secs
        );

        Ok(Self {
            config,
            current_chunk: None,
            chunk_index: 0,
            epoch_start: 0.0,
        })
    }

    /// Consume scan frames until the channel closes, writing them to
    /// rotating data files. Returns metadata for every file written.
    pub async fn record(
        &mut self,
        mut frame_rx: mpsc::Receiver<ScanFrame>,
    ) -> Result<Vec<ChunkMetadata>> {
        let mut metadata = Vec::new();

        info!("Starting chunked recording");

        while let Some(frame) = frame_rx.recv().await {
            // Anchor filenames to the wall clock at the first frame.
            if self.epoch_start == 0.0 {
                let now = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .context("System clock before Unix epoch")?;
                self.epoch_start = now.as_secs_f64() - frame.timestamp_ms as f64 / 1000.0;
            }

            if self.should_start_new_chunk(&frame) {
                if let Some(chunk) = self.current_chunk.take() {
                    let chunk_meta = chunk.finish()?;
                    info!(
                        "File {} complete: {:.1}s - {:.1}s ({} rows)",
                        chunk_meta.file_path.display(),
                        chunk_meta.start_ms as f64 / 1000.0,
                        chunk_meta.end_ms as f64 / 1000.0,
                        chunk_meta.row_count
                    );
                    metadata.push(chunk_meta);
                }

                self.current_chunk = Some(self.start_new_chunk(&frame)?);
            }

            if let Some(chunk) = &mut self.current_chunk {
                chunk.write_frame(&frame)?;
            }
        }

        // Finish the last file
        if let Some(chunk) = self.current_chunk.take() {
            let chunk_meta = chunk.finish()?;
            info!(
                "Final file {} complete: {:.1}s - {:.1}s ({} rows)",
                chunk_meta.file_path.display(),
                chunk_meta.start_ms as f64 / 1000.0,
                chunk_meta.end_ms as f64 / 1000.0,
                chunk_meta.row_count
            );
            metadata.push(chunk_meta);
        }

        info!("Chunked recording complete: {} file(s) saved", metadata.len());

        Ok(metadata)
    }

    fn should_start_new_chunk(&self, frame: &ScanFrame) -> bool {
        match &self.current_chunk {
            None => true,
            Some(chunk) => {
                let chunk_duration_ms = self.config.file_duration_secs * 1000;
                let elapsed_ms = frame.timestamp_ms.saturating_sub(chunk.metadata.start_ms);
                elapsed_ms >= chunk_duration_ms
            }
        }
    }

    fn start_new_chunk(&mut self, frame: &ScanFrame) -> Result<ChunkWriter> {
        let chunk_epoch = self.epoch_start + frame.timestamp_ms as f64 / 1000.0;
        let file_path = self.config.data_dir.join(format!("{}.txt", chunk_epoch));

        let chunk = ChunkWriter::new(file_path, self.chunk_index, frame.timestamp_ms, frame.channels)?;
        self.chunk_index += 1;

        Ok(chunk)
    }
}

/// Writes a single data file as headerless CSV, one row per scan.
struct ChunkWriter {
    writer: Option<csv::Writer<BufWriter<File>>>,
    metadata: ChunkMetadata,
}

impl ChunkWriter {
    fn new(file_path: PathBuf, chunk_index: usize, start_ms: u64, channels: u16) -> Result<Self> {
        let file = File::create(&file_path)
            .with_context(|| format!("Failed to create data file: {:?}", file_path))?;
        let writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(BufWriter::new(file));

        Ok(Self {
            writer: Some(writer),
            metadata: ChunkMetadata {
                chunk_index,
                file_path,
                start_ms,
                end_ms: start_ms,
                channels,
                row_count: 0,
            },
        })
    }

    fn write_frame(&mut self, frame: &ScanFrame) -> Result<()> {
        if frame.channels == 0 {
            return Ok(());
        }

        if let Some(writer) = &mut self.writer {
            for scan in frame.samples.chunks_exact(frame.channels as usize) {
                writer
                    .write_record(scan.iter().map(|v| v.to_string()))
                    .context("Failed to write CSV row")?;
            }

            self.metadata.end_ms = frame.timestamp_ms;
            self.metadata.row_count += frame.scan_count();
        }

        Ok(())
    }

    fn finish(mut self) -> Result<ChunkMetadata> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush().context("Failed to flush data file")?;
        }

        Ok(self.metadata.clone())
    }
}

impl Drop for ChunkWriter {
    fn drop(&mut self) {
        if let Some(mut writer) = self.writer.take() {
            if let Err(e) = writer.flush() {
                warn!("Failed to flush data file on drop: {}", e);
            }
        }
    }
}

/// Pick the newest *complete* data file in a directory: epoch-named files
/// sort chronologically, and the very newest may still be mid-write, so the
/// second-newest is returned when there is more than one.
pub fn newest_complete_file(data_dir: impl AsRef<Path>) -> Result<Option<PathBuf>> {
    let mut files: Vec<PathBuf> = fs::read_dir(data_dir.as_ref())
        .with_context(|| format!("Failed to read data directory {:?}", data_dir.as_ref()))?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            path.extension().map_or(false, |ext| ext == "txt")
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map_or(false, |n| n.starts_with('1'))
        })
        .collect();

    files.sort();

    Ok(match files.len() {
        0 => None,
        1 => files.pop(),
        n => Some(files.swap_remove(n - 2)),
    })
}
