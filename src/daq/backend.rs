use anyhow::Result;
use tokio::sync::mpsc;

/// One polled batch of analog-input readings.
///
/// Samples are interleaved voltages: `samples[scan * channels + ch]` is the
/// reading for channel `ch` in scan `scan`.
#[derive(Debug, Clone)]
pub struct ScanFrame {
    /// Voltage readings, interleaved by channel
    pub samples: Vec<f64>,
    /// Number of channels per scan
    pub channels: u16,
    /// Sample rate in Hz, per channel
    pub sample_rate: u32,
    /// Timestamp in milliseconds since the scan started
    pub timestamp_ms: u64,
    /// Device-reported total sample count at the time of the poll
    pub total_count: u64,
}

impl ScanFrame {
    /// Number of complete scans (one reading per channel) in this frame.
    pub fn scan_count(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels as usize
    }
}

/// Configuration for an acquisition backend
#[derive(Debug, Clone)]
pub struct DaqBackendConfig {
    /// Number of analog input channels to scan (channels 0..N-1)
    pub channels: u16,
    /// Requested sample rate in Hz, per channel
    pub sample_rate: u32,
    /// How often the scan status is polled and a frame emitted
    pub poll_interval_ms: u64,
    /// Seconds of data the device-side scan buffer holds per channel
    pub buffer_duration_secs: u64,
}

impl Default for DaqBackendConfig {
    fn default() -> Self {
        Self {
            channels: 2,
            sample_rate: 1000,
            poll_interval_ms: 100,
            buffer_duration_secs: 1,
        }
    }
}

/// Acquisition backend trait
///
/// Implementations:
/// - uldaq: MCC DAQ hardware via libuldaq (feature = "hardware")
/// - simulated: synthetic signal generator (for testing and dry runs)
#[async_trait::async_trait]
pub trait DaqBackend: Send + Sync {
    /// Start the continuous scan.
    ///
    /// Returns a channel receiver that will receive scan frames.
    async fn start(&mut self) -> Result<mpsc::Receiver<ScanFrame>>;

    /// Stop the scan and release the device.
    async fn stop(&mut self) -> Result<()>;

    /// Check if the backend is currently scanning
    fn is_scanning(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Acquisition source type
#[derive(Debug, Clone)]
pub enum DaqSource {
    /// MCC DAQ hardware reached through libuldaq
    Uldaq {
        /// Index into the device inventory
        descriptor_index: usize,
        /// Index into the supported analog-input range list
        range_index: usize,
    },
    /// Synthetic per-channel signal generator
    Simulated,
}

/// Acquisition backend factory
pub struct DaqBackendFactory;

impl DaqBackendFactory {
    pub fn create(source: DaqSource, config: DaqBackendConfig) -> Result<Box<dyn DaqBackend>> {
        if config.channels == 0 {
            anyhow::bail!("channel count must be at least 1");
        }

        match source {
            DaqSource::Uldaq { descriptor_index, range_index } => {
                #[cfg(feature = "hardware")]
                {
                    use super::uldaq::UldaqBackend;
                    let backend = UldaqBackend::new(config, descriptor_index, range_index)?;
                    Ok(Box::new(backend))
                }

                #[cfg(not(feature = "hardware"))]
                {
                    let _ = (descriptor_index, range_index);
                    anyhow::bail!(
                        "hardware acquisition requires building with the `hardware` \
                        feature and an installed libuldaq"
                    )
                }
            }

            DaqSource::Simulated => {
                use super::sim::SimulatedBackend;
                Ok(Box::new(SimulatedBackend::new(config)))
            }
        }
    }
}
