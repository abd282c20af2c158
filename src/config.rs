use anyhow::Result;
use serde::Deserialize;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub acquisition: AcquisitionConfig,
    pub device: DeviceConfig,
    pub monitor: MonitorConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AcquisitionConfig {
    /// Directory where chunked CSV data files are written
    pub data_directory: String,
    pub channels: u16,
    /// Sample rate in Hz, per channel
    pub sample_rate: u32,
    /// Seconds of data per output file before rotating
    pub file_duration_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Index into the DAQ device inventory
    pub descriptor_index: usize,
    /// Index into the analog-input range list reported by the device
    pub range_index: usize,
    /// Use the simulated backend instead of hardware
    pub simulate: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Display refresh rate in Hz
    pub apptick_hz: f64,
}

impl Default for AcquisitionConfig {
    fn default() -> Self {
        Self {
            data_directory: "./".to_string(),
            channels: 2,
            sample_rate: 1000,
            file_duration_secs: 1,
        }
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            descriptor_index: 0,
            range_index: 0,
            simulate: false,
        }
    }
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self { apptick_hz: 10.0 }
    }
}

impl Config {
    /// Load configuration from a file, falling back to defaults if the
    /// file does not exist.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .build()?;

        Ok(settings.try_deserialize()?)
    }
}
