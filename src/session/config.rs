use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::daq::DaqSource;

/// Configuration for a scan session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Unique session identifier
    pub session_id: String,

    /// Number of analog input channels to acquire (channels 0..N-1)
    pub channels: u16,

    /// Sample rate in Hz, per channel
    pub sample_rate: u32,

    /// Seconds of data per output file before rotating
    pub file_duration_secs: u64,

    /// Directory the data files are written into
    pub data_directory: PathBuf,

    /// Which backend acquires the data
    #[serde(skip, default = "default_source")]
    pub source: DaqSource,
}

fn default_source() -> DaqSource {
    DaqSource::Simulated
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_id: format!("scan-{}", uuid::Uuid::new_v4()),
            channels: 2,
            sample_rate: 1000,
            file_duration_secs: 1,
            data_directory: PathBuf::from("./"),
            source: default_source(),
        }
    }
}
