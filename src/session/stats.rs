use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Statistics about a scan session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStats {
    /// Whether the scan is currently active
    pub is_scanning: bool,

    /// When the scan started
    pub started_at: DateTime<Utc>,

    /// Total duration in seconds
    pub duration_secs: f64,

    /// Number of data files written so far
    pub files_written: usize,

    /// Number of scans (CSV rows) written so far
    pub rows_written: usize,
}
