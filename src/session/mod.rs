//! Scan session management
//!
//! This module provides the `ScanSession` abstraction that manages:
//! - Analog input acquisition through a `DaqBackend`
//! - Chunked CSV output via the writer
//! - Session statistics and the on-disk summary

mod config;
mod session;
mod stats;

pub use config::SessionConfig;
pub use session::ScanSession;
pub use stats::SessionStats;
