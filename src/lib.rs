pub mod config;
pub mod daq;
pub mod monitor;
pub mod session;
pub mod writer;

pub use config::Config;
pub use daq::{
    DaqBackend, DaqBackendConfig, DaqBackendFactory, DaqSource, ScanFrame, SimulatedBackend,
};
pub use session::{ScanSession, SessionConfig, SessionStats};
pub use writer::{newest_complete_file, ChunkConfig, ChunkMetadata, ChunkedWriter};
