pub mod backend;
pub mod sim;

#[cfg(feature = "hardware")]
pub mod uldaq;

pub use backend::{DaqBackend, DaqBackendConfig, DaqBackendFactory, DaqSource, ScanFrame};
pub use sim::SimulatedBackend;
