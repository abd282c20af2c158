pub mod chunk;

pub use chunk::{newest_complete_file, ChunkConfig, ChunkMetadata, ChunkedWriter};
