pub mod chunker;

pub use chunker::{chunk, ChunkLevel};
