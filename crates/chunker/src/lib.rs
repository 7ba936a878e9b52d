//! # Repograph Chunker
//!
//! Splits a symbol's source span into ordered, size-bounded code chunks:
//! the unit of embedding. Chunks are plain line windows, so concatenating a
//! symbol's chunks in order reproduces its span exactly.

mod chunker;
mod config;
mod error;
mod types;

pub use chunker::chunk_symbol;
pub use config::ChunkerConfig;
pub use error::{ChunkerError, Result};
pub use types::ChunkSlice;
