//! # Repograph Embedder
//!
//! Pluggable chunk embedding. Providers are selected by configuration, not
//! subclassing:
//!
//! - **local**: ONNX transformer via `ort` + `tokenizers` (mean pooling,
//!   L2 normalized), optionally quantized;
//! - **remote**: JSON embeddings API over HTTP;
//! - **hash**: deterministic unit vectors from a content hash, for tests
//!   and environments without model assets.
//!
//! Embedding is best-effort by contract: callers batch chunks, and a failed
//! batch leaves its chunks without vectors instead of failing the run. The
//! run's output is an [`EmbeddingTable`]: one packed float32 buffer plus
//! `chunk id → (offset, len)` spans, avoiding per-chunk allocations at
//! serialization time.

mod config;
mod error;
mod provider;
mod table;

pub use config::{EmbedConfig, EmbedProviderKind};
pub use error::{EmbedderError, Result};
pub use provider::Embedder;
pub use table::{EmbeddingTable, TableSpan};
