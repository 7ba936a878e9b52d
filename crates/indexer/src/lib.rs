//! # Repograph Indexer
//!
//! Repository graph indexing for code search and LLM context retrieval.
//!
//! ## Pipeline
//!
//! ```text
//! FileSource (local walk / remote API / fixture)
//!     │
//!     ├──> Language Registry (extension → validated grammar)
//!     │      └─> AST extraction (defs, imports, calls, docs)
//!     │
//!     ├──> Graph Assembler
//!     │      ├─ REPO/FILE/SYMBOL/IMPORT/COMMENT/CHUNK nodes
//!     │      ├─ CONTAINS/DOCS_FOR/PART_OF/NEXT_CHUNK edges
//!     │      └─ two-pass CALLS resolution (file-local, then global-unique)
//!     │
//!     ├──> Embedder (best-effort, batched)
//!     │      └─> packed embedding table
//!     │
//!     └──> Inverted index (token → node IDs, derived view)
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use repograph_indexer::{IndexOptions, LocalFileSource, RepoIndexer};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let indexer = RepoIndexer::new();
//!     let source = LocalFileSource::new("/path/to/checkout");
//!     let output = indexer
//!         .index_repo("acme/widgets", &source, &IndexOptions::default())
//!         .await?;
//!
//!     println!(
//!         "{} nodes, {} tokens",
//!         output.graph.node_count(),
//!         output.inverted.len()
//!     );
//!     Ok(())
//! }
//! ```
//!
//! Background runs go through [`IndexCoordinator`], which deduplicates by
//! repository key and commit hash and keeps the durable
//! [`RepositoryIndexRecord`] bookkeeping.

mod builder;
mod coordinator;
mod error;
mod indexer;
mod source;
mod stats;

pub use coordinator::{
    CommitProvider, IndexCoordinator, IndexRunner, MemoryIndexStore, RepositoryIndexRecord,
    RepositoryIndexStore, RunnerFn, StartOptions, StartOutcome,
};
pub use error::{IndexerError, Result};
pub use indexer::{IndexOptions, IndexOutput, RepoIndexer};
pub use source::{FileSource, LocalFileSource, MemoryFileSource, SourceFile};
pub use stats::IndexStats;
