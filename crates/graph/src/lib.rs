//! # Repograph Graph
//!
//! Typed repository graph with stable content-addressed identifiers.
//!
//! ## Data model
//!
//! ```text
//! RepoGraph
//!     ├─ nodes: id → GraphNode   (REPO, FILE, SYMBOL, IMPORT, COMMENT, CHUNK)
//!     └─ edges: GraphEdge[]      (CONTAINS, CALLS, DOCS_FOR, PART_OF, NEXT_CHUNK)
//! ```
//!
//! Node IDs are SHA-256 hashes of a canonical `(repo, path, kind, name, loc)`
//! tuple, so re-indexing unchanged source reproduces identical IDs. The
//! inverted index is a derived view: a token → node-ID postings map that can
//! always be rebuilt from the graph.

mod error;
mod graph;
mod ids;
mod inverted;
mod types;

pub use error::{GraphError, Result};
pub use graph::RepoGraph;
pub use ids::{node_id, repo_id};
pub use inverted::{build_inverted, tokenize, InvertedIndex};
pub use types::{EdgeKind, GraphEdge, GraphNode, NodeKind, Span};
