use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexerError>;

#[derive(Error, Debug)]
pub enum IndexerError {
    /// Without a file list, no run is possible; this is the only fatal
    /// per-run condition.
    #[error("File enumeration failed: {0}")]
    FileEnumeration(String),

    #[error("Graph error: {0}")]
    Graph(#[from] repograph_graph::GraphError),

    #[error("Chunker error: {0}")]
    Chunker(#[from] repograph_chunker::ChunkerError),

    #[error("Embedder error: {0}")]
    Embedder(#[from] repograph_embedder::EmbedderError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("{0}")]
    Other(String),
}
