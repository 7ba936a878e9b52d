use crate::builder::GraphAssembler;
use crate::error::Result;
use crate::source::FileSource;
use crate::stats::IndexStats;
use repograph_chunker::ChunkerConfig;
use repograph_embedder::{EmbedConfig, Embedder, EmbeddingTable};
use repograph_graph::{build_inverted, InvertedIndex, NodeKind, RepoGraph};
use repograph_languages::LanguageRegistry;
use std::sync::Arc;
use std::time::Instant;

/// Options for one indexing run
#[derive(Debug, Clone)]
pub struct IndexOptions {
    /// Maximum lines per chunk
    pub max_chunk_lines: usize,

    /// Compute embeddings for chunks
    pub embed: bool,

    /// Provider, model, batch size and quantization for embedding
    pub embed_config: EmbedConfig,

    /// When set, only files whose path starts with one of these prefixes
    /// are indexed
    pub paths: Option<Vec<String>>,
}

impl Default for IndexOptions {
    fn default() -> Self {
        Self {
            max_chunk_lines: 200,
            embed: false,
            embed_config: EmbedConfig::default(),
            paths: None,
        }
    }
}

/// Everything a run hands to its callers. The graph lives in memory for one
/// run; persistence is the caller's concern.
pub struct IndexOutput {
    pub graph: RepoGraph,
    pub graph_json: serde_json::Value,
    pub inverted: InvertedIndex,
    pub embeddings: Option<EmbeddingTable>,
    pub stats: IndexStats,
}

/// Repository indexer: drives file enumeration, per-file extraction, chunk
/// and embedding wiring, and the derived inverted index.
pub struct RepoIndexer {
    registry: Arc<LanguageRegistry>,
}

impl RepoIndexer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            registry: Arc::new(LanguageRegistry::new()),
        }
    }

    /// Share a registry across indexers so grammars load once per process.
    #[must_use]
    pub fn with_registry(registry: Arc<LanguageRegistry>) -> Self {
        Self { registry }
    }

    /// Index one repository from the given file source.
    ///
    /// Only file enumeration failure is fatal. Unsupported files, parse
    /// failures and embedding provider failures are logged, counted in
    /// `stats`, and never abort the run.
    pub async fn index_repo(
        &self,
        repo_name: &str,
        source: &dyn FileSource,
        options: &IndexOptions,
    ) -> Result<IndexOutput> {
        let started = Instant::now();
        let mut stats = IndexStats::new();

        log::info!("Indexing {repo_name}");

        let mut files = source.list_files().await?;
        if let Some(prefixes) = &options.paths {
            files.retain(|f| prefixes.iter().any(|p| f.path.starts_with(p.as_str())));
        }

        let assembler = GraphAssembler::new(
            self.registry.clone(),
            ChunkerConfig::with_max_lines(options.max_chunk_lines),
        );
        let mut graph = assembler.assemble(repo_name, &files, &mut stats)?;

        let embeddings = if options.embed {
            self.embed_chunks(&mut graph, &options.embed_config, &mut stats)
                .await
        } else {
            None
        };

        let inverted = build_inverted(&graph);
        let graph_json = graph.to_json()?;

        #[allow(clippy::cast_possible_truncation)]
        {
            stats.time_ms = started.elapsed().as_millis() as u64;
        }
        log::info!(
            "Indexed {repo_name}: {} files, {} symbols, {} chunks, {} call edges in {} ms",
            stats.files,
            stats.symbols,
            stats.chunks,
            stats.calls,
            stats.time_ms
        );

        Ok(IndexOutput {
            graph,
            graph_json,
            inverted,
            embeddings,
            stats,
        })
    }

    /// Best-effort embedding: batches of chunks go to the provider; a failed
    /// batch leaves its chunks without vectors and the run continues.
    async fn embed_chunks(
        &self,
        graph: &mut RepoGraph,
        config: &EmbedConfig,
        stats: &mut IndexStats,
    ) -> Option<EmbeddingTable> {
        let embedder = match Embedder::from_config(config) {
            Ok(embedder) => embedder,
            Err(e) => {
                log::warn!("Embedding provider unavailable: {e}");
                stats.add_error(format!("embedding provider: {e}"));
                return None;
            }
        };

        // BTreeMap iteration keeps chunk order deterministic across runs.
        let chunks: Vec<(String, String)> = graph
            .nodes_of_kind(NodeKind::Chunk)
            .map(|n| (n.id.clone(), n.code.clone().unwrap_or_default()))
            .collect();

        let mut table = EmbeddingTable::new(embedder.dimension());

        for batch in chunks.chunks(embedder.batch_size()) {
            let texts: Vec<String> = batch.iter().map(|(_, code)| code.clone()).collect();
            match embedder.embed_batch(texts).await {
                Ok(vectors) => {
                    for ((chunk_id, _), vector) in batch.iter().zip(vectors) {
                        if let Err(e) = table.insert(chunk_id.clone(), &vector) {
                            log::warn!("Dropping embedding for {chunk_id}: {e}");
                            stats.add_error(format!("embedding {chunk_id}: {e}"));
                            continue;
                        }
                        if let Some(node) = graph.node_mut(chunk_id) {
                            node.embedding = Some(vector);
                        }
                        stats.embedded += 1;
                    }
                }
                Err(e) => {
                    log::warn!("Embedding batch of {} chunks failed: {e}", batch.len());
                    stats.add_error(format!("embedding batch: {e}"));
                }
            }
        }

        Some(table)
    }
}

impl Default for RepoIndexer {
    fn default() -> Self {
        Self::new()
    }
}
