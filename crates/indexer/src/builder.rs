use crate::error::Result;
use crate::source::SourceFile;
use crate::stats::IndexStats;
use repograph_chunker::{chunk_symbol, ChunkerConfig};
use repograph_graph::{node_id, EdgeKind, GraphEdge, GraphNode, NodeKind, RepoGraph, Span};
use repograph_languages::{extract, Extraction, LanguageRegistry, LoadedLanguage};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Signatures are single-line and hard-capped.
const MAX_SIGNATURE_CHARS: usize = 200;

/// Import node names keep only a prefix of the import text.
const MAX_IMPORT_NAME_CHARS: usize = 64;

/// Comment node names keep only the first line, capped.
const MAX_COMMENT_NAME_CHARS: usize = 64;

/// Materializes one repository's graph from enumerated files.
///
/// Two-pass by design: every file's symbols are registered before any call
/// is resolved, so cross-file resolution never depends on file order. A
/// failing file is logged and skipped; it never aborts the run.
pub struct GraphAssembler {
    registry: Arc<LanguageRegistry>,
    chunker_config: ChunkerConfig,
}

/// A symbol known to the resolver.
#[derive(Debug, Clone)]
struct SymbolRef {
    id: String,
    span: Span,
}

/// Call site awaiting resolution after all files are extracted.
struct PendingCall {
    file_path: String,
    callee: String,
    span: Span,
}

/// Per-run resolution state.
#[derive(Default)]
struct SymbolTables {
    /// path → (name → node id); an object-map per file, last definition wins
    per_file: HashMap<String, HashMap<String, String>>,
    /// path → symbols in source order, for enclosing-symbol lookup
    file_symbols: HashMap<String, Vec<SymbolRef>>,
    /// name → every node id defining it, across all files
    global: HashMap<String, Vec<String>>,
}

impl GraphAssembler {
    #[must_use]
    pub fn new(registry: Arc<LanguageRegistry>, chunker_config: ChunkerConfig) -> Self {
        Self {
            registry,
            chunker_config,
        }
    }

    /// Build the full graph for `repo_name` over the given files.
    pub fn assemble(
        &self,
        repo_name: &str,
        files: &[SourceFile],
        stats: &mut IndexStats,
    ) -> Result<RepoGraph> {
        let repo_id = repograph_graph::repo_id(repo_name);
        let mut graph = RepoGraph::new(repo_id.clone());

        let repo_node_id = graph.insert_node(GraphNode::new(
            node_id(&repo_id, "", NodeKind::Repo, repo_name, None),
            NodeKind::Repo,
            repo_name,
            "",
        ))?;

        let mut tables = SymbolTables::default();
        let mut pending_calls: Vec<PendingCall> = Vec::new();

        // Pass 1: extract and materialize every file.
        for file in files {
            let Some(loaded) = self.registry.resolve(&file.path) else {
                log::debug!("Skipping unsupported file {}", file.path);
                stats.skipped += 1;
                continue;
            };

            match self.assemble_file(
                &repo_id,
                &repo_node_id,
                file,
                &loaded,
                &mut graph,
                &mut tables,
                &mut pending_calls,
                stats,
            ) {
                Ok(()) => stats.add_file(loaded.spec.id.as_str()),
                Err(e) => {
                    log::warn!("Failed to index {}: {e}", file.path);
                    stats.skipped += 1;
                    stats.add_error(format!("{}: {e}", file.path));
                }
            }
        }

        // Pass 2: resolve calls against the fully populated registries.
        // Edges may repeat only when their meta differs; two calls to the
        // same target on the same line collapse into one edge.
        let mut seen_calls: HashSet<(String, String, usize)> = HashSet::new();
        for call in &pending_calls {
            if let Some(edge) = resolve_call(call, &tables) {
                let key = (edge.from.clone(), edge.to.clone(), call.span.start_line);
                if !seen_calls.insert(key) {
                    continue;
                }
                graph.add_edge(edge)?;
                stats.calls += 1;
            }
        }

        log::info!(
            "Assembled graph for {repo_name}: {} nodes, {} edges",
            graph.node_count(),
            graph.edge_count()
        );

        Ok(graph)
    }

    #[allow(clippy::too_many_arguments)]
    fn assemble_file(
        &self,
        repo_id: &str,
        repo_node_id: &str,
        file: &SourceFile,
        loaded: &LoadedLanguage,
        graph: &mut RepoGraph,
        tables: &mut SymbolTables,
        pending_calls: &mut Vec<PendingCall>,
        stats: &mut IndexStats,
    ) -> Result<()> {
        let lang = loaded.spec.id.as_str();

        let mut parser = loaded
            .parser()
            .map_err(|e| crate::error::IndexerError::Other(e.to_string()))?;
        let tree = parser.parse(&file.content, None).ok_or_else(|| {
            crate::error::IndexerError::Other("parser produced no tree".to_string())
        })?;

        let extraction = extract(tree.root_node(), loaded.spec, &file.content);

        let file_name = file
            .path
            .rsplit('/')
            .next()
            .unwrap_or(file.path.as_str());
        let file_node_id = graph.insert_node(
            GraphNode::new(
                node_id(repo_id, &file.path, NodeKind::File, file_name, None),
                NodeKind::File,
                file_name,
                &file.path,
            )
            .with_lang(lang),
        )?;
        graph.add_edge(GraphEdge::new(
            repo_node_id,
            &file_node_id,
            EdgeKind::Contains,
        ))?;

        self.add_symbols(repo_id, file, lang, &extraction, &file_node_id, graph, tables)?;
        add_comments(repo_id, file, lang, &extraction, &file_node_id, graph, tables)?;
        add_imports(repo_id, file, lang, &extraction, &file_node_id, graph)?;
        self.add_chunks(repo_id, file, lang, graph, tables, stats)?;

        for call in &extraction.calls {
            pending_calls.push(PendingCall {
                file_path: file.path.clone(),
                callee: call.name.clone(),
                span: call.span,
            });
        }

        Ok(())
    }

    fn add_symbols(
        &self,
        repo_id: &str,
        file: &SourceFile,
        lang: &str,
        extraction: &Extraction,
        file_node_id: &str,
        graph: &mut RepoGraph,
        tables: &mut SymbolTables,
    ) -> Result<()> {
        let file_map = tables.per_file.entry(file.path.clone()).or_default();
        let symbols = tables.file_symbols.entry(file.path.clone()).or_default();

        for def in &extraction.defs {
            let signature = signature_of(&file.content, &def.span);
            let id = graph.insert_node(
                GraphNode::new(
                    node_id(
                        repo_id,
                        &file.path,
                        NodeKind::Symbol,
                        &def.name,
                        Some(&def.span),
                    ),
                    NodeKind::Symbol,
                    &def.name,
                    &file.path,
                )
                .with_lang(lang)
                .with_span(def.span)
                .with_signature(signature),
            )?;
            graph.add_edge(GraphEdge::new(file_node_id, &id, EdgeKind::Contains))?;

            file_map.insert(def.name.clone(), id.clone());
            tables
                .global
                .entry(def.name.clone())
                .or_default()
                .push(id.clone());
            symbols.push(SymbolRef { id, span: def.span });
        }

        symbols.sort_by_key(|s| (s.span.start_line, s.span.end_line));
        Ok(())
    }

    fn add_chunks(
        &self,
        repo_id: &str,
        file: &SourceFile,
        lang: &str,
        graph: &mut RepoGraph,
        tables: &SymbolTables,
        stats: &mut IndexStats,
    ) -> Result<()> {
        let Some(symbols) = tables.file_symbols.get(&file.path) else {
            return Ok(());
        };

        for symbol in symbols {
            let symbol_name = graph
                .node(&symbol.id)
                .map(|n| n.name.clone())
                .unwrap_or_default();
            let slices = chunk_symbol(&symbol.span, &file.content, &self.chunker_config)?;

            let mut previous: Option<String> = None;
            for slice in slices {
                let chunk_span = Span::new(
                    slice.start_line,
                    slice.end_line,
                    slice.start_byte,
                    slice.end_byte,
                );
                let chunk_name = format!("{symbol_name}#{}", slice.index);
                let chunk_id = graph.insert_node(
                    GraphNode::new(
                        node_id(
                            repo_id,
                            &file.path,
                            NodeKind::Chunk,
                            &chunk_name,
                            Some(&chunk_span),
                        ),
                        NodeKind::Chunk,
                        chunk_name,
                        &file.path,
                    )
                    .with_lang(lang)
                    .with_span(chunk_span)
                    .with_code(slice.code),
                )?;

                graph.add_edge(GraphEdge::new(&symbol.id, &chunk_id, EdgeKind::PartOf))?;
                if let Some(prev) = previous {
                    graph.add_edge(GraphEdge::new(prev, &chunk_id, EdgeKind::NextChunk))?;
                }
                previous = Some(chunk_id);
                stats.chunks += 1;
            }

            stats.symbols += 1;
        }

        Ok(())
    }
}

fn add_comments(
    repo_id: &str,
    file: &SourceFile,
    lang: &str,
    extraction: &Extraction,
    file_node_id: &str,
    graph: &mut RepoGraph,
    tables: &SymbolTables,
) -> Result<()> {
    let symbols = tables.file_symbols.get(&file.path);

    for doc_span in &extraction.docs {
        let text = slice_span(&file.content, doc_span);
        let name = truncate_chars(text.lines().next().unwrap_or(""), MAX_COMMENT_NAME_CHARS);
        let comment_id = graph.insert_node(
            GraphNode::new(
                node_id(
                    repo_id,
                    &file.path,
                    NodeKind::Comment,
                    &name,
                    Some(doc_span),
                ),
                NodeKind::Comment,
                name,
                &file.path,
            )
            .with_lang(lang)
            .with_span(*doc_span)
            .with_doc(text),
        )?;
        graph.add_edge(GraphEdge::new(
            file_node_id,
            &comment_id,
            EdgeKind::Contains,
        ))?;

        // Positional heuristic, not a parser-verified association: the doc
        // describes the first symbol that starts at or after its last line.
        if let Some(symbol) = symbols.and_then(|s| nearest_following_symbol(s, doc_span)) {
            graph.add_edge(GraphEdge::new(&comment_id, &symbol.id, EdgeKind::DocsFor))?;
        }
    }

    Ok(())
}

fn add_imports(
    repo_id: &str,
    file: &SourceFile,
    lang: &str,
    extraction: &Extraction,
    file_node_id: &str,
    graph: &mut RepoGraph,
) -> Result<()> {
    for import_span in &extraction.imports {
        let text = slice_span(&file.content, import_span);
        let name = truncate_chars(text.trim(), MAX_IMPORT_NAME_CHARS);
        let import_id = graph.insert_node(
            GraphNode::new(
                node_id(
                    repo_id,
                    &file.path,
                    NodeKind::Import,
                    &name,
                    Some(import_span),
                ),
                NodeKind::Import,
                name,
                &file.path,
            )
            .with_lang(lang)
            .with_span(*import_span)
            .with_code(text),
        )?;
        graph.add_edge(GraphEdge::new(
            file_node_id,
            &import_id,
            EdgeKind::Contains,
        ))?;
    }

    Ok(())
}

/// Two-tier conservative resolution: the current file's symbol map first,
/// then the global registry only when it holds exactly one definition.
/// Ambiguity yields no edge, never a guess.
fn resolve_call(call: &PendingCall, tables: &SymbolTables) -> Option<GraphEdge> {
    let symbols = tables.file_symbols.get(&call.file_path)?;
    let caller = enclosing_symbol(symbols, call.span.start_line)?;

    let target = match tables
        .per_file
        .get(&call.file_path)
        .and_then(|map| map.get(&call.callee))
    {
        Some(id) => id.clone(),
        None => match tables.global.get(&call.callee) {
            Some(ids) if ids.len() == 1 => ids[0].clone(),
            _ => return None,
        },
    };

    Some(
        GraphEdge::new(&caller.id, target, EdgeKind::Calls)
            .with_meta("line", call.span.start_line),
    )
}

/// Innermost symbol whose span covers the given line.
fn enclosing_symbol(symbols: &[SymbolRef], line: usize) -> Option<&SymbolRef> {
    symbols
        .iter()
        .filter(|s| s.span.contains_line(line))
        .min_by_key(|s| s.span.line_count())
}

/// First symbol starting at or after the doc span's last line.
fn nearest_following_symbol<'a>(symbols: &'a [SymbolRef], doc: &Span) -> Option<&'a SymbolRef> {
    symbols
        .iter()
        .filter(|s| s.span.start_line >= doc.end_line)
        .min_by_key(|s| s.span.start_line)
}

fn signature_of(content: &str, span: &Span) -> String {
    let first_line = content
        .lines()
        .nth(span.start_line.saturating_sub(1))
        .unwrap_or("");
    truncate_chars(first_line.trim_end(), MAX_SIGNATURE_CHARS)
}

fn slice_span(content: &str, span: &Span) -> String {
    content
        .get(span.start_byte..span.end_byte)
        .unwrap_or("")
        .to_string()
}

fn truncate_chars(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push_str("...");
    out
}
