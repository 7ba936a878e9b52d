use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Kind of a graph node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeKind {
    /// The repository itself (one per graph)
    Repo,
    /// A source file
    File,
    /// A named definition (function, class, method, constant, ...)
    Symbol,
    /// An import/use statement
    Import,
    /// A comment or doc-comment span
    Comment,
    /// A bounded slice of a symbol's source, the unit of embedding
    Chunk,
}

impl NodeKind {
    /// Canonical name, also used in ID hashing
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Repo => "REPO",
            Self::File => "FILE",
            Self::Symbol => "SYMBOL",
            Self::Import => "IMPORT",
            Self::Comment => "COMMENT",
            Self::Chunk => "CHUNK",
        }
    }
}

/// Kind of a directed edge between nodes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EdgeKind {
    /// Structural containment (repo → file, file → symbol/import/comment)
    Contains,
    /// Resolved call from one symbol to another
    Calls,
    /// Comment documents the symbol it precedes
    DocsFor,
    /// Chunk belongs to a symbol
    PartOf,
    /// Chunk is followed by the next chunk of the same symbol
    NextChunk,
}

impl EdgeKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Contains => "CONTAINS",
            Self::Calls => "CALLS",
            Self::DocsFor => "DOCS_FOR",
            Self::PartOf => "PART_OF",
            Self::NextChunk => "NEXT_CHUNK",
        }
    }
}

/// Source span of a node, sufficient to re-slice the original file.
///
/// Lines are 1-indexed and `end_line` is inclusive; byte offsets are
/// 0-indexed with `end_byte` exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start_line: usize,
    pub end_line: usize,
    pub start_byte: usize,
    pub end_byte: usize,
}

impl Span {
    #[must_use]
    pub const fn new(
        start_line: usize,
        end_line: usize,
        start_byte: usize,
        end_byte: usize,
    ) -> Self {
        Self {
            start_line,
            end_line,
            start_byte,
            end_byte,
        }
    }

    /// Number of source lines covered by this span
    #[must_use]
    pub const fn line_count(&self) -> usize {
        self.end_line.saturating_sub(self.start_line) + 1
    }

    /// Check if the span covers a specific line
    #[must_use]
    pub const fn contains_line(&self, line: usize) -> bool {
        line >= self.start_line && line <= self.end_line
    }

    /// Canonical form used in ID hashing; must stay byte-stable across
    /// releases or previously issued IDs change.
    #[must_use]
    pub fn canonical(&self) -> String {
        format!(
            "{}:{}-{}:{}",
            self.start_line, self.start_byte, self.end_line, self.end_byte
        )
    }
}

/// Node in the repository graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphNode {
    /// Stable content-addressed identifier
    pub id: String,

    /// Node kind
    pub kind: NodeKind,

    /// Display name (symbol name, file name, import text, ...)
    pub name: String,

    /// Repository-relative file path ("" for the REPO node)
    pub path: String,

    /// Language id, when the node belongs to a parsed file
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,

    /// Source span, when the node maps to a source region
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<Span>,

    /// Truncated single-line signature (symbols only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,

    /// Source slice (chunks carry their window; comments their text)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,

    /// Documentation text associated with the node
    #[serde(skip_serializing_if = "Option::is_none")]
    pub doc: Option<String>,

    /// Embedding vector, populated in memory by the embedder. Vectors are
    /// serialized through the packed embedding table, never the graph JSON.
    #[serde(skip)]
    pub embedding: Option<Vec<f32>>,

    /// Free-form metadata
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub meta: Map<String, Value>,
}

impl GraphNode {
    /// Create a node with the required fields; optional fields start empty
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        kind: NodeKind,
        name: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            kind,
            name: name.into(),
            path: path.into(),
            lang: None,
            span: None,
            signature: None,
            code: None,
            doc: None,
            embedding: None,
            meta: Map::new(),
        }
    }

    /// Builder: set language
    #[must_use]
    pub fn with_lang(mut self, lang: impl Into<String>) -> Self {
        self.lang = Some(lang.into());
        self
    }

    /// Builder: set span
    #[must_use]
    pub const fn with_span(mut self, span: Span) -> Self {
        self.span = Some(span);
        self
    }

    /// Builder: set signature
    #[must_use]
    pub fn with_signature(mut self, signature: impl Into<String>) -> Self {
        self.signature = Some(signature.into());
        self
    }

    /// Builder: set code slice
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Builder: set doc text
    #[must_use]
    pub fn with_doc(mut self, doc: impl Into<String>) -> Self {
        self.doc = Some(doc.into());
        self
    }
}

/// Directed edge in the repository graph
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphEdge {
    /// Source node id
    pub from: String,

    /// Target node id
    pub to: String,

    /// Edge kind
    pub kind: EdgeKind,

    /// Free-form metadata (e.g. call-site line for CALLS edges)
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub meta: Map<String, Value>,
}

impl GraphEdge {
    #[must_use]
    pub fn new(from: impl Into<String>, to: impl Into<String>, kind: EdgeKind) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
            kind,
            meta: Map::new(),
        }
    }

    /// Builder: attach a metadata entry
    #[must_use]
    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.meta.insert(key.into(), value.into());
        self
    }
}
