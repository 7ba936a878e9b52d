use crate::graph::RepoGraph;
use std::collections::{BTreeMap, BTreeSet};

/// Token → node-ID postings map derived from a graph.
pub type InvertedIndex = BTreeMap<String, BTreeSet<String>>;

/// Minimum token length kept in the index; single characters are noise.
const MIN_TOKEN_LEN: usize = 2;

/// Build the lexical postings structure for a finished graph.
///
/// Pure function of the graph: for every node, the concatenation of `code`,
/// `signature` and `name` (whichever are present) is tokenized and the
/// node's ID added to each token's posting set. No stemming, no ranking;
/// this is a rebuildable derived view, never a source of truth.
#[must_use]
pub fn build_inverted(graph: &RepoGraph) -> InvertedIndex {
    let mut index = InvertedIndex::new();

    for node in graph.nodes() {
        let mut seen = BTreeSet::new();
        for text in [node.code.as_deref(), node.signature.as_deref(), Some(node.name.as_str())]
            .into_iter()
            .flatten()
        {
            for token in tokenize(text) {
                if seen.insert(token.clone()) {
                    index.entry(token).or_default().insert(node.id.clone());
                }
            }
        }
    }

    index
}

/// Split text into lowercased alphanumeric runs of length ≥ 2.
pub fn tokenize(text: &str) -> impl Iterator<Item = String> + '_ {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() >= MIN_TOKEN_LEN)
        .map(str::to_lowercase)
}
