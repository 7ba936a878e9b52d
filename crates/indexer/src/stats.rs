use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Statistics for one indexing run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexStats {
    /// Files materialized into the graph
    pub files: usize,

    /// Files skipped (unsupported language or parse failure)
    pub skipped: usize,

    /// Symbols extracted
    pub symbols: usize,

    /// Chunks created
    pub chunks: usize,

    /// Resolved call edges
    pub calls: usize,

    /// Chunks that received an embedding
    pub embedded: usize,

    /// Time taken in milliseconds
    pub time_ms: u64,

    /// File counts per language
    pub languages: HashMap<String, usize>,

    /// Non-fatal errors encountered
    pub errors: Vec<String>,
}

impl IndexStats {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, language: &str) {
        self.files += 1;
        *self.languages.entry(language.to_string()).or_insert(0) += 1;
    }

    pub fn add_error(&mut self, error: impl Into<String>) {
        self.errors.push(error.into());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn per_language_counts_accumulate() {
        let mut stats = IndexStats::new();
        stats.add_file("rust");
        stats.add_file("rust");
        stats.add_file("python");
        assert_eq!(stats.files, 3);
        assert_eq!(stats.languages["rust"], 2);
        assert_eq!(stats.languages["python"], 1);
    }
}
