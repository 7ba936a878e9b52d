use crate::error::{EmbedderError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Location of one chunk's vector inside the packed buffer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSpan {
    pub offset: usize,
    pub len: usize,
}

/// Packed embedding table emitted at the end of an indexing run.
///
/// All vectors live in one contiguous float32 buffer; `spans` maps chunk IDs
/// to `(offset, len)` windows. This keeps serialization to a single
/// allocation instead of one per chunk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingTable {
    dim: usize,
    buffer: Vec<f32>,
    spans: BTreeMap<String, TableSpan>,
}

impl EmbeddingTable {
    #[must_use]
    pub const fn new(dim: usize) -> Self {
        Self {
            dim,
            buffer: Vec::new(),
            spans: BTreeMap::new(),
        }
    }

    /// Append a chunk's vector. The vector must match the table dimension.
    pub fn insert(&mut self, chunk_id: impl Into<String>, vector: &[f32]) -> Result<()> {
        if vector.len() != self.dim {
            return Err(EmbedderError::InvalidDimension {
                expected: self.dim,
                actual: vector.len(),
            });
        }
        let span = TableSpan {
            offset: self.buffer.len(),
            len: vector.len(),
        };
        self.buffer.extend_from_slice(vector);
        self.spans.insert(chunk_id.into(), span);
        Ok(())
    }

    /// Vector for a chunk, if one was embedded.
    #[must_use]
    pub fn get(&self, chunk_id: &str) -> Option<&[f32]> {
        let span = self.spans.get(chunk_id)?;
        self.buffer.get(span.offset..span.offset + span.len)
    }

    #[must_use]
    pub const fn dim(&self) -> usize {
        self.dim
    }

    /// Number of embedded chunks
    #[must_use]
    pub fn len(&self) -> usize {
        self.spans.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.spans.is_empty()
    }

    /// The packed float32 buffer
    #[must_use]
    pub fn buffer(&self) -> &[f32] {
        &self.buffer
    }

    pub fn spans(&self) -> impl Iterator<Item = (&str, TableSpan)> {
        self.spans.iter().map(|(id, span)| (id.as_str(), *span))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn insert_and_get_round_trip_by_offsets() {
        let mut table = EmbeddingTable::new(3);
        table.insert("chunk-a", &[1.0, 2.0, 3.0]).unwrap();
        table.insert("chunk-b", &[4.0, 5.0, 6.0]).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(table.get("chunk-a"), Some(&[1.0, 2.0, 3.0][..]));
        assert_eq!(table.get("chunk-b"), Some(&[4.0, 5.0, 6.0][..]));
        assert_eq!(table.get("chunk-c"), None);
        assert_eq!(table.buffer().len(), 6);
    }

    #[test]
    fn dimension_mismatch_is_rejected() {
        let mut table = EmbeddingTable::new(4);
        assert!(table.insert("chunk-a", &[1.0, 2.0]).is_err());
        assert!(table.is_empty());
    }

    #[test]
    fn serialization_round_trip() {
        let mut table = EmbeddingTable::new(2);
        table.insert("c1", &[0.5, -0.5]).unwrap();
        let json = serde_json::to_string(&table).unwrap();
        let back: EmbeddingTable = serde_json::from_str(&json).unwrap();
        assert_eq!(back.dim(), 2);
        assert_eq!(back.get("c1"), Some(&[0.5, -0.5][..]));
    }
}
