use serde::{Deserialize, Serialize};

/// One line window of a symbol's source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkSlice {
    /// Position within the symbol's chunk chain (0-based)
    pub index: usize,

    /// First source line of the window (1-indexed)
    pub start_line: usize,

    /// Last source line of the window (1-indexed, inclusive)
    pub end_line: usize,

    /// Byte offset of the window start in the original source
    pub start_byte: usize,

    /// Byte offset one past the window end in the original source
    pub end_byte: usize,

    /// Verbatim source slice, newlines included; concatenating a symbol's
    /// slices in index order reproduces its span exactly
    pub code: String,
}

impl ChunkSlice {
    /// Number of lines in this window
    #[must_use]
    pub const fn line_count(&self) -> usize {
        self.end_line.saturating_sub(self.start_line) + 1
    }
}
