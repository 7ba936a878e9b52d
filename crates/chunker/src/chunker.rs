use crate::config::ChunkerConfig;
use crate::error::{ChunkerError, Result};
use crate::types::ChunkSlice;
use repograph_graph::Span;

/// Slice a symbol's line range into consecutive windows of at most
/// `config.max_lines` lines, preserving source order.
///
/// The last window may be shorter; a symbol spanning `max_lines` or fewer
/// lines yields exactly one chunk. Windows are cut on line boundaries of the
/// original file, so the chunks concatenate back to the symbol's span.
pub fn chunk_symbol(span: &Span, source: &str, config: &ChunkerConfig) -> Result<Vec<ChunkSlice>> {
    config.validate()?;

    // Lines with their terminators, so windows re-join losslessly.
    let lines: Vec<&str> = source.split_inclusive('\n').collect();
    if span.start_line == 0 || span.end_line < span.start_line || span.end_line > lines.len() {
        return Err(ChunkerError::SpanOutOfBounds {
            start: span.start_line,
            end: span.end_line,
            total: lines.len(),
        });
    }

    // Byte offset of each line start, plus the end-of-source sentinel.
    let mut line_offsets = Vec::with_capacity(lines.len() + 1);
    let mut offset = 0;
    for line in &lines {
        line_offsets.push(offset);
        offset += line.len();
    }
    line_offsets.push(offset);

    let span_lines = &lines[span.start_line - 1..span.end_line];
    let mut chunks = Vec::with_capacity(span_lines.len().div_ceil(config.max_lines));

    for (index, window) in span_lines.chunks(config.max_lines).enumerate() {
        let start_line = span.start_line + index * config.max_lines;
        let end_line = start_line + window.len() - 1;
        chunks.push(ChunkSlice {
            index,
            start_line,
            end_line,
            start_byte: line_offsets[start_line - 1],
            end_byte: line_offsets[end_line],
            code: window.concat(),
        });
    }

    Ok(chunks)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn numbered_source(lines: usize) -> String {
        (1..=lines).map(|i| format!("line {i}\n")).collect()
    }

    #[test]
    fn short_symbol_yields_one_chunk() {
        let source = numbered_source(10);
        let span = Span::new(2, 5, 0, 0);
        let chunks = chunk_symbol(&span, &source, &ChunkerConfig::default()).unwrap();

        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].index, 0);
        assert_eq!(chunks[0].start_line, 2);
        assert_eq!(chunks[0].end_line, 5);
        assert_eq!(chunks[0].code, "line 2\nline 3\nline 4\nline 5\n");
    }

    #[test]
    fn chunk_count_is_ceil_of_lines_over_max() {
        let source = numbered_source(450);
        let span = Span::new(1, 450, 0, 0);
        let config = ChunkerConfig::with_max_lines(200);
        let chunks = chunk_symbol(&span, &source, &config).unwrap();

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].line_count(), 200);
        assert_eq!(chunks[1].line_count(), 200);
        assert_eq!(chunks[2].line_count(), 50);
        assert_eq!(chunks[2].start_line, 401);
        assert_eq!(chunks[2].end_line, 450);
    }

    #[test]
    fn exact_multiple_has_no_empty_tail() {
        let source = numbered_source(400);
        let span = Span::new(1, 400, 0, 0);
        let config = ChunkerConfig::with_max_lines(200);
        let chunks = chunk_symbol(&span, &source, &config).unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[1].line_count(), 200);
    }

    #[test]
    fn concatenation_reproduces_the_span() {
        let source = numbered_source(37);
        let span = Span::new(4, 33, 0, 0);
        let config = ChunkerConfig::with_max_lines(7);
        let chunks = chunk_symbol(&span, &source, &config).unwrap();

        let rejoined: String = chunks.iter().map(|c| c.code.as_str()).collect();
        let expected: String = (4..=33).map(|i| format!("line {i}\n")).collect();
        assert_eq!(rejoined, expected);
    }

    #[test]
    fn last_line_without_trailing_newline_survives() {
        let source = "alpha\nbeta\ngamma";
        let span = Span::new(1, 3, 0, source.len());
        let chunks = chunk_symbol(&span, source, &ChunkerConfig::with_max_lines(2)).unwrap();

        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].code, "alpha\nbeta\n");
        assert_eq!(chunks[1].code, "gamma");
    }

    #[test]
    fn byte_offsets_reslice_the_original() {
        let source = numbered_source(12);
        let span = Span::new(3, 10, 0, 0);
        let config = ChunkerConfig::with_max_lines(3);
        let chunks = chunk_symbol(&span, &source, &config).unwrap();

        for chunk in &chunks {
            assert_eq!(&source[chunk.start_byte..chunk.end_byte], chunk.code);
        }
        assert_eq!(chunks[0].start_byte, source.find("line 3").unwrap());
    }

    #[test]
    fn span_past_the_end_is_rejected() {
        let source = numbered_source(3);
        let span = Span::new(2, 9, 0, 0);
        assert!(chunk_symbol(&span, &source, &ChunkerConfig::default()).is_err());
    }
}
