use thiserror::Error;

pub type Result<T> = std::result::Result<T, ChunkerError>;

#[derive(Error, Debug)]
pub enum ChunkerError {
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Span out of bounds: lines {start}..={end} in a {total}-line source")]
    SpanOutOfBounds {
        start: usize,
        end: usize,
        total: usize,
    },
}
