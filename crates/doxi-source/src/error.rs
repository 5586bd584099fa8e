//! Source errors

/// Result type for location and source map operations
pub type SourceResult<T> = Result<T, SourceError>;

/// Errors raised while parsing or editing locations and source maps
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    #[error("Invalid location: {0:?}")]
    InvalidLocation(String),

    #[error("Invalid chunk: {0:?}")]
    InvalidChunk(String),

    #[error("No chunk at index {0}")]
    InvalidChunkIndex(usize),

    #[error("Invalid line split value ({0})")]
    InvalidLineSplit(usize),

    #[error("Cannot split {lines} line chunk by lines")]
    SingleLineSplit { lines: usize },

    #[error("Cannot split {lines} line chunk after line {after}")]
    LineSplitOutOfRange { lines: usize, after: usize },

    #[error("Cannot do intra-line split on multi-line chunks")]
    MultiLineIntraSplit,

    #[error("Invalid intra-line split column {column} for chunk of length {length}")]
    InvalidSplitColumn { column: usize, length: usize },

    #[error("Invalid range {offset}..{end} for text of length {length}")]
    InvalidRange { offset: usize, end: usize, length: usize },

    #[error("Invalid replacement range {offset}..{end}: must lie in one line of one chunk")]
    ReplaceSpansChunks { offset: usize, end: usize },

    #[error("Chunk lengths sum to {actual} but text has length {expected}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Chunk {0} has no length but is not the last chunk")]
    UnboundedChunk(usize),

    #[error("Unknown file id {0}")]
    UnknownFile(u32),
}
