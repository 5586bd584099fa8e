//! Doxi Source - locations and source maps
//!
//! Tracks where extracted documentation text came from:
//! - [`Location`]: one file/line/column position
//! - [`Chunk`]: a run of text from consecutive lines of one file
//! - [`SourceMap`]: offsets of a text blob mapped back through chunks,
//!   surviving in-place edits
//! - [`PathProvider`]: path arithmetic supplied by the host

mod chunk;
mod error;
mod location;
mod path;
mod source_map;

pub use chunk::Chunk;
pub use error::{SourceError, SourceResult};
pub use location::Location;
pub use path::{LexicalPaths, PathProvider, normalize};
pub use source_map::{ChangeHook, SourceMap};

/// Separates the fields of one location or chunk
pub const SEPARATOR: char = ':';

/// Separates locations or chunks in a list
pub const DELIMITER: char = '|';

/// Stands in for a missing location inside an encoded list
pub const NULL_MARKER: &str = "??";
