//! Source chunks
//!
//! A chunk claims a contiguous byte range of a source map's text and says it
//! came from consecutive lines of one file, every line starting at the same
//! column. Encoded as `fileId[:line[:column[:length]]]`.

use std::path::Path;

use crate::location::known;
use crate::{Location, SEPARATOR, SourceError, SourceResult};

/// One run of a [`SourceMap`](crate::SourceMap)
///
/// Chunks do not hold their text; every text query takes the owning map's
/// full text and slices `[begin, end)` out of it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub file_id: u32,
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub(crate) len: usize,
    /// False when the encoded form carried no length
    pub(crate) bounded: bool,
    pub(crate) begin: usize,
}

impl Chunk {
    /// A bounded chunk of `len` bytes. Zero line or column means unknown.
    pub fn new(file_id: u32, line: u32, column: u32, len: usize) -> Self {
        Self {
            file_id,
            line: known(line),
            column: known(column),
            len,
            bounded: true,
            begin: 0,
        }
    }

    /// Numeric field `index` of an encoded tuple, `None` past the last field
    pub fn field_of(src: &str, index: usize) -> Option<i64> {
        src.split(SEPARATOR).nth(index)?.trim().parse().ok()
    }

    /// Parse a 1- to 4-field tuple. A missing or non-positive length leaves
    /// the chunk unbounded.
    pub fn parse(src: &str) -> SourceResult<Self> {
        let invalid = || SourceError::InvalidChunk(src.to_string());

        let fields: Vec<&str> = src.split(SEPARATOR).collect();
        if fields.len() > 4 {
            return Err(invalid());
        }

        let mut numbers = [0i64; 4];
        for (slot, field) in numbers.iter_mut().zip(&fields) {
            *slot = field.trim().parse().map_err(|_| invalid())?;
        }

        let file_id = u32::try_from(numbers[0]).map_err(|_| invalid())?;
        let positive = |n: i64| u32::try_from(n).ok().and_then(known);
        let len = usize::try_from(numbers[3]).unwrap_or(0);

        Ok(Self {
            file_id,
            line: positive(numbers[1]),
            column: positive(numbers[2]),
            len,
            bounded: len > 0,
            begin: 0,
        })
    }

    /// Length in bytes, `None` for an unbounded chunk
    pub fn length(&self) -> Option<usize> {
        self.bounded.then_some(self.len)
    }

    /// Bytes currently claimed, including an unbounded chunk's remainder
    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_bounded(&self) -> bool {
        self.bounded
    }

    pub fn begin(&self) -> usize {
        self.begin
    }

    pub fn end(&self) -> usize {
        self.begin + self.len
    }

    /// True if `[offset, offset + length)` lies inside this chunk. A zero
    /// length is checked as a single byte.
    pub fn spans(&self, offset: usize, length: usize) -> bool {
        let last = offset + length.max(1) - 1;
        self.begin <= offset && last < self.end()
    }

    /// This chunk's slice of `text`
    pub fn text<'a>(&self, text: &'a str) -> &'a str {
        text.get(self.begin..self.end()).unwrap_or("")
    }

    /// Number of lines touched; a trailing newline does not open a new line
    pub fn line_count(&self, text: &str) -> usize {
        let own = self.text(text);
        if own.is_empty() {
            return 0;
        }
        let newlines = own.bytes().filter(|&b| b == b'\n').count();
        if own.ends_with('\n') { newlines } else { newlines + 1 }
    }

    /// Byte length of line `line_num`, newline included
    pub fn line_length(&self, text: &str, line_num: usize) -> Option<usize> {
        self.text(text).split_inclusive('\n').nth(line_num).map(str::len)
    }

    /// `(line, column)` offsets of the absolute `offset` within this chunk
    pub fn offset_to_line_column(&self, text: &str, offset: usize) -> Option<(usize, usize)> {
        if !self.spans(offset, 1) {
            return None;
        }

        let mut line_begin = self.begin;
        for (line, part) in self.text(text).split_inclusive('\n').enumerate() {
            let next = line_begin + part.len();
            if offset < next {
                return Some((line, offset - line_begin));
            }
            line_begin = next;
        }

        None
    }

    /// Location of the absolute `offset`, with `file` resolved by the caller
    pub fn location_at(&self, text: &str, offset: usize, file: Option<&Path>) -> Option<Location> {
        let (line, column) = self.offset_to_line_column(text, offset)?;

        let mut location = Location {
            file: file.map(Path::to_path_buf),
            line: self.line,
            column: self.column,
        };
        location
            .advance(u32::try_from(line).ok()?)
            .advance_column(u32::try_from(column).ok()?);

        Some(location)
    }

    /// Encoded tuple using the file id
    pub fn to_src(&self) -> String {
        self.encode(&self.file_id.to_string())
    }

    /// Encoded tuple with a file path in place of the id
    pub fn to_src_with_file(&self, file: &Path) -> String {
        self.encode(&file.display().to_string())
    }

    // Trailing unknown fields are dropped; unknown fields followed by known
    // ones are written as 0.
    fn encode(&self, head: &str) -> String {
        let fields = [
            self.line.map(u64::from),
            self.column.map(u64::from),
            self.length().map(|n| n as u64),
        ];

        let used = fields.iter().rposition(Option::is_some).map_or(0, |i| i + 1);

        let mut out = head.to_string();
        for field in &fields[..used] {
            out.push(SEPARATOR);
            out.push_str(&field.unwrap_or(0).to_string());
        }
        out
    }
}

impl std::str::FromStr for Chunk {
    type Err = SourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for Chunk {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_src())
    }
}
