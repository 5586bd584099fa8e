//! Source map - chunked offset to location index
//!
//! A source map pairs a text blob with an ordered run of [`Chunk`]s that cover
//! it end to end. Text can be edited in place with [`SourceMap::replace`] and
//! [`SourceMap::erase`]; chunks are split as needed so that text outside the
//! edit keeps its original location.
//!
//! ```text
//!   text = "Foo\n\nSome stuff\n"
//!   src  = "0:1:1:5|0:2:4:11"
//!           | | | |
//!           | | | +-- length
//!           | | +---- column
//!           | +------ line
//!           +-------- file id (index into files)
//! ```

use std::cell::Cell;
use std::fmt;
use std::path::{Path, PathBuf};

use crate::{Chunk, DELIMITER, Location, SourceError, SourceResult};

/// Callback run with the new text after every edit
pub type ChangeHook = Box<dyn FnMut(&str) + Send>;

pub struct SourceMap {
    files: Vec<PathBuf>,
    text: String,
    chunks: Vec<Chunk>,
    /// Encoded form as parsed, dropped on the first structural change
    src: Option<String>,
    /// Chunk index of the last lookup
    cursor: Cell<usize>,
    on_change: Option<ChangeHook>,
}

impl SourceMap {
    /// Parse `src` against `text`. Chunk lengths must add up to the text
    /// length; only the last chunk may omit its length.
    pub fn new(files: Vec<PathBuf>, text: impl Into<String>, src: &str) -> SourceResult<Self> {
        let chunks = if src.is_empty() {
            Vec::new()
        } else {
            src.split(DELIMITER)
                .map(Chunk::parse)
                .collect::<SourceResult<Vec<_>>>()?
        };

        let mut map = Self::from_chunks(files, text, chunks)?;
        map.src = Some(src.to_string());

        tracing::trace!(chunks = map.chunks.len(), "parsed source map");
        Ok(map)
    }

    /// Build from chunks; begins are recomputed
    pub fn from_chunks(files: Vec<PathBuf>, text: impl Into<String>, chunks: Vec<Chunk>) -> SourceResult<Self> {
        let mut map = Self {
            files,
            text: text.into(),
            chunks,
            src: None,
            cursor: Cell::new(0),
            on_change: None,
        };
        map.settle_lengths()?;
        Ok(map)
    }

    /// A single chunk covering all of `text`, starting at `location`
    pub fn from_location(text: impl Into<String>, location: &Location) -> Self {
        let text = text.into();
        let files: Vec<PathBuf> = location.file.iter().cloned().collect();

        let chunks = if text.is_empty() {
            Vec::new()
        } else {
            vec![Chunk {
                file_id: 0,
                line: location.line,
                column: location.column,
                len: text.len(),
                bounded: true,
                begin: 0,
            }]
        };

        Self {
            files,
            text,
            chunks,
            src: None,
            cursor: Cell::new(0),
            on_change: None,
        }
    }

    // Gives an unbounded last chunk the remaining text and checks the sum
    fn settle_lengths(&mut self) -> SourceResult<()> {
        let count = self.chunks.len();
        let mut pos = 0;

        for (i, chunk) in self.chunks.iter_mut().enumerate() {
            if !chunk.bounded {
                if i + 1 != count {
                    return Err(SourceError::UnboundedChunk(i));
                }
                chunk.len = self.text.len().saturating_sub(pos);
            }
            chunk.begin = pos;
            pos += chunk.len;
        }

        if pos != self.text.len() {
            return Err(SourceError::LengthMismatch {
                expected: self.text.len(),
                actual: pos,
            });
        }
        Ok(())
    }

    fn recompute_begins(&mut self) {
        let mut pos = 0;
        for chunk in &mut self.chunks {
            chunk.begin = pos;
            pos += chunk.len;
        }
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn file(&self, id: u32) -> Option<&Path> {
        self.files.get(id as usize).map(PathBuf::as_path)
    }

    pub fn set_files(&mut self, files: Vec<PathBuf>) {
        self.files = files;
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn into_text(self) -> String {
        self.text
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn chunk(&self, index: usize) -> SourceResult<&Chunk> {
        self.chunks.get(index).ok_or(SourceError::InvalidChunkIndex(index))
    }

    /// Text of the chunk at `index`
    pub fn chunk_text(&self, index: usize) -> Option<&str> {
        self.chunks.get(index).map(|c| c.text(&self.text))
    }

    /// Index of the chunk holding `offset`
    pub fn chunk_index_from_offset(&self, offset: usize) -> Option<usize> {
        let hint = self.cursor.get();
        if self.chunks.get(hint).is_some_and(|c| c.spans(offset, 1)) {
            return Some(hint);
        }

        let index = self.chunks.partition_point(|c| c.end() <= offset);
        let found = self.chunks.get(index).is_some_and(|c| c.spans(offset, 1));

        found.then(|| {
            self.cursor.set(index);
            index
        })
    }

    pub fn chunk_from_offset(&self, offset: usize) -> Option<&Chunk> {
        self.chunk_index_from_offset(offset).and_then(|i| self.chunks.get(i))
    }

    /// Original location of the byte at `offset`
    pub fn at(&self, offset: usize) -> Option<Location> {
        let chunk = self.chunk_from_offset(offset)?;
        chunk.location_at(&self.text, offset, self.file(chunk.file_id))
    }

    /// Split the chunk at `index` after `num_lines` lines. Returns the index
    /// of the new second chunk.
    pub fn split_chunk_by_line(&mut self, index: usize, num_lines: usize) -> SourceResult<usize> {
        let chunk = self.chunk(index)?;
        let lines = chunk.line_count(&self.text);

        if num_lines < 1 {
            return Err(SourceError::InvalidLineSplit(num_lines));
        }
        if lines == 1 {
            return Err(SourceError::SingleLineSplit { lines });
        }
        if lines <= num_lines {
            return Err(SourceError::LineSplitOutOfRange {
                lines,
                after: num_lines,
            });
        }

        let at: usize = (0..num_lines)
            .filter_map(|n| chunk.line_length(&self.text, n))
            .sum();

        let next = self.split_chunk_at(index, at)?;
        if let Some(chunk) = self.chunks.get_mut(next) {
            bump(&mut chunk.line, num_lines);
        }
        Ok(next)
    }

    /// Split a single-line chunk `column_offset` bytes in. Returns the index
    /// of the new second chunk.
    pub fn split_chunk_intra_line(&mut self, index: usize, column_offset: usize) -> SourceResult<usize> {
        let chunk = self.chunk(index)?;

        if chunk.line_count(&self.text) > 1 {
            return Err(SourceError::MultiLineIntraSplit);
        }
        if column_offset == 0 || column_offset >= chunk.len {
            return Err(SourceError::InvalidSplitColumn {
                column: column_offset,
                length: chunk.len,
            });
        }

        let next = self.split_chunk_at(index, column_offset)?;
        if let Some(chunk) = self.chunks.get_mut(next) {
            bump(&mut chunk.column, column_offset);
        }
        Ok(next)
    }

    fn split_chunk_at(&mut self, index: usize, at: usize) -> SourceResult<usize> {
        let chunk = self
            .chunks
            .get_mut(index)
            .ok_or(SourceError::InvalidChunkIndex(index))?;

        let mut next = chunk.clone();
        chunk.len = at;
        chunk.bounded = true;
        next.len -= at;
        next.begin += at;

        self.chunks.insert(index + 1, next);
        self.src = None;

        tracing::trace!(index, at, "split chunk");
        Ok(index + 1)
    }

    /// Replace `length` bytes at `offset` with `new_text`
    ///
    /// When the length changes, the range must lie within one line of one
    /// chunk. That line is isolated into its own chunk, and split again after
    /// the range so text following the edit keeps its location. Text in the
    /// edited chunk before the range keeps its location as well; the
    /// replacement itself inherits whatever the chunk start implies. A pure
    /// insertion at the start of a line gets a chunk of its own.
    ///
    /// On error the map is left as it was.
    pub fn replace(&mut self, offset: usize, length: usize, new_text: &str) -> SourceResult<()> {
        let end = self.check_range(offset, length)?;

        if length != new_text.len() {
            let chunks = self.chunks.clone();
            let src = self.src.clone();

            if let Err(err) = self.rechunk_replace(offset, end, new_text.len()) {
                self.chunks = chunks;
                self.src = src;
                return Err(err);
            }
        }

        self.text.replace_range(offset..end, new_text);
        self.after_edit();

        tracing::debug!(offset, length, inserted = new_text.len(), "replaced source text");
        Ok(())
    }

    fn rechunk_replace(&mut self, offset: usize, end: usize, inserted: usize) -> SourceResult<()> {
        let length = end - offset;
        let spans_error = || SourceError::ReplaceSpansChunks { offset, end };

        let mut index = self.chunk_index_from_offset(offset).ok_or_else(spans_error)?;
        let chunk = self.chunk(index)?;
        let (line, column) = chunk
            .offset_to_line_column(&self.text, offset)
            .ok_or_else(spans_error)?;
        let line_len = chunk.line_length(&self.text, line).unwrap_or(0);

        if column + length > line_len {
            return Err(spans_error());
        }

        if chunk.line_count(&self.text) > 1 {
            if line > 0 {
                index = self.split_chunk_by_line(index, line)?;
            }
            if self.chunk(index)?.line_count(&self.text) > 1 {
                self.split_chunk_by_line(index, 1)?;
            }
        }

        self.src = None;

        if column + length == 0 {
            // inserted text sits in front of the line and takes its start
            let mut head = self.chunk(index)?.clone();
            head.len = inserted;
            head.bounded = true;
            self.chunks.insert(index, head);
            return Ok(());
        }

        let chunk_len = self.chunk(index)?.len;
        if column + length < chunk_len {
            // text after the range is not moving
            self.split_chunk_intra_line(index, column + length)?;
        }

        let chunk = self
            .chunks
            .get_mut(index)
            .ok_or(SourceError::InvalidChunkIndex(index))?;
        chunk.len = chunk.len + inserted - length;

        if chunk.len == 0 {
            self.chunks.remove(index);
        }
        Ok(())
    }

    /// Remove `length` bytes at `offset`
    ///
    /// Chunks inside the range are dropped, chunks overlapping it are
    /// shortened. Text after the range keeps its location.
    pub fn erase(&mut self, offset: usize, length: usize) -> SourceResult<()> {
        let end = self.check_range(offset, length)?;
        if length == 0 {
            return Ok(());
        }

        if end < self.text.len() {
            self.ensure_boundary(end)?;
        }

        for chunk in &mut self.chunks {
            let from = chunk.begin.max(offset);
            let to = chunk.end().min(end);
            if from < to {
                chunk.len -= to - from;
            }
        }

        let before = self.chunks.len();
        self.chunks.retain(|c| c.len > 0);

        self.text.replace_range(offset..end, "");
        self.src = None;
        self.after_edit();

        tracing::debug!(offset, length, dropped = before - self.chunks.len(), "erased source text");
        Ok(())
    }

    // Split so that some chunk begins exactly at `pos`
    fn ensure_boundary(&mut self, pos: usize) -> SourceResult<()> {
        let Some(mut index) = self.chunk_index_from_offset(pos) else {
            return Ok(());
        };

        let chunk = self.chunk(index)?;
        if chunk.begin == pos {
            return Ok(());
        }

        let (line, column) = chunk
            .offset_to_line_column(&self.text, pos)
            .ok_or(SourceError::InvalidChunkIndex(index))?;

        if line > 0 {
            index = self.split_chunk_by_line(index, line)?;
        }
        if column > 0 {
            if self.chunk(index)?.line_count(&self.text) > 1 {
                self.split_chunk_by_line(index, 1)?;
            }
            self.split_chunk_intra_line(index, column)?;
        }
        Ok(())
    }

    fn check_range(&self, offset: usize, length: usize) -> SourceResult<usize> {
        let invalid = || SourceError::InvalidRange {
            offset,
            end: offset.saturating_add(length),
            length: self.text.len(),
        };

        let end = offset.checked_add(length).ok_or_else(invalid)?;
        if end > self.text.len() || !self.text.is_char_boundary(offset) || !self.text.is_char_boundary(end) {
            return Err(invalid());
        }
        Ok(end)
    }

    fn after_edit(&mut self) {
        self.recompute_begins();
        self.cursor.set(0);

        if let Some(hook) = self.on_change.as_mut() {
            hook(&self.text);
        }
    }

    /// Run `hook` with the new text after every edit
    pub fn set_on_change(&mut self, hook: impl FnMut(&str) + Send + 'static) {
        self.on_change = Some(Box::new(hook));
    }

    pub fn clear_on_change(&mut self) {
        self.on_change = None;
    }

    /// Re-key chunk file ids onto another file table
    ///
    /// `mapper` receives each chunk's current path and returns its id in
    /// `files`.
    pub fn attach(
        &mut self,
        files: Vec<PathBuf>,
        mut mapper: impl FnMut(&Path) -> Option<u32>,
    ) -> SourceResult<()> {
        let mut ids = Vec::with_capacity(self.chunks.len());

        for chunk in &self.chunks {
            let path = self
                .files
                .get(chunk.file_id as usize)
                .ok_or(SourceError::UnknownFile(chunk.file_id))?;
            ids.push(mapper(path).ok_or(SourceError::UnknownFile(chunk.file_id))?);
        }

        for (chunk, id) in self.chunks.iter_mut().zip(ids) {
            chunk.file_id = id;
        }

        self.files = files;
        self.src = None;
        Ok(())
    }

    /// Compact the file list to the files chunks use, each passed through
    /// `resolve` (typically to an absolute path)
    pub fn detach(&mut self, mut resolve: impl FnMut(&Path) -> PathBuf) -> SourceResult<()> {
        let mut files: Vec<PathBuf> = Vec::new();
        let mut remap: Vec<Option<u32>> = vec![None; self.files.len()];

        for chunk in &mut self.chunks {
            let old = chunk.file_id as usize;
            let slot = remap.get_mut(old).ok_or(SourceError::UnknownFile(chunk.file_id))?;

            let id = match *slot {
                Some(id) => id,
                None => {
                    let id = files.len() as u32;
                    files.push(resolve(&self.files[old]));
                    *slot = Some(id);
                    id
                }
            };
            chunk.file_id = id;
        }

        self.files = files;
        self.src = None;
        Ok(())
    }

    /// Encoded chunk list, identical to the parsed input until an edit
    pub fn to_src(&self) -> String {
        if let Some(src) = &self.src {
            return src.clone();
        }

        let mut out = String::new();
        for (i, chunk) in self.chunks.iter().enumerate() {
            if i > 0 {
                out.push(DELIMITER);
            }
            out.push_str(&chunk.to_src());
        }
        out
    }

    /// Encoded chunk list with file paths in place of ids
    pub fn describe(&self) -> String {
        self.chunks
            .iter()
            .map(|c| match self.file(c.file_id) {
                Some(file) => c.to_src_with_file(file),
                None => c.to_src(),
            })
            .collect::<Vec<_>>()
            .join(&DELIMITER.to_string())
    }
}

fn bump(field: &mut Option<u32>, by: usize) {
    if let Some(value) = field.as_mut() {
        *value = value.saturating_add(u32::try_from(by).unwrap_or(u32::MAX));
    }
}

impl Clone for SourceMap {
    /// The change hook is not carried over
    fn clone(&self) -> Self {
        Self {
            files: self.files.clone(),
            text: self.text.clone(),
            chunks: self.chunks.clone(),
            src: self.src.clone(),
            cursor: Cell::new(0),
            on_change: None,
        }
    }
}

impl PartialEq for SourceMap {
    fn eq(&self, other: &Self) -> bool {
        self.files == other.files && self.text == other.text && self.chunks == other.chunks
    }
}

impl Eq for SourceMap {}

impl fmt::Debug for SourceMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceMap")
            .field("files", &self.files)
            .field("text", &self.text)
            .field("chunks", &self.chunks)
            .field("on_change", &self.on_change.is_some())
            .finish()
    }
}

impl fmt::Display for SourceMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_src())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    fn files() -> Vec<PathBuf> {
        vec!["Foo.js".into(), "Bar.js".into(), "Zip.js".into()]
    }

    #[test]
    fn test_chunks_from_src() {
        let map = SourceMap::new(files(), "Hello World!!", "0:2:4:6|1:3:5:7").unwrap();
        let c = &map.chunks()[0];

        assert_eq!(map.file(c.file_id), Some(Path::new("Foo.js")));
        assert_eq!(c.line, Some(2));
        assert_eq!(c.column, Some(4));
        assert_eq!(c.len(), 6);
        assert_eq!(c.begin(), 0);
        assert_eq!(c.end(), 6);
        assert_eq!(map.chunk_text(0), Some("Hello "));
        assert_eq!(map.file(map.chunks()[1].file_id), Some(Path::new("Bar.js")));
    }

    #[test]
    fn test_length_mismatch() {
        let err = SourceMap::new(files(), "Hello", "0:1:1:3").unwrap_err();
        assert_eq!(err, SourceError::LengthMismatch { expected: 5, actual: 3 });
    }

    #[test]
    fn test_unbounded_last_chunk_takes_rest() {
        let map = SourceMap::new(files(), "Hello World", "0:1:1:6|1:9:3").unwrap();
        assert_eq!(map.chunks()[1].len(), 5);
        assert_eq!(map.chunks()[1].length(), None);
        assert_eq!(map.to_src(), "0:1:1:6|1:9:3");

        let err = SourceMap::new(files(), "Hello World", "0:1:1|1:9:3:5").unwrap_err();
        assert_eq!(err, SourceError::UnboundedChunk(0));
    }

    #[test]
    fn test_chunk_index_from_offset() {
        let map = SourceMap::new(files(), "Hello World!! Yo!", "0:2:4:6|1:3:5:7|2:42:427:4").unwrap();

        assert_eq!(map.chunk_index_from_offset(0), Some(0));
        assert_eq!(map.chunk_index_from_offset(5), Some(0));
        assert_eq!(map.chunk_index_from_offset(6), Some(1));
        assert_eq!(map.chunk_index_from_offset(12), Some(1));
        assert_eq!(map.chunk_index_from_offset(13), Some(2));
        assert_eq!(map.chunk_index_from_offset(16), Some(2));
        assert_eq!(map.chunk_index_from_offset(17), None);
    }

    #[test]
    fn test_at() {
        let map = SourceMap::new(files(), "He\nlo Wo\nld\n! Y\n!", "0:2:4:6|1:3:5:7|2:42:427:4").unwrap();

        assert_eq!(map.at(0).unwrap().to_string(), "Foo.js:2:4");
        assert_eq!(map.at(3).unwrap().to_string(), "Foo.js:3:4");
        assert_eq!(map.at(5).unwrap().to_string(), "Foo.js:3:6");
        assert_eq!(map.at(6).unwrap().to_string(), "Bar.js:3:5");
        assert!(map.at(17).is_none());
    }

    #[test]
    fn test_at_out_of_order_queries() {
        let map = SourceMap::new(files(), "He\nlo Wo\nld\n! Y\n!", "0:2:4:6|1:3:5:7|2:42:427:4").unwrap();

        assert_eq!(map.at(14).unwrap().to_string(), "Zip.js:42:428");
        assert_eq!(map.at(1).unwrap().to_string(), "Foo.js:2:5");
        assert_eq!(map.at(14).unwrap().to_string(), "Zip.js:42:428");
    }

    #[test]
    fn test_split_by_line() {
        let mut map = SourceMap::new(files(), "He\nlo Wo\nld\n! Y\n!", "0:2:4:6|1:3:5:7|2:42:427:4").unwrap();
        let next = map.split_chunk_by_line(0, 1).unwrap();

        assert_eq!(next, 1);
        assert_eq!(map.to_src(), "0:2:4:3|0:3:4:3|1:3:5:7|2:42:427:4");
    }

    #[test]
    fn test_split_errors() {
        let mut map = SourceMap::new(files(), "Hello World!!", "0:2:4:6|1:3:5:7").unwrap();

        assert_eq!(map.split_chunk_by_line(0, 0), Err(SourceError::InvalidLineSplit(0)));
        assert_eq!(map.split_chunk_by_line(0, 1), Err(SourceError::SingleLineSplit { lines: 1 }));
        assert_eq!(map.split_chunk_by_line(9, 1), Err(SourceError::InvalidChunkIndex(9)));
        assert_eq!(
            map.split_chunk_intra_line(0, 6),
            Err(SourceError::InvalidSplitColumn { column: 6, length: 6 })
        );
    }

    #[test]
    fn test_erase_whole_first_chunk() {
        let mut map = SourceMap::new(files(), "Hello World!!", "0:2:4:6|1:3:5:7").unwrap();
        map.erase(0, 6).unwrap();

        assert_eq!(map.text(), "World!!");
        assert_eq!(map.to_src(), "1:3:5:7");
        assert_eq!(map.at(0).unwrap().to_string(), "Bar.js:3:5");
    }

    #[test]
    fn test_erase_inside_chunk_keeps_tail_location() {
        let mut map = SourceMap::new(files(), "Hello World", "0:1:1:11").unwrap();
        map.erase(2, 3).unwrap();

        assert_eq!(map.text(), "He World");
        assert_eq!(map.to_src(), "0:1:1:2|0:1:6:6");
        assert_eq!(map.at(2).unwrap().to_string(), "Foo.js:1:6");
    }

    #[test]
    fn test_erase_across_chunks() {
        let mut map = SourceMap::new(files(), "Hello World!! Yo!", "0:2:4:6|1:3:5:7|2:42:427:4").unwrap();
        map.erase(4, 10).unwrap();

        assert_eq!(map.text(), "HellYo!");
        assert_eq!(map.to_src(), "0:2:4:4|2:42:428:3");
        let total: usize = map.chunks().iter().map(Chunk::len).sum();
        assert_eq!(total, map.text().len());
    }

    #[test]
    fn test_erase_bad_range() {
        let mut map = SourceMap::new(files(), "Hello", "0:1:1:5").unwrap();
        assert!(matches!(map.erase(3, 5), Err(SourceError::InvalidRange { .. })));
        assert_eq!(map.text(), "Hello");
    }

    #[test]
    fn test_replace_rejects_multi_line_range() {
        let mut map = SourceMap::new(files(), "Hello\nWorld\n", "0:1:1:12").unwrap();
        let err = map.replace(3, 6, "x").unwrap_err();

        assert_eq!(err, SourceError::ReplaceSpansChunks { offset: 3, end: 9 });
        assert_eq!(map.to_src(), "0:1:1:12");
        assert_eq!(map.text(), "Hello\nWorld\n");
    }

    #[test]
    fn test_insert_at_line_start() {
        let mut map = SourceMap::new(files(), "abc\ndef\n", "0:10:4:8").unwrap();
        map.replace(4, 0, "XY").unwrap();

        assert_eq!(map.text(), "abc\nXYdef\n");
        assert_eq!(map.to_src(), "0:10:4:4|0:11:4:2|0:11:4:4");
        assert_eq!(map.at(0).unwrap().to_string(), "Foo.js:10:4");
        assert_eq!(map.at(4).unwrap().to_string(), "Foo.js:11:4");
        assert_eq!(map.at(6).unwrap().to_string(), "Foo.js:11:4");
        assert_eq!(map.at(8).unwrap().to_string(), "Foo.js:11:6");
    }

    #[test]
    fn test_insert_at_chunk_start() {
        let mut map = SourceMap::new(files(), "abc", "0:1:1:3").unwrap();
        map.replace(0, 0, "XY").unwrap();
        assert_eq!(map.text(), "XYabc");
        assert_eq!(map.to_src(), "0:1:1:2|0:1:1:3");
        assert_eq!(map.at(2).unwrap().to_string(), "Foo.js:1:1");

        let mut map = SourceMap::new(files(), "Hello World!!", "0:2:4:6|1:3:5:7").unwrap();
        map.replace(6, 0, ">").unwrap();
        assert_eq!(map.text(), "Hello >World!!");
        assert_eq!(map.to_src(), "0:2:4:6|1:3:5:1|1:3:5:7");
        assert_eq!(map.at(7).unwrap().to_string(), "Bar.js:3:5");
        let total: usize = map.chunks().iter().map(Chunk::len).sum();
        assert_eq!(total, map.text().len());
    }

    #[test]
    fn test_failed_replace_leaves_chunks_alone() {
        let mut map = SourceMap::new(files(), "abc\ndef\nghi", "0:10:4:11").unwrap();
        let err = map.replace(5, 5, "x").unwrap_err();

        assert_eq!(err, SourceError::ReplaceSpansChunks { offset: 5, end: 10 });
        assert_eq!(map.to_src(), "0:10:4:11");
        assert_eq!(map.chunks().len(), 1);
        assert_eq!(map.text(), "abc\ndef\nghi");
    }

    #[test]
    fn test_on_change_hook() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);

        let mut map = SourceMap::new(files(), "Hello World", "0:1:1:11").unwrap();
        map.set_on_change(move |text| sink.lock().unwrap().push(text.to_string()));

        map.replace(0, 5, "Howdy").unwrap();
        map.erase(5, 6).unwrap();

        assert_eq!(*seen.lock().unwrap(), vec!["Howdy World".to_string(), "Howdy".to_string()]);
    }

    #[test]
    fn test_attach_and_detach() {
        let mut map = SourceMap::new(files(), "Hello World!!", "2:2:4:6|2:3:5:7").unwrap();

        let table = vec![PathBuf::from("Zip.js")];
        map.attach(table.clone(), |p| table.iter().position(|f| f == p).map(|i| i as u32))
            .unwrap();
        assert_eq!(map.to_src(), "0:2:4:6|0:3:5:7");

        map.detach(|p| Path::new("/src").join(p)).unwrap();
        assert_eq!(map.files(), &[PathBuf::from("/src/Zip.js")]);
        assert_eq!(map.describe(), "/src/Zip.js:2:4:6|/src/Zip.js:3:5:7");
    }

    #[test]
    fn test_from_location() {
        let map = SourceMap::from_location("abc\ndef", &Location::new("Foo.js", 10, 3));
        assert_eq!(map.to_src(), "0:10:3:7");
        assert_eq!(map.at(5).unwrap().to_string(), "Foo.js:11:4");
    }
}
