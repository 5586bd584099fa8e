//! Location - a single file/line/column position
//!
//! Text form is `file[:line[:column]]`. Unknown trailing fields are omitted
//! rather than written as placeholders, so `foo.js` and `foo.js:427` both
//! round-trip unchanged.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{SEPARATOR, SourceError, SourceResult};

/// A position in a source file
///
/// Lines and columns are 1-based. `None` means unknown; once unknown, a field
/// only becomes known again through [`Location::change`] or
/// [`Location::set_position`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct Location {
    pub file: Option<PathBuf>,
    pub line: Option<u32>,
    pub column: Option<u32>,
}

impl Location {
    /// Create a location. A zero line or column is taken as unknown.
    pub fn new(file: impl Into<PathBuf>, line: u32, column: u32) -> Self {
        Self {
            file: Some(file.into()),
            line: known(line),
            column: known(column),
        }
    }

    /// A location with only the file known
    pub fn in_file(file: impl Into<PathBuf>) -> Self {
        Self {
            file: Some(file.into()),
            line: None,
            column: None,
        }
    }

    /// A location where nothing is known
    pub fn unknown() -> Self {
        Self::default()
    }

    /// Parse the `file[:line[:column]]` form
    pub fn parse(text: &str) -> SourceResult<Self> {
        if text.is_empty() {
            return Err(SourceError::InvalidLocation(text.to_string()));
        }

        // Numeric fields are peeled from the right so paths that contain the
        // separator (drive letters) survive.
        let mut rest = text;
        let mut fields = Vec::with_capacity(2);

        while fields.len() < 2 {
            let Some((head, tail)) = rest.rsplit_once(SEPARATOR) else {
                break;
            };
            let Ok(value) = tail.parse::<i64>() else {
                break;
            };
            fields.push(u32::try_from(value).ok().and_then(known));
            rest = head;
        }

        let (line, column) = match fields.as_slice() {
            [column, line] => (*line, *column),
            [line] => (*line, None),
            _ => (None, None),
        };

        Ok(Self {
            file: (!rest.is_empty()).then(|| PathBuf::from(rest)),
            line,
            column,
        })
    }

    /// Format a location from parts, skipping unknown trailing fields
    pub fn format(file: Option<&Path>, line: Option<u32>, column: Option<u32>) -> String {
        let mut out = file.map(|f| f.display().to_string()).unwrap_or_default();

        if let Some(line) = line {
            out.push(SEPARATOR);
            out.push_str(&line.to_string());

            if let Some(column) = column {
                out.push(SEPARATOR);
                out.push_str(&column.to_string());
            }
        }

        out
    }

    /// Advance by `num_lines` lines. No effect when the line is unknown.
    pub fn advance(&mut self, num_lines: u32) -> &mut Self {
        if let Some(line) = self.line.as_mut() {
            *line = line.saturating_add(num_lines);
        }
        self
    }

    /// Advance by `num_columns` columns. No effect when the column is unknown.
    pub fn advance_column(&mut self, num_columns: u32) -> &mut Self {
        if let Some(column) = self.column.as_mut() {
            *column = column.saturating_add(num_columns);
        }
        self
    }

    /// Copy every known field of `other` into this location
    pub fn change(&mut self, other: &Location) -> &mut Self {
        if let Some(file) = &other.file {
            self.file = Some(file.clone());
        }
        if other.line.is_some() {
            self.line = other.line;
        }
        if other.column.is_some() {
            self.column = other.column;
        }
        self
    }

    /// Set line and column, ignoring zero (unknown) values
    pub fn set_position(&mut self, line: u32, column: u32) -> &mut Self {
        if let Some(line) = known(line) {
            self.line = Some(line);
        }
        if let Some(column) = known(column) {
            self.column = Some(column);
        }
        self
    }

    /// Absolute line distance to `from`, or `None` if either line is unknown
    pub fn line_count(&self, from: u32) -> Option<u32> {
        let line = self.line?;
        let from = known(from)?;
        Some(line.abs_diff(from))
    }

    /// Absolute line distance between two locations
    pub fn line_distance(&self, other: &Location) -> Option<u32> {
        self.line_count(other.line?)
    }

    /// True if file, line and column are all known
    pub fn is_complete(&self) -> bool {
        self.file.is_some() && self.line.is_some() && self.column.is_some()
    }
}

#[inline]
pub(crate) fn known(value: u32) -> Option<u32> {
    (value > 0).then_some(value)
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&Self::format(self.file.as_deref(), self.line, self.column))
    }
}

impl FromStr for Location {
    type Err = SourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl From<Location> for String {
    fn from(location: Location) -> Self {
        location.to_string()
    }
}

impl TryFrom<String> for Location {
    type Error = SourceError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}
