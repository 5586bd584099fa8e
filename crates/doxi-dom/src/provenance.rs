//! Attribute provenance
//!
//! Where an attribute value came from. Position data arrives in whatever
//! shape the parser has at hand and is stored either still encoded (file ids
//! of the owning document) or decoded. [`Provenance::materialize`] is the
//! explicit decode step.

use std::path::{Path, PathBuf};

use doxi_source::{Location, SourceMap};

use crate::attributes::{AttrForm, AttrValue};
use crate::files::FileTable;
use crate::{DomError, DomResult};

#[derive(Debug, Clone, PartialEq)]
pub enum Provenance {
    /// Wire form: `id:line:col` entries joined by `|`, or a chunk list for
    /// multiline attributes
    Encoded(String),
    Location(Location),
    /// One entry per composite element
    Locations(Vec<Option<Location>>),
    /// Source map over a multiline value
    Sources(SourceMap),
}

impl From<Location> for Provenance {
    fn from(location: Location) -> Self {
        Provenance::Location(location)
    }
}

impl From<Vec<Location>> for Provenance {
    fn from(locations: Vec<Location>) -> Self {
        Provenance::Locations(locations.into_iter().map(Some).collect())
    }
}

impl From<Vec<Option<Location>>> for Provenance {
    fn from(locations: Vec<Option<Location>>) -> Self {
        Provenance::Locations(locations)
    }
}

impl From<SourceMap> for Provenance {
    fn from(sources: SourceMap) -> Self {
        Provenance::Sources(sources)
    }
}

impl From<&str> for Provenance {
    fn from(src: &str) -> Self {
        Provenance::Encoded(src.to_string())
    }
}

impl From<String> for Provenance {
    fn from(src: String) -> Self {
        Provenance::Encoded(src)
    }
}

impl Provenance {
    pub fn is_encoded(&self) -> bool {
        matches!(self, Provenance::Encoded(_))
    }

    /// Reshape decoded position data to fit attribute `name` of `form`
    /// holding `value`. Encoded data passes through untouched.
    ///
    /// A single location on a composite is replicated across the elements;
    /// a location list shorter than the value is padded with `None`.
    pub fn conform(self, name: &str, form: &AttrForm, value: &AttrValue) -> DomResult<Option<Provenance>> {
        let shaped = match (form, self) {
            (_, encoded @ Provenance::Encoded(_)) => encoded,

            (AttrForm::Scalar, Provenance::Location(location)) => Provenance::Location(location),
            (AttrForm::Scalar, Provenance::Locations(locations)) => {
                if locations.len() > 1 {
                    return Err(DomError::position(name, "expected a single location"));
                }
                match locations.into_iter().next().flatten() {
                    Some(location) => Provenance::Location(location),
                    None => return Ok(None),
                }
            }
            (AttrForm::Scalar, Provenance::Sources(sources)) => match sources.at(0) {
                Some(location) => Provenance::Location(location),
                None => return Ok(None),
            },

            (AttrForm::Composite { separator }, Provenance::Location(location)) => {
                Provenance::Locations(replicate(&location, items(value), separator))
            }
            (AttrForm::Composite { .. }, Provenance::Locations(mut locations)) => {
                let count = items(value).len();
                if locations.len() > count {
                    return Err(DomError::position(name, "more locations than values"));
                }
                locations.resize(count, None);
                Provenance::Locations(locations)
            }
            (AttrForm::Composite { .. }, Provenance::Sources(_)) => {
                return Err(DomError::position(name, "source maps need a multiline attribute"));
            }

            (AttrForm::Multiline, Provenance::Location(location)) => {
                // chunks need a file to point into
                if location.file.is_none() {
                    return Ok(None);
                }
                let text = multiline_text(name, value)?;
                Provenance::Sources(SourceMap::from_location(text, &location))
            }
            (AttrForm::Multiline, Provenance::Sources(sources)) => {
                if sources.text() != multiline_text(name, value)? {
                    return Err(DomError::position(name, "source map text differs from the value"));
                }
                Provenance::Sources(sources)
            }
            (AttrForm::Multiline, Provenance::Locations(_)) => {
                return Err(DomError::position(name, "multiline attributes take a location or a source map"));
            }
        };

        Ok(Some(shaped))
    }

    /// Decoded form of this provenance. File ids are resolved through
    /// `files`; decoded paths are table-relative.
    pub fn materialize(
        &self,
        name: &str,
        form: &AttrForm,
        value: &AttrValue,
        files: &FileTable,
    ) -> DomResult<Option<Provenance>> {
        let Provenance::Encoded(src) = self else {
            return self.clone().conform(name, form, value);
        };

        let decoded = match form {
            AttrForm::Scalar => match files.decode_locations(src)?.into_iter().next().flatten() {
                Some(location) => Provenance::Location(location),
                None => return Ok(None),
            },
            AttrForm::Composite { .. } => {
                let mut locations = files.decode_locations(src)?;
                locations.resize(items(value).len(), None);
                Provenance::Locations(locations)
            }
            AttrForm::Multiline => Provenance::Sources(files.decode_sources(src, multiline_text(name, value)?)?),
        };

        Ok(Some(decoded))
    }

    /// Wire form against `files`. Every decoded path must already be in the
    /// table.
    pub fn to_src(&self, files: &FileTable) -> DomResult<String> {
        match self {
            Provenance::Encoded(src) => Ok(src.clone()),
            Provenance::Location(location) => files.encode_registered(std::slice::from_ref(&Some(location.clone()))),
            Provenance::Locations(locations) => files.encode_registered(locations),
            Provenance::Sources(sources) => files.encode_sources(sources),
        }
    }

    /// Pass every decoded file path through `f`
    pub fn map_paths(&mut self, mut f: impl FnMut(&Path) -> PathBuf) -> DomResult<()> {
        match self {
            Provenance::Encoded(_) => {}
            Provenance::Location(location) => map_location(location, &mut f),
            Provenance::Locations(locations) => {
                for location in locations.iter_mut().flatten() {
                    map_location(location, &mut f);
                }
            }
            Provenance::Sources(sources) => sources.detach(|p| f(p))?,
        }
        Ok(())
    }

    /// Decoded location list, for joining composite provenance
    pub(crate) fn into_locations(
        self,
        name: &str,
        form: &AttrForm,
        value: &AttrValue,
        files: &FileTable,
    ) -> DomResult<Vec<Option<Location>>> {
        let mut locations = match self.materialize(name, form, value, files)? {
            Some(Provenance::Locations(locations)) => locations,
            Some(Provenance::Location(location)) => vec![Some(location)],
            _ => Vec::new(),
        };
        pad(&mut locations, items(value).len());
        Ok(locations)
    }
}

fn map_location(location: &mut Location, f: &mut impl FnMut(&Path) -> PathBuf) {
    if let Some(file) = location.file.as_deref() {
        location.file = Some(f(file));
    }
}

fn items(value: &AttrValue) -> &[String] {
    value.as_list().unwrap_or_default()
}

fn multiline_text<'a>(name: &str, value: &'a AttrValue) -> DomResult<&'a str> {
    value
        .as_str()
        .ok_or_else(|| DomError::position(name, "multiline provenance needs a text value"))
}

/// One location per element, each shifted right past the previous elements
/// and their separators
pub fn replicate(location: &Location, items: &[String], separator: &str) -> Vec<Option<Location>> {
    let step = separator.chars().count();
    let mut offset = 0;

    items
        .iter()
        .map(|item| {
            let mut at = location.clone();
            at.advance_column(u32::try_from(offset).unwrap_or(u32::MAX));
            offset += item.chars().count() + step;
            Some(at)
        })
        .collect()
}

/// Fit `locations` to exactly `len` entries
pub fn pad(locations: &mut Vec<Option<Location>>, len: usize) {
    locations.resize(len, None);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn composite() -> AttrForm {
        AttrForm::Composite {
            separator: "|".into(),
        }
    }

    #[test]
    fn test_replicate_offsets_columns() {
        let items = vec!["foo".to_string(), "bar".to_string(), "zip".to_string()];
        let at = replicate(&Location::new("Foo.js", 123, 42), &items, "|");

        let columns: Vec<Option<u32>> = at.iter().map(|l| l.as_ref().and_then(|l| l.column)).collect();
        assert_eq!(columns, vec![Some(42), Some(46), Some(50)]);
    }

    #[test]
    fn test_replicate_without_column() {
        let items = vec!["a".to_string(), "b".to_string()];
        let at = replicate(&Location::new("Foo.js", 3, 0), &items, ",");
        assert_eq!(at[1].as_ref().map(|l| l.to_string()).as_deref(), Some("Foo.js:3"));
    }

    #[test]
    fn test_conform_composite() {
        let value = AttrValue::from(vec!["foo", "bar", "zip"]);

        let shaped = Provenance::from(vec![Location::new("a.js", 1, 1)])
            .conform("alias", &composite(), &value)
            .unwrap();
        match shaped {
            Some(Provenance::Locations(v)) => {
                assert_eq!(v.len(), 3);
                assert!(v[1].is_none() && v[2].is_none());
            }
            other => panic!("unexpected {other:?}"),
        }

        let too_many = Provenance::from(vec![Location::unknown(); 4]).conform("alias", &composite(), &value);
        assert!(matches!(too_many, Err(DomError::InvalidPosition { .. })));
    }

    #[test]
    fn test_conform_multiline() {
        let value = AttrValue::from("Line one\nline two");
        let shaped = Provenance::from(Location::new("a.js", 10, 4))
            .conform("summary", &AttrForm::Multiline, &value)
            .unwrap();

        let Some(Provenance::Sources(sources)) = shaped else {
            panic!("expected a source map");
        };
        assert_eq!(sources.at(9).unwrap().to_string(), "a.js:11:4");

        let mismatch = Provenance::Sources(sources).conform("summary", &AttrForm::Multiline, &"other".into());
        assert!(mismatch.is_err());
    }

    #[test]
    fn test_conform_scalar() {
        let value = AttrValue::from("x");
        let none = Provenance::Locations(vec![None])
            .conform("name", &AttrForm::Scalar, &value)
            .unwrap();
        assert_eq!(none, None);

        let encoded = Provenance::from("0:1:2").conform("name", &AttrForm::Scalar, &value).unwrap();
        assert_eq!(encoded, Some(Provenance::Encoded("0:1:2".into())));
    }
}
