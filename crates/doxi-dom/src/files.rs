//! Document File Table
//!
//! Interns source file paths as small integer ids for the compact location
//! encoding. Paths are stored relative to the document base directory; an id
//! never changes once issued, even when the base directory moves.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use doxi_source::{DELIMITER, Location, NULL_MARKER, PathProvider, SourceError, SourceMap};

use crate::{DomError, DomResult};

#[derive(Debug, Clone)]
pub struct FileTable {
    paths: Arc<dyn PathProvider>,
    base_dir: PathBuf,
    files: Vec<PathBuf>,
    index: HashMap<String, u32>,
}

impl FileTable {
    /// Empty table rooted at `base_dir`, or the working directory
    pub fn new(paths: Arc<dyn PathProvider>, base_dir: Option<&Path>) -> Self {
        let base_dir = paths.absolutify(base_dir.unwrap_or(Path::new(".")));
        Self {
            paths,
            base_dir,
            files: Vec::new(),
            index: HashMap::new(),
        }
    }

    pub fn paths(&self) -> &Arc<dyn PathProvider> {
        &self.paths
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn file(&self, id: u32) -> Option<&Path> {
        self.files.get(id as usize).map(PathBuf::as_path)
    }

    /// Table form of `path`, normalized and relative to the base directory.
    /// Relative paths are taken as relative to the base directory.
    pub fn file_from_path(&self, path: &Path) -> PathBuf {
        let absolute = self.paths.resolve(&self.base_dir, path);
        PathBuf::from(self.paths.slashify(&self.paths.relativize(&self.base_dir, &absolute)))
    }

    /// Id of `path`, adding it to the table when new
    pub fn file_index(&mut self, path: &Path) -> u32 {
        let file = self.file_from_path(path);
        let key = self.paths.slashify(&file);

        if let Some(&id) = self.index.get(&key) {
            return id;
        }

        let id = self.files.len() as u32;
        tracing::trace!(id, file = %key, "registered file");
        self.index.insert(key, id);
        self.files.push(file);
        id
    }

    pub fn file_id(&mut self, path: &Path) -> u32 {
        self.file_index(path)
    }

    /// Id of `path` without registering it
    pub fn lookup(&self, path: &Path) -> Option<u32> {
        let file = self.file_from_path(path);
        self.index.get(&self.paths.slashify(&file)).copied()
    }

    /// Move the base directory, re-relativizing every entry in place.
    /// Returns the previous base directory.
    pub fn set_base_dir(&mut self, dir: &Path) -> PathBuf {
        let base_dir = self.paths.absolutify(dir);
        let old = std::mem::replace(&mut self.base_dir, base_dir);

        let files = std::mem::take(&mut self.files);
        self.files = files.iter().map(|f| self.rebase(&old, f)).collect();

        self.index = self
            .files
            .iter()
            .enumerate()
            .map(|(id, f)| (self.paths.slashify(f), id as u32))
            .collect();

        tracing::debug!(base_dir = %self.base_dir.display(), files = self.files.len(), "rebased file table");
        old
    }

    /// Re-express `path`, relative to `old_base`, against the current base
    pub fn rebase(&self, old_base: &Path, path: &Path) -> PathBuf {
        let absolute = self.paths.resolve(old_base, path);
        PathBuf::from(self.paths.slashify(&self.paths.relativize(&self.base_dir, &absolute)))
    }

    /// Absolute form of a table-relative path
    pub fn resolve_file(&self, path: &Path) -> PathBuf {
        self.paths.resolve(&self.base_dir, path)
    }

    pub fn resolve_file_id(&self, id: u32) -> Option<PathBuf> {
        self.file(id).map(|f| self.resolve_file(f))
    }

    /// Copy of `location` with an absolute file path
    pub fn resolve_location(&self, location: &Location) -> Location {
        let mut resolved = location.clone();
        if let Some(file) = &location.file {
            resolved.file = Some(self.resolve_file(file));
        }
        resolved
    }

    /// Make the file of `location` table-relative, registering it
    pub fn fixup_location(&mut self, location: &mut Location) {
        if let Some(file) = location.file.take() {
            let id = self.file_index(&file);
            location.file = self.file(id).map(Path::to_path_buf);
        }
    }

    /// Encode locations as `id:line:col` joined by `|`, registering their
    /// files. Missing locations are written as `??` so later entries keep
    /// their index.
    pub fn encode_locations(&mut self, locations: &[Option<Location>]) -> String {
        for location in locations.iter().flatten() {
            if let Some(file) = &location.file {
                self.file_index(file);
            }
        }
        self.encode_with(locations, |file| self.lookup(file))
            .unwrap_or_default()
    }

    /// Encode locations whose files are already registered
    pub fn encode_registered(&self, locations: &[Option<Location>]) -> DomResult<String> {
        self.encode_with(locations, |file| self.lookup(file))
    }

    fn encode_with(
        &self,
        locations: &[Option<Location>],
        id_of: impl Fn(&Path) -> Option<u32>,
    ) -> DomResult<String> {
        let mut out = String::new();

        for (i, location) in locations.iter().enumerate() {
            if i > 0 {
                out.push(DELIMITER);
            }

            match location {
                Some(Location {
                    file: Some(file),
                    line,
                    column,
                }) => {
                    let id = id_of(file).ok_or_else(|| DomError::UnregisteredFile(file.clone()))?;
                    out.push_str(&Location::format(Some(Path::new(&id.to_string())), *line, *column));
                }
                _ => out.push_str(NULL_MARKER),
            }
        }

        Ok(out)
    }

    /// Decode an encoded location list, resolving file ids to table paths
    pub fn decode_locations(&self, src: &str) -> DomResult<Vec<Option<Location>>> {
        if src.is_empty() {
            return Ok(Vec::new());
        }

        src.split(DELIMITER)
            .map(|part| -> DomResult<Option<Location>> {
                if part == NULL_MARKER {
                    return Ok(None);
                }

                let mut location = Location::parse(part)?;
                if let Some(field) = location.file.take() {
                    let id: u32 = field
                        .to_str()
                        .and_then(|s| s.parse().ok())
                        .ok_or_else(|| SourceError::InvalidLocation(part.to_string()))?;
                    let file = self.file(id).ok_or(SourceError::UnknownFile(id))?;
                    location.file = Some(file.to_path_buf());
                }
                Ok(Some(location))
            })
            .collect()
    }

    /// Encode a source map whose paths are all in this table
    pub fn encode_sources(&self, sources: &SourceMap) -> DomResult<String> {
        let mut keyed = sources.clone();
        keyed.attach(self.files.clone(), |file| self.lookup(file))?;
        Ok(keyed.to_src())
    }

    /// Decode a chunk list over `text`. The map keeps a private list of the
    /// table paths it uses.
    pub fn decode_sources(&self, src: &str, text: &str) -> DomResult<SourceMap> {
        let mut sources = SourceMap::new(self.files.clone(), text, src)?;
        sources.detach(Path::to_path_buf)?;
        Ok(sources)
    }
}
