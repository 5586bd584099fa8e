//! Path provider
//!
//! The model never splices path strings itself. Everything goes through a
//! [`PathProvider`], so hosts with their own file abstraction can plug it in.
//! [`LexicalPaths`] is the default: purely lexical, no filesystem access.

use std::path::{Component, Path, PathBuf};

/// Path operations the document model needs from its host
pub trait PathProvider: std::fmt::Debug + Send + Sync {
    /// Make `path` absolute against the working directory
    fn absolutify(&self, path: &Path) -> PathBuf;

    /// Express `path` relative to `base`
    fn relativize(&self, base: &Path, path: &Path) -> PathBuf;

    /// Resolve `path` against `base`
    fn resolve(&self, base: &Path, path: &Path) -> PathBuf;

    /// Parent directory of `path`
    fn parent(&self, path: &Path) -> Option<PathBuf>;

    /// Forward-slash string form of `path`, used in encoded output
    fn slashify(&self, path: &Path) -> String {
        path.to_string_lossy().replace('\\', "/")
    }
}

/// Lexical path arithmetic rooted at a fixed working directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LexicalPaths {
    cwd: PathBuf,
}

impl LexicalPaths {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        Self {
            cwd: normalize(&cwd.into()),
        }
    }

    /// Rooted at the process working directory
    pub fn current() -> Self {
        let cwd = std::env::current_dir().unwrap_or_else(|err| {
            tracing::warn!("no working directory ({}), using /", err);
            PathBuf::from("/")
        });
        Self::new(cwd)
    }

    pub fn cwd(&self) -> &Path {
        &self.cwd
    }
}

impl Default for LexicalPaths {
    fn default() -> Self {
        Self::current()
    }
}

impl PathProvider for LexicalPaths {
    fn absolutify(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            normalize(path)
        } else {
            normalize(&self.cwd.join(path))
        }
    }

    fn relativize(&self, base: &Path, path: &Path) -> PathBuf {
        let base = self.absolutify(base);
        let path = self.absolutify(path);

        let base_parts: Vec<Component<'_>> = base.components().collect();
        let path_parts: Vec<Component<'_>> = path.components().collect();

        let common = base_parts
            .iter()
            .zip(&path_parts)
            .take_while(|(a, b)| a == b)
            .count();

        // Different roots (drive letters) have no relative form
        if common == 0 {
            return path;
        }

        let mut out = PathBuf::new();
        for _ in common..base_parts.len() {
            out.push("..");
        }
        for part in &path_parts[common..] {
            out.push(part.as_os_str());
        }

        if out.as_os_str().is_empty() {
            out.push(".");
        }
        out
    }

    fn resolve(&self, base: &Path, path: &Path) -> PathBuf {
        if path.is_absolute() {
            normalize(path)
        } else {
            self.absolutify(&base.join(path))
        }
    }

    fn parent(&self, path: &Path) -> Option<PathBuf> {
        self.absolutify(path).parent().map(Path::to_path_buf)
    }
}

/// Lexically remove `.` and `..` segments
pub fn normalize(path: &Path) -> PathBuf {
    let mut parts: Vec<Component<'_>> = Vec::new();

    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => match parts.last() {
                Some(Component::Normal(_)) => {
                    parts.pop();
                }
                Some(Component::RootDir | Component::Prefix(_)) => {}
                _ => parts.push(component),
            },
            other => parts.push(other),
        }
    }

    if parts.is_empty() {
        return PathBuf::from(".");
    }

    parts.iter().map(|c| c.as_os_str()).collect()
}
