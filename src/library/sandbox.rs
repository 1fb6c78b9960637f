use std::io;
use std::path::{Component, Path, PathBuf};

/// Errors resolving a client-supplied path.
#[derive(Debug, thiserror::Error)]
pub enum PathError {
    #[error("invalid path: {path}")]
    Invalid { path: String },

    #[error("path escapes the media root: {path}")]
    OutsideRoot { path: String },

    #[error("not found: {path}")]
    NotFound { path: String },

    #[error("not a directory: {path}")]
    NotADirectory { path: String },

    #[error("cannot read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: io::Error,
    },
}

impl PathError {
    pub(crate) fn io(path: impl Into<String>, source: io::Error) -> Self {
        let path = path.into();
        if source.kind() == io::ErrorKind::NotFound {
            PathError::NotFound { path }
        } else {
            PathError::Io { path, source }
        }
    }
}

/// A path resolved inside the sandbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// Canonical absolute path.
    pub full: PathBuf,
    /// Normalized path relative to the root, as the client should see it.
    pub relative: PathBuf,
}

/// Confines client paths to one directory tree.
#[derive(Debug, Clone)]
pub struct Sandbox {
    root: PathBuf,
}

impl Sandbox {
    /// Canonicalize `root`, which must be an existing directory.
    pub fn new(root: impl AsRef<Path>) -> Result<Self, PathError> {
        let display = root.as_ref().display().to_string();
        let root = std::fs::canonicalize(root.as_ref()).map_err(|e| PathError::io(&display, e))?;
        if !root.is_dir() {
            return Err(PathError::NotADirectory { path: display });
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve an existing path relative to the root.
    ///
    /// Absolute paths and `..` are rejected outright. Symlinks are followed
    /// and the target must still lie under the root.
    pub fn resolve(&self, rel: &str) -> Result<Resolved, PathError> {
        let relative = normalize(rel)?;
        let joined = self.root.join(&relative);
        let full = std::fs::canonicalize(&joined).map_err(|e| PathError::io(rel, e))?;
        if !self.contains(&full) {
            return Err(PathError::OutsideRoot {
                path: rel.to_string(),
            });
        }
        Ok(Resolved { full, relative })
    }

    /// Whether a canonical path lies under the root.
    pub fn contains(&self, canonical: &Path) -> bool {
        canonical.starts_with(&self.root)
    }
}

/// Lexically normalize a relative path, dropping `.` segments.
fn normalize(rel: &str) -> Result<PathBuf, PathError> {
    let mut out = PathBuf::new();
    for component in Path::new(rel).components() {
        match component {
            Component::Normal(part) => out.push(part),
            Component::CurDir => {}
            Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                return Err(PathError::Invalid {
                    path: rel.to_string(),
                })
            }
        }
    }
    Ok(out)
}
