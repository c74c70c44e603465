use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::BackendKind;
use crate::services::backend::VcsBackend;

/// A named, read-only repository together with the backend that can read it.
#[derive(Clone)]
pub struct Repository {
    name: String,
    path: PathBuf,
    backend: Arc<dyn VcsBackend>,
}

impl Repository {
    pub fn new(
        name: impl Into<String>,
        path: impl Into<PathBuf>,
        backend: Arc<dyn VcsBackend>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            backend,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn kind(&self) -> BackendKind {
        self.backend.kind()
    }

    pub fn backend(&self) -> &dyn VcsBackend {
        self.backend.as_ref()
    }

    /// True when both handles point at the same on-disk storage.
    pub fn same_storage(&self, other: &Repository) -> bool {
        match (
            std::fs::canonicalize(&self.path),
            std::fs::canonicalize(&other.path),
        ) {
            (Ok(a), Ok(b)) => a == b,
            _ => self.path == other.path,
        }
    }
}

impl fmt::Debug for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("name", &self.name)
            .field("path", &self.path)
            .field("kind", &self.kind())
            .finish_non_exhaustive()
    }
}
