use std::path::{Component, Path, PathBuf};

use revcompare_types::BackendKind;

use crate::{CompareConfig, Error, Repository, Result};

/// Looks repositories up by name.
pub trait RepositoryRegistry {
    fn get(&self, name: &str) -> Result<Repository>;
}

/// Repositories stored as `<root>/<name>`, with the backend detected from disk.
#[derive(Clone, Debug)]
pub struct DirectoryRegistry {
    root: PathBuf,
    config: CompareConfig,
}

impl DirectoryRegistry {
    pub fn new(root: impl Into<PathBuf>, config: CompareConfig) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

fn detect_kind(path: &Path) -> Option<BackendKind> {
    if path.join(".hg").is_dir() {
        Some(BackendKind::Hg)
    } else if path.join(".git").exists()
        || (path.join("HEAD").is_file() && path.join("objects").is_dir())
    {
        Some(BackendKind::Git)
    } else {
        None
    }
}

impl RepositoryRegistry for DirectoryRegistry {
    fn get(&self, name: &str) -> Result<Repository> {
        let not_found = || Error::RepositoryNotFound(name.to_string());

        let relative = Path::new(name);
        let plain = !name.is_empty()
            && relative
                .components()
                .all(|c| matches!(c, Component::Normal(_)));
        if !plain {
            return Err(not_found());
        }

        let path = self.root.join(relative);
        let kind = detect_kind(&path).ok_or_else(not_found)?;
        log::debug!("found {} repository {} at {}", kind, name, path.display());
        Ok(Repository::new(name, path, self.config.backend(kind)))
    }
}
