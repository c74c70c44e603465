use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::services::backend::{GitBackend, HgBackend, VcsBackend};
use crate::{BackendKind, Error, Result};

/// Diffs larger than this many bytes are cut off unless a full diff is requested.
pub const DEFAULT_DIFF_LIMIT: usize = 256_000;

/// Settings threaded into the comparator and the backends it builds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct CompareConfig {
    /// `None` disables truncation for every comparison.
    pub diff_limit: Option<usize>,
    pub context_lines: u32,
    pub git_executable: PathBuf,
    pub hg_executable: PathBuf,
}

impl Default for CompareConfig {
    fn default() -> Self {
        Self {
            diff_limit: Some(DEFAULT_DIFF_LIMIT),
            context_lines: 3,
            git_executable: PathBuf::from("git"),
            hg_executable: PathBuf::from("hg"),
        }
    }
}

impl CompareConfig {
    /// Reads a JSON config file; keys that are absent keep their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let config_error = |message: String| Error::Config {
            path: path.display().to_string(),
            message,
        };
        let content = std::fs::read_to_string(path).map_err(|e| config_error(e.to_string()))?;
        let config: Self =
            serde_json::from_str(&content).map_err(|e| config_error(e.to_string()))?;
        log::info!("loaded config from {}", path.display());
        Ok(config)
    }

    pub fn backend(&self, kind: BackendKind) -> Arc<dyn VcsBackend> {
        match kind {
            BackendKind::Git => Arc::new(GitBackend::new(&self.git_executable)),
            BackendKind::Hg => Arc::new(HgBackend::new(&self.hg_executable)),
        }
    }

    /// Like [`CompareConfig::backend`], for a kind named in external input.
    pub fn backend_for_alias(&self, alias: &str) -> Result<Arc<dyn VcsBackend>> {
        let kind: BackendKind = alias.parse()?;
        Ok(self.backend(kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_keys_use_defaults() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "context_lines": 5 }"#).unwrap();

        let config = CompareConfig::load(&path).unwrap();

        assert_eq!(config.context_lines, 5);
        assert_eq!(config.diff_limit, Some(DEFAULT_DIFF_LIMIT));
        assert_eq!(config.hg_executable, PathBuf::from("hg"));
    }

    #[test]
    fn null_limit_disables_truncation() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{ "diff_limit": null }"#).unwrap();

        let config = CompareConfig::load(&path).unwrap();

        assert_eq!(config.diff_limit, None);
    }

    #[test]
    fn malformed_file_is_a_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = CompareConfig::load(&path).unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn builds_backend_for_each_kind() {
        let config = CompareConfig::default();
        assert_eq!(config.backend(BackendKind::Git).kind(), BackendKind::Git);
        assert_eq!(config.backend(BackendKind::Hg).kind(), BackendKind::Hg);
    }

    #[test]
    fn unknown_alias_is_unsupported() {
        let config = CompareConfig::default();
        assert_eq!(
            config.backend_for_alias("git").unwrap().kind(),
            BackendKind::Git
        );
        assert!(matches!(
            config.backend_for_alias("svn"),
            Err(Error::UnsupportedBackend(_))
        ));
    }
}
