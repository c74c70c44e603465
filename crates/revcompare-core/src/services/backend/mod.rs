//! Version control backends.
//!
//! A backend knows how to read one kind of repository: resolve a symbol to a
//! full revision id, list the changesets separating two revisions (possibly
//! across two repositories), and render a git-style diff between revisions.

mod git;
mod hg;

use std::fmt::Debug;
use std::path::Path;

use revcompare_types::{BackendKind, InvalidRevisionIdError, RevisionId};

pub use git::GitBackend;
pub use hg::HgBackend;

use super::revset::Revset;
use crate::Repository;
use crate::models::ChangesetRange;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Failed to run command: {0}")]
    Command(String),

    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("Failed to parse output: {0}")]
    Parse(String),

    #[error("git2 error: {0}")]
    Git2(#[from] git2::Error),

    #[error("Unknown revision {rev}: {message}")]
    UnknownRevision { rev: String, message: String },

    #[error("Repository not found: {0}")]
    RepoNotFound(String),

    #[error("{0} repositories do not support revset queries")]
    RevsetsUnsupported(BackendKind),
}

impl From<InvalidRevisionIdError> for Error {
    fn from(err: InvalidRevisionIdError) -> Self {
        Error::Parse(err.to_string())
    }
}

pub trait VcsBackend: Send + Sync + Debug {
    fn kind(&self) -> BackendKind;

    /// True when the repository has no changesets at all.
    fn is_empty(&self, path: &Path) -> Result<bool>;

    fn supports_revsets(&self) -> bool {
        false
    }

    /// Evaluates a revset, returning matches in the order the backend yields them.
    fn query(&self, _path: &Path, _revset: &Revset) -> Result<Vec<RevisionId>> {
        Err(Error::RevsetsUnsupported(self.kind()))
    }

    /// Resolves a raw symbol (id, prefix, branch, tag...) to a full revision id.
    fn lookup(&self, path: &Path, rev: &str) -> Result<RevisionId>;

    /// Changesets in `other` that are not in `org`, oldest first.
    ///
    /// With `merge`, the common ancestor is reported as well (when one exists).
    fn changeset_range(
        &self,
        org: &Repository,
        org_rev: &RevisionId,
        other: &Repository,
        other_rev: &RevisionId,
        merge: bool,
    ) -> Result<ChangesetRange>;

    /// Git-style diff text from `rev1` to `rev2`.
    ///
    /// `peer` is a second repository holding `rev2` when it is not in `repo`.
    fn diff(
        &self,
        repo: &Repository,
        peer: Option<&Repository>,
        rev1: &RevisionId,
        rev2: &RevisionId,
        context_lines: u32,
    ) -> Result<String>;
}
