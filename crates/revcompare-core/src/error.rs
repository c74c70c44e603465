use revcompare_types::{BackendKind, Reference, UnsupportedBackendError};

use crate::services::backend;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Repository not found: {0}")]
    RepositoryNotFound(String),

    #[error("Cannot compare {org_kind} repository {org} with {other_kind} repository {other}")]
    BackendMismatch {
        org: String,
        org_kind: BackendKind,
        other: String,
        other_kind: BackendKind,
    },

    #[error("There are no changesets yet in {repo}")]
    EmptyRepository { repo: String },

    #[error("Cannot resolve {reference} in {repo}: {message}")]
    UnresolvableReference {
        repo: String,
        reference: Reference,
        message: String,
    },

    #[error("Failed {operation} in {repo}: {source}")]
    ComparisonFailed {
        repo: String,
        operation: String,
        #[source]
        source: backend::Error,
    },

    #[error(transparent)]
    UnsupportedBackend(#[from] UnsupportedBackendError),

    #[error("Invalid config {path}: {message}")]
    Config { path: String, message: String },
}

impl Error {
    pub(crate) fn comparison_failed(
        repo: &crate::Repository,
        operation: impl Into<String>,
        source: backend::Error,
    ) -> Self {
        Error::ComparisonFailed {
            repo: repo.name().to_string(),
            operation: operation.into(),
            source,
        }
    }

    /// Empty repositories are often "nothing to compare" rather than a failure.
    pub fn is_empty_repository(&self) -> bool {
        matches!(self, Error::EmptyRepository { .. })
    }
}
