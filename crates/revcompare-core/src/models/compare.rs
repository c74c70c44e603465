use serde::Serialize;

use revcompare_types::{Reference, RevisionId};

use super::{Changeset, FileDiff};
use crate::Repository;

/// Validated input to a comparison.
///
/// `org` is usually the repository a fork was made from, `other` the fork
/// holding the changesets of interest. Both may be the same repository.
#[derive(Clone, Debug)]
pub struct ComparisonRequest {
    pub org_repo: Repository,
    pub org_ref: Reference,
    pub other_repo: Repository,
    pub other_ref: Reference,
    /// Show what `org` would get by merging `other`, diffed from their ancestor.
    /// Otherwise a raw diff from `org` to `other`, related or not.
    pub merge: bool,
    /// Disables the configured diff size limit.
    pub full_diff: bool,
}

impl ComparisonRequest {
    pub fn new(
        org_repo: Repository,
        org_ref: Reference,
        other_repo: Repository,
        other_ref: Reference,
    ) -> Self {
        Self {
            org_repo,
            org_ref,
            other_repo,
            other_ref,
            merge: false,
            full_diff: false,
        }
    }

    pub fn merge(mut self, merge: bool) -> Self {
        self.merge = merge;
        self
    }

    pub fn full_diff(mut self, full_diff: bool) -> Self {
        self.full_diff = full_diff;
        self
    }

    /// The same comparison in the opposite direction.
    pub fn swapped(&self) -> Self {
        Self {
            org_repo: self.other_repo.clone(),
            org_ref: self.other_ref.clone(),
            other_repo: self.org_repo.clone(),
            other_ref: self.org_ref.clone(),
            merge: self.merge,
            full_diff: self.full_diff,
        }
    }
}

/// Non-fatal conditions the caller should surface to the user.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Warning {
    /// Merge semantics were requested but no common ancestor was determined,
    /// so the diff is a raw two-sided one rather than a merge preview.
    ///
    /// Either the revisions share no history, or the backend's range path
    /// does not compute an ancestor (git within a single repository).
    #[serde(rename_all = "camelCase")]
    AncestorNotFound {
        org_rev: RevisionId,
        other_rev: RevisionId,
    },
}

/// Outcome of resolution and range computation, without a diff.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangesetComparison {
    pub org_rev: RevisionId,
    pub other_rev: RevisionId,
    /// Oldest first.
    pub changesets: Vec<Changeset>,
    pub ancestor: Option<RevisionId>,
    pub warnings: Vec<Warning>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResult {
    pub org_rev: RevisionId,
    pub other_rev: RevisionId,
    /// Oldest first.
    pub changesets: Vec<Changeset>,
    pub ancestor: Option<RevisionId>,
    pub files: Vec<FileDiff>,
    /// Binary files are not counted.
    pub lines_added: u32,
    pub lines_deleted: u32,
    pub truncated: bool,
    pub warnings: Vec<Warning>,
}

impl ComparisonResult {
    pub fn changeset_ids(&self) -> Vec<RevisionId> {
        self.changesets.iter().map(|cs| cs.id.clone()).collect()
    }
}
