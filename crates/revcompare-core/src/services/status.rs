use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use revcompare_types::RevisionId;

use crate::Repository;
use crate::models::Changeset;

/// Review state of a single changeset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangesetStatus {
    #[default]
    NotReviewed,
    Approved,
    Rejected,
    UnderReview,
}

/// Source of review records, consulted after a comparison succeeds.
///
/// Ids with no record may be left out of the returned map.
pub trait StatusStore {
    type Error: std::error::Error;

    fn statuses(
        &self,
        repo: &Repository,
        revisions: &[RevisionId],
    ) -> Result<HashMap<RevisionId, ChangesetStatus>, Self::Error>;
}

/// Status of every changeset, in order, defaulting to [`ChangesetStatus::NotReviewed`].
pub fn review_statuses<S: StatusStore>(
    store: &S,
    repo: &Repository,
    changesets: &[Changeset],
) -> Result<Vec<(RevisionId, ChangesetStatus)>, S::Error> {
    let revisions: Vec<RevisionId> = changesets.iter().map(|cs| cs.id.clone()).collect();
    let mut known = store.statuses(repo, &revisions)?;
    Ok(revisions
        .into_iter()
        .map(|id| {
            let status = known.remove(&id).unwrap_or_default();
            (id, status)
        })
        .collect())
}
