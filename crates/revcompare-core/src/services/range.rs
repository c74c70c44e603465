use revcompare_types::RevisionId;

use crate::models::ChangesetRange;
use crate::{Error, Repository, Result};

/// Changesets separating `org_rev` from `other_rev`, oldest first.
///
/// With `merge`, these are the changesets `org` would receive by merging
/// `other`, and the common ancestor is reported when the backend finds one.
/// Otherwise the range is the path from `org_rev` to `other_rev`, which
/// ignores changesets that only exist on `org`'s side.
pub fn compute_range(
    org: &Repository,
    org_rev: &RevisionId,
    other: &Repository,
    other_rev: &RevisionId,
    merge: bool,
) -> Result<ChangesetRange> {
    if org_rev == other_rev {
        return Ok(ChangesetRange {
            changesets: Vec::new(),
            ancestor: merge.then(|| org_rev.clone()),
        });
    }

    if org.kind() != other.kind() {
        return Err(Error::BackendMismatch {
            org: org.name().to_string(),
            org_kind: org.kind(),
            other: other.name().to_string(),
            other_kind: other.kind(),
        });
    }

    let range = other
        .backend()
        .changeset_range(org, org_rev, other, other_rev, merge)
        .map_err(|e| {
            Error::comparison_failed(
                other,
                format!(
                    "computing changesets {}..{} against {}",
                    org_rev.short(),
                    other_rev.short(),
                    org.name()
                ),
                e,
            )
        })?;

    log::debug!(
        "{} changesets between {} and {}, ancestor {:?}",
        range.changesets.len(),
        org_rev.short(),
        other_rev.short(),
        range.ancestor
    );
    Ok(range)
}
