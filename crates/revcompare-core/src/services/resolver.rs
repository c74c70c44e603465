use revcompare_types::{Reference, RevisionId};

use super::backend;
use super::revset::Revset;
use crate::{Error, Repository, Result};

/// Resolves a reference to the canonical id of the revision it names.
///
/// Revset-capable backends are asked for the most recent revision matching
/// the reference first; anything that query cannot answer falls through to
/// a plain lookup of the raw value.
pub fn resolve(reference: &Reference, repo: &Repository) -> Result<RevisionId> {
    let vcs = repo.backend();

    let empty = vcs
        .is_empty(repo.path())
        .map_err(|e| Error::comparison_failed(repo, "checking for changesets", e))?;
    if empty {
        return Err(Error::EmptyRepository {
            repo: repo.name().to_string(),
        });
    }

    if vcs.supports_revsets() {
        match vcs.query(repo.path(), &Revset::latest(reference)) {
            Ok(matches) => {
                if let Some(rev) = matches.last() {
                    log::debug!("resolved {} in {} to {}", reference, repo.name(), rev);
                    return Ok(rev.clone());
                }
            }
            Err(e) => {
                log::debug!(
                    "query for {} in {} failed, falling back to lookup: {}",
                    reference,
                    repo.name(),
                    e
                );
            }
        }
    }

    match vcs.lookup(repo.path(), reference.value()) {
        Ok(rev) => {
            log::debug!("resolved {} in {} to {}", reference, repo.name(), rev);
            Ok(rev)
        }
        Err(backend::Error::UnknownRevision { message, .. }) => Err(Error::UnresolvableReference {
            repo: repo.name().to_string(),
            reference: reference.clone(),
            message,
        }),
        Err(e) => Err(Error::comparison_failed(
            repo,
            format!("resolving {reference}"),
            e,
        )),
    }
}
