use std::path::{Path, PathBuf};
use std::process::Command;

use git2::{AutotagOption, Commit, DiffFindOptions, DiffFormat, DiffOptions, FetchOptions, Oid};
use regex::Regex;

use revcompare_types::{BackendKind, RevisionId};

use super::{Error, Result, VcsBackend};
use crate::Repository;
use crate::models::{Changeset, ChangesetRange, split_message};

/// Full-length commit ids (SHA-256 or SHA-1) in `git log` output.
const COMMIT_ID_PATTERN: &str = r"\b(?:[0-9a-fA-F]{64}|[0-9a-fA-F]{40})\b";

/// Git, read through git2. Only the same-repository log range shells out.
#[derive(Clone, Debug)]
pub struct GitBackend {
    executable: PathBuf,
}

fn open(path: &Path) -> Result<git2::Repository> {
    git2::Repository::open(path).map_err(|_| Error::RepoNotFound(path.display().to_string()))
}

fn to_changeset(commit: &Commit<'_>) -> Changeset {
    let author = commit.author();
    let author = match (author.name(), author.email()) {
        (Some(name), Some(email)) => format!("{name} <{email}>"),
        (Some(name), None) => name.to_string(),
        (None, email) => email.unwrap_or_default().to_string(),
    };
    let (summary, description) = split_message(commit.message().unwrap_or(""));
    Changeset {
        id: RevisionId::from(commit.id()),
        parents: commit.parent_ids().map(RevisionId::from).collect(),
        author,
        timestamp: commit.time().seconds(),
        summary,
        description,
        branch: None,
    }
}

/// Fetches `oid` from the repository at `source` unless it is already present.
fn fetch_commit(repo: &git2::Repository, source: &Path, oid: Oid) -> Result<()> {
    if repo.find_commit(oid).is_ok() {
        return Ok(());
    }

    let url = source.to_string_lossy();
    let mut remote = repo.remote_anonymous(&url)?;
    log::info!(
        "Commit {} not found in {}, fetching from {}",
        oid,
        repo.path().display(),
        source.display()
    );

    let mut fo = FetchOptions::new();
    fo.download_tags(AutotagOption::None);
    let refspec = format!("{}:", oid);
    remote.fetch(&[&refspec], Some(&mut fo), None)?;

    repo.find_commit(oid)
        .map(|_| ())
        .map_err(|_| Error::UnknownRevision {
            rev: oid.to_string(),
            message: format!("not found in {}", source.display()),
        })
}

fn extract_commit_ids(output: &str) -> Result<Vec<RevisionId>> {
    let pattern = Regex::new(COMMIT_ID_PATTERN).map_err(|e| Error::Parse(e.to_string()))?;
    pattern
        .find_iter(output)
        .map(|m| RevisionId::try_from(m.as_str()).map_err(Error::from))
        .collect()
}

impl GitBackend {
    pub fn new(executable: &Path) -> Self {
        Self {
            executable: executable.to_path_buf(),
        }
    }

    /// Commit ids in `org..other`, oldest first, from `git log`.
    fn log_range(
        &self,
        path: &Path,
        org_rev: &RevisionId,
        other_rev: &RevisionId,
    ) -> Result<Vec<RevisionId>> {
        let range = format!("{org_rev}..{other_rev}");
        let output = Command::new(&self.executable)
            .arg("-C")
            .arg(path)
            .args(["log", "--reverse", "--pretty=format:%H", "-s", range.as_str()])
            .output()
            .map_err(|e| Error::Command(e.to_string()))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::CommandFailed(stderr.trim().to_string()));
        }

        extract_commit_ids(&String::from_utf8_lossy(&output.stdout))
    }
}

impl VcsBackend for GitBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Git
    }

    fn is_empty(&self, path: &Path) -> Result<bool> {
        Ok(open(path)?.is_empty()?)
    }

    fn lookup(&self, path: &Path, rev: &str) -> Result<RevisionId> {
        let repo = open(path)?;
        let commit = repo
            .revparse_single(rev)
            .and_then(|object| object.peel_to_commit())
            .map_err(|e| Error::UnknownRevision {
                rev: rev.to_string(),
                message: e.message().to_string(),
            })?;
        Ok(RevisionId::from(commit.id()))
    }

    fn changeset_range(
        &self,
        org: &Repository,
        org_rev: &RevisionId,
        other: &Repository,
        other_rev: &RevisionId,
        merge: bool,
    ) -> Result<ChangesetRange> {
        let other_git = open(other.path())?;

        if org.same_storage(other) {
            let changesets = self
                .log_range(other.path(), org_rev, other_rev)?
                .iter()
                .map(|id| Ok(to_changeset(&other_git.find_commit(id.oid()?)?)))
                .collect::<Result<Vec<_>>>()?;
            return Ok(ChangesetRange {
                changesets,
                ancestor: None,
            });
        }

        // Each side may need to resolve revisions that only exist in the other.
        let org_git = open(org.path())?;
        fetch_commit(&org_git, other.path(), other_rev.oid()?)?;
        fetch_commit(&other_git, org.path(), org_rev.oid()?)?;

        let mut revwalk = other_git.revwalk()?;
        revwalk.set_sorting(git2::Sort::TOPOLOGICAL | git2::Sort::TIME)?;
        revwalk.push(other_rev.oid()?)?;
        revwalk.hide(org_rev.oid()?)?;

        let mut changesets = Vec::new();
        for oid_result in revwalk {
            let commit = other_git.find_commit(oid_result?)?;
            changesets.push(to_changeset(&commit));
        }
        changesets.reverse();

        let ancestor = if !merge {
            None
        } else {
            match changesets.first() {
                Some(oldest) => oldest.first_parent().cloned(),
                None => Some(other_rev.clone()),
            }
        };

        Ok(ChangesetRange {
            changesets,
            ancestor,
        })
    }

    fn diff(
        &self,
        repo: &Repository,
        peer: Option<&Repository>,
        rev1: &RevisionId,
        rev2: &RevisionId,
        context_lines: u32,
    ) -> Result<String> {
        let git = open(repo.path())?;
        if let Some(peer) = peer.filter(|peer| !repo.same_storage(peer)) {
            fetch_commit(&git, peer.path(), rev1.oid()?)?;
            fetch_commit(&git, peer.path(), rev2.oid()?)?;
        }

        let old_tree = git.find_commit(rev1.oid()?)?.tree()?;
        let new_tree = git.find_commit(rev2.oid()?)?.tree()?;

        let mut opts = DiffOptions::new();
        opts.context_lines(context_lines)
            .interhunk_lines(0)
            .ignore_whitespace(false);
        let mut diff = git.diff_tree_to_tree(Some(&old_tree), Some(&new_tree), Some(&mut opts))?;
        let mut find_opts = DiffFindOptions::new();
        find_opts.renames(true);
        diff.find_similar(Some(&mut find_opts))?;

        let mut text = String::new();
        diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
            if matches!(line.origin(), '+' | '-' | ' ') {
                text.push(line.origin());
            }
            text.push_str(&String::from_utf8_lossy(line.content()));
            true
        })?;
        Ok(text)
    }
}
