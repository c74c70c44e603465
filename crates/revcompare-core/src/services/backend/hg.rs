use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};
use std::process::Command;

use serde::Deserialize;

use revcompare_types::{BackendKind, RevisionId};

use super::{Error, Result, VcsBackend};
use crate::Repository;
use crate::models::{Changeset, ChangesetRange, split_message};
use crate::services::revset::Revset;

/// Mercurial, driven through the `hg` executable with revset queries.
#[derive(Clone, Debug)]
pub struct HgBackend {
    executable: PathBuf,
}

/// Read-only overlay of two repositories, rooted at `base`.
///
/// Revision numbers seen through the view stay valid in `base`. Exists for
/// a single call only; the underlying repositories may change between calls.
#[derive(Debug)]
struct UnionView {
    location: OsString,
}

impl UnionView {
    fn new(base: &Path, overlay: &Path) -> Self {
        let mut location = OsString::from("union:");
        location.push(base);
        location.push("+");
        location.push(overlay);
        log::debug!("opened union view {:?}", location);
        Self { location }
    }
}

impl Drop for UnionView {
    fn drop(&mut self) {
        log::debug!("released union view {:?}", self.location);
    }
}

/// Where a command is evaluated: a plain repository or a union of two.
enum Target<'a> {
    Local(&'a Path),
    Union(UnionView),
}

impl Target<'_> {
    fn location(&self) -> &OsStr {
        match self {
            Target::Local(path) => path.as_os_str(),
            Target::Union(view) => &view.location,
        }
    }
}

/// One entry of `hg log -T json`.
#[derive(Debug, Deserialize)]
struct LogEntry {
    node: String,
    parents: Vec<String>,
    user: String,
    /// (unix time, timezone offset)
    date: (f64, i64),
    desc: String,
    branch: String,
}

impl TryFrom<LogEntry> for Changeset {
    type Error = Error;

    fn try_from(entry: LogEntry) -> Result<Self> {
        let parents = entry
            .parents
            .iter()
            .map(|p| RevisionId::try_from(p.as_str()))
            .filter(|p| !p.as_ref().is_ok_and(RevisionId::is_null))
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let (summary, description) = split_message(&entry.desc);
        Ok(Changeset {
            id: RevisionId::try_from(entry.node.as_str())?,
            parents,
            author: entry.user,
            timestamp: entry.date.0 as i64,
            summary,
            description,
            branch: Some(entry.branch),
        })
    }
}

impl HgBackend {
    pub fn new(executable: &Path) -> Self {
        Self {
            executable: executable.to_path_buf(),
        }
    }

    fn command(&self, location: &OsStr) -> Command {
        let mut cmd = Command::new(&self.executable);
        cmd.env("HGPLAIN", "1").arg("-R").arg(location);
        cmd
    }

    fn run(&self, cmd: &mut Command) -> Result<String> {
        let output = cmd.output().map_err(|e| Error::Command(e.to_string()))?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::CommandFailed(stderr.trim().to_string()));
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    fn target<'a>(&self, repo: &'a Repository, peer: Option<&Repository>) -> Target<'a> {
        match peer {
            Some(peer) if !repo.same_storage(peer) => {
                Target::Union(UnionView::new(repo.path(), peer.path()))
            }
            _ => Target::Local(repo.path()),
        }
    }

    fn node_ids(&self, location: &OsStr, revset: &Revset) -> Result<Vec<RevisionId>> {
        let stdout = self.run(
            self.command(location)
                .args(["log", "-r", revset.as_str(), "-T", "{node}\n"]),
        )?;
        stdout
            .lines()
            .filter(|line| !line.trim().is_empty())
            .map(|line| RevisionId::try_from(line.trim()).map_err(Error::from))
            .collect()
    }

    fn changesets(&self, location: &OsStr, revset: &Revset) -> Result<Vec<Changeset>> {
        let stdout = self.run(
            self.command(location)
                .args(["log", "-r", revset.as_str(), "-T", "json"]),
        )?;
        parse_log_json(&stdout)
    }
}

/// Whether hg's stderr says the symbol names no (visible) changeset.
fn is_unknown_revision(stderr: &str) -> bool {
    const MARKERS: [&str; 5] = [
        "unknown revision",
        "ambiguous identifier",
        "hidden revision",
        "filtered revision",
        "no such",
    ];
    let stderr = stderr.to_ascii_lowercase();
    MARKERS.iter().any(|marker| stderr.contains(marker))
}

fn parse_log_json(output: &str) -> Result<Vec<Changeset>> {
    if output.trim().is_empty() {
        return Ok(Vec::new());
    }
    let entries: Vec<LogEntry> =
        serde_json::from_str(output).map_err(|e| Error::Parse(e.to_string()))?;
    entries.into_iter().map(Changeset::try_from).collect()
}

impl VcsBackend for HgBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Hg
    }

    fn is_empty(&self, path: &Path) -> Result<bool> {
        if !path.join(".hg").is_dir() {
            return Err(Error::RepoNotFound(path.display().to_string()));
        }
        let stdout = self.run(
            self.command(path.as_os_str())
                .args(["log", "-l", "1", "-T", "{node}"]),
        )?;
        Ok(stdout.trim().is_empty())
    }

    fn supports_revsets(&self) -> bool {
        true
    }

    fn query(&self, path: &Path, revset: &Revset) -> Result<Vec<RevisionId>> {
        self.node_ids(path.as_os_str(), revset)
    }

    fn lookup(&self, path: &Path, rev: &str) -> Result<RevisionId> {
        let revset = Revset::symbol(rev);
        let output = self
            .command(path.as_os_str())
            .args(["log", "-r", revset.as_str(), "-l", "1", "-T", "{node}"])
            .output()
            .map_err(|e| Error::Command(e.to_string()))?;
        let unknown = |message: String| Error::UnknownRevision {
            rev: rev.to_string(),
            message,
        };
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            if is_unknown_revision(&stderr) {
                return Err(unknown(stderr));
            }
            return Err(Error::CommandFailed(stderr));
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        let node = stdout.trim();
        if node.is_empty() {
            return Err(unknown("no matching changeset".to_string()));
        }
        Ok(RevisionId::try_from(node)?)
    }

    fn changeset_range(
        &self,
        org: &Repository,
        org_rev: &RevisionId,
        other: &Repository,
        other_rev: &RevisionId,
        merge: bool,
    ) -> Result<ChangesetRange> {
        let target = self.target(other, Some(org));
        let location = target.location();

        if !merge {
            let changesets =
                self.changesets(location, &Revset::linear_range(org_rev, other_rev))?;
            return Ok(ChangesetRange {
                changesets,
                ancestor: None,
            });
        }

        let changesets = self.changesets(location, &Revset::merge_range(org_rev, other_rev))?;
        // Several common ancestors are possible; any one will do.
        let ancestor = self
            .node_ids(location, &Revset::common_ancestor(org_rev, other_rev))?
            .into_iter()
            .find(|id| !id.is_null());
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
        let target = self.target(repo, peer);
        let context = context_lines.to_string();
        self.run(self.command(target.location()).args([
            "diff",
            "--git",
            "-U",
            context.as_str(),
            "-r",
            rev1.as_str(),
            "-r",
            rev2.as_str(),
        ]))
    }
}
