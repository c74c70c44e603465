use serde::Serialize;

use revcompare_types::RevisionId;

/// A commit as returned by either backend.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Changeset {
    pub id: RevisionId,
    /// Parent ids in backend order; the first entry is the first parent.
    pub parents: Vec<RevisionId>,
    pub author: String,
    /// Seconds since the Unix epoch.
    pub timestamp: i64,
    /// First line of the commit message
    pub summary: String,
    /// Rest of the commit message (body), empty if none
    pub description: String,
    /// Named branch (hg only)
    pub branch: Option<String>,
}

impl Changeset {
    pub fn first_parent(&self) -> Option<&RevisionId> {
        self.parents.first()
    }
}

/// Splits a commit message into its summary line and the remaining body.
pub(crate) fn split_message(message: &str) -> (String, String) {
    match message.split_once('\n') {
        Some((first, rest)) => (first.trim().to_string(), rest.trim().to_string()),
        None => (message.trim().to_string(), String::new()),
    }
}

/// Changesets separating two revisions, oldest first.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangesetRange {
    pub changesets: Vec<Changeset>,
    /// Merge base, only under merge semantics.
    pub ancestor: Option<RevisionId>,
}
