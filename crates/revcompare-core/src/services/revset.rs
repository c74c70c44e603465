use std::fmt;

use revcompare_types::{RefKind, Reference, RevisionId};

/// A revision-set query for backends that evaluate them natively.
///
/// Built only through the constructors below so that user-supplied names are
/// always quoted, never spliced into the query text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Revset(String);

/// Quotes a value as a revset string literal.
fn quote(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('\'');
    for c in value.chars() {
        if matches!(c, '\\' | '\'') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('\'');
    quoted
}

fn id(rev: &RevisionId) -> String {
    format!("id({})", quote(rev.as_str()))
}

impl Revset {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Most recent revision matching the reference's predicate.
    pub fn latest(reference: &Reference) -> Self {
        let value = quote(reference.value());
        let predicate = match reference.kind() {
            RefKind::Branch => format!("branch({value})"),
            RefKind::Bookmark => format!("bookmark({value})"),
            RefKind::Tag => format!("tag({value})"),
            RefKind::Rev => format!("id({value})"),
        };
        Self(format!("max({predicate})"))
    }

    /// A raw symbol: full id, short hash, revision number or name.
    pub fn symbol(value: &str) -> Self {
        Self(quote(value))
    }

    /// Changesets `org` would receive by merging `other`, oldest first.
    pub fn merge_range(org: &RevisionId, other: &RevisionId) -> Self {
        let (org, other) = (id(org), id(other));
        Self(format!(
            "sort(ancestors({other}) and not ancestors({org}) and not {org}, rev)"
        ))
    }

    /// Descendants of `org` up to `other`, excluding `org`, oldest first.
    pub fn linear_range(org: &RevisionId, other: &RevisionId) -> Self {
        let (org, other) = (id(org), id(other));
        Self(format!("sort({org}::{other} - {org}, rev)"))
    }

    /// Greatest common ancestor of the two revisions, if any.
    pub fn common_ancestor(a: &RevisionId, b: &RevisionId) -> Self {
        Self(format!("ancestor({}, {})", id(a), id(b)))
    }
}

impl fmt::Display for Revset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
