use std::str::FromStr;

use git2::Oid;

/// Hex id of the all-zero "null" revision both backends use for "no parent".
const NULL_REVISION: &str = "0000000000000000000000000000000000000000";

#[derive(Debug, thiserror::Error)]
#[error("Invalid revision id: {0:?}")]
pub struct InvalidRevisionIdError(String);

/// Canonical, full-length hex id of a changeset.
///
/// Both backends address changesets by a SHA-1 digest, so the id is kept as
/// lowercase hex (40 chars, or 64 for SHA-256 git repositories).
#[derive(Clone, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct RevisionId(String);

impl std::fmt::Debug for RevisionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::fmt::Display for RevisionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl RevisionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First 12 hex digits, as shown in logs.
    pub fn short(&self) -> &str {
        &self.0[..12]
    }

    pub fn is_null(&self) -> bool {
        self.0 == NULL_REVISION
    }

    pub fn oid(&self) -> Result<Oid, git2::Error> {
        Oid::from_str(&self.0)
    }
}

impl AsRef<str> for RevisionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<Oid> for RevisionId {
    fn from(oid: Oid) -> Self {
        Self(oid.to_string())
    }
}

impl TryFrom<&str> for RevisionId {
    type Error = InvalidRevisionIdError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let valid_len = matches!(value.len(), 40 | 64);
        if valid_len && value.bytes().all(|b| b.is_ascii_hexdigit()) {
            Ok(Self(value.to_ascii_lowercase()))
        } else {
            Err(InvalidRevisionIdError(value.to_string()))
        }
    }
}

impl FromStr for RevisionId {
    type Err = InvalidRevisionIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::try_from(s)
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for RevisionId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for RevisionId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::try_from(s.as_str()).map_err(serde::de::Error::custom)
    }
}
