use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
pub enum InvalidReferenceError {
    #[error("Reference {0:?} must have the form <kind>:<value>")]
    MissingKind(String),
    #[error("Unknown reference kind {0:?}")]
    UnknownKind(String),
    #[error("Reference value must not be empty")]
    EmptyValue,
}

/// What a reference value names.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum RefKind {
    Branch,
    Bookmark,
    Tag,
    Rev,
}

impl RefKind {
    pub fn as_str(self) -> &'static str {
        match self {
            RefKind::Branch => "branch",
            RefKind::Bookmark => "book",
            RefKind::Tag => "tag",
            RefKind::Rev => "rev",
        }
    }
}

impl FromStr for RefKind {
    type Err = InvalidReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "branch" => Ok(RefKind::Branch),
            "book" | "bookmark" => Ok(RefKind::Bookmark),
            "tag" => Ok(RefKind::Tag),
            "rev" => Ok(RefKind::Rev),
            other => Err(InvalidReferenceError::UnknownKind(other.to_string())),
        }
    }
}

/// A caller-supplied `(kind, value)` pair naming a revision.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Reference {
    kind: RefKind,
    value: String,
}

impl Reference {
    pub fn new(kind: RefKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    pub fn branch(name: impl Into<String>) -> Self {
        Self::new(RefKind::Branch, name)
    }

    pub fn bookmark(name: impl Into<String>) -> Self {
        Self::new(RefKind::Bookmark, name)
    }

    pub fn tag(name: impl Into<String>) -> Self {
        Self::new(RefKind::Tag, name)
    }

    pub fn rev(id: impl Into<String>) -> Self {
        Self::new(RefKind::Rev, id)
    }

    pub fn kind(&self) -> RefKind {
        self.kind
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

impl std::fmt::Display for Reference {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind.as_str(), self.value)
    }
}

impl FromStr for Reference {
    type Err = InvalidReferenceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (kind, value) = s
            .split_once(':')
            .ok_or_else(|| InvalidReferenceError::MissingKind(s.to_string()))?;
        if value.is_empty() {
            return Err(InvalidReferenceError::EmptyValue);
        }
        Ok(Self::new(kind.parse()?, value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_kind_and_value() {
        let reference: Reference = "branch:default".parse().unwrap();
        assert_eq!(reference.kind(), RefKind::Branch);
        assert_eq!(reference.value(), "default");
    }

    #[test]
    fn value_may_contain_colons() {
        let reference: Reference = "tag:release:1.0".parse().unwrap();
        assert_eq!(reference, Reference::tag("release:1.0"));
    }

    #[test]
    fn bookmark_has_two_spellings() {
        let short: Reference = "book:feature".parse().unwrap();
        let long: Reference = "bookmark:feature".parse().unwrap();
        assert_eq!(short, long);
        assert_eq!(short.to_string(), "book:feature");
    }

    #[test]
    fn rejects_malformed_references() {
        assert!(matches!(
            "main".parse::<Reference>(),
            Err(InvalidReferenceError::MissingKind(_))
        ));
        assert!(matches!(
            "head:main".parse::<Reference>(),
            Err(InvalidReferenceError::UnknownKind(_))
        ));
        assert!(matches!(
            "rev:".parse::<Reference>(),
            Err(InvalidReferenceError::EmptyValue)
        ));
    }
}
