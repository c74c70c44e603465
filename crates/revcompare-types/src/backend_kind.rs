use std::str::FromStr;

#[derive(Debug, thiserror::Error)]
#[error("Unsupported backend {0:?}: only hg and git are allowed")]
pub struct UnsupportedBackendError(pub String);

/// The version-control system a repository is stored in.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum BackendKind {
    Hg,
    Git,
}

impl BackendKind {
    pub fn alias(self) -> &'static str {
        match self {
            BackendKind::Hg => "hg",
            BackendKind::Git => "git",
        }
    }
}

impl std::fmt::Display for BackendKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.alias())
    }
}

impl FromStr for BackendKind {
    type Err = UnsupportedBackendError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hg" => Ok(BackendKind::Hg),
            "git" => Ok(BackendKind::Git),
            other => Err(UnsupportedBackendError(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_known_aliases() {
        assert_eq!("hg".parse::<BackendKind>().unwrap(), BackendKind::Hg);
        assert_eq!("git".parse::<BackendKind>().unwrap(), BackendKind::Git);
    }

    #[test]
    fn rejects_other_aliases() {
        let err = "svn".parse::<BackendKind>().unwrap_err();
        assert_eq!(err.0, "svn");
    }
}
