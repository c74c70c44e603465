use revcompare_types::RevisionId;

use super::diff::process_diff;
use super::range::compute_range;
use super::resolver::resolve;
use crate::models::{ChangesetComparison, ComparisonRequest, ComparisonResult, Warning};
use crate::{CompareConfig, Error, Repository, Result};

/// Runs comparisons with a fixed configuration.
///
/// Holds no state between calls; each comparison is independent.
#[derive(Clone, Debug, Default)]
pub struct Comparator {
    config: CompareConfig,
}

/// The revision pair, and where to diff it, chosen from the range outcome.
struct DiffPlan<'a> {
    repo: &'a Repository,
    peer: Option<&'a Repository>,
    from: RevisionId,
    to: RevisionId,
}

impl Comparator {
    pub fn new(config: CompareConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CompareConfig {
        &self.config
    }

    /// Resolves both references and computes the changesets between them,
    /// without producing a diff.
    pub fn compare_changesets(&self, request: &ComparisonRequest) -> Result<ChangesetComparison> {
        let org = &request.org_repo;
        let other = &request.other_repo;
        if org.kind() != other.kind() {
            return Err(Error::BackendMismatch {
                org: org.name().to_string(),
                org_kind: org.kind(),
                other: other.name().to_string(),
                other_kind: other.kind(),
            });
        }

        let org_rev = resolve(&request.org_ref, org)?;
        let other_rev = resolve(&request.other_ref, other)?;
        log::info!(
            "comparing {}@{} ({}) with {}@{} ({}), merge={}",
            org.name(),
            request.org_ref,
            org_rev.short(),
            other.name(),
            request.other_ref,
            other_rev.short(),
            request.merge
        );

        let range = compute_range(org, &org_rev, other, &other_rev, request.merge)?;

        let mut warnings = Vec::new();
        if request.merge && range.ancestor.is_none() {
            log::error!(
                "no common ancestor determined for {} and {}, showing a raw diff",
                org_rev,
                other_rev
            );
            warnings.push(Warning::AncestorNotFound {
                org_rev: org_rev.clone(),
                other_rev: other_rev.clone(),
            });
        }

        Ok(ChangesetComparison {
            org_rev,
            other_rev,
            changesets: range.changesets,
            ancestor: range.ancestor,
            warnings,
        })
    }

    /// Full comparison: changesets plus a size-bounded diff.
    pub fn compare(&self, request: &ComparisonRequest) -> Result<ComparisonResult> {
        let comparison = self.compare_changesets(request)?;

        let plan = match &comparison.ancestor {
            // preview of what merging `other` would bring in
            Some(ancestor) => DiffPlan {
                repo: &request.other_repo,
                peer: None,
                from: ancestor.clone(),
                to: comparison.other_rev.clone(),
            },
            None => DiffPlan {
                repo: &request.org_repo,
                peer: (!request.org_repo.same_storage(&request.other_repo))
                    .then_some(&request.other_repo),
                from: comparison.org_rev.clone(),
                to: comparison.other_rev.clone(),
            },
        };
        log::debug!(
            "diffing {}..{} in {}",
            plan.from.short(),
            plan.to.short(),
            plan.repo.name()
        );

        let text = plan
            .repo
            .backend()
            .diff(
                plan.repo,
                plan.peer,
                &plan.from,
                &plan.to,
                self.config.context_lines,
            )
            .map_err(|e| {
                Error::comparison_failed(
                    plan.repo,
                    format!("diffing {}..{}", plan.from.short(), plan.to.short()),
                    e,
                )
            })?;

        let limit = if request.full_diff {
            None
        } else {
            self.config.diff_limit
        };
        let processed = process_diff(&text, limit);

        let (lines_added, lines_deleted) = processed
            .files
            .iter()
            .filter(|file| !file.stats.binary)
            .fold((0, 0), |(added, deleted), file| {
                (added + file.stats.added, deleted + file.stats.deleted)
            });

        Ok(ComparisonResult {
            org_rev: comparison.org_rev,
            other_rev: comparison.other_rev,
            changesets: comparison.changesets,
            ancestor: comparison.ancestor,
            files: processed.files,
            lines_added,
            lines_deleted,
            truncated: processed.truncated,
            warnings: comparison.warnings,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::path::Path;
    use std::sync::Arc;

    use super::*;
    use crate::Reference;
    use crate::models::FileOperation;
    use crate::services::backend::{GitBackend, HgBackend};
    use test_repo::{HgTestRepo, TestRepo};

    fn git(name: &str, t: &TestRepo) -> Repository {
        Repository::new(name, t.path(), Arc::new(GitBackend::new(Path::new("git"))))
    }

    fn hg(name: &str, t: &HgTestRepo) -> Repository {
        Repository::new(name, t.path(), Arc::new(HgBackend::new(Path::new("hg"))))
    }

    fn git_available() -> bool {
        std::process::Command::new("git")
            .arg("--version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    fn ids(result: &ComparisonResult) -> Vec<RevisionId> {
        result.changeset_ids()
    }

    #[test]
    fn identical_revisions() {
        let t = TestRepo::new().unwrap();
        t.write_file("a.txt", "a\n").unwrap();
        let a = t.commit("a").unwrap();
        let repo = git("repo", &t);
        let request = ComparisonRequest::new(
            repo.clone(),
            Reference::rev(a.as_str()),
            repo,
            Reference::rev(a.as_str()),
        );

        let result = Comparator::default().compare(&request).unwrap();
        assert!(result.changesets.is_empty());
        assert_eq!(result.ancestor, None);
        assert!(result.files.is_empty());
        assert!(result.warnings.is_empty());

        let result = Comparator::default().compare(&request.merge(true)).unwrap();
        assert!(result.changesets.is_empty());
        assert_eq!(result.ancestor, Some(a));
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn linear_history_in_one_repository() {
        if !git_available() {
            return;
        }
        let t = TestRepo::new().unwrap();
        t.write_file("f.txt", "1\n").unwrap();
        let a = t.commit("A").unwrap();
        t.write_file("f.txt", "2\n").unwrap();
        let b = t.commit("B").unwrap();
        t.write_file("f.txt", "3\n").unwrap();
        t.write_file("g.txt", "new\n").unwrap();
        let c = t.commit("C").unwrap();
        let repo = git("repo", &t);

        let request = ComparisonRequest::new(
            repo.clone(),
            Reference::rev(a.as_str()),
            repo,
            Reference::rev(c.as_str()),
        );
        let result = Comparator::default().compare(&request).unwrap();

        assert_eq!(ids(&result), vec![b, c]);
        assert_eq!(result.ancestor, None);
        assert_eq!(result.files.len(), 2);
        assert_eq!(result.lines_added, 2);
        assert_eq!(result.lines_deleted, 1);
        assert!(!result.truncated);
    }

    #[test]
    fn merge_in_one_git_repository_reports_undetermined_ancestor() {
        if !git_available() {
            return;
        }
        let t = TestRepo::new().unwrap();
        t.write_file("f.txt", "1\n").unwrap();
        let a = t.commit("A").unwrap();
        t.write_file("f.txt", "2\n").unwrap();
        let b = t.commit("B").unwrap();
        let repo = git("repo", &t);

        let request = ComparisonRequest::new(
            repo.clone(),
            Reference::rev(a.as_str()),
            repo,
            Reference::rev(b.as_str()),
        )
        .merge(true);
        let result = Comparator::default().compare(&request).unwrap();

        assert_eq!(ids(&result), vec![b.clone()]);
        assert_eq!(result.ancestor, None);
        assert_eq!(
            result.warnings,
            vec![Warning::AncestorNotFound {
                org_rev: a,
                other_rev: b,
            }]
        );
        // raw diff from org to other
        assert_eq!((result.lines_added, result.lines_deleted), (1, 1));
    }

    #[test]
    fn merge_preview_across_forks() {
        let org = TestRepo::new().unwrap();
        org.write_file("shared.txt", "base\n").unwrap();
        let x = org.commit("X").unwrap();
        let other = org.fork().unwrap();

        org.write_file("org_only.txt", "org\n").unwrap();
        org.commit("Y").unwrap();
        other.write_file("feature.txt", "feature\n").unwrap();
        let z = other.commit("Z").unwrap();

        let request = ComparisonRequest::new(
            git("org", &org),
            Reference::branch("HEAD"),
            git("other", &other),
            Reference::rev(z.as_str()),
        )
        .merge(true);
        let result = Comparator::default().compare(&request).unwrap();

        assert_eq!(ids(&result), vec![z]);
        assert_eq!(result.ancestor, Some(x));
        // the diff runs from the ancestor, so org-only changes do not show up
        assert_eq!(result.files.len(), 1);
        assert_eq!(result.files[0].path, "feature.txt");
        assert_eq!(result.files[0].operation, FileOperation::Added);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn unrelated_repositories_warn_about_missing_ancestor() {
        let org = TestRepo::new().unwrap();
        org.write_file("a.txt", "a\n").unwrap();
        let a = org.commit("a").unwrap();
        let other = TestRepo::new().unwrap();
        other.write_file("b.txt", "b\n").unwrap();
        let b = other.commit("b").unwrap();

        let request = ComparisonRequest::new(
            git("org", &org),
            Reference::rev(a.as_str()),
            git("other", &other),
            Reference::rev(b.as_str()),
        )
        .merge(true);
        let result = Comparator::default().compare(&request).unwrap();

        assert_eq!(result.ancestor, None);
        assert_eq!(
            result.warnings,
            vec![Warning::AncestorNotFound {
                org_rev: a,
                other_rev: b,
            }]
        );
        // raw two-sided diff
        let paths: Vec<_> = result.files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["a.txt", "b.txt"]);
    }

    #[test]
    fn binary_files_excluded_from_totals() {
        if !git_available() {
            return;
        }
        let t = TestRepo::new().unwrap();
        t.write_file("text.txt", "one\n").unwrap();
        let a = t.commit("A").unwrap();
        t.write_file("text.txt", "one\ntwo\n").unwrap();
        t.write_bytes("image.bin", &[0u8, 159, 146, 150, 0, 1, 2, 3])
            .unwrap();
        let b = t.commit("B").unwrap();
        let repo = git("repo", &t);

        let request = ComparisonRequest::new(
            repo.clone(),
            Reference::rev(a.as_str()),
            repo,
            Reference::rev(b.as_str()),
        );
        let result = Comparator::default().compare(&request).unwrap();

        let binary = result.files.iter().find(|f| f.path == "image.bin").unwrap();
        assert!(binary.stats.binary);
        assert_eq!((binary.stats.added, binary.stats.deleted), (0, 0));
        assert_eq!(result.lines_added, 1);
        assert_eq!(result.lines_deleted, 0);
    }

    #[test]
    fn non_ascii_paths_are_decoded() {
        let t = TestRepo::new().unwrap();
        t.write_file("base.txt", "base\n").unwrap();
        let a = t.commit("A").unwrap();
        t.write_bytes("bild-ü.bin", &[0u8, 159, 146, 150, 0, 1])
            .unwrap();
        t.write_bytes("müll.bin", &[0u8, 1, 2, 3, 0, 4]).unwrap();
        t.write_file("naïve.txt", "hello\n").unwrap();
        let b = t.commit("B").unwrap();
        let repo = git("repo", &t);

        let request = ComparisonRequest::new(
            repo.clone(),
            Reference::rev(a.as_str()),
            repo,
            Reference::rev(b.as_str()),
        );
        let result = Comparator::default().compare(&request).unwrap();

        let mut paths: Vec<_> = result.files.iter().map(|f| f.path.as_str()).collect();
        paths.sort();
        assert_eq!(paths, vec!["bild-ü.bin", "müll.bin", "naïve.txt"]);
        for file in &result.files {
            assert_eq!(file.id, crate::services::diff::file_id(&file.path));
            assert_eq!(file.operation, FileOperation::Added);
        }
    }

    #[test]
    fn diff_limit_truncates_unless_full_diff() {
        if !git_available() {
            return;
        }
        let t = TestRepo::new().unwrap();
        t.write_file("seed.txt", "seed\n").unwrap();
        let a = t.commit("A").unwrap();
        for i in 0..20 {
            let content: String = (0..2500).map(|j| format!("line {i} {j}\n")).collect();
            t.write_file(&format!("file{i:02}.txt"), &content).unwrap();
        }
        let b = t.commit("B").unwrap();
        let repo = git("repo", &t);

        let request = ComparisonRequest::new(
            repo.clone(),
            Reference::rev(a.as_str()),
            repo,
            Reference::rev(b.as_str()),
        );
        let comparator = Comparator::new(CompareConfig {
            diff_limit: Some(10_000),
            ..CompareConfig::default()
        });

        let limited = comparator.compare(&request).unwrap();
        assert!(limited.truncated);
        assert!(limited.files.len() < 20);

        let full = comparator.compare(&request.clone().full_diff(true)).unwrap();
        assert!(!full.truncated);
        assert_eq!(full.files.len(), 20);
        assert_eq!(full.lines_added, 50_000);
    }

    #[test]
    fn empty_repository_is_reported() {
        let t = TestRepo::new().unwrap();
        let repo = git("repo", &t);
        let request = ComparisonRequest::new(
            repo.clone(),
            Reference::branch("main"),
            repo,
            Reference::branch("main"),
        );

        let err = Comparator::default().compare(&request).unwrap_err();
        assert!(err.is_empty_repository());
    }

    #[test]
    fn mixed_backends_fail_before_resolution() {
        let git_repo = TestRepo::new().unwrap();
        let request = ComparisonRequest::new(
            git("git-repo", &git_repo),
            Reference::branch("main"),
            Repository::new(
                "hg-repo",
                git_repo.path(),
                Arc::new(HgBackend::new(Path::new("hg"))),
            ),
            Reference::branch("default"),
        );

        let err = Comparator::default().compare(&request).unwrap_err();
        assert!(matches!(err, Error::BackendMismatch { .. }));
    }

    #[test]
    fn swapped_request_reverses_direction() {
        if !git_available() {
            return;
        }
        let t = TestRepo::new().unwrap();
        t.write_file("f.txt", "1\n").unwrap();
        let a = t.commit("A").unwrap();
        t.write_file("f.txt", "2\n").unwrap();
        let b = t.commit("B").unwrap();
        let repo = git("repo", &t);
        let request = ComparisonRequest::new(
            repo.clone(),
            Reference::rev(a.as_str()),
            repo,
            Reference::rev(b.as_str()),
        );

        let forward = Comparator::default().compare(&request).unwrap();
        let backward = Comparator::default().compare(&request.swapped()).unwrap();

        assert_eq!(ids(&forward), vec![b]);
        assert!(backward.changesets.is_empty());
        assert_eq!(forward.lines_added, backward.lines_deleted);
        assert_eq!(forward.lines_deleted, backward.lines_added);
    }

    #[test]
    fn comparison_is_deterministic() {
        if !git_available() {
            return;
        }
        let t = TestRepo::new().unwrap();
        t.write_file("f.txt", "1\n").unwrap();
        let a = t.commit("A").unwrap();
        t.write_file("f.txt", "2\n").unwrap();
        t.write_file("g.txt", "g\n").unwrap();
        let b = t.commit("B").unwrap();
        let repo = git("repo", &t);
        let request = ComparisonRequest::new(
            repo.clone(),
            Reference::rev(a.as_str()),
            repo,
            Reference::rev(b.as_str()),
        );

        let first = Comparator::default().compare(&request).unwrap();
        let second = Comparator::default().compare(&request).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn hg_merge_preview_across_forks() {
        if HgTestRepo::skip("hg_merge_preview_across_forks") {
            return;
        }
        let org = HgTestRepo::new().unwrap();
        org.write_file("shared.txt", "base\n").unwrap();
        let x = org.commit("X").unwrap();
        let other = org.fork().unwrap();

        org.write_file("org_only.txt", "org\n").unwrap();
        org.commit("Y").unwrap();
        other.write_file("feature.txt", "feature\n").unwrap();
        let z = other.commit("Z").unwrap();
        other.bookmark("feature", &z).unwrap();

        let request = ComparisonRequest::new(
            hg("org", &org),
            Reference::branch("default"),
            hg("other", &other),
            Reference::bookmark("feature"),
        )
        .merge(true);
        let result = Comparator::default().compare(&request).unwrap();

        assert_eq!(ids(&result), vec![z]);
        assert_eq!(result.ancestor, Some(x));
        assert_eq!(result.files.len(), 1);
        assert_eq!(result.files[0].path, "feature.txt");
        assert_eq!(result.lines_added, 1);
    }

    #[test]
    fn hg_linear_range_across_forks() {
        if HgTestRepo::skip("hg_linear_range_across_forks") {
            return;
        }
        let org = HgTestRepo::new().unwrap();
        org.write_file("f.txt", "1\n").unwrap();
        let a = org.commit("A").unwrap();
        let other = org.fork().unwrap();
        other.write_file("f.txt", "2\n").unwrap();
        let b = other.commit("B").unwrap();
        other.write_file("f.txt", "3\n").unwrap();
        let c = other.commit("C").unwrap();

        let request = ComparisonRequest::new(
            hg("org", &org),
            Reference::rev(a.as_str()),
            hg("other", &other),
            Reference::rev(c.as_str()),
        );
        let result = Comparator::default().compare(&request).unwrap();

        assert_eq!(ids(&result), vec![b, c]);
        assert_eq!(result.ancestor, None);
        assert_eq!(result.files.len(), 1);
        assert_eq!((result.lines_added, result.lines_deleted), (1, 1));
    }
}
