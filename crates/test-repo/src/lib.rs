use std::{
    ffi::OsStr,
    path::{Path, PathBuf},
    process::Command,
};

use git2::{IndexAddOption, Repository, build::CheckoutBuilder};
use revcompare_types::RevisionId;
use tempfile::TempDir;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Git error: {0}")]
    Git(#[from] git2::Error),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("hg error: {0}")]
    Hg(String),
    #[error("Invalid revision id: {0}")]
    Revision(#[from] revcompare_types::InvalidRevisionIdError),
}

type Result<T> = std::result::Result<T, Error>;

/// Temporary git repository driven through git2.
pub struct TestRepo {
    pub repo: Repository,
    root: PathBuf,
    _dir: TempDir,
}

impl TestRepo {
    pub fn new() -> Result<Self> {
        let dir = TempDir::new()?;
        let root = dir.path().join("repo");
        let repo = Repository::init(&root)?;
        Ok(Self {
            repo,
            root,
            _dir: dir,
        })
    }

    /// Clones this repository into a fresh temporary directory, like a fork.
    pub fn fork(&self) -> Result<Self> {
        let dir = TempDir::new()?;
        let root = dir.path().join("repo");
        let source = self.root.to_string_lossy().into_owned();
        let repo = Repository::clone(&source, &root)?;
        Ok(Self {
            repo,
            root,
            _dir: dir,
        })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn write_file(&self, path: &str, content: &str) -> Result<()> {
        self.write_bytes(path, content.as_bytes())
    }

    pub fn write_bytes(&self, path: &str, content: &[u8]) -> Result<()> {
        let file_path = self.root.join(path);
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&file_path, content)?;
        Ok(())
    }

    pub fn delete_file(&self, path: &str) -> Result<()> {
        std::fs::remove_file(self.root.join(path))?;
        Ok(())
    }

    pub fn rename_file(&self, old_path: &str, new_path: &str) -> Result<()> {
        let new_file_path = self.root.join(new_path);
        if let Some(parent) = new_file_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::rename(self.root.join(old_path), &new_file_path)?;
        Ok(())
    }

    /// Stages every change in the working tree and commits it on HEAD.
    pub fn commit(&self, message: &str) -> Result<RevisionId> {
        let mut index = self.repo.index()?;
        index.add_all(["*"].iter(), IndexAddOption::DEFAULT, None)?;
        index.update_all(["*"].iter(), None)?;
        index.write()?;

        let tree_id = index.write_tree()?;
        let tree = self.repo.find_tree(tree_id)?;

        let sig = git2::Signature::now("Test", "test@test.com")?;
        let parent = self.repo.head().ok().and_then(|h| h.peel_to_commit().ok());
        let parents: Vec<&git2::Commit> = parent.iter().collect();

        let oid = self
            .repo
            .commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)?;
        Ok(RevisionId::from(oid))
    }

    pub fn create_branch(&self, name: &str, at: &RevisionId) -> Result<()> {
        let commit = self.repo.find_commit(at.oid()?)?;
        self.repo.branch(name, &commit, false)?;
        Ok(())
    }

    /// Points HEAD at `branch` and forces the working tree to match it.
    pub fn checkout(&self, branch: &str) -> Result<()> {
        self.repo.set_head(&format!("refs/heads/{branch}"))?;
        self.repo
            .checkout_head(Some(CheckoutBuilder::new().force().remove_untracked(true)))?;
        Ok(())
    }

    pub fn tag(&self, name: &str, at: &RevisionId) -> Result<()> {
        let object = self.repo.find_object(at.oid()?, None)?;
        self.repo.tag_lightweight(name, &object, false)?;
        Ok(())
    }

    pub fn current_branch(&self) -> Result<String> {
        let head = self.repo.head()?;
        Ok(head.shorthand().unwrap_or("HEAD").to_string())
    }
}

/// Temporary Mercurial repository driven through the `hg` executable.
pub struct HgTestRepo {
    root: PathBuf,
    _dir: TempDir,
}

impl HgTestRepo {
    /// Whether an `hg` executable is on PATH; hg-backed tests skip themselves otherwise.
    pub fn is_available() -> bool {
        Command::new("hg")
            .arg("--version")
            .env("HGPLAIN", "1")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    /// True when `hg` is missing, after reporting on stderr that `test` is skipped.
    pub fn skip(test: &str) -> bool {
        let missing = !Self::is_available();
        if missing {
            eprintln!("skipping {test}: no hg executable on PATH");
        }
        missing
    }

    pub fn new() -> Result<Self> {
        let dir = TempDir::new()?;
        let root = dir.path().join("repo");
        HgCommandBuilder::new(dir.path())
            .args([OsStr::new("init"), root.as_os_str()])
            .run()?;
        Ok(Self { root, _dir: dir })
    }

    pub fn fork(&self) -> Result<Self> {
        let dir = TempDir::new()?;
        let root = dir.path().join("repo");
        HgCommandBuilder::new(dir.path())
            .args([OsStr::new("clone"), self.root.as_os_str(), root.as_os_str()])
            .run()?;
        Ok(Self { root, _dir: dir })
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    pub fn write_file(&self, path: &str, content: &str) -> Result<()> {
        let file_path = self.root.join(path);
        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&file_path, content)?;
        Ok(())
    }

    /// Commits every working-directory change (including adds and removes).
    pub fn commit(&self, message: &str) -> Result<RevisionId> {
        self.hg().args(["commit", "-A", "-m", message]).run()?;
        self.current()
    }

    pub fn current(&self) -> Result<RevisionId> {
        let output = self.hg().args(["log", "-r", ".", "-T", "{node}"]).run()?;
        let node = String::from_utf8_lossy(&output);
        Ok(RevisionId::try_from(node.trim())?)
    }

    /// Sets the branch name recorded by the next commit.
    pub fn branch(&self, name: &str) -> Result<()> {
        self.hg().args(["branch", "--force", name]).run()?;
        Ok(())
    }

    pub fn bookmark(&self, name: &str, at: &RevisionId) -> Result<()> {
        self.hg()
            .args(["bookmark", "--force", "-r", at.as_str(), name])
            .run()?;
        Ok(())
    }

    /// Tags `at`; this creates a new changeset that records the tag.
    pub fn tag(&self, name: &str, at: &RevisionId) -> Result<RevisionId> {
        let message = format!("tag {name}");
        self.hg()
            .args(["tag", "-r", at.as_str(), "-m", message.as_str(), name])
            .run()?;
        self.current()
    }

    pub fn update(&self, rev: &RevisionId) -> Result<()> {
        self.hg().args(["update", "--clean", "-r", rev.as_str()]).run()?;
        Ok(())
    }

    fn hg(&self) -> HgCommandBuilder {
        HgCommandBuilder::new(&self.root)
    }
}

struct HgCommandBuilder {
    command: Command,
}

impl HgCommandBuilder {
    fn new(dir: &Path) -> Self {
        let mut command = Command::new("hg");
        command
            .current_dir(dir)
            .env("HGPLAIN", "1")
            .env("HGUSER", "Test <test@test.com>");
        Self { command }
    }

    fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.command.args(args);
        self
    }

    fn run(mut self) -> Result<Vec<u8>> {
        let output = self.command.output()?;
        if output.status.success() {
            Ok(output.stdout)
        } else {
            Err(Error::Hg(
                String::from_utf8_lossy(&output.stderr).to_string(),
            ))
        }
    }
}
