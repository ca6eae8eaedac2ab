//! Git access for the source and archive repositories.
//!
//! [`SourceRepo`] is the repository whose history is being built; it is only
//! ever moved between revisions and back. [`ArchiveRepo`] is the append-only
//! repository receiving one commit per archived revision, with the subject
//! line `build_<revision>`.

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use git2::build::CheckoutBuilder;
use git2::{
    Commit, ErrorCode, Oid, Reference, Repository, Signature, Sort, StatusOptions,
};

use crate::error::{BisectError, Result};

/// Subject prefix of every archive commit.
pub const MESSAGE_PREFIX: &str = "build_";

const FALLBACK_NAME: &str = "git-bibisect";
const FALLBACK_EMAIL: &str = "git-bibisect@localhost";

/// Builds the archive commit message for `revision`.
///
/// The subject is exactly `build_<revision>`; the source commit summary, when
/// known, goes in the body.
pub fn archive_message(revision: &str, summary: Option<&str>) -> String {
    match summary {
        Some(summary) if !summary.trim().is_empty() => {
            format!("{MESSAGE_PREFIX}{revision}\n\n{}\n", summary.trim())
        }
        _ => format!("{MESSAGE_PREFIX}{revision}\n"),
    }
}

/// Extracts the archived revision from a commit message, if its subject has
/// the archive form.
pub fn archived_revision(message: &str) -> Option<&str> {
    let subject = message.lines().next()?.trim_end();
    let revision = subject.strip_prefix(MESSAGE_PREFIX)?;
    if revision.is_empty() || revision.contains(char::is_whitespace) {
        return None;
    }
    Some(revision)
}

/// The ref HEAD pointed at when it was recorded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HeadRef {
    /// HEAD was attached to a local branch.
    Branch {
        /// Short branch name, e.g. `main`
        name: String,
        /// Full reference name, e.g. `refs/heads/main`
        refname: String,
    },
    /// HEAD was detached at a commit.
    Detached(Oid),
}

impl fmt::Display for HeadRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HeadRef::Branch { name, .. } => f.write_str(name),
            HeadRef::Detached(oid) => write!(f, "{oid}"),
        }
    }
}

/// The repository whose revisions are built.
pub struct SourceRepo {
    repo: Repository,
    workdir: PathBuf,
}

impl SourceRepo {
    /// Opens the repository containing `path`, searching upward.
    ///
    /// # Errors
    ///
    /// [`BisectError::RepoNotFound`] if there is no repository or it is bare.
    pub fn discover(path: &Path) -> Result<Self> {
        let repo = Repository::discover(path)
            .map_err(|_| BisectError::RepoNotFound(path.to_path_buf()))?;
        let workdir = repo
            .workdir()
            .ok_or_else(|| BisectError::RepoNotFound(path.to_path_buf()))?
            .to_path_buf();
        Ok(Self { repo, workdir })
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Lists revisions oldest-first.
    ///
    /// Without a range every commit reachable from HEAD is listed. An
    /// `A..B` expression lists the commits reachable from `B` but not `A`;
    /// any other expression is resolved to one commit whose full ancestry is
    /// listed.
    pub fn list_revisions(&self, range: Option<&str>) -> Result<Vec<String>> {
        let mut walk = self.repo.revwalk()?;
        walk.set_sorting(Sort::TOPOLOGICAL | Sort::REVERSE)?;

        let invalid = |range: &str, source| BisectError::InvalidRange {
            range: range.to_string(),
            source,
        };

        match range.map(str::trim).filter(|r| !r.is_empty()) {
            None => walk
                .push_head()
                .map_err(|e| BisectError::VcsQuery(e.message().to_string()))?,
            Some(expr) if expr.contains("..") => {
                walk.push_range(expr).map_err(|e| invalid(expr, e))?
            }
            Some(expr) => {
                let commit = self
                    .repo
                    .revparse_single(expr)
                    .and_then(|object| object.peel_to_commit())
                    .map_err(|e| invalid(expr, e))?;
                walk.push(commit.id())?;
            }
        }

        walk.map(|oid| oid.map(|oid| oid.to_string()).map_err(BisectError::from))
            .collect()
    }

    /// The branch HEAD is attached to, or the detached commit.
    pub fn current_ref(&self) -> Result<HeadRef> {
        let head = self
            .repo
            .head()
            .map_err(|e| BisectError::VcsQuery(e.message().to_string()))?;

        if head.is_branch()
            && let (Some(name), Some(refname)) = (head.shorthand(), head.name())
        {
            return Ok(HeadRef::Branch {
                name: name.to_string(),
                refname: refname.to_string(),
            });
        }

        head.target()
            .map(HeadRef::Detached)
            .ok_or_else(|| BisectError::VcsQuery("HEAD does not point at a commit".to_string()))
    }

    /// Whether tracked files differ from HEAD in the index or work tree.
    ///
    /// Untracked and ignored files are not considered.
    pub fn is_dirty(&self) -> Result<bool> {
        let mut options = StatusOptions::new();
        options
            .include_untracked(false)
            .include_ignored(false)
            .exclude_submodules(true);
        let statuses = self.repo.statuses(Some(&mut options))?;
        Ok(!statuses.is_empty())
    }

    /// Checks out `revision` with a detached HEAD.
    ///
    /// The checkout is safe: local modifications that would be overwritten
    /// make it fail instead of being discarded.
    pub fn checkout(&self, revision: &str) -> Result<()> {
        let commit = self.repo.revparse_single(revision)?.peel_to_commit()?;
        self.checkout_commit(&commit)?;
        self.repo.set_head_detached(commit.id())?;
        Ok(())
    }

    /// Moves HEAD back to a previously recorded ref.
    pub fn restore(&self, original: &HeadRef) -> Result<()> {
        let restore_error = |source| BisectError::Restore {
            reference: original.to_string(),
            source,
        };

        match original {
            HeadRef::Branch { refname, .. } => {
                let reference = self.repo.find_reference(refname).map_err(restore_error)?;
                let commit = reference.peel_to_commit().map_err(restore_error)?;
                self.checkout_commit(&commit).map_err(restore_error)?;
                self.repo.set_head(refname).map_err(restore_error)?;
            }
            HeadRef::Detached(oid) => {
                let commit = self.repo.find_commit(*oid).map_err(restore_error)?;
                self.checkout_commit(&commit).map_err(restore_error)?;
                self.repo.set_head_detached(*oid).map_err(restore_error)?;
            }
        }
        Ok(())
    }

    /// Summary line of the commit `revision` names.
    pub fn summary(&self, revision: &str) -> Option<String> {
        let commit = self.repo.revparse_single(revision).ok()?.peel_to_commit().ok()?;
        commit.summary().map(str::to_string)
    }

    fn checkout_commit(&self, commit: &Commit<'_>) -> std::result::Result<(), git2::Error> {
        let mut checkout = CheckoutBuilder::new();
        checkout.safe();
        self.repo.checkout_tree(commit.as_object(), Some(&mut checkout))
    }
}

/// The append-only repository holding archived artifacts.
pub struct ArchiveRepo {
    repo: Repository,
    root: PathBuf,
}

impl ArchiveRepo {
    /// Creates `path` and initializes an empty archive in it.
    ///
    /// # Errors
    ///
    /// [`BisectError::AlreadyExists`] if anything exists at `path`.
    pub fn init(path: &Path) -> Result<Self> {
        if path.exists() {
            return Err(BisectError::AlreadyExists(path.to_path_buf()));
        }
        std::fs::create_dir_all(path).map_err(|source| BisectError::IoError {
            path: path.to_path_buf(),
            source,
        })?;
        let repo = Repository::init(path)?;
        Ok(Self {
            repo,
            root: path.to_path_buf(),
        })
    }

    /// Opens the archive at `path`, initializing it if `path` is absent.
    pub fn open_or_init(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Self::init(path);
        }
        let repo =
            Repository::open(path).map_err(|_| BisectError::NotAnArchive(path.to_path_buf()))?;
        if repo.is_bare() {
            return Err(BisectError::NotAnArchive(path.to_path_buf()));
        }
        Ok(Self {
            repo,
            root: path.to_path_buf(),
        })
    }

    /// Whether this archive and `source` are the same repository, either by
    /// work tree or by git directory.
    pub fn is_same_repository(&self, source: &SourceRepo) -> bool {
        let canonical =
            |path: &Path| std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());

        let same_workdir = self
            .repo
            .workdir()
            .is_some_and(|workdir| canonical(workdir) == canonical(source.workdir()));
        same_workdir || canonical(self.repo.path()) == canonical(source.repo.path())
    }

    /// Directory artifacts are moved into.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Adds `name` (relative to the archive root) to the index.
    pub fn stage(&self, name: &Path) -> Result<()> {
        let mut index = self.repo.index()?;
        index.add_path(name)?;
        index.write()?;
        Ok(())
    }

    /// Removes `name` from the archive work tree and index.
    pub fn discard(&self, name: &Path) -> Result<()> {
        let path = self.root.join(name);
        if path.exists() {
            std::fs::remove_file(&path)
                .map_err(|source| BisectError::IoError { path, source })?;
        }
        let mut index = self.repo.index()?;
        index.remove_path(name)?;
        index.write()?;
        Ok(())
    }

    /// Commits the current index on top of HEAD.
    pub fn commit(&self, message: &str) -> Result<Oid> {
        let signature = self
            .repo
            .signature()
            .or_else(|_| Signature::now(FALLBACK_NAME, FALLBACK_EMAIL))?;

        let mut index = self.repo.index()?;
        let tree = self.repo.find_tree(index.write_tree()?)?;

        let parent = match self.head()? {
            Some(head) => Some(head.peel_to_commit()?),
            None => None,
        };
        let parents: Vec<&Commit<'_>> = parent.iter().collect();

        let oid = self.repo.commit(
            Some("HEAD"),
            &signature,
            &signature,
            message,
            &tree,
            &parents,
        )?;
        Ok(oid)
    }

    /// Every revision recorded in the archive log.
    pub fn archived_revisions(&self) -> Result<HashSet<String>> {
        let mut revisions = HashSet::new();
        if self.head()?.is_none() {
            return Ok(revisions);
        }

        let mut walk = self.repo.revwalk()?;
        walk.push_head()?;
        for oid in walk {
            let commit = self.repo.find_commit(oid?)?;
            if let Some(revision) = commit.message().and_then(archived_revision) {
                revisions.insert(revision.to_string());
            }
        }
        Ok(revisions)
    }

    /// Whether a commit with subject exactly `build_<revision>` exists.
    pub fn contains_revision(&self, revision: &str) -> Result<bool> {
        Ok(self.archived_revisions()?.contains(revision))
    }

    fn head(&self) -> Result<Option<Reference<'_>>> {
        match self.repo.head() {
            Ok(head) => Ok(Some(head)),
            Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}
