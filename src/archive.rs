//! The archive manager: drives build jobs over a revision list.
//!
//! Revisions are processed strictly in order, one at a time, since they all
//! share the source work tree and the build directory. For every revision
//! the manager either skips it (already in the archive) or hands it to a
//! [`BuildJob`]. A failing revision never stops the run; its outcome is
//! recorded in the [`RunReport`] and the next revision starts.
//!
//! Whatever happens, the source repository is put back on the ref it had
//! when the run started. Restoration is tied to a guard value, so it also
//! runs when the loop is left early by an error or a panic.

use std::fmt;

use crate::config::ArchiveConfig;
use crate::error::{BisectError, Result};
use crate::job::{BuildJob, short};
use crate::logging::Logger;
use crate::vcs::{ArchiveRepo, HeadRef, SourceRepo};


/// How a single revision ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// Built and committed to the archive.
    Archived,
    /// A `build_<revision>` commit already existed; nothing was done.
    AlreadyArchived,
    /// The revision could not be checked out.
    CheckoutFailed,
    /// The configure command exited non-zero.
    ConfigureFailed,
    /// The build command exited non-zero.
    BuildFailed,
    /// The build succeeded but no archive commit was written.
    CommitFailed,
}

impl Outcome {
    pub fn is_archived(self) -> bool {
        self == Outcome::Archived
    }

    /// True for outcomes where the revision was attempted and did not make
    /// it into the archive.
    pub fn is_failure(self) -> bool {
        !matches!(self, Outcome::Archived | Outcome::AlreadyArchived)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Outcome::Archived => "archived",
            Outcome::AlreadyArchived => "already archived",
            Outcome::CheckoutFailed => "checkout failed",
            Outcome::ConfigureFailed => "configure failed",
            Outcome::BuildFailed => "build failed",
            Outcome::CommitFailed => "commit failed",
        })
    }
}

/// Outcome of one revision plus the soft failures seen on the way.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RevisionReport {
    revision: String,
    outcome: Outcome,
    warnings: Vec<String>,
}

impl RevisionReport {
    pub(crate) fn new(revision: String, outcome: Outcome, warnings: Vec<String>) -> Self {
        Self {
            revision,
            outcome,
            warnings,
        }
    }

    pub fn revision(&self) -> &str {
        &self.revision
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }
}

/// Per-revision results of a run, in processing order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RunReport {
    revisions: Vec<RevisionReport>,
    restore_error: Option<String>,
}

impl RunReport {
    pub fn revisions(&self) -> &[RevisionReport] {
        &self.revisions
    }

    pub fn outcomes(&self) -> Vec<Outcome> {
        self.revisions.iter().map(RevisionReport::outcome).collect()
    }

    pub fn count(&self, outcome: Outcome) -> usize {
        self.revisions
            .iter()
            .filter(|r| r.outcome == outcome)
            .count()
    }

    pub fn failures(&self) -> usize {
        self.revisions
            .iter()
            .filter(|r| r.outcome.is_failure())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.revisions.is_empty()
    }

    /// Set when the source repository could not be put back on its
    /// original ref after the loop. The work tree is left on the last
    /// revision processed.
    pub fn restore_error(&self) -> Option<&str> {
        self.restore_error.as_deref()
    }

    fn push(&mut self, report: RevisionReport) {
        self.revisions.push(report);
    }
}

/// Whether the archive is created by this run or appended to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArchiveMode {
    /// Create a new archive; the destination must not exist.
    Fresh,
    /// Append to the archive, creating it if absent.
    Incremental,
}

/// Drives the per-revision pipeline for one run.
pub struct Archiver<'a> {
    source: &'a SourceRepo,
    config: &'a ArchiveConfig,
    log: Logger,
}

impl<'a> Archiver<'a> {
    pub fn new(source: &'a SourceRepo, config: &'a ArchiveConfig, log: Logger) -> Self {
        Self {
            source,
            config,
            log,
        }
    }

    pub fn run(&self, mode: ArchiveMode, revisions: &[String]) -> Result<RunReport> {
        match mode {
            ArchiveMode::Fresh => self.run_fresh(revisions),
            ArchiveMode::Incremental => self.run_incremental(revisions),
        }
    }

    /// Creates the archive, then archives every revision.
    ///
    /// # Errors
    ///
    /// [`BisectError::AlreadyExists`] if the destination exists; nothing in
    /// the source repository is touched in that case.
    pub fn run_fresh(&self, revisions: &[String]) -> Result<RunReport> {
        let archive = ArchiveRepo::init(self.config.destination())?;
        self.log.verbose(
            1,
            format!("Created archive at {}", self.config.destination().display()),
        );
        self.archive_into(&archive, revisions)
    }

    /// Archives every revision not yet present in the archive.
    ///
    /// # Errors
    ///
    /// [`BisectError::ArchiveIsSource`] if the destination is the source
    /// repository itself.
    pub fn run_incremental(&self, revisions: &[String]) -> Result<RunReport> {
        let destination = self.config.destination();
        let archive = ArchiveRepo::open_or_init(destination)?;
        if archive.is_same_repository(self.source) {
            return Err(BisectError::ArchiveIsSource(destination.to_path_buf()));
        }
        self.archive_into(&archive, revisions)
    }

    fn archive_into(&self, archive: &ArchiveRepo, revisions: &[String]) -> Result<RunReport> {
        let original = self.source.current_ref()?;
        self.log
            .verbose(1, format!("Source repository is on {original}"));

        match self.source.is_dirty() {
            Ok(true) => self.log.warn(
                "the source work tree has uncommitted changes; checkouts may fail or build them",
            ),
            Ok(false) => {}
            Err(e) => self
                .log
                .warn(format!("could not check the source work tree: {}", e.chain())),
        }

        let build_dir = self.config.build_dir();
        std::fs::create_dir_all(build_dir).map_err(|source| BisectError::IoError {
            path: build_dir.to_path_buf(),
            source,
        })?;

        let guard = RestoreGuard::new(self.source, original, self.log);
        let mut archived = archive.archived_revisions()?;
        let mut report = RunReport::default();
        let total = revisions.len();

        for (index, revision) in revisions.iter().enumerate() {
            let position = format!("[{}/{total}]", index + 1);

            if archived.contains(revision) {
                self.log.verbose(
                    1,
                    format!("{position} {} already archived", short(revision)),
                );
                report.push(RevisionReport::new(
                    revision.clone(),
                    Outcome::AlreadyArchived,
                    Vec::new(),
                ));
                continue;
            }

            self.log
                .info(format!("🔨 {position} building {}", short(revision)));
            let entry = BuildJob::new(revision, self.config, self.source, archive, self.log).run();

            if entry.outcome().is_archived() {
                archived.insert(revision.clone());
                self.log
                    .info(format!("📦 {position} archived {}", short(revision)));
            } else {
                self.log.warn(format!(
                    "{position} {}: {}, skipped",
                    short(revision),
                    entry.outcome()
                ));
            }
            report.push(entry);
        }

        // A failed restore is reported alongside the outcomes.
        if let Err(e) = guard.restore() {
            let message = e.chain();
            self.log.error(&message);
            report.restore_error = Some(message);
        }
        Ok(report)
    }
}

/// Returns the source repository to its original ref when dropped.
struct RestoreGuard<'a> {
    source: &'a SourceRepo,
    original: Option<HeadRef>,
    log: Logger,
}

impl<'a> RestoreGuard<'a> {
    fn new(source: &'a SourceRepo, original: HeadRef, log: Logger) -> Self {
        Self {
            source,
            original: Some(original),
            log,
        }
    }

    /// Restores now, reporting failure to the caller.
    fn restore(mut self) -> Result<()> {
        if let Some(original) = self.original.take() {
            self.source.restore(&original)?;
            self.log
                .verbose(1, format!("Restored source repository to {original}"));
        }
        Ok(())
    }
}

impl Drop for RestoreGuard<'_> {
    fn drop(&mut self) {
        if let Some(original) = self.original.take()
            && let Err(e) = self.source.restore(&original)
        {
            self.log.error(e.chain());
        }
    }
}
