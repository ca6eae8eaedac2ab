//! One revision's trip through the pipeline.
//!
//! ```text
//! checkout -> configure -> build -> execute (optional) -> commit
//!     |           |          |
//!     v           v          v
//! CheckoutFailed  ConfigureFailed  BuildFailed
//! ```
//!
//! A failing smoke command, a missing artifact or a failed stage is a
//! warning: the remaining artifacts are still archived. Only a commit that
//! cannot be written (or has nothing in it) keeps the revision out of the
//! archive.

use std::fs;
use std::io;
use std::path::Path;

use crate::archive::{Outcome, RevisionReport};
use crate::config::ArchiveConfig;
use crate::logging::Logger;
use crate::process::{self, CommandLine};
use crate::vcs::{ArchiveRepo, SourceRepo, archive_message};

/// Abbreviated revision for progress output.
pub(crate) fn short(revision: &str) -> &str {
    revision.get(..10).unwrap_or(revision)
}

/// Builds and archives a single revision. Holds no state across revisions.
pub struct BuildJob<'a> {
    revision: &'a str,
    config: &'a ArchiveConfig,
    source: &'a SourceRepo,
    archive: &'a ArchiveRepo,
    log: Logger,
    warnings: Vec<String>,
}

impl<'a> BuildJob<'a> {
    pub fn new(
        revision: &'a str,
        config: &'a ArchiveConfig,
        source: &'a SourceRepo,
        archive: &'a ArchiveRepo,
        log: Logger,
    ) -> Self {
        Self {
            revision,
            config,
            source,
            archive,
            log,
            warnings: Vec::new(),
        }
    }

    /// Runs every stage and reports how far the revision got.
    pub fn run(mut self) -> RevisionReport {
        if !self.checkout() {
            return self.finish(Outcome::CheckoutFailed);
        }
        if !self.configure() {
            return self.finish(Outcome::ConfigureFailed);
        }
        if !self.build() {
            return self.finish(Outcome::BuildFailed);
        }
        self.execute();

        let outcome = if self.commit_artifacts() {
            Outcome::Archived
        } else {
            Outcome::CommitFailed
        };
        self.finish(outcome)
    }

    fn checkout(&self) -> bool {
        self.log
            .verbose(1, format!("  checkout: {}", self.revision));
        match self.source.checkout(self.revision) {
            Ok(()) => true,
            Err(e) => {
                self.log.warn(format!(
                    "checkout of {} failed: {}",
                    short(self.revision),
                    e.chain()
                ));
                false
            }
        }
    }

    fn configure(&self) -> bool {
        self.run_stage("configure", self.config.commands().configure())
    }

    fn build(&self) -> bool {
        self.run_stage("build", self.config.commands().build())
    }

    /// A failing smoke command only flags the revision.
    fn execute(&mut self) {
        let config = self.config;
        let Some(command) = config.commands().execute() else {
            self.log.verbose(2, "  execute: skipped (no command)");
            return;
        };
        if !self.run_stage("execute", command) {
            self.warn("smoke command failed; archiving anyway".to_string());
        }
    }

    /// Moves each artifact into the archive, stages it, then commits
    /// `build_<revision>`.
    fn commit_artifacts(&mut self) -> bool {
        let config = self.config;
        let archive = self.archive;
        let mut staged = 0usize;

        for file in config.files() {
            let Some(name) = file.file_name().map(Path::new) else {
                self.warn(format!("'{}' has no file name; skipped", file.display()));
                continue;
            };
            let dest = archive.root().join(name);

            if let Err(e) = move_file(file, &dest) {
                self.warn(format!("could not move '{}': {e}", file.display()));
                if let Err(e) = archive.discard(name) {
                    self.warn(format!(
                        "could not drop previous '{}' from the archive: {}",
                        name.display(),
                        e.chain()
                    ));
                }
                continue;
            }

            match archive.stage(name) {
                Ok(()) => {
                    self.log
                        .verbose(2, format!("  staged {}", name.display()));
                    staged += 1;
                }
                Err(e) => self.warn(format!(
                    "could not stage '{}': {}",
                    name.display(),
                    e.chain()
                )),
            }
        }

        if staged == 0 {
            self.log.warn(format!(
                "no artifacts staged for {}; not committing",
                short(self.revision)
            ));
            return false;
        }

        let summary = self.source.summary(self.revision);
        let message = archive_message(self.revision, summary.as_deref());
        match self.archive.commit(&message) {
            Ok(oid) => {
                self.log.verbose(
                    1,
                    format!("  committed {oid} ({staged} file{})", plural(staged)),
                );
                true
            }
            Err(e) => {
                self.log.warn(format!(
                    "could not commit {}: {}",
                    short(self.revision),
                    e.chain()
                ));
                false
            }
        }
    }

    /// Runs a stage command in the build directory; true iff it exited zero.
    fn run_stage(&self, stage: &str, command: &CommandLine) -> bool {
        self.log.verbose(1, format!("  {stage}: {command}"));

        // Captured output is discarded; only quiet runs capture.
        match process::run(command, Some(self.config.build_dir()), self.log.quiet()) {
            Ok(output) if output.success() => true,
            Ok(output) => {
                self.log.warn(format!(
                    "{stage} failed for {} ({})",
                    short(self.revision),
                    output.describe_status()
                ));
                false
            }
            Err(e) => {
                self.log.warn(format!(
                    "{stage} could not run for {}: {}",
                    short(self.revision),
                    e.chain()
                ));
                false
            }
        }
    }

    fn warn(&mut self, message: String) {
        self.log
            .warn(format!("{}: {message}", short(self.revision)));
        self.warnings.push(message);
    }

    fn finish(self, outcome: Outcome) -> RevisionReport {
        RevisionReport::new(self.revision.to_string(), outcome, self.warnings)
    }
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "" } else { "s" }
}

/// `rename`, falling back to copy + remove across file systems.
fn move_file(from: &Path, to: &Path) -> io::Result<()> {
    match fs::rename(from, to) {
        Ok(()) => Ok(()),
        Err(_) if from.is_file() => {
            fs::copy(from, to)?;
            fs::remove_file(from)
        }
        Err(e) => Err(e),
    }
}
