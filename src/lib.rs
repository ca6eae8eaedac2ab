//! # git-bibisect
//!
//! Builds every revision in a range of git history and archives the
//! resulting binaries into a separate git repository, one commit per source
//! revision. The archive can then be bisected directly, without rebuilding
//! old revisions during an investigation.
//!
//! ## Overview
//!
//! For each revision, oldest first, git-bibisect:
//!
//! 1. checks the revision out in the source repository,
//! 2. runs the configure command, then the build command,
//! 3. optionally runs a smoke command (a failure only warns),
//! 4. moves the listed artifacts into the archive repository and commits
//!    them with the message `build_<revision>`.
//!
//! Revisions whose configure or build step fails are skipped and the run
//! continues. Revisions already present in the archive are skipped too, so
//! `git-bibisect add` can be re-run safely. When the run ends, the source
//! repository is put back on the branch (or commit) it started on.
//!
//! ## Architecture
//!
//! - [`cli`]: Command-line interface definitions using clap
//! - [`commands`]: Subcommand dispatch and run summary
//! - [`config`]: Config file and command-line option resolution
//! - [`archive`]: The archive manager driving the revision loop
//! - [`job`]: The per-revision build pipeline
//! - [`vcs`]: Source and archive repository access through git2
//! - [`process`]: External command execution
//! - [`error`]: Error types with thiserror + miette
//!
//! ## Usage
//!
//! ```bash
//! # Create an archive of the last 50 revisions
//! cd build
//! git bibisect build --range HEAD~50..HEAD --dest ../../app-archive bin/app
//!
//! # Later, append whatever is new
//! git bibisect add --range HEAD~50..HEAD --dest ../../app-archive bin/app
//! ```
//!
//! ## Library Usage
//!
//! ```no_run
//! use git_bibisect::cli::{Cli, Commands, RunArgs};
//! use git_bibisect::commands;
//!
//! let args = RunArgs::builder()
//!     .dest("../archive")
//!     .configure_cmd("cmake ..")
//!     .build_cmd("make -j8")
//!     .file("bin/app")
//!     .build();
//!
//! let cli = Cli::builder().verbose(1).command(Commands::Add(args)).build()?;
//! let report = commands::execute(&cli)?;
//! println!("{} revisions archived", report.count(git_bibisect::archive::Outcome::Archived));
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod archive;
pub mod cli;
pub mod commands;
pub mod config;
pub mod error;
pub mod job;
pub mod logging;
pub mod process;
pub mod vcs;
