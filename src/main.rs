//! # git-bibisect CLI
//!
//! Builds a range of git revisions and archives their binaries into a
//! separate repository for bisection.
//!
//! ## Commands
//!
//! - **build**: Create a new archive (the destination must not exist)
//! - **add**: Append new revisions to an archive, skipping archived ones
//!
//! ## Quick Start
//!
//! ```bash
//! git bibisect build --range v1.0..HEAD --dest ../archive build/app
//! ```
//!
//! ## Environment Variables
//!
//! - `GIT_BIBISECT_CONFIG`: Config file with default run options
//! - `GIT_BIBISECT_DEST`: Archive repository path
//! - `GIT_BIBISECT_RANGE`: Revision range
//! - `GIT_BIBISECT_VERBOSE`: Enable verbose output
//! - `GIT_BIBISECT_QUIET`: Silence all output except errors

use std::io::IsTerminal;

use git_bibisect::cli::Cli;

fn main() -> miette::Result<()> {
    miette::set_panic_hook();

    if std::io::stderr().is_terminal() {
        miette::set_hook(Box::new(|_| {
            Box::new(
                miette::GraphicalReportHandler::new()
                    .with_theme(miette::GraphicalTheme::unicode_nocolor())
                    .with_context_lines(3),
            )
        }))?;
    } else {
        // CI logs and pipes get the plain theme
        miette::set_hook(Box::new(|_| {
            Box::new(
                miette::GraphicalReportHandler::new()
                    .with_theme(miette::GraphicalTheme::none())
                    .with_context_lines(0),
            )
        }))?;
    }

    let cli = Cli::parse_args();

    // Individual revision failures are in the report, not the exit status.
    git_bibisect::commands::execute(&cli)
        .map(|_| ())
        .map_err(Into::into)
}
