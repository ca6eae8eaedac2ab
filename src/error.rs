//! Error types for git-bibisect.
//!
//! All fallible operations return [`Result`], whose error type
//! [`BisectError`] combines `thiserror` for the definitions with `miette`
//! diagnostics (code and help text) for CLI output.
//!
//! Only errors raised before the per-revision loop, or while restoring the
//! source repository afterwards, end a run. Failures inside a single
//! revision's pipeline are logged and recorded in the run report instead.
//!
//! # Example
//!
//! ```no_run
//! use std::path::Path;
//!
//! use git_bibisect::error::{BisectError, Result};
//!
//! fn ensure_fresh(dest: &Path) -> Result<()> {
//!     if dest.exists() {
//!         return Err(BisectError::AlreadyExists(dest.to_path_buf()));
//!     }
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

/// Error types that can occur in git-bibisect operations
#[derive(Error, Debug, Diagnostic)]
pub enum BisectError {
    /// No source repository was found at or above the working directory.
    ///
    /// Raised when `git2::Repository::discover()` fails or the repository is
    /// bare. Revisions are checked out into a work tree, so one is required.
    #[error("Git repository not found in '{0}' or any parent directories")]
    #[diagnostic(
        code(git_bibisect::git::repo_not_found),
        help("Run git-bibisect from within the work tree of the source repository.")
    )]
    RepoNotFound(
        /// The path where the repository was searched for
        PathBuf,
    ),

    /// A libgit2 operation failed.
    #[error("Git operation failed")]
    #[diagnostic(code(git_bibisect::git::error))]
    Git(#[from] git2::Error),

    /// The current ref of the source repository could not be determined.
    ///
    /// Raised when HEAD is neither a branch nor resolves to a commit, for
    /// example in a repository without any commits.
    #[error("Could not determine the current ref: {0}")]
    #[diagnostic(
        code(git_bibisect::git::query_error),
        help("Make sure the source repository has at least one commit checked out.")
    )]
    VcsQuery(
        /// Description of what could not be resolved
        String,
    ),

    /// The revision range expression could not be resolved.
    #[error("Invalid revision range '{range}'")]
    #[diagnostic(
        code(git_bibisect::git::invalid_range),
        help("Use a single revision (e.g. 'HEAD') or a range such as 'v1.0..HEAD'.")
    )]
    InvalidRange {
        /// The expression given by the user
        range: String,
        /// The underlying libgit2 error
        #[source]
        source: git2::Error,
    },

    /// The archive destination already exists on a fresh `build`.
    ///
    /// A fresh archive never reuses or overwrites an existing directory.
    #[error("Archive destination '{0}' already exists")]
    #[diagnostic(
        code(git_bibisect::archive::already_exists),
        help("Use 'git-bibisect add' to append to an existing archive, or choose a new path.")
    )]
    AlreadyExists(
        /// The colliding destination path
        PathBuf,
    ),

    /// The archive destination exists but is not a git repository.
    #[error("'{0}' exists but is not an archive repository")]
    #[diagnostic(
        code(git_bibisect::archive::not_a_repository),
        help("Point --dest at an archive created by 'git-bibisect build', or at a new path.")
    )]
    NotAnArchive(
        /// The destination path
        PathBuf,
    ),

    /// The archive destination is the repository being built.
    #[error("'{0}' is the source repository, not a separate archive")]
    #[diagnostic(
        code(git_bibisect::archive::is_source),
        help("Archive commits would be written onto the revisions being built. Choose a --dest outside the source repository.")
    )]
    ArchiveIsSource(
        /// The destination path
        PathBuf,
    ),

    /// File system I/O error.
    #[error("I/O error accessing '{path}'")]
    #[diagnostic(code(git_bibisect::io_error))]
    IoError {
        /// The path that caused the I/O error
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// The directory a command should run in does not exist.
    #[error("Working directory '{0}' does not exist")]
    #[diagnostic(
        code(git_bibisect::process::working_dir),
        help("Create the build directory or pass a different --build-dir.")
    )]
    WorkingDirectory(
        /// The missing directory
        PathBuf,
    ),

    /// An external command could not be started.
    #[error("Failed to start '{command}'")]
    #[diagnostic(
        code(git_bibisect::process::spawn_error),
        help("Check that the program exists and is on PATH.")
    )]
    CommandSpawn {
        /// The command line that failed to start
        command: String,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A configured command line could not be turned into an invocation.
    ///
    /// Raised for empty commands and for unbalanced quotes.
    #[error("Invalid {stage} command '{command}': {message}")]
    #[diagnostic(
        code(git_bibisect::config::invalid_command),
        help("Commands are split like a POSIX shell; check quoting.")
    )]
    InvalidCommand {
        /// Pipeline stage the command belongs to
        stage: String,
        /// The command as configured
        command: String,
        /// Why it was rejected
        message: String,
    },

    /// The resolved configuration is incomplete or inconsistent.
    #[error("Configuration error: {0}")]
    #[diagnostic(
        code(git_bibisect::config::error),
        help("Pass the missing values on the command line or in the --config file.")
    )]
    ConfigError(
        /// Description of the configuration error
        String,
    ),

    /// The config file is not valid TOML or has unknown keys.
    #[error("Failed to parse config file '{path}'")]
    #[diagnostic(code(git_bibisect::config::parse_error))]
    ConfigParse {
        /// The config file
        path: PathBuf,
        /// The underlying TOML error
        #[source]
        source: toml::de::Error,
    },

    /// The source repository could not be returned to its original ref.
    ///
    /// The repository is left at whatever revision was checked out last.
    #[error("Failed to restore the source repository to '{reference}'")]
    #[diagnostic(
        code(git_bibisect::git::restore_error),
        help("Check out the original ref manually; local changes may conflict with it.")
    )]
    Restore {
        /// The ref recorded at the start of the run
        reference: String,
        /// The underlying libgit2 error
        #[source]
        source: git2::Error,
    },
}

impl BisectError {
    /// The error message followed by each underlying cause, for one-line
    /// log output.
    pub fn chain(&self) -> String {
        let mut text = self.to_string();
        let mut source = std::error::Error::source(self);
        while let Some(cause) = source {
            text.push_str(": ");
            text.push_str(&cause.to_string());
            source = cause.source();
        }
        text
    }
}

/// Type alias for Results in this crate
pub type Result<T> = std::result::Result<T, BisectError>;
