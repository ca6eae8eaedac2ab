//! Command-line interface definitions for git-bibisect.
//!
//! This module defines the CLI structure using clap. The main entry point is
//! the [`Cli`] struct; both subcommands share the [`RunArgs`] options.
//!
//! # Example
//!
//! ```no_run
//! use git_bibisect::cli::{Cli, Commands};
//!
//! let cli = Cli::parse_args();
//!
//! match cli.command() {
//!     Commands::Build(args) => println!("new archive at {:?}", args.dest()),
//!     Commands::Add(args) => println!("appending to {:?}", args.dest()),
//! }
//! ```

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};

use crate::error::{BisectError, Result};

#[cfg(test)]
mod tests;

/// Main command-line interface for git-bibisect.
#[derive(Debug, Parser)]
#[command(
    name = "git-bibisect",
    bin_name = "git-bibisect",
    author,
    version,
    about = "Build a range of git revisions and archive their binaries for bisection",
    long_about = None,
    propagate_version = true
)]
pub struct Cli {
    #[command(flatten)]
    global_opts: GlobalOpts,

    #[command(subcommand)]
    command: Commands,
}

/// Options that apply to every subcommand.
#[derive(Debug, Parser)]
pub struct GlobalOpts {
    /// TOML file with default run options
    #[arg(short, long, global = true, env = "GIT_BIBISECT_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output (use multiple times for more verbosity)
    #[arg(short, long, global = true, action = clap::ArgAction::Count, env = "GIT_BIBISECT_VERBOSE")]
    verbose: u8,

    /// Silence all output except for errors
    #[arg(
        short,
        long,
        global = true,
        conflicts_with = "verbose",
        env = "GIT_BIBISECT_QUIET"
    )]
    quiet: bool,
}

impl GlobalOpts {
    /// Create a new builder for constructing `GlobalOpts` programmatically.
    pub fn builder() -> GlobalOptsBuilder {
        GlobalOptsBuilder::default()
    }

    /// Get the config file option
    pub fn config(&self) -> Option<&Path> {
        self.config.as_deref()
    }

    /// Get the verbose level
    pub fn verbose(&self) -> u8 {
        self.verbose
    }

    /// Check if quiet mode is enabled
    pub fn quiet(&self) -> bool {
        self.quiet
    }
}

/// Builder for [`GlobalOpts`]
#[derive(Default)]
pub struct GlobalOptsBuilder {
    config: Option<PathBuf>,
    verbose: u8,
    quiet: bool,
}

impl GlobalOptsBuilder {
    /// Set the config file path.
    pub fn config(mut self, path: Option<impl Into<PathBuf>>) -> Self {
        self.config = path.map(Into::into);
        self
    }

    /// Set the verbosity level (0 = normal, 1+ = verbose).
    pub fn verbose(mut self, level: u8) -> Self {
        self.verbose = level;
        self
    }

    /// Enable or disable quiet mode.
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn build(self) -> GlobalOpts {
        GlobalOpts {
            config: self.config,
            verbose: self.verbose,
            quiet: self.quiet,
        }
    }
}

/// Options describing what to build and where to archive it.
///
/// Any option left unset falls back to the config file, then to the
/// built-in defaults.
#[derive(Clone, Debug, Default, Args)]
pub struct RunArgs {
    /// Revision range, e.g. "v1.0..HEAD" (default: all of HEAD's history)
    #[arg(short, long, env = "GIT_BIBISECT_RANGE")]
    range: Option<String>,

    /// Archive repository path
    #[arg(short, long, env = "GIT_BIBISECT_DEST")]
    dest: Option<PathBuf>,

    /// Configure command (default: "cmake .. -DCMAKE_BUILD_TYPE=Release")
    #[arg(long, env = "GIT_BIBISECT_CONFIGURE_CMD")]
    configure_cmd: Option<String>,

    /// Build command (default: "make -j2")
    #[arg(long, env = "GIT_BIBISECT_BUILD_CMD")]
    build_cmd: Option<String>,

    /// Smoke command run after each build, through the shell; a failure only
    /// produces a warning
    #[arg(long, env = "GIT_BIBISECT_EXECUTE_CMD")]
    execute_cmd: Option<String>,

    /// Directory the configure, build and execute commands run in
    /// (default: the current directory)
    #[arg(long, env = "GIT_BIBISECT_BUILD_DIR")]
    build_dir: Option<PathBuf>,

    /// Build artifacts to archive for every revision
    files: Vec<PathBuf>,
}

impl RunArgs {
    pub fn builder() -> RunArgsBuilder {
        RunArgsBuilder::default()
    }

    pub fn range(&self) -> Option<&str> {
        self.range.as_deref()
    }

    pub fn dest(&self) -> Option<&Path> {
        self.dest.as_deref()
    }

    pub fn configure_cmd(&self) -> Option<&str> {
        self.configure_cmd.as_deref()
    }

    pub fn build_cmd(&self) -> Option<&str> {
        self.build_cmd.as_deref()
    }

    pub fn execute_cmd(&self) -> Option<&str> {
        self.execute_cmd.as_deref()
    }

    pub fn build_dir(&self) -> Option<&Path> {
        self.build_dir.as_deref()
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }
}

/// Builder for [`RunArgs`]
#[derive(Debug, Default)]
pub struct RunArgsBuilder {
    args: RunArgs,
}

impl RunArgsBuilder {
    pub fn range(mut self, range: impl Into<String>) -> Self {
        self.args.range = Some(range.into());
        self
    }

    pub fn dest(mut self, dest: impl Into<PathBuf>) -> Self {
        self.args.dest = Some(dest.into());
        self
    }

    pub fn configure_cmd(mut self, command: impl Into<String>) -> Self {
        self.args.configure_cmd = Some(command.into());
        self
    }

    pub fn build_cmd(mut self, command: impl Into<String>) -> Self {
        self.args.build_cmd = Some(command.into());
        self
    }

    pub fn execute_cmd(mut self, command: impl Into<String>) -> Self {
        self.args.execute_cmd = Some(command.into());
        self
    }

    pub fn build_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.args.build_dir = Some(dir.into());
        self
    }

    pub fn file(mut self, file: impl Into<PathBuf>) -> Self {
        self.args.files.push(file.into());
        self
    }

    pub fn build(self) -> RunArgs {
        self.args
    }
}

/// Available git-bibisect subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Create a new archive from a range of revisions
    ///
    /// The destination must not exist yet. Every revision in the range is
    /// checked out, configured and built; the listed artifacts are moved into
    /// the archive and committed as "build_<revision>".
    Build(RunArgs),

    /// Append revisions to an existing archive
    ///
    /// Revisions that already have a "build_<revision>" commit are skipped,
    /// so an interrupted or partially failed run can simply be repeated. The
    /// archive is created if it does not exist.
    Add(RunArgs),
}

impl Commands {
    pub fn run_args(&self) -> &RunArgs {
        match self {
            Commands::Build(args) | Commands::Add(args) => args,
        }
    }
}

impl Cli {
    /// Get the global options
    pub fn global_opts(&self) -> &GlobalOpts {
        &self.global_opts
    }

    /// Get the command
    pub fn command(&self) -> &Commands {
        &self.command
    }

    /// Create a builder for programmatic construction
    pub fn builder() -> CliBuilder {
        CliBuilder::default()
    }

    /// Parse command line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Builder for [`Cli`]
#[derive(Debug, Default)]
pub struct CliBuilder {
    config: Option<PathBuf>,
    verbose: u8,
    quiet: bool,
    command: Option<Commands>,
}

impl CliBuilder {
    /// Set the config file
    pub fn config(mut self, path: impl Into<PathBuf>) -> Self {
        self.config = Some(path.into());
        self
    }

    /// Set the verbose level
    pub fn verbose(mut self, level: u8) -> Self {
        self.verbose = level;
        self
    }

    /// Enable quiet mode
    pub fn quiet(mut self, enabled: bool) -> Self {
        self.quiet = enabled;
        self
    }

    /// Set the command
    pub fn command(mut self, command: Commands) -> Self {
        self.command = Some(command);
        self
    }

    /// Build the Cli instance
    pub fn build(self) -> Result<Cli> {
        let command = self
            .command
            .ok_or_else(|| BisectError::ConfigError("Command is required".to_string()))?;

        Ok(Cli {
            global_opts: GlobalOpts::builder()
                .config(self.config)
                .verbose(self.verbose)
                .quiet(self.quiet)
                .build(),
            command,
        })
    }
}
