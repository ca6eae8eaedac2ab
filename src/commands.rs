//! Implementation of the git-bibisect subcommands.
//!
//! Both subcommands resolve the run configuration, list the revisions once,
//! and hand them to the [`Archiver`]. They differ only in how the archive is
//! opened: `build` requires a fresh destination, `add` appends.

use std::path::{Path, PathBuf};

use crate::archive::{ArchiveMode, Archiver, Outcome, RunReport};
use crate::cli::{Cli, Commands, RunArgs};
use crate::config::{ArchiveConfig, ConfigFile, normalize_path};
use crate::error::{BisectError, Result};
use crate::job::short;
use crate::logging::Logger;
use crate::vcs::SourceRepo;


/// Execute commands based on the parsed CLI arguments.
pub fn execute(cli: &Cli) -> Result<RunReport> {
    execute_with_dir(cli, None)
}

/// Execute commands with an explicit working directory.
///
/// The working directory locates the source repository and anchors every
/// relative path given on the command line.
pub fn execute_with_dir(cli: &Cli, working_dir: Option<&Path>) -> Result<RunReport> {
    let quiet = cli.global_opts().quiet();
    let verbose = if quiet {
        0
    } else {
        cli.global_opts().verbose()
    };
    let log = Logger::new(verbose, quiet);

    let current_dir = if let Some(dir) = working_dir {
        dir.to_path_buf()
    } else {
        std::env::current_dir().map_err(|source| BisectError::IoError {
            path: PathBuf::from("."),
            source,
        })?
    };

    let config_file = cli.global_opts().config();
    match cli.command() {
        Commands::Build(args) => archive(
            args,
            config_file,
            ArchiveMode::Fresh,
            &current_dir,
            log,
        ),
        Commands::Add(args) => archive(
            args,
            config_file,
            ArchiveMode::Incremental,
            &current_dir,
            log,
        ),
    }
}

/// Layers `args` over the optional config file.
pub fn resolve_config(
    args: &RunArgs,
    config_file: Option<&Path>,
    working_dir: &Path,
) -> Result<ArchiveConfig> {
    let file = match config_file {
        Some(path) => ConfigFile::load(&normalize_path(path, working_dir))?,
        None => ConfigFile::default(),
    };

    ArchiveConfig::builder()
        .config_file(file)
        .range(args.range())
        .files(args.files())
        .destination(args.dest())
        .build_dir(args.build_dir())
        .configure_cmd(args.configure_cmd())
        .build_cmd(args.build_cmd())
        .execute_cmd(args.execute_cmd())
        .build(working_dir)
}

fn archive(
    args: &RunArgs,
    config_file: Option<&Path>,
    mode: ArchiveMode,
    working_dir: &Path,
    log: Logger,
) -> Result<RunReport> {
    let config = resolve_config(args, config_file, working_dir)?;

    if mode == ArchiveMode::Fresh && config.destination().exists() {
        return Err(BisectError::AlreadyExists(
            config.destination().to_path_buf(),
        ));
    }

    let source = SourceRepo::discover(working_dir)?;
    let revisions = source.list_revisions(config.range())?;

    log.info(format!(
        "🗄️  Archiving {} revision{} into {}",
        revisions.len(),
        if revisions.len() == 1 { "" } else { "s" },
        config.destination().display()
    ));
    log.verbose(1, format!("  configure: {}", config.commands().configure()));
    log.verbose(1, format!("  build: {}", config.commands().build()));
    if let Some(execute) = config.commands().execute() {
        log.verbose(1, format!("  execute: {execute}"));
    }
    for file in config.files() {
        log.verbose(2, format!("  artifact: {}", file.display()));
    }

    let report = Archiver::new(&source, &config, log).run(mode, &revisions)?;
    print_summary(&report, log);

    Ok(report)
}

fn print_summary(report: &RunReport, log: Logger) {
    log.info("Archive run complete:");
    if report.is_empty() {
        log.info("  Nothing to archive in the selected range");
    } else {
        log.info(format!("  Revisions processed: {}", report.revisions().len()));
    }
    for outcome in [
        Outcome::Archived,
        Outcome::AlreadyArchived,
        Outcome::CheckoutFailed,
        Outcome::ConfigureFailed,
        Outcome::BuildFailed,
        Outcome::CommitFailed,
    ] {
        let count = report.count(outcome);
        if count > 0 {
            log.info(format!("  {outcome}: {count}"));
        }
    }

    if log.level() > 0 {
        for entry in report.revisions() {
            if entry.outcome().is_failure() || !entry.warnings().is_empty() {
                log.info(format!("  {} {}", short(entry.revision()), entry.outcome()));
                for warning in entry.warnings() {
                    log.info(format!("    - {warning}"));
                }
            }
        }
    }

    if report.restore_error().is_some() {
        log.warn("the source repository was left on the last revision processed; check it out manually");
    }
}
