//! Run configuration.
//!
//! A run is described by an [`ArchiveConfig`]: the revision range, the
//! artifact files, the [`CommandSet`], the archive destination and the build
//! directory. It is assembled by [`ArchiveConfigBuilder`] from three layers,
//! highest precedence first:
//!
//! 1. values set on the builder (command-line flags),
//! 2. an optional TOML [`ConfigFile`],
//! 3. built-in command defaults.
//!
//! # Config file
//!
//! ```toml
//! destination = "../archive"
//! files = ["bin/app"]
//! range = "v1.0..HEAD"
//! build-dir = "build"
//!
//! [commands]
//! configure = "cmake .. -DCMAKE_BUILD_TYPE=Release"
//! build = ["make", "-j2"]
//! execute = "./bin/app --version"
//! ```
//!
//! Commands are either a string, split with shell-word rules, or an explicit
//! argument array. A string `execute` command runs through the shell.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use serde::Deserialize;

use crate::error::{BisectError, Result};
use crate::process::CommandLine;

#[cfg(test)]
mod tests;

/// Configure command used when none is given.
pub const DEFAULT_CONFIGURE: &str = "cmake .. -DCMAKE_BUILD_TYPE=Release";
/// Build command used when none is given.
pub const DEFAULT_BUILD: &str = "make -j2";

/// A command as written in configuration.
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum CommandSpec {
    Line(String),
    Argv(Vec<String>),
}

impl CommandSpec {
    fn into_command(self, stage: &str) -> Result<CommandLine> {
        match self {
            CommandSpec::Line(line) => CommandLine::parse(stage, &line),
            CommandSpec::Argv(argv) => CommandLine::from_argv(stage, argv),
        }
    }

    /// Like [`into_command`](Self::into_command) but strings go through the
    /// shell and an empty string disables the stage.
    fn into_shell_command(self, stage: &str) -> Result<Option<CommandLine>> {
        match self {
            CommandSpec::Line(line) if line.trim().is_empty() => Ok(None),
            CommandSpec::Line(line) => CommandLine::shell(stage, &line).map(Some),
            CommandSpec::Argv(argv) => CommandLine::from_argv(stage, argv).map(Some),
        }
    }
}

impl From<&str> for CommandSpec {
    fn from(line: &str) -> Self {
        CommandSpec::Line(line.to_string())
    }
}

impl From<String> for CommandSpec {
    fn from(line: String) -> Self {
        CommandSpec::Line(line)
    }
}

/// `[commands]` table of the config file.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CommandsSection {
    pub configure: Option<CommandSpec>,
    pub build: Option<CommandSpec>,
    pub execute: Option<CommandSpec>,
}

/// Contents of a TOML config file.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct ConfigFile {
    pub destination: Option<PathBuf>,
    #[serde(default)]
    pub files: Vec<PathBuf>,
    pub range: Option<String>,
    pub build_dir: Option<PathBuf>,
    #[serde(default)]
    pub commands: CommandsSection,
}

impl ConfigFile {
    /// Reads `path`; relative paths inside it are taken relative to the
    /// file's directory.
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| BisectError::IoError {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&text).map_err(|source| BisectError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })?;

        let base = path.parent().unwrap_or_else(|| Path::new("."));
        Ok(config.rebase(base))
    }

    pub fn parse(text: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    fn rebase(mut self, base: &Path) -> Self {
        self.destination = self.destination.map(|p| base.join(p));
        self.build_dir = self.build_dir.map(|p| base.join(p));
        self.files = self.files.into_iter().map(|p| base.join(p)).collect();
        self
    }
}

/// Commands for the configure, build and optional execute stages.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandSet {
    configure: CommandLine,
    build: CommandLine,
    execute: Option<CommandLine>,
}

impl CommandSet {
    pub fn new(configure: CommandLine, build: CommandLine, execute: Option<CommandLine>) -> Self {
        Self {
            configure,
            build,
            execute,
        }
    }

    pub fn configure(&self) -> &CommandLine {
        &self.configure
    }

    pub fn build(&self) -> &CommandLine {
        &self.build
    }

    pub fn execute(&self) -> Option<&CommandLine> {
        self.execute.as_ref()
    }
}

/// Fully resolved configuration for one run.
#[derive(Clone, Debug)]
pub struct ArchiveConfig {
    range: Option<String>,
    files: Vec<PathBuf>,
    commands: CommandSet,
    destination: PathBuf,
    build_dir: PathBuf,
}

impl ArchiveConfig {
    pub fn builder() -> ArchiveConfigBuilder {
        ArchiveConfigBuilder::default()
    }

    /// Replaces the artifact list without the name checks of the builder.
    #[cfg(test)]
    pub(crate) fn with_files(mut self, files: Vec<PathBuf>) -> Self {
        self.files = files;
        self
    }

    /// Revision range expression; `None` means all of HEAD's history.
    pub fn range(&self) -> Option<&str> {
        self.range.as_deref()
    }

    /// Absolute artifact paths, in the order given.
    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }

    pub fn commands(&self) -> &CommandSet {
        &self.commands
    }

    /// Absolute path of the archive repository.
    pub fn destination(&self) -> &Path {
        &self.destination
    }

    /// Absolute directory the stage commands run in.
    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }
}

/// Builder for [`ArchiveConfig`].
#[derive(Debug, Default)]
pub struct ArchiveConfigBuilder {
    file: ConfigFile,
    range: Option<String>,
    files: Vec<PathBuf>,
    destination: Option<PathBuf>,
    build_dir: Option<PathBuf>,
    configure: Option<CommandSpec>,
    build: Option<CommandSpec>,
    execute: Option<CommandSpec>,
}

impl ArchiveConfigBuilder {
    /// Use `file` as the fallback layer.
    pub fn config_file(mut self, file: ConfigFile) -> Self {
        self.file = file;
        self
    }

    pub fn range(mut self, range: Option<impl Into<String>>) -> Self {
        self.range = range.map(Into::into);
        self
    }

    /// Artifact files; a non-empty list replaces the config file's list.
    pub fn files<I, P>(mut self, files: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.files = files.into_iter().map(Into::into).collect();
        self
    }

    pub fn destination(mut self, destination: Option<impl Into<PathBuf>>) -> Self {
        self.destination = destination.map(Into::into);
        self
    }

    pub fn build_dir(mut self, build_dir: Option<impl Into<PathBuf>>) -> Self {
        self.build_dir = build_dir.map(Into::into);
        self
    }

    pub fn configure_cmd(mut self, command: Option<impl Into<CommandSpec>>) -> Self {
        self.configure = command.map(Into::into);
        self
    }

    pub fn build_cmd(mut self, command: Option<impl Into<CommandSpec>>) -> Self {
        self.build = command.map(Into::into);
        self
    }

    pub fn execute_cmd(mut self, command: Option<impl Into<CommandSpec>>) -> Self {
        self.execute = command.map(Into::into);
        self
    }

    /// Resolve all layers. Relative paths resolve against `working_dir`.
    ///
    /// # Errors
    ///
    /// [`BisectError::ConfigError`] for a missing destination, an empty or
    /// ambiguous file list; [`BisectError::InvalidCommand`] for commands that
    /// cannot be parsed.
    pub fn build(self, working_dir: &Path) -> Result<ArchiveConfig> {
        let Self {
            file,
            range,
            files,
            destination,
            build_dir,
            configure,
            build,
            execute,
        } = self;

        let destination = destination
            .or(file.destination)
            .ok_or_else(|| BisectError::ConfigError("no archive destination given".to_string()))?;

        let files = if files.is_empty() { file.files } else { files };
        if files.is_empty() {
            return Err(BisectError::ConfigError(
                "no artifact files given".to_string(),
            ));
        }
        let files: Vec<PathBuf> = files
            .iter()
            .map(|f| normalize_path(f, working_dir))
            .collect();
        check_artifact_names(&files)?;

        let configure = configure
            .or(file.commands.configure)
            .unwrap_or_else(|| DEFAULT_CONFIGURE.into())
            .into_command("configure")?;
        let build = build
            .or(file.commands.build)
            .unwrap_or_else(|| DEFAULT_BUILD.into())
            .into_command("build")?;
        let execute = match execute.or(file.commands.execute) {
            Some(spec) => spec.into_shell_command("execute")?,
            None => None,
        };

        Ok(ArchiveConfig {
            range: range.or(file.range).filter(|r| !r.trim().is_empty()),
            files,
            commands: CommandSet::new(configure, build, execute),
            destination: normalize_path(destination, working_dir),
            build_dir: build_dir
                .or(file.build_dir)
                .map(|dir| normalize_path(dir, working_dir))
                .unwrap_or_else(|| normalize_path(working_dir, working_dir)),
        })
    }
}

/// The archive is flat, so every artifact needs a distinct base name.
fn check_artifact_names(files: &[PathBuf]) -> Result<()> {
    let mut seen = HashSet::new();
    for file in files {
        let name = file.file_name().ok_or_else(|| {
            BisectError::ConfigError(format!(
                "artifact '{}' does not name a file",
                file.display()
            ))
        })?;
        if !seen.insert(name.to_os_string()) {
            return Err(BisectError::ConfigError(format!(
                "more than one artifact is named '{}'",
                name.to_string_lossy()
            )));
        }
    }
    Ok(())
}

/// Make `path` absolute against `base` and drop `.`/`..` components, without
/// touching the file system.
pub(crate) fn normalize_path(path: impl AsRef<Path>, base: &Path) -> PathBuf {
    let path = path.as_ref();

    let absolute = if path.is_relative() {
        base.join(path)
    } else {
        path.to_path_buf()
    };

    let mut components = Vec::new();
    for component in absolute.components() {
        match component {
            Component::ParentDir => {
                if let Some(last) = components.last()
                    && matches!(last, Component::Normal(_))
                {
                    components.pop();
                    continue;
                }
                components.push(component);
            }
            Component::CurDir => continue,
            _ => components.push(component),
        }
    }

    components.iter().collect()
}
