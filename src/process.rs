//! External command execution.
//!
//! Commands are held as an explicit program plus argument list
//! ([`CommandLine`]) and spawned with their working directory set on the
//! child, so the parent's current directory never changes.

use std::borrow::Cow;
use std::fmt;
use std::path::Path;
use std::process::{Command, ExitStatus, Stdio};

use crate::error::{BisectError, Result};

/// A program and its ordered arguments.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommandLine {
    program: String,
    args: Vec<String>,
}

impl CommandLine {
    /// Split `line` with POSIX shell-word rules.
    ///
    /// `stage` names the pipeline stage for error messages.
    pub fn parse(stage: &str, line: &str) -> Result<Self> {
        let words = shlex::split(line).ok_or_else(|| BisectError::InvalidCommand {
            stage: stage.to_string(),
            command: line.to_string(),
            message: "unbalanced quotes or trailing escape".to_string(),
        })?;
        Self::from_argv(stage, words).map_err(|_| BisectError::InvalidCommand {
            stage: stage.to_string(),
            command: line.to_string(),
            message: "command is empty".to_string(),
        })
    }

    /// Build a command from an already split argument vector.
    pub fn from_argv(stage: &str, argv: Vec<String>) -> Result<Self> {
        let mut argv = argv.into_iter();
        match argv.next() {
            Some(program) if !program.is_empty() => Ok(Self {
                program,
                args: argv.collect(),
            }),
            _ => Err(BisectError::InvalidCommand {
                stage: stage.to_string(),
                command: String::new(),
                message: "command is empty".to_string(),
            }),
        }
    }

    /// Run `line` through the platform shell.
    pub fn shell(stage: &str, line: &str) -> Result<Self> {
        if line.trim().is_empty() {
            return Err(BisectError::InvalidCommand {
                stage: stage.to_string(),
                command: line.to_string(),
                message: "command is empty".to_string(),
            });
        }

        #[cfg(windows)]
        let (program, flag) = ("cmd", "/C");
        #[cfg(not(windows))]
        let (program, flag) = ("sh", "-c");

        Ok(Self {
            program: program.to_string(),
            args: vec![flag.to_string(), line.to_string()],
        })
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    pub fn args(&self) -> &[String] {
        &self.args
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let quote = |word: &str| -> String {
            shlex::try_quote(word)
                .unwrap_or(Cow::Borrowed(word))
                .into_owned()
        };
        write!(f, "{}", quote(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", quote(arg))?;
        }
        Ok(())
    }
}

/// Result of a finished command.
#[derive(Debug)]
pub struct RunOutput {
    status: ExitStatus,
    output: String,
}

impl RunOutput {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    /// Exit code, `None` when the child was killed by a signal.
    pub fn code(&self) -> Option<i32> {
        self.status.code()
    }

    /// Captured stdout; empty when output was not captured or the command
    /// exited non-zero.
    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn describe_status(&self) -> String {
        match self.code() {
            Some(code) => format!("exit code {code}"),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Runs `command`, optionally inside `working_dir`, optionally capturing its
/// output.
///
/// A non-zero exit is not an error: the status is returned for the caller to
/// interpret. With `capture` set, stdout and stderr are collected rather than
/// inherited and a failing command yields empty output.
///
/// # Errors
///
/// Returns [`BisectError::WorkingDirectory`] if `working_dir` does not exist
/// and [`BisectError::CommandSpawn`] if the program cannot be started.
pub fn run(command: &CommandLine, working_dir: Option<&Path>, capture: bool) -> Result<RunOutput> {
    let mut child = Command::new(command.program());
    child.args(command.args());

    if let Some(dir) = working_dir {
        if !dir.is_dir() {
            return Err(BisectError::WorkingDirectory(dir.to_path_buf()));
        }
        child.current_dir(dir);
    }

    let spawn_error = |source| BisectError::CommandSpawn {
        command: command.to_string(),
        source,
    };

    if capture {
        let output = child
            .stdin(Stdio::null())
            .output()
            .map_err(spawn_error)?;
        let text = if output.status.success() {
            String::from_utf8_lossy(&output.stdout).into_owned()
        } else {
            String::new()
        };
        Ok(RunOutput {
            status: output.status,
            output: text,
        })
    } else {
        let status = child.status().map_err(spawn_error)?;
        Ok(RunOutput {
            status,
            output: String::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_parse_respects_quotes() {
        let cmd = CommandLine::parse("build", r#"cmake .. -DNAME="with space" 'a b'"#).unwrap();
        assert_eq!(cmd.program(), "cmake");
        assert_eq!(cmd.args(), ["..", "-DNAME=with space", "a b"]);
    }

    #[test]
    fn test_parse_rejects_empty_and_unbalanced() {
        assert!(matches!(
            CommandLine::parse("configure", "   "),
            Err(BisectError::InvalidCommand { .. })
        ));
        assert!(matches!(
            CommandLine::parse("build", "make \"-j2"),
            Err(BisectError::InvalidCommand { .. })
        ));
        assert!(CommandLine::shell("execute", "").is_err());
    }

    #[test]
    fn test_display_quotes_arguments() {
        let cmd = CommandLine::from_argv(
            "build",
            vec!["make".to_string(), "OUT=my dir".to_string()],
        )
        .unwrap();
        let shown = cmd.to_string();
        assert!(shown.starts_with("make "));
        assert_eq!(
            shlex::split(&shown).unwrap(),
            ["make".to_string(), "OUT=my dir".to_string()]
        );
    }

    #[test]
    fn test_missing_working_dir_is_an_error() {
        let temp = TempDir::new().unwrap();
        let missing = temp.path().join("nope");
        let cmd = CommandLine::parse("build", "true").unwrap();

        let result = run(&cmd, Some(&missing), false);
        assert!(matches!(result, Err(BisectError::WorkingDirectory(p)) if p == missing));
    }

    #[test]
    fn test_unknown_program_is_a_spawn_error() {
        let cmd = CommandLine::parse("build", "git-bibisect-no-such-program").unwrap();
        assert!(matches!(
            run(&cmd, None, true),
            Err(BisectError::CommandSpawn { .. })
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_capture_runs_in_working_dir() {
        let temp = TempDir::new().unwrap();
        let cmd = CommandLine::parse("execute", "pwd").unwrap();

        let out = run(&cmd, Some(temp.path()), true).unwrap();
        assert!(out.success());
        let reported = std::path::PathBuf::from(out.output().trim());
        assert_eq!(
            reported.canonicalize().unwrap(),
            temp.path().canonicalize().unwrap()
        );
        // The parent process stays where it was.
        assert_ne!(
            std::env::current_dir().unwrap().canonicalize().unwrap(),
            temp.path().canonicalize().unwrap()
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_capture_failure_yields_empty_output() {
        let cmd = CommandLine::shell("execute", "echo noise; exit 3").unwrap();

        let out = run(&cmd, None, true).unwrap();
        assert!(!out.success());
        assert_eq!(out.code(), Some(3));
        assert_eq!(out.output(), "");
        assert_eq!(out.describe_status(), "exit code 3");
    }

    #[cfg(unix)]
    #[test]
    fn test_uncaptured_status_is_returned() {
        let ok = CommandLine::parse("build", "true").unwrap();
        let fail = CommandLine::parse("build", "false").unwrap();

        assert!(run(&ok, None, false).unwrap().success());
        assert!(!run(&fail, None, false).unwrap().success());
    }
}
