use std::path::{Path, PathBuf};

use clap::Parser;

use crate::cli::{Cli, Commands, RunArgs};

#[test]
fn test_cli_parsing() {
    let cli = Cli::parse_from(["git-bibisect", "build", "-d", "../archive", "build/app"]);
    let Commands::Build(args) = cli.command() else {
        panic!("expected build");
    };
    assert_eq!(args.dest(), Some(Path::new("../archive")));
    assert_eq!(args.files(), [PathBuf::from("build/app")]);
    assert!(args.range().is_none());
    assert!(args.configure_cmd().is_none());
    assert_eq!(cli.global_opts().verbose(), 0);
    assert!(!cli.global_opts().quiet());
    assert!(cli.global_opts().config().is_none());
}

#[test]
fn test_add_with_overrides() {
    let cli = Cli::parse_from([
        "git-bibisect",
        "add",
        "--range",
        "HEAD~5..HEAD",
        "--dest",
        "archive",
        "--configure-cmd",
        "cmake .. -G Ninja",
        "--build-cmd",
        "ninja",
        "--execute-cmd",
        "./app --version",
        "--build-dir",
        "build",
        "build/app",
        "build/libapp.so",
    ]);
    let Commands::Add(args) = cli.command() else {
        panic!("expected add");
    };
    assert_eq!(args.range(), Some("HEAD~5..HEAD"));
    assert_eq!(args.configure_cmd(), Some("cmake .. -G Ninja"));
    assert_eq!(args.build_cmd(), Some("ninja"));
    assert_eq!(args.execute_cmd(), Some("./app --version"));
    assert_eq!(args.build_dir(), Some(Path::new("build")));
    assert_eq!(args.files().len(), 2);
}

#[test]
fn test_verbose_flag() {
    let cli = Cli::parse_from(["git-bibisect", "-vv", "add", "out.bin"]);
    assert_eq!(cli.global_opts().verbose(), 2);
    assert!(matches!(cli.command(), Commands::Add(_)));
}

#[test]
fn test_global_flag_positioning() {
    let cli = Cli::parse_from(["git-bibisect", "add", "out.bin", "--quiet", "--config", "b.toml"]);
    assert!(cli.global_opts().quiet());
    assert_eq!(cli.global_opts().config(), Some(Path::new("b.toml")));
}

#[test]
fn test_quiet_conflicts_with_verbose() {
    let result = Cli::try_parse_from(["git-bibisect", "-q", "-v", "add"]);
    assert!(result.is_err());
}

#[test]
fn test_subcommand_required() {
    assert!(Cli::try_parse_from(["git-bibisect"]).is_err());
}

#[test]
fn test_cli_builder() {
    let args = RunArgs::builder()
        .dest("archive")
        .build_cmd("make")
        .file("out.bin")
        .build();
    let cli = Cli::builder()
        .verbose(2)
        .config("bibisect.toml")
        .command(Commands::Add(args))
        .build()
        .expect("Failed to build CLI");

    assert_eq!(cli.global_opts().verbose(), 2);
    assert_eq!(cli.global_opts().config(), Some(Path::new("bibisect.toml")));
    let run_args = cli.command().run_args();
    assert_eq!(run_args.dest(), Some(Path::new("archive")));
    assert_eq!(run_args.build_cmd(), Some("make"));
    assert_eq!(run_args.files(), [PathBuf::from("out.bin")]);

    assert!(Cli::builder().build().is_err());
}
