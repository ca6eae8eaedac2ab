use std::fs;
use std::path::{Path, PathBuf};

use tempfile::TempDir;

use super::*;

fn base() -> PathBuf {
    if cfg!(windows) {
        PathBuf::from("C:\\work\\project")
    } else {
        PathBuf::from("/work/project")
    }
}

#[test]
fn test_defaults_and_resolution() {
    let config = ArchiveConfig::builder()
        .files(["build/app", "./build/../lib/libfoo.so"])
        .destination(Some("../archive"))
        .build(&base())
        .unwrap();

    assert_eq!(config.files()[0], base().join("build/app"));
    assert_eq!(config.files()[1], base().join("lib/libfoo.so"));
    assert!(config.destination().ends_with("work/archive"));
    assert_eq!(config.build_dir(), base());
    assert_eq!(config.range(), None);

    assert_eq!(config.commands().configure().program(), "cmake");
    assert_eq!(
        config.commands().configure().args(),
        ["..", "-DCMAKE_BUILD_TYPE=Release"]
    );
    assert_eq!(config.commands().build().program(), "make");
    assert!(config.commands().execute().is_none());
}

#[test]
fn test_missing_destination() {
    let result = ArchiveConfig::builder()
        .files(["app"])
        .build(&base());
    assert!(matches!(result, Err(BisectError::ConfigError(msg)) if msg.contains("destination")));
}

#[test]
fn test_missing_files() {
    let result = ArchiveConfig::builder()
        .destination(Some("archive"))
        .build(&base());
    assert!(matches!(result, Err(BisectError::ConfigError(msg)) if msg.contains("files")));
}

#[test]
fn test_duplicate_artifact_names() {
    let result = ArchiveConfig::builder()
        .files(["a/app", "b/app"])
        .destination(Some("archive"))
        .build(&base());
    assert!(matches!(result, Err(BisectError::ConfigError(msg)) if msg.contains("app")));
}

#[test]
fn test_empty_build_command_is_rejected() {
    let result = ArchiveConfig::builder()
        .files(["app"])
        .destination(Some("archive"))
        .build_cmd(Some(""))
        .build(&base());
    assert!(matches!(
        result,
        Err(BisectError::InvalidCommand { stage, .. }) if stage == "build"
    ));
}

#[test]
fn test_execute_runs_through_shell() {
    let config = ArchiveConfig::builder()
        .files(["app"])
        .destination(Some("archive"))
        .execute_cmd(Some("./app --version | grep 1.0"))
        .build(&base())
        .unwrap();

    let execute = config.commands().execute().unwrap();
    assert_eq!(
        execute.args().last().map(String::as_str),
        Some("./app --version | grep 1.0")
    );
}

#[test]
fn test_parse_config_file() {
    let file = ConfigFile::parse(
        r#"
destination = "../archive"
files = ["bin/app", "bin/tool"]
range = "v1.0..HEAD"
build-dir = "build"

[commands]
configure = "cmake .. -DOPT='a b'"
build = ["make", "-j8"]
execute = "./bin/app --smoke"
"#,
    )
    .unwrap();

    assert_eq!(file.files.len(), 2);
    assert_eq!(file.range.as_deref(), Some("v1.0..HEAD"));
    assert_eq!(
        file.commands.build,
        Some(CommandSpec::Argv(vec!["make".to_string(), "-j8".to_string()]))
    );

    let config = ArchiveConfig::builder()
        .config_file(file)
        .build(&base())
        .unwrap();
    assert_eq!(config.commands().configure().args(), ["..", "-DOPT=a b"]);
    assert_eq!(config.commands().build().args(), ["-j8"]);
    assert_eq!(config.build_dir(), base().join("build"));
    assert_eq!(config.range(), Some("v1.0..HEAD"));
}

#[test]
fn test_unknown_keys_are_rejected() {
    assert!(ConfigFile::parse("destinaton = \"x\"").is_err());
    assert!(ConfigFile::parse("[commands]\nrun = \"x\"").is_err());
}

#[test]
fn test_command_line_overrides_file() {
    let file = ConfigFile::parse(
        r#"
destination = "from-file"
files = ["file-artifact"]

[commands]
build = "make"
execute = "./smoke"
"#,
    )
    .unwrap();

    let config = ArchiveConfig::builder()
        .config_file(file)
        .files(["cli-artifact"])
        .destination(Some("from-cli"))
        .build_cmd(Some("ninja"))
        .execute_cmd(Some(""))
        .build(&base())
        .unwrap();

    assert_eq!(config.files(), [base().join("cli-artifact")]);
    assert_eq!(config.destination(), base().join("from-cli"));
    assert_eq!(config.commands().build().program(), "ninja");
    // An empty execute command switches the stage off.
    assert!(config.commands().execute().is_none());
}

#[test]
fn test_load_resolves_relative_to_file() {
    let temp = TempDir::new().unwrap();
    let conf_dir = temp.path().join("conf");
    fs::create_dir(&conf_dir).unwrap();
    let path = conf_dir.join("bibisect.toml");
    fs::write(&path, "destination = \"../archive\"\nfiles = [\"out.bin\"]\n").unwrap();

    let file = ConfigFile::load(&path).unwrap();
    let config = ArchiveConfig::builder()
        .config_file(file)
        .build(Path::new("/elsewhere"))
        .unwrap();

    assert_eq!(config.destination(), normalize_path(temp.path().join("archive"), temp.path()));
    assert_eq!(config.files(), [normalize_path(conf_dir.join("out.bin"), temp.path())]);
}

#[test]
fn test_load_reports_parse_errors() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("broken.toml");
    fs::write(&path, "files = [").unwrap();

    assert!(matches!(
        ConfigFile::load(&path),
        Err(BisectError::ConfigParse { .. })
    ));
}

#[test]
fn test_normalize_path() {
    let normalized = normalize_path("./a/b/../c/./d/../e", &base());
    assert_eq!(normalized, base().join("a/c/e"));

    let normalized = normalize_path("../../other", &base());
    assert!(normalized.is_absolute());
    assert!(normalized.ends_with("other"));
    assert!(!normalized.to_string_lossy().contains(".."));
}
