//! Config discovery against real files on disk.

use assert_fs::prelude::*;
use codepost_core::{
    config::{self, EnvVars, DEFAULT_BASE_URL},
    ConfigError, KeySource,
};
use predicates::prelude::predicate;

const KEY: &str = "0123456789abcdef0123456789abcdef01234567";

fn layout() -> (assert_fs::TempDir, assert_fs::TempDir) {
    let home = assert_fs::TempDir::new().expect("home");
    let root = assert_fs::TempDir::new().expect("root");
    root.child("course/work").create_dir_all().expect("mkdir");
    (home, root)
}

// ---------------------------------------------------------------------------
// 1. Source precedence
// ---------------------------------------------------------------------------

#[test]
fn key_from_working_directory_file() {
    let (home, root) = layout();
    let cfg_file = root.child("course/work/codepost-config.yaml");
    cfg_file.write_str(&format!("api_key: {KEY}\n")).expect("write");

    let cwd = root.child("course/work");
    let cfg = config::discover_at(home.path(), cwd.path(), &EnvVars::default(), None)
        .expect("discover");
    assert_eq!(cfg.api_key.expose(), KEY);
    assert_eq!(cfg.source, KeySource::File(cfg_file.path().to_path_buf()));
    assert_eq!(cfg.base_url, DEFAULT_BASE_URL);
}

#[test]
fn hidden_file_in_home_is_found() {
    let (home, root) = layout();
    home.child(".codepost-config.yaml")
        .write_str(&format!("api_key: {KEY}\nbase_url: https://staging.example.edu/\n"))
        .expect("write");

    let cwd = root.child("course/work");
    let cfg = config::discover_at(home.path(), cwd.path(), &EnvVars::default(), None)
        .expect("discover");
    assert!(matches!(cfg.source, KeySource::File(ref p) if p.ends_with(".codepost-config.yaml")));
    assert_eq!(cfg.base_url, "https://staging.example.edu");
}

#[test]
fn parent_directory_is_searched_last() {
    let (home, root) = layout();
    root.child("course/codepost-config.yaml")
        .write_str(&format!("api_key: {KEY}\n"))
        .expect("write");

    let cwd = root.child("course/work");
    let cfg = config::discover_at(home.path(), cwd.path(), &EnvVars::default(), None)
        .expect("discover");
    assert_eq!(cfg.api_key.expose(), KEY);
}

#[test]
fn environment_key_beats_config_file_but_file_base_url_still_applies() {
    let (home, root) = layout();
    root.child("course/work/codepost-config.yaml")
        .write_str("api_key: from-file\nbase_url: http://localhost:9000\n")
        .expect("write");

    let env = EnvVars {
        api_key: Some(KEY.to_string()),
        base_url: None,
    };
    let cwd = root.child("course/work");
    let cfg = config::discover_at(home.path(), cwd.path(), &env, None).expect("discover");
    assert_eq!(cfg.source, KeySource::Environment);
    assert_eq!(cfg.api_key.expose(), KEY);
    assert_eq!(cfg.base_url, "http://localhost:9000");
}

#[test]
fn environment_base_url_beats_file_base_url() {
    let (home, root) = layout();
    root.child("course/work/codepost-config.yaml")
        .write_str(&format!("api_key: {KEY}\nbase_url: http://from-file\n"))
        .expect("write");

    let env = EnvVars {
        api_key: None,
        base_url: Some("http://from-env".to_string()),
    };
    let cwd = root.child("course/work");
    let cfg = config::discover_at(home.path(), cwd.path(), &env, None).expect("discover");
    assert_eq!(cfg.base_url, "http://from-env");
}

// ---------------------------------------------------------------------------
// 2. Error reporting
// ---------------------------------------------------------------------------

#[test]
fn empty_api_key_reports_the_file() {
    let (home, root) = layout();
    let cfg_file = root.child("course/work/.codepost-config.yaml");
    cfg_file.write_str("api_key: \"\"\n").expect("write");

    let cwd = root.child("course/work");
    let err = config::discover_at(home.path(), cwd.path(), &EnvVars::default(), None)
        .unwrap_err();
    assert!(matches!(err, ConfigError::EmptyApiKey { .. }), "got: {err}");
    assert!(err.to_string().contains(".codepost-config.yaml"));
}

#[test]
fn corrupt_yaml_returns_parse_error_with_path() {
    let (home, root) = layout();
    root.child("course/work/codepost-config.yaml")
        .write_str(": : corrupt : yaml : !!!\n  - broken: [unclosed")
        .expect("write");

    let cwd = root.child("course/work");
    let err = config::discover_at(home.path(), cwd.path(), &EnvVars::default(), None)
        .unwrap_err();
    assert!(matches!(err, ConfigError::Parse { .. }), "got: {err}");
    assert!(err.to_string().contains("codepost-config.yaml"));
}

#[test]
fn discovery_never_writes_files() {
    let (home, root) = layout();
    let cwd = root.child("course/work");
    let _ = config::discover_at(home.path(), cwd.path(), &EnvVars::default(), None);
    home.child("codepost-config.yaml")
        .assert(predicate::path::missing());
    cwd.child("codepost-config.yaml")
        .assert(predicate::path::missing());
}
