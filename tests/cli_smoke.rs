#![allow(clippy::unwrap_used)]
//! CLI smoke tests to verify basic command functionality.
//!
//! These tests ensure that the CLI binary starts correctly and
//! responds to basic commands without crashing. Each run points the
//! config lookup at an empty temporary directory.

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use tempfile::TempDir;

#[allow(deprecated)]
fn tl(config_home: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("tl").unwrap();
    cmd.env("XDG_CONFIG_HOME", config_home.path())
        .env("XDG_CACHE_HOME", config_home.path().join("cache"))
        .env_remove("RUST_LOG");
    cmd
}

#[test]
fn test_help_displays_usage() {
    let home = TempDir::new().unwrap();
    tl(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("Cached, batched translation CLI tool"))
        .stdout(predicate::str::contains("--from"))
        .stdout(predicate::str::contains("--to"))
        .stdout(predicate::str::contains("--cache-dir"))
        .stdout(predicate::str::contains("feed"));
}

#[test]
fn test_version_displays_version() {
    let home = TempDir::new().unwrap();
    tl(&home)
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn test_languages_list() {
    let home = TempDir::new().unwrap();
    tl(&home)
        .arg("languages")
        .assert()
        .success()
        .stdout(predicate::str::contains("en"))
        .stdout(predicate::str::contains("ja"))
        .stdout(predicate::str::contains("fr"));
}

#[test]
fn test_feed_writes_cache_file() {
    let home = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();

    tl(&home)
        .args(["--from", "en", "--to", "fr", "--quiet", "--cache-dir"])
        .arg(cache.path())
        .args(["feed", "Hello", "Bonjour"])
        .assert()
        .success();

    let content = fs::read_to_string(cache.path().join("EN_FR.cache")).unwrap();
    assert_eq!(content, "Hello\nBonjour\n");
}

#[test]
fn test_feed_conflict_fails_without_overwrite() {
    let home = TempDir::new().unwrap();
    let cache = TempDir::new().unwrap();
    let feed = |translation: &str, overwrite: bool| {
        let mut cmd = tl(&home);
        cmd.args(["--from", "en", "--to", "fr", "--cache-dir"])
            .arg(cache.path())
            .args(["feed", "Hello", translation]);
        if overwrite {
            cmd.arg("--overwrite");
        }
        cmd.assert()
    };

    feed("Bonjour", false).success();
    feed("Salut", false)
        .failure()
        .stderr(predicate::str::contains("already exists"));
    feed("Salut", true).success();

    let content = fs::read_to_string(cache.path().join("EN_FR.cache")).unwrap();
    assert_eq!(content, "Hello\nBonjour\nHello\nSalut\n");
}

#[test]
fn test_invalid_language_code() {
    let home = TempDir::new().unwrap();
    tl(&home)
        .args(["--from", "en", "--to", "invalid_lang_xyz"])
        .write_stdin("hello")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unsupported language code"));
}

#[test]
fn test_translate_without_provider_fails() {
    let home = TempDir::new().unwrap();
    tl(&home)
        .args(["--from", "en", "--to", "fr"])
        .write_stdin("hello")
        .assert()
        .failure()
        .stderr(predicate::str::contains("'provider'"));
}

#[test]
fn test_feed_help() {
    let home = TempDir::new().unwrap();
    tl(&home)
        .args(["feed", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--overwrite"))
        .stdout(predicate::str::contains("--from"));
}
