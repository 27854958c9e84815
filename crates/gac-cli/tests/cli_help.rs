use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;

#[test]
fn test_help_shows_all_commands() {
    cargo_bin_cmd!("gac")
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("ask"))
        .stdout(predicate::str::contains("suggest"))
        .stdout(predicate::str::contains("explain"))
        .stdout(predicate::str::contains("chat"))
        .stdout(predicate::str::contains("models"))
        .stdout(predicate::str::contains("render"));
}

#[test]
fn test_no_arguments_prints_help() {
    cargo_bin_cmd!("gac")
        .assert()
        .success()
        .stdout(predicate::str::contains("Usage"))
        .stdout(predicate::str::contains("--no-render"));
}

#[test]
fn test_models_help_shows_subcommands() {
    cargo_bin_cmd!("gac")
        .args(["models", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("list"))
        .stdout(predicate::str::contains("use"));
}

#[test]
fn test_ask_requires_prompt() {
    cargo_bin_cmd!("gac")
        .arg("ask")
        .assert()
        .failure()
        .stderr(predicate::str::contains("PROMPT"));
}

#[test]
fn test_version_flag() {
    cargo_bin_cmd!("gac")
        .arg("--version")
        .assert()
        .success()
        .stdout(predicate::str::contains("1.0"));
}
