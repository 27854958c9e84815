use std::fs;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::tempdir;

#[test]
fn test_config_path_command() {
    let dir = tempdir().unwrap();

    cargo_bin_cmd!("gac")
        .env("GAC_HOME", dir.path())
        .args(["config", "path"])
        .assert()
        .success()
        .stdout(predicate::str::contains("config.toml"));
}

#[test]
fn test_config_init_creates_file() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");

    assert!(!config_path.exists());

    cargo_bin_cmd!("gac")
        .env("GAC_HOME", dir.path())
        .args(["config", "init"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Created config at"));

    assert!(config_path.exists());

    let contents = fs::read_to_string(&config_path).unwrap();
    assert!(contents.contains("model ="));
    assert!(contents.contains("[markdown_styles]"));
    assert!(contents.contains("# code_gutter ="));
}

#[test]
fn test_config_init_fails_if_exists() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");

    fs::write(&config_path, "# existing config").unwrap();

    cargo_bin_cmd!("gac")
        .env("GAC_HOME", dir.path())
        .args(["config", "init"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("already exists"));
}

#[test]
fn test_config_path_works_with_broken_config() {
    let dir = tempdir().unwrap();
    fs::write(dir.path().join("config.toml"), "model = [unclosed").unwrap();

    cargo_bin_cmd!("gac")
        .env("GAC_HOME", dir.path())
        .args(["config", "path"])
        .assert()
        .success();

    cargo_bin_cmd!("gac")
        .env("GAC_HOME", dir.path())
        .args(["config", "show"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Failed to parse config"));
}

#[test]
fn test_config_set_then_get() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");

    cargo_bin_cmd!("gac")
        .env("GAC_HOME", dir.path())
        .args(["config", "set", "max_tokens", "1024"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Updated max_tokens in"));

    cargo_bin_cmd!("gac")
        .env("GAC_HOME", dir.path())
        .args(["config", "set", "markdown_styles.code_border", "false"])
        .assert()
        .success();

    let contents = fs::read_to_string(&config_path).unwrap();
    assert!(contents.contains("max_tokens = 1024"));
    assert!(contents.contains("code_border = false"));
    // template comments survive edits
    assert!(contents.contains("# Sampling temperature"));

    cargo_bin_cmd!("gac")
        .env("GAC_HOME", dir.path())
        .args(["config", "get", "max_tokens"])
        .assert()
        .success()
        .stdout("1024\n");

    cargo_bin_cmd!("gac")
        .env("GAC_HOME", dir.path())
        .args(["config", "get", "markdown_styles.code_border"])
        .assert()
        .success()
        .stdout("false\n");
}

#[test]
fn test_config_get_string_prints_raw() {
    let dir = tempdir().unwrap();

    cargo_bin_cmd!("gac")
        .env("GAC_HOME", dir.path())
        .args(["config", "get", "model"])
        .assert()
        .success()
        .stdout("gpt4all\n");
}

#[test]
fn test_config_get_unknown_key_fails() {
    let dir = tempdir().unwrap();

    cargo_bin_cmd!("gac")
        .env("GAC_HOME", dir.path())
        .args(["config", "get", "no_such_key"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown config key: no_such_key"));
}

#[test]
fn test_config_set_rejects_wrong_type() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");

    cargo_bin_cmd!("gac")
        .env("GAC_HOME", dir.path())
        .args(["config", "set", "max_tokens", "lots"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid value for max_tokens"));

    assert!(!config_path.exists());
}

#[test]
fn test_config_show_masks_api_key() {
    let dir = tempdir().unwrap();
    fs::write(
        dir.path().join("config.toml"),
        "api_key = \"sk-secret\"\nmodel = \"mistral\"\n",
    )
    .unwrap();

    cargo_bin_cmd!("gac")
        .env("GAC_HOME", dir.path())
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("Config file:"))
        .stdout(predicate::str::contains("model = \"mistral\""))
        .stdout(predicate::str::contains("sk-secret").not());
}

#[test]
fn test_models_use_sets_default() {
    let dir = tempdir().unwrap();
    let config_path = dir.path().join("config.toml");

    cargo_bin_cmd!("gac")
        .env("GAC_HOME", dir.path())
        .args(["models", "use", "Llama 3 8B Instruct"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Default model set to \"Llama 3 8B Instruct\".",
        ));

    let contents = fs::read_to_string(&config_path).unwrap();
    assert!(contents.contains("model = \"Llama 3 8B Instruct\""));
}

#[test]
fn test_config_help_shows_subcommands() {
    cargo_bin_cmd!("gac")
        .args(["config", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("path"))
        .stdout(predicate::str::contains("init"))
        .stdout(predicate::str::contains("get"))
        .stdout(predicate::str::contains("set"));
}
