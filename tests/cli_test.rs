//! CLI smoke tests

use assert_cmd::Command;
use predicates::prelude::*;

fn rightcodes() -> Command {
    let mut cmd = Command::cargo_bin("rightcodes").unwrap();
    cmd.env_remove("RIGHTCODES_TOKEN")
        .env("RIGHTCODES_LOG_DIR", std::env::temp_dir().join("rightcodes-cli-test"));
    cmd
}

#[test]
fn test_help_lists_subcommands() {
    rightcodes()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("dashboard"))
        .stdout(predicate::str::contains("logs"))
        .stdout(predicate::str::contains("doctor"));
}

#[test]
fn test_logs_help_shows_format_values() {
    rightcodes()
        .args(["logs", "--help"])
        .assert()
        .success()
        .stdout(predicate::str::contains("--page-size"))
        .stdout(predicate::str::contains("json"));
}

#[test]
fn test_missing_token_fails_with_hint() {
    let dir = tempfile::tempdir().unwrap();
    rightcodes()
        .current_dir(dir.path())
        .args(["logs", "--format", "json"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("RIGHTCODES_TOKEN"));
}

#[test]
fn test_invalid_range_is_rejected() {
    let dir = tempfile::tempdir().unwrap();
    rightcodes()
        .current_dir(dir.path())
        .args(["dashboard", "--range", "fortnight", "--token", "t"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid range"));
}
