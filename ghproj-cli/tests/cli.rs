use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

/// Command with no token and no config file, so nothing can reach GitHub
fn ghproj_cmd(home: &TempDir) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("ghproj"));
    cmd.env_remove("GITHUB_TOKEN")
        .env_remove("GH_TOKEN")
        .env_remove("GHPROJ_API_URL")
        .env_remove("GHPROJ_CONCURRENCY")
        .env_remove("RUST_LOG")
        .env("HOME", home.path())
        .env("XDG_CONFIG_HOME", home.path());
    cmd
}

fn write_bundle(dir: &TempDir, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join("bundle.json");
    std::fs::write(&path, contents).unwrap();
    path
}

const VALID_BUNDLE: &str = r#"{
  "metadata": {"formatVersion": "1.0", "exportedBy": "octocat", "toolVersion": "0.1.0"},
  "project": {"title": "Launch"}
}"#;

// =============================================================================
// Basic CLI
// =============================================================================

#[test]
fn test_help() {
    let home = TempDir::new().unwrap();
    ghproj_cmd(&home)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("export"))
        .stdout(predicate::str::contains("import"));
}

#[test]
fn test_version_command() {
    let home = TempDir::new().unwrap();
    ghproj_cmd(&home)
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains("ghproj"));
}

#[test]
fn test_config_command() {
    let home = TempDir::new().unwrap();
    ghproj_cmd(&home)
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("api_url: https://api.github.com/graphql"))
        .stdout(predicate::str::contains("concurrency: 1"))
        .stdout(predicate::str::contains("Token: not found"));
}

#[test]
fn test_api_url_from_env() {
    let home = TempDir::new().unwrap();
    ghproj_cmd(&home)
        .env("GHPROJ_API_URL", "https://ghe.example.com/api/graphql")
        .arg("config")
        .assert()
        .success()
        .stdout(predicate::str::contains("ghe.example.com"));
}

// =============================================================================
// Validation before any network call
// =============================================================================

#[test]
fn test_reversed_range_is_rejected() {
    let home = TempDir::new().unwrap();
    ghproj_cmd(&home)
        .args(["item", "delete-bulk", "octocat/1", "--items", "6-5"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("start 6 is greater than end 5"));
}

#[test]
fn test_bulk_needs_a_source() {
    let home = TempDir::new().unwrap();
    ghproj_cmd(&home)
        .args(["item", "archive-bulk", "octocat/1"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("No items selected"));
}

#[test]
fn test_unknown_filter_key() {
    let home = TempDir::new().unwrap();
    ghproj_cmd(&home)
        .args([
            "item",
            "update-bulk",
            "octocat/1",
            "--field",
            "Status",
            "--value",
            "Done",
            "--filter",
            "milestone:v1",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown filter key 'milestone'"));
}

#[test]
fn test_bare_issue_number_in_project_position() {
    let home = TempDir::new().unwrap();
    ghproj_cmd(&home)
        .args(["export", "octocat"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Expected owner/number"));
}

#[test]
fn test_invalid_strategy_is_rejected() {
    let home = TempDir::new().unwrap();
    let bundle = write_bundle(&home, VALID_BUNDLE);
    ghproj_cmd(&home)
        .args(["import", "--owner", "octocat", "--strategy", "overwrite", "--file"])
        .arg(&bundle)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown merge strategy 'overwrite'"));
}

#[test]
fn test_unparseable_bundle_is_rejected() {
    let home = TempDir::new().unwrap();
    let bundle = write_bundle(&home, "{ this is not: [a bundle");
    ghproj_cmd(&home)
        .args(["import", "--owner", "octocat", "--file"])
        .arg(&bundle)
        .assert()
        .failure()
        .stderr(predicate::str::contains("Invalid bundle"));
}

#[test]
fn test_bundle_without_title_is_rejected() {
    let home = TempDir::new().unwrap();
    let bundle = write_bundle(&home, r#"{"project": {"owner": "octocat"}}"#);
    ghproj_cmd(&home)
        .args(["import", "--owner", "octocat", "--file"])
        .arg(&bundle)
        .assert()
        .failure()
        .stderr(predicate::str::contains("title"));
}

#[test]
fn test_valid_input_then_missing_token() {
    let home = TempDir::new().unwrap();
    let bundle = write_bundle(&home, VALID_BUNDLE);
    ghproj_cmd(&home)
        .args(["import", "--owner", "octocat", "--dry-run", "--file"])
        .arg(&bundle)
        .assert()
        .failure()
        .stderr(predicate::str::contains("GitHub token not found"));
}
