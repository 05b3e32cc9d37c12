use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn tsk(repo: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("tsk").expect("binary");
    cmd.env("TSK_REPO", repo.path().join("tasks"));
    cmd
}

#[test]
fn version_prints_crate_version() {
    let repo = TempDir::new().expect("tempdir");
    tsk(&repo)
        .arg("version")
        .assert()
        .success()
        .stdout(predicate::str::contains(env!("CARGO_PKG_VERSION")));
}

#[test]
fn bare_invocation_bootstraps_and_lists_nothing() {
    let repo = TempDir::new().expect("tempdir");
    tsk(&repo).assert().success();
    assert!(repo.path().join("tasks").join(".git").exists());
}

#[test]
fn duplicate_due_filter_is_a_user_error() {
    let repo = TempDir::new().expect("tempdir");
    tsk(&repo)
        .args(["next", "due:2026-01-01", "due:2026-01-02"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("Duplicate due filter"));
}

#[test]
fn unknown_handle_is_a_user_error() {
    let repo = TempDir::new().expect("tempdir");
    tsk(&repo).assert().success();
    tsk(&repo)
        .args(["999", "done"])
        .assert()
        .failure()
        .code(2)
        .stderr(predicate::str::contains("No task found"));
}

#[test]
fn json_flag_emits_envelope() {
    let repo = TempDir::new().expect("tempdir");
    tsk(&repo)
        .args(["--json", "add", "first task"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"schema_version\": \"tsk.v1\""))
        .stdout(predicate::str::contains("\"command\": \"add\""));
}
