//! CLI behavior tests for the `backfill` binary.
//!
//! These exercise the cursor-only commands and argument validation; nothing
//! here needs Postgres, an orchestrator, or a container runtime.

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn backfill() -> Command {
    let mut cmd = Command::cargo_bin("backfill").expect("binary builds");
    // Keep a stray .env or exported variables from leaking into assertions.
    cmd.env_remove("DATABASE_URL")
        .env_remove("ORCHESTRATOR_URL")
        .env_remove("EMBEDDER_URL");
    cmd
}

fn cursor_arg(dir: &TempDir) -> String {
    dir.path().join("cursor.json").display().to_string()
}

#[test]
fn help_lists_the_three_subcommands() {
    backfill()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("run"))
        .stdout(predicate::str::contains("status"))
        .stdout(predicate::str::contains("reset-cursor"));
}

#[test]
fn status_without_a_cursor_reports_a_fresh_start() {
    let dir = TempDir::new().expect("temp dir");

    backfill()
        .current_dir(dir.path())
        .args(["status", "--cursor-file", &cursor_arg(&dir)])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "No cursor found. Backfill will start from the beginning.",
        ));
}

#[test]
fn status_prints_every_field_of_a_saved_cursor() {
    let dir = TempDir::new().expect("temp dir");
    let cursor_file = dir.path().join("cursor.json");
    // The documented checkpoint format, as a resumed run would find it.
    std::fs::write(
        &cursor_file,
        r#"{
  "version": 1,
  "last_created_at": "2025-03-01T08:30:00Z",
  "last_id": "article-123",
  "current_date": "2025-03-01",
  "processed_count": 1500,
  "updated_at": "2025-03-02T10:00:00Z"
}"#,
    )
    .expect("write cursor");

    backfill()
        .current_dir(dir.path())
        .args(["status", "--cursor-file", &cursor_file.display().to_string()])
        .assert()
        .success()
        .stdout(predicate::str::contains("2025-03-01T08:30:00"))
        .stdout(predicate::str::contains("article-123"))
        .stdout(predicate::str::contains("2025-03-01"))
        .stdout(predicate::str::contains("1500"));
}

#[test]
fn status_on_a_corrupt_cursor_fails_and_names_the_way_out() {
    let dir = TempDir::new().expect("temp dir");
    let cursor_file = dir.path().join("cursor.json");
    std::fs::write(&cursor_file, "{ definitely not json").expect("write cursor");

    backfill()
        .current_dir(dir.path())
        .args(["status", "--cursor-file", &cursor_file.display().to_string()])
        .assert()
        .failure()
        .stderr(predicate::str::contains("reset-cursor"));
}

#[test]
fn reset_cursor_then_status_round_trips_to_a_fresh_start() {
    let dir = TempDir::new().expect("temp dir");
    let cursor_file = dir.path().join("cursor.json");

    backfill()
        .current_dir(dir.path())
        .args([
            "reset-cursor",
            "--cursor-file",
            &cursor_file.display().to_string(),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Cursor reset"));

    assert!(cursor_file.exists(), "reset persists an empty cursor file");

    backfill()
        .current_dir(dir.path())
        .args(["status", "--cursor-file", &cursor_file.display().to_string()])
        .assert()
        .success()
        .stdout(predicate::str::contains("No cursor found"));
}

#[test]
fn reset_cursor_recovers_a_corrupt_file() {
    let dir = TempDir::new().expect("temp dir");
    let cursor_file = dir.path().join("cursor.json");
    std::fs::write(&cursor_file, "garbage").expect("write cursor");

    backfill()
        .current_dir(dir.path())
        .args([
            "reset-cursor",
            "--cursor-file",
            &cursor_file.display().to_string(),
        ])
        .assert()
        .success();

    backfill()
        .current_dir(dir.path())
        .args(["status", "--cursor-file", &cursor_file.display().to_string()])
        .assert()
        .success()
        .stdout(predicate::str::contains("No cursor found"));
}

#[test]
fn run_without_database_url_fails_before_doing_anything() {
    let dir = TempDir::new().expect("temp dir");

    backfill()
        .current_dir(dir.path())
        .args(["run", "--cursor-file", &cursor_arg(&dir)])
        .assert()
        .failure()
        .stderr(predicate::str::contains("DATABASE_URL"));

    assert!(
        !dir.path().join("cursor.json").exists(),
        "a rejected run must not create a cursor"
    );
}

#[test]
fn run_rejects_an_inverted_date_range() {
    let dir = TempDir::new().expect("temp dir");

    backfill()
        .current_dir(dir.path())
        .env("DATABASE_URL", "postgres://user:pw@localhost/articles")
        .args([
            "run",
            "--from",
            "2025-06-02",
            "--to",
            "2025-06-01",
            "--cursor-file",
            &cursor_arg(&dir),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("is after"));
}

#[test]
fn run_rejects_a_malformed_date() {
    backfill()
        .args(["run", "--from", "June 1st"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("YYYY-MM-DD"));
}
