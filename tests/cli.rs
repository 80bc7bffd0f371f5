use std::fs;

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use tempfile::tempdir;

fn valid_schedule_json() -> &'static str {
    r#"
{
  "version": 1,
  "term": "2024/2025 Ganjil",
  "schedule": {
    "Senin": [
      {
        "code": "IF2101",
        "name": "Struktur Data",
        "credits": 3,
        "lecturer": { "name": "Budi Santoso", "titles": ["S.Kom", "M.Kom"] },
        "location": { "room": "R.301", "building": "Gedung A" },
        "day": "Senin",
        "start_period": 1,
        "end_period": 2,
        "start_time": "08:00",
        "end_time": "10:00",
        "schedule_type": "Regular"
      }
    ]
  }
}
"#
}

#[test]
fn check_lists_active_course_at_pinned_time() {
    let dir = tempdir().expect("tempdir");
    let schedule = dir.path().join("schedule.json");
    fs::write(&schedule, valid_schedule_json()).expect("write json");

    let mut cmd = cargo_bin_cmd!("classbanner");
    cmd.arg("--check")
        .arg("--schedule")
        .arg(&schedule)
        .arg("--settings")
        .arg(dir.path().join("settings.json"))
        .arg("--at")
        .arg("Senin 09:00")
        .assert()
        .success()
        .stdout(predicate::str::contains("Term: 2024/2025 Ganjil"))
        .stdout(predicate::str::contains("IF2101 Struktur Data 08:00 - 10:00 (2 jam) [active]"))
        .stdout(predicate::str::contains("Berakhir dalam 1 jam"));
}

#[test]
fn check_honours_time_format_flag() {
    let dir = tempdir().expect("tempdir");
    let schedule = dir.path().join("schedule.json");
    fs::write(&schedule, valid_schedule_json()).expect("write json");

    let mut cmd = cargo_bin_cmd!("classbanner");
    cmd.arg("--check")
        .arg("--schedule")
        .arg(&schedule)
        .arg("--settings")
        .arg(dir.path().join("settings.json"))
        .arg("--at")
        .arg("Senin 07:50")
        .arg("--time-format")
        .arg("12")
        .assert()
        .success()
        .stdout(predicate::str::contains("Time format: 12h"))
        .stdout(predicate::str::contains("Segera dimulai"))
        .stdout(predicate::str::contains("Dimulai dalam 10 menit"));
}

#[test]
fn malformed_json_fails_with_clear_error() {
    let dir = tempdir().expect("tempdir");
    let schedule = dir.path().join("schedule.json");
    fs::write(&schedule, "{ not-valid-json ").expect("write invalid json");

    let mut cmd = cargo_bin_cmd!("classbanner");
    cmd.arg("--check")
        .arg("--schedule")
        .arg(schedule)
        .assert()
        .failure()
        .stderr(predicate::str::contains("invalid JSON"));
}

#[test]
fn missing_schedule_fails_check() {
    let dir = tempdir().expect("tempdir");

    let mut cmd = cargo_bin_cmd!("classbanner");
    cmd.arg("--check")
        .arg("--schedule")
        .arg(dir.path().join("absent.json"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("failed to load"));
}

#[test]
fn invalid_pinned_day_is_rejected() {
    let mut cmd = cargo_bin_cmd!("classbanner");
    cmd.arg("--check")
        .arg("--at")
        .arg("Funday 10:00")
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown day 'Funday'"));
}

#[test]
fn live_banner_rerenders_after_stdin_toggle() {
    let dir = tempdir().expect("tempdir");
    let schedule = dir.path().join("schedule.json");
    let settings = dir.path().join("settings.json");
    fs::write(&schedule, valid_schedule_json()).expect("write json");

    let mut cmd = cargo_bin_cmd!("classbanner");
    cmd.arg("--schedule")
        .arg(&schedule)
        .arg("--settings")
        .arg(&settings)
        .arg("--at")
        .arg("Senin 09:00")
        .arg("--run-secs")
        .arg("2")
        .write_stdin("12\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("[09:00]"))
        .stdout(predicate::str::contains("[9:00 AM]"))
        .stdout(predicate::str::contains("8:00 AM - 10:00 AM"));

    let persisted = fs::read_to_string(&settings).expect("settings written");
    assert!(persisted.contains(r#""time_format": "12""#));
}

#[test]
fn idle_live_banner_prints_nothing() {
    let dir = tempdir().expect("tempdir");
    let schedule = dir.path().join("schedule.json");
    fs::write(&schedule, valid_schedule_json()).expect("write json");

    let mut cmd = cargo_bin_cmd!("classbanner");
    cmd.arg("--schedule")
        .arg(&schedule)
        .arg("--settings")
        .arg(dir.path().join("settings.json"))
        .arg("--at")
        .arg("Senin 07:30")
        .arg("--run-secs")
        .arg("1")
        .write_stdin("")
        .assert()
        .success()
        .stdout(predicate::str::is_empty());
}
