//! Integration tests for the medlog binary.
//!
//! These tests verify end-to-end behavior including:
//! - Registering medicines
//! - Logging doses and reporting the next dose
//! - Near-match suggestions and interactive registration
//! - Viewing and filtering the log

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Helper to create a test data directory
fn setup_test_dir() -> TempDir {
    tempfile::tempdir().expect("Failed to create temp dir")
}

/// CLI pointed at the temp dir for data and config
fn cli(dir: &Path) -> Command {
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("medlog"));
    cmd.env("XDG_CONFIG_HOME", dir.join("config"))
        .env_remove("RUST_LOG")
        .arg("--meds-dir")
        .arg(dir.join("meds"))
        .arg("--log-file")
        .arg(log_path(dir));
    cmd
}

fn log_path(dir: &Path) -> PathBuf {
    dir.join("logs").join("med.log")
}

fn register(dir: &Path, name: &str, dose: &str, interval: &str, max_per_day: Option<u32>) {
    let mut cmd = cli(dir);
    cmd.arg("register")
        .arg(name)
        .arg("--dose")
        .arg(dose)
        .arg("--interval")
        .arg(interval);
    if let Some(max) = max_per_day {
        cmd.arg("--max-per-day").arg(max.to_string());
    }
    cmd.assert().success();
}

fn log_at(dir: &Path, name: &str, time: &str) {
    cli(dir)
        .args(["log", "-m", name, "-t", time])
        .assert()
        .success();
}

#[test]
fn test_cli_help() {
    let temp_dir = setup_test_dir();
    cli(temp_dir.path())
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Personal medication log and next-dose scheduler",
        ));
}

#[test]
fn test_register_writes_record() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    cli(dir)
        .args([
            "register",
            "Cough Syrup",
            "--dose",
            "30ml",
            "--interval",
            "4:30",
            "--max-per-day",
            "4",
            "--with-meal",
            "yes",
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Registered Cough Syrup"));

    let record = fs::read_to_string(dir.join("meds/cough_syrup.json")).unwrap();
    assert!(record.contains("\"__DECODE_KEY__\": \"Med\""));
    assert!(record.contains("\"seconds\": 16200"));
    assert!(record.contains("\"max_standard_doses_per_day\": 4"));
    assert!(record.contains("\"must_take_with_meal\": true"));
    assert!(record.contains("\"must_take_with_water\": null"));
}

#[test]
fn test_register_rejects_bad_dose() {
    let temp_dir = setup_test_dir();
    cli(temp_dir.path())
        .args(["register", "Aspirin", "--dose", "500 mg", "--interval", "6:00"])
        .assert()
        .failure();
}

#[test]
fn test_register_conflicting_name() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();
    register(dir, "Tylenol PM", "2tab", "8:00", None);

    cli(dir)
        .args(["register", "tylenol-pm", "--dose", "1tab", "--interval", "8:00"])
        .assert()
        .failure();
}

#[test]
fn test_log_appends_line_and_reports_next_dose() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();
    register(dir, "Aspirin", "500mg", "6:00", Some(4));

    cli(dir)
        .args(["log", "-m", "aspirin", "-t", "03-14-2024_08:00"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Logged: 03/14/2024 08:00 Aspirin 500mg"))
        .stdout(predicate::str::contains("next dose: 500mg at"));

    let contents = fs::read_to_string(log_path(dir)).unwrap();
    assert_eq!(contents, "03/14/2024 08:00 Aspirin 500mg\n");
}

#[test]
fn test_log_with_dosage_and_format() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();
    register(dir, "Cough Syrup", "30ml", "4:00", None);

    cli(dir)
        .args([
            "log",
            "-m",
            "Cough Syrup",
            "-d",
            "15ml",
            "-t",
            "2024-03-14 21:15",
            "-f",
            "%Y-%m-%d %H:%M",
        ])
        .assert()
        .success();

    let contents = fs::read_to_string(log_path(dir)).unwrap();
    assert_eq!(contents, "03/14/2024 21:15 Cough Syrup 15ml\n");
}

#[test]
fn test_log_rejects_bad_time() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();
    register(dir, "Aspirin", "500mg", "6:00", None);

    cli(dir)
        .args(["log", "-m", "Aspirin", "-t", "yesterday"])
        .assert()
        .failure();
    assert!(!log_path(dir).exists());
}

#[test]
fn test_log_unknown_medicine_suggests_near_matches() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();
    register(dir, "Aspirin", "500mg", "6:00", None);
    register(dir, "Ibuprofen", "200mg", "6:00", None);

    cli(dir)
        .args(["log", "-m", "aspirn"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Did you mean"))
        .stderr(predicate::str::contains("Aspirin"))
        .stderr(predicate::str::contains("Ibuprofen").not());

    assert!(!log_path(dir).exists());
}

#[test]
fn test_interactive_log_accepts_near_match() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();
    register(dir, "Aspirin", "500mg", "6:00", None);

    // Accept the suggestion, take the default dose and time
    cli(dir)
        .args(["log", "--interactive", "-m", "aspirn"])
        .write_stdin("yes\n\n\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Did you mean Aspirin? (yes/no/stop asking)"))
        .stdout(predicate::str::contains("next dose: 500mg at"));

    let contents = fs::read_to_string(log_path(dir)).unwrap();
    assert!(contents.ends_with(" Aspirin 500mg\n"));
}

#[test]
fn test_interactive_log_declined_match_fails() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();
    register(dir, "Aspirin", "500mg", "6:00", None);

    cli(dir)
        .args(["log", "--interactive", "-m", "aspirn"])
        .write_stdin("no\n")
        .assert()
        .failure();
    assert!(!log_path(dir).exists());
}

#[test]
fn test_interactive_log_registers_unknown_medicine() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    // Register: dose, interval, no cap, unknown meal and water; then default dose and time
    cli(dir)
        .args(["log", "--interactive", "-m", "Cough Syrup"])
        .write_stdin("y\n30ml\n4:00\n\n?\n\n\n\n")
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Do you want to register Cough Syrup? (yes/no): ",
        ))
        .stdout(predicate::str::contains("Should this be taken with water (yes/no/?): "))
        .stdout(predicate::str::contains("Registered Cough Syrup"))
        .stdout(predicate::str::contains("next dose: 30ml at"));

    let record = fs::read_to_string(dir.join("meds/cough_syrup.json")).unwrap();
    assert!(record.contains("\"seconds\": 14400"));
    assert!(record.contains("\"max_standard_doses_per_day\": null"));
    assert!(record.contains("\"must_take_with_meal\": null"));

    let contents = fs::read_to_string(log_path(dir)).unwrap();
    assert!(contents.ends_with(" Cough Syrup 30ml\n"));
}

#[test]
fn test_interactive_log_declined_registration_asks_again() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();
    register(dir, "Aspirin", "500mg", "6:00", None);

    cli(dir)
        .args(["log", "--interactive"])
        .write_stdin("Mystery Pill\nno\nAspirin\n\n\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("Do you want to register Mystery Pill?"));

    assert!(!dir.join("meds/mystery_pill.json").exists());
    let contents = fs::read_to_string(log_path(dir)).unwrap();
    assert!(contents.ends_with(" Aspirin 500mg\n"));
}

#[test]
fn test_interactive_registration_cut_short_fails() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();

    cli(dir)
        .args(["log", "--interactive", "-m", "Cough Syrup"])
        .write_stdin("yes\n30ml\n")
        .assert()
        .failure();

    assert!(!dir.join("meds/cough_syrup.json").exists());
    assert!(!log_path(dir).exists());
}

#[test]
fn test_log_rejects_dosage_unit_starting_with_sign() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();
    register(dir, "Aspirin", "500mg", "6:00", None);

    cli(dir)
        .args(["log", "-m", "Aspirin", "-d", "5-mg"])
        .assert()
        .failure();
    assert!(!log_path(dir).exists());
}

#[test]
fn test_register_rejects_out_of_range_interval() {
    let temp_dir = setup_test_dir();
    cli(temp_dir.path())
        .args([
            "register",
            "Aspirin",
            "--dose",
            "500mg",
            "--interval",
            "9999999999999:00",
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("out of range"));
}

#[test]
fn test_next_without_history() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();
    register(dir, "Aspirin", "500mg", "6:00", Some(4));

    cli(dir)
        .args(["next", "Aspirin"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Aspirin: next dose: 500mg at"));
}

#[test]
fn test_view_filters_by_medicine() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();
    register(dir, "Aspirin", "500mg", "6:00", None);
    register(dir, "Cough Syrup", "30ml", "4:00", None);
    log_at(dir, "Aspirin", "03-14-2024_08:00");
    log_at(dir, "Cough Syrup", "03-14-2024_09:00");
    log_at(dir, "Aspirin", "03-14-2024_14:00");

    // Default command prints everything
    cli(dir)
        .assert()
        .success()
        .stdout(
            "03/14/2024 08:00 Aspirin 500mg\n\
             03/14/2024 09:00 Cough Syrup 30ml\n\
             03/14/2024 14:00 Aspirin 500mg\n",
        );

    cli(dir)
        .args(["view", "-m", "cough syrup"])
        .assert()
        .success()
        .stdout("03/14/2024 09:00 Cough Syrup 30ml\n");
}

#[test]
fn test_view_empty_log() {
    let temp_dir = setup_test_dir();
    cli(temp_dir.path())
        .arg("view")
        .assert()
        .success()
        .stdout(predicate::str::contains("No matching doses logged."));
}

#[test]
fn test_malformed_log_line_strict_and_skipped() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();
    register(dir, "Aspirin", "500mg", "6:00", None);
    log_at(dir, "Aspirin", "03-14-2024_08:00");

    let mut contents = fs::read_to_string(log_path(dir)).unwrap();
    contents.push_str("this is not a dose\n");
    fs::write(log_path(dir), contents).unwrap();

    cli(dir).arg("view").assert().failure();

    let config_dir = dir.join("config/medlog");
    fs::create_dir_all(&config_dir).unwrap();
    fs::write(
        config_dir.join("config.toml"),
        "[log]\nskip_malformed_lines = true\n",
    )
    .unwrap();

    cli(dir)
        .arg("view")
        .assert()
        .success()
        .stdout("03/14/2024 08:00 Aspirin 500mg\n");
}

#[test]
fn test_find_lists_near_matches() {
    let temp_dir = setup_test_dir();
    let dir = temp_dir.path();
    register(dir, "Aspirin", "500mg", "6:00", None);
    register(dir, "Ibuprofen", "200mg", "6:00", None);

    cli(dir)
        .args(["find", "aspirn"])
        .assert()
        .success()
        .stdout("1\tAspirin\n");

    cli(dir)
        .args(["find", "zzz", "--cutoff", "2"])
        .assert()
        .success()
        .stdout(predicate::str::contains("No near matches"));
}
