use assert_cmd::prelude::*;
use predicates::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

// Fast polling so sim runs finish quickly
fn write_valid_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = format!(
        r#"
[serial]
read_timeout_ms = 50

[ui]
poll_ms = 20

[data_log]
dir = "{}"
"#,
        dir.path().join("data").display()
    );
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

#[rstest]
#[case(&["--help"], 0, "Usage:", "stdout")]
#[case(&["--sim", "ports"], 0, "sim0", "stdout")]
#[case(&["--sim", "self-check"], 0, "OK", "stdout")]
#[case(&["--sim", "send", "tare"], 0, "Sent: z", "stdout")]
#[case(&["--sim", "send", "explode"], 5, "Unknown command", "stderr")]
#[case(&["--sim", "send", "--port", "sim9", "tare"], 3, "Could not open sim9", "stderr")]
#[case(&["--sim", "calibrate", "--weight", "heavy"], 5, "Invalid calibration weight", "stderr")]
#[case(&["--sim", "calibrate", "--weight", "5"], 0, "Sent calibration weight: 5", "stdout")]
#[case(&["--sim", "monitor", "--duration-s", "1"], 0, "Frames:", "stdout")]
#[case(&["--sim", "send"], 2, "required", "stderr")]
fn cli_table_cases(
    #[case] args: &[&str],
    #[case] exit_code: i32,
    #[case] needle: &str,
    #[case] stream: &str,
) {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = Command::cargo_bin("copconsole").unwrap();

    // Always include a valid config to avoid relying on default path
    cmd.arg("--config").arg(&cfg);
    for a in args {
        cmd.arg(a);
    }

    let assert = cmd.assert().code(exit_code);
    match stream {
        "stdout" => {
            assert.stdout(predicate::str::contains(needle));
        }
        "stderr" => {
            assert.stderr(predicate::str::contains(needle));
        }
        other => panic!("unknown stream: {other}"),
    }
}

#[rstest]
fn monitor_prints_weight_frames_and_closes() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = Command::cargo_bin("copconsole").unwrap();
    cmd.arg("--config")
        .arg(&cfg)
        .args(["--sim", "monitor", "--duration-s", "1"]);

    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Successfully connected to sim0."))
        .stdout(predicate::str::contains("A="))
        .stdout(predicate::str::contains("CoP x="))
        .stdout(predicate::str::contains("Serial connection closed."));
}

#[rstest]
fn monitor_records_data_log() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = Command::cargo_bin("copconsole").unwrap();
    cmd.arg("--config")
        .arg(&cfg)
        .args(["--sim", "monitor", "--duration-s", "1", "--log-data"]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("Recording weight frames to"));

    let files: Vec<_> = fs::read_dir(dir.path().join("data"))
        .unwrap()
        .map(|e| e.unwrap().path())
        .collect();
    assert_eq!(files.len(), 1);
    let text = fs::read_to_string(&files[0]).unwrap();
    let mut lines = text.lines();
    assert!(lines.next().unwrap().starts_with("# Data log started at: "));
    assert_eq!(lines.next(), Some("# Serial Port: sim0, Baud Rate: 9600"));
    assert!(text.contains("] -> X: "));
}

#[rstest]
#[case("[serial]\nbaud_rate = 0\n", "baud_rate")]
#[case("[ui]\npoll_ms = 0\n", "poll_ms")]
#[case("[trail]\nsource = \"sideways\"\n", "sideways")]
fn cli_rejects_bad_config(#[case] toml: &str, #[case] needle: &str) {
    let dir = tempdir().unwrap();
    let cfg = dir.path().join("bad.toml");
    fs::write(&cfg, toml).unwrap();

    let mut cmd = Command::cargo_bin("copconsole").unwrap();
    cmd.arg("--config").arg(&cfg).args(["--sim", "ports"]);

    cmd.assert()
        .code(6)
        .stderr(predicate::str::contains("Invalid configuration"))
        .stderr(predicate::str::contains(needle));
}

#[rstest]
fn missing_config_uses_defaults() {
    let dir = tempdir().unwrap();
    let mut cmd = Command::cargo_bin("copconsole").unwrap();
    cmd.arg("--config")
        .arg(dir.path().join("absent.toml"))
        .args(["--sim", "ports"]);
    cmd.assert().success().stdout(predicate::str::contains("sim0"));
}

#[cfg(not(feature = "hardware"))]
#[rstest]
fn serial_backend_requires_hardware_feature() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);
    let mut cmd = Command::cargo_bin("copconsole").unwrap();
    cmd.arg("--config").arg(&cfg).args(["send", "tare"]);
    cmd.assert()
        .code(6)
        .stderr(predicate::str::contains("--features hardware"));
}
