use assert_cmd::prelude::*;
use rstest::rstest;
use std::fs;
use std::path::PathBuf;
use std::process::Command;
use tempfile::tempdir;

fn write_valid_config(dir: &tempfile::TempDir) -> PathBuf {
    let toml = r#"
[serial]
read_timeout_ms = 50

[ui]
poll_ms = 20
"#;
    let path = dir.path().join("cfg.toml");
    fs::write(&path, toml).unwrap();
    path
}

fn json_lines(stdout: &[u8]) -> Vec<serde_json::Value> {
    String::from_utf8_lossy(stdout)
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(|l| serde_json::from_str(l).unwrap_or_else(|e| panic!("not JSON: {l:?}: {e}")))
        .collect()
}

/// Every stdout line of a JSON monitor run is an object with a `type`.
#[rstest]
fn jsonl_monitor_schema() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = Command::cargo_bin("copconsole").unwrap();
    cmd.arg("--json")
        .arg("--config")
        .arg(&cfg)
        .args(["--sim", "monitor", "--stream", "cop", "--duration-s", "1"]);
    let out = cmd.output().unwrap();
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));

    let lines = json_lines(&out.stdout);
    assert!(lines.iter().all(|v| v["type"].is_string()));

    let cops: Vec<_> = lines.iter().filter(|v| v["type"] == "cop").collect();
    assert!(!cops.is_empty());
    for v in &cops {
        let x = v["x"].as_f64().unwrap();
        let y = v["y"].as_f64().unwrap();
        assert!((-1.0..=1.0).contains(&x) && (-1.0..=1.0).contains(&y));
    }
    assert!(
        lines
            .iter()
            .any(|v| v["type"] == "log" && v["message"] == "Sent: c")
    );

    let summary = lines.last().unwrap();
    assert_eq!(summary["type"], "summary");
    assert!(summary["frames"].as_u64().unwrap() >= cops.len() as u64);
    assert!(summary["last_cop"].is_array());
}

/// Errors in JSON mode are a single object on stdout with a stable reason.
#[rstest]
fn jsonl_error_schema() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = Command::cargo_bin("copconsole").unwrap();
    cmd.arg("--json")
        .arg("--config")
        .arg(&cfg)
        .args(["--sim", "calibrate", "--weight", "ten"]);
    let out = cmd.output().unwrap();
    assert_eq!(out.status.code(), Some(5));

    let lines = json_lines(&out.stdout);
    let err = lines.last().unwrap();
    assert_eq!(err["reason"], "InvalidCommandInput");
    assert!(
        err["message"]
            .as_str()
            .unwrap()
            .contains("Invalid calibration weight")
    );
}

#[rstest]
fn jsonl_ports_schema() {
    let dir = tempdir().unwrap();
    let cfg = write_valid_config(&dir);

    let mut cmd = Command::cargo_bin("copconsole").unwrap();
    cmd.arg("--json").arg("--config").arg(&cfg).args(["--sim", "ports"]);
    let out = cmd.output().unwrap();
    assert!(out.status.success());
    let lines = json_lines(&out.stdout);
    assert_eq!(lines.last().unwrap()["ports"], serde_json::json!(["sim0"]));
}
