//! Integration tests for output formatting
//!
//! These tests run the `lidarprep` binary and verify its JSON output and exit codes.

use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

fn lidarprep(args: &[&str], cwd: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_lidarprep"))
        .args(args)
        .current_dir(cwd)
        .env_remove("LIDARPREP_WORKERS")
        .env_remove("LIDARPREP_LOG_DIR")
        .output()
        .expect("Failed to execute command")
}

#[test]
fn test_downsample_json_output_is_valid() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in");
    let output_dir = dir.path().join("out");
    fs::create_dir(&input).unwrap();
    fs::write(
        input.join("a.txt"),
        "3\n1\t10.0\t20.0\t5.0\n2\t10.1\t20.1\t5.1\n3\t50.0\t60.0\t9.0\n",
    )
    .unwrap();

    let output = lidarprep(
        &[
            "downsample",
            "--method",
            "grid",
            "--param",
            "1.0",
            "--input",
            input.to_str().unwrap(),
            "--output",
            output_dir.to_str().unwrap(),
            "--json",
        ],
        dir.path(),
    );
    assert!(output.status.success(), "Command should succeed");

    let stdout = String::from_utf8_lossy(&output.stdout);
    let parsed: serde_json::Value =
        serde_json::from_str(&stdout).expect("Output should be valid JSON");

    assert_eq!(parsed.get("status").and_then(|v| v.as_str()), Some("success"));
    let summary = &parsed["data"]["summary"];
    assert_eq!(summary["total"], 1);
    assert_eq!(summary["done"], 1);
    assert_eq!(parsed["data"]["cancelled"], false);

    assert_eq!(
        fs::read_to_string(output_dir.join("downsampled_a.txt")).unwrap(),
        "2\n1\t10.0\t20.0\t5.0\n2\t50.0\t60.0\t9.0\n"
    );
}

#[test]
fn test_missing_input_directory_fails() {
    let dir = TempDir::new().unwrap();
    let output = lidarprep(
        &["downsample", "--method", "count", "--input", "missing", "--output", "out"],
        dir.path(),
    );

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Input directory not found"));
    assert!(!dir.path().join("out").exists());
}

#[test]
fn test_unknown_method_is_rejected() {
    let dir = TempDir::new().unwrap();
    let output = lidarprep(
        &["downsample", "--method", "voxel", "--input", ".", "--output", "out"],
        dir.path(),
    );

    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("voxel"));
}

#[test]
fn test_config_json_lists_sources() {
    let dir = TempDir::new().unwrap();
    fs::write(dir.path().join("lidarprep.toml"), "workers = 2\n").unwrap();

    let output = lidarprep(&["config", "--json"], dir.path());
    assert!(output.status.success());

    let parsed: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("Output should be valid JSON");
    let entries = parsed["data"].as_array().expect("data should be a list");

    let workers = entries.iter().find(|e| e["key"] == "workers").expect("workers entry");
    assert_eq!(workers["value"], "2");
    assert_eq!(workers["source"], "File");
}

#[test]
fn test_convert_json_output() {
    let dir = TempDir::new().unwrap();
    let track = dir.path().join("raw").join("track01");
    fs::create_dir_all(&track).unwrap();
    fs::write(
        track.join("gt1l.csv"),
        "lat_ph,lon_ph,h_ph,classification,signal_conf_ph,beam_strength\n\
         30.5,100.25,1200.5,1,4,strong\n\
         30.6,100.35,1201.5,1,4,weak\n",
    )
    .unwrap();

    let output = lidarprep(&["convert", "--input", "raw", "--output", "txt", "--json"], dir.path());
    assert!(output.status.success());

    let parsed: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("Output should be valid JSON");
    assert_eq!(parsed["data"]["converted"], 1);
    assert_eq!(
        fs::read_to_string(dir.path().join("txt").join("track01.txt")).unwrap(),
        "1\n1\t30.5\t100.25\t1200.5\n"
    );
}

#[test]
fn test_downsample_without_param_uses_method_default() {
    let dir = TempDir::new().unwrap();
    let input = dir.path().join("in");
    fs::create_dir(&input).unwrap();
    fs::write(input.join("a.txt"), "2\n1\t10.0\t20.0\t5.0\n2\t50.0\t60.0\t9.0\n").unwrap();

    let output = lidarprep(
        &["downsample", "--method", "count", "--input", "in", "--output", "out", "--json"],
        dir.path(),
    );
    assert!(output.status.success());

    let parsed: serde_json::Value =
        serde_json::from_slice(&output.stdout).expect("Output should be valid JSON");
    assert_eq!(parsed["data"]["param"], "1000");
    assert_eq!(parsed["data"]["summary"]["done"], 1);
    assert!(dir.path().join("out").join("downsampled_a.txt").exists());
}
