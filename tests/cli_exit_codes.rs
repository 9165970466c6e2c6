use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use pcl_lib::error::ErrorCategory;
use pcl_lib::{PclOutput, Verdict};
use tempfile::{tempdir, TempDir};

const SNAPSHOT: &str = r#"{
    "url": "https://example.com/",
    "metadata": {"title": "Demo"},
    "captures": [{
        "breakpoint": "desktop",
        "viewportWidth": 1200,
        "root": {
            "tag": "body",
            "children": [
                {"tag": "h1", "text": "Hello", "innerHtml": "Hello"},
                {"tag": "p", "text": "World", "innerHtml": "World"}
            ]
        },
        "css": ".hero{color:red}"
    }]
}"#;

fn write_snapshot(dir: &TempDir) -> PathBuf {
    let path = dir.path().join("snapshot.json");
    std::fs::write(&path, SNAPSHOT).expect("write snapshot");
    path
}

/// Run the binary with an isolated config home.
fn run_pcl(args: &[&str], envs: &[(&str, &Path)], config_home: &Path) -> Output {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_pcl"));
    cmd.args(args)
        .env("XDG_CONFIG_HOME", config_home)
        .env_remove("PCL_MOCK_SNAPSHOT")
        .env_remove("RUST_LOG");
    for (k, v) in envs {
        cmd.env(k, v);
    }
    cmd.output().expect("run pcl")
}

fn parse_output(stdout: &[u8]) -> PclOutput {
    serde_json::from_slice(stdout).expect("stdout should be a JSON payload")
}

#[test]
fn convert_succeeds_offline() {
    let dir = tempdir().expect("tempdir");
    let snapshot = write_snapshot(&dir);
    let document = dir.path().join("out").join("doc.json");

    let output = run_pcl(
        &[
            "convert",
            "--snapshot",
            snapshot.to_str().unwrap(),
            "--document-out",
            document.to_str().unwrap(),
        ],
        &[],
        dir.path(),
    );

    assert_eq!(output.status.code(), Some(0));
    match parse_output(&output.stdout) {
        PclOutput::Convert(body) => {
            assert_eq!(body.counts.sections, 1);
            assert_eq!(body.counts.widgets, 2);
            assert_eq!(body.template.title, "Demo");
            assert_eq!(body.document_path.as_deref(), Some(document.as_path()));
        }
        other => panic!("expected convert output, got {}", other.mode()),
    }
    let written: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&document).expect("document written"))
            .expect("document is JSON");
    assert_eq!(written["type"], "page");
}

#[test]
fn replayed_clone_without_a_browser_needs_review() {
    let dir = tempdir().expect("tempdir");
    let snapshot = write_snapshot(&dir);

    let output = run_pcl(
        &["clone", "--url", "https://example.com"],
        &[("PCL_MOCK_SNAPSHOT", snapshot.as_path())],
        dir.path(),
    );

    assert_eq!(output.status.code(), Some(1));
    match parse_output(&output.stdout) {
        PclOutput::Clone(body) => {
            assert!(matches!(body.verdict, Verdict::NeedsReview { .. }));
            let report = body.fidelity.expect("fallback report");
            assert!(report.is_fallback());
            assert!((report.fidelity_score - 0.21).abs() < 1e-9);
        }
        other => panic!("expected clone output, got {}", other.mode()),
    }
}

#[test]
fn threshold_flag_overrides_the_default() {
    let dir = tempdir().expect("tempdir");
    let snapshot = write_snapshot(&dir);

    let output = run_pcl(
        &["clone", "--url", "https://example.com", "--threshold", "0.2"],
        &[("PCL_MOCK_SNAPSHOT", snapshot.as_path())],
        dir.path(),
    );

    assert_eq!(output.status.code(), Some(0));
    match parse_output(&output.stdout) {
        PclOutput::Clone(body) => assert_eq!(body.verdict, Verdict::Accepted),
        other => panic!("expected clone output, got {}", other.mode()),
    }
}

#[test]
fn config_threshold_applies_when_flag_is_absent() {
    let dir = tempdir().expect("tempdir");
    let snapshot = write_snapshot(&dir);
    let config = dir.path().join("pcl.toml");
    std::fs::write(&config, "[verifier]\nthreshold = 0.15\n").expect("write config");

    let output = run_pcl(
        &[
            "clone",
            "--url",
            "https://example.com",
            "--config",
            config.to_str().unwrap(),
        ],
        &[("PCL_MOCK_SNAPSHOT", snapshot.as_path())],
        dir.path(),
    );

    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn skip_verification_exits_cleanly() {
    let dir = tempdir().expect("tempdir");
    let snapshot = write_snapshot(&dir);

    let output = run_pcl(
        &["clone", "--url", "https://example.com", "--skip-verification"],
        &[("PCL_MOCK_SNAPSHOT", snapshot.as_path())],
        dir.path(),
    );

    assert_eq!(output.status.code(), Some(0));
    match parse_output(&output.stdout) {
        PclOutput::Clone(body) => {
            assert_eq!(body.verdict, Verdict::Skipped);
            assert!(body.fidelity.is_none());
            assert_eq!(body.counts.widgets, 2);
        }
        other => panic!("expected clone output, got {}", other.mode()),
    }
}

#[test]
fn invalid_url_is_a_config_error() {
    let dir = tempdir().expect("tempdir");

    let output = run_pcl(&["clone", "--url", "ftp://example.com"], &[], dir.path());

    assert_eq!(output.status.code(), Some(2));
    match parse_output(&output.stdout) {
        PclOutput::Error(body) => {
            assert_eq!(body.error.category, ErrorCategory::Config);
            assert!(body.error.remediation.is_some());
        }
        other => panic!("expected error output, got {}", other.mode()),
    }
}

#[test]
fn missing_snapshot_is_an_error() {
    let dir = tempdir().expect("tempdir");
    let missing = dir.path().join("nope.json");

    let output = run_pcl(
        &["convert", "--snapshot", missing.to_str().unwrap()],
        &[],
        dir.path(),
    );

    assert_eq!(output.status.code(), Some(2));
    assert!(matches!(parse_output(&output.stdout), PclOutput::Error(_)));
}

#[test]
fn invalid_config_is_rejected() {
    let dir = tempdir().expect("tempdir");
    let snapshot = write_snapshot(&dir);
    let config = dir.path().join("pcl.yaml");
    std::fs::write(&config, "verifier:\n  threshold: 3.0\n").expect("write config");

    let output = run_pcl(
        &[
            "convert",
            "--snapshot",
            snapshot.to_str().unwrap(),
            "--config",
            config.to_str().unwrap(),
        ],
        &[],
        dir.path(),
    );

    assert_eq!(output.status.code(), Some(2));
    match parse_output(&output.stdout) {
        PclOutput::Error(body) => assert!(body.error.message.contains("threshold")),
        other => panic!("expected error output, got {}", other.mode()),
    }
}

#[test]
fn output_flag_writes_to_a_file() {
    let dir = tempdir().expect("tempdir");
    let snapshot = write_snapshot(&dir);
    let out = dir.path().join("result.json");

    let output = run_pcl(
        &[
            "convert",
            "--snapshot",
            snapshot.to_str().unwrap(),
            "--output",
            out.to_str().unwrap(),
        ],
        &[],
        dir.path(),
    );

    assert_eq!(output.status.code(), Some(0));
    assert!(output.stdout.is_empty());
    let body: PclOutput =
        serde_json::from_str(&std::fs::read_to_string(&out).expect("output file")).expect("json");
    assert_eq!(body.mode(), "convert");
}
