//! End-to-end exit-code checks that need no container runtime.
//!
//! These cover the fail-closed paths: bad input must produce a non-zero
//! exit before any external process would be spawned, and idempotent
//! cleanup must succeed on an already-clean tree.
use std::io::Write;
use std::process::{Command, Stdio};
use tempfile::TempDir;

fn devctl() -> Command {
    Command::new(env!("CARGO_BIN_EXE_devctl"))
}

#[test]
fn unknown_flag_is_rejected_with_usage() {
    let output = devctl()
        .args(["build", "--fast"])
        .output()
        .expect("run devctl");
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("Usage"), "expected usage text, got: {stderr}");
}

#[test]
fn help_and_version_still_exit_zero() {
    for flag in ["--help", "--version"] {
        let output = devctl().arg(flag).output().expect("run devctl");
        assert_eq!(output.status.code(), Some(0), "{flag} must exit 0");
    }
}

#[test]
fn unknown_variant_is_rejected_naming_the_token() {
    let project = TempDir::new().unwrap();
    let output = devctl()
        .args(["--project-root"])
        .arg(project.path())
        .args(["build", "turbo"])
        .output()
        .expect("run devctl");
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("turbo"), "expected offending token, got: {stderr}");
}

#[test]
fn zero_jobs_is_rejected() {
    let project = TempDir::new().unwrap();
    let output = devctl()
        .args(["--project-root"])
        .arg(project.path())
        .args(["build", "debug", "--jobs", "0"])
        .output()
        .expect("run devctl");
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("--jobs"), "expected jobs message, got: {stderr}");
}

#[test]
fn test_without_build_output_fails_fast_naming_the_directory() {
    let project = TempDir::new().unwrap();
    let output = devctl()
        .args(["--project-root"])
        .arg(project.path())
        .args(["test", "--cpp-only"])
        .output()
        .expect("run devctl");
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("build") && stderr.contains("devctl build"),
        "expected missing-build-dir message, got: {stderr}"
    );
}

#[test]
fn clean_on_an_already_clean_tree_exits_zero() {
    let project = TempDir::new().unwrap();
    let output = devctl()
        .args(["--project-root"])
        .arg(project.path())
        .args(["clean", "--build-dir", "--force"])
        .output()
        .expect("run devctl");
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn clean_without_force_and_a_negative_answer_mutates_nothing() {
    let project = TempDir::new().unwrap();
    let build_dir = project.path().join("build/debug");
    std::fs::create_dir_all(&build_dir).unwrap();

    let mut child = devctl()
        .args(["--project-root"])
        .arg(project.path())
        .arg("clean")
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn devctl");
    child
        .stdin
        .as_mut()
        .expect("stdin")
        .write_all(b"n\n")
        .expect("write answer");
    let output = child.wait_with_output().expect("wait devctl");

    assert_eq!(output.status.code(), Some(0));
    assert!(build_dir.exists(), "declined clean must not remove anything");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Aborted"), "expected abort notice, got: {stdout}");
}

#[test]
fn nonexistent_project_root_is_an_error() {
    let output = devctl()
        .args(["--project-root", "/nonexistent/devctl-project", "clean", "--force"])
        .output()
        .expect("run devctl");
    assert_eq!(output.status.code(), Some(1));
}
