//! Test orchestration across the native (ctest) and bindings (pytest) suites.
//!
//! The aggregate verdict is the AND of every suite that actually ran. A
//! suite whose prerequisite artifact is absent is recorded as skipped with a
//! visible warning, never as a failure; a suite that ran and failed always
//! fails the command. Coverage is strictly additive: its absence can warn
//! but never flip the verdict.
use crate::config::{HostEnv, TestConfig};
use crate::errors::OrchestrationError;
use crate::exec::Runner;
use crate::layout::{ProjectLayout, RuntimeHandle};
use crate::runtime::{container_run, WORKSPACE};
use crate::util::write_atomic;
use anyhow::{Context, Result};
use serde::Serialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TestTarget {
    Native,
    Bindings,
}

impl TestTarget {
    fn label(self) -> &'static str {
        match self {
            TestTarget::Native => "native (ctest)",
            TestTarget::Bindings => "bindings (pytest)",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TestOutcome {
    pub target: TestTarget,
    pub ran: bool,
    pub passed: bool,
    pub detail: String,
}

/// Per-run summary, also written as `test-report.json` into the build dir.
#[derive(Debug, Clone, Serialize)]
pub struct TestReport {
    pub variant: String,
    pub outcomes: Vec<TestOutcome>,
    pub passed: bool,
}

impl TestReport {
    pub fn failed_targets(&self) -> Vec<&'static str> {
        self.outcomes
            .iter()
            .filter(|outcome| outcome.ran && !outcome.passed)
            .map(|outcome| outcome.target.label())
            .collect()
    }
}

pub fn run_tests(
    runner: &dyn Runner,
    layout: &ProjectLayout,
    handle: &RuntimeHandle,
    host: &HostEnv,
    config: &TestConfig,
) -> Result<TestReport> {
    let build_dir = layout.build_dir(config.variant);
    if !build_dir.is_dir() {
        return Err(OrchestrationError::BuildDirMissing(build_dir).into());
    }

    let mut outcomes = Vec::new();
    let mut native_ran = false;

    if config.targets.native {
        let outcome = run_native(runner, layout, handle, host, config)?;
        native_ran = outcome.ran;
        outcomes.push(outcome);
    }
    if config.targets.bindings {
        outcomes.push(run_bindings(runner, layout, handle, host, config)?);
    }

    if config.coverage {
        run_coverage(runner, layout, handle, host, config, native_ran)?;
    }

    let passed = outcomes
        .iter()
        .filter(|outcome| outcome.ran)
        .all(|outcome| outcome.passed);
    let report = TestReport {
        variant: config.variant.dir_name().to_string(),
        outcomes,
        passed,
    };

    let report_path = layout.test_report_path(config.variant);
    let json = serde_json::to_string_pretty(&report).context("serialize test report")?;
    write_atomic(&report_path, &json)?;

    print_summary(&report);
    Ok(report)
}

fn run_native(
    runner: &dyn Runner,
    layout: &ProjectLayout,
    handle: &RuntimeHandle,
    host: &HostEnv,
    config: &TestConfig,
) -> Result<TestOutcome> {
    let build_dir = layout.build_dir(config.variant);
    if !build_dir.join("CTestTestfile.cmake").is_file() {
        tracing::warn!(dir = %build_dir.display(), "no ctest suite in build directory; skipping native tests");
        return Ok(skipped(TestTarget::Native, "no CTestTestfile.cmake in build directory"));
    }

    let mut argv: Vec<String> = vec![
        "ctest".into(),
        "--test-dir".into(),
        layout.build_dir_rel(config.variant),
        "--output-on-failure".into(),
    ];
    if config.verbose {
        argv.push("--verbose".into());
    }
    let status = runner.run(&container_run(layout, handle, host, &BTreeMap::new(), &argv))?;
    Ok(ran(TestTarget::Native, status.success, &status.describe()))
}

fn run_bindings(
    runner: &dyn Runner,
    layout: &ProjectLayout,
    handle: &RuntimeHandle,
    host: &HostEnv,
    config: &TestConfig,
) -> Result<TestOutcome> {
    let tests_dir = layout.python_tests_dir();
    if !tests_dir.is_dir() {
        tracing::warn!(dir = %tests_dir.display(), "no bindings test directory; skipping python tests");
        return Ok(skipped(TestTarget::Bindings, "tests/python does not exist"));
    }

    // The bindings module is imported from the variant's build output.
    let mut module_path = format!("{WORKSPACE}/{}/python", layout.build_dir_rel(config.variant));
    if let Some(extra) = &host.pythonpath {
        module_path = format!("{module_path}:{extra}");
    }
    let mut env = BTreeMap::new();
    env.insert("PYTHONPATH".to_string(), module_path);

    let mut argv: Vec<String> = vec![
        "python3".into(),
        "-m".into(),
        "pytest".into(),
        "tests/python".into(),
    ];
    if config.verbose {
        argv.push("-v".into());
    }
    let status = runner.run(&container_run(layout, handle, host, &env, &argv))?;
    Ok(ran(TestTarget::Bindings, status.success, &status.describe()))
}

/// Coverage runs only after the native suite actually ran, and only when the
/// toolchain is present in the image. Neither condition failing is an error.
fn run_coverage(
    runner: &dyn Runner,
    layout: &ProjectLayout,
    handle: &RuntimeHandle,
    host: &HostEnv,
    config: &TestConfig,
    native_ran: bool,
) -> Result<()> {
    if !native_ran {
        tracing::warn!("coverage requested but the native suite did not run; skipping");
        return Ok(());
    }
    let probe: Vec<String> = vec!["gcovr".into(), "--version".into()];
    let probe_result =
        runner.capture(&container_run(layout, handle, host, &BTreeMap::new(), &probe))?;
    if !probe_result.status.success {
        tracing::warn!("gcovr not available in the image; skipping coverage");
        return Ok(());
    }

    let rel = layout.build_dir_rel(config.variant);
    let argv: Vec<String> = vec![
        "gcovr".into(),
        "-r".into(),
        ".".into(),
        "--object-directory".into(),
        rel.clone(),
        "--xml".into(),
        format!("{rel}/coverage.xml"),
        "--print-summary".into(),
    ];
    let status = runner.run(&container_run(layout, handle, host, &BTreeMap::new(), &argv))?;
    if !status.success {
        tracing::warn!(status = %status.describe(), "coverage generation failed; verdict unaffected");
    }
    Ok(())
}

fn print_summary(report: &TestReport) {
    for outcome in &report.outcomes {
        let line = if !outcome.ran {
            format!("skipped ({})", outcome.detail)
        } else if outcome.passed {
            "passed".to_string()
        } else {
            format!("FAILED ({})", outcome.detail)
        };
        println!("{}: {line}", outcome.target.label());
    }
    if report.outcomes.iter().all(|outcome| !outcome.ran) {
        println!("No test suite ran; nothing was verified.");
    }
}

fn skipped(target: TestTarget, detail: &str) -> TestOutcome {
    TestOutcome {
        target,
        ran: false,
        passed: false,
        detail: detail.to_string(),
    }
}

fn ran(target: TestTarget, passed: bool, detail: &str) -> TestOutcome {
    TestOutcome {
        target,
        ran: true,
        passed,
        detail: detail.to_string(),
    }
}
