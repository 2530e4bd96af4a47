//! Post-provisioning smoke checks.
//!
//! Each check runs in a freshly started, disposable container. The first
//! failure aborts with the check's name; a broken image should be reported
//! once, precisely, not as a pile of cascading errors.
use crate::config::HostEnv;
use crate::errors::OrchestrationError;
use crate::exec::Runner;
use crate::layout::{ProjectLayout, RuntimeHandle};
use crate::runtime::container_run;
use anyhow::Result;
use std::collections::BTreeMap;

const CHECKS: [(&str, &[&str]); 3] = [
    ("python interpreter", &["python3", "--version"]),
    ("cmake", &["cmake", "--version"]),
    ("pybind11", &["python3", "-c", "import pybind11"]),
];

pub fn verify(
    runner: &dyn Runner,
    layout: &ProjectLayout,
    handle: &RuntimeHandle,
    host: &HostEnv,
) -> Result<()> {
    for (name, argv) in CHECKS {
        let argv: Vec<String> = argv.iter().map(|arg| (*arg).to_string()).collect();
        let inv = container_run(layout, handle, host, &BTreeMap::new(), &argv);
        let capture = runner.capture(&inv)?;
        if !capture.status.success {
            let detail = if capture.stderr.trim().is_empty() {
                capture.status.describe()
            } else {
                capture.stderr.trim().to_string()
            };
            return Err(OrchestrationError::Verification {
                check: name.to_string(),
                detail,
            }
            .into());
        }
        tracing::debug!(check = name, "verified");
    }
    println!("Environment verified: interpreter, build tool, pybind11.");
    Ok(())
}
