//! Orchestration-level error kinds.
//!
//! Each kind maps to one failure policy described in the command docs:
//! validation and prerequisite failures happen before any mutation,
//! provision/verification failures abort the rest of their command, and
//! build/test failures surface the external tool's own diagnostics.
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error("invalid input: {0}")]
    Validation(String),

    #[error("prerequisite check failed: {0}")]
    Prerequisite(String),

    #[error("provisioning failed: {0}")]
    Provision(String),

    #[error("environment verification failed at check `{check}`: {detail}")]
    Verification { check: String, detail: String },

    #[error("build directory {} does not exist; run `devctl build` first", .0.display())]
    BuildDirMissing(PathBuf),

    #[error("build failed: {0}")]
    Build(String),

    #[error("test suites failed: {0}")]
    Test(String),
}
