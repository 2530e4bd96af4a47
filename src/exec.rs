//! Single seam for external processes.
//!
//! Every side effect in the tool flows through a [`Runner`]: docker, cmake,
//! ctest, pytest, and gcovr are all invoked as [`Invocation`]s. Tests inject
//! a scripted runner to observe the exact command lines without spawning
//! anything.
use crate::util::format_command_line;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;

/// One external command: program, argv, environment overrides, working dir.
#[derive(Debug, Clone, Default)]
pub struct Invocation {
    pub program: String,
    pub args: Vec<String>,
    pub env: BTreeMap<String, String>,
    pub cwd: Option<PathBuf>,
}

impl Invocation {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            ..Self::default()
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn env_var(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Shell-quoted rendering for logs and error messages.
    pub fn command_line(&self) -> String {
        format_command_line(&self.program, &self.args)
    }
}

/// Exit result of a streamed invocation.
#[derive(Debug, Clone, Copy)]
pub struct ExecStatus {
    pub success: bool,
    pub code: Option<i32>,
}

impl ExecStatus {
    pub fn describe(&self) -> String {
        match self.code {
            Some(code) => format!("status {code}"),
            None => "termination by signal".to_string(),
        }
    }
}

impl From<std::process::ExitStatus> for ExecStatus {
    fn from(status: std::process::ExitStatus) -> Self {
        Self {
            success: status.success(),
            code: status.code(),
        }
    }
}

/// Captured output of an invocation.
#[derive(Debug, Clone)]
pub struct ExecCapture {
    pub status: ExecStatus,
    pub stdout: String,
    pub stderr: String,
}

/// Executes external commands; the only place side effects leave the process.
pub trait Runner {
    /// Run with stdout/stderr streamed through to the operator.
    fn run(&self, invocation: &Invocation) -> Result<ExecStatus>;

    /// Run with stdout/stderr collected.
    fn capture(&self, invocation: &Invocation) -> Result<ExecCapture>;
}

/// Production runner backed by `std::process::Command`.
pub struct ProcessRunner;

impl ProcessRunner {
    fn command(invocation: &Invocation) -> Command {
        let mut cmd = Command::new(&invocation.program);
        cmd.args(&invocation.args);
        for (key, value) in &invocation.env {
            cmd.env(key, value);
        }
        if let Some(cwd) = &invocation.cwd {
            cmd.current_dir(cwd);
        }
        cmd
    }
}

impl Runner for ProcessRunner {
    fn run(&self, invocation: &Invocation) -> Result<ExecStatus> {
        tracing::debug!(command = %invocation.command_line(), "run");
        let status = Self::command(invocation)
            .status()
            .with_context(|| format!("spawn {}", invocation.program))?;
        Ok(ExecStatus::from(status))
    }

    fn capture(&self, invocation: &Invocation) -> Result<ExecCapture> {
        tracing::debug!(command = %invocation.command_line(), "capture");
        let output = Self::command(invocation)
            .output()
            .with_context(|| format!("spawn {}", invocation.program))?;
        Ok(ExecCapture {
            status: ExecStatus::from(output.status),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

/// A plain `docker <args>` invocation rooted at the project.
pub fn docker<I, S>(args: I, root: &Path) -> Invocation
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    Invocation::new("docker").args(args).current_dir(root)
}
