//! Host prerequisite probes, run before provisioning mutates anything.
//!
//! Checks run in a fixed order and are read-only. A blocking failure
//! (missing runtime binary, unreachable daemon) short-circuits the report:
//! the remaining probes would only produce misleading noise. Soft problems
//! (old runtime version, low disk) are warnings and never block.
use crate::exec::{docker, Runner};
use regex::Regex;
use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::path::Path;

/// Oldest docker server version that gets a clean pass.
pub const MIN_DOCKER_MAJOR_MINOR: (u32, u32) = (20, 10);
/// Free space below this is a warning: image builds are disk-hungry.
pub const MIN_FREE_DISK_BYTES: u64 = 10 * 1024 * 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckStatus {
    Ok,
    Warn,
    Fail,
}

#[derive(Debug, Clone)]
pub struct CheckResult {
    pub name: &'static str,
    pub status: CheckStatus,
    pub detail: String,
}

/// Ordered probe results.
#[derive(Debug, Clone)]
pub struct PrereqReport {
    pub checks: Vec<CheckResult>,
}

impl PrereqReport {
    pub fn blocking_failure(&self) -> Option<&CheckResult> {
        self.checks
            .iter()
            .find(|check| check.status == CheckStatus::Fail)
    }

    pub fn print(&self) {
        for check in &self.checks {
            let tag = match check.status {
                CheckStatus::Ok => " ok ",
                CheckStatus::Warn => "warn",
                CheckStatus::Fail => "FAIL",
            };
            println!("[{tag}] {} - {}", check.name, check.detail);
        }
    }
}

pub struct PrereqChecker<'a> {
    runner: &'a dyn Runner,
    root: &'a Path,
}

impl<'a> PrereqChecker<'a> {
    pub fn new(runner: &'a dyn Runner, root: &'a Path) -> Self {
        Self { runner, root }
    }

    pub fn run(&self) -> PrereqReport {
        self.run_with(|tool| which::which(tool).is_ok())
    }

    /// Probe order is part of the contract: binary, daemon, version,
    /// compose surface, disk space.
    pub(crate) fn run_with(&self, tool_exists: impl Fn(&str) -> bool) -> PrereqReport {
        let mut checks = Vec::new();

        if tool_exists("docker") {
            checks.push(ok("docker binary", "found in PATH"));
        } else {
            checks.push(fail("docker binary", "not found in PATH"));
            return PrereqReport { checks };
        }

        let info = self
            .runner
            .capture(&docker(["info", "--format", "{{.ServerVersion}}"], self.root));
        let server_version = match info {
            Ok(capture) if capture.status.success => capture.stdout.trim().to_string(),
            Ok(capture) => {
                let detail = if capture.stderr.trim().is_empty() {
                    "daemon unreachable".to_string()
                } else {
                    format!("daemon unreachable: {}", capture.stderr.trim())
                };
                checks.push(fail("docker daemon", &detail));
                return PrereqReport { checks };
            }
            Err(err) => {
                checks.push(fail("docker daemon", &format!("probe failed: {err:#}")));
                return PrereqReport { checks };
            }
        };
        checks.push(ok(
            "docker daemon",
            &format!("reachable (server {server_version})"),
        ));

        checks.push(version_check(&server_version));
        checks.push(self.compose_check(&tool_exists));
        checks.push(disk_check(self.root));

        PrereqReport { checks }
    }

    fn compose_check(&self, tool_exists: &impl Fn(&str) -> bool) -> CheckResult {
        let plugin = self
            .runner
            .capture(&docker(["compose", "version"], self.root));
        if matches!(plugin, Ok(capture) if capture.status.success) {
            return ok("compose", "docker compose plugin available");
        }
        if tool_exists("docker-compose") {
            return ok("compose", "docker-compose found in PATH");
        }
        warn(
            "compose",
            "neither `docker compose` nor docker-compose available",
        )
    }
}

fn version_check(server_version: &str) -> CheckResult {
    let Some((major, minor)) = parse_major_minor(server_version) else {
        return warn(
            "docker version",
            &format!("could not parse server version `{server_version}`"),
        );
    };
    let (want_major, want_minor) = MIN_DOCKER_MAJOR_MINOR;
    if (major, minor) < (want_major, want_minor) {
        warn(
            "docker version",
            &format!("server {server_version} is older than {want_major}.{want_minor}"),
        )
    } else {
        ok("docker version", &format!("server {server_version}"))
    }
}

fn parse_major_minor(version: &str) -> Option<(u32, u32)> {
    let pattern = Regex::new(r"(\d+)\.(\d+)").ok()?;
    let captures = pattern.captures(version)?;
    let major = captures.get(1)?.as_str().parse().ok()?;
    let minor = captures.get(2)?.as_str().parse().ok()?;
    Some((major, minor))
}

fn disk_check(root: &Path) -> CheckResult {
    match free_disk_bytes(root) {
        Some(free) if free < MIN_FREE_DISK_BYTES => warn(
            "disk space",
            &format!(
                "{:.1} GiB free, want at least {:.0} GiB",
                gib(free),
                gib(MIN_FREE_DISK_BYTES)
            ),
        ),
        Some(free) => ok("disk space", &format!("{:.1} GiB free", gib(free))),
        None => warn("disk space", "could not query free space"),
    }
}

fn gib(bytes: u64) -> f64 {
    bytes as f64 / (1024.0 * 1024.0 * 1024.0)
}

// Field widths differ across libc targets.
#[allow(clippy::unnecessary_cast)]
fn free_disk_bytes(path: &Path) -> Option<u64> {
    let c_path = CString::new(path.as_os_str().as_bytes()).ok()?;
    // Safety: statvfs writes into the zeroed struct on success only.
    let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
    let rc = unsafe { libc::statvfs(c_path.as_ptr(), &mut stat) };
    if rc != 0 {
        return None;
    }
    Some(stat.f_bavail as u64 * stat.f_frsize as u64)
}

fn ok(name: &'static str, detail: &str) -> CheckResult {
    CheckResult {
        name,
        status: CheckStatus::Ok,
        detail: detail.to_string(),
    }
}

fn warn(name: &'static str, detail: &str) -> CheckResult {
    CheckResult {
        name,
        status: CheckStatus::Warn,
        detail: detail.to_string(),
    }
}

fn fail(name: &'static str, detail: &str) -> CheckResult {
    CheckResult {
        name,
        status: CheckStatus::Fail,
        detail: detail.to_string(),
    }
}
