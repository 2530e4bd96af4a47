//! Canonical configuration resolved from CLI input and host environment.
//!
//! Resolution runs before anything touches docker or the filesystem, so a
//! bad token never causes a partial run. Precedence for parallelism is
//! flag > `DEVCTL_JOBS` > host core count.
use crate::cli::{BuildArgs, TestArgs};
use crate::errors::OrchestrationError;
use anyhow::Result;
use std::env;
use std::num::NonZeroUsize;

/// The four recognized build configurations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Variant {
    Debug,
    Release,
    RelWithDebInfo,
    MinSizeRel,
}

impl Variant {
    pub const ALL: [Variant; 4] = [
        Variant::Debug,
        Variant::Release,
        Variant::RelWithDebInfo,
        Variant::MinSizeRel,
    ];

    /// Normalize a user-supplied token. Case and `-`/`_` separators are
    /// ignored; anything unrecognized is a validation error, never a
    /// silent default.
    pub fn parse(token: &str) -> Result<Self, OrchestrationError> {
        let folded: String = token
            .chars()
            .filter(|ch| *ch != '-' && *ch != '_')
            .collect::<String>()
            .to_ascii_lowercase();
        match folded.as_str() {
            "debug" => Ok(Variant::Debug),
            "release" => Ok(Variant::Release),
            "relwithdebinfo" | "relwithdebug" => Ok(Variant::RelWithDebInfo),
            "minsizerel" => Ok(Variant::MinSizeRel),
            _ => Err(OrchestrationError::Validation(format!(
                "unrecognized build variant `{token}` (expected debug, release, relwithdebinfo, or minsizerel)"
            ))),
        }
    }

    /// Build-layout key; also the user-facing spelling.
    pub fn dir_name(self) -> &'static str {
        match self {
            Variant::Debug => "debug",
            Variant::Release => "release",
            Variant::RelWithDebInfo => "relwithdebinfo",
            Variant::MinSizeRel => "minsizerel",
        }
    }

    /// Spelling passed to `-DCMAKE_BUILD_TYPE=`.
    pub fn cmake_name(self) -> &'static str {
        match self {
            Variant::Debug => "Debug",
            Variant::Release => "Release",
            Variant::RelWithDebInfo => "RelWithDebInfo",
            Variant::MinSizeRel => "MinSizeRel",
        }
    }
}

/// Host environment consulted by the orchestrators, read once at startup so
/// command construction stays deterministic and testable.
#[derive(Debug, Clone, Default)]
pub struct HostEnv {
    pub jobs: Option<String>,
    pub cc: Option<String>,
    pub cxx: Option<String>,
    pub sdk_root: Option<String>,
    pub pythonpath: Option<String>,
    pub docker_build_args: Option<String>,
}

impl HostEnv {
    pub fn from_env() -> Self {
        Self {
            jobs: env::var("DEVCTL_JOBS").ok(),
            cc: env::var("CC").ok(),
            cxx: env::var("CXX").ok(),
            sdk_root: env::var("DEVCTL_SDK_ROOT").ok(),
            pythonpath: env::var("PYTHONPATH").ok(),
            docker_build_args: env::var("DEVCTL_DOCKER_BUILD_ARGS").ok(),
        }
    }
}

/// Canonical build configuration.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    pub variant: Variant,
    pub jobs: NonZeroUsize,
    pub clean_first: bool,
    pub with_tests: bool,
}

impl BuildConfig {
    pub fn resolve(args: &BuildArgs, host: &HostEnv) -> Result<Self> {
        let variant = parse_variant_token(args.variant.as_deref())?;
        let jobs = resolve_jobs(args.jobs, host.jobs.as_deref())?;
        Ok(Self {
            variant,
            jobs,
            clean_first: args.clean,
            with_tests: !args.no_tests,
        })
    }
}

/// Which test suites to run.
#[derive(Debug, Clone, Copy)]
pub struct TargetSet {
    pub native: bool,
    pub bindings: bool,
}

/// Canonical test configuration.
#[derive(Debug, Clone)]
pub struct TestConfig {
    pub variant: Variant,
    pub targets: TargetSet,
    pub coverage: bool,
    pub verbose: bool,
}

impl TestConfig {
    pub fn resolve(args: &TestArgs) -> Result<Self> {
        let variant = parse_variant_token(args.variant.as_deref())?;
        // --cpp-only and --python-only are mutually exclusive at the clap level.
        let targets = TargetSet {
            native: !args.python_only,
            bindings: !args.cpp_only,
        };
        Ok(Self {
            variant,
            targets,
            coverage: args.coverage,
            verbose: args.verbose,
        })
    }
}

fn parse_variant_token(token: Option<&str>) -> Result<Variant> {
    match token {
        Some(token) => Ok(Variant::parse(token)?),
        None => Ok(Variant::Debug),
    }
}

/// Resolve the external build/test parallelism bound.
pub fn resolve_jobs(flag: Option<usize>, env_value: Option<&str>) -> Result<NonZeroUsize> {
    if let Some(flag) = flag {
        return NonZeroUsize::new(flag).ok_or_else(|| {
            OrchestrationError::Validation("--jobs must be a positive integer".to_string()).into()
        });
    }
    if let Some(raw) = env_value {
        let parsed: usize = raw.parse().map_err(|_| {
            OrchestrationError::Validation(format!(
                "DEVCTL_JOBS must be a positive integer, got `{raw}`"
            ))
        })?;
        return NonZeroUsize::new(parsed).ok_or_else(|| {
            OrchestrationError::Validation(format!(
                "DEVCTL_JOBS must be a positive integer, got `{raw}`"
            ))
            .into()
        });
    }
    Ok(std::thread::available_parallelism().unwrap_or(NonZeroUsize::MIN))
}
