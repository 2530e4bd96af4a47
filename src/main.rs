use anyhow::{Context, Result};
use clap::Parser;
use std::fs;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod build;
mod clean;
mod cli;
mod config;
mod errors;
mod exec;
mod layout;
mod prereqs;
mod provision;
mod runtime;
mod templates;
mod testing;
mod util;
mod verify;

use cli::{CleanArgs, Command, RootArgs, SetupArgs};
use clean::{CleanScope, StdinConfirmer};
use config::{BuildConfig, HostEnv, TestConfig};
use errors::OrchestrationError;
use exec::{ProcessRunner, Runner};
use layout::{ProjectLayout, RuntimeHandle};
use prereqs::PrereqChecker;
use provision::ProvisionOptions;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    // Usage errors are part of the command contract: exit 1, like every
    // other validation failure. --help and --version still exit 0.
    let args = match RootArgs::try_parse() {
        Ok(args) => args,
        Err(err) => {
            let _ = err.print();
            return if err.use_stderr() {
                ExitCode::FAILURE
            } else {
                ExitCode::SUCCESS
            };
        }
    };
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: RootArgs) -> Result<()> {
    let root = args
        .project_root
        .canonicalize()
        .with_context(|| format!("resolve project root {}", args.project_root.display()))?;
    let layout = ProjectLayout::new(root);
    let handle = RuntimeHandle::for_project(layout.root());
    let runner = ProcessRunner;
    let host = HostEnv::from_env();

    match args.command {
        Command::Setup(setup) => cmd_setup(&runner, &layout, &handle, &host, &setup),
        Command::Build(build_args) => {
            let config = BuildConfig::resolve(&build_args, &host)?;
            build::build(&runner, &layout, &handle, &host, &config)
        }
        Command::Test(test_args) => {
            let config = TestConfig::resolve(&test_args)?;
            let report = testing::run_tests(&runner, &layout, &handle, &host, &config)?;
            if report.passed {
                Ok(())
            } else {
                Err(OrchestrationError::Test(report.failed_targets().join(", ")).into())
            }
        }
        Command::Clean(clean_args) => cmd_clean(&runner, &layout, &handle, &clean_args),
    }
}

fn cmd_setup(
    runner: &dyn Runner,
    layout: &ProjectLayout,
    handle: &RuntimeHandle,
    host: &HostEnv,
    args: &SetupArgs,
) -> Result<()> {
    let report = PrereqChecker::new(runner, layout.root()).run();
    report.print();
    if let Some(failure) = report.blocking_failure() {
        return Err(OrchestrationError::Prerequisite(format!(
            "{}: {}",
            failure.name, failure.detail
        ))
        .into());
    }
    if args.check_only {
        println!("Prerequisite checks passed; stopping before provisioning (--check-only).");
        return Ok(());
    }

    if args.clean {
        let build_root = layout.build_root();
        if build_root.exists() {
            fs::remove_dir_all(&build_root)
                .with_context(|| format!("remove {}", build_root.display()))?;
        }
    }

    let opts = ProvisionOptions {
        force_rebuild: args.force_rebuild,
        no_cache: args.no_cache,
        user_uid: args.user_uid,
        user_gid: args.user_gid,
    };
    provision::provision(runner, layout, handle, host, &opts)?;
    verify::verify(runner, layout, handle, host)?;
    println!("Environment ready.");
    Ok(())
}

fn cmd_clean(
    runner: &dyn Runner,
    layout: &ProjectLayout,
    handle: &RuntimeHandle,
    args: &CleanArgs,
) -> Result<()> {
    let scope = CleanScope::from_flags(args.build_dir, args.containers, args.cache, args.all);
    let results = clean::clean(
        runner,
        layout,
        handle,
        scope,
        args.force,
        &mut StdinConfirmer,
    )?;
    let failed = results.iter().filter(|result| !result.ok).count();
    if failed > 0 {
        // Best-effort policy: report partial failure, exit clean.
        println!("{failed} cleanup item(s) failed; see messages above.");
    }
    Ok(())
}
