//! Build orchestration: cmake configure + build inside the environment image.
//!
//! Output lands in `build/<variant>`; variants never share a directory, so
//! switching variants never invalidates another variant's cache. Failures
//! from the external tool are surfaced verbatim and never retried.
use crate::config::{BuildConfig, HostEnv};
use crate::errors::OrchestrationError;
use crate::exec::Runner;
use crate::layout::{ProjectLayout, RuntimeHandle};
use crate::runtime::container_run;
use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::fs;

pub fn build(
    runner: &dyn Runner,
    layout: &ProjectLayout,
    handle: &RuntimeHandle,
    host: &HostEnv,
    config: &BuildConfig,
) -> Result<()> {
    let build_dir = layout.build_dir(config.variant);
    if config.clean_first && build_dir.exists() {
        fs::remove_dir_all(&build_dir)
            .with_context(|| format!("remove {}", build_dir.display()))?;
        tracing::info!(dir = %build_dir.display(), "removed build directory");
    }

    let env = compiler_env(host);
    let rel = layout.build_dir_rel(config.variant);

    let configure: Vec<String> = vec![
        "cmake".into(),
        "-S".into(),
        ".".into(),
        "-B".into(),
        rel.clone(),
        format!("-DCMAKE_BUILD_TYPE={}", config.variant.cmake_name()),
        "-DCMAKE_EXPORT_COMPILE_COMMANDS=ON".into(),
        format!(
            "-DBUILD_TESTING={}",
            if config.with_tests { "ON" } else { "OFF" }
        ),
    ];
    run_step(runner, layout, handle, host, &env, &configure, "cmake configure")?;

    let compile: Vec<String> = vec![
        "cmake".into(),
        "--build".into(),
        rel,
        "--parallel".into(),
        config.jobs.to_string(),
    ];
    run_step(runner, layout, handle, host, &env, &compile, "cmake build")?;

    println!(
        "Built {} into build/{}.",
        config.variant.cmake_name(),
        config.variant.dir_name()
    );
    Ok(())
}

fn run_step(
    runner: &dyn Runner,
    layout: &ProjectLayout,
    handle: &RuntimeHandle,
    host: &HostEnv,
    env: &BTreeMap<String, String>,
    argv: &[String],
    step: &str,
) -> Result<()> {
    let inv = container_run(layout, handle, host, env, argv);
    tracing::info!(step, "running");
    let status = runner.run(&inv)?;
    if !status.success {
        return Err(OrchestrationError::Build(format!(
            "{step} exited with {}",
            status.describe()
        ))
        .into());
    }
    Ok(())
}

/// Compiler-selection pair forwarded into the container when set on the host.
fn compiler_env(host: &HostEnv) -> BTreeMap<String, String> {
    let mut env = BTreeMap::new();
    if let Some(cc) = &host.cc {
        env.insert("CC".to_string(), cc.clone());
    }
    if let Some(cxx) = &host.cxx {
        env.insert("CXX".to_string(), cxx.clone());
    }
    env
}
