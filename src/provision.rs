//! Environment provisioning: image build, cache directories, templates.
//!
//! Every step is idempotent. Re-running `setup` without `--force-rebuild`
//! leaves existing directories and templates untouched and lets docker's own
//! layer cache decide how much of the image to rebuild.
use crate::config::HostEnv;
use crate::errors::OrchestrationError;
use crate::exec::{docker, Runner};
use crate::layout::{ProjectLayout, RuntimeHandle};
use crate::templates;
use crate::util::{display_path, write_atomic};
use anyhow::{Context, Result};
use std::fs;

#[derive(Debug, Clone, Copy, Default)]
pub struct ProvisionOptions {
    pub force_rebuild: bool,
    pub no_cache: bool,
    pub user_uid: Option<u32>,
    pub user_gid: Option<u32>,
}

pub fn provision(
    runner: &dyn Runner,
    layout: &ProjectLayout,
    handle: &RuntimeHandle,
    host: &HostEnv,
    opts: &ProvisionOptions,
) -> Result<()> {
    if opts.force_rebuild {
        remove_runtime_state(runner, layout, handle)?;
    }
    create_cache_dirs(layout)?;
    build_image(runner, layout, handle, host, opts)?;
    seed_templates(layout)?;
    Ok(())
}

/// Stop/remove the named container and image. Non-zero exits from
/// already-absent resources are swallowed; only spawn failures propagate.
fn remove_runtime_state(
    runner: &dyn Runner,
    layout: &ProjectLayout,
    handle: &RuntimeHandle,
) -> Result<()> {
    tracing::info!(container = %handle.container, image = %handle.image, "force rebuild requested");
    let rm = docker(["rm", "-f", handle.container.as_str()], layout.root());
    let capture = runner.capture(&rm)?;
    if !capture.status.success {
        tracing::debug!(container = %handle.container, "container already absent");
    }
    let rmi = docker(["rmi", handle.image.as_str()], layout.root());
    let capture = runner.capture(&rmi)?;
    if !capture.status.success {
        tracing::debug!(image = %handle.image, "image already absent");
    }
    Ok(())
}

/// Create the fixed cache/volume directories; existing ones are left alone.
pub fn create_cache_dirs(layout: &ProjectLayout) -> Result<()> {
    for dir in [
        layout.ccache_dir(),
        layout.pip_cache_dir(),
        layout.container_home_dir(),
    ] {
        fs::create_dir_all(&dir).with_context(|| format!("create {}", dir.display()))?;
    }
    Ok(())
}

fn build_image(
    runner: &dyn Runner,
    layout: &ProjectLayout,
    handle: &RuntimeHandle,
    host: &HostEnv,
    opts: &ProvisionOptions,
) -> Result<()> {
    let dockerfile = layout.dockerfile_path();
    if !dockerfile.exists() {
        return Err(OrchestrationError::Provision(format!(
            "{} not found",
            display_path(&dockerfile, Some(layout.root()))
        ))
        .into());
    }

    // Map the invoking identity into the image so bind-mounted files keep
    // sane ownership on the host.
    let uid = opts.user_uid.unwrap_or_else(host_uid);
    let gid = opts.user_gid.unwrap_or_else(host_gid);

    let mut inv = docker(["build", "-t", handle.image.as_str()], layout.root())
        .args(["-f".to_string(), dockerfile.display().to_string()])
        .args([
            "--build-arg".to_string(),
            format!("USER_UID={uid}"),
            "--build-arg".to_string(),
            format!("USER_GID={gid}"),
        ]);
    if opts.no_cache {
        inv = inv.arg("--no-cache");
    }
    if let Some(extra) = &host.docker_build_args {
        let words = shell_words::split(extra).map_err(|err| {
            OrchestrationError::Validation(format!("DEVCTL_DOCKER_BUILD_ARGS: {err}"))
        })?;
        inv = inv.args(words);
    }
    inv = inv.arg(".");

    tracing::info!(image = %handle.image, "building environment image");
    let status = runner.run(&inv)?;
    if !status.success {
        return Err(OrchestrationError::Provision(format!(
            "docker build exited with {}",
            status.describe()
        ))
        .into());
    }
    Ok(())
}

/// Materialize default configuration templates. An existing file is never
/// overwritten; writes go through a temp file so a crash cannot leave a
/// half-written config behind.
pub fn seed_templates(layout: &ProjectLayout) -> Result<()> {
    let targets = [
        (layout.presets_path(), templates::CMAKE_PRESETS_JSON),
        (layout.vscode_settings_path(), templates::VSCODE_SETTINGS_JSON),
    ];
    for (path, contents) in targets {
        if path.exists() {
            tracing::debug!(path = %path.display(), "template already present");
            continue;
        }
        write_atomic(&path, contents)?;
        println!(
            "Seeded {}",
            display_path(&path, Some(layout.root()))
        );
    }
    Ok(())
}

fn host_uid() -> u32 {
    // Safety: getuid has no failure modes.
    unsafe { libc::getuid() }
}

fn host_gid() -> u32 {
    // Safety: getgid has no failure modes.
    unsafe { libc::getgid() }
}
