//! Invocation builders for commands that run inside the provisioned image.
//!
//! Build, test, and verification steps all execute in a disposable container
//! (`docker run --rm`) with the project bind-mounted at /workspace and the
//! cache directories mounted into the in-container user's home.
use crate::config::HostEnv;
use crate::exec::Invocation;
use crate::layout::{ProjectLayout, RuntimeHandle};
use std::collections::BTreeMap;

/// Mount point of the project inside the container.
pub const WORKSPACE: &str = "/workspace";
/// Mount point of `DEVCTL_SDK_ROOT` inside the container, when set.
pub const SDK_MOUNT: &str = "/opt/sdk";

/// Build a `docker run --rm` invocation for one tool command.
///
/// `env` entries become `-e KEY=VALUE` flags so the external tool sees them;
/// nothing from the host environment leaks in implicitly.
pub fn container_run(
    layout: &ProjectLayout,
    handle: &RuntimeHandle,
    host: &HostEnv,
    env: &BTreeMap<String, String>,
    argv: &[String],
) -> Invocation {
    let mut inv = Invocation::new("docker").args(["run", "--rm"]);
    inv = inv.args([
        "-v".to_string(),
        format!("{}:{WORKSPACE}", layout.root().display()),
        "-v".to_string(),
        format!("{}:/home/dev", layout.container_home_dir().display()),
        "-v".to_string(),
        format!("{}:/home/dev/.ccache", layout.ccache_dir().display()),
        "-v".to_string(),
        format!("{}:/home/dev/.cache/pip", layout.pip_cache_dir().display()),
    ]);
    if let Some(sdk_root) = &host.sdk_root {
        inv = inv.args([
            "-v".to_string(),
            format!("{sdk_root}:{SDK_MOUNT}:ro"),
            "-e".to_string(),
            format!("DEVCTL_SDK_ROOT={SDK_MOUNT}"),
            "-e".to_string(),
            format!("CMAKE_PREFIX_PATH={SDK_MOUNT}"),
            "-e".to_string(),
            format!("LD_LIBRARY_PATH={SDK_MOUNT}/lib"),
        ]);
    }
    for (key, value) in env {
        inv = inv.args(["-e".to_string(), format!("{key}={value}")]);
    }
    inv = inv.args(["-w", WORKSPACE]);
    inv = inv.arg(&handle.image);
    inv.args(argv.iter().cloned()).current_dir(layout.root())
}
