//! Cleanup orchestration with an explicit confirmation gate.
//!
//! Scope items are independent and best-effort: an already-absent resource
//! counts as success, and one failed removal never stops the others. Each
//! item's result is collected and summarized instead of being swallowed.
use crate::exec::{docker, Runner};
use crate::layout::{ProjectLayout, RuntimeHandle};
use anyhow::{Context, Result};
use std::fs;
use std::io::{BufRead, Write};
use std::path::Path;

/// What a `clean` run is allowed to destroy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CleanScope {
    pub build_dir: bool,
    pub containers: bool,
    pub cache: bool,
}

impl CleanScope {
    /// No flags means build artifacts only; runtime resources are never a
    /// default target.
    pub fn from_flags(build_dir: bool, containers: bool, cache: bool, all: bool) -> Self {
        if all {
            return Self {
                build_dir: true,
                containers: true,
                cache: true,
            };
        }
        if !build_dir && !containers && !cache {
            return Self {
                build_dir: true,
                containers: false,
                cache: false,
            };
        }
        Self {
            build_dir,
            containers,
            cache,
        }
    }

    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if self.build_dir {
            parts.push("build artifacts (build/)");
        }
        if self.containers {
            parts.push("runtime container and image");
        }
        if self.cache {
            parts.push("cache state (.devctl/)");
        }
        parts.join(", ")
    }
}

/// Operator confirmation for destructive actions; injectable so tests can
/// answer deterministically without a terminal.
pub trait Confirmer {
    fn confirm(&mut self, prompt: &str) -> Result<bool>;
}

/// Reads a yes/no answer from stdin.
pub struct StdinConfirmer;

impl Confirmer for StdinConfirmer {
    fn confirm(&mut self, prompt: &str) -> Result<bool> {
        print!("{prompt}");
        std::io::stdout().flush().context("flush prompt")?;
        let mut answer = String::new();
        std::io::stdin()
            .lock()
            .read_line(&mut answer)
            .context("read confirmation")?;
        let answer = answer.trim().to_ascii_lowercase();
        Ok(answer == "y" || answer == "yes")
    }
}

#[derive(Debug, Clone)]
pub struct ItemResult {
    pub item: &'static str,
    pub ok: bool,
    pub detail: String,
}

/// Execute the confirmed scope. Returns one result per attempted item;
/// an empty list means the operator declined and nothing was touched.
pub fn clean(
    runner: &dyn Runner,
    layout: &ProjectLayout,
    handle: &RuntimeHandle,
    scope: CleanScope,
    force: bool,
    confirmer: &mut dyn Confirmer,
) -> Result<Vec<ItemResult>> {
    if !force {
        println!("About to remove: {}", scope.describe());
        if !confirmer.confirm("Proceed? [y/N] ")? {
            println!("Aborted; nothing was removed.");
            return Ok(Vec::new());
        }
    }

    let mut results = Vec::new();
    if scope.build_dir {
        results.push(remove_tree("build artifacts", &layout.build_root()));
    }
    if scope.containers {
        results.push(remove_docker_resource(
            runner,
            layout,
            "container",
            &["rm", "-f", handle.container.as_str()],
            "No such container",
        ));
        results.push(remove_docker_resource(
            runner,
            layout,
            "image",
            &["rmi", handle.image.as_str()],
            "No such image",
        ));
    }
    if scope.cache {
        results.push(remove_tree("cache state", &layout.devctl_dir()));
    }

    for result in &results {
        if result.ok {
            println!("cleaned {}: {}", result.item, result.detail);
        } else {
            // Partial failure is reported, not escalated.
            tracing::warn!(item = result.item, detail = %result.detail, "cleanup item failed");
            println!("FAILED {}: {}", result.item, result.detail);
        }
    }
    Ok(results)
}

fn remove_tree(item: &'static str, path: &Path) -> ItemResult {
    if !path.exists() {
        return ItemResult {
            item,
            ok: true,
            detail: "already absent".to_string(),
        };
    }
    match fs::remove_dir_all(path) {
        Ok(()) => ItemResult {
            item,
            ok: true,
            detail: format!("removed {}", path.display()),
        },
        Err(err) => ItemResult {
            item,
            ok: false,
            detail: format!("{}: {err}", path.display()),
        },
    }
}

/// Remove a named docker resource; "no such" answers count as success.
/// Even a spawn-level failure only marks this one item failed so the
/// remaining scope items are still attempted.
fn remove_docker_resource(
    runner: &dyn Runner,
    layout: &ProjectLayout,
    item: &'static str,
    args: &[&str],
    absent_marker: &str,
) -> ItemResult {
    let capture = match runner.capture(&docker(args.iter().copied(), layout.root())) {
        Ok(capture) => capture,
        Err(err) => {
            return ItemResult {
                item,
                ok: false,
                detail: format!("{err:#}"),
            }
        }
    };
    if capture.status.success {
        return ItemResult {
            item,
            ok: true,
            detail: "removed".to_string(),
        };
    }
    if capture.stderr.contains(absent_marker) {
        return ItemResult {
            item,
            ok: true,
            detail: "already absent".to_string(),
        };
    }
    ItemResult {
        item,
        ok: false,
        detail: capture.stderr.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::scripted::ScriptedRunner;
    use tempfile::TempDir;

    struct ScriptedConfirmer {
        answer: bool,
        asked: usize,
    }

    impl ScriptedConfirmer {
        fn new(answer: bool) -> Self {
            Self { answer, asked: 0 }
        }
    }

    impl Confirmer for ScriptedConfirmer {
        fn confirm(&mut self, _prompt: &str) -> Result<bool> {
            self.asked += 1;
            Ok(self.answer)
        }
    }

    fn fixture() -> (TempDir, ProjectLayout, RuntimeHandle) {
        let dir = TempDir::new().unwrap();
        let layout = ProjectLayout::new(dir.path().to_path_buf());
        let handle = RuntimeHandle::for_project(layout.root());
        (dir, layout, handle)
    }

    #[test]
    fn no_flags_defaults_to_build_artifacts_only() {
        let scope = CleanScope::from_flags(false, false, false, false);
        assert!(scope.build_dir);
        assert!(!scope.containers);
        assert!(!scope.cache);
    }

    #[test]
    fn all_selects_everything() {
        let scope = CleanScope::from_flags(false, false, false, true);
        assert!(scope.build_dir && scope.containers && scope.cache);
    }

    #[test]
    fn declining_confirmation_mutates_nothing() {
        let (_dir, layout, handle) = fixture();
        fs::create_dir_all(layout.build_root()).unwrap();
        let runner = ScriptedRunner::new();
        let mut confirmer = ScriptedConfirmer::new(false);

        let results = clean(
            &runner,
            &layout,
            &handle,
            CleanScope::from_flags(false, false, false, true),
            false,
            &mut confirmer,
        )
        .unwrap();

        assert!(results.is_empty());
        assert_eq!(confirmer.asked, 1);
        assert_eq!(runner.call_count(), 0);
        assert!(layout.build_root().exists());
    }

    #[test]
    fn force_skips_the_confirmation_gate() {
        let (_dir, layout, handle) = fixture();
        fs::create_dir_all(layout.build_root()).unwrap();
        let runner = ScriptedRunner::new();
        let mut confirmer = ScriptedConfirmer::new(false);

        let results = clean(
            &runner,
            &layout,
            &handle,
            CleanScope::from_flags(true, false, false, false),
            true,
            &mut confirmer,
        )
        .unwrap();

        assert_eq!(confirmer.asked, 0);
        assert_eq!(results.len(), 1);
        assert!(results[0].ok);
        assert!(!layout.build_root().exists());
    }

    #[test]
    fn cleaning_an_already_clean_tree_succeeds() {
        let (_dir, layout, handle) = fixture();
        let runner = ScriptedRunner::new();
        let mut confirmer = ScriptedConfirmer::new(true);

        let results = clean(
            &runner,
            &layout,
            &handle,
            CleanScope::from_flags(true, false, false, false),
            true,
            &mut confirmer,
        )
        .unwrap();

        assert_eq!(results.len(), 1);
        assert!(results[0].ok);
        assert_eq!(results[0].detail, "already absent");
    }

    #[test]
    fn absent_docker_resources_count_as_success() {
        let (_dir, layout, handle) = fixture();
        let runner = ScriptedRunner::new()
            .on("docker rm -f", false, "", "Error: No such container: devctl-x")
            .on("docker rmi", false, "", "Error: No such image: devctl-x");
        let mut confirmer = ScriptedConfirmer::new(true);

        let results = clean(
            &runner,
            &layout,
            &handle,
            CleanScope::from_flags(false, true, false, false),
            true,
            &mut confirmer,
        )
        .unwrap();

        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|result| result.ok));
    }

    #[test]
    fn unspawnable_runtime_still_attempts_the_remaining_items() {
        use crate::exec::{ExecCapture, ExecStatus, Invocation};

        // A runtime whose processes cannot even spawn (e.g. docker binary
        // removed between setup and clean).
        struct BrokenRunner;

        impl Runner for BrokenRunner {
            fn run(&self, _invocation: &Invocation) -> Result<ExecStatus> {
                anyhow::bail!("spawn docker: No such file or directory")
            }

            fn capture(&self, _invocation: &Invocation) -> Result<ExecCapture> {
                anyhow::bail!("spawn docker: No such file or directory")
            }
        }

        let (_dir, layout, handle) = fixture();
        fs::create_dir_all(layout.devctl_dir()).unwrap();
        let mut confirmer = ScriptedConfirmer::new(true);

        let results = clean(
            &BrokenRunner,
            &layout,
            &handle,
            CleanScope::from_flags(false, true, true, false),
            true,
            &mut confirmer,
        )
        .unwrap();

        // container + image + cache, all attempted despite the spawn failures.
        assert_eq!(results.len(), 3);
        let container = results.iter().find(|result| result.item == "container").unwrap();
        assert!(!container.ok);
        assert!(container.detail.contains("spawn docker"));
        let cache = results.iter().find(|result| result.item == "cache state").unwrap();
        assert!(cache.ok);
        assert!(!layout.devctl_dir().exists());
    }

    #[test]
    fn one_failed_item_does_not_stop_the_others() {
        let (_dir, layout, handle) = fixture();
        fs::create_dir_all(layout.devctl_dir()).unwrap();
        let runner = ScriptedRunner::new().on(
            "docker rm -f",
            false,
            "",
            "permission denied while trying to connect",
        );
        let mut confirmer = ScriptedConfirmer::new(true);

        let results = clean(
            &runner,
            &layout,
            &handle,
            CleanScope::from_flags(false, false, false, true),
            true,
            &mut confirmer,
        )
        .unwrap();

        // build + container + image + cache, all attempted.
        assert_eq!(results.len(), 4);
        let container = results.iter().find(|result| result.item == "container").unwrap();
        assert!(!container.ok);
        assert!(container.detail.contains("permission denied"));
        let cache = results.iter().find(|result| result.item == "cache state").unwrap();
        assert!(cache.ok);
        assert!(!layout.devctl_dir().exists());
        // The image removal was still attempted after the container failure.
        assert_eq!(runner.call_count(), 2);
    }
}
