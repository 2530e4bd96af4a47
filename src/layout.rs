//! Typed paths into the project layout, plus the named docker identities.
//!
//! Centralizing path construction keeps file access consistent across the
//! orchestrators and guarantees the build-layout invariant: two variants
//! never share an output directory.
use crate::config::Variant;
use std::path::{Path, PathBuf};

/// Convenience wrapper for locating project artifacts.
#[derive(Debug, Clone)]
pub struct ProjectLayout {
    root: PathBuf,
}

impl ProjectLayout {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Root of all build output, shared by no other state.
    pub fn build_root(&self) -> PathBuf {
        self.root.join("build")
    }

    /// Per-variant build directory under `build/`.
    pub fn build_dir(&self, variant: Variant) -> PathBuf {
        self.build_root().join(variant.dir_name())
    }

    /// Same directory expressed relative to the in-container workspace.
    pub fn build_dir_rel(&self, variant: Variant) -> String {
        format!("build/{}", variant.dir_name())
    }

    /// Root of tool-owned cache/volume state.
    pub fn devctl_dir(&self) -> PathBuf {
        self.root.join(".devctl")
    }

    pub fn ccache_dir(&self) -> PathBuf {
        self.devctl_dir().join("cache").join("ccache")
    }

    pub fn pip_cache_dir(&self) -> PathBuf {
        self.devctl_dir().join("cache").join("pip")
    }

    /// Persistent home for the in-container user (shell history, tool rc files).
    pub fn container_home_dir(&self) -> PathBuf {
        self.devctl_dir().join("home")
    }

    pub fn dockerfile_path(&self) -> PathBuf {
        self.root.join("docker").join("Dockerfile")
    }

    pub fn presets_path(&self) -> PathBuf {
        self.root.join("CMakePresets.json")
    }

    pub fn vscode_settings_path(&self) -> PathBuf {
        self.root.join(".vscode").join("settings.json")
    }

    pub fn python_tests_dir(&self) -> PathBuf {
        self.root.join("tests").join("python")
    }

    pub fn test_report_path(&self, variant: Variant) -> PathBuf {
        self.build_dir(variant).join("test-report.json")
    }
}

/// Named identities in the external runtime's namespace.
///
/// Constructed once per invocation and passed into every orchestrator;
/// whether the image or container actually exists is always re-queried from
/// docker itself, never cached here.
#[derive(Debug, Clone)]
pub struct RuntimeHandle {
    pub image: String,
    pub container: String,
}

impl RuntimeHandle {
    /// Derive names from the project directory so two checkouts never
    /// collide in the docker namespace.
    pub fn for_project(root: &Path) -> Self {
        let name = root
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| "project".to_string());
        let slug = sanitize(&name);
        Self {
            image: format!("devctl-{slug}:latest"),
            container: format!("devctl-{slug}"),
        }
    }
}

fn sanitize(name: &str) -> String {
    let mut slug: String = name
        .chars()
        .map(|ch| {
            let ch = ch.to_ascii_lowercase();
            if ch.is_ascii_alphanumeric() {
                ch
            } else {
                '-'
            }
        })
        .collect();
    while slug.starts_with('-') {
        slug.remove(0);
    }
    if slug.is_empty() {
        slug.push_str("project");
    }
    slug
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    #[test]
    fn variants_never_share_build_dirs() {
        let layout = ProjectLayout::new(PathBuf::from("/proj"));
        let dirs: BTreeSet<PathBuf> = Variant::ALL
            .iter()
            .map(|variant| layout.build_dir(*variant))
            .collect();
        assert_eq!(dirs.len(), Variant::ALL.len());
        for dir in &dirs {
            assert!(dir.starts_with("/proj/build"));
        }
    }

    #[test]
    fn runtime_names_are_docker_safe() {
        let handle = RuntimeHandle::for_project(Path::new("/home/me/My Project_2"));
        assert_eq!(handle.container, "devctl-my-project-2");
        assert_eq!(handle.image, "devctl-my-project-2:latest");
    }

    #[test]
    fn runtime_names_survive_odd_roots() {
        let handle = RuntimeHandle::for_project(Path::new("/"));
        assert_eq!(handle.container, "devctl-project");
    }
}
