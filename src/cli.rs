//! CLI argument parsing for the environment orchestration commands.
//!
//! The CLI is intentionally thin: flags are declared here and resolved into
//! canonical configuration records in `config`, so no policy hides in the
//! argument structs.
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Root CLI entrypoint.
#[derive(Parser, Debug)]
#[command(
    name = "devctl",
    version,
    about = "Provision, build, test, and clean a containerized dev environment",
    after_help = "Commands:\n  setup   Build the environment image, seed templates, verify the result\n  build   Configure and compile inside the environment (cmake)\n  test    Run the native (ctest) and bindings (pytest) suites\n  clean   Remove build artifacts, runtime resources, or caches\n\nExamples:\n  devctl setup --check-only\n  devctl build release --jobs 8\n  devctl test --cpp-only --coverage\n  devctl clean --all --force",
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct RootArgs {
    /// Project root containing docker/Dockerfile, CMakeLists.txt, and tests
    #[arg(long, value_name = "DIR", global = true, default_value = ".")]
    pub project_root: PathBuf,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    Setup(SetupArgs),
    Build(BuildArgs),
    Test(TestArgs),
    Clean(CleanArgs),
}

/// Provision the environment image and supporting state.
#[derive(Parser, Debug)]
#[command(about = "Provision the container image, cache dirs, and config templates")]
pub struct SetupArgs {
    /// Remove the existing container and image before rebuilding
    #[arg(long)]
    pub force_rebuild: bool,

    /// Build the image without docker's layer cache
    #[arg(long)]
    pub no_cache: bool,

    /// Remove the build tree before provisioning
    #[arg(long)]
    pub clean: bool,

    /// Run the prerequisite checks and stop before any mutation
    #[arg(long)]
    pub check_only: bool,

    /// Numeric uid baked into the image (defaults to the invoking user)
    #[arg(long, value_name = "U")]
    pub user_uid: Option<u32>,

    /// Numeric gid baked into the image (defaults to the invoking group)
    #[arg(long, value_name = "G")]
    pub user_gid: Option<u32>,
}

/// Build command inputs.
#[derive(Parser, Debug)]
#[command(about = "Configure and build the native project inside the environment")]
pub struct BuildArgs {
    /// Build variant: debug, release, relwithdebinfo, or minsizerel
    #[arg(value_name = "VARIANT")]
    pub variant: Option<String>,

    /// Remove this variant's build directory before configuring
    #[arg(long)]
    pub clean: bool,

    /// Configure with test building disabled
    #[arg(long)]
    pub no_tests: bool,

    /// Parallel build jobs (default: DEVCTL_JOBS, then host core count)
    #[arg(long, value_name = "N")]
    pub jobs: Option<usize>,
}

/// Test command inputs.
#[derive(Parser, Debug)]
#[command(about = "Run the native and bindings test suites")]
pub struct TestArgs {
    /// Build variant whose output to test (default: debug)
    #[arg(value_name = "VARIANT")]
    pub variant: Option<String>,

    /// Run only the native (ctest) suite
    #[arg(long, conflicts_with = "python_only")]
    pub cpp_only: bool,

    /// Run only the bindings (pytest) suite
    #[arg(long, conflicts_with = "cpp_only")]
    pub python_only: bool,

    /// Generate a coverage report after the native suite
    #[arg(long)]
    pub coverage: bool,

    /// Verbose output from the underlying runners
    #[arg(long)]
    pub verbose: bool,
}

/// Clean command inputs.
#[derive(Parser, Debug)]
#[command(about = "Remove build artifacts, runtime resources, or cache state")]
pub struct CleanArgs {
    /// Remove the build tree (default when no scope flag is given)
    #[arg(long)]
    pub build_dir: bool,

    /// Remove the environment container and image
    #[arg(long)]
    pub containers: bool,

    /// Remove tool-owned cache state (.devctl/)
    #[arg(long)]
    pub cache: bool,

    /// Remove everything: build tree, runtime resources, and caches
    #[arg(long)]
    pub all: bool,

    /// Skip the confirmation prompt
    #[arg(long)]
    pub force: bool,
}
