use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use scenehost_dll::library_file_name_for;
use std::env::consts::{DLL_PREFIX, DLL_SUFFIX};
use std::path::{Path, PathBuf};
use std::process::Command;

/// Scene modules built as cdylibs: (package, library name).
const MODULES: &[(&str, &str)] = &[("scenehost-example", "example")];

#[derive(Parser)]
#[command(name = "xtask", about = "Workspace automation for scenehost")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run all checks: fmt, clippy, tests, doc
    Check,
    /// Run cargo fmt --check on all crates
    Fmt,
    /// Run clippy on all crates
    Clippy,
    /// Run all tests
    Test,
    /// Build rustdoc for the workspace
    Doc,
    /// Build the entire workspace and stage the scene modules
    Build {
        #[arg(long)]
        release: bool,
    },
    /// Build the scene modules and copy them next to the host binaries
    /// under the host's library naming convention
    Modules {
        #[arg(long)]
        release: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check => {
            run_fmt()?;
            run_clippy()?;
            run_tests()?;
            run_doc()?;
        }
        Commands::Fmt => run_fmt()?,
        Commands::Clippy => run_clippy()?,
        Commands::Test => run_tests()?,
        Commands::Doc => run_doc()?,
        Commands::Build { release } => {
            run_build(release)?;
            stage_modules(release)?;
        }
        Commands::Modules { release } => {
            build_modules(release)?;
            stage_modules(release)?;
        }
    }

    Ok(())
}

fn cargo(args: &[&str], what: &str) -> Result<()> {
    let status = Command::new("cargo").args(args).status()?;
    if !status.success() {
        anyhow::bail!("{what} failed");
    }
    Ok(())
}

fn run_fmt() -> Result<()> {
    println!("==> Running cargo fmt --check");
    cargo(&["fmt", "--all", "--", "--check"], "cargo fmt check")
}

fn run_clippy() -> Result<()> {
    println!("==> Running cargo clippy");
    cargo(
        &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
        "cargo clippy",
    )
}

fn run_tests() -> Result<()> {
    println!("==> Running cargo test");
    cargo(&["test", "--workspace"], "cargo test")
}

fn run_doc() -> Result<()> {
    println!("==> Running cargo doc");
    cargo(&["doc", "--workspace", "--no-deps"], "cargo doc")
}

fn run_build(release: bool) -> Result<()> {
    println!("==> Running cargo build");
    let mut args = vec!["build", "--workspace"];
    if release {
        args.push("--release");
    }
    cargo(&args, "cargo build")
}

fn build_modules(release: bool) -> Result<()> {
    for (package, _) in MODULES {
        println!("==> Building module {package}");
        let mut args = vec!["build", "-p", package];
        if release {
            args.push("--release");
        }
        cargo(&args, &format!("building {package}"))?;
    }
    Ok(())
}

fn profile_dir(release: bool) -> PathBuf {
    let target = std::env::var_os("CARGO_TARGET_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|| workspace_root().join("target"));
    target.join(if release { "release" } else { "debug" })
}

fn workspace_root() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."))
}

/// The file cargo writes for a cdylib named `lib_name`.
fn cargo_artifact(lib_name: &str) -> String {
    format!("{DLL_PREFIX}{lib_name}{DLL_SUFFIX}")
}

/// Copy each built module to the name the host looks for: debug builds get
/// the `-d` suffix.
fn stage_modules(release: bool) -> Result<()> {
    let dir = profile_dir(release);
    for (_, lib_name) in MODULES {
        let from = dir.join(cargo_artifact(lib_name));
        let to = dir.join(library_file_name_for(lib_name, !release));
        std::fs::copy(&from, &to)
            .with_context(|| format!("staging {} as {}", from.display(), to.display()))?;
        println!("==> Staged {}", to.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staged_name_differs_from_cargo_artifact_only_in_debug() {
        let artifact = cargo_artifact("example");
        assert_eq!(library_file_name_for("example", false), artifact);
        assert_ne!(library_file_name_for("example", true), artifact);
    }

    #[test]
    fn profile_dir_ends_with_profile() {
        assert!(profile_dir(true).ends_with("release"));
        assert!(profile_dir(false).ends_with("debug"));
    }
}
