mod probe;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use scenehost_dll::{PluginLoader, library_file_name, library_file_name_for};
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "scenehost-cli", about = "Headless scenehost tooling")]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print version and crate info
    Info,
    /// Print the platform library file name for a module
    LibName {
        /// Logical module name
        name: String,
        /// Force the debug (`-d`) or release naming instead of this build's
        #[arg(long)]
        debug: Option<bool>,
    },
    /// Load a scene module and run it against a recording backend
    Probe {
        /// Logical module name
        name: String,
        /// Directory containing the module library
        #[arg(long, default_value = ".")]
        module_dir: PathBuf,
        /// Number of frames to run
        #[arg(short, long, default_value = "10")]
        frames: u32,
        /// Simulated frame time in milliseconds
        #[arg(long, default_value = "16")]
        frame_ms: u64,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match cli.command {
        Commands::Info => {
            println!("scenehost-cli v{}", env!("CARGO_PKG_VERSION"));
            println!("module symbols: module_ctor, module_dtor");
            println!("library name: {}", library_file_name("<name>"));
            println!(
                "build: {}",
                if cfg!(debug_assertions) { "debug" } else { "release" }
            );
        }
        Commands::LibName { name, debug } => {
            let file = match debug {
                Some(debug) => library_file_name_for(&name, debug),
                None => library_file_name(&name),
            };
            println!("{file}");
        }
        Commands::Probe {
            name,
            module_dir,
            frames,
            frame_ms,
            json,
        } => {
            let mut loader = PluginLoader::new(module_dir);
            let module = match loader.load_scene(&name) {
                Ok(module) => module,
                Err(e) => {
                    tracing::error!("cannot probe '{name}': {e}");
                    return Ok(ExitCode::FAILURE);
                }
            };

            let report = {
                let mut instance = module.borrow_mut();
                let label = instance.module().name().to_string();
                let category = instance.category().to_string();
                let scene = instance
                    .scene()
                    .context("module lost its scene capability")?;
                probe::run(
                    scene,
                    &label,
                    &category,
                    frames,
                    Duration::from_millis(frame_ms),
                )?
            };
            drop(module);
            loader.unload_all();

            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("module: {} ({})", report.module, report.category);
                println!("entities: {}", report.entities);
                println!("frames: {}  draws: {:?}", report.frames, report.draws);
                println!("indexed draws: {}", report.indexed_draws);
                println!(
                    "gpu resources: {} live, {} after teardown, {} double releases",
                    report.live_resources, report.live_after_teardown, report.double_releases
                );
                println!("history entries: {}", report.history.len());
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
