mod app;
#[cfg(feature = "gamepad")]
mod gamepad;
mod platform;
mod ui;

use anyhow::{Context, Result};
use clap::Parser;
use scenehost_dll::PluginLoader;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;
use winit::event_loop::{ControlFlow, EventLoop};

#[derive(Parser, Debug)]
#[command(name = "scenehost-desktop", about = "Load a scene module and render it in a window")]
struct Cli {
    /// Logical name of the scene module to load
    #[arg(short, long, default_value = "example")]
    module: String,

    /// Directory searched for module libraries [default: the executable's directory]
    #[arg(long)]
    module_dir: Option<PathBuf>,

    /// Initial window width
    #[arg(long, default_value_t = 1280)]
    width: u32,

    /// Initial window height
    #[arg(long, default_value_t = 720)]
    height: u32,

    /// Multiplier applied to elapsed time
    #[arg(long, default_value_t = 1.0)]
    time_scale: f64,

    /// Start with the debug panel hidden
    #[arg(long)]
    no_ui: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Host settings resolved from the command line.
#[derive(Debug, Clone, PartialEq)]
pub struct HostConfig {
    pub module: String,
    pub module_dir: PathBuf,
    pub width: u32,
    pub height: u32,
    pub time_scale: f64,
    pub show_ui: bool,
}

impl HostConfig {
    fn from_cli(cli: Cli) -> Result<Self> {
        let module_dir = match cli.module_dir {
            Some(dir) => dir,
            None => std::env::current_exe()
                .context("cannot locate the running executable")?
                .parent()
                .map(PathBuf::from)
                .unwrap_or_default(),
        };
        Ok(Self {
            module: cli.module,
            module_dir,
            width: cli.width.max(1),
            height: cli.height.max(1),
            time_scale: cli.time_scale,
            show_ui: !cli.no_ui,
        })
    }
}

fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let filter = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    let config = HostConfig::from_cli(cli)?;
    tracing::info!("scenehost-desktop starting");

    let mut loader = PluginLoader::new(&config.module_dir);
    let module = match loader.load_scene(&config.module) {
        Ok(module) => module,
        Err(e) => {
            tracing::error!("cannot start without module '{}': {e}", config.module);
            return Ok(ExitCode::FAILURE);
        }
    };

    let event_loop = EventLoop::new()?;
    event_loop.set_control_flow(ControlFlow::Poll);

    let mut app = app::HostApp::new(config, loader, module);
    event_loop.run_app(&mut app)?;

    Ok(app.exit_code())
}
