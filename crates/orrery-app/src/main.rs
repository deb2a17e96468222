//! `orrery`: opens a window and animates the solar system.
//!
//! Configuration is loaded from `config.ron` in the platform config directory
//! and can be overridden via CLI flags, e.g. `orrery --paused --seed 7`.

use std::process::ExitCode;

use clap::Parser;
use orrery_app::{AppError, OrreryApp, PlatformDirs, Session, load_bindings, run};
use orrery_config::{CliArgs, Config};
use orrery_space::{SceneGraph, Starfield, SystemDescription};
use tracing::{error, info};

fn main() -> ExitCode {
    let args = CliArgs::parse();

    let dirs = match PlatformDirs::resolve() {
        Ok(dirs) => match &args.config {
            Some(dir) => dirs.with_config_dir(dir.clone()),
            None => dirs,
        },
        Err(e) => {
            eprintln!("orrery: {e}");
            return ExitCode::FAILURE;
        }
    };
    if let Err(e) = dirs.create_dirs() {
        eprintln!("orrery: {e}");
        return ExitCode::FAILURE;
    }

    // Load or create config, then apply CLI overrides
    let file_config = Config::load_or_create(&dirs.config_dir).unwrap_or_else(|e| {
        eprintln!("Failed to load config: {e}, using defaults");
        Config::default()
    });
    let mut config = file_config.clone();
    config.apply_cli_overrides(&args);

    orrery_log::init_logging(Some(&dirs.log_dir), cfg!(debug_assertions), Some(&config));
    info!("Config directory: {}", dirs.config_dir.display());

    match launch(args, dirs, file_config, config) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            ExitCode::FAILURE
        }
    }
}

fn launch(
    args: CliArgs,
    dirs: PlatformDirs,
    file_config: Config,
    config: Config,
) -> Result<(), AppError> {
    config.validate()?;

    let description = match &config.assets.system_file {
        Some(path) => SystemDescription::load(path)?,
        None => SystemDescription::solar(),
    };
    let graph = SceneGraph::build(description)?;
    let starfield = Starfield::generate(&config.starfield);
    let input_map = load_bindings(&dirs.config_dir);

    let session = Session::new(graph, starfield, input_map, &config);
    run(OrreryApp::new(
        session,
        config,
        file_config,
        args,
        dirs.config_dir,
    ))
}
