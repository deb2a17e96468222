//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;

use crate::Config;

/// Orrery command-line arguments.
///
/// CLI values override settings loaded from `config.ron`.
#[derive(Parser, Debug, Clone, Default)]
#[command(name = "orrery", about = "Animated solar system scene")]
pub struct CliArgs {
    /// Window width.
    #[arg(long)]
    pub width: Option<u32>,

    /// Window height.
    #[arg(long)]
    pub height: Option<u32>,

    /// Start in fullscreen.
    #[arg(long)]
    pub fullscreen: Option<bool>,

    /// Log level (error, warn, info, debug, trace).
    #[arg(long)]
    pub log_level: Option<String>,

    /// Path to config directory (overrides default location).
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Directory containing body and backdrop textures.
    #[arg(long)]
    pub textures: Option<PathBuf>,

    /// RON file describing the bodies to simulate.
    #[arg(long)]
    pub system: Option<PathBuf>,

    /// Starfield seed.
    #[arg(long)]
    pub seed: Option<u64>,

    /// Start with the simulation paused.
    #[arg(long)]
    pub paused: bool,
}

impl Config {
    /// Apply CLI overrides to a loaded config.
    pub fn apply_cli_overrides(&mut self, args: &CliArgs) {
        if let Some(w) = args.width {
            self.window.width = w;
        }
        if let Some(h) = args.height {
            self.window.height = h;
        }
        if let Some(fs) = args.fullscreen {
            self.window.fullscreen = fs;
        }
        if let Some(ref level) = args.log_level {
            self.debug.log_level = level.clone();
        }
        if let Some(ref dir) = args.textures {
            self.assets.texture_dir = dir.clone();
        }
        if let Some(ref system) = args.system {
            self.assets.system_file = Some(system.clone());
        }
        if let Some(seed) = args.seed {
            self.starfield.seed = seed;
        }
        if args.paused {
            self.simulation.start_paused = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_override() {
        let mut config = Config::default();
        let args = CliArgs {
            width: Some(1920),
            seed: Some(7),
            textures: Some(PathBuf::from("/opt/orrery/img")),
            paused: true,
            ..Default::default()
        };
        config.apply_cli_overrides(&args);
        assert_eq!(config.window.width, 1920);
        assert_eq!(config.starfield.seed, 7);
        assert_eq!(config.assets.texture_dir, PathBuf::from("/opt/orrery/img"));
        assert!(config.simulation.start_paused);
        // Non-overridden fields retain defaults
        assert_eq!(config.window.height, 850);
    }

    #[test]
    fn test_cli_no_override() {
        let original = Config::default();
        let mut config = Config::default();
        config.apply_cli_overrides(&CliArgs::default());
        assert_eq!(config, original);
    }

    #[test]
    fn test_cli_parses_flags() {
        let args = CliArgs::parse_from(["orrery", "--system", "moons.ron", "--paused"]);
        assert_eq!(args.system, Some(PathBuf::from("moons.ron")));
        assert!(args.paused);
        assert!(args.width.is_none());
    }
}
