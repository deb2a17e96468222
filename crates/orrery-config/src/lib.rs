//! Configuration for the orrery.
//!
//! Settings persist to disk as `config.ron` and can be overridden from the
//! command line. Every section defaults independently, so partial files and
//! files written by older builds still load.

mod cli;
mod config;
mod error;

pub use cli::CliArgs;
pub use config::{
    AssetConfig, CameraConfig, Config, DebugConfig, LightingConfig, RenderConfig,
    SimulationConfig, StarfieldConfig, WindowConfig,
};
pub use error::ConfigError;
