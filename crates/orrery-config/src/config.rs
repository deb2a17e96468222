//! Configuration structs with defaults matching the built-in scene and RON persistence.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

const CONFIG_FILE: &str = "config.ron";

/// Top-level orrery configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Window settings.
    pub window: WindowConfig,
    /// Orbit camera and projection.
    pub camera: CameraConfig,
    /// Procedural starfield.
    pub starfield: StarfieldConfig,
    /// Mesh resolutions and pass parameters.
    pub render: RenderConfig,
    /// Point light at the central star.
    pub lighting: LightingConfig,
    /// Texture directory and optional system description.
    pub assets: AssetConfig,
    /// Simulation clock.
    pub simulation: SimulationConfig,
    /// Debug/development settings.
    pub debug: DebugConfig,
}

/// Window configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WindowConfig {
    /// Window width in logical pixels.
    pub width: u32,
    /// Window height in logical pixels.
    pub height: u32,
    /// Start in fullscreen mode.
    pub fullscreen: bool,
    /// Enable vsync (PresentMode::Fifo).
    pub vsync: bool,
    /// Window title.
    pub title: String,
}

/// Orbit camera configuration. Angles are radians, speeds are per real second.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CameraConfig {
    /// Vertical field of view in degrees.
    pub fov_y_degrees: f32,
    pub near: f32,
    pub far: f32,
    pub default_distance: f32,
    pub default_yaw: f32,
    pub default_pitch: f32,
    pub yaw_speed: f32,
    pub pitch_speed: f32,
    /// Zoom speed in world units per second.
    pub zoom_speed: f32,
    pub min_distance: f32,
    pub max_distance: f32,
    /// Pitch is clamped to `±(π/2 - pitch_margin)`.
    pub pitch_margin: f32,
}

/// Starfield configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StarfieldConfig {
    /// Seed for the deterministic generator.
    pub seed: u64,
    /// Number of stars.
    pub count: u32,
    /// Radius of the sphere the stars are placed on, in world units.
    pub radius: f32,
    /// Twinkle angular speed range in radians per second.
    pub min_twinkle_speed: f32,
    pub max_twinkle_speed: f32,
    /// Base brightness range.
    pub min_brightness: f32,
    pub max_brightness: f32,
}

/// Rendering configuration. Changing any mesh resolution invalidates the geometry cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RenderConfig {
    pub sphere_slices: u32,
    pub sphere_stacks: u32,
    pub ring_segments: u32,
    pub trail_segments: u32,
    /// Opacity of orbit trails.
    pub trail_alpha: f32,
    /// Radius of the inverted backdrop sphere.
    pub sky_radius: f32,
    /// Framebuffer clear colour (linear RGB).
    pub clear_color: [f32; 3],
}

/// Point light configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LightingConfig {
    pub ambient: [f32; 3],
    pub diffuse: [f32; 3],
    pub specular_strength: f32,
    pub shininess: f32,
    /// Attenuation `1 / (constant + linear·d + quadratic·d²)`.
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
}

/// Asset locations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AssetConfig {
    /// Directory holding body and backdrop textures.
    pub texture_dir: PathBuf,
    /// Optional RON file replacing the built-in body table.
    pub system_file: Option<PathBuf>,
}

/// Simulation clock configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    /// Start with the simulation paused.
    pub start_paused: bool,
    /// Simulated seconds per real second.
    pub time_scale: f32,
}

/// Debug/development configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DebugConfig {
    /// Log level override (e.g., "debug", "info", "warn").
    pub log_level: String,
}

// --- Default implementations ---

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            width: 1400,
            height: 850,
            fullscreen: false,
            vsync: true,
            title: "Solar System | Arrows=orbit  +/-=zoom  Space=pause  H=reset  Esc=quit"
                .to_string(),
        }
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fov_y_degrees: 45.0,
            near: 1.0,
            far: 5000.0,
            default_distance: 280.0,
            default_yaw: 0.0,
            default_pitch: 0.35,
            yaw_speed: 2.0,
            pitch_speed: 1.5,
            zoom_speed: 80.0,
            min_distance: 50.0,
            max_distance: 800.0,
            pitch_margin: 0.05,
        }
    }
}

impl Default for StarfieldConfig {
    fn default() -> Self {
        Self {
            seed: 0x5EED_57A2,
            count: 2500,
            radius: 2000.0,
            min_twinkle_speed: 0.5,
            max_twinkle_speed: 3.0,
            min_brightness: 0.25,
            max_brightness: 1.0,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            sphere_slices: 80,
            sphere_stacks: 80,
            ring_segments: 120,
            trail_segments: 180,
            trail_alpha: 0.15,
            sky_radius: 2500.0,
            clear_color: [0.0, 0.0, 0.0],
        }
    }
}

impl Default for LightingConfig {
    fn default() -> Self {
        Self {
            ambient: [0.08, 0.08, 0.10],
            diffuse: [1.0, 0.98, 0.92],
            specular_strength: 0.3,
            shininess: 25.0,
            constant: 1.0,
            linear: 0.0005,
            quadratic: 0.000_002,
        }
    }
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            texture_dir: PathBuf::from("img"),
            system_file: None,
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            start_paused: false,
            time_scale: 1.0,
        }
    }
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

// --- Load / Save / Reload ---

impl Config {
    /// Load config from the given directory, or create a default config file.
    pub fn load_or_create(config_dir: &Path) -> Result<Self, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);

        if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
            let config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;
            log::info!("Loaded config from {}", config_path.display());
            Ok(config)
        } else {
            let config = Config::default();
            config.save(config_dir)?;
            log::info!("Created default config at {}", config_path.display());
            Ok(config)
        }
    }

    /// Save config to the given directory as `config.ron`.
    pub fn save(&self, config_dir: &Path) -> Result<(), ConfigError> {
        std::fs::create_dir_all(config_dir).map_err(ConfigError::WriteError)?;

        let config_path = config_dir.join(CONFIG_FILE);
        let pretty = ron::ser::PrettyConfig::new()
            .depth_limit(3)
            .separate_tuple_members(true)
            .enumerate_arrays(false);

        let serialized =
            ron::ser::to_string_pretty(self, pretty).map_err(ConfigError::SerializeError)?;

        std::fs::write(&config_path, serialized).map_err(ConfigError::WriteError)?;
        Ok(())
    }

    /// Hot-reload: returns `Some(new_config)` if the file changed, `None` otherwise.
    pub fn reload(&self, config_dir: &Path) -> Result<Option<Self>, ConfigError> {
        let config_path = config_dir.join(CONFIG_FILE);
        let contents = std::fs::read_to_string(&config_path).map_err(ConfigError::ReadError)?;
        let new_config: Config = ron::from_str(&contents).map_err(ConfigError::ParseError)?;

        if &new_config != self {
            log::info!("Config reloaded with changes");
            Ok(Some(new_config))
        } else {
            Ok(None)
        }
    }

    /// Reject values the scene cannot be built from.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let cam = &self.camera;
        if !(cam.near > 0.0 && cam.far > cam.near) {
            return invalid("camera.near/far", "require 0 < near < far");
        }
        if !(cam.fov_y_degrees > 0.0 && cam.fov_y_degrees < 180.0) {
            return invalid("camera.fov_y_degrees", "must be in (0, 180)");
        }
        if !(cam.min_distance > 0.0 && cam.max_distance >= cam.min_distance) {
            return invalid("camera.min/max_distance", "require 0 < min <= max");
        }
        if !(0.0..std::f32::consts::FRAC_PI_2).contains(&cam.pitch_margin) {
            return invalid("camera.pitch_margin", "must be in [0, pi/2)");
        }

        let stars = &self.starfield;
        if stars.min_twinkle_speed <= 0.0 || stars.max_twinkle_speed < stars.min_twinkle_speed {
            return invalid("starfield.twinkle_speed", "require 0 < min <= max");
        }
        if stars.min_brightness < 0.0 || stars.max_brightness < stars.min_brightness {
            return invalid("starfield.brightness", "require 0 <= min <= max");
        }
        if !(stars.radius > 0.0 && stars.radius < cam.far) {
            return invalid("starfield.radius", "must be in (0, camera.far)");
        }

        let render = &self.render;
        if render.sphere_slices < 3 || render.sphere_stacks < 2 {
            return invalid("render.sphere_slices/stacks", "sphere needs >= 3 slices and >= 2 stacks");
        }
        if render.ring_segments < 3 || render.trail_segments < 3 {
            return invalid("render.ring/trail_segments", "closed curves need >= 3 segments");
        }
        if !(render.sky_radius > 0.0 && render.sky_radius < cam.far) {
            return invalid("render.sky_radius", "must be in (0, camera.far)");
        }

        let light = &self.lighting;
        let coefficients = [light.constant, light.linear, light.quadratic];
        if coefficients.iter().any(|c| !(*c >= 0.0 && c.is_finite()))
            || coefficients.iter().all(|&c| c == 0.0)
        {
            return invalid(
                "lighting.constant/linear/quadratic",
                "require finite coefficients >= 0 with at least one > 0",
            );
        }
        if !(self.simulation.time_scale >= 0.0) {
            return invalid("simulation.time_scale", "must be non-negative");
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: &'static str) -> Result<(), ConfigError> {
    Err(ConfigError::Invalid { field, reason })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_serializes() {
        let config = Config::default();
        let ron_str =
            ron::ser::to_string_pretty(&config, ron::ser::PrettyConfig::new().depth_limit(3))
                .unwrap();
        assert!(ron_str.contains("width: 1400"));
        assert!(ron_str.contains("count: 2500"));
    }

    #[test]
    fn test_config_roundtrip() {
        let config = Config::default();
        let ron_str = ron::to_string(&config).unwrap();
        let deserialized: Config = ron::from_str(&ron_str).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_missing_section_uses_default() {
        let ron_str = "(window: (width: 800), render: ())";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config.window.width, 800);
        assert_eq!(config.window.height, 850);
        assert_eq!(config.camera, CameraConfig::default());
    }

    #[test]
    fn test_extra_field_ignored() {
        let result: Result<Config, _> = ron::from_str("(future_setting: true)");
        assert!(result.is_ok());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.window.width = 1920;
        config.starfield.seed = 42;
        config.assets.system_file = Some(PathBuf::from("systems/alt.ron"));

        config.save(dir.path()).unwrap();
        let loaded = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, loaded);
    }

    #[test]
    fn test_load_or_create_writes_default() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_or_create(dir.path()).unwrap();
        assert_eq!(config, Config::default());
        assert!(dir.path().join(CONFIG_FILE).exists());
    }

    #[test]
    fn test_reload_detects_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();

        let mut modified = config.clone();
        modified.render.sphere_slices = 40;
        modified.save(dir.path()).unwrap();

        let result = config.reload(dir.path()).unwrap();
        assert_eq!(result.unwrap().render.sphere_slices, 40);
    }

    #[test]
    fn test_reload_no_changes() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::default();
        config.save(dir.path()).unwrap();
        assert!(config.reload(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_invalid_ron_produces_error() {
        let result: Result<Config, _> = ron::from_str("{{not valid}}");
        assert!(result.is_err());
    }

    #[test]
    fn test_ron_comments_allowed() {
        let ron_str = "// orrery settings\n(\n  // nothing overridden\n)";
        let config: Config = ron::from_str(ron_str).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_default_validates() {
        assert!(Config::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_inverted_clip_planes() {
        let mut config = Config::default();
        config.camera.far = 0.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "camera.near/far", .. })
        ));
    }

    #[test]
    fn test_validate_rejects_degenerate_sphere() {
        let mut config = Config::default();
        config.render.sphere_slices = 2;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_zero_attenuation() {
        let mut config = Config::default();
        config.lighting.constant = 0.0;
        config.lighting.linear = 0.0;
        config.lighting.quadratic = 0.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "lighting.constant/linear/quadratic",
                ..
            })
        ));

        config.lighting.quadratic = 0.001;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_negative_attenuation() {
        let mut config = Config::default();
        config.lighting.linear = -0.5;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid {
                field: "lighting.constant/linear/quadratic",
                ..
            })
        ));
    }

    #[test]
    fn test_validate_rejects_sky_beyond_far_plane() {
        let mut config = Config::default();
        config.render.sky_radius = config.camera.far;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "render.sky_radius", .. })
        ));
    }

    #[test]
    fn test_validate_rejects_star_shell_beyond_far_plane() {
        let mut config = Config::default();
        config.starfield.radius = config.camera.far + 1.0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { field: "starfield.radius", .. })
        ));
    }

    #[test]
    fn test_validate_rejects_inverted_zoom_range() {
        let mut config = Config::default();
        config.camera.min_distance = 900.0;
        assert!(config.validate().is_err());
    }
}
