//! Static description of the simulated system.
//!
//! A [`SystemDescription`] is built once (from the built-in table or a RON
//! file), validated by [`crate::SceneGraph::build`] and never mutated
//! afterwards. Angles are radians, times are simulated seconds.

use std::f32::consts::PI;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::SceneError;

/// Circular orbit parameters relative to the parent body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrbitalElements {
    pub distance: f32,
    /// `None` for a body fixed at its parent's origin.
    pub period: Option<f32>,
    #[serde(default)]
    pub phase0: f32,
    /// Tilt of the orbital plane about the line of nodes (local X).
    #[serde(default)]
    pub inclination: f32,
    /// Rotation of the line of nodes about the ecliptic normal (Y).
    #[serde(default)]
    pub ascending_node: f32,
}

impl OrbitalElements {
    pub fn fixed() -> Self {
        Self {
            distance: 0.0,
            period: None,
            phase0: 0.0,
            inclination: 0.0,
            ascending_node: 0.0,
        }
    }

    pub fn circular(distance: f32, period: f32, inclination_deg: f32, node_deg: f32) -> Self {
        Self {
            distance,
            period: Some(period),
            phase0: 0.0,
            inclination: inclination_deg.to_radians(),
            ascending_node: node_deg.to_radians(),
        }
    }

    /// Whether the body moves at all.
    pub fn orbits(&self) -> bool {
        self.distance > 0.0 && self.period.is_some()
    }
}

/// Rotation of a body about its own axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpinElements {
    /// Signed; negative spins retrograde. Ignored when tidally locked.
    pub spin_period: f32,
    #[serde(default)]
    pub spin_phase0: f32,
    /// Tilt of the spin axis about local Z.
    #[serde(default)]
    pub axial_tilt: f32,
    #[serde(default)]
    pub tidally_locked: bool,
}

impl SpinElements {
    pub fn new(spin_period: f32, tilt_deg: f32) -> Self {
        Self {
            spin_period,
            spin_phase0: 0.0,
            axial_tilt: tilt_deg.to_radians(),
            tidally_locked: false,
        }
    }

    pub fn locked() -> Self {
        Self {
            spin_period: 0.0,
            spin_phase0: 0.0,
            axial_tilt: 0.0,
            tidally_locked: true,
        }
    }
}

/// One additive glow shell around an emissive body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CoronaShell {
    /// Radius multiplier relative to the body.
    pub scale: f32,
    pub color: [f32; 4],
}

/// Extra geometry drawn with a body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SurfaceLayer {
    /// Emissive texture added over the surface, turning with it.
    NightLights { texture: String },
    /// Translucent shell with its own spin; alpha is taken from luminance.
    CloudShell {
        texture: String,
        scale: f32,
        spin_period: f32,
        opacity: f32,
    },
    /// Flat textured annulus in the body's equatorial plane.
    Ring {
        texture: String,
        inner: f32,
        outer: f32,
        opacity: f32,
    },
    Corona { shells: Vec<CoronaShell> },
}

impl SurfaceLayer {
    pub fn texture(&self) -> Option<&str> {
        match self {
            SurfaceLayer::NightLights { texture }
            | SurfaceLayer::CloudShell { texture, .. }
            | SurfaceLayer::Ring { texture, .. } => Some(texture),
            SurfaceLayer::Corona { .. } => None,
        }
    }

    /// Whether the texture's alpha should be derived from luminance at load.
    pub fn wants_luminance_alpha(&self) -> bool {
        matches!(self, SurfaceLayer::CloudShell { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CelestialBody {
    pub name: String,
    pub radius: f32,
    pub orbit: OrbitalElements,
    pub spin: SpinElements,
    #[serde(default)]
    pub parent: Option<String>,
    pub texture: String,
    #[serde(default)]
    pub layers: Vec<SurfaceLayer>,
    /// Colour of the orbit trail; `None` draws no trail.
    #[serde(default)]
    pub trail_color: Option<[f32; 3]>,
    /// Self-illumination; an emissive body is not lit by the point light.
    #[serde(default)]
    pub emission: Option<[f32; 3]>,
}

impl CelestialBody {
    /// Reject element values that cannot be animated.
    pub fn validate(&self) -> Result<(), SceneError> {
        let body = || self.name.clone();
        if !(self.radius > 0.0 && self.radius.is_finite()) {
            return Err(SceneError::InvalidRadius {
                body: body(),
                radius: self.radius,
            });
        }
        let distance = self.orbit.distance;
        if !(distance >= 0.0 && distance.is_finite()) {
            return Err(SceneError::InvalidDistance {
                body: body(),
                distance,
            });
        }
        let angles = [
            ("phase0", self.orbit.phase0),
            ("inclination", self.orbit.inclination),
            ("ascending_node", self.orbit.ascending_node),
            ("spin_phase0", self.spin.spin_phase0),
            ("axial_tilt", self.spin.axial_tilt),
        ];
        if let Some(&(field, value)) = angles.iter().find(|(_, v)| !v.is_finite()) {
            return Err(SceneError::NonFiniteAngle {
                body: body(),
                field,
                value,
            });
        }
        if !(0.0..=PI).contains(&self.orbit.inclination) {
            return Err(SceneError::InvalidInclination {
                body: body(),
                inclination: self.orbit.inclination,
            });
        }
        if let Some(period) = self.orbit.period {
            if period == 0.0 {
                return Err(SceneError::ZeroPeriod { body: body() });
            }
            if !period.is_finite() {
                return Err(SceneError::NonFinitePeriod {
                    body: body(),
                    period,
                });
            }
        }
        let check_spin = |period: f32| {
            if period == 0.0 {
                Err(SceneError::ZeroSpinPeriod { body: body() })
            } else if !period.is_finite() {
                Err(SceneError::NonFiniteSpinPeriod {
                    body: body(),
                    period,
                })
            } else {
                Ok(())
            }
        };
        if !self.spin.tidally_locked {
            check_spin(self.spin.spin_period)?;
        }
        for layer in &self.layers {
            if let SurfaceLayer::CloudShell { spin_period, .. } = layer {
                check_spin(*spin_period)?;
            }
        }
        Ok(())
    }
}

/// The complete, immutable body table of a scene.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemDescription {
    pub bodies: Vec<CelestialBody>,
    /// Panorama mapped onto the inverted backdrop sphere.
    #[serde(default)]
    pub backdrop_texture: Option<String>,
}

impl SystemDescription {
    pub fn from_ron_str(source: &str, origin: &Path) -> Result<Self, SceneError> {
        ron::from_str(source).map_err(|source| SceneError::Parse {
            path: origin.to_path_buf(),
            source,
        })
    }

    pub fn load(path: &Path) -> Result<Self, SceneError> {
        let source = std::fs::read_to_string(path).map_err(|source| SceneError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_ron_str(&source, path)
    }

    pub fn to_ron(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }

    /// Every texture file the scene references, deduplicated, in first-use order.
    pub fn texture_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = Vec::new();
        let all = self
            .backdrop_texture
            .as_deref()
            .into_iter()
            .chain(self.bodies.iter().flat_map(|b| {
                std::iter::once(b.texture.as_str()).chain(b.layers.iter().filter_map(|l| l.texture()))
            }));
        for name in all {
            if !names.contains(&name) {
                names.push(name);
            }
        }
        names
    }

    /// Textures that need luminance-derived alpha.
    pub fn luminance_alpha_textures(&self) -> Vec<&str> {
        self.bodies
            .iter()
            .flat_map(|b| b.layers.iter())
            .filter(|l| l.wants_luminance_alpha())
            .filter_map(|l| l.texture())
            .collect()
    }

    /// The Sun, eight planets and the Moon. Sizes and distances are not to scale.
    pub fn solar() -> Self {
        let planet = |name: &str,
                      radius: f32,
                      orbit: OrbitalElements,
                      spin: SpinElements,
                      trail: [f32; 3]| CelestialBody {
            name: name.to_string(),
            radius,
            orbit,
            spin,
            parent: Some("Sun".to_string()),
            texture: format!("{}.jpg", name.to_lowercase()),
            layers: Vec::new(),
            trail_color: Some(trail),
            emission: None,
        };

        let sun = CelestialBody {
            name: "Sun".to_string(),
            radius: 14.0,
            orbit: OrbitalElements::fixed(),
            spin: SpinElements::new(25.0, 0.0),
            parent: None,
            texture: "sun.jpg".to_string(),
            layers: vec![SurfaceLayer::Corona {
                shells: vec![
                    CoronaShell {
                        scale: 1.12,
                        color: [1.0, 0.85, 0.4, 0.12],
                    },
                    CoronaShell {
                        scale: 1.28,
                        color: [1.0, 0.7, 0.2, 0.06],
                    },
                    CoronaShell {
                        scale: 1.50,
                        color: [0.9, 0.5, 0.15, 0.03],
                    },
                ],
            }],
            trail_color: None,
            emission: Some([1.0, 0.95, 0.8]),
        };

        let mut earth = planet(
            "Earth",
            3.2,
            OrbitalElements::circular(72.0, 30.0, 0.0, 0.0),
            SpinElements::new(3.0, 23.44),
            [0.3, 0.5, 0.9],
        );
        earth.layers = vec![
            SurfaceLayer::NightLights {
                texture: "earth_night.jpg".to_string(),
            },
            SurfaceLayer::CloudShell {
                texture: "earth_clouds.jpg".to_string(),
                scale: 1.015,
                spin_period: 4.5,
                opacity: 0.75,
            },
        ];

        let moon = CelestialBody {
            parent: Some("Earth".to_string()),
            ..planet(
                "Moon",
                0.9,
                OrbitalElements::circular(6.5, 5.0, 5.145, 125.08),
                SpinElements::locked(),
                [0.6, 0.6, 0.6],
            )
        };

        let mut saturn = planet(
            "Saturn",
            6.0,
            OrbitalElements::circular(175.0, 120.0, 2.489, 113.665),
            SpinElements::new(1.7, 26.73),
            [0.8, 0.8, 0.5],
        );
        saturn.layers = vec![SurfaceLayer::Ring {
            texture: "saturn_ring.png".to_string(),
            inner: 7.5,
            outer: 12.0,
            opacity: 0.85,
        }];

        Self {
            bodies: vec![
                sun,
                planet(
                    "Mercury",
                    1.5,
                    OrbitalElements::circular(30.0, 12.0, 7.005, 48.331),
                    SpinElements::new(20.0, 0.0),
                    [0.7, 0.7, 0.7],
                ),
                planet(
                    "Venus",
                    3.0,
                    OrbitalElements::circular(50.0, 20.0, 3.395, 76.680),
                    SpinElements::new(-35.0, 0.0),
                    [0.9, 0.7, 0.4],
                ),
                earth,
                moon,
                planet(
                    "Mars",
                    2.2,
                    OrbitalElements::circular(95.0, 45.0, 1.848, 49.558),
                    SpinElements::new(3.1, 25.19),
                    [0.9, 0.4, 0.3],
                ),
                planet(
                    "Jupiter",
                    7.0,
                    OrbitalElements::circular(135.0, 80.0, 1.303, 100.464),
                    SpinElements::new(1.5, 0.0),
                    [0.8, 0.7, 0.5],
                ),
                saturn,
                planet(
                    "Uranus",
                    4.0,
                    OrbitalElements::circular(215.0, 170.0, 0.773, 74.006),
                    SpinElements::new(-2.8, 97.77),
                    [0.5, 0.8, 0.9],
                ),
                planet(
                    "Neptune",
                    3.8,
                    OrbitalElements::circular(250.0, 220.0, 1.770, 131.784),
                    SpinElements::new(2.5, 28.32),
                    [0.3, 0.4, 0.9],
                ),
            ],
            backdrop_texture: Some("milky_way.jpg".to_string()),
        }
    }
}
