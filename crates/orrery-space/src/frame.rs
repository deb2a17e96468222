//! Frame composition: turns the composed scene into an ordered list of draws.
//!
//! [`FrameComposer::compose`] is backend independent. The resulting
//! [`FramePlan`] is replayed into any [`DrawTarget`]; the GPU renderer is one
//! such target and tests record the sequence with another.
//!
//! Order of a plan:
//! 1. backdrop
//! 2. stars
//! 3. per body: the opaque surface, then its additive layers
//! 4. translucent layers (clouds, rings)
//! 5. orbit trails

use glam::{Mat4, Quat, Vec3};
use orrery_config::RenderConfig;
use orrery_render::texture::WHITE_TEXTURE;
use orrery_render::{GeometryKey, PassKind, Resolution, ShapeKind, TextureHandle, TextureTable};

use crate::body::SurfaceLayer;
use crate::error::DrawError;
use crate::kinematics;
use crate::scene_graph::{BodyId, SceneGraph, SceneNode};

/// What a draw command renders.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DrawLayer {
    Backdrop,
    Stars,
    Surface,
    NightLights,
    /// Corona shell by index, innermost first.
    Corona(usize),
    Clouds,
    Ring,
    Trail,
}

/// Per-draw shading inputs.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Material {
    pub tint: [f32; 4],
    pub emission: [f32; 3],
    /// Shaded by the point light.
    pub lit: bool,
}

impl Material {
    pub const UNLIT: Material = Material {
        tint: [1.0; 4],
        emission: [0.0; 3],
        lit: false,
    };

    pub const LIT: Material = Material {
        tint: [1.0; 4],
        emission: [0.0; 3],
        lit: true,
    };

    pub fn with_tint(self, tint: [f32; 4]) -> Self {
        Self { tint, ..self }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Primitive {
    Mesh {
        geometry: GeometryKey,
        model: Mat4,
        material: Material,
    },
    /// The whole starfield as one instanced draw.
    Stars { count: u32 },
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DrawCommand {
    pub pass: PassKind,
    pub body: Option<BodyId>,
    pub layer: DrawLayer,
    pub primitive: Primitive,
}

impl DrawCommand {
    pub fn geometry(&self) -> Option<&GeometryKey> {
        match &self.primitive {
            Primitive::Mesh { geometry, .. } => Some(geometry),
            Primitive::Stars { .. } => None,
        }
    }
}

/// Receives the draws of a frame in order.
pub trait DrawTarget {
    fn draw(&mut self, command: &DrawCommand) -> Result<(), DrawError>;
}

/// Tessellation and appearance settings taken from the render configuration.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct FrameSettings {
    pub sphere: Resolution,
    pub ring: Resolution,
    pub trail: Resolution,
    pub trail_alpha: f32,
    pub sky_radius: f32,
}

impl FrameSettings {
    pub fn from_config(config: &RenderConfig) -> Self {
        Self {
            sphere: Resolution::new(config.sphere_slices, config.sphere_stacks),
            ring: Resolution::new(config.ring_segments, 1),
            trail: Resolution::new(config.trail_segments, 1),
            trail_alpha: config.trail_alpha,
            sky_radius: config.sky_radius,
        }
    }
}

impl Default for FrameSettings {
    fn default() -> Self {
        Self::from_config(&RenderConfig::default())
    }
}

/// Ordered draws of one frame.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FramePlan {
    commands: Vec<DrawCommand>,
}

impl FramePlan {
    pub fn commands(&self) -> &[DrawCommand] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Number of mesh draws, each needing its own per-draw uniform slot.
    pub fn mesh_draws(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c.primitive, Primitive::Mesh { .. }))
            .count()
    }

    /// Replay every command into `target`, stopping at the first rejection.
    pub fn execute(&self, target: &mut dyn DrawTarget) -> Result<(), DrawError> {
        for command in &self.commands {
            target.draw(command)?;
        }
        Ok(())
    }
}

/// Builds [`FramePlan`]s for a scene.
#[derive(Clone, Debug, Default)]
pub struct FrameComposer {
    settings: FrameSettings,
}

impl FrameComposer {
    pub fn new(settings: FrameSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &FrameSettings {
        &self.settings
    }

    pub fn set_settings(&mut self, settings: FrameSettings) {
        self.settings = settings;
    }

    /// Lay out the draws for `nodes`, the output of [`SceneGraph::compose`] at `sim_time`.
    pub fn compose(
        &self,
        graph: &SceneGraph,
        nodes: &[SceneNode],
        sim_time: f64,
        textures: &TextureTable,
        star_count: u32,
    ) -> Result<FramePlan, DrawError> {
        let s = &self.settings;
        let texture = |name: &str| -> Result<TextureHandle, DrawError> {
            textures
                .get(name)
                .ok_or_else(|| DrawError::MissingTexture(name.to_string()))
        };
        let mesh = |shape: ShapeKind, resolution: Resolution, tex: TextureHandle| {
            GeometryKey::new(shape, resolution, Some(tex))
        };

        let mut commands = Vec::with_capacity(2 + nodes.len() * 4);
        let mut translucent = Vec::new();
        let mut trails = Vec::new();

        if let Some(backdrop) = graph.description().backdrop_texture.as_deref() {
            commands.push(DrawCommand {
                pass: PassKind::Backdrop,
                body: None,
                layer: DrawLayer::Backdrop,
                primitive: Primitive::Mesh {
                    geometry: mesh(ShapeKind::InvertedSphere, s.sphere, texture(backdrop)?),
                    model: Mat4::from_scale(Vec3::splat(s.sky_radius)),
                    material: Material::UNLIT,
                },
            });
        }

        if star_count > 0 {
            commands.push(DrawCommand {
                pass: PassKind::Starfield,
                body: None,
                layer: DrawLayer::Stars,
                primitive: Primitive::Stars { count: star_count },
            });
        }

        let white = texture(WHITE_TEXTURE)?;
        for &id in graph.order() {
            let body = graph.body(id);
            let node = nodes
                .get(id.0)
                .ok_or_else(|| DrawError::MissingGeometry(format!("node of '{}'", body.name)))?;
            let tilt = Quat::from_rotation_z(body.spin.axial_tilt);

            let surface = match body.emission {
                Some(emission) => Material {
                    emission,
                    ..Material::UNLIT
                },
                None => Material::LIT,
            };
            let body_model = node.body_model(body.radius);
            commands.push(DrawCommand {
                pass: PassKind::Opaque,
                body: Some(id),
                layer: DrawLayer::Surface,
                primitive: Primitive::Mesh {
                    geometry: mesh(ShapeKind::Sphere, s.sphere, texture(body.texture.as_str())?),
                    model: body_model,
                    material: surface,
                },
            });

            for layer in &body.layers {
                match layer {
                    SurfaceLayer::NightLights { texture: name } => commands.push(DrawCommand {
                        pass: PassKind::Additive,
                        body: Some(id),
                        layer: DrawLayer::NightLights,
                        primitive: Primitive::Mesh {
                            geometry: mesh(ShapeKind::Sphere, s.sphere, texture(name.as_str())?),
                            model: body_model,
                            material: Material::UNLIT,
                        },
                    }),
                    SurfaceLayer::Corona { shells } => {
                        for (i, shell) in shells.iter().enumerate() {
                            commands.push(DrawCommand {
                                pass: PassKind::Additive,
                                body: Some(id),
                                layer: DrawLayer::Corona(i),
                                primitive: Primitive::Mesh {
                                    geometry: mesh(ShapeKind::Sphere, s.sphere, white),
                                    model: node.model(Quat::IDENTITY, body.radius * shell.scale),
                                    material: Material::UNLIT.with_tint(shell.color),
                                },
                            });
                        }
                    }
                    SurfaceLayer::CloudShell {
                        texture: name,
                        scale,
                        spin_period,
                        opacity,
                    } => {
                        let phi = kinematics::phase_angle(0.0, Some(*spin_period), sim_time);
                        let orientation = tilt * kinematics::spin_rotation(phi);
                        translucent.push(DrawCommand {
                            pass: PassKind::Translucent,
                            body: Some(id),
                            layer: DrawLayer::Clouds,
                            primitive: Primitive::Mesh {
                                geometry: mesh(ShapeKind::Sphere, s.sphere, texture(name.as_str())?),
                                model: node.model(orientation, body.radius * scale),
                                material: Material::LIT.with_tint([1.0, 1.0, 1.0, *opacity]),
                            },
                        });
                    }
                    SurfaceLayer::Ring {
                        texture: name,
                        inner,
                        outer,
                        opacity,
                    } => translucent.push(DrawCommand {
                        pass: PassKind::Translucent,
                        body: Some(id),
                        layer: DrawLayer::Ring,
                        primitive: Primitive::Mesh {
                            geometry: mesh(ShapeKind::annulus(*inner, *outer), s.ring, texture(name.as_str())?),
                            model: node.model(tilt, *outer),
                            material: Material::UNLIT.with_tint([1.0, 1.0, 1.0, *opacity]),
                        },
                    }),
                }
            }

            if let Some([r, g, b]) = body.trail_color
                && body.orbit.orbits()
            {
                trails.push(DrawCommand {
                    pass: PassKind::Trail,
                    body: Some(id),
                    layer: DrawLayer::Trail,
                    primitive: Primitive::Mesh {
                        geometry: mesh(ShapeKind::OrbitLoop, s.trail, white),
                        model: node.trail_model(body.orbit.distance),
                        material: Material::UNLIT.with_tint([r, g, b, s.trail_alpha]),
                    },
                });
            }
        }

        commands.extend(translucent);
        commands.extend(trails);
        Ok(FramePlan { commands })
    }
}
