//! GPU execution of [`FramePlan`]s.
//!
//! [`SystemRenderer`] owns every GPU resource of the scene: the pass
//! pipelines, the loaded textures, the geometry cache, and the per-frame
//! uniform and star-instance buffers. A frame is prepared (cache misses and
//! buffer writes) before the render pass opens, then replayed into a
//! [`GpuDrawTarget`] inside a single pass.

use std::path::Path;
use std::sync::Arc;

use glam::Vec3;
use orrery_config::{LightingConfig, RenderConfig};
use orrery_render::texture::WHITE_TEXTURE;
use orrery_render::{
    BufferAllocator, Camera, DepthBuffer, DrawUniform, FrameEncoder, FrameUniform, GeometryCache,
    GeometryKey, ManagedTexture, MeshBuffer, MeshData, PassKind, PointLight, RenderContext,
    Resolution, ScenePass, ScenePipelines, ShaderLibrary, ShapeKind, StarInstance,
    SurfaceError, TextureManager, TextureTable, annulus, load_image, luminance_to_alpha,
    orbit_loop, uv_sphere,
};

use crate::body::SystemDescription;
use crate::error::{DrawError, RendererError};
use crate::frame::{DrawCommand, DrawTarget, FrameComposer, FramePlan, FrameSettings, Primitive};
use crate::scene_graph::{SceneGraph, SceneNode};
use crate::starfield::Starfield;

/// Vertices of the screen-aligned quad each star is expanded into.
const STAR_QUAD_VERTICES: u32 = 6;

/// A cached mesh paired with the texture it is drawn with.
pub struct Drawable {
    pub mesh: Arc<MeshBuffer>,
    pub texture: Arc<ManagedTexture>,
}

/// Unit mesh for a cached shape.
pub fn mesh_for(shape: ShapeKind, resolution: Resolution) -> MeshData {
    match shape {
        ShapeKind::Sphere => uv_sphere(resolution.segments, resolution.rings),
        ShapeKind::InvertedSphere => uv_sphere(resolution.segments, resolution.rings).inverted(),
        ShapeKind::Annulus { .. } => {
            annulus(shape.inner_ratio().unwrap_or(0.0), resolution.segments)
        }
        ShapeKind::OrbitLoop => orbit_loop(resolution.segments),
    }
}

/// World position of the first emissive body, where the point light sits.
pub fn light_position(graph: &SceneGraph, nodes: &[SceneNode]) -> Vec3 {
    graph
        .order()
        .iter()
        .find(|id| graph.body(**id).emission.is_some())
        .and_then(|id| nodes.get(id.0))
        .map_or(Vec3::ZERO, |node| node.world_position)
}

pub fn point_light(lighting: &LightingConfig, position: Vec3) -> PointLight {
    PointLight {
        position,
        ambient: Vec3::from(lighting.ambient),
        diffuse: Vec3::from(lighting.diffuse),
        specular_strength: lighting.specular_strength,
        shininess: lighting.shininess,
        constant: lighting.constant,
        linear: lighting.linear,
        quadratic: lighting.quadratic,
    }
}

pub struct SystemRenderer {
    pipelines: ScenePipelines,
    textures: TextureManager,
    texture_table: TextureTable,
    meshes: GeometryCache<Arc<MeshBuffer>>,
    drawables: GeometryCache<Drawable>,
    composer: FrameComposer,
    lighting: LightingConfig,
    clear_color: wgpu::Color,

    frame_buffer: wgpu::Buffer,
    frame_bind_group: wgpu::BindGroup,
    draw_buffer: wgpu::Buffer,
    draw_bind_group: wgpu::BindGroup,
    draw_capacity: usize,
    draw_staging: Vec<u8>,
    star_buffer: wgpu::Buffer,
    star_capacity: usize,
    star_count: u32,
    star_staging: Vec<StarInstance>,
}

impl SystemRenderer {
    /// Build pipelines and load every texture `description` references from
    /// `texture_dir`. Any missing or undecodable image aborts construction.
    pub fn new(
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        surface_format: wgpu::TextureFormat,
        description: &SystemDescription,
        texture_dir: &Path,
        render: &RenderConfig,
        lighting: &LightingConfig,
    ) -> Result<Self, RendererError> {
        let shaders = ShaderLibrary::with_builtin(device);
        let mut textures = TextureManager::new(device);
        let pipelines =
            ScenePipelines::new(device, &shaders, textures.bind_group_layout(), surface_format)?;

        let mut texture_table = TextureTable::new();
        let white = textures.white(device, queue)?;
        texture_table.insert(WHITE_TEXTURE, white.handle);

        let luminance_alpha = description.luminance_alpha_textures();
        for name in description.texture_names() {
            let path = texture_dir.join(name);
            let mut pixels = load_image(&path)?;
            if luminance_alpha.contains(&name) {
                pixels = luminance_to_alpha(&pixels);
            }
            let texture = textures.create_from_pixels(device, queue, name, &pixels)?;
            texture_table.insert(name, texture.handle);
        }
        tracing::info!(
            "Loaded {} textures from {}",
            texture_table.len(),
            texture_dir.display()
        );

        let allocator = BufferAllocator::new(device);
        let frame_buffer = allocator.create_dynamic(
            "frame-uniform",
            std::mem::size_of::<FrameUniform>() as u64,
            wgpu::BufferUsages::UNIFORM,
        );
        let frame_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("frame-bind-group"),
            layout: pipelines.frame_bind_group_layout(),
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: frame_buffer.as_entire_binding(),
            }],
        });

        let draw_capacity = 64;
        let (draw_buffer, draw_bind_group) =
            create_draw_buffer(device, pipelines.draw_bind_group_layout(), draw_capacity);

        let star_capacity = 1;
        let star_buffer = create_star_buffer(device, star_capacity);

        Ok(Self {
            pipelines,
            textures,
            texture_table,
            meshes: GeometryCache::new(),
            drawables: GeometryCache::new(),
            composer: FrameComposer::new(FrameSettings::from_config(render)),
            lighting: lighting.clone(),
            clear_color: clear_color(render.clear_color),
            frame_buffer,
            frame_bind_group,
            draw_buffer,
            draw_bind_group,
            draw_capacity,
            draw_staging: Vec::new(),
            star_buffer,
            star_capacity,
            star_count: 0,
            star_staging: Vec::new(),
        })
    }

    #[cfg(test)]
    fn cached_drawables(&self) -> usize {
        self.drawables.len()
    }

    /// Apply a new render configuration. Geometry built for other
    /// tessellations is dropped and rebuilt on the next frame that needs it.
    pub fn set_render_config(&mut self, render: &RenderConfig) {
        let settings = FrameSettings::from_config(render);
        self.clear_color = clear_color(render.clear_color);
        if settings.sphere == self.composer.settings().sphere
            && settings.ring == self.composer.settings().ring
            && settings.trail == self.composer.settings().trail
        {
            self.composer.set_settings(settings);
            return;
        }
        let live = [settings.sphere, settings.ring, settings.trail];
        let stale = |key: &GeometryKey| !live.contains(&key.resolution);
        self.drawables.invalidate(stale);
        self.meshes.invalidate(stale);
        self.composer.set_settings(settings);
    }

    pub fn set_lighting(&mut self, lighting: &LightingConfig) {
        self.lighting = lighting.clone();
    }

    /// Compose the draws of a frame.
    pub fn plan(
        &self,
        graph: &SceneGraph,
        nodes: &[SceneNode],
        sim_time: f64,
        star_count: u32,
    ) -> Result<FramePlan, DrawError> {
        self.composer
            .compose(graph, nodes, sim_time, &self.texture_table, star_count)
    }

    /// Build missing geometry and upload this frame's uniforms and star instances.
    #[allow(clippy::too_many_arguments)]
    pub fn prepare(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        plan: &FramePlan,
        camera: &Camera,
        light_position: Vec3,
        viewport: (u32, u32),
        starfield: &Starfield,
        star_time: f64,
    ) -> Result<(), DrawError> {
        for command in plan.commands() {
            if let Some(key) = command.geometry() {
                self.ensure_drawable(device, *key)?;
            }
        }

        let light = point_light(&self.lighting, light_position);
        let frame = FrameUniform {
            view_proj: camera.view_projection_matrix().to_cols_array_2d(),
            sky_view_proj: camera.sky_view_projection().to_cols_array_2d(),
            camera_pos: camera.position.extend(1.0).to_array(),
            light: light.to_uniform(),
            viewport: [viewport.0 as f32, viewport.1 as f32, 0.0, 0.0],
        };
        queue.write_buffer(&self.frame_buffer, 0, bytemuck::bytes_of(&frame));

        let needed = plan.mesh_draws();
        if needed > self.draw_capacity {
            let capacity = needed.next_power_of_two();
            let bytes = capacity as u64 * DrawUniform::STRIDE;
            if bytes > device.limits().max_buffer_size {
                return Err(DrawError::UniformOverflow {
                    needed,
                    capacity: self.draw_capacity,
                });
            }
            let (buffer, bind_group) =
                create_draw_buffer(device, self.pipelines.draw_bind_group_layout(), capacity);
            self.draw_buffer = buffer;
            self.draw_bind_group = bind_group;
            self.draw_capacity = capacity;
            tracing::debug!("Draw uniform buffer grown to {capacity} slots");
        }

        self.draw_staging.clear();
        self.draw_staging
            .resize(needed * DrawUniform::STRIDE as usize, 0);
        let slots = plan.commands().iter().filter_map(|c| match c.primitive {
            Primitive::Mesh {
                model, material, ..
            } => Some(DrawUniform {
                model: model.to_cols_array_2d(),
                tint: material.tint,
                emission_lit: [
                    material.emission[0],
                    material.emission[1],
                    material.emission[2],
                    if material.lit { 1.0 } else { 0.0 },
                ],
            }),
            Primitive::Stars { .. } => None,
        });
        for (i, uniform) in slots.enumerate() {
            let start = i * DrawUniform::STRIDE as usize;
            self.draw_staging[start..start + DrawUniform::SIZE as usize]
                .copy_from_slice(bytemuck::bytes_of(&uniform));
        }
        if !self.draw_staging.is_empty() {
            queue.write_buffer(&self.draw_buffer, 0, &self.draw_staging);
        }

        starfield.write_instances(star_time, &mut self.star_staging);
        if self.star_staging.len() > self.star_capacity {
            self.star_capacity = self.star_staging.len();
            self.star_buffer = create_star_buffer(device, self.star_capacity);
        }
        if !self.star_staging.is_empty() {
            queue.write_buffer(
                &self.star_buffer,
                0,
                bytemuck::cast_slice(&self.star_staging),
            );
        }
        self.star_count = self.star_staging.len() as u32;
        Ok(())
    }

    /// Replay `plan` into an open render pass. [`SystemRenderer::prepare`]
    /// must have run for the same plan.
    pub fn draw(&self, pass: &mut wgpu::RenderPass<'_>, plan: &FramePlan) -> Result<(), DrawError> {
        let mut target = GpuDrawTarget {
            renderer: self,
            pass,
            current: None,
            slot: 0,
        };
        plan.execute(&mut target)
    }

    /// Acquire the surface, record `plan` in one render pass and present it.
    ///
    /// A timed-out surface acquisition skips the frame.
    #[allow(clippy::too_many_arguments)]
    pub fn render(
        &mut self,
        ctx: &RenderContext,
        depth: &DepthBuffer,
        plan: &FramePlan,
        camera: &Camera,
        light_position: Vec3,
        starfield: &Starfield,
        star_time: f64,
    ) -> Result<(), DrawError> {
        let surface_texture = match ctx.get_current_texture() {
            Ok(texture) => texture,
            Err(SurfaceError::Timeout) => {
                tracing::trace!("Surface acquisition timed out, skipping frame");
                return Ok(());
            }
            Err(e) => return Err(e.into()),
        };

        self.prepare(
            &ctx.device,
            &ctx.queue,
            plan,
            camera,
            light_position,
            ctx.size(),
            starfield,
            star_time,
        )?;

        let mut encoder = FrameEncoder::new(&ctx.device, &ctx.queue, surface_texture);
        let scene_pass = ScenePass::new(depth, self.clear_color);
        {
            let mut pass = encoder
                .begin(&scene_pass)
                .ok_or(DrawError::EncoderFinished)?;
            self.draw(&mut pass, plan)?;
        }
        encoder.submit();
        Ok(())
    }

    fn ensure_drawable(&mut self, device: &wgpu::Device, key: GeometryKey) -> Result<(), DrawError> {
        let Self {
            meshes,
            drawables,
            textures,
            ..
        } = self;
        drawables.get_or_try_build(key, || -> Result<Drawable, DrawError> {
            let mesh_key = key.untextured();
            let mesh = meshes.get_or_build(mesh_key, || {
                let label = format!("{:?}-{}x{}", key.shape, key.resolution.segments, key.resolution.rings);
                tracing::debug!("Building mesh {label}");
                Arc::new(mesh_for(key.shape, key.resolution).upload(&BufferAllocator::new(device), &label))
            });
            let texture = key
                .texture
                .and_then(|handle| textures.by_handle(handle))
                .ok_or_else(|| DrawError::MissingTexture(format!("{:?}", key.texture)))?;
            Ok(Drawable {
                mesh: Arc::clone(mesh),
                texture: Arc::clone(texture),
            })
        })?;
        Ok(())
    }
}

/// Issues draw commands into a wgpu render pass.
pub struct GpuDrawTarget<'r, 'p, 'e> {
    renderer: &'r SystemRenderer,
    pass: &'p mut wgpu::RenderPass<'e>,
    current: Option<PassKind>,
    slot: u32,
}

impl DrawTarget for GpuDrawTarget<'_, '_, '_> {
    fn draw(&mut self, command: &DrawCommand) -> Result<(), DrawError> {
        let renderer = self.renderer;
        if self.current != Some(command.pass) {
            self.pass.set_pipeline(renderer.pipelines.get(command.pass));
            self.pass.set_bind_group(0, &renderer.frame_bind_group, &[]);
            self.current = Some(command.pass);
        }

        match &command.primitive {
            Primitive::Mesh { geometry, .. } => {
                let drawable = renderer
                    .drawables
                    .get(geometry)
                    .ok_or_else(|| DrawError::MissingGeometry(format!("{geometry:?}")))?;
                if self.slot as usize >= renderer.draw_capacity {
                    return Err(DrawError::UniformOverflow {
                        needed: self.slot as usize + 1,
                        capacity: renderer.draw_capacity,
                    });
                }
                let offset = (self.slot as u64 * DrawUniform::STRIDE) as u32;
                self.pass
                    .set_bind_group(1, &renderer.draw_bind_group, &[offset]);
                self.pass
                    .set_bind_group(2, &drawable.texture.bind_group, &[]);
                drawable.mesh.bind(self.pass);
                drawable.mesh.draw(self.pass);
                self.slot += 1;
            }
            Primitive::Stars { count } => {
                let count = (*count).min(renderer.star_count);
                if count > 0 {
                    self.pass
                        .set_vertex_buffer(0, renderer.star_buffer.slice(..));
                    self.pass.draw(0..STAR_QUAD_VERTICES, 0..count);
                }
            }
        }
        Ok(())
    }
}

fn create_draw_buffer(
    device: &wgpu::Device,
    layout: &wgpu::BindGroupLayout,
    capacity: usize,
) -> (wgpu::Buffer, wgpu::BindGroup) {
    let buffer = BufferAllocator::new(device).create_dynamic(
        "draw-uniforms",
        capacity as u64 * DrawUniform::STRIDE,
        wgpu::BufferUsages::UNIFORM,
    );
    let bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
        label: Some("draw-bind-group"),
        layout,
        entries: &[wgpu::BindGroupEntry {
            binding: 0,
            resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                buffer: &buffer,
                offset: 0,
                size: wgpu::BufferSize::new(DrawUniform::SIZE),
            }),
        }],
    });
    (buffer, bind_group)
}

fn create_star_buffer(device: &wgpu::Device, capacity: usize) -> wgpu::Buffer {
    BufferAllocator::new(device).create_dynamic(
        "star-instances",
        (capacity.max(1) * std::mem::size_of::<StarInstance>()) as u64,
        wgpu::BufferUsages::VERTEX,
    )
}

fn clear_color([r, g, b]: [f32; 3]) -> wgpu::Color {
    wgpu::Color {
        r: r as f64,
        g: g as f64,
        b: b as f64,
        a: 1.0,
    }
}
