//! Pass policies, GPU uniform layouts and the render pipelines of the scene.
//!
//! A frame is recorded as one render pass whose draws are grouped into six
//! [`PassKind`]s. Each kind has a fixed [`PassPolicy`] (blend function,
//! depth test/write, culling and topology) from which its pipeline is built.

use bytemuck::{Pod, Zeroable};
use std::num::NonZeroU64;

use crate::buffer::VertexPositionNormalUv;
use crate::depth::DepthBuffer;
use crate::light::PointLightUniform;
use crate::shader::{ShaderError, ShaderLibrary};

/// The draw passes of a frame, in submission order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PassKind {
    Backdrop,
    Starfield,
    Opaque,
    Additive,
    Translucent,
    Trail,
}

impl PassKind {
    pub const ORDER: [PassKind; 6] = [
        PassKind::Backdrop,
        PassKind::Starfield,
        PassKind::Opaque,
        PassKind::Additive,
        PassKind::Translucent,
        PassKind::Trail,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn label(self) -> &'static str {
        match self {
            PassKind::Backdrop => "backdrop",
            PassKind::Starfield => "starfield",
            PassKind::Opaque => "opaque",
            PassKind::Additive => "additive",
            PassKind::Translucent => "translucent",
            PassKind::Trail => "trail",
        }
    }

    /// Fixed-function state of this pass.
    pub fn policy(self) -> PassPolicy {
        match self {
            PassKind::Backdrop => PassPolicy {
                blend: BlendMode::Replace,
                depth_test: false,
                depth_write: false,
                cull: Some(wgpu::Face::Back),
                topology: wgpu::PrimitiveTopology::TriangleList,
            },
            PassKind::Starfield => PassPolicy {
                blend: BlendMode::Alpha,
                depth_test: false,
                depth_write: false,
                cull: None,
                topology: wgpu::PrimitiveTopology::TriangleList,
            },
            PassKind::Opaque => PassPolicy {
                blend: BlendMode::Replace,
                depth_test: true,
                depth_write: true,
                cull: Some(wgpu::Face::Back),
                topology: wgpu::PrimitiveTopology::TriangleList,
            },
            PassKind::Additive => PassPolicy {
                blend: BlendMode::Additive,
                depth_test: true,
                depth_write: false,
                cull: Some(wgpu::Face::Back),
                topology: wgpu::PrimitiveTopology::TriangleList,
            },
            PassKind::Translucent => PassPolicy {
                blend: BlendMode::Alpha,
                depth_test: true,
                depth_write: false,
                cull: None,
                topology: wgpu::PrimitiveTopology::TriangleList,
            },
            PassKind::Trail => PassPolicy {
                blend: BlendMode::Alpha,
                depth_test: true,
                depth_write: false,
                cull: None,
                topology: wgpu::PrimitiveTopology::LineList,
            },
        }
    }

    /// Vertex and fragment entry points used by this pass.
    pub fn entry_points(self) -> (&'static str, &'static str) {
        match self {
            PassKind::Backdrop => ("vs_sky", "fs_surface"),
            PassKind::Starfield => ("vs_star", "fs_star"),
            PassKind::Opaque | PassKind::Translucent => ("vs_main", "fs_surface"),
            PassKind::Additive => ("vs_main", "fs_additive"),
            PassKind::Trail => ("vs_main", "fs_flat"),
        }
    }
}

/// Color blend function of a pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BlendMode {
    /// Source replaces destination.
    Replace,
    /// Source-over: `src·a + dst·(1−a)`.
    Alpha,
    /// `src + dst`.
    Additive,
}

impl BlendMode {
    pub fn state(self) -> Option<wgpu::BlendState> {
        match self {
            BlendMode::Replace => None,
            BlendMode::Alpha => Some(wgpu::BlendState::ALPHA_BLENDING),
            BlendMode::Additive => {
                let add = wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::One,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                };
                Some(wgpu::BlendState {
                    color: add,
                    alpha: add,
                })
            }
        }
    }
}

/// Blend, depth and rasterizer state of one pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PassPolicy {
    pub blend: BlendMode,
    pub depth_test: bool,
    pub depth_write: bool,
    pub cull: Option<wgpu::Face>,
    pub topology: wgpu::PrimitiveTopology,
}

impl PassPolicy {
    /// Depth state against the frame's reverse-Z depth attachment. Passes
    /// without depth testing still declare the attachment format and use `Always`.
    pub fn depth_stencil(&self) -> wgpu::DepthStencilState {
        wgpu::DepthStencilState {
            format: DepthBuffer::FORMAT,
            depth_write_enabled: self.depth_write,
            depth_compare: if self.depth_test {
                DepthBuffer::COMPARE_FUNCTION
            } else {
                wgpu::CompareFunction::Always
            },
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        }
    }
}

/// Per-frame uniform shared by every draw, 224 bytes.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct FrameUniform {
    pub view_proj: [[f32; 4]; 4],
    /// View-projection without camera translation.
    pub sky_view_proj: [[f32; 4]; 4],
    pub camera_pos: [f32; 4],
    pub light: PointLightUniform,
    /// Surface width and height in pixels.
    pub viewport: [f32; 4],
}

/// Per-draw uniform, 96 bytes, stored at [`DrawUniform::STRIDE`] offsets.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct DrawUniform {
    pub model: [[f32; 4]; 4],
    pub tint: [f32; 4],
    /// rgb = emission, w = 1 when lit by the point light.
    pub emission_lit: [f32; 4],
}

impl DrawUniform {
    /// Dynamic-offset stride; the default `min_uniform_buffer_offset_alignment`.
    pub const STRIDE: u64 = 256;
    pub const SIZE: u64 = std::mem::size_of::<DrawUniform>() as u64;
}

/// One star sprite, consumed per instance.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct StarInstance {
    pub position: [f32; 3],
    pub size_px: f32,
    pub color: [f32; 4],
}

impl StarInstance {
    const ATTRIBUTES: [wgpu::VertexAttribute; 3] =
        wgpu::vertex_attr_array![0 => Float32x3, 1 => Float32, 2 => Float32x4];

    pub fn layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<StarInstance>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBUTES,
        }
    }
}

/// Render pipelines for every [`PassKind`] plus the bind group layouts they share.
///
/// Group 0 holds the [`FrameUniform`], group 1 the dynamically offset
/// [`DrawUniform`], group 2 the texture and sampler.
pub struct ScenePipelines {
    pipelines: [wgpu::RenderPipeline; 6],
    frame_layout: wgpu::BindGroupLayout,
    draw_layout: wgpu::BindGroupLayout,
}

impl ScenePipelines {
    pub fn new(
        device: &wgpu::Device,
        shaders: &ShaderLibrary,
        texture_layout: &wgpu::BindGroupLayout,
        surface_format: wgpu::TextureFormat,
    ) -> Result<Self, ShaderError> {
        let scene_shader = shaders.get("scene")?;
        let stars_shader = shaders.get("stars")?;

        let frame_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("frame-bind-group-layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: NonZeroU64::new(std::mem::size_of::<FrameUniform>() as u64),
                },
                count: None,
            }],
        });

        let draw_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("draw-bind-group-layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(DrawUniform::SIZE),
                },
                count: None,
            }],
        });

        let mesh_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("mesh-pipeline-layout"),
            bind_group_layouts: &[&frame_layout, &draw_layout, texture_layout],
            immediate_size: 0,
        });
        let star_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("star-pipeline-layout"),
            bind_group_layouts: &[&frame_layout],
            immediate_size: 0,
        });

        let pipelines = PassKind::ORDER.map(|pass| {
            let (module, layout, buffers) = if pass == PassKind::Starfield {
                (&*stars_shader, &star_layout, [StarInstance::layout()])
            } else {
                (&*scene_shader, &mesh_layout, [VertexPositionNormalUv::layout()])
            };
            build_pipeline(device, pass, module, layout, &buffers, surface_format)
        });
        log::info!("Created {} scene pipelines", pipelines.len());

        Ok(Self {
            pipelines,
            frame_layout,
            draw_layout,
        })
    }

    pub fn get(&self, pass: PassKind) -> &wgpu::RenderPipeline {
        &self.pipelines[pass.index()]
    }

    pub fn frame_bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.frame_layout
    }

    pub fn draw_bind_group_layout(&self) -> &wgpu::BindGroupLayout {
        &self.draw_layout
    }
}

fn build_pipeline(
    device: &wgpu::Device,
    pass: PassKind,
    module: &wgpu::ShaderModule,
    layout: &wgpu::PipelineLayout,
    buffers: &[wgpu::VertexBufferLayout<'_>],
    surface_format: wgpu::TextureFormat,
) -> wgpu::RenderPipeline {
    let policy = pass.policy();
    let (vs, fs) = pass.entry_points();
    let label = format!("{}-pipeline", pass.label());

    device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
        label: Some(&label),
        layout: Some(layout),
        vertex: wgpu::VertexState {
            module,
            entry_point: Some(vs),
            buffers,
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        },
        primitive: wgpu::PrimitiveState {
            topology: policy.topology,
            strip_index_format: None,
            front_face: wgpu::FrontFace::Ccw,
            cull_mode: policy.cull,
            unclipped_depth: false,
            polygon_mode: wgpu::PolygonMode::Fill,
            conservative: false,
        },
        depth_stencil: Some(policy.depth_stencil()),
        multisample: wgpu::MultisampleState {
            count: 1,
            mask: !0,
            alpha_to_coverage_enabled: false,
        },
        fragment: Some(wgpu::FragmentState {
            module,
            entry_point: Some(fs),
            targets: &[Some(wgpu::ColorTargetState {
                format: surface_format,
                blend: policy.blend.state(),
                write_mask: wgpu::ColorWrites::ALL,
            })],
            compilation_options: wgpu::PipelineCompilationOptions::default(),
        }),
        multiview_mask: None,
        cache: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::texture::{TextureManager, create_test_device_queue};

    #[test]
    fn test_pass_order() {
        assert_eq!(
            PassKind::ORDER.map(PassKind::label),
            ["backdrop", "starfield", "opaque", "additive", "translucent", "trail"]
        );
        for (i, pass) in PassKind::ORDER.iter().enumerate() {
            assert_eq!(pass.index(), i);
        }
    }

    #[test]
    fn test_backdrop_and_stars_ignore_depth() {
        for pass in [PassKind::Backdrop, PassKind::Starfield] {
            let policy = pass.policy();
            assert!(!policy.depth_test && !policy.depth_write);
            assert_eq!(
                policy.depth_stencil().depth_compare,
                wgpu::CompareFunction::Always
            );
        }
    }

    #[test]
    fn test_only_opaque_writes_depth() {
        for pass in PassKind::ORDER {
            assert_eq!(pass.policy().depth_write, pass == PassKind::Opaque, "{pass:?}");
        }
    }

    #[test]
    fn test_overlays_test_depth_reverse_z() {
        for pass in [
            PassKind::Opaque,
            PassKind::Additive,
            PassKind::Translucent,
            PassKind::Trail,
        ] {
            assert_eq!(
                pass.policy().depth_stencil().depth_compare,
                wgpu::CompareFunction::GreaterEqual
            );
        }
    }

    #[test]
    fn test_blend_functions() {
        assert_eq!(PassKind::Opaque.policy().blend.state(), None);
        let additive = PassKind::Additive.policy().blend.state().unwrap();
        assert_eq!(additive.color.src_factor, wgpu::BlendFactor::One);
        assert_eq!(additive.color.dst_factor, wgpu::BlendFactor::One);
        assert_eq!(
            PassKind::Translucent.policy().blend.state(),
            Some(wgpu::BlendState::ALPHA_BLENDING)
        );
        assert_eq!(
            PassKind::Trail.policy().topology,
            wgpu::PrimitiveTopology::LineList
        );
    }

    #[test]
    fn test_uniform_sizes() {
        assert_eq!(std::mem::size_of::<FrameUniform>(), 224);
        assert_eq!(DrawUniform::SIZE, 96);
        assert!(DrawUniform::SIZE <= DrawUniform::STRIDE);
        assert_eq!(std::mem::size_of::<StarInstance>(), 32);
        assert_eq!(StarInstance::layout().step_mode, wgpu::VertexStepMode::Instance);
    }

    #[test]
    fn test_scene_pipelines_build() {
        let Some((device, _queue)) = create_test_device_queue() else {
            return;
        };
        let shaders = ShaderLibrary::with_builtin(&device);
        let textures = TextureManager::new(&device);
        let pipelines = ScenePipelines::new(
            &device,
            &shaders,
            textures.bind_group_layout(),
            wgpu::TextureFormat::Bgra8UnormSrgb,
        );
        assert!(pipelines.is_ok());
    }

    #[test]
    fn test_missing_shader_is_reported() {
        let Some((device, _queue)) = create_test_device_queue() else {
            return;
        };
        let textures = TextureManager::new(&device);
        let result = ScenePipelines::new(
            &device,
            &ShaderLibrary::new(),
            textures.bind_group_layout(),
            wgpu::TextureFormat::Bgra8UnormSrgb,
        );
        assert!(matches!(result, Err(ShaderError::NotLoaded { .. })));
    }
}
