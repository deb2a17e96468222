//! wgpu rendering layer for the orrery: surface management, the frame encoder,
//! textures and image assets, procedural meshes, the geometry cache and the
//! per-pass blend/depth policy table.

pub mod asset;
pub mod buffer;
pub mod camera;
pub mod depth;
pub mod geometry;
pub mod geometry_cache;
pub mod gpu;
pub mod light;
pub mod pass;
pub mod pipeline;
pub mod shader;
pub mod texture;

pub use asset::{AssetError, PixelBuffer, load_image, luminance_to_alpha};
pub use buffer::{BufferAllocator, IndexData, MeshBuffer, VertexPositionNormalUv};
pub use camera::{Camera, Projection};
pub use depth::DepthBuffer;
pub use geometry::{MeshData, annulus, orbit_loop, uv_sphere};
pub use geometry_cache::{GeometryCache, GeometryKey, Resolution, ShapeKind};
pub use gpu::{RenderContext, RenderContextError, SurfaceError, init_render_context_blocking};
pub use light::{PointLight, PointLightUniform};
pub use pass::{FrameEncoder, ScenePass};
pub use pipeline::{
    BlendMode, DrawUniform, FrameUniform, PassKind, PassPolicy, ScenePipelines, StarInstance,
};
pub use shader::{ShaderError, ShaderLibrary};
pub use texture::{ManagedTexture, TextureError, TextureHandle, TextureManager, TextureTable};
