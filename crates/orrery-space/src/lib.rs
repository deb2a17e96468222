//! The orbital scene: body table, closed-form kinematics, the scene graph,
//! the procedural starfield and the ordered multi-pass renderer.

pub mod body;
pub mod error;
pub mod frame;
pub mod kinematics;
pub mod renderer;
pub mod scene_graph;
pub mod starfield;

pub use body::{
    CelestialBody, CoronaShell, OrbitalElements, SpinElements, SurfaceLayer, SystemDescription,
};
pub use error::{DrawError, RendererError, SceneError};
pub use frame::{
    DrawCommand, DrawLayer, DrawTarget, FrameComposer, FramePlan, FrameSettings, Material,
    Primitive,
};
pub use kinematics::{LocalPose, evaluate};
pub use renderer::{GpuDrawTarget, SystemRenderer, light_position};
pub use scene_graph::{BodyId, SceneGraph, SceneNode};
pub use starfield::{SizeBucket, Star, Starfield, StarfieldGenerator};
