use orrery_config::ConfigError;
use orrery_render::RenderContextError;
use orrery_space::{DrawError, RendererError, SceneError};

use crate::platform::PlatformError;

/// Anything that ends the session. Startup errors abort before the first frame.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("invalid scene: {0}")]
    Scene(#[from] SceneError),

    #[error("event loop failed: {0}")]
    EventLoop(#[from] winit::error::EventLoopError),

    #[error("failed to create window: {0}")]
    Window(#[from] winit::error::OsError),

    #[error("GPU initialization failed: {0}")]
    RenderContext(#[from] RenderContextError),

    #[error("renderer setup failed: {0}")]
    Renderer(#[from] RendererError),

    #[error("frame submission failed: {0}")]
    Draw(#[from] DrawError),
}
