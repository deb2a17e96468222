use std::path::PathBuf;

/// Configuration errors detected while building the scene. All are fatal.
#[derive(Debug, thiserror::Error)]
pub enum SceneError {
    #[error("body '{body}' has invalid orbital distance {distance}")]
    InvalidDistance { body: String, distance: f32 },

    #[error("body '{body}' has inclination {inclination} outside [0, pi]")]
    InvalidInclination { body: String, inclination: f32 },

    #[error("body '{body}' has non-finite {field} {value}")]
    NonFiniteAngle {
        body: String,
        field: &'static str,
        value: f32,
    },

    #[error("body '{body}' orbits with a period of zero")]
    ZeroPeriod { body: String },

    #[error("body '{body}' orbits with non-finite period {period}")]
    NonFinitePeriod { body: String, period: f32 },

    #[error("body '{body}' has non-positive radius {radius}")]
    InvalidRadius { body: String, radius: f32 },

    #[error("body '{body}' spins with a period of zero")]
    ZeroSpinPeriod { body: String },

    #[error("body '{body}' spins with non-finite period {period}")]
    NonFiniteSpinPeriod { body: String, period: f32 },

    #[error("body '{body}' names unknown parent '{parent}'")]
    UnknownParent { body: String, parent: String },

    #[error("body name '{0}' is used more than once")]
    DuplicateBody(String),

    #[error("parent relation forms a cycle through {0:?}")]
    ParentCycle(Vec<String>),

    #[error("failed to read system file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse system file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: ron::error::SpannedError,
    },
}

/// A draw submission was rejected. Fatal for the running session.
#[derive(Debug, thiserror::Error)]
pub enum DrawError {
    #[error("no cached geometry for {0}")]
    MissingGeometry(String),

    #[error("texture '{0}' is not loaded")]
    MissingTexture(String),

    #[error("frame needs {needed} draws but the uniform buffer holds {capacity}")]
    UniformOverflow { needed: usize, capacity: usize },

    #[error("{0}")]
    Surface(#[from] orrery_render::SurfaceError),

    #[error("frame encoder already submitted")]
    EncoderFinished,
}

/// Renderer construction failed. Fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum RendererError {
    #[error(transparent)]
    Asset(#[from] orrery_render::AssetError),

    #[error(transparent)]
    Texture(#[from] orrery_render::TextureError),

    #[error(transparent)]
    Shader(#[from] orrery_render::ShaderError),
}
