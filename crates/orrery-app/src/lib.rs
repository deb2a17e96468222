//! Orrery application: animation clock, per-frame session state and the
//! winit event loop that drives the renderer.

pub mod clock;
pub mod error;
pub mod frame_timer;
pub mod platform;
pub mod session;
pub mod window;

pub use clock::AnimationClock;
pub use error::AppError;
pub use frame_timer::{FrameTimer, MAX_FRAME_TIME};
pub use platform::{PlatformDirs, PlatformError};
pub use session::{FrameEvents, Session, load_bindings};
pub use window::{OrreryApp, run, window_attributes_from_config, window_title};
