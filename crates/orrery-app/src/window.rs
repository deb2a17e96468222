//! Window creation and event handling via winit.
//!
//! [`OrreryApp`] implements winit's [`ApplicationHandler`]: it creates the
//! window and GPU resources on `resumed`, forwards key events to the
//! [`Session`] and renders one frame per `RedrawRequested`.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use orrery_config::{CliArgs, Config};
use orrery_render::{DepthBuffer, RenderContext, init_render_context_blocking};
use orrery_space::{DrawError, SystemRenderer, light_position};
use tracing::{debug, info, instrument, warn};
use winit::application::ApplicationHandler;
use winit::event::WindowEvent;
use winit::event_loop::{ActiveEventLoop, EventLoop};
use winit::window::{Fullscreen, Window, WindowAttributes, WindowId};

use crate::error::AppError;
use crate::frame_timer::FrameTimer;
use crate::session::Session;

/// How often `config.ron` is checked for edits.
const RELOAD_INTERVAL: Duration = Duration::from_secs(2);

const PAUSED_SUFFIX: &str = " [PAUSED]";

/// Window title for the given pause state.
pub fn window_title(title: &str, paused: bool) -> String {
    if paused {
        format!("{title}{PAUSED_SUFFIX}")
    } else {
        title.to_owned()
    }
}

/// Returns [`WindowAttributes`] based on the given configuration.
pub fn window_attributes_from_config(config: &Config, paused: bool) -> WindowAttributes {
    WindowAttributes::default()
        .with_title(window_title(&config.window.title, paused))
        .with_inner_size(winit::dpi::LogicalSize::new(
            f64::from(config.window.width),
            f64::from(config.window.height),
        ))
        .with_fullscreen(
            config
                .window
                .fullscreen
                .then_some(Fullscreen::Borderless(None)),
        )
}

/// Window plus everything on the GPU side of a frame.
struct Graphics {
    window: Arc<Window>,
    ctx: RenderContext,
    depth: DepthBuffer,
    renderer: SystemRenderer,
}

impl Graphics {
    fn create(event_loop: &ActiveEventLoop, config: &Config, session: &Session) -> Result<Self, AppError> {
        let attrs = window_attributes_from_config(config, session.clock().is_paused());
        let window = Arc::new(event_loop.create_window(attrs)?);
        let ctx = init_render_context_blocking(Arc::clone(&window), config.window.vsync)?;
        let (width, height) = ctx.size();
        let depth = DepthBuffer::new(&ctx.device, width, height);
        let renderer = SystemRenderer::new(
            &ctx.device,
            &ctx.queue,
            ctx.surface_format,
            session.graph().description(),
            &config.assets.texture_dir,
            &config.render,
            &config.lighting,
        )?;
        Ok(Self {
            window,
            ctx,
            depth,
            renderer,
        })
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.ctx.resize(width, height);
        let (width, height) = self.ctx.size();
        self.depth.resize(&self.ctx.device, width, height);
        info!("Window resized to {width}x{height}");
    }

    fn aspect_ratio(&self) -> f32 {
        let (width, height) = self.ctx.size();
        width as f32 / height as f32
    }

    fn render(&mut self, session: &Session) -> Result<(), DrawError> {
        let nodes = session.nodes();
        let graph = session.graph();
        let starfield = session.starfield();
        let clock = session.clock();

        let plan = self
            .renderer
            .plan(graph, &nodes, clock.sim_time(), starfield.len() as u32)?;
        let camera = session.camera().camera(self.aspect_ratio());
        self.renderer.render(
            &self.ctx,
            &self.depth,
            &plan,
            &camera,
            light_position(graph, &nodes),
            starfield,
            clock.real_time(),
        )
    }
}

/// Application state driven by the winit event loop.
pub struct OrreryApp {
    /// Effective configuration: file contents plus CLI overrides.
    config: Config,
    /// Last `config.ron` contents, compared against on reload.
    file_config: Config,
    cli: CliArgs,
    config_dir: PathBuf,
    session: Session,
    timer: FrameTimer,
    graphics: Option<Graphics>,
    last_reload_check: Instant,
    fatal: Option<AppError>,
}

impl OrreryApp {
    pub fn new(
        session: Session,
        config: Config,
        file_config: Config,
        cli: CliArgs,
        config_dir: PathBuf,
    ) -> Self {
        Self {
            config,
            file_config,
            cli,
            config_dir,
            session,
            timer: FrameTimer::new(),
            graphics: None,
            last_reload_check: Instant::now(),
            fatal: None,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Stop the loop; [`run`] hands `err` back to the caller.
    fn fail(&mut self, event_loop: &ActiveEventLoop, err: AppError) {
        self.fatal = Some(err);
        event_loop.exit();
    }

    fn redraw(&mut self, event_loop: &ActiveEventLoop) {
        let real_dt = self.timer.tick();
        let events = self.session.update(real_dt);
        if events.quit {
            event_loop.exit();
            return;
        }

        self.poll_config_reload();

        let Some(graphics) = self.graphics.as_mut() else {
            return;
        };
        if events.pause_toggled {
            graphics.window.set_title(&window_title(
                &self.config.window.title,
                self.session.clock().is_paused(),
            ));
        }

        match graphics.render(&self.session) {
            Ok(()) => graphics.window.request_redraw(),
            Err(e) => self.fail(event_loop, e.into()),
        }
    }

    fn poll_config_reload(&mut self) {
        if self.last_reload_check.elapsed() < RELOAD_INTERVAL {
            return;
        }
        self.last_reload_check = Instant::now();

        let file_config = match self.file_config.reload(&self.config_dir) {
            Ok(Some(config)) => config,
            Ok(None) => return,
            Err(e) => {
                debug!("Config reload skipped: {e}");
                return;
            }
        };
        let mut config = file_config.clone();
        config.apply_cli_overrides(&self.cli);
        self.file_config = file_config;

        if let Err(e) = config.validate() {
            warn!("Ignoring reloaded config: {e}");
            return;
        }
        self.session.apply_config(&self.config, &config);
        if let Some(graphics) = self.graphics.as_mut() {
            graphics.renderer.set_render_config(&config.render);
            graphics.renderer.set_lighting(&config.lighting);
        }
        info!("Applied reloaded configuration");
        self.config = config;
    }
}

impl ApplicationHandler for OrreryApp {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.graphics.is_some() {
            return;
        }
        match Graphics::create(event_loop, &self.config, &self.session) {
            Ok(graphics) => {
                graphics.window.request_redraw();
                self.graphics = Some(graphics);
                self.timer.reset();
            }
            Err(e) => self.fail(event_loop, e),
        }
    }

    fn window_event(&mut self, event_loop: &ActiveEventLoop, _window_id: WindowId, event: WindowEvent) {
        match event {
            WindowEvent::CloseRequested => {
                info!("Close requested, shutting down");
                event_loop.exit();
            }
            WindowEvent::Resized(size) => {
                if let Some(graphics) = self.graphics.as_mut() {
                    graphics.resize(size.width, size.height);
                }
            }
            WindowEvent::Focused(false) => {
                self.session.keyboard_mut().release_all();
            }
            WindowEvent::KeyboardInput { event, .. } => {
                self.session.keyboard_mut().process_event(&event);
            }
            WindowEvent::RedrawRequested => self.redraw(event_loop),
            _ => {}
        }
    }
}

/// Create the event loop and run `app` until the window closes.
///
/// Returns the error that ended the session, if any.
#[instrument(skip_all)]
pub fn run(mut app: OrreryApp) -> Result<(), AppError> {
    let event_loop = EventLoop::new()?;
    event_loop.run_app(&mut app)?;
    match app.fatal.take() {
        Some(err) => Err(err),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_marks_pause() {
        assert_eq!(window_title("Orrery", true), "Orrery [PAUSED]");
        assert_eq!(window_title("Orrery", false), "Orrery");
    }

    #[test]
    fn test_attributes_follow_config() {
        let mut config = Config::default();
        config.window.width = 800;
        config.window.height = 600;
        config.window.title = "Test".into();

        let attrs = window_attributes_from_config(&config, true);
        assert_eq!(attrs.title, "Test [PAUSED]");
        assert!(attrs.fullscreen.is_none());
        assert_eq!(
            attrs.inner_size,
            Some(winit::dpi::Size::Logical(winit::dpi::LogicalSize::new(800.0, 600.0)))
        );
    }

    #[test]
    fn test_fullscreen_is_borderless() {
        let mut config = Config::default();
        config.window.fullscreen = true;
        let attrs = window_attributes_from_config(&config, false);
        assert_eq!(attrs.fullscreen, Some(Fullscreen::Borderless(None)));
    }
}
