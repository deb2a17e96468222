//! Per-frame simulation state that does not touch the GPU.
//!
//! A [`Session`] owns the scene graph, the starfield, keyboard and action
//! state, the [`AnimationClock`] and the [`CameraController`]. The window layer
//! forwards key events into it and calls [`Session::update`] once per frame
//! before rendering.

use std::path::Path;

use orrery_camera::CameraController;
use orrery_config::Config;
use orrery_input::{Action, ActionResolver, ActionState, InputMap, KeyboardState};
use orrery_space::{SceneGraph, SceneNode, Starfield};
use tracing::{debug, info, warn};

use crate::clock::AnimationClock;

/// Bindings file looked up next to `config.ron`.
pub const BINDINGS_FILE: &str = "bindings.ron";

/// Discrete actions that fired during one [`Session::update`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameEvents {
    pub quit: bool,
    pub pause_toggled: bool,
    pub camera_reset: bool,
}

pub struct Session {
    graph: SceneGraph,
    starfield: Starfield,
    input_map: InputMap,
    keyboard: KeyboardState,
    actions: ActionState,
    clock: AnimationClock,
    camera: CameraController,
}

impl Session {
    pub fn new(graph: SceneGraph, starfield: Starfield, input_map: InputMap, config: &Config) -> Self {
        Self {
            graph,
            starfield,
            input_map,
            keyboard: KeyboardState::new(),
            actions: ActionState::new(),
            clock: AnimationClock::new(
                config.simulation.start_paused,
                f64::from(config.simulation.time_scale),
            ),
            camera: CameraController::new(&config.camera),
        }
    }

    /// Run the input → clock → camera step of a frame.
    ///
    /// Quit short-circuits: nothing else advances on the frame it fires.
    pub fn update(&mut self, real_dt: f64) -> FrameEvents {
        ActionResolver::resolve(&self.input_map, &self.keyboard, &mut self.actions);
        self.keyboard.clear_transients();

        let mut events = FrameEvents::default();
        if self.actions.action_just_activated(Action::Quit) {
            info!("Quit requested");
            events.quit = true;
            return events;
        }
        if self.actions.action_just_activated(Action::TogglePause) {
            self.clock.toggle_pause();
            events.pause_toggled = true;
        }
        if self.actions.action_just_activated(Action::ResetCamera) {
            self.camera.reset();
            events.camera_reset = true;
        }

        let (_sim_dt, cam_dt) = self.clock.tick(real_dt);
        self.camera.update(cam_dt as f32, &self.actions);
        events
    }

    /// World transforms of every body at the current simulation time.
    pub fn nodes(&self) -> Vec<SceneNode> {
        self.graph.compose(self.clock.sim_time())
    }

    /// Apply the runtime-adjustable parts of a reloaded config.
    pub fn apply_config(&mut self, previous: &Config, config: &Config) {
        self.camera.set_settings(&config.camera);
        self.clock
            .set_time_scale(f64::from(config.simulation.time_scale));
        if previous.starfield != config.starfield {
            self.starfield = Starfield::generate(&config.starfield);
            info!("Regenerated starfield with {} stars", self.starfield.len());
        }
    }

    pub fn keyboard_mut(&mut self) -> &mut KeyboardState {
        &mut self.keyboard
    }

    pub fn graph(&self) -> &SceneGraph {
        &self.graph
    }

    pub fn starfield(&self) -> &Starfield {
        &self.starfield
    }

    pub fn clock(&self) -> &AnimationClock {
        &self.clock
    }

    pub fn camera(&self) -> &CameraController {
        &self.camera
    }
}

/// Load `bindings.ron` from `config_dir`, falling back to the default arrow-key map.
///
/// A missing file is created with the defaults. A malformed file is reported
/// and ignored; key bindings are never fatal.
pub fn load_bindings(config_dir: &Path) -> InputMap {
    let path = config_dir.join(BINDINGS_FILE);
    let source = match std::fs::read_to_string(&path) {
        Ok(source) => source,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!("No {} found, writing default bindings", path.display());
            let map = InputMap::default_orbit();
            if let Err(e) = write_bindings(&path, &map) {
                warn!("Failed to write {}: {e}", path.display());
            }
            return map;
        }
        Err(e) => {
            warn!("Failed to read {}: {e}; using default bindings", path.display());
            return InputMap::default_orbit();
        }
    };
    match InputMap::from_ron(&source) {
        Ok(map) => {
            info!("Loaded key bindings from {}", path.display());
            for action in Action::ALL {
                if map.get_bindings(&action).is_empty() {
                    warn!("{action:?} has no key binding in {}", path.display());
                }
            }
            map
        }
        Err(e) => {
            warn!("Failed to parse {}: {e}; using default bindings", path.display());
            InputMap::default_orbit()
        }
    }
}

fn write_bindings(path: &Path, map: &InputMap) -> std::io::Result<()> {
    let text = map.to_ron().map_err(std::io::Error::other)?;
    std::fs::write(path, text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use orrery_config::StarfieldConfig;
    use orrery_input::{InputBinding, RawKeyEvent};
    use orrery_space::SystemDescription;
    use winit::event::ElementState;
    use winit::keyboard::{KeyCode, PhysicalKey};

    fn session(config: &Config) -> Session {
        let graph = SceneGraph::build(SystemDescription::solar()).unwrap();
        let starfield = Starfield::generate(&StarfieldConfig {
            count: 16,
            ..StarfieldConfig::default()
        });
        Session::new(graph, starfield, InputMap::default_orbit(), config)
    }

    fn key(session: &mut Session, code: KeyCode, state: ElementState) {
        session.keyboard_mut().process_raw(RawKeyEvent {
            key: PhysicalKey::Code(code),
            state,
            repeat: false,
        });
    }

    fn tap(session: &mut Session, code: KeyCode) {
        key(session, code, ElementState::Pressed);
        key(session, code, ElementState::Released);
    }

    #[test]
    fn test_update_advances_sim_time() {
        let mut s = session(&Config::default());
        s.update(0.5);
        s.update(0.25);
        assert_eq!(s.clock().sim_time(), 0.75);
    }

    #[test]
    fn test_space_toggles_pause_once() {
        let mut s = session(&Config::default());
        tap(&mut s, KeyCode::Space);
        let events = s.update(0.1);
        assert!(events.pause_toggled);
        assert!(s.clock().is_paused());

        let events = s.update(0.1);
        assert!(!events.pause_toggled);
        assert!(s.clock().is_paused());
        assert_eq!(s.clock().sim_time(), 0.0);
    }

    #[test]
    fn test_camera_moves_while_paused() {
        let mut config = Config::default();
        config.simulation.start_paused = true;
        let mut s = session(&config);
        let yaw0 = s.camera().yaw();

        key(&mut s, KeyCode::ArrowRight, ElementState::Pressed);
        s.update(0.1);
        assert_eq!(s.clock().sim_time(), 0.0);
        assert!(s.camera().yaw() > yaw0);
    }

    #[test]
    fn test_reset_restores_default_camera_while_paused() {
        let mut config = Config::default();
        config.simulation.start_paused = true;
        let mut s = session(&config);
        let initial = s.camera().clone();

        key(&mut s, KeyCode::ArrowUp, ElementState::Pressed);
        key(&mut s, KeyCode::Minus, ElementState::Pressed);
        s.update(0.2);
        assert_ne!(s.camera(), &initial);

        key(&mut s, KeyCode::ArrowUp, ElementState::Released);
        key(&mut s, KeyCode::Minus, ElementState::Released);
        tap(&mut s, KeyCode::KeyH);
        let events = s.update(0.0);
        assert!(events.camera_reset);
        assert_eq!(s.camera(), &initial);
    }

    #[test]
    fn test_escape_quits_without_advancing() {
        let mut s = session(&Config::default());
        tap(&mut s, KeyCode::Escape);
        let events = s.update(0.2);
        assert!(events.quit);
        assert_eq!(s.clock().sim_time(), 0.0);
    }

    #[test]
    fn test_unmapped_key_changes_nothing() {
        let mut s = session(&Config::default());
        let camera = s.camera().clone();
        tap(&mut s, KeyCode::KeyQ);
        let events = s.update(0.0);
        assert_eq!(events, FrameEvents::default());
        assert_eq!(s.camera(), &camera);
    }

    #[test]
    fn test_nodes_follow_sim_time() {
        let mut s = session(&Config::default());
        let before = s.nodes();
        s.update(0.25);
        let after = s.nodes();
        assert_eq!(before.len(), s.graph().len());
        assert!(
            before
                .iter()
                .zip(&after)
                .any(|(a, b)| a.world_position != b.world_position)
        );
    }

    #[test]
    fn test_apply_config_regenerates_starfield_only_on_change() {
        let config = Config::default();
        let mut s = session(&config);
        assert_eq!(s.starfield().len(), 16);

        let mut changed = config.clone();
        changed.simulation.time_scale = 3.0;
        s.apply_config(&config, &changed);
        assert_eq!(s.clock().time_scale(), 3.0);
        assert_eq!(s.starfield().len(), 16);

        let mut more_stars = changed.clone();
        more_stars.starfield.count = 40;
        s.apply_config(&changed, &more_stars);
        assert_eq!(s.starfield().len(), 40);
    }

    #[test]
    fn test_missing_bindings_file_uses_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let map = load_bindings(tmp.path());
        assert_eq!(map, InputMap::default_orbit());
    }

    #[test]
    fn test_missing_bindings_file_is_written_with_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        load_bindings(tmp.path());
        let written = std::fs::read_to_string(tmp.path().join(BINDINGS_FILE)).unwrap();
        assert_eq!(
            InputMap::from_ron(&written).unwrap(),
            InputMap::default_orbit()
        );
        assert_eq!(load_bindings(tmp.path()), InputMap::default_orbit());
    }

    #[test]
    fn test_partial_bindings_file_keeps_unbound_actions_inert() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(
            tmp.path().join(BINDINGS_FILE),
            r#"(bindings: {Quit: [Key("KeyQ")]})"#,
        )
        .unwrap();
        let map = load_bindings(tmp.path());
        assert!(map.get_bindings(&Action::TogglePause).is_empty());
        assert_eq!(
            map.get_bindings(&Action::Quit),
            &[InputBinding::Key(KeyCode::KeyQ)]
        );
    }

    #[test]
    fn test_bindings_file_is_loaded() {
        let tmp = tempfile::tempdir().unwrap();
        let mut map = InputMap::default_orbit();
        map.set_bindings(Action::TogglePause, vec![InputBinding::Key(KeyCode::KeyP)]);
        std::fs::write(tmp.path().join(BINDINGS_FILE), map.to_ron().unwrap()).unwrap();

        let loaded = load_bindings(tmp.path());
        assert_eq!(
            loaded.get_bindings(&Action::TogglePause),
            &[InputBinding::Key(KeyCode::KeyP)]
        );
    }

    #[test]
    fn test_malformed_bindings_fall_back() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::write(tmp.path().join(BINDINGS_FILE), "not ron at all (").unwrap();
        assert_eq!(load_bindings(tmp.path()), InputMap::default_orbit());
    }
}
