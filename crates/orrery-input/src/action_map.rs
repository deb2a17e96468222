//! Action mapping: abstract orrery controls bound to physical keys.
//!
//! [`InputMap`] says which keys trigger which [`Action`]s. [`ActionResolver`]
//! rebuilds the [`ActionState`] snapshot once per frame from the keyboard state.
//! Keys with no binding never reach the snapshot.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use winit::keyboard::{KeyCode, PhysicalKey};

use crate::keyboard::KeyboardState;

/// Serde helper for [`KeyCode`], which has no serde support of its own.
mod keycode_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use winit::keyboard::KeyCode;

    /// Serialize a [`KeyCode`] as its debug name (e.g. `"ArrowLeft"`).
    pub fn serialize<S: Serializer>(code: &KeyCode, s: S) -> Result<S::Ok, S::Error> {
        format!("{code:?}").serialize(s)
    }

    /// Deserialize a [`KeyCode`] from its debug name.
    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<KeyCode, D::Error> {
        let name = String::deserialize(d)?;
        string_to_keycode(&name)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown key: {name}")))
    }

    pub(super) fn string_to_keycode(s: &str) -> Option<KeyCode> {
        if let Some(letter) = s.strip_prefix("Key")
            && letter.len() == 1
        {
            return letter_key(letter.as_bytes()[0]);
        }
        Some(match s {
            "Space" => KeyCode::Space,
            "Enter" => KeyCode::Enter,
            "Escape" => KeyCode::Escape,
            "Tab" => KeyCode::Tab,
            "Backspace" => KeyCode::Backspace,
            "ArrowUp" => KeyCode::ArrowUp,
            "ArrowDown" => KeyCode::ArrowDown,
            "ArrowLeft" => KeyCode::ArrowLeft,
            "ArrowRight" => KeyCode::ArrowRight,
            "Equal" => KeyCode::Equal,
            "Minus" => KeyCode::Minus,
            "NumpadAdd" => KeyCode::NumpadAdd,
            "NumpadSubtract" => KeyCode::NumpadSubtract,
            "PageUp" => KeyCode::PageUp,
            "PageDown" => KeyCode::PageDown,
            "Home" => KeyCode::Home,
            "End" => KeyCode::End,
            "ShiftLeft" => KeyCode::ShiftLeft,
            "ShiftRight" => KeyCode::ShiftRight,
            _ => return None,
        })
    }

    fn letter_key(b: u8) -> Option<KeyCode> {
        const LETTERS: [KeyCode; 26] = [
            KeyCode::KeyA,
            KeyCode::KeyB,
            KeyCode::KeyC,
            KeyCode::KeyD,
            KeyCode::KeyE,
            KeyCode::KeyF,
            KeyCode::KeyG,
            KeyCode::KeyH,
            KeyCode::KeyI,
            KeyCode::KeyJ,
            KeyCode::KeyK,
            KeyCode::KeyL,
            KeyCode::KeyM,
            KeyCode::KeyN,
            KeyCode::KeyO,
            KeyCode::KeyP,
            KeyCode::KeyQ,
            KeyCode::KeyR,
            KeyCode::KeyS,
            KeyCode::KeyT,
            KeyCode::KeyU,
            KeyCode::KeyV,
            KeyCode::KeyW,
            KeyCode::KeyX,
            KeyCode::KeyY,
            KeyCode::KeyZ,
        ];
        b.is_ascii_uppercase().then(|| LETTERS[usize::from(b - b'A')])
    }
}

/// Controls of the orrery.
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum Action {
    /// Decrease camera yaw.
    OrbitLeft,
    /// Increase camera yaw.
    OrbitRight,
    /// Increase camera pitch.
    OrbitUp,
    /// Decrease camera pitch.
    OrbitDown,
    /// Move the camera towards the centre.
    ZoomIn,
    /// Move the camera away from the centre.
    ZoomOut,
    /// Restore the default camera.
    ResetCamera,
    /// Freeze or resume simulation time.
    TogglePause,
    /// Close the window.
    Quit,
}

impl Action {
    /// Held actions that move the camera continuously.
    pub const CAMERA: [Action; 6] = [
        Action::OrbitLeft,
        Action::OrbitRight,
        Action::OrbitUp,
        Action::OrbitDown,
        Action::ZoomIn,
        Action::ZoomOut,
    ];

    pub const ALL: [Action; 9] = [
        Action::OrbitLeft,
        Action::OrbitRight,
        Action::OrbitUp,
        Action::OrbitDown,
        Action::ZoomIn,
        Action::ZoomOut,
        Action::ResetCamera,
        Action::TogglePause,
        Action::Quit,
    ];
}

/// A physical input source that can be bound to an action.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum InputBinding {
    /// A keyboard key (physical scan code).
    Key(#[serde(with = "keycode_serde")] KeyCode),
}

/// Maps [`Action`]s to lists of [`InputBinding`]s (OR semantics).
///
/// Serializable to RON so bindings can live next to `config.ron`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputMap {
    /// The binding table.
    pub bindings: HashMap<Action, Vec<InputBinding>>,
}

impl Default for InputMap {
    fn default() -> Self {
        Self::default_orbit()
    }
}

impl InputMap {
    /// Create an empty input map with no bindings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }

    /// Arrow keys orbit, `=`/`-` zoom, `H` resets, `Space` pauses, `Escape` quits.
    #[must_use]
    pub fn default_orbit() -> Self {
        let key = InputBinding::Key;
        let mut map = Self::new();
        map.set_bindings(Action::OrbitLeft, vec![key(KeyCode::ArrowLeft)]);
        map.set_bindings(Action::OrbitRight, vec![key(KeyCode::ArrowRight)]);
        map.set_bindings(Action::OrbitUp, vec![key(KeyCode::ArrowUp)]);
        map.set_bindings(Action::OrbitDown, vec![key(KeyCode::ArrowDown)]);
        map.set_bindings(
            Action::ZoomIn,
            vec![key(KeyCode::Equal), key(KeyCode::NumpadAdd)],
        );
        map.set_bindings(
            Action::ZoomOut,
            vec![key(KeyCode::Minus), key(KeyCode::NumpadSubtract)],
        );
        map.set_bindings(Action::ResetCamera, vec![key(KeyCode::KeyH)]);
        map.set_bindings(Action::TogglePause, vec![key(KeyCode::Space)]);
        map.set_bindings(Action::Quit, vec![key(KeyCode::Escape)]);
        map
    }

    /// Set the bindings for an action, replacing any existing ones.
    pub fn set_bindings(&mut self, action: Action, bindings: Vec<InputBinding>) {
        self.bindings.insert(action, bindings);
    }

    /// Get the bindings for an action.
    #[must_use]
    pub fn get_bindings(&self, action: &Action) -> &[InputBinding] {
        self.bindings.get(action).map_or(&[], |v| v.as_slice())
    }

    /// Serialize to RON string.
    ///
    /// # Errors
    /// Returns an error if serialization fails.
    pub fn to_ron(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }

    /// Deserialize from RON string.
    ///
    /// # Errors
    /// Returns an error if the RON string is malformed or names an unknown key.
    pub fn from_ron(s: &str) -> Result<Self, ron::error::SpannedError> {
        let map: Self = ron::from_str(s)?;
        tracing::debug!(actions = map.bindings.len(), "Loaded input bindings");
        Ok(map)
    }
}

/// Threshold below which an action is considered inactive.
const ACTIVATION_THRESHOLD: f32 = 0.001;

/// Per-frame action snapshot computed by [`ActionResolver`].
#[derive(Debug, Clone, Default)]
pub struct ActionState {
    values: HashMap<Action, f32>,
    prev_values: HashMap<Action, f32>,
}

impl ActionState {
    /// Create a new empty action state.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an action is currently held.
    #[must_use]
    pub fn is_action_active(&self, action: Action) -> bool {
        self.action_value(action).abs() > ACTIVATION_THRESHOLD
    }

    /// The value of an action in `[0.0, 1.0]`.
    #[must_use]
    pub fn action_value(&self, action: Action) -> f32 {
        self.values.get(&action).copied().unwrap_or(0.0)
    }

    /// True only on the frame the action transitioned from inactive to active.
    #[must_use]
    pub fn action_just_activated(&self, action: Action) -> bool {
        let prev =
            self.prev_values.get(&action).copied().unwrap_or(0.0).abs() > ACTIVATION_THRESHOLD;
        self.is_action_active(action) && !prev
    }

    /// Set an action value directly, for scripted or test-driven input.
    pub fn set_value(&mut self, action: Action, value: f32) {
        self.values.insert(action, value.clamp(0.0, 1.0));
    }
}

/// Populates [`ActionState`] from the keyboard each frame.
pub struct ActionResolver;

impl ActionResolver {
    /// Resolve all bound actions from the current keyboard state.
    ///
    /// Call once per frame after key events have been processed.
    pub fn resolve(input_map: &InputMap, keyboard: &KeyboardState, state: &mut ActionState) {
        state.prev_values.clone_from(&state.values);
        state.values.clear();

        for (action, bindings) in &input_map.bindings {
            let value: f32 = bindings
                .iter()
                .map(|binding| Self::read_binding(binding, keyboard))
                .sum();
            state.set_value(*action, value);
        }
    }

    fn read_binding(binding: &InputBinding, keyboard: &KeyboardState) -> f32 {
        match binding {
            InputBinding::Key(code) => {
                let key = PhysicalKey::Code(*code);
                // A tap that starts and ends between two frames still counts once.
                if keyboard.is_pressed(key) || keyboard.just_pressed(key) {
                    1.0
                } else {
                    0.0
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use winit::event::ElementState;

    fn press_key(kb: &mut KeyboardState, code: KeyCode) {
        kb.process_raw(crate::keyboard::RawKeyEvent {
            key: PhysicalKey::Code(code),
            state: ElementState::Pressed,
            repeat: false,
        });
    }

    fn release_key(kb: &mut KeyboardState, code: KeyCode) {
        kb.process_raw(crate::keyboard::RawKeyEvent {
            key: PhysicalKey::Code(code),
            state: ElementState::Released,
            repeat: false,
        });
    }

    #[test]
    fn test_default_map_binds_every_action() {
        let map = InputMap::default();
        for action in Action::ALL {
            assert!(!map.get_bindings(&action).is_empty(), "{action:?} unbound");
        }
    }

    #[test]
    fn test_arrow_key_activates_orbit() {
        let map = InputMap::default();
        let mut kb = KeyboardState::new();
        press_key(&mut kb, KeyCode::ArrowLeft);

        let mut state = ActionState::new();
        ActionResolver::resolve(&map, &kb, &mut state);

        assert!(state.is_action_active(Action::OrbitLeft));
        assert!(!state.is_action_active(Action::OrbitRight));
        assert!((state.action_value(Action::OrbitLeft) - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_either_zoom_key_activates_zoom() {
        let map = InputMap::default();
        let mut kb = KeyboardState::new();
        let mut state = ActionState::new();

        press_key(&mut kb, KeyCode::NumpadAdd);
        ActionResolver::resolve(&map, &kb, &mut state);
        assert!(state.is_action_active(Action::ZoomIn));

        press_key(&mut kb, KeyCode::Equal);
        ActionResolver::resolve(&map, &kb, &mut state);
        assert!((state.action_value(Action::ZoomIn) - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_unmapped_key_is_ignored() {
        let map = InputMap::default();
        let mut kb = KeyboardState::new();
        press_key(&mut kb, KeyCode::KeyQ);

        let mut state = ActionState::new();
        ActionResolver::resolve(&map, &kb, &mut state);

        for action in Action::CAMERA {
            assert!(!state.is_action_active(action));
        }
        assert!(!state.is_action_active(Action::Quit));
    }

    #[test]
    fn test_pause_toggle_edge() {
        let map = InputMap::default();
        let mut kb = KeyboardState::new();
        let mut state = ActionState::new();

        press_key(&mut kb, KeyCode::Space);
        ActionResolver::resolve(&map, &kb, &mut state);
        assert!(state.action_just_activated(Action::TogglePause));
        kb.clear_transients();

        ActionResolver::resolve(&map, &kb, &mut state);
        assert!(!state.action_just_activated(Action::TogglePause));
        assert!(state.is_action_active(Action::TogglePause));
        kb.clear_transients();

        release_key(&mut kb, KeyCode::Space);
        ActionResolver::resolve(&map, &kb, &mut state);
        assert!(!state.is_action_active(Action::TogglePause));
        assert!(!state.action_just_activated(Action::TogglePause));
    }

    #[test]
    fn test_tap_within_one_frame_activates_once() {
        let map = InputMap::default();
        let mut kb = KeyboardState::new();
        let mut state = ActionState::new();

        press_key(&mut kb, KeyCode::Space);
        release_key(&mut kb, KeyCode::Space);
        ActionResolver::resolve(&map, &kb, &mut state);
        assert!(state.action_just_activated(Action::TogglePause));

        kb.clear_transients();
        ActionResolver::resolve(&map, &kb, &mut state);
        assert!(!state.is_action_active(Action::TogglePause));
        assert!(!state.action_just_activated(Action::TogglePause));
    }

    #[test]
    fn test_rebinding_at_runtime() {
        let mut map = InputMap::default();
        map.set_bindings(Action::ResetCamera, vec![InputBinding::Key(KeyCode::KeyR)]);

        let mut kb = KeyboardState::new();
        let mut state = ActionState::new();
        press_key(&mut kb, KeyCode::KeyH);
        ActionResolver::resolve(&map, &kb, &mut state);
        assert!(!state.is_action_active(Action::ResetCamera));

        press_key(&mut kb, KeyCode::KeyR);
        ActionResolver::resolve(&map, &kb, &mut state);
        assert!(state.is_action_active(Action::ResetCamera));
    }

    #[test]
    fn test_ron_roundtrip() {
        let map = InputMap::default();
        let text = map.to_ron().unwrap();
        assert!(text.contains("ArrowLeft"));
        let parsed = InputMap::from_ron(&text).unwrap();
        assert_eq!(
            parsed.get_bindings(&Action::ZoomOut),
            map.get_bindings(&Action::ZoomOut)
        );
    }

    #[test]
    fn test_unknown_key_name_rejected() {
        let text = r#"(bindings: {Quit: [Key("Hyper")]})"#;
        assert!(InputMap::from_ron(text).is_err());
    }

    #[test]
    fn test_letter_keys_parse() {
        assert_eq!(keycode_serde::string_to_keycode("KeyH"), Some(KeyCode::KeyH));
        assert_eq!(keycode_serde::string_to_keycode("KeyZ"), Some(KeyCode::KeyZ));
        assert_eq!(keycode_serde::string_to_keycode("Keyh"), None);
    }
}
