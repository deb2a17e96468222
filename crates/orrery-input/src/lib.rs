//! Keyboard input mapped to orrery actions through RON-configurable bindings.

pub mod action_map;
pub mod keyboard;

pub use action_map::{Action, ActionResolver, ActionState, InputBinding, InputMap};
pub use keyboard::{KeyboardState, RawKeyEvent};
