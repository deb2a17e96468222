//! Orbit camera around the scene origin, driven by held input actions.

use std::f32::consts::FRAC_PI_2;

use glam::{Mat4, Quat, Vec3};
use orrery_config::CameraConfig;
use orrery_input::{Action, ActionState};
use orrery_render::{Camera, Projection};

/// Yaw, pitch and distance of an orbit camera looking at the origin.
///
/// Only [`CameraController::update`] and [`CameraController::reset`] change
/// the state. Updates take real frame time and never look at the simulation
/// clock, so the camera stays responsive while the simulation is paused.
#[derive(Clone, Debug, PartialEq)]
pub struct CameraController {
    yaw: f32,
    pitch: f32,
    distance: f32,
    settings: CameraConfig,
}

impl CameraController {
    pub fn new(settings: &CameraConfig) -> Self {
        let mut controller = Self {
            yaw: 0.0,
            pitch: 0.0,
            distance: 0.0,
            settings: settings.clone(),
        };
        controller.reset();
        controller
    }

    pub fn yaw(&self) -> f32 {
        self.yaw
    }

    pub fn pitch(&self) -> f32 {
        self.pitch
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    /// Largest absolute pitch, just short of the poles.
    pub fn pitch_limit(&self) -> f32 {
        (FRAC_PI_2 - self.settings.pitch_margin.max(1e-3)).max(0.0)
    }

    fn distance_bounds(&self) -> (f32, f32) {
        let (a, b) = (self.settings.min_distance, self.settings.max_distance);
        (a.min(b), a.max(b))
    }

    /// Advance by `cam_dt` real seconds with the currently held actions.
    pub fn update(&mut self, cam_dt: f32, actions: &ActionState) {
        let axis = |pos: Action, neg: Action| actions.action_value(pos) - actions.action_value(neg);
        let s = &self.settings;

        let yaw_input = axis(Action::OrbitRight, Action::OrbitLeft);
        let pitch_input = axis(Action::OrbitUp, Action::OrbitDown);
        let zoom_input = axis(Action::ZoomOut, Action::ZoomIn);

        self.yaw = (self.yaw + yaw_input * s.yaw_speed * cam_dt).rem_euclid(std::f32::consts::TAU);
        let pitch = self.pitch + pitch_input * s.pitch_speed * cam_dt;
        let distance = self.distance + zoom_input * s.zoom_speed * cam_dt;

        let limit = self.pitch_limit();
        let (min, max) = self.distance_bounds();
        self.pitch = pitch.clamp(-limit, limit);
        self.distance = distance.clamp(min, max);
    }

    /// Restore the configured default yaw, pitch and distance.
    pub fn reset(&mut self) {
        let limit = self.pitch_limit();
        let (min, max) = self.distance_bounds();
        self.yaw = self.settings.default_yaw;
        self.pitch = self.settings.default_pitch.clamp(-limit, limit);
        self.distance = self.settings.default_distance.clamp(min, max);
        tracing::info!(
            "Camera reset: yaw={:.2} pitch={:.2} distance={:.1}",
            self.yaw,
            self.pitch,
            self.distance
        );
    }

    /// Replace the settings after a config reload and re-clamp the state.
    pub fn set_settings(&mut self, settings: &CameraConfig) {
        self.settings = settings.clone();
        let limit = self.pitch_limit();
        let (min, max) = self.distance_bounds();
        self.pitch = self.pitch.clamp(-limit, limit);
        self.distance = self.distance.clamp(min, max);
    }

    /// Camera orientation in world space.
    pub fn rotation(&self) -> Quat {
        Quat::from_rotation_y(-self.yaw) * Quat::from_rotation_x(-self.pitch)
    }

    pub fn eye_position(&self) -> Vec3 {
        self.rotation() * Vec3::new(0.0, 0.0, self.distance)
    }

    /// `T(0, 0, -distance) · Rx(pitch) · Ry(yaw)`
    pub fn view_matrix(&self) -> Mat4 {
        Mat4::from_translation(Vec3::new(0.0, 0.0, -self.distance))
            * Mat4::from_rotation_x(self.pitch)
            * Mat4::from_rotation_y(self.yaw)
    }

    /// Render camera for the current state.
    pub fn camera(&self, aspect_ratio: f32) -> Camera {
        Camera {
            position: self.eye_position(),
            rotation: self.rotation(),
            projection: Projection {
                fov_y: self.settings.fov_y_degrees.to_radians(),
                aspect_ratio,
            },
            near: self.settings.near,
            far: self.settings.far,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn held(actions: &[Action]) -> ActionState {
        let mut state = ActionState::new();
        for action in actions {
            state.set_value(*action, 1.0);
        }
        state
    }

    fn controller() -> CameraController {
        CameraController::new(&CameraConfig::default())
    }

    #[test]
    fn test_starts_at_defaults() {
        let c = controller();
        let cfg = CameraConfig::default();
        assert_eq!(c.yaw(), cfg.default_yaw);
        assert_eq!(c.pitch(), cfg.default_pitch);
        assert_eq!(c.distance(), cfg.default_distance);
    }

    #[test]
    fn test_orbit_rates_scale_with_dt() {
        let mut c = controller();
        let cfg = CameraConfig::default();
        c.update(0.1, &held(&[Action::OrbitRight]));
        assert!((c.yaw() - cfg.yaw_speed * 0.1).abs() < 1e-5);

        let mut c = controller();
        c.update(0.2, &held(&[Action::OrbitUp]));
        assert!((c.pitch() - (cfg.default_pitch + cfg.pitch_speed * 0.2)).abs() < 1e-5);

        let mut c = controller();
        c.update(0.5, &held(&[Action::ZoomIn]));
        assert!((c.distance() - (cfg.default_distance - cfg.zoom_speed * 0.5)).abs() < 1e-3);
    }

    #[test]
    fn test_opposing_actions_cancel() {
        let mut c = controller();
        let before = c.clone();
        c.update(1.0, &held(&[Action::OrbitLeft, Action::OrbitRight, Action::ZoomIn, Action::ZoomOut]));
        assert_eq!(c.distance(), before.distance());
        assert!((c.yaw() - before.yaw()).abs() < 1e-6);
    }

    #[test]
    fn test_pitch_clamped_short_of_poles() {
        let mut c = controller();
        for _ in 0..100 {
            c.update(0.1, &held(&[Action::OrbitUp]));
        }
        assert!((c.pitch() - c.pitch_limit()).abs() < 1e-6);
        assert!(c.pitch() < FRAC_PI_2);
        for _ in 0..200 {
            c.update(0.1, &held(&[Action::OrbitDown]));
        }
        assert!((c.pitch() + c.pitch_limit()).abs() < 1e-6);
    }

    #[test]
    fn test_distance_clamped() {
        let cfg = CameraConfig::default();
        let mut c = controller();
        c.update(100.0, &held(&[Action::ZoomIn]));
        assert_eq!(c.distance(), cfg.min_distance);
        c.update(100.0, &held(&[Action::ZoomOut]));
        assert_eq!(c.distance(), cfg.max_distance);
    }

    #[test]
    fn test_reset_restores_defaults() {
        let mut c = controller();
        c.update(0.7, &held(&[Action::OrbitLeft, Action::OrbitDown, Action::ZoomOut]));
        assert_ne!(c, controller());
        c.reset();
        assert_eq!(c, controller());
    }

    #[test]
    fn test_zero_dt_changes_nothing() {
        let mut c = controller();
        c.update(0.0, &held(&Action::CAMERA));
        assert_eq!(c, controller());
    }

    #[test]
    fn test_camera_matches_view_matrix() {
        let mut c = controller();
        c.update(0.3, &held(&[Action::OrbitLeft, Action::OrbitUp]));
        let camera = c.camera(16.0 / 9.0);
        let expected = c.view_matrix();
        let actual = camera.view_matrix();
        for (a, b) in expected.to_cols_array().iter().zip(actual.to_cols_array()) {
            assert!((a - b).abs() < 1e-3, "{expected} vs {actual}");
        }
        assert!((camera.position.length() - c.distance()).abs() < 1e-3);
        // The eye looks at the origin.
        let to_origin = (-camera.position).normalize();
        assert!(camera.forward().dot(to_origin) > 0.9999);
    }

    #[test]
    fn test_positive_pitch_looks_down_from_above() {
        let c = controller();
        assert!(c.eye_position().y > 0.0);
    }

    #[test]
    fn test_settings_change_reclamps() {
        let mut c = controller();
        let tight = CameraConfig {
            max_distance: 100.0,
            ..CameraConfig::default()
        };
        c.set_settings(&tight);
        assert_eq!(c.distance(), 100.0);
    }
}
