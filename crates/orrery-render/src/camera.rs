//! View and projection matrices for the scene camera.

use glam::{Mat4, Quat, Vec3};

/// A camera that generates view and projection matrices for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct Camera {
    pub position: Vec3,
    /// Rotation as a unit quaternion.
    pub rotation: Quat,
    pub projection: Projection,
    /// Near clip plane distance (always positive).
    pub near: f32,
    /// Far clip plane distance (always positive, > near).
    pub far: f32,
}

/// Perspective projection parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    /// Vertical field of view in radians.
    pub fov_y: f32,
    /// Width / height.
    pub aspect_ratio: f32,
}

impl Camera {
    /// Compute the view matrix (inverse of camera transform).
    pub fn view_matrix(&self) -> Mat4 {
        (Mat4::from_translation(self.position) * Mat4::from_quat(self.rotation)).inverse()
    }

    /// Compute the projection matrix with reverse-Z.
    pub fn projection_matrix(&self) -> Mat4 {
        // Near and far swapped: near maps to z=1, far to z=0.
        Mat4::perspective_rh(
            self.projection.fov_y,
            self.projection.aspect_ratio,
            self.far,
            self.near,
        )
    }

    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection_matrix() * self.view_matrix()
    }

    /// View-projection with the translation stripped.
    ///
    /// Used by the backdrop sphere and the starfield so they stay centred on
    /// the eye no matter how far the camera dollies.
    pub fn sky_view_projection(&self) -> Mat4 {
        self.projection_matrix() * Mat4::from_quat(self.rotation.inverse())
    }

    /// The forward direction vector (-Z in camera space).
    pub fn forward(&self) -> Vec3 {
        self.rotation * Vec3::NEG_Z
    }

    pub fn up(&self) -> Vec3 {
        self.rotation * Vec3::Y
    }
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            projection: Projection {
                fov_y: 45f32.to_radians(),
                aspect_ratio: 1400.0 / 850.0,
            },
            near: 1.0,
            far: 5000.0,
        }
    }
}
