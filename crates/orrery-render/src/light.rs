//! The single point light placed at the central star.

use bytemuck::{Pod, Zeroable};
use glam::Vec3;

/// CPU-side point light. The surface shader attenuates it by
/// `1 / (constant + linear·d + quadratic·d²)`.
#[derive(Clone, Debug, PartialEq)]
pub struct PointLight {
    pub position: Vec3,
    pub ambient: Vec3,
    pub diffuse: Vec3,
    pub specular_strength: f32,
    pub shininess: f32,
    pub constant: f32,
    pub linear: f32,
    pub quadratic: f32,
}

impl PointLight {
    pub fn to_uniform(&self) -> PointLightUniform {
        PointLightUniform {
            position_specular: self.position.extend(self.specular_strength).to_array(),
            ambient_shininess: self.ambient.extend(self.shininess).to_array(),
            diffuse: self.diffuse.extend(1.0).to_array(),
            attenuation: [self.constant, self.linear, self.quadratic, 0.0],
        }
    }
}

impl Default for PointLight {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            ambient: Vec3::new(0.08, 0.08, 0.10),
            diffuse: Vec3::new(1.0, 0.98, 0.92),
            specular_strength: 0.3,
            shininess: 25.0,
            constant: 1.0,
            linear: 0.0005,
            quadratic: 0.000002,
        }
    }
}

/// GPU layout of [`PointLight`], 64 bytes.
#[repr(C)]
#[derive(Clone, Copy, Debug, Default, PartialEq, Pod, Zeroable)]
pub struct PointLightUniform {
    /// xyz = position, w = specular strength.
    pub position_specular: [f32; 4],
    /// rgb = ambient, w = shininess.
    pub ambient_shininess: [f32; 4],
    pub diffuse: [f32; 4],
    /// constant, linear, quadratic, unused.
    pub attenuation: [f32; 4],
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_packing() {
        let light = PointLight {
            position: Vec3::new(1.0, 2.0, 3.0),
            ..Default::default()
        };
        let u = light.to_uniform();
        assert_eq!(u.position_specular, [1.0, 2.0, 3.0, 0.3]);
        assert_eq!(u.ambient_shininess[3], 25.0);
        assert_eq!(u.attenuation, [1.0, 0.0005, 0.000002, 0.0]);
        assert_eq!(std::mem::size_of::<PointLightUniform>(), 64);
    }
}
