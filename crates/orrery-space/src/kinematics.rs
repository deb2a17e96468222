//! Closed-form orbital and spin motion.
//!
//! [`evaluate`] is a pure function of the body's elements and simulation time;
//! there is no integrator state, so pausing, resuming or re-evaluating the
//! same instant always yields the same pose.

use std::f64::consts::TAU;

use glam::{Quat, Vec3};

use crate::body::{CelestialBody, OrbitalElements};

/// Pose of a body relative to its parent at one instant.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LocalPose {
    /// Offset from the parent's origin, in the parent's frame.
    pub position: Vec3,
    /// Orientation of the tilted orbital plane: `Ry(node) · Rx(inclination)`.
    pub frame_rotation: Quat,
    /// Body orientation inside the orbital frame: axial tilt about Z, then spin about Y.
    pub orientation: Quat,
    /// Unwrapped planar orbit angle θ.
    pub orbit_angle: f64,
    /// Unwrapped spin angle φ.
    pub spin_angle: f64,
}

/// `phase0 + 2π·t/period`, or `phase0` when the period is infinite.
pub fn phase_angle(phase0: f32, period: Option<f32>, sim_time: f64) -> f64 {
    match period {
        Some(p) if p.is_finite() && p != 0.0 => phase0 as f64 + TAU * sim_time / p as f64,
        _ => phase0 as f64,
    }
}

/// Rotation about +Y by `angle` in the orbital sense (+X toward +Z).
pub fn spin_rotation(angle: f64) -> Quat {
    Quat::from_rotation_y(-(angle.rem_euclid(TAU) as f32))
}

/// Rotation taking the untilted orbital plane into the ecliptic frame.
///
/// Inclination about X is applied to the point first, then the ascending
/// node about Y. The two do not commute.
pub fn orbital_frame(orbit: &OrbitalElements) -> Quat {
    Quat::from_rotation_y(orbit.ascending_node) * Quat::from_rotation_x(orbit.inclination)
}

/// Point on the untilted orbit circle at angle θ.
pub fn planar_position(distance: f32, theta: f64) -> Vec3 {
    let theta = theta.rem_euclid(TAU);
    Vec3::new(
        (distance as f64 * theta.cos()) as f32,
        0.0,
        (distance as f64 * theta.sin()) as f32,
    )
}

/// Position and orientation of `body` relative to its parent at `sim_time`.
pub fn evaluate(body: &CelestialBody, sim_time: f64) -> LocalPose {
    let orbit = &body.orbit;
    let frame_rotation = orbital_frame(orbit);

    let orbit_angle = phase_angle(orbit.phase0, orbit.period, sim_time);
    let position = if orbit.distance > 0.0 {
        frame_rotation * planar_position(orbit.distance, orbit_angle)
    } else {
        Vec3::ZERO
    };

    let spin = &body.spin;
    let spin_angle = if spin.tidally_locked {
        orbit_angle
    } else {
        phase_angle(spin.spin_phase0, Some(spin.spin_period), sim_time)
    };
    let orientation = Quat::from_rotation_z(spin.axial_tilt) * spin_rotation(spin_angle);

    LocalPose {
        position,
        frame_rotation,
        orientation,
        orbit_angle,
        spin_angle,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::{SpinElements, SystemDescription};
    use glam::Mat3;

    fn body(name: &str) -> CelestialBody {
        SystemDescription::solar()
            .bodies
            .into_iter()
            .find(|b| b.name == name)
            .unwrap()
    }

    fn test_body(orbit: OrbitalElements, spin: SpinElements) -> CelestialBody {
        CelestialBody {
            name: "probe".into(),
            radius: 1.0,
            orbit,
            spin,
            parent: None,
            texture: "probe.jpg".into(),
            layers: Vec::new(),
            trail_color: None,
            emission: None,
        }
    }

    #[test]
    fn test_evaluate_is_deterministic() {
        for b in SystemDescription::solar().bodies {
            for t in [0.0, 1.25, 37.5, 1.0e5] {
                assert_eq!(evaluate(&b, t), evaluate(&b, t), "{}", b.name);
            }
        }
    }

    #[test]
    fn test_fixed_body_stays_at_origin() {
        let sun = body("Sun");
        assert_eq!(evaluate(&sun, 0.0).position, Vec3::ZERO);
        assert_eq!(evaluate(&sun, 999.0).position, Vec3::ZERO);
    }

    #[test]
    fn test_orbit_closes_after_one_period() {
        for name in ["Mercury", "Earth", "Moon", "Neptune"] {
            let b = body(name);
            let period = b.orbit.period.unwrap() as f64;
            let start = planar_position(b.orbit.distance, phase_angle(0.0, b.orbit.period, 0.0));
            let end = planar_position(b.orbit.distance, phase_angle(0.0, b.orbit.period, period));
            assert!(start.abs_diff_eq(end, 1e-3), "{name}: {start} vs {end}");
            let p0 = evaluate(&b, 0.0).position;
            let p1 = evaluate(&b, period).position;
            assert!(p0.abs_diff_eq(p1, 1e-3), "{name}");
        }
    }

    #[test]
    fn test_orbit_radius_is_preserved_by_tilt() {
        let b = body("Mercury");
        for i in 0..24 {
            let r = evaluate(&b, i as f64 * 0.5).position.length();
            assert!((r - 30.0).abs() < 1e-3);
        }
    }

    #[test]
    fn test_inclination_then_node_order() {
        let incl = 7.005f32.to_radians();
        let node = 48.331f32.to_radians();
        let b = test_body(
            OrbitalElements::circular(30.0, 12.0, 7.005, 48.331),
            SpinElements::new(20.0, 0.0),
        );
        let pose = evaluate(&b, 3.0);
        assert!((pose.orbit_angle - std::f64::consts::FRAC_PI_2).abs() < 1e-12);

        let planar = planar_position(30.0, std::f64::consts::FRAC_PI_2);
        assert!(planar.abs_diff_eq(Vec3::new(0.0, 0.0, 30.0), 1e-4));

        let expected = Mat3::from_rotation_y(node) * (Mat3::from_rotation_x(incl) * planar);
        assert!(pose.position.abs_diff_eq(expected, 1e-4));

        let reversed = Mat3::from_rotation_x(incl) * (Mat3::from_rotation_y(node) * planar);
        assert!(!pose.position.abs_diff_eq(reversed, 1e-2));
    }

    #[test]
    fn test_retrograde_spin_decreases() {
        let b = test_body(OrbitalElements::fixed(), SpinElements::new(-35.0, 0.0));
        let mut previous = evaluate(&b, 0.0).spin_angle;
        for i in 1..200 {
            let phi = evaluate(&b, i as f64 * 0.5).spin_angle;
            assert!(phi < previous);
            previous = phi;
        }
    }

    #[test]
    fn test_prograde_spin_increases() {
        let b = body("Earth");
        assert!(evaluate(&b, 1.0).spin_angle > evaluate(&b, 0.5).spin_angle);
    }

    #[test]
    fn test_tidally_locked_face_keeps_constant_angle_to_parent() {
        let moon = body("Moon");
        // Cosine of the angle between the locked face and the parent direction.
        let face_cos = |t: f64| {
            let pose = evaluate(&moon, t);
            let face = pose.frame_rotation * (pose.orientation * Vec3::NEG_X);
            face.dot((-pose.position).normalize())
        };
        let reference = face_cos(0.0);
        assert!((reference - 1.0).abs() < 1e-4);
        for i in 1..50 {
            let t = i as f64 * 0.37;
            assert!((face_cos(t) - reference).abs() < 1e-4, "t={t}");
        }
    }

    #[test]
    fn test_axial_tilt_applies_before_spin() {
        let b = body("Uranus");
        let pose = evaluate(&b, 0.0);
        let axis = pose.orientation * Vec3::Y;
        let tilt = b.spin.axial_tilt;
        assert!(axis.abs_diff_eq(Vec3::new(-tilt.sin(), tilt.cos(), 0.0), 1e-5));
    }
}
