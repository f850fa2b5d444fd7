//! Azimuth and elevation of a direction relative to a forward vector, with Z as up.
//!
//! Azimuth is the signed horizontal angle from forward to the direction, counter-clockwise
//! positive when seen from above. Elevation is the angle above the horizontal plane. Both are
//! in radians.

use bevy::math::{Quat, Vec3};

fn horizontal(v: Vec3) -> Vec3 {
    Vec3::new(v.x, v.y, 0.).normalize_or_zero()
}

pub fn celestial_coordinates(direction: Vec3, forward: Vec3) -> (f32, f32) {
    let flat_forward = horizontal(forward);
    let flat_direction = horizontal(direction);

    let azimuth = f32::atan2(
        flat_forward.cross(flat_direction).z,
        flat_forward.dot(flat_direction),
    );
    let elevation = direction.normalize_or_zero().z.clamp(-1., 1.).asin();

    (azimuth, elevation)
}

/// Unit direction at `azimuth`/`elevation` from `forward`. A vertical forward is treated as +X.
pub fn direction_from_celestial(azimuth: f32, elevation: f32, forward: Vec3) -> Vec3 {
    let flat_forward = match horizontal(forward) {
        v if v == Vec3::ZERO => Vec3::X,
        v => v,
    };
    let heading = Quat::from_rotation_z(azimuth) * flat_forward;

    heading * elevation.cos() + Vec3::Z * elevation.sin()
}

#[cfg(test)]
mod test {
    use super::*;
    use std::f32::consts::{FRAC_PI_2, FRAC_PI_4};

    const EPSILON: f32 = 1e-5;

    #[test]
    fn test_azimuth_is_counter_clockwise() {
        let (az, el) = celestial_coordinates(Vec3::X, Vec3::Y);
        assert!((az + FRAC_PI_2).abs() < EPSILON);
        assert!(el.abs() < EPSILON);

        let (az, _) = celestial_coordinates(-Vec3::X, Vec3::Y);
        assert!((az - FRAC_PI_2).abs() < EPSILON);
    }

    #[test]
    fn test_elevation() {
        let (az, el) = celestial_coordinates(Vec3::new(0., 1., 1.), Vec3::Y);
        assert!(az.abs() < EPSILON);
        assert!((el - FRAC_PI_4).abs() < EPSILON);

        let (_, el) = celestial_coordinates(Vec3::Z, Vec3::Y);
        assert!((el - FRAC_PI_2).abs() < EPSILON);
    }

    #[test]
    fn test_inverse() {
        let forward = Vec3::new(1., 1., 0.3);
        for (az, el) in [(0., 0.), (0.7, -0.2), (-2.5, 1.1)] {
            let direction = direction_from_celestial(az, el, forward);
            let (back_az, back_el) = celestial_coordinates(direction, forward);
            assert!((back_az - az).abs() < 1e-4, "{az} != {back_az}");
            assert!((back_el - el).abs() < 1e-4, "{el} != {back_el}");
        }
    }
}
