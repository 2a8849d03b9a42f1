use glam::{Mat3, Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::utils::math::Frame;

/// Position (center of mass) and orientation of a rigid body.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
        }
    }
}

impl Transform {
    pub fn from_position(position: Vec3) -> Self {
        Self {
            position,
            ..Self::default()
        }
    }

    pub fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// Orientation matrix plus position, as consumed by the joint layer.
    pub fn to_frame(&self) -> Frame {
        Frame::from_rotation_translation(self.rotation, self.position)
    }

    /// Applies another transform on top of this one, returning the composition.
    pub fn combine(&self, other: &Transform) -> Transform {
        Transform {
            position: self.position + self.rotation * other.position,
            rotation: (self.rotation * other.rotation).normalize(),
        }
    }
}

/// Linear and angular velocity of a rigid body.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Velocity {
    pub linear: Vec3,
    pub angular: Vec3,
}

/// Mass and body-space inertia tensor.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MassProperties {
    pub mass: f32,
    pub inertia: Mat3,
}

impl Default for MassProperties {
    fn default() -> Self {
        Self {
            mass: 1.0,
            inertia: Mat3::IDENTITY,
        }
    }
}

impl MassProperties {
    pub fn solid_box(half_extents: Vec3, mass: f32) -> Self {
        Self {
            mass,
            inertia: Mat3::for_solid_box(half_extents, mass),
        }
    }

    pub fn solid_sphere(radius: f32, mass: f32) -> Self {
        Self {
            mass,
            inertia: Mat3::for_solid_sphere(radius, mass),
        }
    }
}

/// Helper methods for inertia calculations.
pub trait InertiaTensorExt {
    fn for_solid_box(half_extents: Vec3, mass: f32) -> Mat3;
    fn for_solid_sphere(radius: f32, mass: f32) -> Mat3;
}

impl InertiaTensorExt for Mat3 {
    fn for_solid_box(half_extents: Vec3, mass: f32) -> Mat3 {
        let lx = half_extents.x * 2.0;
        let ly = half_extents.y * 2.0;
        let lz = half_extents.z * 2.0;
        let factor = mass / 12.0;
        Mat3::from_diagonal(Vec3::new(
            factor * (ly * ly + lz * lz),
            factor * (lx * lx + lz * lz),
            factor * (lx * lx + ly * ly),
        ))
    }

    fn for_solid_sphere(radius: f32, mass: f32) -> Mat3 {
        let value = 0.4 * mass * radius * radius;
        Mat3::from_diagonal(Vec3::splat(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn box_inertia_matches_closed_form() {
        let props = MassProperties::solid_box(Vec3::new(0.5, 1.0, 1.5), 12.0);
        assert_relative_eq!(props.inertia.x_axis.x, 4.0 + 9.0, epsilon = 1.0e-5);
        assert_relative_eq!(props.inertia.y_axis.y, 1.0 + 9.0, epsilon = 1.0e-5);
        assert_relative_eq!(props.inertia.z_axis.z, 1.0 + 4.0, epsilon = 1.0e-5);
    }

    #[test]
    fn frame_matches_transform() {
        let transform = Transform::new(Vec3::new(1.0, 2.0, 3.0), Quat::from_rotation_y(0.5));
        let frame = transform.to_frame();
        let local = Vec3::new(0.3, -0.2, 0.9);
        let expected = transform.position + transform.rotation * local;
        assert!(frame.transform_point(local).abs_diff_eq(expected, 1.0e-5));
    }
}
