//! Frame and rotation helpers layered on top of `glam`.

use glam::{Mat3, Quat, Vec3};
use serde::{Deserialize, Serialize};
use std::f32::consts::{PI, TAU};

/// Orthonormal coordinate frame: basis columns are front (x), up (y) and right (z).
///
/// A frame maps local coordinates into the space it is expressed in:
/// `p_space = basis * p_local + origin`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub basis: Mat3,
    pub origin: Vec3,
}

impl Default for Frame {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl Frame {
    pub const IDENTITY: Frame = Frame {
        basis: Mat3::IDENTITY,
        origin: Vec3::ZERO,
    };

    pub fn new(basis: Mat3, origin: Vec3) -> Self {
        Self { basis, origin }
    }

    pub fn from_translation(origin: Vec3) -> Self {
        Self::new(Mat3::IDENTITY, origin)
    }

    pub fn from_rotation_translation(rotation: Quat, origin: Vec3) -> Self {
        Self::new(Mat3::from_quat(rotation), origin)
    }

    /// Builds a frame whose front is `front`, picking an arbitrary perpendicular up.
    pub fn from_front(front: Vec3, origin: Vec3) -> Self {
        let front = front.normalize_or(Vec3::X);
        let (up, right) = front.any_orthonormal_pair();
        Self::from_axes(front, up, right, origin)
    }

    /// Builds a frame from a front direction and an approximate up direction.
    pub fn from_front_up(front: Vec3, up_hint: Vec3, origin: Vec3) -> Self {
        let front = front.normalize_or(Vec3::X);
        let right = front.cross(up_hint);
        if right.length_squared() < 1.0e-8 {
            return Self::from_front(front, origin);
        }
        let right = right.normalize();
        let up = right.cross(front);
        Self::from_axes(front, up, right, origin)
    }

    fn from_axes(front: Vec3, up: Vec3, right: Vec3, origin: Vec3) -> Self {
        Self::new(Mat3::from_cols(front, up, right), origin)
    }

    #[inline]
    pub fn front(&self) -> Vec3 {
        self.basis.x_axis
    }

    #[inline]
    pub fn up(&self) -> Vec3 {
        self.basis.y_axis
    }

    #[inline]
    pub fn right(&self) -> Vec3 {
        self.basis.z_axis
    }

    pub fn rotation(&self) -> Quat {
        Quat::from_mat3(&self.basis).normalize()
    }

    pub fn transform_point(&self, local: Vec3) -> Vec3 {
        self.basis * local + self.origin
    }

    pub fn transform_vector(&self, local: Vec3) -> Vec3 {
        self.basis * local
    }

    pub fn untransform_point(&self, global: Vec3) -> Vec3 {
        self.basis.transpose() * (global - self.origin)
    }

    pub fn untransform_vector(&self, global: Vec3) -> Vec3 {
        self.basis.transpose() * global
    }

    /// Re-expresses a frame given relative to `space` in the space `space` lives in.
    pub fn to_global(&self, space: &Frame) -> Frame {
        Frame::new(space.basis * self.basis, space.transform_point(self.origin))
    }

    /// Expresses this frame relative to `space`; inverse of [`Frame::to_global`].
    pub fn to_local(&self, space: &Frame) -> Frame {
        Frame::new(
            space.basis.transpose() * self.basis,
            space.untransform_point(self.origin),
        )
    }

    pub fn inverse(&self) -> Frame {
        let basis = self.basis.transpose();
        Frame::new(basis, -(basis * self.origin))
    }

    /// Rotates the basis by `rotation` (applied in the enclosing space), keeping the origin.
    pub fn rotated(&self, rotation: Quat) -> Frame {
        Frame::new(Mat3::from_quat(rotation) * self.basis, self.origin)
    }

    pub fn with_origin(&self, origin: Vec3) -> Frame {
        Frame::new(self.basis, origin)
    }

    /// Removes accumulated drift from repeated compositions.
    pub fn orthonormalized(&self) -> Frame {
        Frame::from_front_up(self.front(), self.up(), self.origin)
    }
}

/// Cosine and sine of the signed angle from `from` to `to` measured about `axis`.
pub fn cos_sin_about_axis(from: Vec3, to: Vec3, axis: Vec3) -> (f32, f32) {
    (from.dot(to), from.cross(to).dot(axis))
}

/// Rotation vector (axis * angle) that carries orientation `current` onto `target`.
pub fn rotation_error(target: &Mat3, current: &Mat3) -> Vec3 {
    let delta = (Quat::from_mat3(target) * Quat::from_mat3(current).inverse()).normalize();
    let (axis, angle) = delta.to_axis_angle();
    let angle = wrap_angle(angle);
    if angle.abs() < 1.0e-7 {
        return Vec3::ZERO;
    }
    axis * angle
}

/// Wraps an angle into `(-PI, PI]`.
pub fn wrap_angle(angle: f32) -> f32 {
    let wrapped = (angle + PI).rem_euclid(TAU) - PI;
    if wrapped <= -PI {
        wrapped + TAU
    } else {
        wrapped
    }
}
