//! Per-tick geometry handed to the joint kinds, and the row patterns they share.

use glam::{Quat, Vec3};

use crate::dynamics::rows::{BodyState, ConstraintSink};
use crate::utils::math::{cos_sin_about_axis, rotation_error, Frame};

use super::joint::PinFrames;

/// Both bodies and both global pin frames for one submission.
///
/// The parent pin frame is the reference: its front is the joint axis, and measured angles and
/// offsets describe the child pin relative to it.
#[derive(Debug, Clone, Copy)]
pub struct SubmitContext {
    pub child: BodyState,
    pub parent: BodyState,
    pub child_pin: Frame,
    pub parent_pin: Frame,
    pub timestep: f32,
}

impl SubmitContext {
    pub fn new(child: BodyState, parent: BodyState, pins: &PinFrames, timestep: f32) -> Self {
        Self {
            child_pin: pins.child.to_global(&child.frame),
            parent_pin: pins.parent.to_global(&parent.frame),
            child,
            parent,
            timestep,
        }
    }

    /// Whether this submission moves time forward; zero-time passes only produce rows.
    #[inline]
    pub fn advancing(&self) -> bool {
        self.timestep > 0.0
    }

    #[inline]
    pub fn axis(&self) -> Vec3 {
        self.parent_pin.front()
    }

    pub fn relative_omega(&self) -> Vec3 {
        self.child.velocity.angular - self.parent.velocity.angular
    }

    /// Velocity of the child pin relative to the parent material point under it.
    pub fn relative_velocity(&self) -> Vec3 {
        let point = self.child_pin.origin;
        self.child.point_velocity(point) - self.parent.point_velocity(point)
    }

    /// Offset of the child pin from the parent pin along `axis`.
    pub fn offset_along(&self, axis: Vec3) -> f32 {
        (self.child_pin.origin - self.parent_pin.origin).dot(axis)
    }

    /// (cos, sin) of the child's rotation about the joint axis, measured on the up axes.
    pub fn axis_rotation(&self) -> (f32, f32) {
        cos_sin_about_axis(self.parent_pin.up(), self.child_pin.up(), self.axis())
    }

    /// Acceleration taking `velocity` to `desired` in one step; zero when not advancing.
    pub fn acceleration_towards(&self, desired: f32, velocity: f32) -> f32 {
        if self.advancing() {
            (desired - velocity) / self.timestep
        } else {
            0.0
        }
    }
}

/// Linear row at `point` along `dir` whose error is `correction`.
pub fn add_axis_row<S: ConstraintSink>(sink: &mut S, point: Vec3, dir: Vec3, correction: f32) {
    sink.add_linear_row(point, point + dir * correction, dir);
}

/// Three rows pinning the child pin origin to the parent pin origin.
pub fn lock_point<S: ConstraintSink>(sink: &mut S, ctx: &SubmitContext) {
    let basis = ctx.parent_pin.basis;
    for dir in [basis.x_axis, basis.y_axis, basis.z_axis] {
        sink.add_linear_row(ctx.child_pin.origin, ctx.parent_pin.origin, dir);
    }
}

/// Two rows keeping the child pin origin on the line through the parent pin along its front.
pub fn lock_lateral<S: ConstraintSink>(sink: &mut S, ctx: &SubmitContext) {
    for dir in [ctx.parent_pin.up(), ctx.parent_pin.right()] {
        sink.add_linear_row(ctx.child_pin.origin, ctx.parent_pin.origin, dir);
    }
}

/// Two angular rows keeping the child pin front parallel to `target_front`.
pub fn lock_alignment<S: ConstraintSink>(sink: &mut S, ctx: &SubmitContext, target_front: Vec3) {
    let rotation = Quat::from_rotation_arc(ctx.child_pin.front(), target_front).to_scaled_axis();
    let (up, right) = perpendicular_pair(target_front, ctx.parent_pin.up());
    sink.add_angular_row(rotation.dot(up), up);
    sink.add_angular_row(rotation.dot(right), right);
}

/// Three angular rows holding the child pin orientation on `target`.
pub fn lock_orientation<S: ConstraintSink>(sink: &mut S, ctx: &SubmitContext, target: &Frame) {
    let error = rotation_error(&target.basis, &ctx.child_pin.basis);
    for axis in [target.front(), target.up(), target.right()] {
        sink.add_angular_row(error.dot(axis), axis);
    }
}

/// Friction row along a linear direction: brakes the sliding velocity up to `friction`.
pub fn linear_friction_row<S: ConstraintSink>(
    sink: &mut S,
    ctx: &SubmitContext,
    dir: Vec3,
    friction: f32,
) {
    let velocity = ctx.relative_velocity().dot(dir);
    add_axis_row(sink, ctx.child_pin.origin, dir, 0.0);
    sink.set_row_acceleration(ctx.acceleration_towards(0.0, velocity));
    let friction = friction.abs();
    sink.set_row_friction_bounds(-friction, friction);
}

/// Friction row about an axis: brakes the relative spin up to `friction` torque.
pub fn angular_friction_row<S: ConstraintSink>(
    sink: &mut S,
    ctx: &SubmitContext,
    axis: Vec3,
    friction: f32,
) {
    let omega = ctx.relative_omega().dot(axis);
    sink.add_angular_row(0.0, axis);
    sink.set_row_acceleration(ctx.acceleration_towards(0.0, omega));
    let friction = friction.abs();
    sink.set_row_friction_bounds(-friction, friction);
}

/// Bounds for a driven row; `0` means unlimited.
pub fn drive_bounds<S: ConstraintSink>(sink: &mut S, strength: f32) {
    if strength > 0.0 {
        sink.set_row_friction_bounds(-strength, strength);
    }
}

/// Moves the pin origin along its front to the projection of the child's center of mass.
pub fn snap_to_child_center(pin: &Frame, child: &BodyState) -> Frame {
    let along = (child.center_of_mass() - pin.origin).dot(pin.front());
    pin.with_origin(pin.origin + pin.front() * along)
}

/// Orthonormal pair perpendicular to `front`, seeded from `up_hint` when possible.
fn perpendicular_pair(front: Vec3, up_hint: Vec3) -> (Vec3, Vec3) {
    let frame = Frame::from_front_up(front, up_hint, Vec3::ZERO);
    (frame.up(), frame.right())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rigidbody::RigidBody;
    use crate::dynamics::rows::JointRows;
    use approx::assert_relative_eq;

    fn context(child_pin: Frame) -> SubmitContext {
        SubmitContext {
            child: BodyState::from_body(&RigidBody::default()),
            parent: BodyState::world(),
            child_pin,
            parent_pin: Frame::IDENTITY,
            timestep: 0.01,
        }
    }

    #[test]
    fn alignment_rows_measure_tilt() {
        let tilted = Frame::IDENTITY.rotated(Quat::from_rotation_z(0.2));
        let ctx = context(tilted);
        let mut rows = JointRows::new(ctx.child, ctx.parent, 0.01, 1.0, 0.3);
        lock_alignment(&mut rows, &ctx, Vec3::X);
        // Undoing a +0.2 rad tilt about Z.
        let total: f32 = rows
            .rows()
            .iter()
            .map(|row| row.error * row.child.angular.z)
            .sum();
        assert_relative_eq!(total, -0.2, epsilon = 1.0e-5);
    }

    #[test]
    fn snapping_keeps_axis_and_moves_origin() {
        let pin = Frame::from_front(Vec3::Z, Vec3::new(0.5, 0.0, 0.0));
        let mut body = RigidBody::default();
        body.transform.position = Vec3::new(1.0, 0.0, 2.0);
        let snapped = snap_to_child_center(&pin, &BodyState::from_body(&body));
        assert!(snapped.origin.abs_diff_eq(Vec3::new(0.5, 0.0, 2.0), 1.0e-6));
        assert_eq!(snapped.basis, pin.basis);
    }

    #[test]
    fn friction_row_is_inert_without_timestep() {
        let mut ctx = context(Frame::IDENTITY);
        ctx.timestep = 0.0;
        ctx.child.velocity.linear = Vec3::X;
        let mut rows = JointRows::new(ctx.child, ctx.parent, 0.0, 1.0, 0.3);
        linear_friction_row(&mut rows, &ctx, Vec3::X, 2.0);
        assert_eq!(rows.rows()[0].acceleration, 0.0);
        assert_eq!(rows.rows()[0].max_force, 2.0);
    }
}
