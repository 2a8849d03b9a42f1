//! Plane: keeps the child pin on the plane through the parent pin, normal to its front axis.

use glam::Vec2;
use serde::{Deserialize, Serialize};

use crate::dynamics::angular::AngularIntegration;
use crate::dynamics::rows::ConstraintSink;
use crate::utils::math::wrap_angle;

use super::context::{
    angular_friction_row, linear_friction_row, lock_alignment, SubmitContext,
};
use super::{JointBehavior, JointKind};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaneSettings {
    /// Maximum friction force on each in-plane direction.
    pub linear_friction: f32,
    /// Maximum friction torque about the normal when rotation is enabled.
    pub angular_friction: f32,
    /// Free spin about the normal; otherwise held at the starting orientation.
    pub rotation_enabled: bool,
}

impl Default for PlaneSettings {
    fn default() -> Self {
        Self {
            linear_friction: 0.0,
            angular_friction: 0.0,
            rotation_enabled: false,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct PlaneJoint {
    settings: PlaneSettings,
    rotation: AngularIntegration,
    offset: Vec2,
}

impl PlaneJoint {
    pub fn new(settings: PlaneSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn settings(&self) -> &PlaneSettings {
        &self.settings
    }

    /// Angle about the normal since connect.
    pub fn angle(&self) -> f32 {
        self.rotation.angle()
    }

    /// Child pin position in the plane, along the parent pin's up and right axes.
    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    pub fn set_linear_friction(&mut self, friction: f32) {
        self.settings.linear_friction = friction.abs();
    }

    pub fn set_angular_friction(&mut self, friction: f32) {
        self.settings.angular_friction = friction.abs();
    }

    pub fn set_rotation_enabled(&mut self, enabled: bool) {
        self.settings.rotation_enabled = enabled;
    }
}

impl JointBehavior for PlaneJoint {
    const KIND: JointKind = JointKind::Plane;

    fn on_disconnect(&mut self) {
        self.rotation.reset();
        self.offset = Vec2::ZERO;
    }

    fn submit<S: ConstraintSink>(&mut self, ctx: &SubmitContext, sink: &mut S) {
        let normal = ctx.axis();
        let up = ctx.parent_pin.up();
        let right = ctx.parent_pin.right();

        sink.add_linear_row(ctx.child_pin.origin, ctx.parent_pin.origin, normal);
        linear_friction_row(sink, ctx, up, self.settings.linear_friction);
        linear_friction_row(sink, ctx, right, self.settings.linear_friction);
        lock_alignment(sink, ctx, normal);

        let (cos, sin) = ctx.axis_rotation();
        let mut rotation = self.rotation;
        let angle = rotation.update(cos, sin);
        if self.settings.rotation_enabled {
            angular_friction_row(sink, ctx, normal, self.settings.angular_friction);
        } else {
            sink.add_angular_row(-wrap_angle(angle), normal);
        }

        if ctx.advancing() {
            self.rotation = rotation;
            self.offset = Vec2::new(ctx.offset_along(up), ctx.offset_along(right));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rigidbody::RigidBody;
    use crate::dynamics::rows::{BodyState, JointRows};
    use crate::joints::joint::PinFrames;
    use crate::utils::math::Frame;
    use approx::assert_relative_eq;
    use glam::Vec3;

    #[test]
    fn normal_is_locked_and_plane_is_free() {
        let mut body = RigidBody::default().with_position(Vec3::new(0.2, 0.5, -0.3));
        body.velocity.linear = Vec3::new(0.0, 1.0, 0.0);
        let pins = PinFrames {
            child: Frame::IDENTITY,
            parent: Frame::IDENTITY,
            parent_unadjusted: Frame::IDENTITY,
        };
        let ctx = SubmitContext::new(BodyState::from_body(&body), BodyState::world(), &pins, 0.01);
        let mut plane = PlaneJoint::new(PlaneSettings {
            linear_friction: 3.0,
            ..PlaneSettings::default()
        });
        let mut rows = JointRows::new(ctx.child, ctx.parent, 0.01, 1.0, 0.3);
        plane.submit(&ctx, &mut rows);

        assert_eq!(rows.row_count(), 6);
        assert_relative_eq!(rows.rows()[0].error, -0.2, epsilon = 1.0e-6);
        // Sliding along up is braked, bounded by the friction.
        assert_relative_eq!(rows.rows()[1].acceleration, -100.0, epsilon = 1.0e-3);
        assert_eq!(rows.rows()[1].max_force, 3.0);
        assert_relative_eq!(plane.offset().x, 0.5, epsilon = 1.0e-6);
        assert_relative_eq!(plane.offset().y, -0.3, epsilon = 1.0e-6);
    }
}
