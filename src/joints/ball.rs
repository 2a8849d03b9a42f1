//! Ball and socket: free rotation about the pin, bounded by a cone and a twist range.

use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

use crate::config::MIN_CONE_ANGLE;
use crate::dynamics::angular::AngularIntegration;
use crate::dynamics::rows::ConstraintSink;
use crate::utils::math::{cos_sin_about_axis, Frame};

use super::context::{lock_alignment, lock_point, SubmitContext};
use super::limits::LimitRange;
use super::{JointBehavior, JointKind};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BallAndSocketSettings {
    pub cone_enabled: bool,
    /// Maximum angle between the child and parent pin fronts, radians.
    pub max_cone_angle: f32,
    pub twist_limits: LimitRange,
    /// Maximum friction torque on each rotation axis.
    pub friction: f32,
    /// Fraction of the relative spin the friction rows try to remove per step.
    pub control_scale: f32,
}

impl Default for BallAndSocketSettings {
    fn default() -> Self {
        Self {
            cone_enabled: false,
            max_cone_angle: std::f32::consts::FRAC_PI_4,
            twist_limits: LimitRange::default(),
            friction: 0.0,
            control_scale: 1.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct BallAndSocketJoint {
    settings: BallAndSocketSettings,
    twist: AngularIntegration,
    cone_angle: f32,
    twist_omega: f32,
    twist_alpha: f32,
}

impl BallAndSocketJoint {
    pub fn new(settings: BallAndSocketSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn settings(&self) -> &BallAndSocketSettings {
        &self.settings
    }

    pub fn cone_angle(&self) -> f32 {
        self.cone_angle
    }

    pub fn twist_angle(&self) -> f32 {
        self.twist.angle()
    }

    pub fn twist_omega(&self) -> f32 {
        self.twist_omega
    }

    pub fn twist_alpha(&self) -> f32 {
        self.twist_alpha
    }

    pub fn set_cone_limit(&mut self, max_angle: f32, enabled: bool) {
        self.settings.max_cone_angle = max_angle.abs();
        self.settings.cone_enabled = enabled;
    }

    pub fn set_twist_limits(&mut self, min: f32, max: f32, enabled: bool) {
        self.settings.twist_limits = LimitRange { enabled, min, max };
    }

    pub fn set_friction(&mut self, friction: f32) {
        self.settings.friction = friction.abs();
    }

    pub fn set_control_scale(&mut self, scale: f32) {
        self.settings.control_scale = scale.clamp(0.0, 1.0);
    }

    /// Cone row, or the locked pair when the cone has collapsed. Returns whether rows were added.
    fn submit_cone<S: ConstraintSink>(&self, ctx: &SubmitContext, sink: &mut S, cone: f32) -> bool {
        if !self.settings.cone_enabled {
            return false;
        }
        let parent_front = ctx.parent_pin.front();
        if self.settings.max_cone_angle < MIN_CONE_ANGLE {
            lock_alignment(sink, ctx, parent_front);
            return true;
        }
        if cone <= self.settings.max_cone_angle {
            return false;
        }
        let lateral = ctx.child_pin.front().cross(parent_front);
        if lateral.length_squared() < 1.0e-12 {
            return false;
        }
        sink.add_angular_row(cone - self.settings.max_cone_angle, lateral.normalize());
        sink.set_row_friction_bounds(0.0, f32::INFINITY);
        true
    }

    fn friction_row<S: ConstraintSink>(&self, ctx: &SubmitContext, sink: &mut S, axis: Vec3) {
        let omega = ctx.relative_omega().dot(axis);
        sink.add_angular_row(0.0, axis);
        let scale = self.settings.control_scale;
        sink.set_row_acceleration(ctx.acceleration_towards((1.0 - scale) * omega, omega));
        sink.set_row_friction_bounds(-self.settings.friction, self.settings.friction);
    }
}

/// Twist of the child about its front after removing the swing that separates the two fronts.
fn twist_rotation(child_pin: &Frame, parent_pin: &Frame) -> (f32, f32) {
    let swing = Quat::from_rotation_arc(child_pin.front(), parent_pin.front());
    let untwisted_up = swing * child_pin.up();
    cos_sin_about_axis(parent_pin.up(), untwisted_up, parent_pin.front())
}

impl JointBehavior for BallAndSocketJoint {
    const KIND: JointKind = JointKind::BallAndSocket;

    fn on_disconnect(&mut self) {
        self.twist.reset();
        self.cone_angle = 0.0;
        self.twist_omega = 0.0;
        self.twist_alpha = 0.0;
    }

    fn submit<S: ConstraintSink>(&mut self, ctx: &SubmitContext, sink: &mut S) {
        lock_point(sink, ctx);

        let child_front = ctx.child_pin.front();
        let cone = child_front
            .dot(ctx.parent_pin.front())
            .clamp(-1.0, 1.0)
            .acos();
        let (cos, sin) = twist_rotation(&ctx.child_pin, &ctx.parent_pin);
        let mut twist = self.twist;
        let twist_angle = twist.update(cos, sin);
        let twist_omega = ctx.relative_omega().dot(child_front);

        let cone_limited = self.submit_cone(ctx, sink, cone);
        let twist_limits = self.settings.twist_limits;
        let twist_limited = twist_limits.submit_angular(sink, twist_angle, child_front);

        if self.settings.friction > 0.0 {
            if !cone_limited {
                let swing_axes = Frame::from_front_up(child_front, ctx.child_pin.up(), Vec3::ZERO);
                self.friction_row(ctx, sink, swing_axes.up());
                self.friction_row(ctx, sink, swing_axes.right());
            }
            if !twist_limited {
                self.friction_row(ctx, sink, child_front);
            }
        }

        if ctx.advancing() {
            self.twist_alpha = (twist_omega - self.twist_omega) / ctx.timestep;
            self.twist_omega = twist_omega;
            self.cone_angle = cone;
            self.twist = twist;
        }
    }
}
