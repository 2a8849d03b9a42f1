//! Corkscrew: independent slide along and rotation about the pin front axis.
//!
//! With rotation disabled the joint is a plain slider.

use serde::{Deserialize, Serialize};

use crate::dynamics::angular::AngularIntegration;
use crate::dynamics::rows::{BodyState, ConstraintSink};
use crate::utils::math::{wrap_angle, Frame};

use super::context::{
    angular_friction_row, linear_friction_row, lock_alignment, lock_lateral,
    snap_to_child_center, SubmitContext,
};
use super::limits::LimitRange;
use super::{JointBehavior, JointKind};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CorkscrewSettings {
    pub linear_limits: LimitRange,
    pub angular_limits: LimitRange,
    pub linear_friction: f32,
    pub angular_friction: f32,
    pub rotation_enabled: bool,
}

impl Default for CorkscrewSettings {
    fn default() -> Self {
        Self {
            linear_limits: LimitRange::default(),
            angular_limits: LimitRange::default(),
            linear_friction: 0.0,
            angular_friction: 0.0,
            rotation_enabled: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CorkscrewJoint {
    settings: CorkscrewSettings,
    rotation: AngularIntegration,
    omega: f32,
    alpha: f32,
    position: f32,
    velocity: f32,
    acceleration: f32,
}

impl CorkscrewJoint {
    pub fn new(settings: CorkscrewSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    /// Corkscrew with the rotary degree of freedom locked.
    pub fn slider() -> Self {
        Self::new(CorkscrewSettings {
            rotation_enabled: false,
            ..CorkscrewSettings::default()
        })
    }

    pub fn settings(&self) -> &CorkscrewSettings {
        &self.settings
    }

    pub fn angle(&self) -> f32 {
        self.rotation.angle()
    }

    pub fn omega(&self) -> f32 {
        self.omega
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn position(&self) -> f32 {
        self.position
    }

    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    pub fn acceleration(&self) -> f32 {
        self.acceleration
    }

    pub fn set_linear_limits(&mut self, min: f32, max: f32, enabled: bool) {
        self.settings.linear_limits = LimitRange { enabled, min, max };
    }

    pub fn set_angular_limits(&mut self, min: f32, max: f32, enabled: bool) {
        self.settings.angular_limits = LimitRange { enabled, min, max };
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

    pub fn is_slider(&self) -> bool {
        !self.settings.rotation_enabled
    }
}

impl JointBehavior for CorkscrewJoint {
    const KIND: JointKind = JointKind::Corkscrew;

    fn adjust_pin_frame(&mut self, pin: &Frame, child: &BodyState, _parent: &BodyState) -> Frame {
        snap_to_child_center(pin, child)
    }

    fn on_disconnect(&mut self) {
        self.rotation.reset();
        self.omega = 0.0;
        self.alpha = 0.0;
        self.position = 0.0;
        self.velocity = 0.0;
        self.acceleration = 0.0;
    }

    fn submit<S: ConstraintSink>(&mut self, ctx: &SubmitContext, sink: &mut S) {
        lock_lateral(sink, ctx);
        lock_alignment(sink, ctx, ctx.axis());

        let axis = ctx.axis();
        let point = ctx.child_pin.origin;
        let (cos, sin) = ctx.axis_rotation();
        let mut rotation = self.rotation;
        let angle = rotation.update(cos, sin);
        let omega = ctx.relative_omega().dot(axis);
        let position = ctx.offset_along(axis);
        let velocity = ctx.relative_velocity().dot(axis);

        let settings = &self.settings;
        if !settings.linear_limits.submit_linear(sink, position, point, axis) {
            linear_friction_row(sink, ctx, axis, settings.linear_friction);
        }

        if settings.rotation_enabled {
            if !settings.angular_limits.submit_angular(sink, angle, axis) {
                angular_friction_row(sink, ctx, axis, settings.angular_friction);
            }
        } else {
            sink.add_angular_row(-wrap_angle(angle), axis);
        }

        if ctx.advancing() {
            let dt = ctx.timestep;
            self.alpha = (omega - self.omega) / dt;
            self.omega = omega;
            self.acceleration = (velocity - self.velocity) / dt;
            self.velocity = velocity;
            self.position = position;
            self.rotation = rotation;
        }
    }
}
