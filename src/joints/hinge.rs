//! Hinge: one rotary degree of freedom about the pin front axis.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::dynamics::angular::AngularIntegration;
use crate::dynamics::rows::{BodySide, BodyState, ConstraintSink};
use crate::utils::math::Frame;

use super::context::{
    angular_friction_row, drive_bounds, lock_alignment, lock_point, snap_to_child_center,
    SubmitContext,
};
use super::limits::LimitRange;
use super::{JointBehavior, JointKind};

/// How the rotary degree of freedom is driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum HingeMode {
    /// Passive, braked by `friction`.
    #[default]
    Free,
    /// Tracks a target angle that advances at the commanded omega.
    Controlled,
    /// Spring torque applied straight to both bodies, outside the solver rows.
    Spring,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HingeSettings {
    pub mode: HingeMode,
    pub limits: LimitRange,
    /// Maximum friction torque in free mode.
    pub friction: f32,
    /// Fraction of the angle error removed per step in controlled mode.
    pub controller_accel: f32,
    /// Fraction of the omega error removed per step in controlled mode.
    pub controller_damp: f32,
    /// Maximum controller torque; 0 is unlimited.
    pub controller_strength: f32,
    pub spring: f32,
    pub damper: f32,
}

impl Default for HingeSettings {
    fn default() -> Self {
        Self {
            mode: HingeMode::Free,
            limits: LimitRange::default(),
            friction: 0.0,
            controller_accel: 1.0,
            controller_damp: 1.0,
            controller_strength: 0.0,
            spring: 0.0,
            damper: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct HingeJoint {
    settings: HingeSettings,
    rotation: AngularIntegration,
    omega: f32,
    alpha: f32,
    target_angle: f32,
    commanded_omega: f32,
    limits_suspended: bool,
}

impl HingeJoint {
    pub fn new(settings: HingeSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn settings(&self) -> &HingeSettings {
        &self.settings
    }

    /// Accumulated angle since connect, radians.
    pub fn angle(&self) -> f32 {
        self.rotation.angle()
    }

    pub fn omega(&self) -> f32 {
        self.omega
    }

    pub fn alpha(&self) -> f32 {
        self.alpha
    }

    pub fn mode(&self) -> HingeMode {
        self.settings.mode
    }

    pub fn set_mode(&mut self, mode: HingeMode) {
        if self.settings.mode != mode {
            self.settings.mode = mode;
            self.target_angle = self.settings.limits.clamp(self.rotation.angle());
            self.suspend_limits_if_outside();
        }
    }

    pub fn limits(&self) -> LimitRange {
        self.settings.limits
    }

    pub fn set_limits(&mut self, min: f32, max: f32) {
        self.settings.limits.min = min;
        self.settings.limits.max = max;
    }

    pub fn set_limits_enabled(&mut self, enabled: bool) {
        self.settings.limits.enabled = enabled;
    }

    pub fn friction(&self) -> f32 {
        self.settings.friction
    }

    pub fn set_friction(&mut self, friction: f32) {
        self.settings.friction = friction.abs();
    }

    /// Controlled-mode gains. Outside the limits, a controller change suspends them until the
    /// angle is back in range.
    pub fn set_controller(&mut self, accel: f32, damp: f32, strength: f32) {
        self.settings.controller_accel = accel.max(0.0);
        self.settings.controller_damp = damp.max(0.0);
        self.settings.controller_strength = strength.max(0.0);
        self.suspend_limits_if_outside();
    }

    pub fn controller(&self) -> (f32, f32, f32) {
        (
            self.settings.controller_accel,
            self.settings.controller_damp,
            self.settings.controller_strength,
        )
    }

    pub fn commanded_omega(&self) -> f32 {
        self.commanded_omega
    }

    pub fn set_commanded_omega(&mut self, omega: f32) {
        self.commanded_omega = omega;
        self.suspend_limits_if_outside();
    }

    pub fn target_angle(&self) -> f32 {
        self.target_angle
    }

    /// Sets the controller target, clamped into the limits when they are enabled.
    pub fn set_target_angle(&mut self, angle: f32) {
        self.target_angle = self.settings.limits.clamp(angle);
        self.suspend_limits_if_outside();
    }

    pub fn spring(&self) -> (f32, f32) {
        (self.settings.spring, self.settings.damper)
    }

    pub fn set_spring(&mut self, spring: f32, damper: f32) {
        self.settings.spring = spring.max(0.0);
        self.settings.damper = damper.max(0.0);
    }

    pub fn limits_suspended(&self) -> bool {
        self.limits_suspended
    }

    /// Limits only stand aside while the arm sits outside them.
    fn suspend_limits_if_outside(&mut self) {
        self.limits_suspended = !self.settings.limits.contains(self.rotation.angle());
    }

    fn submit_controller<S: ConstraintSink>(
        &self,
        ctx: &SubmitContext,
        sink: &mut S,
        target: f32,
        angle: f32,
        omega: f32,
    ) {
        let axis = ctx.axis();
        let error = target - angle;
        sink.add_angular_row(error, axis);
        if ctx.advancing() {
            let dt = ctx.timestep;
            // A target parked on a limit no longer moves, so neither should the arm.
            let next = target + self.commanded_omega * dt;
            let target_omega = if self.settings.limits.clamp(next) == next {
                self.commanded_omega
            } else {
                0.0
            };
            let correction = self.settings.controller_accel * error / dt
                + self.settings.controller_damp * (target_omega - omega);
            sink.set_row_acceleration(correction / dt);
        }
        drive_bounds(sink, self.settings.controller_strength);
    }

    fn apply_spring<S: ConstraintSink>(
        &self,
        sink: &mut S,
        axis: Vec3,
        target: f32,
        angle: f32,
        omega: f32,
    ) {
        let torque = -self.settings.spring * (angle - target) - self.settings.damper * omega;
        sink.add_body_load(BodySide::Child, Vec3::ZERO, axis * torque);
        sink.add_body_load(BodySide::Parent, Vec3::ZERO, -axis * torque);
    }
}

impl JointBehavior for HingeJoint {
    const KIND: JointKind = JointKind::Hinge;

    fn adjust_pin_frame(&mut self, pin: &Frame, child: &BodyState, _parent: &BodyState) -> Frame {
        snap_to_child_center(pin, child)
    }

    fn on_connect(&mut self) {
        self.limits_suspended = true;
    }

    fn on_disconnect(&mut self) {
        self.rotation.reset();
        self.omega = 0.0;
        self.alpha = 0.0;
        self.target_angle = 0.0;
    }

    fn submit<S: ConstraintSink>(&mut self, ctx: &SubmitContext, sink: &mut S) {
        lock_point(sink, ctx);
        lock_alignment(sink, ctx, ctx.axis());

        let axis = ctx.axis();
        let (cos, sin) = ctx.axis_rotation();
        let mut rotation = self.rotation;
        let angle = rotation.update(cos, sin);
        let omega = ctx.relative_omega().dot(axis);

        let limits = self.settings.limits;
        let target = limits.clamp(self.target_angle);
        let mut suspended = self.limits_suspended;
        if suspended && limits.contains(angle) {
            suspended = false;
        }
        let limited = limits.enabled && !suspended && limits.submit_angular(sink, angle, axis);

        match self.settings.mode {
            HingeMode::Free => {
                if !limited {
                    angular_friction_row(sink, ctx, axis, self.settings.friction);
                }
            }
            HingeMode::Controlled => {
                if !limited {
                    self.submit_controller(ctx, sink, target, angle, omega);
                }
            }
            HingeMode::Spring => self.apply_spring(sink, axis, target, angle, omega),
        }

        if ctx.advancing() {
            let dt = ctx.timestep;
            self.target_angle = match self.settings.mode {
                HingeMode::Controlled => limits.clamp(target + self.commanded_omega * dt),
                _ => target,
            };
            self.alpha = (omega - self.omega) / dt;
            self.omega = omega;
            self.rotation = rotation;
            self.limits_suspended = suspended;
        }
    }
}
