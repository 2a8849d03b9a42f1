//! Servo: a hinge whose rotation is driven by a rate-limited tracking controller.

use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_REDUCTION_RATIO;
use crate::dynamics::angular::AngularIntegration;
use crate::dynamics::rows::{BodyState, ConstraintSink};
use crate::utils::math::Frame;

use super::context::{drive_bounds, lock_alignment, lock_point, snap_to_child_center, SubmitContext};
use super::limits::LimitRange;
use super::{JointBehavior, JointKind};

/// What the controller's `target` means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum DriveMode {
    /// `target` is a position (angle or offset) reached at no more than `rate`.
    #[default]
    Position,
    /// `target` is a speed, clamped to `rate`.
    Rate,
}

/// Speed that closes `error` within one step without exceeding `rate`, slowing down inside the
/// `rate * reduction_ratio` zone around the target.
pub fn tracking_speed(error: f32, rate: f32, reduction_ratio: f32, timestep: f32) -> f32 {
    if timestep <= 0.0 || rate <= 0.0 {
        return 0.0;
    }
    let distance = error.abs();
    let mut speed = (distance / timestep).min(rate);
    let zone = rate * reduction_ratio;
    if zone > 0.0 && distance < zone {
        speed = speed.min(rate * distance / zone);
    }
    speed.copysign(error)
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServoSettings {
    pub mode: DriveMode,
    pub limits: LimitRange,
    /// Maximum angular speed, rad/s.
    pub rate: f32,
    pub reduction_ratio: f32,
    /// Maximum torque; 0 is unlimited.
    pub power: f32,
    /// Target angle (position mode) or angular speed (rate mode).
    pub target: f32,
}

impl Default for ServoSettings {
    fn default() -> Self {
        Self {
            mode: DriveMode::Position,
            limits: LimitRange::default(),
            rate: 1.0,
            reduction_ratio: DEFAULT_REDUCTION_RATIO,
            power: 0.0,
            target: 0.0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ServoJoint {
    settings: ServoSettings,
    rotation: AngularIntegration,
    omega: f32,
    alpha: f32,
    limits_suspended: bool,
}

impl ServoJoint {
    pub fn new(settings: ServoSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn settings(&self) -> &ServoSettings {
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

    pub fn set_mode(&mut self, mode: DriveMode) {
        self.settings.mode = mode;
        self.limits_suspended = true;
    }

    pub fn set_target(&mut self, target: f32) {
        self.settings.target = target;
        self.limits_suspended = true;
    }

    pub fn target(&self) -> f32 {
        self.settings.target
    }

    pub fn set_rate(&mut self, rate: f32) {
        self.settings.rate = rate.abs();
    }

    pub fn set_reduction_ratio(&mut self, ratio: f32) {
        self.settings.reduction_ratio = ratio.max(0.0);
    }

    pub fn set_power(&mut self, power: f32) {
        self.settings.power = power.max(0.0);
    }

    pub fn set_limits(&mut self, min: f32, max: f32) {
        self.settings.limits.min = min;
        self.settings.limits.max = max;
    }

    pub fn set_limits_enabled(&mut self, enabled: bool) {
        self.settings.limits.enabled = enabled;
    }

    pub fn limits(&self) -> LimitRange {
        self.settings.limits
    }

    /// Angular speed the controller asks for at `angle`. Position targets stay inside enabled
    /// limits.
    fn desired_omega(&self, angle: f32, timestep: f32) -> f32 {
        let settings = &self.settings;
        match settings.mode {
            DriveMode::Position => tracking_speed(
                settings.limits.clamp(settings.target) - angle,
                settings.rate,
                settings.reduction_ratio,
                timestep,
            ),
            DriveMode::Rate => settings.target.clamp(-settings.rate, settings.rate),
        }
    }
}

impl JointBehavior for ServoJoint {
    const KIND: JointKind = JointKind::Servo;

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
        let suspended = self.limits_suspended && !limits.contains(angle);
        let limited = limits.enabled && !suspended && limits.submit_angular(sink, angle, axis);
        if !limited {
            let desired = self.desired_omega(angle, ctx.timestep);
            sink.add_angular_row(0.0, axis);
            sink.set_row_acceleration(ctx.acceleration_towards(desired, omega));
            drive_bounds(sink, self.settings.power);
        }

        if ctx.advancing() {
            self.alpha = (omega - self.omega) / ctx.timestep;
            self.omega = omega;
            self.rotation = rotation;
            self.limits_suspended = suspended;
        }
    }
}
