//! Piston: a driven slide along the pin front axis with rotation locked.

use serde::{Deserialize, Serialize};

use crate::config::DEFAULT_REDUCTION_RATIO;
use crate::dynamics::rows::ConstraintSink;

use super::context::{add_axis_row, drive_bounds, lock_lateral, lock_orientation, SubmitContext};
use super::limits::LimitRange;
use super::servo::{tracking_speed, DriveMode};
use super::{JointBehavior, JointKind};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PistonSettings {
    pub mode: DriveMode,
    pub limits: LimitRange,
    /// Maximum slide speed, units/s.
    pub rate: f32,
    pub reduction_ratio: f32,
    /// Maximum force; 0 is unlimited.
    pub power: f32,
    /// Target offset (position mode) or speed (rate mode).
    pub target: f32,
}

impl Default for PistonSettings {
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
pub struct PistonJoint {
    settings: PistonSettings,
    position: f32,
    velocity: f32,
    acceleration: f32,
    limits_suspended: bool,
}

impl PistonJoint {
    pub fn new(settings: PistonSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn settings(&self) -> &PistonSettings {
        &self.settings
    }

    /// Offset of the child pin along the axis, solver length units.
    pub fn position(&self) -> f32 {
        self.position
    }

    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    pub fn acceleration(&self) -> f32 {
        self.acceleration
    }

    pub fn set_mode(&mut self, mode: DriveMode) {
        self.settings.mode = mode;
        self.limits_suspended = true;
    }

    pub fn target(&self) -> f32 {
        self.settings.target
    }

    pub fn set_target(&mut self, target: f32) {
        self.settings.target = target;
        self.limits_suspended = true;
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

    fn desired_velocity(&self, position: f32, timestep: f32) -> f32 {
        let settings = &self.settings;
        match settings.mode {
            DriveMode::Position => tracking_speed(
                settings.limits.clamp(settings.target) - position,
                settings.rate,
                settings.reduction_ratio,
                timestep,
            ),
            DriveMode::Rate => settings.target.clamp(-settings.rate, settings.rate),
        }
    }
}

impl JointBehavior for PistonJoint {
    const KIND: JointKind = JointKind::Piston;

    fn on_connect(&mut self) {
        self.limits_suspended = true;
    }

    fn on_disconnect(&mut self) {
        self.position = 0.0;
        self.velocity = 0.0;
        self.acceleration = 0.0;
    }

    fn submit<S: ConstraintSink>(&mut self, ctx: &SubmitContext, sink: &mut S) {
        lock_lateral(sink, ctx);
        lock_orientation(sink, ctx, &ctx.parent_pin);

        let axis = ctx.axis();
        let point = ctx.child_pin.origin;
        let position = ctx.offset_along(axis);
        let velocity = ctx.relative_velocity().dot(axis);

        let limits = self.settings.limits;
        let suspended = self.limits_suspended && !limits.contains(position);
        let limited =
            limits.enabled && !suspended && limits.submit_linear(sink, position, point, axis);
        if !limited {
            let desired = self.desired_velocity(position, ctx.timestep);
            add_axis_row(sink, point, axis, 0.0);
            sink.set_row_acceleration(ctx.acceleration_towards(desired, velocity));
            drive_bounds(sink, self.settings.power);
        }

        if ctx.advancing() {
            self.acceleration = (velocity - self.velocity) / ctx.timestep;
            self.velocity = velocity;
            self.position = position;
            self.limits_suspended = suspended;
        }
    }
}
