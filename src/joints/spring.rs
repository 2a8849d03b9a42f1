//! Linear spring along the pin front axis.
//!
//! With rotation unlocked the child also spins freely about that axis, and the joint keeps a
//! continuous angle for it.

use serde::{Deserialize, Serialize};

use crate::dynamics::angular::AngularIntegration;
use crate::dynamics::rows::{BodySide, ConstraintSink};

use super::context::{add_axis_row, lock_alignment, lock_lateral, lock_orientation, SubmitContext};
use super::limits::LimitRange;
use super::{JointBehavior, JointKind};

/// Where the spring law is evaluated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SpringMode {
    /// As the acceleration law of a solver row.
    #[default]
    Coupled,
    /// As a force applied straight to both bodies.
    Decoupled,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpringSettings {
    pub mode: SpringMode,
    pub spring: f32,
    pub damper: f32,
    /// Offset along the axis at which the spring is relaxed.
    pub rest_length: f32,
    /// Stiffness of the spring row in coupled mode.
    pub row_stiffness: f32,
    pub limits: LimitRange,
    pub rotation_locked: bool,
}

impl Default for SpringSettings {
    fn default() -> Self {
        Self {
            mode: SpringMode::Coupled,
            spring: 100.0,
            damper: 1.0,
            rest_length: 0.0,
            row_stiffness: 1.0,
            limits: LimitRange::default(),
            rotation_locked: true,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SpringJoint {
    settings: SpringSettings,
    rotation: AngularIntegration,
    omega: f32,
    position: f32,
    velocity: f32,
    acceleration: f32,
}

impl SpringJoint {
    pub fn new(settings: SpringSettings) -> Self {
        Self {
            settings,
            ..Self::default()
        }
    }

    pub fn settings(&self) -> &SpringSettings {
        &self.settings
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

    /// Accumulated rotation about the axis; stays at zero while rotation is locked.
    pub fn angle(&self) -> f32 {
        self.rotation.angle()
    }

    pub fn omega(&self) -> f32 {
        self.omega
    }

    pub fn set_mode(&mut self, mode: SpringMode) {
        self.settings.mode = mode;
    }

    pub fn set_spring(&mut self, spring: f32, damper: f32) {
        self.settings.spring = spring.max(0.0);
        self.settings.damper = damper.max(0.0);
    }

    pub fn set_rest_length(&mut self, rest_length: f32) {
        self.settings.rest_length = rest_length;
    }

    pub fn set_limits(&mut self, min: f32, max: f32, enabled: bool) {
        self.settings.limits = LimitRange { enabled, min, max };
    }

    pub fn set_rotation_locked(&mut self, locked: bool) {
        self.settings.rotation_locked = locked;
    }

    /// Spring force along the axis on the child at `position` moving at `velocity`.
    pub fn force_at(&self, position: f32, velocity: f32) -> f32 {
        -self.settings.spring * (position - self.settings.rest_length)
            - self.settings.damper * velocity
    }
}

impl JointBehavior for SpringJoint {
    const KIND: JointKind = JointKind::Spring;

    fn on_disconnect(&mut self) {
        self.rotation.reset();
        self.omega = 0.0;
        self.position = 0.0;
        self.velocity = 0.0;
        self.acceleration = 0.0;
    }

    fn submit<S: ConstraintSink>(&mut self, ctx: &SubmitContext, sink: &mut S) {
        lock_lateral(sink, ctx);
        if self.settings.rotation_locked {
            lock_orientation(sink, ctx, &ctx.parent_pin);
        } else {
            lock_alignment(sink, ctx, ctx.axis());
        }

        let axis = ctx.axis();
        let point = ctx.child_pin.origin;
        let position = ctx.offset_along(axis);
        let velocity = ctx.relative_velocity().dot(axis);

        let settings = self.settings;
        if !settings.limits.submit_linear(sink, position, point, axis) {
            match settings.mode {
                SpringMode::Coupled => {
                    add_axis_row(sink, point, axis, settings.rest_length - position);
                    sink.set_row_spring_damper(
                        settings.row_stiffness,
                        settings.spring,
                        settings.damper,
                    );
                }
                SpringMode::Decoupled => {
                    let force = axis * self.force_at(position, velocity);
                    let child_arm = point - ctx.child.center_of_mass();
                    let parent_arm = point - ctx.parent.center_of_mass();
                    sink.add_body_load(BodySide::Child, force, child_arm.cross(force));
                    sink.add_body_load(BodySide::Parent, -force, parent_arm.cross(-force));
                }
            }
        }

        if ctx.advancing() {
            self.acceleration = (velocity - self.velocity) / ctx.timestep;
            self.velocity = velocity;
            self.position = position;
            if !settings.rotation_locked {
                let (cos, sin) = ctx.axis_rotation();
                self.rotation.update(cos, sin);
                self.omega = ctx.relative_omega().dot(axis);
            }
        }
    }
}
