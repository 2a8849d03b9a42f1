//! Range limits shared by every limited degree of freedom.

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::config::LIMIT_EPSILON;
use crate::dynamics::rows::ConstraintSink;

use super::context::add_axis_row;

/// How a limit pair is interpreted once resolved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LimitBand {
    /// Free inside `[min, max]`.
    Range { min: f32, max: f32 },
    /// The degree of freedom is held at a single value.
    Pinned(f32),
}

/// A `[min, max]` range on one degree of freedom (radians or solver length units).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitRange {
    pub enabled: bool,
    pub min: f32,
    pub max: f32,
}

impl Default for LimitRange {
    fn default() -> Self {
        Self {
            enabled: false,
            min: -1.0,
            max: 1.0,
        }
    }
}

impl LimitRange {
    pub fn new(min: f32, max: f32) -> Self {
        Self {
            enabled: true,
            min,
            max,
        }
    }

    /// Inverted pairs collapse to their midpoint and very narrow ranges to `max`.
    pub fn band(&self) -> LimitBand {
        if self.min > self.max {
            LimitBand::Pinned(0.5 * (self.min + self.max))
        } else if self.max - self.min < LIMIT_EPSILON {
            LimitBand::Pinned(self.max)
        } else {
            LimitBand::Range {
                min: self.min,
                max: self.max,
            }
        }
    }

    /// True when disabled or when `value` lies inside the resolved band.
    pub fn contains(&self, value: f32) -> bool {
        if !self.enabled {
            return true;
        }
        match self.band() {
            LimitBand::Range { min, max } => value >= min && value <= max,
            LimitBand::Pinned(target) => (value - target).abs() <= LIMIT_EPSILON,
        }
    }

    /// Correction needed to bring `value` back inside, with the sign of the allowed force.
    fn violation(&self, value: f32) -> Option<(f32, f32, f32)> {
        if !self.enabled {
            return None;
        }
        match self.band() {
            LimitBand::Pinned(target) => Some((target - value, f32::NEG_INFINITY, f32::INFINITY)),
            LimitBand::Range { min, .. } if value < min => Some((min - value, 0.0, f32::INFINITY)),
            LimitBand::Range { max, .. } if value > max => {
                Some((max - value, f32::NEG_INFINITY, 0.0))
            }
            LimitBand::Range { .. } => None,
        }
    }

    /// Emits a one-sided angular row when the angle left the range. Returns whether a row was added.
    pub fn submit_angular<S: ConstraintSink>(&self, sink: &mut S, angle: f32, axis: Vec3) -> bool {
        match self.violation(angle) {
            Some((correction, min, max)) => {
                sink.add_angular_row(correction, axis);
                sink.set_row_friction_bounds(min, max);
                true
            }
            None => false,
        }
    }

    /// Linear counterpart of [`LimitRange::submit_angular`]; `point` is the child's anchor.
    pub fn submit_linear<S: ConstraintSink>(
        &self,
        sink: &mut S,
        position: f32,
        point: Vec3,
        axis: Vec3,
    ) -> bool {
        match self.violation(position) {
            Some((correction, min, max)) => {
                add_axis_row(sink, point, axis, correction);
                sink.set_row_friction_bounds(min, max);
                true
            }
            None => false,
        }
    }

    /// Clamps `value` into the resolved band; identity when disabled.
    pub fn clamp(&self, value: f32) -> f32 {
        if !self.enabled {
            return value;
        }
        match self.band() {
            LimitBand::Range { min, max } => value.clamp(min, max),
            LimitBand::Pinned(target) => target,
        }
    }
}
