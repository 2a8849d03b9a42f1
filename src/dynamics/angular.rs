//! Continuous angle tracking across the ±π discontinuity of `atan2`.

use serde::{Deserialize, Serialize};
use std::ops::{Add, Sub};

/// Accumulates an unbounded angle from successive (cos, sin) samples.
///
/// Every update adds the smallest rotation consistent with the previous sample, so the stored
/// angle differs from the geometric wrapped angle by a whole number of turns.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AngularIntegration {
    angle: f32,
    sin_angle: f32,
    cos_angle: f32,
}

impl Default for AngularIntegration {
    fn default() -> Self {
        Self::new(0.0)
    }
}

impl AngularIntegration {
    pub fn new(angle: f32) -> Self {
        let (sin_angle, cos_angle) = angle.sin_cos();
        Self {
            angle,
            sin_angle,
            cos_angle,
        }
    }

    #[inline]
    pub fn angle(&self) -> f32 {
        self.angle
    }

    /// Forces the accumulated angle, e.g. when a joint resumes from a known pose.
    pub fn set_angle(&mut self, angle: f32) {
        *self = Self::new(angle);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// Feeds the cosine and sine of the new absolute direction and returns the unbounded angle.
    pub fn update(&mut self, cos_angle: f32, sin_angle: f32) -> f32 {
        let sin_delta = sin_angle * self.cos_angle - cos_angle * self.sin_angle;
        let cos_delta = cos_angle * self.cos_angle + sin_angle * self.sin_angle;
        self.angle += sin_delta.atan2(cos_delta);
        self.cos_angle = cos_angle;
        self.sin_angle = sin_angle;
        self.angle
    }

    /// Convenience form of [`AngularIntegration::update`] taking a raw (possibly wrapped) angle.
    pub fn update_angle(&mut self, angle: f32) -> f32 {
        let (sin_angle, cos_angle) = angle.sin_cos();
        self.update(cos_angle, sin_angle)
    }

    /// Smallest signed rotation that carries `other`'s direction onto this one.
    fn delta_from(&self, other: &AngularIntegration) -> f32 {
        let sin_delta = self.sin_angle * other.cos_angle - self.cos_angle * other.sin_angle;
        let cos_delta = self.cos_angle * other.cos_angle + self.sin_angle * other.sin_angle;
        sin_delta.atan2(cos_delta)
    }
}

impl Add for AngularIntegration {
    type Output = AngularIntegration;

    /// Offsets `self` by `rhs`'s angle; the direction is composed by angle addition formulas.
    fn add(self, rhs: AngularIntegration) -> AngularIntegration {
        let sin_angle = self.sin_angle * rhs.cos_angle + self.cos_angle * rhs.sin_angle;
        let cos_angle = self.cos_angle * rhs.cos_angle - self.sin_angle * rhs.sin_angle;
        AngularIntegration {
            angle: self.angle + rhs.angle,
            sin_angle,
            cos_angle,
        }
    }
}

impl Sub for AngularIntegration {
    type Output = AngularIntegration;

    /// Difference of two tracked angles: the wrapped delta between their current directions added
    /// onto `rhs`'s whole-turn offset relative to `self`.
    fn sub(self, rhs: AngularIntegration) -> AngularIntegration {
        let delta = self.delta_from(&rhs);
        let turns = ((self.angle - rhs.angle - delta) / std::f32::consts::TAU).round();
        let (sin_angle, cos_angle) = delta.sin_cos();
        AngularIntegration {
            angle: delta + turns * std::f32::consts::TAU,
            sin_angle,
            cos_angle,
        }
    }
}
