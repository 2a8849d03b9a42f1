//! Global configuration constants and world settings for the joint layer.

use serde::{Deserialize, Serialize};

/// Default gravity vector applied in the physics world (Y-up).
pub const DEFAULT_GRAVITY: [f32; 3] = [0.0, -9.81, 0.0];

/// Default integration timestep (in seconds).
pub const DEFAULT_TIME_STEP: f32 = 1.0 / 60.0;

/// Number of sequential-impulse iterations performed per sub-step.
pub const DEFAULT_SOLVER_ITERATIONS: u32 = 8;

/// Default damping applied to linear velocity.
pub const DEFAULT_LINEAR_DAMPING: f32 = 0.0;

/// Default damping applied to angular velocity.
pub const DEFAULT_ANGULAR_DAMPING: f32 = 0.0;

/// Default joint row stiffness (1 = rigid).
pub const DEFAULT_JOINT_STIFFNESS: f32 = 1.0;

/// Default extra solver passes requested by a joint.
pub const DEFAULT_SOLVER_HINT: u32 = 2;

/// Fraction of a locked row's position error corrected per sub-step.
pub const DEFAULT_ERROR_REDUCTION: f32 = 0.3;

/// Upper bound on the corrective velocity a locked row may request (units/s or rad/s).
pub const MAX_CORRECTION_VELOCITY: f32 = 20.0;

/// How strongly a stiffness below 1 softens a row.
pub const ROW_REGULARIZATION: f32 = 4.0;

/// Limit ranges narrower than this collapse to the upper limit.
pub const LIMIT_EPSILON: f32 = 1.0e-4;

/// Cone angles below this collapse the ball-and-socket cone rows into a hinge pair.
pub const MIN_CONE_ANGLE: f32 = 1.0e-3;

/// Curve edges shorter than this are dropped during rebuild.
pub const MIN_EDGE_LENGTH: f32 = 1.0e-5;

/// Default reduction ratio of servo and piston controllers.
pub const DEFAULT_REDUCTION_RATIO: f32 = 0.125;

/// Tunable world-level settings; every field falls back to the constants above.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldSettings {
    pub time_step: f32,
    pub solver_iterations: u32,
    pub gravity: [f32; 3],
    pub error_reduction: f32,
    /// Host display units per solver length unit.
    pub length_scale: f32,
    /// Collect joint rows and integrate bodies on the rayon pool. Defaults to on when the
    /// `parallel` feature is compiled in, and is forced off without it.
    pub parallel: bool,
}

impl Default for WorldSettings {
    fn default() -> Self {
        Self {
            time_step: DEFAULT_TIME_STEP,
            solver_iterations: DEFAULT_SOLVER_ITERATIONS,
            gravity: DEFAULT_GRAVITY,
            error_reduction: DEFAULT_ERROR_REDUCTION,
            length_scale: 1.0,
            parallel: cfg!(feature = "parallel"),
        }
    }
}

impl WorldSettings {
    pub fn with_time_step(mut self, time_step: f32) -> Self {
        self.time_step = time_step;
        self
    }

    pub fn with_gravity(mut self, gravity: [f32; 3]) -> Self {
        self.gravity = gravity;
        self
    }

    pub fn with_solver_iterations(mut self, iterations: u32) -> Self {
        self.solver_iterations = iterations.max(1);
        self
    }

    pub fn with_length_scale(mut self, scale: f32) -> Self {
        self.length_scale = scale;
        self
    }

    pub fn with_parallel(mut self, enabled: bool) -> Self {
        self.parallel = enabled;
        self
    }

    /// Replaces out-of-range values with defaults.
    pub fn sanitized(mut self) -> Self {
        if !(self.time_step > 0.0) {
            self.time_step = DEFAULT_TIME_STEP;
        }
        if self.solver_iterations == 0 {
            self.solver_iterations = DEFAULT_SOLVER_ITERATIONS;
        }
        if !(self.error_reduction > 0.0 && self.error_reduction <= 1.0) {
            self.error_reduction = DEFAULT_ERROR_REDUCTION;
        }
        if !(self.length_scale > 0.0) {
            self.length_scale = 1.0;
        }
        self.parallel &= cfg!(feature = "parallel");
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_restores_defaults() {
        let settings = WorldSettings {
            time_step: -1.0,
            solver_iterations: 0,
            error_reduction: 3.0,
            length_scale: 0.0,
            ..WorldSettings::default()
        }
        .sanitized();
        assert_eq!(settings.time_step, DEFAULT_TIME_STEP);
        assert_eq!(settings.solver_iterations, DEFAULT_SOLVER_ITERATIONS);
        assert_eq!(settings.error_reduction, DEFAULT_ERROR_REDUCTION);
        assert_eq!(settings.length_scale, 1.0);
    }

    #[test]
    fn parallel_default_follows_the_feature() {
        assert_eq!(WorldSettings::default().parallel, cfg!(feature = "parallel"));
        let forced = WorldSettings::default().with_parallel(true).sanitized();
        assert_eq!(forced.parallel, cfg!(feature = "parallel"));
    }
}
