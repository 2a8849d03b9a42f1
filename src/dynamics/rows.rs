//! Constraint rows: the contract between joints and the rigid-body solver.
//!
//! A joint expresses each restriction it imposes as one scalar row. Rows are added through the
//! [`ConstraintSink`] trait; every `set_row_*` call modifies the most recently added row.
//!
//! Sign conventions: a linear row's Jacobian moves the child along `dir` and the parent against
//! it, an angular row rotates the child about `axis` and the parent against it. The row error is
//! the correction the row should apply to the child: `(point_on_parent - point_on_child) · dir`
//! for linear rows, the given `angle` for angular rows.

use glam::{Mat3, Vec3};
use serde::{Deserialize, Serialize};

use crate::config::MAX_CORRECTION_VELOCITY;
use crate::core::rigidbody::RigidBody;
use crate::core::types::Velocity;
use crate::utils::math::Frame;

/// Snapshot of one body taken before rows are built.
#[derive(Debug, Clone, Copy)]
pub struct BodyState {
    /// Center-of-mass frame in world space.
    pub frame: Frame,
    pub velocity: Velocity,
    pub inverse_mass: f32,
    /// World-space inverse inertia.
    pub inverse_inertia: Mat3,
}

impl BodyState {
    /// The immovable world.
    pub fn world() -> Self {
        Self {
            frame: Frame::IDENTITY,
            velocity: Velocity::default(),
            inverse_mass: 0.0,
            inverse_inertia: Mat3::ZERO,
        }
    }

    pub fn from_body(body: &RigidBody) -> Self {
        Self {
            frame: body.transform.to_frame(),
            velocity: body.velocity,
            inverse_mass: body.effective_inverse_mass(),
            inverse_inertia: body.world_inverse_inertia(),
        }
    }

    pub fn center_of_mass(&self) -> Vec3 {
        self.frame.origin
    }

    pub fn point_velocity(&self, point: Vec3) -> Vec3 {
        self.velocity.linear + self.velocity.angular.cross(point - self.frame.origin)
    }
}

/// One body's share of a row Jacobian.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Jacobian {
    pub linear: Vec3,
    pub angular: Vec3,
}

impl Jacobian {
    #[inline]
    pub fn dot_velocity(&self, velocity: &Velocity) -> f32 {
        self.linear.dot(velocity.linear) + self.angular.dot(velocity.angular)
    }

    /// `J M⁻¹ Jᵀ` contribution of one body.
    #[inline]
    pub fn inverse_mass_along(&self, inverse_mass: f32, inverse_inertia: &Mat3) -> f32 {
        self.linear.length_squared() * inverse_mass
            + self.angular.dot(*inverse_inertia * self.angular)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RowKind {
    Linear,
    Angular,
}

/// Spring/damper law attached to a row: `accel = -spring * x - damper * v`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RowSpring {
    pub spring: f32,
    pub damper: f32,
}

/// A single scalar constraint equation.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintRow {
    pub kind: RowKind,
    pub child: Jacobian,
    pub parent: Jacobian,
    /// Correction the row should apply to the child.
    pub error: f32,
    /// Relative velocity along the row when it was added.
    pub relative_velocity: f32,
    /// Target relative acceleration.
    pub acceleration: f32,
    pub spring: Option<RowSpring>,
    pub min_force: f32,
    pub max_force: f32,
    pub stiffness: f32,
    /// Accumulated impulse written back by the solver.
    pub impulse: f32,
}

impl ConstraintRow {
    /// Relative velocity the solver drives the row towards over one step.
    pub fn target_velocity(&self, timestep: f32) -> f32 {
        match self.spring {
            Some(RowSpring { spring, damper }) => {
                // Implicit in the displacement x = -error so stiff springs stay stable.
                let denominator = 1.0 + timestep * damper + timestep * timestep * spring;
                (self.relative_velocity + timestep * spring * self.error) / denominator
            }
            None => self.relative_velocity + self.acceleration * timestep,
        }
    }

    /// Force (linear rows) or torque (angular rows) the row applied during the last solve.
    pub fn reaction(&self, timestep: f32) -> f32 {
        if timestep > 0.0 {
            self.impulse / timestep
        } else {
            0.0
        }
    }
}

/// Which endpoint a direct load is applied to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodySide {
    Child,
    Parent,
}

/// The primitive row operations a joint uses to express its restrictions.
pub trait ConstraintSink {
    /// Locks `point_on_child` to `point_on_parent` along `dir` (world space).
    fn add_linear_row(&mut self, point_on_child: Vec3, point_on_parent: Vec3, dir: Vec3);

    /// Rotates the child by `angle` about `axis` (world space) relative to the parent.
    fn add_angular_row(&mut self, angle: f32, axis: Vec3);

    /// Overrides the target relative acceleration of the last row.
    fn set_row_acceleration(&mut self, acceleration: f32);

    /// Replaces the last row's target with a spring/damper law on its error.
    fn set_row_spring_damper(&mut self, stiffness: f32, spring: f32, damper: f32);

    /// Bounds the force (or torque) the last row may apply.
    fn set_row_friction_bounds(&mut self, min: f32, max: f32);

    fn set_row_stiffness(&mut self, stiffness: f32);

    /// Acceleration that brings the last row to rest while correcting its error.
    fn row_zero_acceleration(&self) -> f32;

    /// Applies a force/torque directly to one of the bodies, outside of any row.
    fn add_body_load(&mut self, side: BodySide, force: Vec3, torque: Vec3);

    fn row_count(&self) -> usize;
}

/// Direct force and torque produced by decoupled spring modes.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct BodyLoad {
    pub force: Vec3,
    pub torque: Vec3,
}

impl BodyLoad {
    pub fn is_zero(&self) -> bool {
        self.force == Vec3::ZERO && self.torque == Vec3::ZERO
    }
}

/// Row buffer for one joint and one sub-step; the concrete [`ConstraintSink`] of the world.
#[derive(Debug, Clone)]
pub struct JointRows {
    rows: Vec<ConstraintRow>,
    child: BodyState,
    parent: BodyState,
    timestep: f32,
    joint_stiffness: f32,
    error_reduction: f32,
    child_load: BodyLoad,
    parent_load: BodyLoad,
}

impl JointRows {
    pub fn new(
        child: BodyState,
        parent: BodyState,
        timestep: f32,
        joint_stiffness: f32,
        error_reduction: f32,
    ) -> Self {
        Self {
            rows: Vec::with_capacity(6),
            child,
            parent,
            timestep,
            joint_stiffness: joint_stiffness.clamp(0.0, 1.0),
            error_reduction,
            child_load: BodyLoad::default(),
            parent_load: BodyLoad::default(),
        }
    }

    pub fn rows(&self) -> &[ConstraintRow] {
        &self.rows
    }

    pub fn rows_mut(&mut self) -> &mut [ConstraintRow] {
        &mut self.rows
    }

    pub fn child(&self) -> &BodyState {
        &self.child
    }

    pub fn parent(&self) -> &BodyState {
        &self.parent
    }

    pub fn timestep(&self) -> f32 {
        self.timestep
    }

    pub fn child_load(&self) -> BodyLoad {
        self.child_load
    }

    pub fn parent_load(&self) -> BodyLoad {
        self.parent_load
    }

    /// Largest absolute reaction among the rows after a solve.
    pub fn max_reaction(&self) -> f32 {
        self.rows
            .iter()
            .map(|row| row.reaction(self.timestep).abs())
            .fold(0.0, f32::max)
    }

    /// Net force and torque the rows applied to the child, in world space.
    pub fn reaction_on_child(&self) -> (Vec3, Vec3) {
        let mut force = Vec3::ZERO;
        let mut torque = Vec3::ZERO;
        for row in &self.rows {
            let reaction = row.reaction(self.timestep);
            match row.kind {
                RowKind::Linear => force += row.child.linear * reaction,
                RowKind::Angular => torque += row.child.angular * reaction,
            }
        }
        (force, torque)
    }

    fn push(&mut self, kind: RowKind, child: Jacobian, parent: Jacobian, error: f32) {
        let relative_velocity =
            child.dot_velocity(&self.child.velocity) + parent.dot_velocity(&self.parent.velocity);
        let mut row = ConstraintRow {
            kind,
            child,
            parent,
            error,
            relative_velocity,
            acceleration: 0.0,
            spring: None,
            min_force: f32::NEG_INFINITY,
            max_force: f32::INFINITY,
            stiffness: self.joint_stiffness,
            impulse: 0.0,
        };
        row.acceleration = self.zero_acceleration_for(&row);
        self.rows.push(row);
    }

    fn zero_acceleration_for(&self, row: &ConstraintRow) -> f32 {
        if self.timestep <= 0.0 {
            return 0.0;
        }
        let correction = (row.error * self.error_reduction / self.timestep)
            .clamp(-MAX_CORRECTION_VELOCITY, MAX_CORRECTION_VELOCITY);
        (correction - row.relative_velocity) / self.timestep
    }
}

impl ConstraintSink for JointRows {
    fn add_linear_row(&mut self, point_on_child: Vec3, point_on_parent: Vec3, dir: Vec3) {
        let dir = dir.normalize_or_zero();
        let r_child = point_on_child - self.child.center_of_mass();
        let r_parent = point_on_parent - self.parent.center_of_mass();
        let child = Jacobian {
            linear: dir,
            angular: r_child.cross(dir),
        };
        let parent = Jacobian {
            linear: -dir,
            angular: -r_parent.cross(dir),
        };
        let error = (point_on_parent - point_on_child).dot(dir);
        self.push(RowKind::Linear, child, parent, error);
    }

    fn add_angular_row(&mut self, angle: f32, axis: Vec3) {
        let axis = axis.normalize_or_zero();
        let child = Jacobian {
            linear: Vec3::ZERO,
            angular: axis,
        };
        let parent = Jacobian {
            linear: Vec3::ZERO,
            angular: -axis,
        };
        self.push(RowKind::Angular, child, parent, angle);
    }

    fn set_row_acceleration(&mut self, acceleration: f32) {
        if let Some(row) = self.rows.last_mut() {
            row.acceleration = acceleration;
            row.spring = None;
        }
    }

    fn set_row_spring_damper(&mut self, stiffness: f32, spring: f32, damper: f32) {
        let joint_stiffness = self.joint_stiffness;
        if let Some(row) = self.rows.last_mut() {
            row.spring = Some(RowSpring {
                spring: spring.max(0.0),
                damper: damper.max(0.0),
            });
            row.stiffness = stiffness.clamp(0.0, 1.0).min(joint_stiffness);
        }
    }

    fn set_row_friction_bounds(&mut self, min: f32, max: f32) {
        if let Some(row) = self.rows.last_mut() {
            row.min_force = min.min(max);
            row.max_force = max.max(min);
        }
    }

    fn set_row_stiffness(&mut self, stiffness: f32) {
        let joint_stiffness = self.joint_stiffness;
        if let Some(row) = self.rows.last_mut() {
            row.stiffness = stiffness.clamp(0.0, 1.0).min(joint_stiffness);
        }
    }

    fn row_zero_acceleration(&self) -> f32 {
        self.rows
            .last()
            .map(|row| self.zero_acceleration_for(row))
            .unwrap_or(0.0)
    }

    fn add_body_load(&mut self, side: BodySide, force: Vec3, torque: Vec3) {
        let load = match side {
            BodySide::Child => &mut self.child_load,
            BodySide::Parent => &mut self.parent_load,
        };
        load.force += force;
        load.torque += torque;
    }

    fn row_count(&self) -> usize {
        self.rows.len()
    }
}
