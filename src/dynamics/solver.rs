use crate::{
    config::ROW_REGULARIZATION,
    core::rigidbody::RigidBody,
    dynamics::rows::{BodyState, ConstraintRow, JointRows},
    utils::allocator::{Arena, BodyHandle, JointHandle},
};

/// Rows submitted by one joint, together with the bodies they act on.
#[derive(Debug, Clone)]
pub struct RowBatch {
    pub joint: JointHandle,
    pub child: BodyHandle,
    /// `None` means the world.
    pub parent: Option<BodyHandle>,
    pub rows: JointRows,
    /// Passes over this batch per solver iteration (the joint's solver hint).
    pub passes: u32,
}

impl RowBatch {
    pub fn row_count(&self) -> usize {
        self.rows.rows().len()
    }
}

#[derive(Debug, Default, Clone)]
pub struct SolverStepMetrics {
    pub joints_solved: usize,
    pub rows_solved: usize,
    pub impulse_sum: f32,
}

impl SolverStepMetrics {
    pub fn record_batch(&mut self, batch: &RowBatch) {
        self.joints_solved += 1;
        self.rows_solved += batch.row_count();
        self.impulse_sum += batch
            .rows
            .rows()
            .iter()
            .map(|row| row.impulse.abs())
            .sum::<f32>();
    }
}

/// Per-row values fixed for the duration of one solve.
#[derive(Debug, Clone, Copy)]
struct PreparedRow {
    target_velocity: f32,
    effective_mass: f32,
    softness: f32,
    min_impulse: f32,
    max_impulse: f32,
}

impl PreparedRow {
    fn new(row: &ConstraintRow, child: &BodyState, parent: &BodyState, dt: f32) -> Self {
        let k = row
            .child
            .inverse_mass_along(child.inverse_mass, &child.inverse_inertia)
            + row
                .parent
                .inverse_mass_along(parent.inverse_mass, &parent.inverse_inertia);
        let softness = (1.0 - row.stiffness).max(0.0) * ROW_REGULARIZATION * k;
        let effective_mass = if k > 1.0e-9 { 1.0 / (k + softness) } else { 0.0 };
        Self {
            target_velocity: row.target_velocity(dt),
            effective_mass,
            softness,
            min_impulse: row.min_force * dt,
            max_impulse: row.max_force * dt,
        }
    }
}

/// Projected Gauss-Seidel solver over joint rows (sequential impulses).
#[derive(Debug, Clone)]
pub struct RowSolver {
    pub iterations: u32,
}

impl Default for RowSolver {
    fn default() -> Self {
        Self::new(crate::config::DEFAULT_SOLVER_ITERATIONS)
    }
}

impl RowSolver {
    pub fn new(iterations: u32) -> Self {
        Self {
            iterations: iterations.max(1),
        }
    }

    /// Solves every batch, updating body velocities and writing accumulated row impulses.
    pub fn solve(
        &self,
        bodies: &mut Arena<BodyHandle, RigidBody>,
        batches: &mut [RowBatch],
        dt: f32,
    ) -> SolverStepMetrics {
        let mut metrics = SolverStepMetrics::default();
        if dt <= 0.0 {
            return metrics;
        }

        let prepared: Vec<Vec<PreparedRow>> = batches
            .iter()
            .map(|batch| {
                let child = batch.rows.child();
                let parent = batch.rows.parent();
                batch
                    .rows
                    .rows()
                    .iter()
                    .map(|row| PreparedRow::new(row, child, parent, dt))
                    .collect()
            })
            .collect();

        for batch in batches.iter_mut() {
            for row in batch.rows.rows_mut() {
                row.impulse = 0.0;
            }
        }

        for _ in 0..self.iterations {
            for (batch, prepared_rows) in batches.iter_mut().zip(&prepared) {
                Self::solve_batch(bodies, batch, prepared_rows);
            }
        }

        for batch in batches.iter() {
            metrics.record_batch(batch);
        }
        metrics
    }

    fn solve_batch(
        bodies: &mut Arena<BodyHandle, RigidBody>,
        batch: &mut RowBatch,
        prepared: &[PreparedRow],
    ) {
        let child_state = *batch.rows.child();
        let parent_state = *batch.rows.parent();
        let (mut child, mut parent) = body_pair_mut(bodies, batch.child, batch.parent);

        for _ in 0..batch.passes.max(1) {
            for (row, prep) in batch.rows.rows_mut().iter_mut().zip(prepared) {
                if prep.effective_mass == 0.0 {
                    continue;
                }
                let mut jv = 0.0;
                if let Some(body) = child.as_deref() {
                    jv += row.child.dot_velocity(&body.velocity);
                }
                if let Some(body) = parent.as_deref() {
                    jv += row.parent.dot_velocity(&body.velocity);
                }

                let delta =
                    (prep.target_velocity - jv - prep.softness * row.impulse) * prep.effective_mass;
                let previous = row.impulse;
                row.impulse = (previous + delta).clamp(prep.min_impulse, prep.max_impulse);
                let applied = row.impulse - previous;
                if applied == 0.0 {
                    continue;
                }

                if let Some(body) = child.as_deref_mut() {
                    body.velocity.linear += row.child.linear * (child_state.inverse_mass * applied);
                    body.velocity.angular += child_state.inverse_inertia * row.child.angular * applied;
                }
                if let Some(body) = parent.as_deref_mut() {
                    body.velocity.linear +=
                        row.parent.linear * (parent_state.inverse_mass * applied);
                    body.velocity.angular +=
                        parent_state.inverse_inertia * row.parent.angular * applied;
                }
            }
        }
    }
}

/// Mutable access to a joint's bodies; a missing or world parent yields `None`.
fn body_pair_mut(
    bodies: &mut Arena<BodyHandle, RigidBody>,
    child: BodyHandle,
    parent: Option<BodyHandle>,
) -> (Option<&mut RigidBody>, Option<&mut RigidBody>) {
    let parent = parent.filter(|handle| *handle != child && bodies.contains(*handle));
    match parent {
        Some(parent) => match bodies.get2_mut(child, parent) {
            Some((child, parent)) => (Some(child), Some(parent)),
            None => (None, None),
        },
        None => (bodies.get_mut(child), None),
    }
}
