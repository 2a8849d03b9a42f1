//! Simulation dynamics: angle tracking, constraint rows, the row solver and integration.

pub mod angular;
pub mod integrator;
pub mod rows;
pub mod solver;

pub use angular::AngularIntegration;
pub use integrator::Integrator;
pub use rows::{BodyLoad, BodySide, BodyState, ConstraintRow, ConstraintSink, JointRows, RowKind};
pub use solver::{RowBatch, RowSolver, SolverStepMetrics};
