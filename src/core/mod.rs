//! Core types: rigid bodies, their kinematic state, and curve geometry.

pub mod curve;
pub mod rigidbody;
pub mod types;

pub use curve::{Curve, CurveEdge, CurveLocation};
pub use rigidbody::RigidBody;
pub use types::{MassProperties, Transform, Velocity};
