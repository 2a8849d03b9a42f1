//! Error types for the joint layer.

use thiserror::Error;

use crate::joints::JointKind;

/// Errors surfaced by joint, body and curve operations.
///
/// Every variant aborts only the operation that produced it; the world stays usable.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum JointError {
    /// The handle refers to a destroyed or never-created joint or body.
    #[error("invalid handle")]
    InvalidHandle,

    /// A kind-specific accessor was called on a joint of another kind.
    #[error("joint kind mismatch: expected {expected:?}, found {found:?}")]
    TypeMismatch {
        /// Kind the accessor works on.
        expected: JointKind,
        /// Kind the joint actually has.
        found: JointKind,
    },

    /// The operation is not allowed in the joint's current state.
    #[error("invalid operation: {0}")]
    InvalidOperation(&'static str),

    /// The curve has too few usable points to answer the query.
    #[error("degenerate geometry: {0}")]
    DegenerateGeometry(&'static str),
}

/// Convenient Result alias for joint operations.
pub type Result<T> = std::result::Result<T, JointError>;
