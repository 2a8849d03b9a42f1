//! Fixed: welds the child to the parent.

use crate::dynamics::rows::ConstraintSink;

use super::context::{lock_orientation, lock_point, SubmitContext};
use super::{JointBehavior, JointKind};

/// All six degrees of freedom locked; no configuration.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FixedJoint;

impl JointBehavior for FixedJoint {
    const KIND: JointKind = JointKind::Fixed;

    fn on_disconnect(&mut self) {}

    fn submit<S: ConstraintSink>(&mut self, ctx: &SubmitContext, sink: &mut S) {
        lock_point(sink, ctx);
        lock_orientation(sink, ctx, &ctx.parent_pin);
    }
}
