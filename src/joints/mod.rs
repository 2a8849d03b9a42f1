//! Joint kinds and the closed payload enum that dispatches to them.
//!
//! Every kind implements [`JointBehavior`]: an optional pin adjustment run once at connect, the
//! connect/disconnect/destroy hooks, and the per-tick row submission. [`JointPayload`] holds
//! exactly one kind and forwards each hook with an exhaustive match.

pub mod ball;
pub mod context;
pub mod corkscrew;
pub mod curvy;
pub mod fixed;
pub mod hinge;
pub mod joint;
pub mod limits;
pub mod piston;
pub mod plane;
pub mod servo;
pub mod spring;

use serde::{Deserialize, Serialize};

use crate::dynamics::rows::{BodyState, ConstraintSink};
use crate::utils::math::Frame;

pub use ball::{BallAndSocketJoint, BallAndSocketSettings};
pub use context::SubmitContext;
pub use corkscrew::{CorkscrewJoint, CorkscrewSettings};
pub use curvy::{CurvySliderJoint, CurvySliderSettings};
pub use fixed::FixedJoint;
pub use hinge::{HingeJoint, HingeMode, HingeSettings};
pub use joint::{Joint, JointSettings, PinFrames, Tension};
pub use limits::{LimitBand, LimitRange};
pub use piston::{PistonJoint, PistonSettings};
pub use plane::{PlaneJoint, PlaneSettings};
pub use servo::{DriveMode, ServoJoint, ServoSettings};
pub use spring::{SpringJoint, SpringMode, SpringSettings};

/// The nine joint kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum JointKind {
    Hinge,
    Servo,
    Piston,
    Corkscrew,
    Spring,
    BallAndSocket,
    Fixed,
    Plane,
    CurvySlider,
}

impl JointKind {
    pub const ALL: [JointKind; 9] = [
        JointKind::Hinge,
        JointKind::Servo,
        JointKind::Piston,
        JointKind::Corkscrew,
        JointKind::Spring,
        JointKind::BallAndSocket,
        JointKind::Fixed,
        JointKind::Plane,
        JointKind::CurvySlider,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            JointKind::Hinge => "hinge",
            JointKind::Servo => "servo",
            JointKind::Piston => "piston",
            JointKind::Corkscrew => "corkscrew",
            JointKind::Spring => "spring",
            JointKind::BallAndSocket => "ball-and-socket",
            JointKind::Fixed => "fixed",
            JointKind::Plane => "plane",
            JointKind::CurvySlider => "curvy-slider",
        }
    }
}

/// Lifecycle hooks and row submission of one joint kind.
pub trait JointBehavior {
    const KIND: JointKind;

    /// Repositions the global pin once at connect; the default keeps it.
    fn adjust_pin_frame(&mut self, pin: &Frame, _child: &BodyState, _parent: &BodyState) -> Frame {
        *pin
    }

    fn on_connect(&mut self) {}

    /// Resets every kinematic accumulator; configuration is kept.
    fn on_disconnect(&mut self);

    fn on_destroy(&mut self) {}

    /// Emits this tick's rows. Kinematic state only advances when `ctx.advancing()`.
    fn submit<S: ConstraintSink>(&mut self, ctx: &SubmitContext, sink: &mut S);
}

/// Typed access to a kind inside a [`JointPayload`].
pub trait KindPayload: JointBehavior + Sized {
    fn from_payload(payload: &JointPayload) -> Option<&Self>;
    fn from_payload_mut(payload: &mut JointPayload) -> Option<&mut Self>;
}

/// Kind-specific state of a joint.
#[derive(Debug, Clone)]
pub enum JointPayload {
    Hinge(HingeJoint),
    Servo(ServoJoint),
    Piston(PistonJoint),
    Corkscrew(CorkscrewJoint),
    Spring(SpringJoint),
    BallAndSocket(BallAndSocketJoint),
    Fixed(FixedJoint),
    Plane(PlaneJoint),
    CurvySlider(CurvySliderJoint),
}

macro_rules! dispatch {
    ($payload:expr, $joint:ident => $body:expr) => {
        match $payload {
            JointPayload::Hinge($joint) => $body,
            JointPayload::Servo($joint) => $body,
            JointPayload::Piston($joint) => $body,
            JointPayload::Corkscrew($joint) => $body,
            JointPayload::Spring($joint) => $body,
            JointPayload::BallAndSocket($joint) => $body,
            JointPayload::Fixed($joint) => $body,
            JointPayload::Plane($joint) => $body,
            JointPayload::CurvySlider($joint) => $body,
        }
    };
}

macro_rules! kind_payload {
    ($($variant:ident => $ty:ty),* $(,)?) => {
        $(
            impl KindPayload for $ty {
                fn from_payload(payload: &JointPayload) -> Option<&Self> {
                    match payload {
                        JointPayload::$variant(joint) => Some(joint),
                        _ => None,
                    }
                }

                fn from_payload_mut(payload: &mut JointPayload) -> Option<&mut Self> {
                    match payload {
                        JointPayload::$variant(joint) => Some(joint),
                        _ => None,
                    }
                }
            }

            impl From<$ty> for JointPayload {
                fn from(joint: $ty) -> Self {
                    JointPayload::$variant(joint)
                }
            }
        )*
    };
}

kind_payload! {
    Hinge => HingeJoint,
    Servo => ServoJoint,
    Piston => PistonJoint,
    Corkscrew => CorkscrewJoint,
    Spring => SpringJoint,
    BallAndSocket => BallAndSocketJoint,
    Fixed => FixedJoint,
    Plane => PlaneJoint,
    CurvySlider => CurvySliderJoint,
}

impl From<JointKind> for JointPayload {
    /// Default configuration of `kind`.
    fn from(kind: JointKind) -> Self {
        match kind {
            JointKind::Hinge => HingeJoint::default().into(),
            JointKind::Servo => ServoJoint::default().into(),
            JointKind::Piston => PistonJoint::default().into(),
            JointKind::Corkscrew => CorkscrewJoint::default().into(),
            JointKind::Spring => SpringJoint::default().into(),
            JointKind::BallAndSocket => BallAndSocketJoint::default().into(),
            JointKind::Fixed => FixedJoint.into(),
            JointKind::Plane => PlaneJoint::default().into(),
            JointKind::CurvySlider => CurvySliderJoint::default().into(),
        }
    }
}

impl JointPayload {
    pub fn kind(&self) -> JointKind {
        match self {
            JointPayload::Hinge(_) => JointKind::Hinge,
            JointPayload::Servo(_) => JointKind::Servo,
            JointPayload::Piston(_) => JointKind::Piston,
            JointPayload::Corkscrew(_) => JointKind::Corkscrew,
            JointPayload::Spring(_) => JointKind::Spring,
            JointPayload::BallAndSocket(_) => JointKind::BallAndSocket,
            JointPayload::Fixed(_) => JointKind::Fixed,
            JointPayload::Plane(_) => JointKind::Plane,
            JointPayload::CurvySlider(_) => JointKind::CurvySlider,
        }
    }

    pub fn adjust_pin_frame(&mut self, pin: &Frame, child: &BodyState, parent: &BodyState) -> Frame {
        dispatch!(self, joint => joint.adjust_pin_frame(pin, child, parent))
    }

    pub fn on_connect(&mut self) {
        dispatch!(self, joint => joint.on_connect())
    }

    pub fn on_disconnect(&mut self) {
        dispatch!(self, joint => joint.on_disconnect())
    }

    pub fn on_destroy(&mut self) {
        dispatch!(self, joint => joint.on_destroy())
    }

    pub fn submit<S: ConstraintSink>(&mut self, ctx: &SubmitContext, sink: &mut S) {
        dispatch!(self, joint => joint.submit(ctx, sink))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_payloads_match_their_kind() {
        for kind in JointKind::ALL {
            assert_eq!(JointPayload::from(kind).kind(), kind);
        }
    }

    #[test]
    fn typed_access_rejects_other_kinds() {
        let payload = JointPayload::from(JointKind::Plane);
        assert!(PlaneJoint::from_payload(&payload).is_some());
        assert!(HingeJoint::from_payload(&payload).is_none());
    }
}
