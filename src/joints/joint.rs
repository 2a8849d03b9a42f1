//! The joint entity: endpoints, pin frames, policy and connection lifecycle.

use glam::Vec3;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::config::{DEFAULT_JOINT_STIFFNESS, DEFAULT_SOLVER_HINT};
use crate::dynamics::rows::{BodyState, ConstraintSink};
use crate::error::{JointError, Result};
use crate::utils::allocator::BodyHandle;
use crate::utils::math::Frame;

use super::context::SubmitContext;
use super::{JointKind, JointPayload, KindPayload};

/// Per-joint policy fixed at creation and adjustable afterwards.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JointSettings {
    /// Row stiffness in `[0, 1]`; 1 is rigid.
    pub stiffness: f32,
    /// Extra solver passes over this joint's rows per iteration.
    pub solver_hint: u32,
    /// Whether the two bodies may still collide with each other.
    pub collidable: bool,
    /// Row reaction at which the joint breaks; 0 never breaks.
    pub breaking_force: f32,
}

impl Default for JointSettings {
    fn default() -> Self {
        Self {
            stiffness: DEFAULT_JOINT_STIFFNESS,
            solver_hint: DEFAULT_SOLVER_HINT,
            collidable: false,
            breaking_force: 0.0,
        }
    }
}

impl JointSettings {
    pub fn with_stiffness(mut self, stiffness: f32) -> Self {
        self.stiffness = stiffness.clamp(0.0, 1.0);
        self
    }

    pub fn with_breaking_force(mut self, force: f32) -> Self {
        self.breaking_force = force.max(0.0);
        self
    }

    pub fn with_collidable(mut self, collidable: bool) -> Self {
        self.collidable = collidable;
        self
    }

    pub fn with_solver_hint(mut self, hint: u32) -> Self {
        self.solver_hint = hint;
        self
    }
}

/// Pin frames derived at connect time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PinFrames {
    /// Pin relative to the child body.
    pub child: Frame,
    /// Pin relative to the parent body (or world), after the kind's adjustment.
    pub parent: Frame,
    /// Pin relative to the parent body (or world) as configured.
    pub parent_unadjusted: Frame,
}

/// Last reaction of the joint on its child, expressed in the parent's frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Tension {
    pub force: Vec3,
    pub torque: Vec3,
}

impl Tension {
    /// Force and torque the joint applies to the child.
    pub fn on_child(&self) -> (Vec3, Vec3) {
        (self.force, self.torque)
    }

    /// Force and torque the joint applies to the parent.
    pub fn on_parent(&self) -> (Vec3, Vec3) {
        (-self.force, -self.torque)
    }
}

/// A coupling between a child body and a parent body (or the world).
#[derive(Debug, Clone)]
pub struct Joint {
    parent: Option<BodyHandle>,
    child: Option<BodyHandle>,
    pin: Frame,
    settings: JointSettings,
    connected: bool,
    frames: Option<PinFrames>,
    tension: Tension,
    payload: Option<JointPayload>,
}

impl Joint {
    /// A detached joint without a kind. `pin` is relative to `parent`, or the world when `None`.
    pub fn new(parent: Option<BodyHandle>, pin: Frame, settings: JointSettings) -> Self {
        Self {
            parent,
            child: None,
            pin,
            settings,
            connected: false,
            frames: None,
            tension: Tension::default(),
            payload: None,
        }
    }

    pub fn with_payload(mut self, payload: impl Into<JointPayload>) -> Self {
        self.payload = Some(payload.into());
        self
    }

    /// Assigns the joint's kind. A kind can be assigned once.
    pub fn assign_kind(&mut self, payload: impl Into<JointPayload>) -> Result<()> {
        if self.payload.is_some() {
            return Err(JointError::InvalidOperation("joint kind already assigned"));
        }
        self.payload = Some(payload.into());
        Ok(())
    }

    pub fn kind(&self) -> Option<JointKind> {
        self.payload.as_ref().map(JointPayload::kind)
    }

    pub fn parent(&self) -> Option<BodyHandle> {
        self.parent
    }

    pub fn child(&self) -> Option<BodyHandle> {
        self.child
    }

    pub fn pin_frame(&self) -> &Frame {
        &self.pin
    }

    /// Replaces the configured pin; derived frames pick it up on the next connect.
    pub fn set_pin_frame(&mut self, pin: Frame) {
        self.pin = pin;
    }

    pub fn settings(&self) -> &JointSettings {
        &self.settings
    }

    pub fn settings_mut(&mut self) -> &mut JointSettings {
        &mut self.settings
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn frames(&self) -> Option<&PinFrames> {
        self.frames.as_ref()
    }

    pub fn tension(&self) -> Tension {
        self.tension
    }

    /// Last reaction (force, torque) in the parent's frame.
    pub fn reaction(&self) -> (Vec3, Vec3) {
        self.tension.on_child()
    }

    pub fn payload(&self) -> Option<&JointPayload> {
        self.payload.as_ref()
    }

    /// Typed view of the kind payload.
    pub fn kind_ref<T: KindPayload>(&self) -> Result<&T> {
        let payload = self
            .payload
            .as_ref()
            .ok_or(JointError::InvalidOperation("joint kind not assigned"))?;
        T::from_payload(payload).ok_or(JointError::TypeMismatch {
            expected: T::KIND,
            found: payload.kind(),
        })
    }

    pub fn kind_mut<T: KindPayload>(&mut self) -> Result<&mut T> {
        let payload = self
            .payload
            .as_mut()
            .ok_or(JointError::InvalidOperation("joint kind not assigned"))?;
        let found = payload.kind();
        T::from_payload_mut(payload).ok_or(JointError::TypeMismatch {
            expected: T::KIND,
            found,
        })
    }

    /// Drops the parent reference when the parent body no longer exists.
    pub(crate) fn resolve_parent(&mut self, alive: impl Fn(BodyHandle) -> bool) -> Option<BodyHandle> {
        if let Some(parent) = self.parent {
            if !alive(parent) {
                debug!("parent {parent:?} destroyed; joint now attached to the world");
                self.parent = None;
            }
        }
        self.parent
    }

    /// Attaches `child`. The parent must already be resolved and `parent_state` describe it.
    pub(crate) fn connect(
        &mut self,
        child: BodyHandle,
        child_state: &BodyState,
        parent_state: &BodyState,
    ) -> Result<bool> {
        if self.connected {
            return Ok(false);
        }
        if self.parent == Some(child) {
            return Err(JointError::InvalidOperation(
                "child and parent must be different bodies",
            ));
        }
        let payload = self
            .payload
            .as_mut()
            .ok_or(JointError::InvalidOperation("joint kind not assigned"))?;

        let global_pin = self.pin.to_global(&parent_state.frame);
        let adjusted = payload.adjust_pin_frame(&global_pin, child_state, parent_state);
        self.frames = Some(PinFrames {
            child: adjusted.to_local(&child_state.frame),
            parent: adjusted.to_local(&parent_state.frame),
            parent_unadjusted: self.pin,
        });
        payload.on_connect();

        self.child = Some(child);
        self.connected = true;
        self.tension = Tension::default();
        debug!("{:?} joint connected to child {child:?}", payload.kind());
        Ok(true)
    }

    pub(crate) fn disconnect(&mut self) -> bool {
        if !self.connected {
            return false;
        }
        if let Some(payload) = self.payload.as_mut() {
            payload.on_disconnect();
        }
        self.connected = false;
        self.frames = None;
        self.child = None;
        self.tension = Tension::default();
        debug!("joint disconnected");
        true
    }

    pub(crate) fn destroy(&mut self) {
        self.disconnect();
        if let Some(payload) = self.payload.as_mut() {
            payload.on_destroy();
        }
    }

    /// Builds this joint's rows. Returns `false` when the joint is not connected.
    pub fn submit<S: ConstraintSink>(
        &mut self,
        child_state: &BodyState,
        parent_state: &BodyState,
        timestep: f32,
        sink: &mut S,
    ) -> bool {
        let (Some(frames), Some(payload)) = (self.frames.as_ref(), self.payload.as_mut()) else {
            return false;
        };
        if !self.connected {
            return false;
        }
        let ctx = SubmitContext::new(*child_state, *parent_state, frames, timestep);
        payload.submit(&ctx, sink);
        true
    }

    pub(crate) fn record_tension(&mut self, tension: Tension) {
        self.tension = tension;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rigidbody::RigidBody;
    use crate::joints::{FixedJoint, HingeJoint};
    use crate::utils::allocator::{ArenaHandle, GenerationalId};

    fn body_handle(index: usize) -> BodyHandle {
        BodyHandle::from_id(GenerationalId::new(index, 0))
    }

    #[test]
    fn kind_is_assigned_once() {
        let mut joint = Joint::new(None, Frame::IDENTITY, JointSettings::default());
        assert_eq!(joint.kind(), None);
        joint.assign_kind(HingeJoint::default()).unwrap();
        assert_eq!(
            joint.assign_kind(FixedJoint::default()),
            Err(JointError::InvalidOperation("joint kind already assigned"))
        );
        assert_eq!(joint.kind(), Some(JointKind::Hinge));
    }

    #[test]
    fn wrong_kind_accessor_is_a_type_mismatch() {
        let joint = Joint::new(None, Frame::IDENTITY, JointSettings::default())
            .with_payload(FixedJoint::default());
        assert_eq!(
            joint.kind_ref::<HingeJoint>().err(),
            Some(JointError::TypeMismatch {
                expected: JointKind::Hinge,
                found: JointKind::Fixed,
            })
        );
    }

    #[test]
    fn connect_and_disconnect_report_transitions() {
        let parent = body_handle(0);
        let child = body_handle(1);
        let state = BodyState::from_body(&RigidBody::default());
        let mut joint = Joint::new(Some(parent), Frame::IDENTITY, JointSettings::default())
            .with_payload(FixedJoint::default());

        assert_eq!(
            joint.connect(parent, &state, &state),
            Err(JointError::InvalidOperation(
                "child and parent must be different bodies"
            ))
        );
        assert_eq!(joint.connect(child, &state, &state), Ok(true));
        assert_eq!(joint.connect(child, &state, &state), Ok(false));
        assert!(joint.frames().is_some());
        assert!(joint.disconnect());
        assert!(!joint.disconnect());
        assert!(joint.frames().is_none());
    }

    #[test]
    fn stale_parent_resolves_to_world() {
        let mut joint = Joint::new(Some(body_handle(3)), Frame::IDENTITY, JointSettings::default());
        assert_eq!(joint.resolve_parent(|_| false), None);
        assert_eq!(joint.parent(), None);
    }

    #[test]
    fn tension_sign_forms_are_opposite() {
        let tension = Tension {
            force: Vec3::X,
            torque: Vec3::Y,
        };
        assert_eq!(tension.on_parent(), (-Vec3::X, -Vec3::Y));
    }
}
