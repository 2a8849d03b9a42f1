use std::time::Instant;

use glam::Vec3;
use log::{debug, info};
use parking_lot::Mutex;

use crate::{
    config::WorldSettings,
    core::rigidbody::RigidBody,
    dynamics::{
        integrator::Integrator,
        rows::{BodyLoad, BodyState, JointRows},
        solver::{RowBatch, RowSolver, SolverStepMetrics},
    },
    error::{JointError, Result},
    joints::{Joint, JointPayload, JointSettings, KindPayload, Tension},
    utils::{
        allocator::{Arena, BodyHandle, JointHandle},
        logging::{warn_if_substep_over_budget, ScopedTimer},
        math::Frame,
    },
};

/// Owns bodies and joints and advances them with a fixed timestep.
///
/// Each sub-step integrates velocities, collects one row batch per connected joint, solves the
/// rows, records reactions, applies the disconnects requested by broken joints and finally
/// integrates positions.
pub struct JointWorld {
    settings: WorldSettings,
    bodies: Arena<BodyHandle, RigidBody>,
    joints: Arena<JointHandle, Joint>,
    integrator: Integrator,
    solver: RowSolver,
    accumulator: f32,
    pending_disconnects: Mutex<Vec<JointHandle>>,
    last_metrics: SolverStepMetrics,
}

impl Default for JointWorld {
    fn default() -> Self {
        Self::new(WorldSettings::default())
    }
}

impl JointWorld {
    pub fn new(settings: WorldSettings) -> Self {
        let settings = settings.sanitized();
        let mut integrator = Integrator::new(Vec3::from_array(settings.gravity));
        integrator.set_parallel(settings.parallel);
        Self {
            settings,
            bodies: Arena::new(),
            joints: Arena::new(),
            integrator,
            solver: RowSolver::new(settings.solver_iterations),
            accumulator: 0.0,
            pending_disconnects: Mutex::new(Vec::new()),
            last_metrics: SolverStepMetrics::default(),
        }
    }

    pub fn settings(&self) -> &WorldSettings {
        &self.settings
    }

    pub fn time_step(&self) -> f32 {
        self.settings.time_step
    }

    /// Has no effect unless the `parallel` feature is compiled in.
    pub fn set_parallel_enabled(&mut self, enabled: bool) {
        let enabled = enabled && cfg!(feature = "parallel");
        self.settings.parallel = enabled;
        self.integrator.set_parallel(enabled);
    }

    pub fn parallel_enabled(&self) -> bool {
        self.settings.parallel
    }

    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.settings.gravity = gravity.to_array();
        self.integrator.gravity = gravity;
    }

    /// Metrics of the last solved sub-step.
    pub fn last_metrics(&self) -> &SolverStepMetrics {
        &self.last_metrics
    }

    // --- bodies -------------------------------------------------------------------------------

    pub fn add_body(&mut self, body: RigidBody) -> BodyHandle {
        self.bodies.insert(body)
    }

    /// Removes a body. Joints driving it are disconnected; joints hanging from it fall back to
    /// the world the next time they are used.
    pub fn remove_body(&mut self, handle: BodyHandle) -> Result<RigidBody> {
        let body = self.bodies.remove(handle).ok_or(JointError::InvalidHandle)?;
        for (joint_handle, joint) in self.joints.iter_mut() {
            if joint.child() == Some(handle) && joint.disconnect() {
                debug!("joint {joint_handle:?} lost its child {handle:?}");
            }
        }
        Ok(body)
    }

    pub fn body(&self, handle: BodyHandle) -> Option<&RigidBody> {
        self.bodies.get(handle)
    }

    pub fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut RigidBody> {
        self.bodies.get_mut(handle)
    }

    pub fn bodies(&self) -> impl Iterator<Item = (BodyHandle, &RigidBody)> + '_ {
        self.bodies.iter()
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    // --- joint lifecycle ----------------------------------------------------------------------

    /// Creates a detached joint of the given kind hanging from `parent` (the world when `None`).
    /// `pin` is expressed relative to the parent.
    pub fn create_joint(
        &mut self,
        payload: impl Into<JointPayload>,
        parent: Option<BodyHandle>,
        pin: Frame,
        settings: JointSettings,
    ) -> Result<JointHandle> {
        self.check_parent(parent)?;
        let joint = Joint::new(parent, pin, settings).with_payload(payload);
        Ok(self.joints.insert(joint))
    }

    /// Creates a joint whose kind is assigned later with [`JointWorld::assign_kind`].
    pub fn create_detached_joint(
        &mut self,
        parent: Option<BodyHandle>,
        pin: Frame,
        settings: JointSettings,
    ) -> Result<JointHandle> {
        self.check_parent(parent)?;
        Ok(self.joints.insert(Joint::new(parent, pin, settings)))
    }

    pub fn assign_kind(&mut self, handle: JointHandle, payload: impl Into<JointPayload>) -> Result<()> {
        self.joint_mut(handle)?.assign_kind(payload)
    }

    /// Attaches `child`. `Ok(false)` when the joint was already connected.
    pub fn connect(&mut self, handle: JointHandle, child: BodyHandle) -> Result<bool> {
        let bodies = &self.bodies;
        let joint = self.joints.get_mut(handle).ok_or(JointError::InvalidHandle)?;
        let child_body = bodies.get(child).ok_or(JointError::InvalidHandle)?;
        let parent = joint.resolve_parent(|body| bodies.contains(body));
        let child_state = BodyState::from_body(child_body);
        let parent_state = body_state(bodies, parent);
        joint.connect(child, &child_state, &parent_state)
    }

    /// Detaches the child. `Ok(false)` when the joint was not connected.
    pub fn disconnect(&mut self, handle: JointHandle) -> Result<bool> {
        Ok(self.joint_mut(handle)?.disconnect())
    }

    /// Disconnects if needed and frees the joint; its handle becomes invalid.
    pub fn destroy_joint(&mut self, handle: JointHandle) -> Result<()> {
        let mut joint = self.joints.remove(handle).ok_or(JointError::InvalidHandle)?;
        joint.destroy();
        debug!("joint {handle:?} destroyed");
        Ok(())
    }

    pub fn is_connected(&self, handle: JointHandle) -> Result<bool> {
        Ok(self.joint(handle)?.is_connected())
    }

    pub fn joint(&self, handle: JointHandle) -> Result<&Joint> {
        self.joints.get(handle).ok_or(JointError::InvalidHandle)
    }

    pub fn joint_mut(&mut self, handle: JointHandle) -> Result<&mut Joint> {
        self.joints.get_mut(handle).ok_or(JointError::InvalidHandle)
    }

    pub fn joints(&self) -> impl Iterator<Item = (JointHandle, &Joint)> + '_ {
        self.joints.iter()
    }

    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    /// Typed view of a joint's kind, e.g. `world.kind::<HingeJoint>(handle)`.
    pub fn kind<T: KindPayload>(&self, handle: JointHandle) -> Result<&T> {
        self.joint(handle)?.kind_ref::<T>()
    }

    pub fn kind_mut<T: KindPayload>(&mut self, handle: JointHandle) -> Result<&mut T> {
        self.joint_mut(handle)?.kind_mut::<T>()
    }

    /// Last reaction force and torque on the child, in the parent's (or world) frame.
    pub fn reaction(&self, handle: JointHandle) -> Result<(Vec3, Vec3)> {
        Ok(self.joint(handle)?.reaction())
    }

    pub fn tension(&self, handle: JointHandle) -> Result<Tension> {
        Ok(self.joint(handle)?.tension())
    }

    /// Body pairs linked by a connected joint that must not collide with each other.
    pub fn non_collidable_pairs(&self) -> Vec<(BodyHandle, Option<BodyHandle>)> {
        self.joints
            .iter()
            .filter(|(_, joint)| joint.is_connected() && !joint.settings().collidable)
            .filter_map(|(_, joint)| joint.child().map(|child| (child, joint.parent())))
            .collect()
    }

    /// Builds one joint's rows against the current body states without solving them.
    ///
    /// With `timestep <= 0` the rows are produced but the joint's kinematic state stays put.
    pub fn submit_constraints(&mut self, handle: JointHandle, timestep: f32) -> Result<JointRows> {
        let error_reduction = self.settings.error_reduction;
        let bodies = &self.bodies;
        let joint = self.joints.get_mut(handle).ok_or(JointError::InvalidHandle)?;
        if !joint.is_connected() {
            return Err(JointError::InvalidOperation("joint is not connected"));
        }
        build_batch(handle, joint, bodies, timestep, error_reduction)
            .map(|batch| batch.rows)
            .ok_or(JointError::InvalidHandle)
    }

    fn check_parent(&self, parent: Option<BodyHandle>) -> Result<()> {
        match parent {
            Some(handle) if !self.bodies.contains(handle) => Err(JointError::InvalidHandle),
            _ => Ok(()),
        }
    }

    // --- stepping -----------------------------------------------------------------------------

    /// Advances the simulation using a fixed timestep accumulator. Returns the number of
    /// sub-steps taken.
    pub fn step(&mut self, dt: f32) -> usize {
        if dt > 0.0 {
            self.accumulator += dt;
        }
        let time_step = self.settings.time_step;
        let mut substeps = 0;
        while self.accumulator >= time_step {
            self.accumulator -= time_step;
            self.substep(time_step);
            substeps += 1;
        }
        substeps
    }

    /// Runs one sub-step of `timestep`. A non-positive timestep only refreshes joint rows.
    pub fn substep(&mut self, timestep: f32) -> SolverStepMetrics {
        if timestep <= 0.0 {
            let batches = self.collect_rows(timestep);
            debug!("zero-time pass produced {} row batches", batches.len());
            return SolverStepMetrics::default();
        }

        let started = Instant::now();
        {
            let _timer = ScopedTimer::new("integrator::velocities");
            self.integrator.integrate_velocities(&mut self.bodies, timestep);
        }

        let mut batches = self.collect_rows(timestep);
        self.apply_body_loads(&batches, timestep);

        let metrics = {
            let _timer = ScopedTimer::new("solver::rows");
            self.solver.solve(&mut self.bodies, &mut batches, timestep)
        };

        self.scan_breaking(&batches);
        self.write_tensions(&batches);
        self.apply_pending_disconnects();

        {
            let _timer = ScopedTimer::new("integrator::positions");
            self.integrator.integrate_positions(&mut self.bodies, timestep);
        }

        warn_if_substep_over_budget(started.elapsed(), timestep, metrics.rows_solved);
        self.last_metrics = metrics.clone();
        metrics
    }

    fn collect_rows(&mut self, timestep: f32) -> Vec<RowBatch> {
        let _timer = ScopedTimer::new("joints::collect");
        let bodies = &self.bodies;
        let error_reduction = self.settings.error_reduction;

        #[cfg(feature = "parallel")]
        if self.settings.parallel {
            use rayon::prelude::*;
            return self
                .joints
                .par_iter_mut()
                .filter_map(|(handle, joint)| {
                    build_batch(handle, joint, bodies, timestep, error_reduction)
                })
                .collect();
        }

        self.joints
            .iter_mut()
            .filter_map(|(handle, joint)| build_batch(handle, joint, bodies, timestep, error_reduction))
            .collect()
    }

    /// Direct loads from decoupled springs, applied as velocity changes before the solve.
    fn apply_body_loads(&mut self, batches: &[RowBatch], timestep: f32) {
        for batch in batches {
            if let Some(body) = self.bodies.get_mut(batch.child) {
                apply_load(body, batch.rows.child_load(), timestep);
            }
            if let Some(body) = batch.parent.and_then(|parent| self.bodies.get_mut(parent)) {
                apply_load(body, batch.rows.parent_load(), timestep);
            }
        }
    }

    /// Queues a disconnect for every joint whose strongest row reached its breaking force.
    fn scan_breaking(&self, batches: &[RowBatch]) {
        let _timer = ScopedTimer::new("joints::breaking");
        let joints = &self.joints;
        let pending = &self.pending_disconnects;
        let check = |batch: &RowBatch| {
            let Some(joint) = joints.get(batch.joint) else {
                return;
            };
            let threshold = joint.settings().breaking_force;
            if threshold > 0.0 && batch.rows.max_reaction() >= threshold {
                pending.lock().push(batch.joint);
            }
        };

        #[cfg(feature = "parallel")]
        if self.settings.parallel {
            use rayon::prelude::*;
            batches.par_iter().for_each(check);
            return;
        }

        batches.iter().for_each(check);
    }

    fn write_tensions(&mut self, batches: &[RowBatch]) {
        for batch in batches {
            let Some(joint) = self.joints.get_mut(batch.joint) else {
                continue;
            };
            let (mut force, mut torque) = batch.rows.reaction_on_child();
            let load = batch.rows.child_load();
            force += load.force;
            torque += load.torque;
            let parent = batch.rows.parent();
            joint.record_tension(Tension {
                force: parent.frame.untransform_vector(force),
                torque: parent.frame.untransform_vector(torque),
            });
        }
    }

    fn apply_pending_disconnects(&mut self) {
        let mut pending = std::mem::take(&mut *self.pending_disconnects.lock());
        pending.sort_unstable();
        pending.dedup();
        for handle in pending {
            if let Some(joint) = self.joints.get_mut(handle) {
                if joint.disconnect() {
                    info!("joint {handle:?} broke and was disconnected");
                }
            }
        }
    }
}

fn body_state(bodies: &Arena<BodyHandle, RigidBody>, handle: Option<BodyHandle>) -> BodyState {
    handle
        .and_then(|handle| bodies.get(handle))
        .map(BodyState::from_body)
        .unwrap_or_else(BodyState::world)
}

/// Rows of one connected joint; `None` for detached joints or a missing child.
fn build_batch(
    handle: JointHandle,
    joint: &mut Joint,
    bodies: &Arena<BodyHandle, RigidBody>,
    timestep: f32,
    error_reduction: f32,
) -> Option<RowBatch> {
    if !joint.is_connected() {
        return None;
    }
    let child = joint.child()?;
    let child_state = BodyState::from_body(bodies.get(child)?);
    let parent = joint.resolve_parent(|body| bodies.contains(body));
    let parent_state = body_state(bodies, parent);

    let settings = *joint.settings();
    let mut rows = JointRows::new(
        child_state,
        parent_state,
        timestep,
        settings.stiffness,
        error_reduction,
    );
    if !joint.submit(&child_state, &parent_state, timestep, &mut rows) {
        return None;
    }
    Some(RowBatch {
        joint: handle,
        child,
        parent,
        rows,
        passes: settings.solver_hint,
    })
}

fn apply_load(body: &mut RigidBody, load: BodyLoad, timestep: f32) {
    if body.is_static || load.is_zero() {
        return;
    }
    body.velocity.linear += load.force * (body.inverse_mass * timestep);
    body.velocity.angular += body.world_inverse_inertia() * load.torque * timestep;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::joints::{FixedJoint, HingeJoint, JointKind};
    use approx::assert_relative_eq;

    fn world() -> JointWorld {
        JointWorld::new(WorldSettings::default().with_gravity([0.0, 0.0, 0.0]))
    }

    #[test]
    fn unknown_parent_is_rejected() {
        let mut world = world();
        let body = world.add_body(RigidBody::default());
        world.remove_body(body).unwrap();
        assert_eq!(
            world
                .create_joint(FixedJoint, Some(body), Frame::IDENTITY, JointSettings::default())
                .err(),
            Some(JointError::InvalidHandle)
        );
    }

    #[test]
    fn destroyed_handle_is_invalid() {
        let mut world = world();
        let joint = world
            .create_joint(JointKind::Hinge, None, Frame::IDENTITY, JointSettings::default())
            .unwrap();
        world.destroy_joint(joint).unwrap();
        assert_eq!(world.is_connected(joint), Err(JointError::InvalidHandle));
        assert_eq!(world.destroy_joint(joint), Err(JointError::InvalidHandle));
    }

    #[test]
    fn fixed_joint_holds_child_against_gravity() {
        let mut world = JointWorld::default();
        let child = world.add_body(RigidBody::default().with_position(Vec3::new(0.0, 1.0, 0.0)));
        let joint = world
            .create_joint(
                FixedJoint,
                None,
                Frame::from_translation(Vec3::new(0.0, 1.0, 0.0)),
                JointSettings::default(),
            )
            .unwrap();
        assert_eq!(world.connect(joint, child), Ok(true));
        for _ in 0..60 {
            world.substep(world.time_step());
        }
        let position = world.body(child).unwrap().transform.position;
        assert!(position.abs_diff_eq(Vec3::new(0.0, 1.0, 0.0), 1.0e-2));
        // The joint carries the weight: about m·g upwards.
        let (force, _) = world.reaction(joint).unwrap();
        assert_relative_eq!(force.y, 9.81, epsilon = 0.5);
    }

    #[test]
    fn removing_child_disconnects() {
        let mut world = world();
        let child = world.add_body(RigidBody::default());
        let joint = world
            .create_joint(HingeJoint::default(), None, Frame::IDENTITY, JointSettings::default())
            .unwrap();
        world.connect(joint, child).unwrap();
        world.remove_body(child).unwrap();
        assert_eq!(world.is_connected(joint), Ok(false));
    }

    #[test]
    fn zero_timestep_builds_rows_without_advancing() {
        let mut world = world();
        let child = world.add_body(RigidBody::default().with_position(Vec3::new(1.0, 0.0, 0.0)));
        let joint = world
            .create_joint(HingeJoint::default(), None, Frame::from_front(Vec3::Z, Vec3::ZERO), JointSettings::default())
            .unwrap();
        world.connect(joint, child).unwrap();
        let rows = world.submit_constraints(joint, 0.0).unwrap();
        assert_eq!(rows.rows().len(), 6);
        assert_eq!(world.kind::<HingeJoint>(joint).unwrap().omega(), 0.0);
    }

    #[test]
    fn non_collidable_pairs_list_connected_joints() {
        let mut world = world();
        let parent = world.add_body(RigidBody::default());
        let child = world.add_body(RigidBody::default().with_position(Vec3::X));
        let joint = world
            .create_joint(FixedJoint, Some(parent), Frame::IDENTITY, JointSettings::default())
            .unwrap();
        assert!(world.non_collidable_pairs().is_empty());
        world.connect(joint, child).unwrap();
        assert_eq!(world.non_collidable_pairs(), vec![(child, Some(parent))]);
    }
}
