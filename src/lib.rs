//! Jointworks – joint and constraint layer for rigid-body simulation.
//!
//! Joints couple a child body to a parent body (or the world) and, every sub-step, express the
//! coupling as scalar constraint rows for a rigid-body solver. The crate ships nine joint kinds,
//! continuous angle tracking, a curve engine for path-following sliders, and a small reference
//! world (integrator plus projected Gauss-Seidel row solver) that runs them end to end.

pub mod config;
pub mod core;
pub mod dynamics;
pub mod error;
pub mod host;
pub mod joints;
pub mod utils;
pub mod world;

pub use glam::{Mat3, Quat, Vec3};

pub use config::WorldSettings;
pub use core::{
    curve::{Curve, CurveEdge, CurveLocation},
    rigidbody::RigidBody,
    types::{MassProperties, Transform, Velocity},
};
pub use dynamics::{
    angular::AngularIntegration,
    integrator::Integrator,
    rows::{BodySide, BodyState, ConstraintRow, ConstraintSink, JointRows},
    solver::{RowSolver, SolverStepMetrics},
};
pub use error::{JointError, Result};
pub use host::{HostUnits, HostView};
pub use joints::{
    BallAndSocketJoint, BallAndSocketSettings, CorkscrewJoint, CorkscrewSettings,
    CurvySliderJoint, CurvySliderSettings, DriveMode, FixedJoint, HingeJoint, HingeMode,
    HingeSettings, Joint, JointBehavior, JointKind, JointPayload, JointSettings, KindPayload,
    LimitRange, PistonJoint, PistonSettings, PlaneJoint, PlaneSettings, ServoJoint, ServoSettings,
    SpringJoint, SpringMode, SpringSettings, Tension,
};
pub use utils::{
    allocator::{Arena, BodyHandle, GenerationalId, JointHandle},
    math::Frame,
};
pub use world::JointWorld;

/// High-level convenience wrapper that owns a [`JointWorld`].
pub struct JointEngine {
    world: JointWorld,
}

impl JointEngine {
    /// Creates an engine with the provided fixed timestep and default settings otherwise.
    pub fn new(timestep: f32) -> Self {
        Self {
            world: JointWorld::new(WorldSettings::default().with_time_step(timestep)),
        }
    }

    pub fn with_settings(settings: WorldSettings) -> Self {
        Self {
            world: JointWorld::new(settings),
        }
    }

    /// Adds a rigid body to the world and returns its handle.
    pub fn add_body(&mut self, body: RigidBody) -> BodyHandle {
        self.world.add_body(body)
    }

    /// Creates a joint hanging from `parent` and connects `child` to it.
    pub fn attach(
        &mut self,
        kind: impl Into<JointPayload>,
        parent: Option<BodyHandle>,
        child: BodyHandle,
        pin: Frame,
        settings: JointSettings,
    ) -> Result<JointHandle> {
        let joint = self.world.create_joint(kind, parent, pin, settings)?;
        if let Err(err) = self.world.connect(joint, child) {
            self.world.destroy_joint(joint)?;
            return Err(err);
        }
        Ok(joint)
    }

    /// Advances the simulation by the provided delta time.
    pub fn step(&mut self, dt: f32) -> usize {
        self.world.step(dt)
    }

    /// Enables or disables parallel joint collection and integration.
    pub fn set_parallel_enabled(&mut self, enabled: bool) {
        self.world.set_parallel_enabled(enabled);
    }

    pub fn parallel_enabled(&self) -> bool {
        self.world.parallel_enabled()
    }

    pub fn world(&self) -> &JointWorld {
        &self.world
    }

    pub fn world_mut(&mut self) -> &mut JointWorld {
        &mut self.world
    }

    /// View of the world in host units.
    pub fn host(&mut self) -> HostView<'_> {
        HostView::new(&mut self.world)
    }
}
