use super::types::{MassProperties, Transform, Velocity};
use glam::{Mat3, Vec3};

/// Rigid body as seen by the joint layer: kinematic state, mass, and pending loads.
#[derive(Debug, Clone)]
pub struct RigidBody {
    pub transform: Transform,
    pub velocity: Velocity,
    pub mass_properties: MassProperties,
    pub gravity_scale: f32,
    pub is_static: bool,
    pub linear_velocity_damping: f32,
    pub angular_velocity_damping: f32,
    pub inverse_mass: f32,
    /// Body-space inverse inertia.
    pub inverse_inertia: Mat3,
    /// Force accumulated since the last velocity integration.
    pub force: Vec3,
    /// Torque accumulated since the last velocity integration.
    pub torque: Vec3,
}

impl Default for RigidBody {
    fn default() -> Self {
        let mut body = Self {
            transform: Transform::default(),
            velocity: Velocity::default(),
            mass_properties: MassProperties::default(),
            gravity_scale: 1.0,
            is_static: false,
            linear_velocity_damping: crate::config::DEFAULT_LINEAR_DAMPING,
            angular_velocity_damping: crate::config::DEFAULT_ANGULAR_DAMPING,
            inverse_mass: 1.0,
            inverse_inertia: Mat3::IDENTITY,
            force: Vec3::ZERO,
            torque: Vec3::ZERO,
        };
        body.recompute_inverses();
        body
    }
}

impl RigidBody {
    pub fn new(mass_properties: MassProperties) -> Self {
        let mut body = Self {
            mass_properties,
            ..Self::default()
        };
        body.recompute_inverses();
        body
    }

    /// Immovable body: infinite mass, unaffected by gravity and joint reactions.
    pub fn fixed() -> Self {
        Self {
            is_static: true,
            inverse_mass: 0.0,
            inverse_inertia: Mat3::ZERO,
            gravity_scale: 0.0,
            ..Self::default()
        }
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.transform.position = position;
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn set_velocity(&mut self, linear: Vec3, angular: Vec3) {
        self.velocity.linear = linear;
        self.velocity.angular = angular;
    }

    pub fn apply_force(&mut self, force: Vec3) {
        if self.is_static {
            return;
        }
        self.force += force;
    }

    pub fn apply_torque(&mut self, torque: Vec3) {
        if self.is_static {
            return;
        }
        self.torque += torque;
    }

    /// Force at a world point: contributes both force and the induced torque.
    pub fn apply_force_at(&mut self, force: Vec3, point: Vec3) {
        if self.is_static {
            return;
        }
        self.force += force;
        self.torque += (point - self.transform.position).cross(force);
    }

    pub fn clear_loads(&mut self) {
        self.force = Vec3::ZERO;
        self.torque = Vec3::ZERO;
    }

    /// Inverse inertia rotated into world space.
    pub fn world_inverse_inertia(&self) -> Mat3 {
        if self.is_static {
            return Mat3::ZERO;
        }
        let rotation = Mat3::from_quat(self.transform.rotation);
        rotation * self.inverse_inertia * rotation.transpose()
    }

    pub fn effective_inverse_mass(&self) -> f32 {
        if self.is_static {
            0.0
        } else {
            self.inverse_mass
        }
    }

    pub fn set_mass_properties(&mut self, props: MassProperties) {
        self.mass_properties = props;
        self.recompute_inverses();
    }

    fn recompute_inverses(&mut self) {
        if self.is_static {
            self.inverse_mass = 0.0;
            self.inverse_inertia = Mat3::ZERO;
            return;
        }
        self.inverse_mass = if self.mass_properties.mass.abs() < f32::EPSILON {
            0.0
        } else {
            1.0 / self.mass_properties.mass
        };
        let inverse_inertia = self.mass_properties.inertia.inverse();
        if self.mass_properties.inertia.determinant().abs() < f32::EPSILON {
            self.inverse_inertia = Mat3::IDENTITY;
        } else {
            self.inverse_inertia = inverse_inertia;
        }
    }
}
