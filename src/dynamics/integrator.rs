use glam::{Quat, Vec3};

use crate::core::rigidbody::RigidBody;
use crate::utils::allocator::{Arena, BodyHandle};

/// Semi-implicit Euler integrator for the bodies of a [`crate::world::JointWorld`].
#[derive(Debug, Clone)]
pub struct Integrator {
    pub gravity: Vec3,
    parallel: bool,
}

impl Integrator {
    pub fn new(gravity: Vec3) -> Self {
        Self {
            gravity,
            parallel: false,
        }
    }

    pub fn set_parallel(&mut self, enabled: bool) {
        self.parallel = enabled;
    }

    pub fn parallel(&self) -> bool {
        self.parallel
    }

    /// Applies gravity, accumulated loads and damping, then clears the loads.
    pub fn integrate_velocity(&self, body: &mut RigidBody, dt: f32) {
        if body.is_static {
            body.clear_loads();
            return;
        }

        let inverse_inertia = body.world_inverse_inertia();
        let mut acceleration = body.force * body.inverse_mass;
        if body.inverse_mass > 0.0 {
            acceleration += self.gravity * body.gravity_scale;
        }
        body.velocity.linear += acceleration * dt;
        body.velocity.angular += inverse_inertia * body.torque * dt;

        body.velocity.linear *= (1.0 - body.linear_velocity_damping * dt).max(0.0);
        body.velocity.angular *= (1.0 - body.angular_velocity_damping * dt).max(0.0);

        body.clear_loads();
    }

    pub fn integrate_position(&self, body: &mut RigidBody, dt: f32) {
        if body.is_static {
            return;
        }

        body.transform.position += body.velocity.linear * dt;

        let omega_mag = body.velocity.angular.length();
        if omega_mag > 1e-6 {
            let axis = body.velocity.angular / omega_mag;
            let angle = omega_mag * dt;
            let delta = Quat::from_axis_angle(axis, angle);
            body.transform.rotation = (delta * body.transform.rotation).normalize();
        }
    }

    pub fn integrate_velocities(&self, bodies: &mut Arena<BodyHandle, RigidBody>, dt: f32) {
        #[cfg(feature = "parallel")]
        if self.parallel {
            use rayon::prelude::*;
            bodies
                .par_iter_mut()
                .for_each(|(_, body)| self.integrate_velocity(body, dt));
            return;
        }

        for (_, body) in bodies.iter_mut() {
            self.integrate_velocity(body, dt);
        }
    }

    pub fn integrate_positions(&self, bodies: &mut Arena<BodyHandle, RigidBody>, dt: f32) {
        #[cfg(feature = "parallel")]
        if self.parallel {
            use rayon::prelude::*;
            bodies
                .par_iter_mut()
                .for_each(|(_, body)| self.integrate_position(body, dt));
            return;
        }

        for (_, body) in bodies.iter_mut() {
            self.integrate_position(body, dt);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn gravity_accelerates_dynamic_bodies_only() {
        let integrator = Integrator::new(Vec3::new(0.0, -10.0, 0.0));
        let mut dynamic = RigidBody::default();
        let mut fixed = RigidBody::fixed();
        integrator.integrate_velocity(&mut dynamic, 0.5);
        integrator.integrate_velocity(&mut fixed, 0.5);
        assert_relative_eq!(dynamic.velocity.linear.y, -5.0);
        assert_eq!(fixed.velocity.linear, Vec3::ZERO);
    }

    #[test]
    fn torque_spins_body_and_is_cleared() {
        let integrator = Integrator::new(Vec3::ZERO);
        let mut body = RigidBody::default();
        body.apply_torque(Vec3::new(0.0, 0.0, 2.0));
        integrator.integrate_velocity(&mut body, 0.25);
        assert_relative_eq!(body.velocity.angular.z, 0.5);
        assert_eq!(body.torque, Vec3::ZERO);

        integrator.integrate_position(&mut body, 1.0);
        let (axis, angle) = body.transform.rotation.to_axis_angle();
        assert_relative_eq!(angle, 0.5, epsilon = 1.0e-5);
        assert!(axis.abs_diff_eq(Vec3::Z, 1.0e-5));
    }
}
