//! Host-facing view of a [`JointWorld`] in host units.
//!
//! Lengths cross the boundary through the world's `length_scale` (host units per solver unit)
//! and every limit or angle field is exchanged in degrees. Inside the crate everything stays in
//! solver units and radians.

use glam::Vec3;

use crate::core::rigidbody::RigidBody;
use crate::error::Result;
use crate::joints::{
    BallAndSocketJoint, CorkscrewJoint, CurvySliderJoint, HingeJoint, LimitRange, PistonJoint,
    PlaneJoint, ServoJoint, SpringJoint, Tension,
};
use crate::utils::allocator::{BodyHandle, JointHandle};
use crate::utils::math::Frame;
use crate::world::JointWorld;

/// Unit conversions between the host and the solver.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HostUnits {
    length_scale: f32,
}

impl HostUnits {
    pub fn new(length_scale: f32) -> Self {
        Self {
            length_scale: if length_scale > 0.0 { length_scale } else { 1.0 },
        }
    }

    pub fn length_scale(&self) -> f32 {
        self.length_scale
    }

    pub fn length_to_solver(&self, length: f32) -> f32 {
        length / self.length_scale
    }

    pub fn length_to_host(&self, length: f32) -> f32 {
        length * self.length_scale
    }

    pub fn point_to_solver(&self, point: Vec3) -> Vec3 {
        point / self.length_scale
    }

    pub fn point_to_host(&self, point: Vec3) -> Vec3 {
        point * self.length_scale
    }

    pub fn frame_to_solver(&self, frame: &Frame) -> Frame {
        frame.with_origin(self.point_to_solver(frame.origin))
    }

    pub fn frame_to_host(&self, frame: &Frame) -> Frame {
        frame.with_origin(self.point_to_host(frame.origin))
    }

    pub fn force_to_host(&self, force: f32) -> f32 {
        force * self.length_scale
    }

    pub fn force_to_solver(&self, force: f32) -> f32 {
        force / self.length_scale
    }

    pub fn torque_to_host(&self, torque: f32) -> f32 {
        torque * self.length_scale * self.length_scale
    }

    pub fn torque_to_solver(&self, torque: f32) -> f32 {
        torque / (self.length_scale * self.length_scale)
    }

    /// Forces scale with length (mass · length / s²); torques with its square.
    pub fn tension_to_host(&self, tension: Tension) -> Tension {
        Tension {
            force: tension.force * self.length_scale,
            torque: tension.torque * self.length_scale * self.length_scale,
        }
    }

    pub fn degrees_limits(limits: LimitRange) -> (f32, f32, bool) {
        (limits.min.to_degrees(), limits.max.to_degrees(), limits.enabled)
    }

    fn length_limits(&self, limits: LimitRange) -> (f32, f32, bool) {
        (
            self.length_to_host(limits.min),
            self.length_to_host(limits.max),
            limits.enabled,
        )
    }
}

/// Borrowed view of a world that speaks host units.
pub struct HostView<'a> {
    world: &'a mut JointWorld,
    units: HostUnits,
}

impl<'a> HostView<'a> {
    pub fn new(world: &'a mut JointWorld) -> Self {
        let units = HostUnits::new(world.settings().length_scale);
        Self { world, units }
    }

    pub fn units(&self) -> HostUnits {
        self.units
    }

    pub fn world(&mut self) -> &mut JointWorld {
        self.world
    }

    /// Adds `body` placed at a host-space position.
    pub fn add_body_at(&mut self, body: RigidBody, position: Vec3) -> BodyHandle {
        let position = self.units.point_to_solver(position);
        self.world.add_body(body.with_position(position))
    }

    pub fn body_position(&self, handle: BodyHandle) -> Option<Vec3> {
        self.world
            .body(handle)
            .map(|body| self.units.point_to_host(body.transform.position))
    }

    /// Replaces a joint's pin, given in host units relative to its parent.
    pub fn set_pin_frame(&mut self, handle: JointHandle, pin: &Frame) -> Result<()> {
        let pin = self.units.frame_to_solver(pin);
        self.world.joint_mut(handle)?.set_pin_frame(pin);
        Ok(())
    }

    /// Tension on the child in host units.
    pub fn tension(&self, handle: JointHandle) -> Result<Tension> {
        Ok(self.units.tension_to_host(self.world.tension(handle)?))
    }

    /// Breaking force in host force units; 0 never breaks.
    pub fn set_breaking_force(&mut self, handle: JointHandle, force: f32) -> Result<()> {
        let force = self.units.force_to_solver(force).max(0.0);
        self.world.joint_mut(handle)?.settings_mut().breaking_force = force;
        Ok(())
    }

    // --- hinge --------------------------------------------------------------------------------

    pub fn hinge_angle(&self, handle: JointHandle) -> Result<f32> {
        Ok(self.world.kind::<HingeJoint>(handle)?.angle().to_degrees())
    }

    pub fn hinge_limits(&self, handle: JointHandle) -> Result<(f32, f32, bool)> {
        Ok(HostUnits::degrees_limits(
            self.world.kind::<HingeJoint>(handle)?.limits(),
        ))
    }

    pub fn set_hinge_limits(&mut self, handle: JointHandle, min: f32, max: f32, enabled: bool) -> Result<()> {
        let hinge = self.world.kind_mut::<HingeJoint>(handle)?;
        hinge.set_limits(min.to_radians(), max.to_radians());
        hinge.set_limits_enabled(enabled);
        Ok(())
    }

    /// Spin about the pin axis in degrees per second.
    pub fn hinge_omega(&self, handle: JointHandle) -> Result<f32> {
        Ok(self.world.kind::<HingeJoint>(handle)?.omega().to_degrees())
    }

    /// Friction torque in host units.
    pub fn hinge_friction(&self, handle: JointHandle) -> Result<f32> {
        let hinge = self.world.kind::<HingeJoint>(handle)?;
        Ok(self.units.torque_to_host(hinge.friction()))
    }

    pub fn set_hinge_friction(&mut self, handle: JointHandle, friction: f32) -> Result<()> {
        let friction = self.units.torque_to_solver(friction);
        self.world.kind_mut::<HingeJoint>(handle)?.set_friction(friction);
        Ok(())
    }

    /// Controller gains `(accel, damp, strength)`; strength is a host torque.
    pub fn hinge_controller(&self, handle: JointHandle) -> Result<(f32, f32, f32)> {
        let (accel, damp, strength) = self.world.kind::<HingeJoint>(handle)?.controller();
        Ok((accel, damp, self.units.torque_to_host(strength)))
    }

    pub fn set_hinge_controller(&mut self, handle: JointHandle, accel: f32, damp: f32, strength: f32) -> Result<()> {
        let strength = self.units.torque_to_solver(strength);
        self.world
            .kind_mut::<HingeJoint>(handle)?
            .set_controller(accel, damp, strength);
        Ok(())
    }

    /// Spring-mode coefficients `(spring, damper)`, per radian.
    pub fn hinge_spring(&self, handle: JointHandle) -> Result<(f32, f32)> {
        Ok(self.world.kind::<HingeJoint>(handle)?.spring())
    }

    pub fn set_hinge_spring(&mut self, handle: JointHandle, spring: f32, damper: f32) -> Result<()> {
        self.world.kind_mut::<HingeJoint>(handle)?.set_spring(spring, damper);
        Ok(())
    }

    /// Commanded spin in degrees per second.
    pub fn set_hinge_commanded_omega(&mut self, handle: JointHandle, omega: f32) -> Result<()> {
        self.world
            .kind_mut::<HingeJoint>(handle)?
            .set_commanded_omega(omega.to_radians());
        Ok(())
    }

    // --- servo --------------------------------------------------------------------------------

    pub fn servo_angle(&self, handle: JointHandle) -> Result<f32> {
        Ok(self.world.kind::<ServoJoint>(handle)?.angle().to_degrees())
    }

    pub fn servo_limits(&self, handle: JointHandle) -> Result<(f32, f32, bool)> {
        Ok(HostUnits::degrees_limits(
            self.world.kind::<ServoJoint>(handle)?.limits(),
        ))
    }

    pub fn set_servo_limits(&mut self, handle: JointHandle, min: f32, max: f32, enabled: bool) -> Result<()> {
        let servo = self.world.kind_mut::<ServoJoint>(handle)?;
        servo.set_limits(min.to_radians(), max.to_radians());
        servo.set_limits_enabled(enabled);
        Ok(())
    }

    /// Target angle in degrees (position mode) or degrees per second (rate mode).
    pub fn set_servo_target(&mut self, handle: JointHandle, target: f32) -> Result<()> {
        self.world
            .kind_mut::<ServoJoint>(handle)?
            .set_target(target.to_radians());
        Ok(())
    }

    pub fn servo_omega(&self, handle: JointHandle) -> Result<f32> {
        Ok(self.world.kind::<ServoJoint>(handle)?.omega().to_degrees())
    }

    pub fn servo_alpha(&self, handle: JointHandle) -> Result<f32> {
        Ok(self.world.kind::<ServoJoint>(handle)?.alpha().to_degrees())
    }

    /// `(rate in degrees per second, reduction ratio, power as a host torque)`.
    pub fn servo_drive(&self, handle: JointHandle) -> Result<(f32, f32, f32)> {
        let settings = *self.world.kind::<ServoJoint>(handle)?.settings();
        Ok((
            settings.rate.to_degrees(),
            settings.reduction_ratio,
            self.units.torque_to_host(settings.power),
        ))
    }

    pub fn set_servo_reduction_ratio(&mut self, handle: JointHandle, ratio: f32) -> Result<()> {
        self.world
            .kind_mut::<ServoJoint>(handle)?
            .set_reduction_ratio(ratio);
        Ok(())
    }

    /// Maximum drive torque in host units; 0 is unlimited.
    pub fn set_servo_power(&mut self, handle: JointHandle, power: f32) -> Result<()> {
        let power = self.units.torque_to_solver(power);
        self.world.kind_mut::<ServoJoint>(handle)?.set_power(power);
        Ok(())
    }

    /// Maximum speed in degrees per second.
    pub fn set_servo_rate(&mut self, handle: JointHandle, rate: f32) -> Result<()> {
        self.world
            .kind_mut::<ServoJoint>(handle)?
            .set_rate(rate.to_radians());
        Ok(())
    }

    // --- piston -------------------------------------------------------------------------------

    pub fn piston_position(&self, handle: JointHandle) -> Result<f32> {
        let piston = self.world.kind::<PistonJoint>(handle)?;
        Ok(self.units.length_to_host(piston.position()))
    }

    pub fn piston_velocity(&self, handle: JointHandle) -> Result<f32> {
        let piston = self.world.kind::<PistonJoint>(handle)?;
        Ok(self.units.length_to_host(piston.velocity()))
    }

    pub fn piston_acceleration(&self, handle: JointHandle) -> Result<f32> {
        let piston = self.world.kind::<PistonJoint>(handle)?;
        Ok(self.units.length_to_host(piston.acceleration()))
    }

    /// `(rate in host units per second, reduction ratio, power as a host force)`.
    pub fn piston_drive(&self, handle: JointHandle) -> Result<(f32, f32, f32)> {
        let settings = *self.world.kind::<PistonJoint>(handle)?.settings();
        Ok((
            self.units.length_to_host(settings.rate),
            settings.reduction_ratio,
            self.units.force_to_host(settings.power),
        ))
    }

    pub fn set_piston_rate(&mut self, handle: JointHandle, rate: f32) -> Result<()> {
        let rate = self.units.length_to_solver(rate);
        self.world.kind_mut::<PistonJoint>(handle)?.set_rate(rate);
        Ok(())
    }

    pub fn set_piston_reduction_ratio(&mut self, handle: JointHandle, ratio: f32) -> Result<()> {
        self.world
            .kind_mut::<PistonJoint>(handle)?
            .set_reduction_ratio(ratio);
        Ok(())
    }

    /// Maximum drive force in host units; 0 is unlimited.
    pub fn set_piston_power(&mut self, handle: JointHandle, power: f32) -> Result<()> {
        let power = self.units.force_to_solver(power);
        self.world.kind_mut::<PistonJoint>(handle)?.set_power(power);
        Ok(())
    }

    pub fn piston_limits(&self, handle: JointHandle) -> Result<(f32, f32, bool)> {
        let piston = self.world.kind::<PistonJoint>(handle)?;
        Ok(self.units.length_limits(piston.limits()))
    }

    pub fn set_piston_limits(&mut self, handle: JointHandle, min: f32, max: f32, enabled: bool) -> Result<()> {
        let units = self.units;
        let piston = self.world.kind_mut::<PistonJoint>(handle)?;
        piston.set_limits(units.length_to_solver(min), units.length_to_solver(max));
        piston.set_limits_enabled(enabled);
        Ok(())
    }

    pub fn set_piston_target(&mut self, handle: JointHandle, target: f32) -> Result<()> {
        let target = self.units.length_to_solver(target);
        self.world.kind_mut::<PistonJoint>(handle)?.set_target(target);
        Ok(())
    }

    // --- corkscrew ----------------------------------------------------------------------------

    pub fn corkscrew_limits(&self, handle: JointHandle) -> Result<((f32, f32, bool), (f32, f32, bool))> {
        let settings = *self.world.kind::<CorkscrewJoint>(handle)?.settings();
        Ok((
            self.units.length_limits(settings.linear_limits),
            HostUnits::degrees_limits(settings.angular_limits),
        ))
    }

    pub fn set_corkscrew_linear_limits(&mut self, handle: JointHandle, min: f32, max: f32, enabled: bool) -> Result<()> {
        let units = self.units;
        self.world.kind_mut::<CorkscrewJoint>(handle)?.set_linear_limits(
            units.length_to_solver(min),
            units.length_to_solver(max),
            enabled,
        );
        Ok(())
    }

    pub fn set_corkscrew_angular_limits(&mut self, handle: JointHandle, min: f32, max: f32, enabled: bool) -> Result<()> {
        self.world
            .kind_mut::<CorkscrewJoint>(handle)?
            .set_angular_limits(min.to_radians(), max.to_radians(), enabled);
        Ok(())
    }

    /// `(linear friction force, angular friction torque)` in host units.
    pub fn corkscrew_friction(&self, handle: JointHandle) -> Result<(f32, f32)> {
        let settings = *self.world.kind::<CorkscrewJoint>(handle)?.settings();
        Ok((
            self.units.force_to_host(settings.linear_friction),
            self.units.torque_to_host(settings.angular_friction),
        ))
    }

    pub fn set_corkscrew_friction(&mut self, handle: JointHandle, linear: f32, angular: f32) -> Result<()> {
        let units = self.units;
        let corkscrew = self.world.kind_mut::<CorkscrewJoint>(handle)?;
        corkscrew.set_linear_friction(units.force_to_solver(linear));
        corkscrew.set_angular_friction(units.torque_to_solver(angular));
        Ok(())
    }

    // --- spring -------------------------------------------------------------------------------

    pub fn spring_position(&self, handle: JointHandle) -> Result<f32> {
        let spring = self.world.kind::<SpringJoint>(handle)?;
        Ok(self.units.length_to_host(spring.position()))
    }

    pub fn set_spring_rest_length(&mut self, handle: JointHandle, rest_length: f32) -> Result<()> {
        let rest_length = self.units.length_to_solver(rest_length);
        self.world
            .kind_mut::<SpringJoint>(handle)?
            .set_rest_length(rest_length);
        Ok(())
    }

    pub fn set_spring_limits(&mut self, handle: JointHandle, min: f32, max: f32, enabled: bool) -> Result<()> {
        let units = self.units;
        self.world.kind_mut::<SpringJoint>(handle)?.set_limits(
            units.length_to_solver(min),
            units.length_to_solver(max),
            enabled,
        );
        Ok(())
    }

    // --- plane --------------------------------------------------------------------------------

    /// In-plane offset of the child pin in host units, along the pin's up and right axes.
    pub fn plane_offset(&self, handle: JointHandle) -> Result<(f32, f32)> {
        let offset = self.world.kind::<PlaneJoint>(handle)?.offset();
        Ok((
            self.units.length_to_host(offset.x),
            self.units.length_to_host(offset.y),
        ))
    }

    pub fn plane_angle(&self, handle: JointHandle) -> Result<f32> {
        Ok(self.world.kind::<PlaneJoint>(handle)?.angle().to_degrees())
    }

    /// `(linear friction force, angular friction torque, rotation enabled)` in host units.
    pub fn plane_settings(&self, handle: JointHandle) -> Result<(f32, f32, bool)> {
        let settings = *self.world.kind::<PlaneJoint>(handle)?.settings();
        Ok((
            self.units.force_to_host(settings.linear_friction),
            self.units.torque_to_host(settings.angular_friction),
            settings.rotation_enabled,
        ))
    }

    pub fn set_plane_settings(&mut self, handle: JointHandle, linear: f32, angular: f32, rotation_enabled: bool) -> Result<()> {
        let units = self.units;
        let plane = self.world.kind_mut::<PlaneJoint>(handle)?;
        plane.set_linear_friction(units.force_to_solver(linear));
        plane.set_angular_friction(units.torque_to_solver(angular));
        plane.set_rotation_enabled(rotation_enabled);
        Ok(())
    }

    // --- ball and socket ----------------------------------------------------------------------

    pub fn ball_angles(&self, handle: JointHandle) -> Result<(f32, f32)> {
        let ball = self.world.kind::<BallAndSocketJoint>(handle)?;
        Ok((ball.cone_angle().to_degrees(), ball.twist_angle().to_degrees()))
    }

    pub fn set_ball_cone_limit(&mut self, handle: JointHandle, max_angle: f32, enabled: bool) -> Result<()> {
        self.world
            .kind_mut::<BallAndSocketJoint>(handle)?
            .set_cone_limit(max_angle.to_radians(), enabled);
        Ok(())
    }

    pub fn set_ball_twist_limits(&mut self, handle: JointHandle, min: f32, max: f32, enabled: bool) -> Result<()> {
        self.world
            .kind_mut::<BallAndSocketJoint>(handle)?
            .set_twist_limits(min.to_radians(), max.to_radians(), enabled);
        Ok(())
    }

    /// `(friction torque in host units, control scale)`.
    pub fn ball_friction(&self, handle: JointHandle) -> Result<(f32, f32)> {
        let settings = *self.world.kind::<BallAndSocketJoint>(handle)?.settings();
        Ok((self.units.torque_to_host(settings.friction), settings.control_scale))
    }

    pub fn set_ball_friction(&mut self, handle: JointHandle, friction: f32, control_scale: f32) -> Result<()> {
        let friction = self.units.torque_to_solver(friction);
        let ball = self.world.kind_mut::<BallAndSocketJoint>(handle)?;
        ball.set_friction(friction);
        ball.set_control_scale(control_scale);
        Ok(())
    }

    // --- curvy slider -------------------------------------------------------------------------

    /// Replaces the path; points are host-space positions relative to the parent.
    pub fn set_curvy_points(&mut self, handle: JointHandle, points: &[Vec3], looped: bool) -> Result<usize> {
        let units = self.units;
        let points = points.iter().map(|&point| units.point_to_solver(point)).collect();
        Ok(self
            .world
            .kind_mut::<CurvySliderJoint>(handle)?
            .set_points(points, looped))
    }

    pub fn curvy_distance(&self, handle: JointHandle) -> Result<f32> {
        let slider = self.world.kind::<CurvySliderJoint>(handle)?;
        Ok(self.units.length_to_host(slider.distance()))
    }

    /// Last located path frame with its origin in host units.
    pub fn curvy_frame(&self, handle: JointHandle) -> Result<Option<Frame>> {
        let slider = self.world.kind::<CurvySliderJoint>(handle)?;
        Ok(slider.frame().map(|frame| self.units.frame_to_host(&frame)))
    }

    /// `(enabled, speed in host units per second, strength as a host force)`.
    pub fn curvy_controller(&self, handle: JointHandle) -> Result<(bool, f32, f32)> {
        let settings = self.world.kind::<CurvySliderJoint>(handle)?.settings();
        Ok((
            settings.controller_enabled,
            self.units.length_to_host(settings.controller_speed),
            self.units.force_to_host(settings.controller_strength),
        ))
    }

    pub fn set_curvy_controller(&mut self, handle: JointHandle, enabled: bool, speed: f32, strength: f32) -> Result<()> {
        let units = self.units;
        self.world.kind_mut::<CurvySliderJoint>(handle)?.set_controller(
            enabled,
            units.length_to_solver(speed),
            units.force_to_solver(strength),
        );
        Ok(())
    }

    /// `(align, rotate)` flags.
    pub fn curvy_alignment(&self, handle: JointHandle) -> Result<(bool, bool)> {
        Ok(self.world.kind::<CurvySliderJoint>(handle)?.alignment())
    }

    pub fn set_curvy_alignment(&mut self, handle: JointHandle, align: bool, rotate: bool) -> Result<()> {
        self.world
            .kind_mut::<CurvySliderJoint>(handle)?
            .set_alignment(align, rotate);
        Ok(())
    }

    pub fn curvy_friction(&self, handle: JointHandle) -> Result<f32> {
        let slider = self.world.kind::<CurvySliderJoint>(handle)?;
        Ok(self.units.force_to_host(slider.settings().friction))
    }

    pub fn set_curvy_friction(&mut self, handle: JointHandle, friction: f32) -> Result<()> {
        let friction = self.units.force_to_solver(friction);
        self.world.kind_mut::<CurvySliderJoint>(handle)?.set_friction(friction);
        Ok(())
    }

    /// Last located point on the path in host units, world space.
    pub fn curvy_point(&self, handle: JointHandle) -> Result<Option<Vec3>> {
        let slider = self.world.kind::<CurvySliderJoint>(handle)?;
        Ok(slider.point().map(|point| self.units.point_to_host(point)))
    }

    /// Unit tangent at the last located point.
    pub fn curvy_tangent(&self, handle: JointHandle) -> Result<Option<Vec3>> {
        Ok(self.world.kind::<CurvySliderJoint>(handle)?.tangent())
    }
}
