use approx::assert_relative_eq;
use glam::Vec3;
use jointworks::{
    AngularIntegration, Frame, HingeJoint, HingeSettings, JointEngine, JointError, JointKind,
    JointSettings, PistonJoint, PistonSettings, RigidBody, WorldSettings,
};
use std::f32::consts::PI;

#[test]
fn angular_integration_accumulates_whole_turns() {
    let mut tracker = AngularIntegration::default();
    let mut wrapped = 0.0_f32;
    for _ in 0..400 {
        wrapped = (wrapped + 0.05 + PI).rem_euclid(2.0 * PI) - PI;
        tracker.update_angle(wrapped);
    }
    assert_relative_eq!(tracker.angle(), 400.0 * 0.05, epsilon = 1.0e-3);

    let offset = AngularIntegration::new(1.0);
    let shifted = tracker + offset;
    assert_relative_eq!(shifted.angle(), tracker.angle() + 1.0, epsilon = 1.0e-5);
    assert_relative_eq!((shifted - offset).angle(), tracker.angle(), epsilon = 1.0e-3);
}

#[test]
fn engine_attach_drives_a_piston_through_the_fixed_step() {
    let mut engine = JointEngine::with_settings(
        WorldSettings::default()
            .with_time_step(1.0 / 120.0)
            .with_gravity([0.0, 0.0, 0.0]),
    );
    let slider = engine.add_body(RigidBody::default());
    let joint = engine
        .attach(
            PistonJoint::new(PistonSettings {
                rate: 2.0,
                target: 0.4,
                ..PistonSettings::default()
            }),
            None,
            slider,
            Frame::IDENTITY,
            JointSettings::default(),
        )
        .unwrap();

    let substeps = engine.step(1.0);
    // Accumulated rounding may leave the last sub-step for the next call.
    assert!((119..=120).contains(&substeps), "substeps {substeps}");
    let position = engine.world().body(slider).unwrap().transform.position;
    assert_relative_eq!(position.x, 0.4, epsilon = 1.0e-2);
    let piston = engine.world().kind::<PistonJoint>(joint).unwrap();
    assert_relative_eq!(piston.position(), 0.4, epsilon = 1.0e-2);
}

#[test]
fn failed_attach_leaves_no_joint_behind() {
    let mut engine = JointEngine::new(1.0 / 60.0);
    let body = engine.add_body(RigidBody::default());
    let err = engine
        .attach(JointKind::Fixed, Some(body), body, Frame::IDENTITY, JointSettings::default())
        .unwrap_err();
    assert_eq!(
        err,
        JointError::InvalidOperation("child and parent must be different bodies")
    );
    assert_eq!(engine.world().joint_count(), 0);
}

#[test]
fn host_view_speaks_degrees_and_host_lengths() {
    let mut engine = JointEngine::with_settings(
        WorldSettings::default()
            .with_length_scale(100.0)
            .with_gravity([0.0, 0.0, 0.0]),
    );
    let arm = engine.host().add_body_at(RigidBody::default(), Vec3::new(100.0, 0.0, 0.0));
    assert_relative_eq!(engine.world().body(arm).unwrap().transform.position.x, 1.0);

    let hinge = engine
        .attach(
            HingeJoint::new(HingeSettings::default()),
            None,
            arm,
            Frame::from_front(Vec3::Z, Vec3::ZERO),
            JointSettings::default(),
        )
        .unwrap();

    let mut host = engine.host();
    host.set_hinge_limits(hinge, -30.0, 45.0, true).unwrap();
    let (min, max, enabled) = host.hinge_limits(hinge).unwrap();
    assert_relative_eq!(min, -30.0, epsilon = 1.0e-3);
    assert_relative_eq!(max, 45.0, epsilon = 1.0e-3);
    assert!(enabled);
    assert_relative_eq!(host.hinge_angle(hinge).unwrap(), 0.0);

    let position = host.body_position(arm).unwrap();
    assert_relative_eq!(position.x, 100.0, epsilon = 1.0e-3);
}
