//! Curvy slider: the child pin rides along a path of control points fixed to the parent.

use glam::Vec3;
use log::debug;
use serde::{Deserialize, Serialize};

use crate::core::curve::{Curve, CurveLocation};
use crate::dynamics::rows::{BodyState, ConstraintSink};
use crate::utils::math::Frame;

use super::context::{
    add_axis_row, drive_bounds, linear_friction_row, lock_alignment, lock_orientation,
    SubmitContext,
};
use super::{JointBehavior, JointKind};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CurvySliderSettings {
    /// Control points in the parent's space.
    pub points: Vec<Vec3>,
    pub looped: bool,
    /// Keep the child oriented with the path frame.
    pub align: bool,
    /// With alignment on, leave the spin about the tangent free.
    pub rotate: bool,
    /// Maximum friction force along the path.
    pub friction: f32,
    pub controller_enabled: bool,
    /// Speed along the path the controller drives towards.
    pub controller_speed: f32,
    /// Maximum controller force; 0 is unlimited.
    pub controller_strength: f32,
    /// Up direction of the path frame at the first control point, parent space.
    pub reference_up: Vec3,
}

impl Default for CurvySliderSettings {
    fn default() -> Self {
        Self {
            points: Vec::new(),
            looped: false,
            align: true,
            rotate: false,
            friction: 0.0,
            controller_enabled: false,
            controller_speed: 0.0,
            controller_strength: 0.0,
            reference_up: Vec3::Y,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct CurvySliderJoint {
    settings: CurvySliderSettings,
    curve: Curve,
    distance: f32,
    velocity: f32,
    overpass: f32,
    location: Option<CurveLocation>,
    active: bool,
}

impl CurvySliderJoint {
    pub fn new(settings: CurvySliderSettings) -> Self {
        let mut joint = Self {
            settings,
            ..Self::default()
        };
        joint.rebuild();
        joint
    }

    pub fn settings(&self) -> &CurvySliderSettings {
        &self.settings
    }

    pub fn curve(&self) -> &Curve {
        &self.curve
    }

    /// Replaces the path and rebuilds its edges. Returns the number of usable edges.
    pub fn set_points(&mut self, points: Vec<Vec3>, looped: bool) -> usize {
        self.settings.points = points;
        self.settings.looped = looped;
        self.rebuild()
    }

    /// Re-seeds the path frames from a new up direction. Returns the number of usable edges.
    pub fn set_reference_up(&mut self, up: Vec3) -> usize {
        self.settings.reference_up = up;
        self.rebuild()
    }

    pub fn alignment(&self) -> (bool, bool) {
        (self.settings.align, self.settings.rotate)
    }

    pub fn set_alignment(&mut self, align: bool, rotate: bool) {
        self.settings.align = align;
        self.settings.rotate = rotate;
    }

    pub fn set_friction(&mut self, friction: f32) {
        self.settings.friction = friction.abs();
    }

    pub fn set_controller(&mut self, enabled: bool, speed: f32, strength: f32) {
        self.settings.controller_enabled = enabled;
        self.settings.controller_speed = speed;
        self.settings.controller_strength = strength.abs();
    }

    /// Arclength of the child pin along the path.
    pub fn distance(&self) -> f32 {
        self.distance
    }

    /// Speed of the child pin along the tangent.
    pub fn velocity(&self) -> f32 {
        self.velocity
    }

    /// How far the child pin sits past an open end; negative before the start.
    pub fn overpass(&self) -> f32 {
        self.overpass
    }

    /// Last located path frame, in world space.
    pub fn location(&self) -> Option<&CurveLocation> {
        self.location.as_ref()
    }

    pub fn frame(&self) -> Option<Frame> {
        self.location.map(|location| location.frame)
    }

    pub fn point(&self) -> Option<Vec3> {
        self.location.map(|location| location.point())
    }

    pub fn tangent(&self) -> Option<Vec3> {
        self.location.map(|location| location.tangent())
    }

    /// Whether the last submission produced rows.
    pub fn is_active(&self) -> bool {
        self.active
    }

    fn rebuild(&mut self) -> usize {
        self.curve.set_reference_up(self.settings.reference_up);
        let edges = self
            .curve
            .rebuild(self.settings.points.clone(), self.settings.looped);
        self.distance = if self.curve.is_usable() {
            self.distance.clamp(0.0, self.curve.length())
        } else {
            0.0
        };
        edges
    }

    fn submit_along<S: ConstraintSink>(
        &self,
        ctx: &SubmitContext,
        sink: &mut S,
        tangent: Vec3,
        overpass: f32,
    ) {
        let point = ctx.child_pin.origin;
        if overpass != 0.0 {
            add_axis_row(sink, point, tangent, -overpass);
            if overpass > 0.0 {
                sink.set_row_friction_bounds(f32::NEG_INFINITY, 0.0);
            } else {
                sink.set_row_friction_bounds(0.0, f32::INFINITY);
            }
        } else if self.settings.controller_enabled {
            let velocity = ctx.relative_velocity().dot(tangent);
            add_axis_row(sink, point, tangent, 0.0);
            sink.set_row_acceleration(
                ctx.acceleration_towards(self.settings.controller_speed, velocity),
            );
            drive_bounds(sink, self.settings.controller_strength);
        } else {
            linear_friction_row(sink, ctx, tangent, self.settings.friction);
        }
    }
}

impl JointBehavior for CurvySliderJoint {
    const KIND: JointKind = JointKind::CurvySlider;

    /// Moves the pin onto the path point nearest the child and seeds the arclength from it.
    fn adjust_pin_frame(&mut self, pin: &Frame, child: &BodyState, parent: &BodyState) -> Frame {
        self.rebuild();
        let child_local = child.frame.to_local(&parent.frame);
        let pin_local = pin.to_local(&parent.frame);
        match self.curve.adjust_pin_to_curve(&child_local, &pin_local) {
            Ok(on_curve) => {
                if let Ok(seed) = self.curve.locate_by_point(child_local.origin) {
                    self.distance = seed.distance;
                }
                on_curve.to_global(&parent.frame)
            }
            Err(_) => *pin,
        }
    }

    fn on_disconnect(&mut self) {
        self.distance = 0.0;
        self.velocity = 0.0;
        self.overpass = 0.0;
        self.location = None;
        self.active = false;
    }

    fn submit<S: ConstraintSink>(&mut self, ctx: &SubmitContext, sink: &mut S) {
        let local_point = ctx.parent.frame.untransform_point(ctx.child_pin.origin);
        let located = match self.curve.locate_near_previous(self.distance, local_point) {
            Ok(location) => location,
            Err(err) => {
                debug!("curvy slider inactive this tick: {err}");
                self.active = false;
                return;
            }
        };
        let frame = located.frame.to_global(&ctx.parent.frame);
        let tangent = frame.front();

        for dir in [frame.up(), frame.right()] {
            sink.add_linear_row(ctx.child_pin.origin, frame.origin, dir);
        }
        self.submit_along(ctx, sink, tangent, located.overpass);

        if self.settings.align {
            if self.settings.rotate {
                lock_alignment(sink, ctx, tangent);
            } else {
                lock_orientation(sink, ctx, &frame);
            }
        }

        self.active = true;
        if ctx.advancing() {
            self.velocity = ctx.relative_velocity().dot(tangent);
            self.distance = located.distance;
            self.overpass = located.overpass;
            self.location = Some(CurveLocation { frame, ..located });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rigidbody::RigidBody;
    use crate::dynamics::rows::JointRows;
    use crate::joints::joint::PinFrames;
    use approx::assert_relative_eq;

    fn rail() -> CurvySliderJoint {
        CurvySliderJoint::new(CurvySliderSettings {
            points: vec![Vec3::ZERO, Vec3::new(4.0, 0.0, 0.0)],
            ..CurvySliderSettings::default()
        })
    }

    fn context(body: &RigidBody) -> SubmitContext {
        let pins = PinFrames {
            child: Frame::IDENTITY,
            parent: Frame::IDENTITY,
            parent_unadjusted: Frame::IDENTITY,
        };
        SubmitContext::new(BodyState::from_body(body), BodyState::world(), &pins, 0.01)
    }

    #[test]
    fn pin_adjusts_onto_the_path() {
        let mut slider = rail();
        let child = BodyState::from_body(&RigidBody::default().with_position(Vec3::new(1.0, 0.2, 0.0)));
        let pin = slider.adjust_pin_frame(&Frame::IDENTITY, &child, &BodyState::world());
        assert!(pin.origin.abs_diff_eq(Vec3::X, 1.0e-6));
        assert!(pin.front().abs_diff_eq(Vec3::X, 1.0e-6));
        assert_relative_eq!(slider.distance(), 1.0, epsilon = 1.0e-6);
    }

    #[test]
    fn tracks_distance_with_six_rows() {
        let mut slider = rail();
        let body = RigidBody::default().with_position(Vec3::new(2.5, 0.1, 0.0));
        let ctx = context(&body);
        let mut rows = JointRows::new(ctx.child, ctx.parent, 0.01, 1.0, 0.3);
        slider.submit(&ctx, &mut rows);
        assert_eq!(rows.row_count(), 6);
        assert!(slider.is_active());
        assert_relative_eq!(slider.distance(), 2.5, epsilon = 1.0e-5);
        // The up row pulls the child back onto the path.
        assert_relative_eq!(rows.rows()[0].error, -0.1, epsilon = 1.0e-5);
        assert!(slider.point().unwrap().abs_diff_eq(Vec3::new(2.5, 0.0, 0.0), 1.0e-5));
    }

    #[test]
    fn open_end_acts_as_a_stop() {
        let mut slider = rail();
        let body = RigidBody::default().with_position(Vec3::new(4.5, 0.0, 0.0));
        let ctx = context(&body);
        let mut rows = JointRows::new(ctx.child, ctx.parent, 0.01, 1.0, 0.3);
        slider.submit(&ctx, &mut rows);
        let stop = &rows.rows()[2];
        assert_relative_eq!(stop.error, -0.5, epsilon = 1.0e-5);
        assert_eq!(stop.max_force, 0.0);
        assert!(stop.min_force.is_infinite());
        assert_relative_eq!(slider.overpass(), 0.5, epsilon = 1.0e-5);
    }

    #[test]
    fn controller_drives_along_tangent() {
        let mut slider = rail();
        slider.set_controller(true, 2.0, 10.0);
        slider.set_alignment(true, true);
        let body = RigidBody::default().with_position(Vec3::new(1.0, 0.0, 0.0));
        let ctx = context(&body);
        let mut rows = JointRows::new(ctx.child, ctx.parent, 0.01, 1.0, 0.3);
        slider.submit(&ctx, &mut rows);
        assert_eq!(rows.row_count(), 5);
        assert_relative_eq!(rows.rows()[2].acceleration, 200.0, epsilon = 1.0e-3);
        assert_eq!(rows.rows()[2].max_force, 10.0);
    }

    #[test]
    fn reference_up_orients_the_path_frame() {
        let mut slider = rail();
        assert!(slider.curve().edges()[0].frame.up().abs_diff_eq(Vec3::Y, 1.0e-6));
        assert_eq!(slider.set_reference_up(Vec3::Z), 1);
        let frame = slider.curve().edges()[0].frame;
        assert!(frame.front().abs_diff_eq(Vec3::X, 1.0e-6));
        assert!(frame.up().abs_diff_eq(Vec3::Z, 1.0e-6));
    }

    #[test]
    fn unusable_path_emits_nothing() {
        let mut slider = CurvySliderJoint::default();
        assert_eq!(slider.set_points(vec![Vec3::ONE], false), 0);
        let body = RigidBody::default();
        let ctx = context(&body);
        let mut rows = JointRows::new(ctx.child, ctx.parent, 0.01, 1.0, 0.3);
        slider.submit(&ctx, &mut rows);
        assert_eq!(rows.row_count(), 0);
        assert!(!slider.is_active());
    }
}
