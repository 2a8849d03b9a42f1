use approx::assert_relative_eq;
use glam::Vec3;
use jointworks::core::curve::Curve;
use std::f32::consts::TAU;

fn circle(radius: f32, segments: usize) -> Vec<Vec3> {
    (0..segments)
        .map(|i| {
            let theta = TAU * i as f32 / segments as f32;
            Vec3::new(radius * theta.cos(), 0.0, radius * theta.sin())
        })
        .collect()
}

#[test]
fn rebuild_is_idempotent() {
    let points = vec![
        Vec3::ZERO,
        Vec3::new(1.0, 0.5, 0.0),
        Vec3::new(2.0, 0.5, 1.0),
        Vec3::new(2.0, 2.0, 3.0),
    ];
    let mut curve = Curve::new(points.clone(), false);
    let first: Vec<_> = curve.edges().to_vec();
    let length = curve.length();

    curve.rebuild(points.clone(), false);
    assert_eq!(curve.edges(), first.as_slice());
    assert_eq!(curve.length(), length);
    assert_eq!(curve.points(), points.as_slice());
}

#[test]
fn slowly_circled_loop_advances_monotonically() {
    let radius = 2.0;
    let curve = Curve::new(circle(radius, 64), true);
    assert!(curve.is_looped());

    let mut distance = curve.locate_by_point(Vec3::new(radius, 0.0, 0.0)).unwrap().distance;
    let mut travelled = 0.0;
    let steps = 940;
    for step in 1..=steps {
        let theta = 0.01 * step as f32;
        let sample = Vec3::new(radius * theta.cos(), 0.0, radius * theta.sin());
        let location = curve.locate_near_previous(distance, sample).unwrap();
        let advance = curve.signed_separation(distance, location.distance);
        assert!(advance >= -1.0e-4, "step {step} went back by {advance}");
        travelled += advance;
        distance = location.distance;
        assert_eq!(location.overpass, 0.0);
    }
    // 9.4 rad is about one and a half turns.
    let expected = curve.length() * 9.4 / TAU;
    assert_relative_eq!(travelled, expected, epsilon = 0.05 * curve.length());
}

#[test]
fn loop_is_followed_back_across_the_seam() {
    let square = vec![
        Vec3::ZERO,
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(1.0, 0.0, 1.0),
        Vec3::new(0.0, 0.0, 1.0),
    ];
    let curve = Curve::new(square, true);
    assert_relative_eq!(curve.length(), 4.0);

    let location = curve.locate_near_previous(0.05, Vec3::new(-0.02, 0.0, 0.03)).unwrap();
    assert_eq!(location.edge, 3);
    assert_relative_eq!(location.distance, 3.97, epsilon = 1.0e-5);
    assert_relative_eq!(curve.signed_separation(0.05, location.distance), -0.08, epsilon = 1.0e-5);
    assert_eq!(location.overpass, 0.0);
}

#[test]
fn reference_up_seeds_the_first_frame() {
    let mut curve = Curve::default();
    curve.set_reference_up(Vec3::new(0.0, 0.0, 2.0));
    assert_eq!(curve.reference_up(), Vec3::Z);
    curve.rebuild(vec![Vec3::ZERO, Vec3::X, Vec3::new(1.0, 1.0, 0.0)], false);
    assert!(curve.edges()[0].frame.up().abs_diff_eq(Vec3::Z, 1.0e-6));
    // The second edge turns about the reference up, which the transported frame keeps.
    assert!(curve.edges()[1].frame.front().abs_diff_eq(Vec3::Y, 1.0e-6));
    assert!(curve.edges()[1].frame.up().abs_diff_eq(Vec3::Z, 1.0e-5));
}

#[test]
fn open_curve_overpass_has_sign_of_the_end() {
    let curve = Curve::new(vec![Vec3::ZERO, Vec3::X, Vec3::new(2.0, 0.0, 0.0)], false);
    let before = curve.locate_near_previous(0.1, Vec3::new(-0.3, 0.0, 0.0)).unwrap();
    assert_relative_eq!(before.overpass, -0.3, epsilon = 1.0e-6);
    assert_eq!(before.distance, 0.0);
    let after = curve.locate_near_previous(1.9, Vec3::new(2.2, 0.1, 0.0)).unwrap();
    assert_relative_eq!(after.overpass, 0.2, epsilon = 1.0e-6);
}

#[test]
fn frames_do_not_twist_along_a_helix() {
    let points: Vec<Vec3> = (0..40)
        .map(|i| {
            let theta = 0.2 * i as f32;
            Vec3::new(theta.cos(), 0.05 * i as f32, theta.sin())
        })
        .collect();
    let curve = Curve::new(points, false);
    for pair in curve.edges().windows(2) {
        let (a, b) = (&pair[0].frame, &pair[1].frame);
        // Orthonormal frames, and consecutive up axes differ only by the path's own turn.
        assert_relative_eq!(a.front().dot(a.up()), 0.0, epsilon = 1.0e-4);
        assert_relative_eq!(b.up().length(), 1.0, epsilon = 1.0e-4);
        let turn = a.front().angle_between(b.front());
        assert!(a.up().angle_between(b.up()) <= turn + 1.0e-3);
    }
}
