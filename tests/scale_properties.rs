//! Property tests for pivot-preserving uniform scaling.

use nalgebra::{Matrix4, Point3, UnitQuaternion, Vector3};
use proptest::prelude::*;
use vertscale::ops::{scale_to_distance, SelectionPair, MIN_TARGET_DISTANCE};
use vertscale::Transform;

fn arb_point() -> impl Strategy<Value = [f64; 3]> {
    prop::array::uniform3(-50.0..50.0f64)
}

fn arb_transform() -> impl Strategy<Value = Transform> {
    (
        arb_point(),
        prop::array::uniform3(-3.0..3.0f64),
        prop::array::uniform3(0.2..4.0f64),
    )
        .prop_map(|(location, euler, scale)| {
            Transform::from_location(location.into())
                .with_rotation(UnitQuaternion::from_euler_angles(euler[0], euler[1], euler[2]))
                .with_scale(Vector3::from(scale))
        })
}

/// Two local points at least a unit apart.
fn arb_pair() -> impl Strategy<Value = SelectionPair> {
    let local = || prop::array::uniform3(-10.0..10.0f64);
    (local(), local())
        .prop_filter("points too close", |(a, b)| {
            (Vector3::from(*a) - Vector3::from(*b)).norm() > 1.0
        })
        .prop_map(|(a, b)| SelectionPair(Point3::from(a), Point3::from(b)))
}

fn world(transform: &Transform, parent: Option<&Matrix4<f64>>) -> Matrix4<f64> {
    parent.copied().unwrap_or_else(Matrix4::identity) * transform.to_matrix()
}

proptest! {
    /// The scaled pair is exactly the requested distance apart.
    #[test]
    fn reaches_target_distance(
        local in arb_pair(),
        child in arb_transform(),
        parent in prop::option::of(arb_transform()),
        target in 0.01..100.0f64,
    ) {
        let parent = parent.map(|p| p.to_matrix());
        let before = local.map(&world(&child, parent.as_ref()));
        let result = scale_to_distance(before, &child, parent.as_ref(), target).unwrap();
        let updated = result.transform.unwrap_or(child);

        let after = local.map(&world(&updated, parent.as_ref()));
        prop_assert!((after.distance() - target).abs() < 1e-6);
    }

    /// The midpoint of the pair does not move.
    #[test]
    fn pivot_is_invariant(
        local in arb_pair(),
        child in arb_transform(),
        parent in prop::option::of(arb_transform()),
        target in 0.01..100.0f64,
    ) {
        let parent = parent.map(|p| p.to_matrix());
        let before = local.map(&world(&child, parent.as_ref()));
        let result = scale_to_distance(before, &child, parent.as_ref(), target).unwrap();
        let updated = result.transform.unwrap_or(child);

        let after = local.map(&world(&updated, parent.as_ref()));
        prop_assert!((after.midpoint() - before.midpoint()).norm() < 1e-6);
    }

    /// Asking for the distance just reached changes nothing.
    #[test]
    fn second_run_is_a_noop(
        local in arb_pair(),
        child in arb_transform(),
        target in 0.01..100.0f64,
    ) {
        let before = local.map(&child.to_matrix());
        let first = scale_to_distance(before, &child, None, target).unwrap();
        let updated = first.transform.unwrap_or(child);

        let achieved = local.map(&updated.to_matrix());
        let second = scale_to_distance(achieved, &updated, None, achieved.distance()).unwrap();
        prop_assert!(second.is_noop());
    }

    /// Non-positive targets shrink the pair to the minimum distance.
    #[test]
    fn non_positive_target_clamps(local in arb_pair(), target in -10.0..=0.0f64) {
        let child = Transform::identity();
        let result = scale_to_distance(local, &child, None, target).unwrap();
        prop_assert!(result.clamped);

        let after = local.map(&result.transform.unwrap().to_matrix());
        prop_assert!((after.distance() - MIN_TARGET_DISTANCE).abs() < 1e-9);
    }
}
