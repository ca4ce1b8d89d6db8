use approx::assert_abs_diff_eq;
use glam::Vec3;
use pointcloud_capture::keyframe::{Keyframe, KeyframeStore};
use pointcloud_capture::{CaptureError, merge};

#[test]
fn test_merge_centroid_and_extent() {
    let keyframes = vec![
        Keyframe::new(0.0, vec![Vec3::new(0.0, 0.0, 0.0), Vec3::new(2.0, 0.0, 0.0)]),
        Keyframe::new(1.0, vec![Vec3::new(0.0, 2.0, 0.0)]),
    ];
    let result = merge(&keyframes).unwrap();

    assert_eq!(result.point_count, 3);
    assert_abs_diff_eq!(result.centroid.x, 2.0 / 3.0, epsilon = 1e-6);
    assert_abs_diff_eq!(result.centroid.y, 2.0 / 3.0, epsilon = 1e-6);
    assert_abs_diff_eq!(result.centroid.z, 0.0, epsilon = 1e-6);
    assert_abs_diff_eq!(result.extent.x, 4.0 / 3.0, epsilon = 1e-6);
    assert_abs_diff_eq!(result.extent.y, 4.0 / 3.0, epsilon = 1e-6);
    assert_abs_diff_eq!(result.extent.z, 0.0, epsilon = 1e-6);
}

#[test]
fn test_merge_extent_is_one_sided() {
    // far outlier on the negative side does not widen the extent
    let keyframes = vec![Keyframe::new(
        0.0,
        vec![Vec3::new(-10.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.0, 0.0, 0.0)],
    )];
    let result = merge(&keyframes).unwrap();
    assert_abs_diff_eq!(result.centroid.x, -3.0, epsilon = 1e-6);
    assert_abs_diff_eq!(result.extent.x, 4.0, epsilon = 1e-6);
    assert_eq!(result.bounds.min.x, -10.0);
    assert_eq!(result.bounds.max.x, 1.0);
}

#[test]
fn test_merge_single_point() {
    let keyframes = vec![Keyframe::new(0.0, vec![Vec3::new(1.0, -2.0, 3.0)])];
    let result = merge(&keyframes).unwrap();
    assert_eq!(result.centroid, Vec3::new(1.0, -2.0, 3.0));
    assert_eq!(result.extent, Vec3::ZERO);
}

#[test]
fn test_merge_empty_input() {
    assert!(matches!(merge(&[]), Err(CaptureError::EmptyInput)));

    let empty = vec![Keyframe::new(0.0, vec![]), Keyframe::new(1.0, vec![])];
    assert!(matches!(merge(&empty), Err(CaptureError::EmptyInput)));
}

#[test]
fn test_merge_skips_empty_keyframes() {
    let keyframes = vec![
        Keyframe::new(0.0, vec![]),
        Keyframe::new(1.0, vec![Vec3::new(1.0, 1.0, 1.0), Vec3::new(3.0, 3.0, 3.0)]),
    ];
    let result = merge(&keyframes).unwrap();
    assert_eq!(result.point_count, 2);
    assert_eq!(result.centroid, Vec3::splat(2.0));
}

#[test]
fn test_keyframe_store_indices() {
    let mut store = KeyframeStore::new();
    assert!(store.is_empty());
    assert_eq!(store.push(Keyframe::new(0.0, vec![Vec3::ONE])), 0);
    assert_eq!(store.push(Keyframe::new(1.0, vec![Vec3::ZERO, Vec3::ONE])), 1);
    assert_eq!(store.len(), 2);
    assert_eq!(store.point_count(), 3);
    assert_eq!(store.get(1).map(|k| k.timestamp), Some(1.0));
    assert!(store.get(2).is_none());

    let result = store.merge().unwrap();
    assert_eq!(result.point_count, 3);
}
