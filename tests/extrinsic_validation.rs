use approx::assert_relative_eq;
use nalgebra as na;
use pointcloud_capture::camera_model::DeviceExtrinsics;
use pointcloud_capture::types::{CoordinateFrame, FramePair, Pose, PoseData};
use pointcloud_capture::CaptureError;

fn pose(axis_angle: na::Vector3<f64>, translation: na::Vector3<f64>) -> Pose {
    Pose::new(na::UnitQuaternion::from_scaled_axis(axis_angle), translation)
}

#[test]
fn test_identity_imu_poses() {
    let id = Pose::identity();
    let extrinsics = DeviceExtrinsics::from_imu_poses(&id, &id, &id);
    assert_eq!(extrinsics, DeviceExtrinsics::identity());
}

#[test]
fn test_from_imu_poses_composition() {
    let imu_t_device = pose(na::Vector3::new(0.0, 0.0, 0.3), na::Vector3::new(0.1, 0.0, 0.0));
    let imu_t_color = pose(na::Vector3::new(0.1, 0.0, 0.0), na::Vector3::new(0.0, 0.05, 0.0));
    let imu_t_depth = pose(na::Vector3::new(0.0, 0.2, 0.0), na::Vector3::new(0.0, 0.0, 0.02));
    let extrinsics = DeviceExtrinsics::from_imu_poses(&imu_t_device, &imu_t_color, &imu_t_depth);

    // device_t_x maps back onto imu_t_x through imu_t_device
    let color = imu_t_device.compose(&extrinsics.device_t_color);
    assert_relative_eq!(color.translation, imu_t_color.translation, epsilon = 1e-12);
    assert_relative_eq!(color.rotation.angle_to(&imu_t_color.rotation), 0.0, epsilon = 1e-9);

    let depth = imu_t_device.compose(&extrinsics.device_t_depth);
    assert_relative_eq!(depth.translation, imu_t_depth.translation, epsilon = 1e-12);
    assert_relative_eq!(depth.rotation.angle_to(&imu_t_depth.rotation), 0.0, epsilon = 1e-9);
}

#[test]
fn test_query_uses_imu_frame_at_time_zero() {
    let imu_t_depth = pose(na::Vector3::zeros(), na::Vector3::new(0.0, 0.0, 0.1));
    let mut queries = Vec::new();
    let extrinsics = DeviceExtrinsics::query(|t, frames| {
        queries.push((t, frames));
        match frames.target {
            CoordinateFrame::CameraDepth => PoseData::valid(t, imu_t_depth),
            _ => PoseData::valid(t, Pose::identity()),
        }
    })
    .unwrap();

    assert_eq!(queries.len(), 3);
    for (t, frames) in &queries {
        assert_eq!(*t, 0.0);
        assert_eq!(frames.base, CoordinateFrame::Imu);
    }
    assert_relative_eq!(
        extrinsics.device_t_depth.translation,
        na::Vector3::new(0.0, 0.0, 0.1)
    );
    assert_eq!(extrinsics.device_t_color, Pose::identity());
}

#[test]
fn test_query_fails_on_invalid_pose() {
    let result = DeviceExtrinsics::query(|t, frames: FramePair| {
        if frames.target == CoordinateFrame::Device {
            PoseData::invalid(t)
        } else {
            PoseData::valid(t, Pose::identity())
        }
    });
    assert!(matches!(result, Err(CaptureError::InvalidPose { .. })));
}

#[test]
fn test_world_transforms() {
    let extrinsics = DeviceExtrinsics::new(
        pose(na::Vector3::zeros(), na::Vector3::new(0.0, 0.0, 0.1)),
        pose(na::Vector3::zeros(), na::Vector3::new(0.0, 0.0, 0.2)),
    );
    let world_t_device = pose(
        na::Vector3::new(0.0, std::f64::consts::PI, 0.0),
        na::Vector3::new(1.0, 0.0, 0.0),
    );
    // half turn about y flips the z offsets
    let depth = extrinsics.world_t_depth(&world_t_device);
    let color = extrinsics.world_t_color(&world_t_device);
    assert_relative_eq!(depth.translation, na::Vector3::new(1.0, 0.0, -0.1), epsilon = 1e-12);
    assert_relative_eq!(color.translation, na::Vector3::new(1.0, 0.0, -0.2), epsilon = 1e-12);
}
