use approx::assert_relative_eq;
use nalgebra as na;
use pointcloud_capture::camera_model::Intrinsics;
use pointcloud_capture::data_loader::{
    RecordedFrame, Recording, RecordingMetadata, ReplaySensor, load_recording, save_recording,
};
use pointcloud_capture::types::{CoordinateFrame, FramePair, Pose, PoseRecord};
use pointcloud_capture::SensorProvider;
use tempfile::tempdir;

fn pose_xyz(x: f64, y: f64, z: f64) -> Pose {
    Pose::new(na::UnitQuaternion::identity(), na::Vector3::new(x, y, z))
}

fn sample_recording() -> Recording {
    let frame = |timestamp: f64, x: f64, pose_valid: bool| RecordedFrame {
        timestamp,
        device_pose: PoseRecord::from(&pose_xyz(x, 0.0, 0.0)),
        pose_valid,
        xyz: vec![0.0, 0.0, 1.0, 0.1, 0.2, 2.0],
    };
    Recording {
        metadata: RecordingMetadata {
            intrinsics: Intrinsics::new(640, 480, 500.0, 500.0, 320.0, 240.0),
            imu_t_device: PoseRecord::default(),
            imu_t_color: PoseRecord::from(&pose_xyz(0.0, 0.0, 0.5)),
            imu_t_depth: PoseRecord::from(&pose_xyz(0.0, 0.0, 0.25)),
        },
        // out of order on purpose
        frames: vec![frame(2.0, 2.0, false), frame(1.0, 1.0, true), frame(3.0, 3.0, true)],
    }
}

#[test]
fn test_save_and_load_recording() {
    let dir = tempdir().unwrap();
    save_recording(dir.path(), &sample_recording()).unwrap();
    assert!(dir.path().join("session.json").exists());
    assert!(dir.path().join("frames").is_dir());

    let loaded = load_recording(dir.path()).unwrap();
    let timestamps: Vec<f64> = loaded.frames.iter().map(|f| f.timestamp).collect();
    assert_eq!(timestamps, vec![1.0, 2.0, 3.0]);
    assert_eq!(loaded.metadata.intrinsics.width, 640);
    assert!(!loaded.frames[1].pose_valid);
    assert_eq!(loaded.frames[0].xyz.len(), 6);
}

#[test]
fn test_load_missing_recording() {
    let dir = tempdir().unwrap();
    assert!(load_recording(dir.path().join("nothing here")).is_err());
}

#[test]
fn test_pose_valid_defaults_to_true() {
    let json = r#"{
        "timestamp": 0.5,
        "device_pose": { "translation": [0.0, 0.0, 0.0], "rotation": [0.0, 0.0, 0.0, 1.0] },
        "xyz": []
    }"#;
    let frame: RecordedFrame = serde_json::from_str(json).unwrap();
    assert!(frame.pose_valid);
}

#[test]
fn test_replay_delivers_frames_in_order() {
    let sensor = ReplaySensor::new(sample_recording()).unwrap();
    assert_eq!(sensor.frame_count(), 3);
    assert_eq!(sensor.update_texture(), 0.0);

    let first = sensor.advance().unwrap();
    assert_eq!(first.timestamp, 1.0);
    assert_eq!(first.len(), 2);
    assert_eq!(sensor.update_texture(), 1.0);
    assert_eq!(sensor.remaining(), 2);

    assert_eq!(sensor.advance().unwrap().timestamp, 2.0);
    assert_eq!(sensor.advance().unwrap().timestamp, 3.0);
    assert!(sensor.advance().is_none());
    assert_eq!(sensor.remaining(), 0);
    assert_eq!(sensor.update_texture(), 3.0);
}

#[test]
fn test_replay_pose_queries() {
    let sensor = ReplaySensor::new(sample_recording()).unwrap();

    let device = sensor.pose_at_time(1.0, FramePair::WORLD_FROM_DEVICE);
    assert!(device.is_valid());
    assert_relative_eq!(device.pose.translation, na::Vector3::new(1.0, 0.0, 0.0));

    // color camera sits 0.5 in front of the device
    let color = sensor.pose_at_time(3.0, FramePair::WORLD_FROM_COLOR);
    assert_relative_eq!(color.pose.translation, na::Vector3::new(3.0, 0.0, 0.5));

    let depth = sensor.pose_at_time(
        3.0,
        FramePair::new(CoordinateFrame::StartOfService, CoordinateFrame::CameraDepth),
    );
    assert_relative_eq!(depth.pose.translation, na::Vector3::new(3.0, 0.0, 0.25));

    // lost tracking and unknown timestamps
    assert!(!sensor.pose_at_time(2.0, FramePair::WORLD_FROM_DEVICE).is_valid());
    assert!(!sensor.pose_at_time(1.5, FramePair::WORLD_FROM_DEVICE).is_valid());
    assert!(sensor.pose_at_time(1.0 + 1e-9, FramePair::WORLD_FROM_DEVICE).is_valid());

    let imu_t_color = sensor.pose_at_time(0.0, FramePair::new(CoordinateFrame::Imu, CoordinateFrame::CameraColor));
    assert!(imu_t_color.is_valid());
    assert_relative_eq!(imu_t_color.pose.translation, na::Vector3::new(0.0, 0.0, 0.5));
    assert!(
        !sensor
            .pose_at_time(0.0, FramePair::new(CoordinateFrame::Device, CoordinateFrame::Imu))
            .is_valid()
    );
}

#[test]
fn test_replay_texture_connection() {
    let sensor = ReplaySensor::new(sample_recording()).unwrap();
    assert_eq!(sensor.connected_texture(), None);
    sensor.connect_texture(3);
    assert_eq!(sensor.connected_texture(), Some(3));
}

#[test]
fn test_replay_rejects_bad_rotation() {
    let mut recording = sample_recording();
    recording.frames[1].device_pose.rotation = [0.0; 4];
    assert!(ReplaySensor::new(recording).is_err());
}
