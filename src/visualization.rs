use rand::prelude::*;
use rand_chacha::ChaCha8Rng;
use rerun::RecordingStream;

use crate::camera_model::Intrinsics;
use crate::keyframe::{Keyframe, MergeResult, RawPointCloud};
use crate::session::SceneRenderer;
use crate::types::{Pose, RenderPose};

const DEPTH_TOPIC: &str = "world/depth_camera";
const CAMERA_TOPIC: &str = "world/camera";
const KEYFRAME_TOPIC: &str = "world/keyframes";
const MERGE_TOPIC: &str = "world/merge";

/// Stable pseudo-random color per id.
pub fn id_to_color(id: usize) -> (u8, u8, u8, u8) {
    let mut rng = ChaCha8Rng::seed_from_u64(id as u64);
    let color_num = rng.random_range(0..2u32.pow(24));
    (
        ((color_num >> 16) % 256) as u8,
        ((color_num >> 8) % 256) as u8,
        (color_num % 256) as u8,
        255,
    )
}

fn to_rerun_color(c: (u8, u8, u8, u8)) -> rerun::Color {
    rerun::Color::from_unmultiplied_rgba(c.0, c.1, c.2, c.3)
}

fn to_rerun_transform(rotation: &nalgebra::UnitQuaternion<f64>, translation: &nalgebra::Vector3<f64>) -> rerun::Transform3D {
    let q = rotation.quaternion();
    rerun::Transform3D::from_translation_rotation(
        [translation.x as f32, translation.y as f32, translation.z as f32],
        rerun::Quaternion::from_xyzw([q.i as f32, q.j as f32, q.k as f32, q.w as f32]),
    )
}

/// Scene renderer that streams everything to a rerun recording.
///
/// rerun has no camera texture, so `texture_id` stays `None`.
pub struct RerunScene {
    recording: RecordingStream,
    tick: i64,
    visible: bool,
}

impl RerunScene {
    pub fn new(recording: RecordingStream) -> RerunScene {
        RerunScene {
            recording,
            tick: 0,
            visible: true,
        }
    }

    /// Advances the timeline all following logs are attached to.
    pub fn set_tick(&mut self, tick: i64) {
        self.tick = tick;
        self.recording
            .set_time("tick", rerun::TimeCell::from_sequence(tick));
    }

    fn log<AS: ?Sized + rerun::AsComponents>(&self, topic: &str, archetype: &AS) {
        if let Err(e) = self.recording.log(topic, archetype) {
            log::warn!("failed to log {} at tick {}: {}", topic, self.tick, e);
        }
    }
}

impl SceneRenderer for RerunScene {
    fn update_point_cloud(&mut self, cloud: &RawPointCloud, world_t_depth: &Pose) {
        self.log(
            DEPTH_TOPIC,
            &to_rerun_transform(&world_t_depth.rotation, &world_t_depth.translation),
        );
        if !self.visible {
            return;
        }
        let pts: Vec<[f32; 3]> = cloud.points().map(|p| p.to_array()).collect();
        self.log(
            &format!("{}/points", DEPTH_TOPIC),
            &rerun::Points3D::new(pts).with_radii([rerun::Radius::new_ui_points(1.5)]),
        );
    }

    fn add_keyframe(&mut self, index: usize, keyframe: &Keyframe) {
        let color = to_rerun_color(id_to_color(index));
        let pts: Vec<[f32; 3]> = keyframe.points().iter().map(|p| p.to_array()).collect();
        self.log(
            &format!("{}/{}", KEYFRAME_TOPIC, index),
            &rerun::Points3D::new(pts)
                .with_colors([color])
                .with_radii([rerun::Radius::new_ui_points(2.0)]),
        );
    }

    fn add_bounding_box(&mut self, merge: &MergeResult) {
        self.log(
            MERGE_TOPIC,
            &rerun::Boxes3D::from_centers_and_half_sizes(
                [merge.centroid.to_array()],
                [merge.extent.to_array()],
            )
            .with_colors([rerun::Color::from_rgb(0, 0x99, 0)]),
        );
        self.log(
            &format!("{}/bounds", MERGE_TOPIC),
            &rerun::Boxes3D::from_centers_and_half_sizes(
                [merge.bounds.center().to_array()],
                [merge.bounds.half_size().to_array()],
            ),
        );
    }

    fn set_camera_pose(&mut self, pose: &RenderPose) {
        // undo the renderer-side conjugation, rerun is right handed
        let rotation = pose.rotation.conjugate();
        self.log(CAMERA_TOPIC, &to_rerun_transform(&rotation, &pose.position));
    }

    fn configure_camera(&mut self, intrinsics: &Intrinsics, _near: f64, _far: f64) {
        self.log(
            CAMERA_TOPIC,
            &rerun::Pinhole::from_focal_length_and_resolution(
                [intrinsics.fx as f32, intrinsics.fy as f32],
                [intrinsics.width as f32, intrinsics.height as f32],
            )
            .with_principal_point([intrinsics.cx as f32, intrinsics.cy as f32]),
        );
    }

    fn set_point_cloud_visible(&mut self, visible: bool) {
        self.visible = visible;
        if !visible {
            self.log(&format!("{}/points", DEPTH_TOPIC), &rerun::Clear::flat());
        }
    }
}
