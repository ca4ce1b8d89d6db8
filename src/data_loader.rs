use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use glob::glob;
use indicatif::ParallelProgressIterator;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::camera_model::{DeviceExtrinsics, Intrinsics};
use crate::error::CaptureError;
use crate::io::{object_from_json, object_to_json};
use crate::keyframe::RawPointCloud;
use crate::session::SensorProvider;
use crate::types::{CoordinateFrame, FramePair, Pose, PoseData, PoseRecord};

const METADATA_FILE: &str = "session.json";
const FRAMES_DIR: &str = "frames";
const TIMESTAMP_TOLERANCE: f64 = 1e-6;

/// Per-session sensor calibration stored next to the frames.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingMetadata {
    pub intrinsics: Intrinsics,
    #[serde(default)]
    pub imu_t_device: PoseRecord,
    #[serde(default)]
    pub imu_t_color: PoseRecord,
    #[serde(default)]
    pub imu_t_depth: PoseRecord,
}

/// One depth sample with the device pose it was taken at.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordedFrame {
    pub timestamp: f64,
    pub device_pose: PoseRecord,
    #[serde(default = "default_pose_valid")]
    pub pose_valid: bool,
    pub xyz: Vec<f32>,
}

fn default_pose_valid() -> bool {
    true
}

#[derive(Debug, Clone)]
pub struct Recording {
    pub metadata: RecordingMetadata,
    /// Sorted by timestamp.
    pub frames: Vec<RecordedFrame>,
}

/// Frame files are named by their timestamp in nanoseconds.
fn frame_file_name(timestamp: f64) -> String {
    format!("{:019}.json", (timestamp * 1e9).round() as i64)
}

fn json_filter(rp: glob::GlobResult) -> Option<PathBuf> {
    match rp {
        Ok(p) if p.extension().is_some_and(|ext| ext == "json") => Some(p),
        _ => None,
    }
}

/// Loads a recording folder: `session.json` plus `frames/*.json`.
///
/// Frames are parsed in parallel and returned in timestamp order.
pub fn load_recording(root_folder: impl AsRef<Path>) -> Result<Recording, CaptureError> {
    let root = root_folder.as_ref();
    let metadata: RecordingMetadata = object_from_json(root.join(METADATA_FILE))?;

    let pattern = root.join(FRAMES_DIR).join("*.json");
    let mut sorted_path: Vec<PathBuf> = glob(&pattern.to_string_lossy())?
        .filter_map(json_filter)
        .collect();
    sorted_path.sort();
    log::trace!("loading {} frames from {}", sorted_path.len(), root.display());

    let mut frames = sorted_path
        .par_iter()
        .progress_count(sorted_path.len() as u64)
        .map(|path| object_from_json::<RecordedFrame>(path))
        .collect::<Result<Vec<_>, _>>()?;
    frames.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));

    Ok(Recording { metadata, frames })
}

/// Writes a recording in the layout `load_recording` reads.
pub fn save_recording(root_folder: impl AsRef<Path>, recording: &Recording) -> Result<(), CaptureError> {
    let root = root_folder.as_ref();
    let frames_dir = root.join(FRAMES_DIR);
    std::fs::create_dir_all(&frames_dir)?;
    object_to_json(root.join(METADATA_FILE), &recording.metadata)?;
    for frame in &recording.frames {
        object_to_json(frames_dir.join(frame_file_name(frame.timestamp)), frame)?;
    }
    Ok(())
}

/// Plays a recording back as if it came from a live motion tracker.
///
/// [`ReplaySensor::advance`] delivers the next frame; pose queries answer from
/// the recorded device poses and the stored extrinsics.
pub struct ReplaySensor {
    intrinsics: Intrinsics,
    imu_t_device: Pose,
    imu_t_color: Pose,
    imu_t_depth: Pose,
    extrinsics: DeviceExtrinsics,
    timestamps: Vec<f64>,
    device_poses: Vec<Option<Pose>>,
    clouds: Vec<Vec<f32>>,
    delivered: AtomicUsize,
    texture_id: Mutex<Option<u32>>,
}

impl ReplaySensor {
    pub fn new(recording: Recording) -> Result<ReplaySensor, CaptureError> {
        let meta = &recording.metadata;
        let imu_t_device = meta.imu_t_device.to_pose()?;
        let imu_t_color = meta.imu_t_color.to_pose()?;
        let imu_t_depth = meta.imu_t_depth.to_pose()?;
        let mut frames = recording.frames;
        frames.sort_by(|a, b| a.timestamp.total_cmp(&b.timestamp));

        let mut timestamps = Vec::with_capacity(frames.len());
        let mut device_poses = Vec::with_capacity(frames.len());
        let mut clouds = Vec::with_capacity(frames.len());
        for frame in frames {
            let pose = if frame.pose_valid {
                Some(frame.device_pose.to_pose()?)
            } else {
                None
            };
            timestamps.push(frame.timestamp);
            device_poses.push(pose);
            clouds.push(frame.xyz);
        }

        Ok(ReplaySensor {
            intrinsics: meta.intrinsics,
            imu_t_device,
            imu_t_color,
            imu_t_depth,
            extrinsics: DeviceExtrinsics::from_imu_poses(&imu_t_device, &imu_t_color, &imu_t_depth),
            timestamps,
            device_poses,
            clouds,
            delivered: AtomicUsize::new(0),
            texture_id: Mutex::new(None),
        })
    }

    pub fn frame_count(&self) -> usize {
        self.timestamps.len()
    }

    pub fn remaining(&self) -> usize {
        self.frame_count()
            .saturating_sub(self.delivered.load(Ordering::Acquire))
    }

    /// Delivers the next recorded depth sample, `None` once the recording is exhausted.
    pub fn advance(&self) -> Option<RawPointCloud> {
        let idx = self.delivered.fetch_add(1, Ordering::AcqRel);
        let timestamp = *self.timestamps.get(idx)?;
        Some(RawPointCloud::from_xyz(timestamp, self.clouds[idx].clone()))
    }

    pub fn connected_texture(&self) -> Option<u32> {
        *self.texture_id.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn device_pose_at(&self, timestamp: f64) -> Option<Pose> {
        let idx = self.timestamps.partition_point(|t| *t < timestamp - TIMESTAMP_TOLERANCE);
        match self.timestamps.get(idx) {
            Some(t) if (t - timestamp).abs() <= TIMESTAMP_TOLERANCE => self.device_poses[idx],
            _ => None,
        }
    }

    fn imu_t(&self, target: CoordinateFrame) -> Option<Pose> {
        match target {
            CoordinateFrame::Imu => Some(Pose::identity()),
            CoordinateFrame::Device => Some(self.imu_t_device),
            CoordinateFrame::CameraColor => Some(self.imu_t_color),
            CoordinateFrame::CameraDepth => Some(self.imu_t_depth),
            CoordinateFrame::StartOfService => None,
        }
    }
}

impl SensorProvider for ReplaySensor {
    fn intrinsics(&self) -> Option<Intrinsics> {
        Some(self.intrinsics)
    }

    fn pose_at_time(&self, timestamp: f64, frames: FramePair) -> PoseData {
        let pose = match frames.base {
            CoordinateFrame::Imu => self.imu_t(frames.target),
            CoordinateFrame::StartOfService => {
                self.device_pose_at(timestamp)
                    .and_then(|world_t_device| match frames.target {
                        CoordinateFrame::Device => Some(world_t_device),
                        CoordinateFrame::CameraColor => {
                            Some(self.extrinsics.world_t_color(&world_t_device))
                        }
                        CoordinateFrame::CameraDepth => {
                            Some(self.extrinsics.world_t_depth(&world_t_device))
                        }
                        _ => None,
                    })
            }
            _ => None,
        };
        match pose {
            Some(pose) => PoseData::valid(timestamp, pose),
            None => PoseData::invalid(timestamp),
        }
    }

    fn connect_texture(&self, texture_id: u32) {
        *self.texture_id.lock().unwrap_or_else(|e| e.into_inner()) = Some(texture_id);
    }

    /// Timestamp of the most recently delivered frame.
    fn update_texture(&self) -> f64 {
        let delivered = self.delivered.load(Ordering::Acquire).min(self.frame_count());
        delivered
            .checked_sub(1)
            .map_or(0.0, |idx| self.timestamps[idx])
    }
}
