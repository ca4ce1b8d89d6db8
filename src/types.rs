use nalgebra as na;
use serde::{Deserialize, Serialize};

use crate::error::CaptureError;

/// Named reference frames reported by the motion tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CoordinateFrame {
    StartOfService,
    Device,
    Imu,
    CameraColor,
    CameraDepth,
}

/// A (base, target) pair: the pose maps points from `target` into `base`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FramePair {
    pub base: CoordinateFrame,
    pub target: CoordinateFrame,
}

impl FramePair {
    pub const fn new(base: CoordinateFrame, target: CoordinateFrame) -> FramePair {
        FramePair { base, target }
    }

    /// World from device, the pair used for depth clouds.
    pub const WORLD_FROM_DEVICE: FramePair =
        FramePair::new(CoordinateFrame::StartOfService, CoordinateFrame::Device);

    /// World from color camera, the pair used for the render camera.
    pub const WORLD_FROM_COLOR: FramePair =
        FramePair::new(CoordinateFrame::StartOfService, CoordinateFrame::CameraColor);
}

/// Rigid transform between two named frames.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pose {
    pub rotation: na::UnitQuaternion<f64>,
    pub translation: na::Vector3<f64>,
}

impl Pose {
    pub fn new(rotation: na::UnitQuaternion<f64>, translation: na::Vector3<f64>) -> Pose {
        Pose {
            rotation,
            translation,
        }
    }

    pub fn identity() -> Pose {
        Pose::new(na::UnitQuaternion::identity(), na::Vector3::zeros())
    }

    /// Builds a pose from a translation and an `[x, y, z, w]` quaternion.
    ///
    /// The quaternion is normalized; a zero or non-finite quaternion is rejected.
    pub fn from_translation_xyzw(
        translation: &[f64; 3],
        rotation_xyzw: &[f64; 4],
    ) -> Result<Pose, CaptureError> {
        let [x, y, z, w] = *rotation_xyzw;
        let q = na::Quaternion::new(w, x, y, z);
        let norm = q.norm();
        if !norm.is_finite() || norm < f64::EPSILON {
            return Err(CaptureError::InvalidRotation);
        }
        if (norm - 1.0).abs() > 1e-3 {
            log::debug!("normalizing rotation with magnitude {}", norm);
        }
        Ok(Pose::new(
            na::UnitQuaternion::from_quaternion(q),
            na::Vector3::from_column_slice(translation),
        ))
    }

    /// Rotation as `[x, y, z, w]`.
    pub fn rotation_xyzw(&self) -> [f64; 4] {
        let q = self.rotation.quaternion();
        [q.i, q.j, q.k, q.w]
    }

    pub fn to_na_isometry3(&self) -> na::Isometry3<f64> {
        na::Isometry3::from_parts(na::Translation3::from(self.translation), self.rotation)
    }

    pub fn inverse(&self) -> Pose {
        self.to_na_isometry3().inverse().to_pose()
    }

    /// `self * other`: maps points from `other`'s target frame into `self`'s base frame.
    pub fn compose(&self, other: &Pose) -> Pose {
        (self.to_na_isometry3() * other.to_na_isometry3()).to_pose()
    }

    pub fn transform_point(&self, p: &glam::Vec3) -> glam::Vec3 {
        let q = self.to_na_isometry3() * na::Point3::new(p.x as f64, p.y as f64, p.z as f64);
        glam::Vec3::new(q.x as f32, q.y as f32, q.z as f32)
    }
}

impl Default for Pose {
    fn default() -> Self {
        Pose::identity()
    }
}

pub trait ToPose {
    fn to_pose(&self) -> Pose;
}

impl ToPose for na::Isometry3<f64> {
    fn to_pose(&self) -> Pose {
        Pose::new(self.rotation, self.translation.vector)
    }
}

/// Tracking status attached to every pose query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PoseStatus {
    Initializing,
    Valid,
    Invalid,
    Unknown,
}

/// A pose as answered by the motion tracker.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PoseData {
    pub timestamp: f64,
    pub status: PoseStatus,
    pub pose: Pose,
}

impl PoseData {
    pub fn valid(timestamp: f64, pose: Pose) -> PoseData {
        PoseData {
            timestamp,
            status: PoseStatus::Valid,
            pose,
        }
    }

    pub fn invalid(timestamp: f64) -> PoseData {
        PoseData {
            timestamp,
            status: PoseStatus::Invalid,
            pose: Pose::identity(),
        }
    }

    pub fn is_valid(&self) -> bool {
        self.status == PoseStatus::Valid
    }

    /// The pose if tracking was valid, `InvalidPose` otherwise.
    pub fn into_valid(self) -> Result<Pose, CaptureError> {
        if self.is_valid() {
            Ok(self.pose)
        } else {
            Err(CaptureError::InvalidPose {
                timestamp: self.timestamp,
            })
        }
    }
}

/// View transform handed to the renderer.
///
/// Renderers using a left-handed quaternion convention expect the conjugate
/// of the device-to-world rotation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RenderPose {
    pub rotation: na::UnitQuaternion<f64>,
    pub position: na::Vector3<f64>,
}

impl RenderPose {
    pub fn from_pose(pose: &Pose) -> RenderPose {
        RenderPose {
            rotation: pose.rotation.conjugate(),
            position: pose.translation,
        }
    }
}

/// Serialized form of a pose, rotation stored as `[x, y, z, w]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoseRecord {
    pub translation: [f64; 3],
    pub rotation: [f64; 4],
}

impl PoseRecord {
    pub fn to_pose(&self) -> Result<Pose, CaptureError> {
        Pose::from_translation_xyzw(&self.translation, &self.rotation)
    }
}

impl From<&Pose> for PoseRecord {
    fn from(pose: &Pose) -> Self {
        PoseRecord {
            translation: [pose.translation.x, pose.translation.y, pose.translation.z],
            rotation: pose.rotation_xyzw(),
        }
    }
}

impl Default for PoseRecord {
    fn default() -> Self {
        PoseRecord::from(&Pose::identity())
    }
}
