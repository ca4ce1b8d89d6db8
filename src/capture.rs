use glam::{IVec2, Vec3};

use crate::camera_model::{CameraModel, DeviceExtrinsics, Intrinsics};
use crate::keyframe::{Keyframe, RawPointCloud};
use crate::region::SelectionRegion;
use crate::types::Pose;

/// Camera-space point for every pixel a retained point projected to.
#[derive(Debug, Clone)]
pub struct PositionBuffer {
    width: u32,
    height: u32,
    positions: Vec<Option<Vec3>>,
}

impl PositionBuffer {
    pub fn new(width: u32, height: u32) -> PositionBuffer {
        PositionBuffer {
            width,
            height,
            positions: vec![None; width as usize * height as usize],
        }
    }

    fn index(&self, pixel: IVec2) -> Option<usize> {
        if pixel.x < 0 || pixel.y < 0 || pixel.x >= self.width as i32 || pixel.y >= self.height as i32
        {
            return None;
        }
        Some(pixel.y as usize * self.width as usize + pixel.x as usize)
    }

    /// Out-of-image pixels are ignored. A later point overwrites an earlier one.
    pub fn set(&mut self, pixel: IVec2, position: Vec3) {
        if let Some(idx) = self.index(pixel) {
            self.positions[idx] = Some(position);
        }
    }

    pub fn get(&self, pixel: IVec2) -> Option<Vec3> {
        self.index(pixel).and_then(|idx| self.positions[idx])
    }

    pub fn filled(&self) -> usize {
        self.positions.iter().filter(|p| p.is_some()).count()
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }
}

pub struct CaptureOutput {
    /// Retained points, camera space, in input order.
    pub camera_points: Vec<Vec3>,
    /// Retained points, world space, in input order.
    pub keyframe: Keyframe,
    pub positions: PositionBuffer,
}

/// Crops a raw depth cloud to the selection and moves the kept points to world space.
///
/// A point is kept when it projects (`z > 0`) to a pixel inside `region`, bounds
/// inclusive. Kept points are transformed with `pose * extrinsics.device_t_depth`.
/// Nothing kept still yields a valid, empty keyframe.
pub fn capture(
    raw: &RawPointCloud,
    pose: &Pose,
    extrinsics: &DeviceExtrinsics,
    intrinsics: &Intrinsics,
    region: &SelectionRegion,
) -> CaptureOutput {
    let world_t_depth = extrinsics.world_t_depth(pose);
    let points: Vec<Vec3> = raw.points().collect();
    let pixels = intrinsics.project(&points);

    let mut positions = PositionBuffer::new(intrinsics.width, intrinsics.height);
    let mut camera_points = Vec::new();
    let mut world_points = Vec::new();
    let mut max_pixel = IVec2::ZERO;
    let mut degenerate = 0usize;

    for (p, pixel) in points.iter().zip(pixels) {
        let Ok(pixel) = pixel else {
            degenerate += 1;
            continue;
        };
        max_pixel = max_pixel.max(pixel);
        if !region.contains(pixel) {
            continue;
        }
        positions.set(pixel, *p);
        camera_points.push(*p);
        world_points.push(world_t_depth.transform_point(p));
    }

    log::debug!(
        "captured {} of {} points at {:.6} (max pixel {:?}, {} behind camera)",
        world_points.len(),
        raw.len(),
        raw.timestamp,
        max_pixel,
        degenerate
    );

    CaptureOutput {
        camera_points,
        keyframe: Keyframe::new(raw.timestamp, world_points),
        positions,
    }
}
