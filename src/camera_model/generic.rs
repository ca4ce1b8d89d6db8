use glam::{IVec2, Vec3};
use rayon::prelude::*;

use crate::error::CaptureError;

pub trait CameraModel
where
    Self: Sync,
{
    fn width(&self) -> u32;
    fn height(&self) -> u32;

    /// Projects a camera-space point to integer pixel coordinates.
    ///
    /// Returns `None` when the point cannot be projected (on or behind the camera plane).
    fn project_one(&self, pt: &Vec3) -> Option<IVec2>;

    /// Batch projection; unprojectable points come back as `DegenerateProjection`.
    fn project(&self, p3d: &[Vec3]) -> Vec<Result<IVec2, CaptureError>> {
        p3d.par_iter()
            .map(|pt| self.project_one(pt).ok_or(CaptureError::DegenerateProjection))
            .collect()
    }

    /// Like `project_one` over a batch, but drops pixels outside the image.
    fn project_in_image(&self, p3d: &[Vec3]) -> Vec<Option<IVec2>> {
        let (w, h) = (self.width() as i32, self.height() as i32);
        p3d.par_iter()
            .map(|pt| {
                self.project_one(pt)
                    .filter(|p| p.x >= 0 && p.x < w && p.y >= 0 && p.y < h)
            })
            .collect()
    }
}
