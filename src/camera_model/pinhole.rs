use super::generic::CameraModel;
use glam::{IVec2, Vec3};
use nalgebra as na;
use serde::{Deserialize, Serialize};

/// Pinhole camera parameters, fixed for a session.
///
/// No distortion is modeled.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Intrinsics {
    pub width: u32,
    pub height: u32,
    pub fx: f64,
    pub fy: f64,
    pub cx: f64,
    pub cy: f64,
}

impl Intrinsics {
    pub fn new(width: u32, height: u32, fx: f64, fy: f64, cx: f64, cy: f64) -> Intrinsics {
        Intrinsics {
            width,
            height,
            fx,
            fy,
            cx,
            cy,
        }
    }

    /// OpenGL projection matrix whose frustum matches this camera.
    ///
    /// A renderer drawing on top of the color image uses it so virtual
    /// content lines up with the pixels.
    pub fn projection_matrix(&self, near: f64, far: f64) -> na::Matrix4<f64> {
        let width = self.width as f64;
        let height = self.height as f64;
        let x_scale = near / self.fx;
        let y_scale = near / self.fy;
        let x_offset = (self.cx - width / 2.0) * x_scale;
        // OpenGL y points up, image y points down
        let y_offset = -(self.cy - height / 2.0) * y_scale;

        frustum(
            x_scale * -width / 2.0 - x_offset,
            x_scale * width / 2.0 - x_offset,
            y_scale * -height / 2.0 - y_offset,
            y_scale * height / 2.0 - y_offset,
            near,
            far,
        )
    }
}

#[rustfmt::skip]
fn frustum(left: f64, right: f64, bottom: f64, top: f64, near: f64, far: f64) -> na::Matrix4<f64> {
    let rl = right - left;
    let tb = top - bottom;
    let fnear = far - near;
    na::Matrix4::new(
        2.0 * near / rl, 0.0,             (right + left) / rl,  0.0,
        0.0,             2.0 * near / tb, (top + bottom) / tb,  0.0,
        0.0,             0.0,             -(far + near) / fnear, -2.0 * far * near / fnear,
        0.0,             0.0,             -1.0,                 0.0,
    )
}

impl CameraModel for Intrinsics {
    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn project_one(&self, pt: &Vec3) -> Option<IVec2> {
        if !pt.is_finite() || pt.z <= 0.0 {
            return None;
        }
        let x = pt.x as f64 / pt.z as f64;
        let y = pt.y as f64 / pt.z as f64;
        let px = self.fx * x + self.cx;
        let py = self.fy * y + self.cy;
        // `as` truncates toward zero
        Some(IVec2::new(px as i32, py as i32))
    }
}
