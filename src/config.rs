use serde::{Deserialize, Serialize};

use crate::region::Resolution;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Resolution of the on-screen view the user drags selections in.
    pub ui_resolution: Resolution,
    /// Depth-map resolution used for rescaling until the sensor reports its intrinsics.
    pub depth_resolution: Resolution,
    pub camera_near: f64,
    pub camera_far: f64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            ui_resolution: Resolution::new(1920, 942),
            depth_resolution: Resolution::new(1280, 720),
            camera_near: 0.01,
            camera_far: 200.0,
        }
    }
}
