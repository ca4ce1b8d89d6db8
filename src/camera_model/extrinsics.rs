use crate::error::CaptureError;
use crate::types::{CoordinateFrame, FramePair, Pose, PoseData};

/// Fixed transforms between the device body and its rigidly attached cameras.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DeviceExtrinsics {
    pub device_t_depth: Pose,
    pub device_t_color: Pose,
}

impl DeviceExtrinsics {
    pub fn new(device_t_depth: Pose, device_t_color: Pose) -> DeviceExtrinsics {
        DeviceExtrinsics {
            device_t_depth,
            device_t_color,
        }
    }

    pub fn identity() -> DeviceExtrinsics {
        DeviceExtrinsics::new(Pose::identity(), Pose::identity())
    }

    /// Builds the extrinsics from the IMU-relative poses of the device and both cameras.
    ///
    /// `device_T_x = inverse(imu_T_device) * imu_T_x`
    pub fn from_imu_poses(
        imu_t_device: &Pose,
        imu_t_color: &Pose,
        imu_t_depth: &Pose,
    ) -> DeviceExtrinsics {
        let device_t_imu = imu_t_device.inverse();
        DeviceExtrinsics {
            device_t_depth: device_t_imu.compose(imu_t_depth),
            device_t_color: device_t_imu.compose(imu_t_color),
        }
    }

    /// Queries the IMU-relative poses from a motion tracker.
    ///
    /// Extrinsics do not change over time, so they are queried at timestamp zero.
    pub fn query<F>(mut pose_at_time: F) -> Result<DeviceExtrinsics, CaptureError>
    where
        F: FnMut(f64, FramePair) -> PoseData,
    {
        let mut imu_t = |target: CoordinateFrame| {
            pose_at_time(0.0, FramePair::new(CoordinateFrame::Imu, target)).into_valid()
        };
        let imu_t_color = imu_t(CoordinateFrame::CameraColor)?;
        let imu_t_depth = imu_t(CoordinateFrame::CameraDepth)?;
        let imu_t_device = imu_t(CoordinateFrame::Device)?;
        Ok(DeviceExtrinsics::from_imu_poses(
            &imu_t_device,
            &imu_t_color,
            &imu_t_depth,
        ))
    }

    /// World from depth camera, given the device pose in world.
    pub fn world_t_depth(&self, world_t_device: &Pose) -> Pose {
        world_t_device.compose(&self.device_t_depth)
    }

    /// World from color camera, given the device pose in world.
    pub fn world_t_color(&self, world_t_device: &Pose) -> Pose {
        world_t_device.compose(&self.device_t_color)
    }
}

impl Default for DeviceExtrinsics {
    fn default() -> Self {
        DeviceExtrinsics::identity()
    }
}
