pub mod extrinsics;
pub mod generic;
pub mod pinhole;

pub use extrinsics::DeviceExtrinsics;
pub use generic::CameraModel;
pub use pinhole::Intrinsics;
