pub mod camera_model;
pub mod capture;
pub mod config;
pub mod data_loader;
pub mod error;
pub mod io;
pub mod keyframe;
pub mod region;
pub mod session;
pub mod types;

#[cfg(feature = "visualization")]
pub mod visualization;

pub use capture::{CaptureOutput, capture};
pub use error::CaptureError;
pub use keyframe::{Keyframe, MergeResult, RawPointCloud, merge};
pub use region::SelectionRegion;
pub use session::{ArSession, SceneRenderer, SensorProvider, TickOutcome};
