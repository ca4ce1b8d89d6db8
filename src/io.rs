use std::path::Path;

use serde::{Serialize, de::DeserializeOwned};

use crate::error::CaptureError;
use crate::keyframe::MergeResult;

/// Serializes an object to a JSON file.
pub fn object_to_json<T: Serialize>(output_path: impl AsRef<Path>, object: &T) -> Result<(), CaptureError> {
    let j = serde_json::to_string_pretty(object)?;
    std::fs::write(output_path, j)?;
    Ok(())
}

/// Deserializes an object from a JSON file.
pub fn object_from_json<T: DeserializeOwned>(file_path: impl AsRef<Path>) -> Result<T, CaptureError> {
    let contents = std::fs::read_to_string(file_path)?;
    Ok(serde_json::from_str(&contents)?)
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct MergeReport {
    pub keyframe_count: usize,
    pub point_count: usize,
    pub centroid: [f32; 3],
    pub extent: [f32; 3],
    pub bounds_min: [f32; 3],
    pub bounds_max: [f32; 3],
}

impl MergeReport {
    pub fn new(keyframe_count: usize, merge: &MergeResult) -> MergeReport {
        MergeReport {
            keyframe_count,
            point_count: merge.point_count,
            centroid: merge.centroid.to_array(),
            extent: merge.extent.to_array(),
            bounds_min: merge.bounds.min.to_array(),
            bounds_max: merge.bounds.max.to_array(),
        }
    }
}

/// Writes the merge result of a session as pretty JSON.
pub fn write_merge_report(
    output_path: impl AsRef<Path>,
    keyframe_count: usize,
    merge: &MergeResult,
) -> Result<(), CaptureError> {
    let report = MergeReport::new(keyframe_count, merge);
    log::info!(
        "merge report: {} keyframes, {} points",
        report.keyframe_count,
        report.point_count
    );
    object_to_json(output_path, &report)
}
