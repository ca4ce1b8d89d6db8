use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::error::CaptureError;

/// One depth sample as delivered by the sensor.
///
/// `xyz` holds exactly `3 * count` floats, camera-space, meters.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPointCloud {
    pub timestamp: f64,
    count: usize,
    xyz: Vec<f32>,
}

impl RawPointCloud {
    pub fn new(timestamp: f64, count: usize, mut xyz: Vec<f32>) -> Result<RawPointCloud, CaptureError> {
        let Some(floats) = count.checked_mul(3).filter(|n| *n <= xyz.len()) else {
            return Err(CaptureError::MalformedPointCloud {
                count,
                len: xyz.len(),
            });
        };
        xyz.truncate(floats);
        Ok(RawPointCloud {
            timestamp,
            count,
            xyz,
        })
    }

    /// Takes every complete xyz triple of the buffer.
    pub fn from_xyz(timestamp: f64, mut xyz: Vec<f32>) -> RawPointCloud {
        let count = xyz.len() / 3;
        xyz.truncate(count * 3);
        RawPointCloud {
            timestamp,
            count,
            xyz,
        }
    }

    pub fn from_points(timestamp: f64, points: &[Vec3]) -> RawPointCloud {
        let xyz = points.iter().flat_map(|p| p.to_array()).collect();
        RawPointCloud::from_xyz(timestamp, xyz)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.count
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Exactly `3 * count` floats; trailing floats are dropped on construction.
    pub fn xyz(&self) -> &[f32] {
        &self.xyz
    }

    pub fn points(&self) -> impl Iterator<Item = Vec3> + '_ {
        self.xyz()
            .chunks_exact(3)
            .map(|c| Vec3::new(c[0], c[1], c[2]))
    }
}

/// A user-triggered capture: the selected points in world space.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    pub timestamp: f64,
    points: Vec<Vec3>,
}

impl Keyframe {
    pub fn new(timestamp: f64, points: Vec<Vec3>) -> Keyframe {
        Keyframe { timestamp, points }
    }

    pub fn points(&self) -> &[Vec3] {
        &self.points
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Append-only list of keyframes for one session.
#[derive(Debug, Default, Clone)]
pub struct KeyframeStore {
    keyframes: Vec<Keyframe>,
}

impl KeyframeStore {
    pub fn new() -> KeyframeStore {
        KeyframeStore::default()
    }

    /// Appends a keyframe and returns its index.
    pub fn push(&mut self, keyframe: Keyframe) -> usize {
        self.keyframes.push(keyframe);
        self.keyframes.len() - 1
    }

    pub fn get(&self, index: usize) -> Option<&Keyframe> {
        self.keyframes.get(index)
    }

    pub fn as_slice(&self) -> &[Keyframe] {
        &self.keyframes
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Keyframe> {
        self.keyframes.iter()
    }

    pub fn len(&self) -> usize {
        self.keyframes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    pub fn point_count(&self) -> usize {
        self.keyframes.iter().map(Keyframe::len).sum()
    }

    pub fn merge(&self) -> Result<MergeResult, CaptureError> {
        merge(&self.keyframes)
    }

    pub(crate) fn into_vec(self) -> Vec<Keyframe> {
        self.keyframes
    }
}

/// Symmetric axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    pub min: Vec3,
    pub max: Vec3,
}

impl Aabb {
    pub fn center(&self) -> Vec3 {
        (self.min + self.max) * 0.5
    }

    pub fn half_size(&self) -> Vec3 {
        (self.max - self.min) * 0.5
    }
}

/// Aggregate over every point of every keyframe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MergeResult {
    pub centroid: Vec3,
    /// `|max - centroid|` per axis; only the positive side is measured.
    pub extent: Vec3,
    pub bounds: Aabb,
    pub point_count: usize,
}

/// Centroid and one-sided extent of all keyframe points.
///
/// Fails with `EmptyInput` when the keyframes hold no point at all.
pub fn merge(keyframes: &[Keyframe]) -> Result<MergeResult, CaptureError> {
    let mut count = 0usize;
    let mut sum = [0.0f64; 3];
    let mut min = Vec3::splat(f32::MAX);
    let mut max = Vec3::splat(-f32::MAX);
    for p in keyframes.iter().flat_map(|k| k.points.iter()) {
        count += 1;
        sum[0] += p.x as f64;
        sum[1] += p.y as f64;
        sum[2] += p.z as f64;
        min = min.min(*p);
        max = max.max(*p);
    }
    if count == 0 {
        return Err(CaptureError::EmptyInput);
    }

    let n = count as f64;
    let centroid = Vec3::new(
        (sum[0] / n) as f32,
        (sum[1] / n) as f32,
        (sum[2] / n) as f32,
    );
    let extent = (max - centroid).abs();
    log::debug!(
        "merged {} points from {} keyframes: centroid {:?} extent {:?}",
        count,
        keyframes.len(),
        centroid,
        extent
    );
    Ok(MergeResult {
        centroid,
        extent,
        bounds: Aabb { min, max },
        point_count: count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_point_cloud_too_short() {
        let result = RawPointCloud::new(0.0, 2, vec![0.0; 5]);
        assert!(matches!(
            result,
            Err(CaptureError::MalformedPointCloud { count: 2, len: 5 })
        ));
    }

    #[test]
    fn test_raw_point_cloud_count_overflow() {
        let result = RawPointCloud::new(0.0, usize::MAX / 2, vec![]);
        assert!(matches!(
            result,
            Err(CaptureError::MalformedPointCloud { len: 0, .. })
        ));
        assert!(RawPointCloud::new(0.0, usize::MAX, vec![0.0; 6]).is_err());
    }

    #[test]
    fn test_raw_point_cloud_ignores_trailing_floats() {
        let cloud = RawPointCloud::new(0.0, 1, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let pts: Vec<_> = cloud.points().collect();
        assert_eq!(pts, vec![Vec3::new(1.0, 2.0, 3.0)]);
        assert_eq!(cloud.xyz().len(), 3);
    }

    #[test]
    fn test_aabb() {
        let kf = Keyframe::new(0.0, vec![Vec3::new(-1.0, 0.0, 2.0), Vec3::new(3.0, 4.0, 2.0)]);
        let result = merge(&[kf]).unwrap();
        assert_eq!(result.bounds.min, Vec3::new(-1.0, 0.0, 2.0));
        assert_eq!(result.bounds.max, Vec3::new(3.0, 4.0, 2.0));
        assert_eq!(result.bounds.center(), Vec3::new(1.0, 2.0, 2.0));
        assert_eq!(result.bounds.half_size(), Vec3::new(2.0, 2.0, 0.0));
    }
}
