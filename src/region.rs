use glam::IVec2;
use serde::{Deserialize, Serialize};

/// Pixel dimensions of a screen or sensor image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Resolution {
        Resolution { width, height }
    }
}

/// Inclusive, axis-aligned pixel rectangle used to crop captured points.
///
/// Pixel origin is the top-left corner, x grows right and y grows down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionRegion {
    pub min: IVec2,
    pub max: IVec2,
}

impl SelectionRegion {
    /// Accepts every non-negative pixel.
    pub const UNBOUNDED: SelectionRegion = SelectionRegion {
        min: IVec2::ZERO,
        max: IVec2::MAX,
    };

    /// An inverted rectangle falls back to `UNBOUNDED`.
    pub fn new(min: IVec2, max: IVec2) -> SelectionRegion {
        if min.x > max.x || min.y > max.y {
            log::warn!(
                "inverted selection {:?} .. {:?}, accepting everything",
                min,
                max
            );
            return SelectionRegion::UNBOUNDED;
        }
        SelectionRegion { min, max }
    }

    /// Bounding rectangle of a set of pixels, `None` when there are none.
    pub fn from_points(points: &[IVec2]) -> Option<SelectionRegion> {
        let first = *points.first()?;
        let (min, max) = points
            .iter()
            .fold((first, first), |(lo, hi), p| (lo.min(*p), hi.max(*p)));
        Some(SelectionRegion { min, max })
    }

    pub fn is_unbounded(&self) -> bool {
        *self == SelectionRegion::UNBOUNDED
    }

    pub fn contains(&self, p: IVec2) -> bool {
        in_region(p.x, p.y, self)
    }

    /// Maps the rectangle from `source` pixels to `target` pixels.
    ///
    /// Each axis is scaled independently with `floor(coord * target / source)`.
    /// The unbounded region stays unbounded.
    pub fn rescale(&self, source: Resolution, target: Resolution) -> SelectionRegion {
        if self.is_unbounded() || source == target {
            return *self;
        }
        if source.width == 0 || source.height == 0 {
            log::warn!("cannot rescale from empty resolution {:?}", source);
            return *self;
        }
        let scale = |p: IVec2| {
            IVec2::new(
                rescale_coord(p.x, source.width, target.width),
                rescale_coord(p.y, source.height, target.height),
            )
        };
        SelectionRegion {
            min: scale(self.min),
            max: scale(self.max),
        }
    }
}

impl Default for SelectionRegion {
    fn default() -> Self {
        SelectionRegion::UNBOUNDED
    }
}

fn rescale_coord(coord: i32, source: u32, target: u32) -> i32 {
    let scaled = (coord as i64 * target as i64).div_euclid(source as i64);
    scaled.clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

/// Inclusive bounds test.
pub fn in_region(px: i32, py: i32, region: &SelectionRegion) -> bool {
    px >= region.min.x && px <= region.max.x && py >= region.min.y && py <= region.max.y
}

/// Pixels recorded while the user drags a selection on screen.
#[derive(Debug, Default, Clone)]
pub struct DragSelection {
    points: Vec<IVec2>,
}

impl DragSelection {
    pub fn new() -> DragSelection {
        DragSelection::default()
    }

    pub fn begin(&mut self) {
        self.points.clear();
    }

    /// Records a drag position, skipping repeats of the last one.
    pub fn record(&mut self, x: i32, y: i32) {
        let p = IVec2::new(x, y);
        if self.points.last() == Some(&p) {
            return;
        }
        self.points.push(p);
    }

    pub fn points(&self) -> &[IVec2] {
        &self.points
    }

    /// Bounding rectangle of the recorded points; the buffer is emptied.
    pub fn commit(&mut self) -> Option<SelectionRegion> {
        let region = SelectionRegion::from_points(&self.points);
        self.points.clear();
        region
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rescale_floors() {
        let region = SelectionRegion::new(IVec2::new(100, 100), IVec2::new(1919, 941));
        let scaled = region.rescale(Resolution::new(1920, 942), Resolution::new(1280, 720));
        assert_eq!(scaled.min, IVec2::new(66, 76));
        assert_eq!(scaled.max, IVec2::new(1279, 719));
    }

    #[test]
    fn test_rescale_unbounded() {
        let scaled =
            SelectionRegion::UNBOUNDED.rescale(Resolution::new(1920, 942), Resolution::new(1280, 720));
        assert!(scaled.is_unbounded());
    }

    #[test]
    fn test_inverted_region_accepts_everything() {
        let region = SelectionRegion::new(IVec2::new(10, 10), IVec2::new(0, 0));
        assert!(region.is_unbounded());
    }
}
