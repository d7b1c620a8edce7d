//! Grid snapping for moved elements.

use kurbo::Point;

/// Default grid size (matches the visual grid of the canvas).
pub const GRID_SIZE: f64 = 20.0;

/// Result of a snap operation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SnapResult {
    /// The snapped point.
    pub point: Point,
    /// Whether the X coordinate was snapped.
    pub snapped_x: bool,
    /// Whether the Y coordinate was snapped.
    pub snapped_y: bool,
}

impl SnapResult {
    /// Create a result with no snapping.
    pub fn none(point: Point) -> Self {
        Self {
            point,
            snapped_x: false,
            snapped_y: false,
        }
    }

    /// Check if any snapping occurred.
    pub fn is_snapped(&self) -> bool {
        self.snapped_x || self.snapped_y
    }
}

/// Snap a point to the nearest grid intersection.
///
/// A non-positive or non-finite grid size leaves the point unchanged.
pub fn snap_to_grid(point: Point, grid_size: f64) -> SnapResult {
    if !grid_size.is_finite() || grid_size <= 0.0 {
        return SnapResult::none(point);
    }
    let snapped = Point::new(
        (point.x / grid_size).round() * grid_size,
        (point.y / grid_size).round() * grid_size,
    );
    SnapResult {
        point: snapped,
        snapped_x: snapped.x != point.x,
        snapped_y: snapped.y != point.y,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snap_to_grid() {
        let result = snap_to_grid(Point::new(27.0, 33.0), 20.0);
        assert_eq!(result.point, Point::new(20.0, 40.0));
        assert!(result.is_snapped());
    }

    #[test]
    fn test_snap_on_grid_point_is_noop() {
        let result = snap_to_grid(Point::new(40.0, 60.0), 20.0);
        assert_eq!(result.point, Point::new(40.0, 60.0));
        assert!(!result.is_snapped());
    }

    #[test]
    fn test_snap_with_invalid_grid() {
        let p = Point::new(13.0, 7.0);
        assert_eq!(snap_to_grid(p, 0.0).point, p);
        assert_eq!(snap_to_grid(p, f64::NAN).point, p);
    }
}
