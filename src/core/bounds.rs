use crate::core::geo::Coordinate;
use crate::traits::GeometryOps;
use serde::{Deserialize, Serialize};

/// Axis-aligned extent in map coordinates
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Extent {
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Creates an extent from a center and a width/height in map units
    pub fn from_center_and_size(center: Coordinate, width: f64, height: f64) -> Self {
        let half_width = width / 2.0;
        let half_height = height / 2.0;
        Self::new(
            center[0] - half_width,
            center[1] - half_height,
            center[0] + half_width,
            center[1] + half_height,
        )
    }

    /// Creates empty extent (invalid extent that can be extended)
    pub fn empty() -> Self {
        Self::new(
            f64::INFINITY,
            f64::INFINITY,
            f64::NEG_INFINITY,
            f64::NEG_INFINITY,
        )
    }

    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    pub fn center(&self) -> Coordinate {
        [
            (self.min_x + self.max_x) / 2.0,
            (self.min_y + self.max_y) / 2.0,
        ]
    }

    pub fn contains(&self, coordinate: &Coordinate) -> bool {
        coordinate[0] >= self.min_x
            && coordinate[0] <= self.max_x
            && coordinate[1] >= self.min_y
            && coordinate[1] <= self.max_y
    }

    pub fn intersects(&self, other: &Extent) -> bool {
        !(other.max_x < self.min_x
            || other.min_x > self.max_x
            || other.max_y < self.min_y
            || other.min_y > self.max_y)
    }

    /// Extends the extent to include a coordinate
    pub fn extend(&mut self, coordinate: &Coordinate) {
        self.min_x = self.min_x.min(coordinate[0]);
        self.min_y = self.min_y.min(coordinate[1]);
        self.max_x = self.max_x.max(coordinate[0]);
        self.max_y = self.max_y.max(coordinate[1]);
    }

    /// Returns a new extent that covers both this extent and another
    pub fn extend_with(&self, other: &Extent) -> Extent {
        if !self.is_valid() {
            return *other;
        }
        if !other.is_valid() {
            return *self;
        }

        Extent::new(
            self.min_x.min(other.min_x),
            self.min_y.min(other.min_y),
            self.max_x.max(other.max_x),
            self.max_y.max(other.max_y),
        )
    }

    /// Checks if the extent is valid (min <= max)
    pub fn is_valid(&self) -> bool {
        self.min_x <= self.max_x && self.min_y <= self.max_y
    }

    pub fn area(&self) -> f64 {
        if !self.is_valid() {
            0.0
        } else {
            self.width() * self.height()
        }
    }
}

impl Default for Extent {
    fn default() -> Self {
        Self::empty()
    }
}

impl GeometryOps<Coordinate> for Extent {
    fn contains_point(&self, point: &Coordinate) -> bool {
        self.contains(point)
    }

    fn intersects_bounds(&self, other: &Self) -> bool {
        self.intersects(other)
    }

    fn extend_with_point(&mut self, point: &Coordinate) {
        self.extend(point)
    }

    fn center(&self) -> Coordinate {
        Extent::center(self)
    }

    fn is_valid(&self) -> bool {
        Extent::is_valid(self)
    }

    fn area(&self) -> f64 {
        Extent::area(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extent_creation() {
        let extent = Extent::new(10.0, 20.0, 30.0, 40.0);
        assert_eq!(extent.width(), 20.0);
        assert_eq!(extent.height(), 20.0);
        assert_eq!(extent.center(), [20.0, 30.0]);
    }

    #[test]
    fn test_empty_extent_grows() {
        let mut extent = Extent::empty();
        assert!(!extent.is_valid());
        assert_eq!(extent.area(), 0.0);

        extent.extend(&[1.0, 2.0]);
        extent.extend(&[-1.0, 5.0]);
        assert_eq!(extent, Extent::new(-1.0, 2.0, 1.0, 5.0));
    }

    #[test]
    fn test_extent_intersection() {
        let a = Extent::new(0.0, 0.0, 10.0, 10.0);
        let b = Extent::new(5.0, 5.0, 15.0, 15.0);
        let c = Extent::new(20.0, 20.0, 25.0, 25.0);

        assert!(a.intersects(&b));
        assert!(!a.intersects(&c));
        assert_eq!(a.extend_with(&c), Extent::new(0.0, 0.0, 25.0, 25.0));
    }
}
