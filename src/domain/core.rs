//! Core domain types and operations
//!
//! This module defines pure domain types that work exclusively with
//! real pixels and have no knowledge of any UI toolkit.

use serde::{Deserialize, Serialize};

/// Point in real pixel coordinates, top-left origin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    /// Creates a new position
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    /// Returns this position shifted by the given delta
    pub fn offset(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.x.saturating_add(dx), self.y.saturating_add(dy))
    }

    /// Euclidean distance to another position in pixels
    pub fn distance_to(&self, other: &Position) -> f32 {
        let dx = (other.x - self.x) as f32;
        let dy = (other.y - self.y) as f32;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Display orientation in clockwise 90° steps from the natural orientation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Rotation {
    #[default]
    Deg0,
    Deg90,
    Deg180,
    Deg270,
}

impl Rotation {
    /// Maps any integer quadrant onto 0..3
    pub fn from_quadrant(quadrant: i32) -> Self {
        match quadrant.rem_euclid(4) {
            0 => Rotation::Deg0,
            1 => Rotation::Deg90,
            2 => Rotation::Deg180,
            _ => Rotation::Deg270,
        }
    }

    pub fn quadrant(self) -> i32 {
        match self {
            Rotation::Deg0 => 0,
            Rotation::Deg90 => 1,
            Rotation::Deg180 => 2,
            Rotation::Deg270 => 3,
        }
    }

    /// Clockwise steps needed to go from `self` to `to`
    pub fn steps_to(self, to: Rotation) -> i32 {
        (to.quadrant() - self.quadrant() + 4) % 4
    }

    /// The rotation one clockwise step further
    pub fn next(self) -> Self {
        Self::from_quadrant(self.quadrant() + 1)
    }
}

/// Immutable snapshot of the screen the overlay lives on
///
/// Replaced wholesale on rotation. Width and height are the usable size
/// for the current rotation, not the natural-orientation size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ScreenGeometry {
    pub width: i32,
    pub height: i32,
    pub rotation: Rotation,
}

impl ScreenGeometry {
    /// Creates a new geometry snapshot
    pub const fn new(width: i32, height: i32, rotation: Rotation) -> Self {
        Self {
            width,
            height,
            rotation,
        }
    }

    /// Returns true if both dimensions are positive
    ///
    /// Platforms occasionally report a zero-sized display while a
    /// configuration change is still settling.
    pub fn is_known(&self) -> bool {
        self.width > 0 && self.height > 0
    }

    /// Returns self if known, otherwise `fallback`
    pub fn or(self, fallback: ScreenGeometry) -> ScreenGeometry {
        if self.is_known() { self } else { fallback }
    }

    /// The geometry obtained by rotating the device one step clockwise
    pub fn rotated_clockwise(&self) -> ScreenGeometry {
        ScreenGeometry::new(self.height, self.width, self.rotation.next())
    }

    /// Converts a pixel position to a fraction of the screen size
    pub fn to_fraction(&self, position: Position) -> Option<(f32, f32)> {
        if !self.is_known() {
            return None;
        }
        Some((
            position.x as f32 / self.width as f32,
            position.y as f32 / self.height as f32,
        ))
    }

    /// Converts a screen fraction back to pixels
    pub fn from_fraction(&self, fx: f32, fy: f32) -> Position {
        Position::new(
            (fx * self.width as f32).round() as i32,
            (fy * self.height as f32).round() as i32,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn position_offset_and_distance() {
        let p = Position::new(10, 20);
        assert_eq!(p.offset(3, -4), Position::new(13, 16));
        assert!((p.distance_to(&Position::new(13, 24)) - 5.0).abs() < f32::EPSILON);
    }

    #[test]
    fn rotation_wraps_quadrants() {
        assert_eq!(Rotation::from_quadrant(4), Rotation::Deg0);
        assert_eq!(Rotation::from_quadrant(-1), Rotation::Deg270);
        assert_eq!(Rotation::Deg270.next(), Rotation::Deg0);
        assert_eq!(Rotation::Deg90.steps_to(Rotation::Deg0), 3);
        assert_eq!(Rotation::Deg0.steps_to(Rotation::Deg180), 2);
    }

    #[test]
    fn unknown_geometry_falls_back() {
        let zero = ScreenGeometry::new(0, 1920, Rotation::Deg0);
        let known = ScreenGeometry::new(1080, 1920, Rotation::Deg0);
        assert!(!zero.is_known());
        assert_eq!(zero.or(known), known);
        assert!(zero.to_fraction(Position::new(1, 1)).is_none());
    }

    #[test]
    fn fraction_round_trip() {
        let geometry = ScreenGeometry::new(1080, 1920, Rotation::Deg0);
        let (fx, fy) = geometry.to_fraction(Position::new(540, 1440)).unwrap();
        assert_eq!(geometry.from_fraction(fx, fy), Position::new(540, 1440));
    }

    #[test]
    fn rotating_swaps_dimensions() {
        let geometry = ScreenGeometry::new(1080, 1920, Rotation::Deg270);
        let rotated = geometry.rotated_clockwise();
        assert_eq!(rotated, ScreenGeometry::new(1920, 1080, Rotation::Deg0));
    }
}
