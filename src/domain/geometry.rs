//! Screen geometry math: rotation transforms and bounds clamping
//!
//! Everything here is pure. The reconciler feeds in the current
//! [`ScreenGeometry`], [`SystemInsets`] and dot dimensions and gets back
//! positions that are safe to render.

use crate::config::OverlayConfig;
use crate::domain::core::{Position, Rotation, ScreenGeometry};

/// Maps points between screen geometries under rotation
///
/// For a rotation of `delta` clockwise steps from the old geometry:
/// - 0: `(x, y)`
/// - 1: `(y, old_width - x)`
/// - 2: `(old_width - x, old_height - y)`
/// - 3: `(old_height - y, x)`
pub struct GeometryTransform;

impl GeometryTransform {
    /// Transforms a raw point from `old` into the orientation `new_rotation`
    pub fn transform_point(point: Position, old: &ScreenGeometry, new_rotation: Rotation) -> Position {
        let Position { x, y } = point;
        match old.rotation.steps_to(new_rotation) {
            0 => Position::new(x, y),
            1 => Position::new(y, old.width - x),
            2 => Position::new(old.width - x, old.height - y),
            _ => Position::new(old.height - y, x),
        }
    }

    /// Transforms the top-left corner of a dot by rotating its center
    ///
    /// Rotating the center keeps the dot on the same physical spot of the
    /// glass. Rotating the top-left directly would shift it by a button
    /// size whenever the aspect ratio changes.
    ///
    /// # Arguments
    /// * `top_left` - Dot position in the old geometry
    /// * `old` - Geometry the position was computed against
    /// * `new_rotation` - Rotation after the change
    /// * `half_button` - Half of the dot size in pixels
    pub fn transform_top_left(
        top_left: Position,
        old: &ScreenGeometry,
        new_rotation: Rotation,
        half_button: i32,
    ) -> Position {
        let center = top_left.offset(half_button, half_button);
        let rotated = Self::transform_point(center, old, new_rotation);
        rotated.offset(-half_button, -half_button)
    }
}

/// Screen edge occupied by the system navigation bar
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavBarSide {
    Bottom,
    Left,
    Right,
    /// No navigation bar (immersive mode)
    None,
}

impl NavBarSide {
    /// Best guess when the platform reports zero insets (gesture navigation)
    pub fn guess_from_rotation(rotation: Rotation) -> Self {
        match rotation {
            Rotation::Deg0 | Rotation::Deg180 => NavBarSide::Bottom,
            Rotation::Deg90 => NavBarSide::Right,
            Rotation::Deg270 => NavBarSide::Left,
        }
    }
}

/// System bar insets as last reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SystemInsets {
    /// Reported side, `None` when unknown
    pub nav_bar_side: Option<NavBarSide>,
    /// Reported thickness; 0 for gesture navigation or when unknown
    pub nav_bar_px: i32,
    pub status_bar_px: i32,
}

impl SystemInsets {
    pub fn new(nav_bar_side: Option<NavBarSide>, nav_bar_px: i32, status_bar_px: i32) -> Self {
        Self {
            nav_bar_side,
            nav_bar_px,
            status_bar_px,
        }
    }

    /// The side to keep clear of, guessing from rotation if nothing was reported
    pub fn resolved_nav_side(&self, rotation: Rotation) -> NavBarSide {
        match self.nav_bar_side {
            Some(side) if self.nav_bar_px > 0 || side == NavBarSide::None => side,
            _ => NavBarSide::guess_from_rotation(rotation),
        }
    }

    /// Nav bar thickness plus safety margin, in pixels
    pub fn nav_bar_margin(&self, config: &OverlayConfig) -> i32 {
        let height = if self.nav_bar_px <= 0 {
            config.nav_bar_min_height_px()
        } else {
            self.nav_bar_px.min(config.nav_bar_max_height_px())
        };
        height + config.nav_bar_safety_margin_px()
    }

    /// Space reserved at the top for the status bar, in pixels
    pub fn status_bar_margin(&self, config: &OverlayConfig) -> i32 {
        if self.status_bar_px > 0 {
            self.status_bar_px + config.status_bar_safety_margin_px()
        } else {
            0
        }
    }
}

/// Allowed range for the dot's top-left corner
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstrainBounds {
    pub min_x: i32,
    pub max_x: i32,
    pub min_y: i32,
    pub max_y: i32,
}

impl ConstrainBounds {
    /// Computes bounds that keep the layout box on screen and off the system bars
    ///
    /// # Returns
    /// None if the geometry is unknown (zero-sized); callers skip clamping
    pub fn compute(
        geometry: &ScreenGeometry,
        insets: &SystemInsets,
        config: &OverlayConfig,
    ) -> Option<Self> {
        if !geometry.is_known() {
            return None;
        }

        let button = config.button_size_px();
        let offset = config.layout_offset_px();
        let nav_margin = insets.nav_bar_margin(config);

        let mut bounds = Self {
            min_x: -offset,
            max_x: geometry.width - button - offset,
            min_y: -offset + insets.status_bar_margin(config),
            max_y: geometry.height - button - offset,
        };

        match insets.resolved_nav_side(geometry.rotation) {
            NavBarSide::Bottom => bounds.max_y -= nav_margin,
            NavBarSide::Left => bounds.min_x += nav_margin,
            NavBarSide::Right => bounds.max_x -= nav_margin,
            NavBarSide::None => {}
        }

        // Screens smaller than the dot collapse to a single point
        bounds.max_x = bounds.max_x.max(bounds.min_x);
        bounds.max_y = bounds.max_y.max(bounds.min_y);
        Some(bounds)
    }

    pub fn clamp(&self, position: Position) -> Position {
        Position::new(
            position.x.clamp(self.min_x, self.max_x),
            position.y.clamp(self.min_y, self.max_y),
        )
    }

    pub fn contains(&self, position: Position) -> bool {
        (self.min_x..=self.max_x).contains(&position.x)
            && (self.min_y..=self.max_y).contains(&position.y)
    }
}
