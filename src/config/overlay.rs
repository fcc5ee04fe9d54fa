use crate::domain::core::{Position, Rotation, ScreenGeometry};

/// Static tuning for the dot: dimensions, timeouts and thresholds
///
/// Dimensions are stored in density-independent units and converted
/// with [`OverlayConfig::dp_to_px`]. Everything else is already in pixels
/// or milliseconds.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayConfig {
    /// Pixels per density-independent unit
    pub density: f32,
    pub dot_size_dp: u32,
    /// Size of the window hosting the dot; the dot is centered inside it
    pub layout_size_dp: u32,
    pub touch_slop_px: i32,
    pub long_press_timeout_ms: u64,
    pub double_tap_timeout_ms: u64,
    pub nav_bar_min_height_dp: u32,
    pub nav_bar_max_height_dp: u32,
    pub nav_bar_safety_margin_dp: u32,
    pub status_bar_safety_margin_dp: u32,
    pub keyboard_margin_multiplier: f32,
    /// Fraction of screen height assumed when a keyboard reports 0px
    pub keyboard_height_estimate: f32,
    pub animation_duration_ms: u64,
    pub watchdog_interval_ms: u64,
    pub drift_threshold_dp: u32,
    pub orientation_timeout_ms: u64,
    /// Default anchor as a fraction of the screen (clamped afterwards)
    pub default_anchor_fraction: (f32, f32),
    pub default_geometry: ScreenGeometry,
}

impl OverlayConfig {
    pub const DEFAULT_DOT_SIZE_DP: u32 = 48;
    pub const DEFAULT_TOUCH_SLOP_PX: i32 = 8;
    pub const DEFAULT_LONG_PRESS_TIMEOUT_MS: u64 = 500;
    pub const DEFAULT_DOUBLE_TAP_TIMEOUT_MS: u64 = 300;
    pub const DEFAULT_ANIMATION_DURATION_MS: u64 = 250;
    pub const DEFAULT_WATCHDOG_INTERVAL_MS: u64 = 500;
    pub const DEFAULT_DRIFT_THRESHOLD_DP: u32 = 10;
    pub const DEFAULT_ORIENTATION_TIMEOUT_MS: u64 = 320;
    pub const MIN_DENSITY: f32 = 0.1;

    /// Converts density-independent units to whole pixels
    pub fn dp_to_px(&self, dp: u32) -> i32 {
        (dp as f32 * self.density).round() as i32
    }

    pub fn button_size_px(&self) -> i32 {
        self.dp_to_px(self.dot_size_dp)
    }

    pub fn layout_size_px(&self) -> i32 {
        self.dp_to_px(self.layout_size_dp)
    }

    /// Distance from the layout box edge to the dot edge
    pub fn layout_offset_px(&self) -> i32 {
        (self.layout_size_px() - self.button_size_px()) / 2
    }

    pub fn half_button_px(&self) -> i32 {
        self.button_size_px() / 2
    }

    /// Gap kept between the dot and the top of a visible keyboard
    pub fn keyboard_margin_px(&self) -> i32 {
        (self.button_size_px() as f32 * self.keyboard_margin_multiplier) as i32
    }

    pub fn drift_threshold_px(&self) -> f32 {
        self.drift_threshold_dp as f32 * self.density
    }

    /// Cumulative path length below which a long-press drag counts as a tap
    pub fn minimal_drag_threshold_px(&self) -> f32 {
        (self.touch_slop_px * 3) as f32
    }

    pub fn nav_bar_min_height_px(&self) -> i32 {
        self.dp_to_px(self.nav_bar_min_height_dp)
    }

    pub fn nav_bar_max_height_px(&self) -> i32 {
        self.dp_to_px(self.nav_bar_max_height_dp)
    }

    pub fn nav_bar_safety_margin_px(&self) -> i32 {
        self.dp_to_px(self.nav_bar_safety_margin_dp)
    }

    pub fn status_bar_safety_margin_px(&self) -> i32 {
        self.dp_to_px(self.status_bar_safety_margin_dp)
    }

    /// Keyboard height to use when the platform reports none
    pub fn estimated_keyboard_height(&self, screen_height: i32) -> i32 {
        (screen_height as f32 * self.keyboard_height_estimate).round() as i32
    }

    /// Unclamped default anchor for a geometry
    pub fn default_anchor_for(&self, geometry: &ScreenGeometry) -> Position {
        let (fx, fy) = self.default_anchor_fraction;
        geometry.from_fraction(fx, fy)
    }

    pub fn with_density(mut self, density: f32) -> Self {
        self.density = density;
        self.sanitized()
    }

    pub fn with_touch_slop(mut self, touch_slop_px: i32) -> Self {
        self.touch_slop_px = touch_slop_px;
        self.sanitized()
    }

    pub fn with_drift_threshold_dp(mut self, drift_threshold_dp: u32) -> Self {
        self.drift_threshold_dp = drift_threshold_dp;
        self
    }

    pub fn with_animation_duration(mut self, animation_duration_ms: u64) -> Self {
        self.animation_duration_ms = animation_duration_ms;
        self
    }

    pub fn with_default_geometry(mut self, geometry: ScreenGeometry) -> Self {
        if geometry.is_known() {
            self.default_geometry = geometry;
        }
        self
    }

    /// Pulls out-of-range values back into something usable
    pub fn sanitized(mut self) -> Self {
        if !self.density.is_finite() || self.density < Self::MIN_DENSITY {
            self.density = 1.0;
        }
        self.touch_slop_px = self.touch_slop_px.max(0);
        self.layout_size_dp = self.layout_size_dp.max(self.dot_size_dp);
        self.keyboard_height_estimate = self.keyboard_height_estimate.clamp(0.0, 1.0);
        self.keyboard_margin_multiplier = self.keyboard_margin_multiplier.max(0.0);
        self.watchdog_interval_ms = self.watchdog_interval_ms.max(1);
        self
    }
}

impl Default for OverlayConfig {
    fn default() -> Self {
        Self {
            density: 1.0,
            dot_size_dp: Self::DEFAULT_DOT_SIZE_DP,
            layout_size_dp: Self::DEFAULT_DOT_SIZE_DP,
            touch_slop_px: Self::DEFAULT_TOUCH_SLOP_PX,
            long_press_timeout_ms: Self::DEFAULT_LONG_PRESS_TIMEOUT_MS,
            double_tap_timeout_ms: Self::DEFAULT_DOUBLE_TAP_TIMEOUT_MS,
            nav_bar_min_height_dp: 24,
            nav_bar_max_height_dp: 48,
            nav_bar_safety_margin_dp: 5,
            status_bar_safety_margin_dp: 5,
            keyboard_margin_multiplier: 1.5,
            keyboard_height_estimate: 0.38,
            animation_duration_ms: Self::DEFAULT_ANIMATION_DURATION_MS,
            watchdog_interval_ms: Self::DEFAULT_WATCHDOG_INTERVAL_MS,
            drift_threshold_dp: Self::DEFAULT_DRIFT_THRESHOLD_DP,
            orientation_timeout_ms: Self::DEFAULT_ORIENTATION_TIMEOUT_MS,
            default_anchor_fraction: (1.0, 0.75),
            default_geometry: ScreenGeometry::new(1080, 1920, Rotation::Deg0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pixel_sizes_follow_density() {
        let config = OverlayConfig::default().with_density(2.0);
        assert_eq!(config.button_size_px(), 96);
        assert_eq!(config.layout_offset_px(), 0);
        assert_eq!(config.keyboard_margin_px(), 144);
        assert!((config.drift_threshold_px() - 20.0).abs() < f32::EPSILON);
    }

    #[test]
    fn sanitize_rejects_bad_density() {
        let config = OverlayConfig::default().with_density(0.0);
        assert!((config.density - 1.0).abs() < f32::EPSILON);
        let config = OverlayConfig::default().with_density(f32::NAN);
        assert!((config.density - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn minimal_drag_is_three_slops() {
        let config = OverlayConfig::default().with_touch_slop(10);
        assert!((config.minimal_drag_threshold_px() - 30.0).abs() < f32::EPSILON);
    }

    #[test]
    fn keyboard_estimate_uses_fraction_of_height() {
        let config = OverlayConfig::default();
        assert_eq!(config.estimated_keyboard_height(1000), 380);
    }

    #[test]
    fn unknown_default_geometry_is_ignored() {
        let config = OverlayConfig::default()
            .with_default_geometry(ScreenGeometry::new(0, 0, Rotation::Deg0));
        assert_eq!(config.default_geometry.width, 1080);
    }
}
