//! Touch input and semantic gesture types
//!
//! Raw [`TouchEvent`]s go into the recognizer; [`Gesture`]s come out.
//! [`TapBehavior`] decides which [`NavigationAction`] a gesture triggers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Phase of a single-pointer touch event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TouchAction {
    Down,
    Move,
    Up,
}

/// One raw touch sample in screen pixels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TouchEvent {
    pub action: TouchAction,
    pub x: f32,
    pub y: f32,
    pub timestamp_ms: u64,
}

impl TouchEvent {
    pub fn down(x: f32, y: f32, timestamp_ms: u64) -> Self {
        Self { action: TouchAction::Down, x, y, timestamp_ms }
    }

    pub fn moved(x: f32, y: f32, timestamp_ms: u64) -> Self {
        Self { action: TouchAction::Move, x, y, timestamp_ms }
    }

    pub fn up(x: f32, y: f32, timestamp_ms: u64) -> Self {
        Self { action: TouchAction::Up, x, y, timestamp_ms }
    }
}

/// Semantic gesture recognized on the dot
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    Tap,
    DoubleTap,
    TripleTap,
    QuadrupleTap,
    LongPress,
    DragStart,
    /// Movement since the previous touch point, not since touch-down
    DragMove { dx: f32, dy: f32 },
    DragEnd,
}

impl Gesture {
    /// Maps a resolved click count onto a tap gesture, saturating at four
    pub fn from_click_count(count: u32) -> Option<Self> {
        match count {
            0 => None,
            1 => Some(Gesture::Tap),
            2 => Some(Gesture::DoubleTap),
            3 => Some(Gesture::TripleTap),
            _ => Some(Gesture::QuadrupleTap),
        }
    }

    pub fn is_drag(&self) -> bool {
        matches!(
            self,
            Gesture::DragStart | Gesture::DragMove { .. } | Gesture::DragEnd
        )
    }
}

/// Navigation action the host should perform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NavigationAction {
    Home,
    Back,
    /// Switch to the previously used app
    Recents,
    /// Open the recent-apps overview
    RecentsOverview,
    /// Bring the host application's own settings screen forward
    OpenSettings,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("Unknown tap behavior '{0}'")]
pub struct UnknownTapBehavior(pub String);

/// How taps on the dot map to navigation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TapBehavior {
    /// 1 tap = Home, 2 taps = Back
    Standard,
    /// 1 tap = Back, 2 taps = previous app
    Navi,
    /// Every tap goes Home; moving the dot needs a long-press first
    #[default]
    SafeHome,
}

impl TapBehavior {
    /// Whether dragging must be armed by a long-press
    pub fn requires_long_press_to_drag(self) -> bool {
        matches!(self, TapBehavior::SafeHome)
    }

    /// Navigation action for a gesture in this mode
    ///
    /// # Returns
    /// None for drag gestures and for gestures this mode ignores
    pub fn action_for(self, gesture: &Gesture) -> Option<NavigationAction> {
        use NavigationAction::*;

        match (self, gesture) {
            (_, g) if g.is_drag() => None,
            (_, Gesture::QuadrupleTap) => Some(OpenSettings),
            (TapBehavior::SafeHome, Gesture::LongPress) => None,
            (TapBehavior::SafeHome, _) => Some(Home),
            (_, Gesture::LongPress) => Some(Home),
            (_, Gesture::TripleTap) => Some(RecentsOverview),
            (TapBehavior::Standard, Gesture::Tap) => Some(Home),
            (TapBehavior::Standard, Gesture::DoubleTap) => Some(Back),
            (TapBehavior::Navi, Gesture::Tap) => Some(Back),
            (TapBehavior::Navi, Gesture::DoubleTap) => Some(Recents),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TapBehavior::Standard => "STANDARD",
            TapBehavior::Navi => "NAVI",
            TapBehavior::SafeHome => "SAFE_HOME",
        }
    }
}

impl fmt::Display for TapBehavior {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TapBehavior {
    type Err = UnknownTapBehavior;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "STANDARD" => Ok(TapBehavior::Standard),
            "NAVI" => Ok(TapBehavior::Navi),
            "SAFE_HOME" => Ok(TapBehavior::SafeHome),
            _ => Err(UnknownTapBehavior(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn click_count_saturates_at_quadruple() {
        assert_eq!(Gesture::from_click_count(0), None);
        assert_eq!(Gesture::from_click_count(1), Some(Gesture::Tap));
        assert_eq!(Gesture::from_click_count(4), Some(Gesture::QuadrupleTap));
        assert_eq!(Gesture::from_click_count(9), Some(Gesture::QuadrupleTap));
    }

    #[test]
    fn standard_mode_mapping() {
        let mode = TapBehavior::Standard;
        assert_eq!(mode.action_for(&Gesture::Tap), Some(NavigationAction::Home));
        assert_eq!(mode.action_for(&Gesture::DoubleTap), Some(NavigationAction::Back));
        assert_eq!(mode.action_for(&Gesture::TripleTap), Some(NavigationAction::RecentsOverview));
        assert_eq!(mode.action_for(&Gesture::QuadrupleTap), Some(NavigationAction::OpenSettings));
        assert_eq!(mode.action_for(&Gesture::LongPress), Some(NavigationAction::Home));
        assert_eq!(mode.action_for(&Gesture::DragEnd), None);
    }

    #[test]
    fn navi_mode_mapping() {
        let mode = TapBehavior::Navi;
        assert_eq!(mode.action_for(&Gesture::Tap), Some(NavigationAction::Back));
        assert_eq!(mode.action_for(&Gesture::DoubleTap), Some(NavigationAction::Recents));
        assert_eq!(mode.action_for(&Gesture::TripleTap), Some(NavigationAction::RecentsOverview));
    }

    #[test]
    fn safe_home_sends_everything_home() {
        let mode = TapBehavior::SafeHome;
        assert!(mode.requires_long_press_to_drag());
        for gesture in [Gesture::Tap, Gesture::DoubleTap, Gesture::TripleTap] {
            assert_eq!(mode.action_for(&gesture), Some(NavigationAction::Home));
        }
        assert_eq!(mode.action_for(&Gesture::LongPress), None);
        assert_eq!(mode.action_for(&Gesture::DragMove { dx: 1.0, dy: 0.0 }), None);
    }

    #[test]
    fn tap_behavior_parses_persisted_names() {
        assert_eq!("SAFE_HOME".parse::<TapBehavior>(), Ok(TapBehavior::SafeHome));
        assert_eq!("navi".parse::<TapBehavior>(), Ok(TapBehavior::Navi));
        assert!("SIDEWAYS".parse::<TapBehavior>().is_err());
        assert_eq!(TapBehavior::Standard.to_string(), "STANDARD");
    }
}
