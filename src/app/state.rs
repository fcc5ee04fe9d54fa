//! Reconciler runtime state
//!
//! Small value types describing what is going on around the dot right now:
//! whether a keyboard is up, whether a drag is active, whether a rotation is
//! settling. The reconciler owns one of each; nothing here has side effects.

use crate::domain::core::{Position, ScreenGeometry};

/// The durable, user-intended resting position
///
/// Tagged with the geometry it was computed against so a rotation knows
/// what it is transforming from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnchorPosition {
    pub position: Position,
    pub geometry: ScreenGeometry,
}

impl AnchorPosition {
    pub fn new(position: Position, geometry: ScreenGeometry) -> Self {
        Self { position, geometry }
    }
}

/// Soft keyboard as last reported by the platform
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct KeyboardState {
    pub visible: bool,
    /// Height in pixels; 0 while hidden
    pub height: i32,
}

/// What a keyboard notification changed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyboardTransition {
    Shown,
    Hidden,
    /// Still visible, different height
    Resized,
    /// Duplicate notification
    Unchanged,
}

impl KeyboardState {
    /// Applies a notification and reports what changed
    ///
    /// # Arguments
    /// * `visible` - Whether the keyboard is now visible
    /// * `height` - Keyboard height in pixels, already resolved (non-zero when visible)
    pub fn apply(&mut self, visible: bool, height: i32) -> KeyboardTransition {
        let height = if visible { height } else { 0 };
        let next = KeyboardState { visible, height };

        let transition = match (self.visible, visible) {
            (false, true) => KeyboardTransition::Shown,
            (true, false) => KeyboardTransition::Hidden,
            (true, true) if self.height != height => KeyboardTransition::Resized,
            _ => KeyboardTransition::Unchanged,
        };

        *self = next;
        transition
    }
}

/// An active drag
///
/// Each step moves the dot by the finger delta from wherever it currently
/// sits. Fractions of a pixel are carried into the next step.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DragSession {
    remainder: (f32, f32),
}

impl DragSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Splits one movement step into whole pixels, keeping the fraction
    pub fn step(&mut self, dx: f32, dy: f32) -> (i32, i32) {
        let x = self.remainder.0 + dx;
        let y = self.remainder.1 + dy;
        let (whole_x, whole_y) = (x.trunc(), y.trunc());
        self.remainder = (x - whole_x, y - whole_y);
        (whole_x as i32, whole_y as i32)
    }
}

/// A rotation that has been announced but not yet delivered
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OrientationChange {
    pub started_at_ms: u64,
}

impl OrientationChange {
    pub fn new(started_at_ms: u64) -> Self {
        Self { started_at_ms }
    }

    /// Checks if the change has been pending for longer than `timeout_ms`
    pub fn is_timed_out(&self, now_ms: u64, timeout_ms: u64) -> bool {
        now_ms.saturating_sub(self.started_at_ms) >= timeout_ms
    }

    /// Time at which the change is abandoned
    pub fn deadline(&self, timeout_ms: u64) -> u64 {
        self.started_at_ms.saturating_add(timeout_ms)
    }
}

/// Why a watchdog tick did nothing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogSkip {
    Dragging,
    Animating,
    OrientationChange,
    KeyboardVisible,
}

/// Result of one watchdog tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogOutcome {
    Skipped(WatchdogSkip),
    /// Current is within the drift threshold of the anchor
    InSync,
    /// Drift exceeded the threshold; an animation back to the anchor started
    Corrected { drift_px: u32 },
}
