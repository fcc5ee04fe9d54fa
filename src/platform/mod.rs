//! Boundary to the host platform
//!
//! The core never talks to a UI toolkit directly. It moves the overlay
//! through a [`RenderSink`] and asks for navigation through a
//! [`NavigationDispatcher`]. Both are narrow on purpose so a host can wrap
//! whatever window system it has.

pub mod memory;

use thiserror::Error;

use crate::domain::core::Position;
use crate::domain::gesture::NavigationAction;

/// Failures reported by the render sink
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RenderError {
    #[error("Overlay is not attached to a window")]
    Detached,
    #[error("Failed to move overlay to ({x}, {y}): {reason}")]
    MoveFailed { x: i32, y: i32, reason: String },
    #[error("Failed to query overlay position: {0}")]
    QueryFailed(String),
    #[error("Failed to change overlay visibility: {0}")]
    VisibilityFailed(String),
}

/// Failures reported by the navigation dispatcher
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error("Navigation service is not available")]
    ServiceUnavailable,
    #[error("Action {action:?} was rejected: {reason}")]
    Rejected {
        action: NavigationAction,
        reason: String,
    },
}

/// Where the overlay gets drawn
pub trait RenderSink {
    /// Moves the overlay's top-left corner to `position`
    fn move_overlay_to(&mut self, position: Position) -> Result<(), RenderError>;

    /// Position the overlay is actually rendered at
    fn overlay_position(&self) -> Result<Position, RenderError>;

    fn set_visible(&mut self, visible: bool) -> Result<(), RenderError>;

    /// Short haptic pulse on touch; hosts without a vibrator ignore it
    fn haptic_tick(&mut self) {}
}

/// Performs OS navigation on behalf of the dot
pub trait NavigationDispatcher {
    fn perform_action(&mut self, action: NavigationAction) -> Result<(), DispatchError>;
}
