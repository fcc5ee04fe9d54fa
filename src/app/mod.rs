//! Application orchestration layer
//!
//! This module coordinates between input, domain, UI, and platform layers.
//! The reconciler owns the dot's position; the controller routes gestures.

pub mod controller;
pub mod reconciler;
pub mod script;
pub mod state;

pub use controller::OverlayController;
pub use reconciler::PositionReconciler;
pub use script::{ReplayReport, Script, ScriptError, ScriptEvent};
